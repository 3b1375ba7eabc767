//! Generation client contract
//!
//! The one way the pipeline reaches the external generator. Implementations
//! must enforce a request timeout and must fail loudly: an `Ok` always holds
//! an array or an object.

use crate::error::GenerationError;
use async_trait::async_trait;
use casegen_extract::StructuredValue;
use std::sync::Arc;

/// Prompt in, structured value out
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Send `prompt` to the generator and extract its structured answer
    async fn generate(&self, prompt: &str) -> Result<StructuredValue, GenerationError>;

    /// Identifier for logs
    fn name(&self) -> &str {
        "generator"
    }
}

#[async_trait]
impl GenerationClient for Arc<dyn GenerationClient> {
    async fn generate(&self, prompt: &str) -> Result<StructuredValue, GenerationError> {
        (**self).generate(prompt).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Shared, type-erased client handle
pub type SharedClient = Arc<dyn GenerationClient>;
