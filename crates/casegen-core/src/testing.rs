//! In-crate stub generator for unit tests

use async_trait::async_trait;
use casegen_llm::{GenerationClient, GenerationError, StructuredValue};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;

/// Replays queued responses, then fails with `EmptyResponse`
pub(crate) struct StubClient {
    responses: Mutex<VecDeque<Result<Value, GenerationError>>>,
    prompts: Mutex<Vec<String>>,
}

impl StubClient {
    pub(crate) fn new(responses: Vec<Result<Value, GenerationError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.prompts.lock().len()
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl GenerationClient for StubClient {
    async fn generate(&self, prompt: &str) -> Result<StructuredValue, GenerationError> {
        self.prompts.lock().push(prompt.to_string());
        let next = self.responses.lock().pop_front();
        match next {
            Some(Ok(value)) => StructuredValue::from_value(value)
                .ok_or_else(|| GenerationError::unexpected_shape("array or object", "scalar")),
            Some(Err(e)) => Err(e),
            None => Err(GenerationError::EmptyResponse),
        }
    }

    fn name(&self) -> &str {
        "stub"
    }
}
