//! Casegen Generation Client
//!
//! The single abstraction point between the pipeline and the external text
//! generator.
//!
//! # Contract
//!
//! - [`GenerationClient::generate`] turns a prompt into a [`StructuredValue`]
//! - every request carries a timeout
//! - transport, authentication, empty-content, and extraction problems are
//!   errors; there is no silent empty success
//! - no retries; retry policy belongs to the calling stage
//!
//! [`ChatCompletionsClient`] speaks the OpenAI-compatible chat-completions
//! protocol and runs every answer through the structured-response extractor.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod chat;
pub mod client;
pub mod config;
pub mod error;

pub use casegen_extract::StructuredValue;
pub use chat::ChatCompletionsClient;
pub use client::{GenerationClient, SharedClient};
pub use config::{LlmConfig, DEFAULT_BASE_URL, DEFAULT_SYSTEM_PROMPT};
pub use error::GenerationError;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
