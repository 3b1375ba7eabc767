//! Generator connection settings

use crate::error::GenerationError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default OpenAI-compatible endpoint root
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// System prompt sent with every request
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a senior QA engineer.\n\
You MUST output valid JSON only.\n\
Do NOT wrap with markdown.\n\
Do NOT add explanations.";

/// Configuration for the chat-completions client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Bearer token
    pub api_key: Option<String>,
    /// Endpoint root; `/chat/completions` is appended
    pub base_url: String,
    /// Model identifier
    pub model: Option<String>,
    /// Sampling temperature
    pub temperature: f32,
    /// Per-request timeout
    pub request_timeout_secs: u64,
    /// System message
    pub system_prompt: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: None,
            temperature: 0.3,
            request_timeout_secs: 120,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl LlmConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `OPENAI_API_KEY`, `OPENAI_BASE_URL`, `OPENAI_MODEL`
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().merge_env()
    }

    /// Apply environment overrides on top of `self`
    #[must_use]
    pub fn merge_env(self) -> Self {
        self.merge_vars(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup. Blank values are ignored.
    #[must_use]
    pub fn merge_vars<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(key) = get("OPENAI_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(url) = get("OPENAI_BASE_URL") {
            self.base_url = url;
        }
        if let Some(model) = get("OPENAI_MODEL") {
            self.model = Some(model);
        }
        self
    }

    /// Set API key
    #[inline]
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set endpoint root
    #[inline]
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set model
    #[inline]
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set per-request timeout
    #[inline]
    #[must_use]
    pub fn with_request_timeout(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    /// Set temperature
    #[inline]
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Per-request timeout as a duration
    #[inline]
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Full chat-completions URL
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// Check that credentials and model are present
    ///
    /// # Errors
    /// Returns `GenerationError::MissingConfig` naming the first missing setting.
    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            return Err(GenerationError::MissingConfig("OPENAI_API_KEY".to_string()));
        }
        if self.model.as_deref().map_or(true, |m| m.trim().is_empty()) {
            return Err(GenerationError::MissingConfig("OPENAI_MODEL".to_string()));
        }
        if self.base_url.trim().is_empty() {
            return Err(GenerationError::MissingConfig("OPENAI_BASE_URL".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(GenerationError::MissingConfig(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
