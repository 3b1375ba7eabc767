//! OpenAI-compatible chat-completions client

use crate::client::GenerationClient;
use crate::config::LlmConfig;
use crate::error::GenerationError;
use async_trait::async_trait;
use casegen_extract::{StructuredExtractor, StructuredValue};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

const MAX_ERROR_BODY_CHARS: usize = 2_000;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

/// Generation client backed by a `/chat/completions` endpoint
#[derive(Debug, Clone)]
pub struct ChatCompletionsClient {
    http: reqwest::Client,
    config: LlmConfig,
    extractor: StructuredExtractor,
}

impl ChatCompletionsClient {
    /// Build a client, validating configuration first
    ///
    /// # Errors
    /// - `GenerationError::MissingConfig` if key or model is absent
    /// - `GenerationError::Transport` if the HTTP client cannot be built
    pub fn new(config: LlmConfig) -> Result<Self, GenerationError> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| GenerationError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            config,
            extractor: StructuredExtractor::new(),
        })
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn headers(&self) -> Result<HeaderMap, GenerationError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = &self.config.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {key}")).map_err(|_| {
                GenerationError::MissingConfig(
                    "OPENAI_API_KEY is not a valid header value".to_string(),
                )
            })?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    fn map_send_error(&self, err: reqwest::Error) -> GenerationError {
        if err.is_timeout() {
            GenerationError::Timeout {
                duration_secs: self.config.request_timeout_secs,
            }
        } else {
            GenerationError::from(err)
        }
    }
}

#[async_trait]
impl GenerationClient for ChatCompletionsClient {
    async fn generate(&self, prompt: &str) -> Result<StructuredValue, GenerationError> {
        let model = self
            .config
            .model
            .as_deref()
            .ok_or_else(|| GenerationError::MissingConfig("OPENAI_MODEL".to_string()))?;

        let body = ChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.config.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.config.temperature,
        };

        tracing::debug!(model, prompt_chars = prompt.len(), "sending generation request");

        let response = self
            .http
            .post(self.config.endpoint())
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| self.map_send_error(e))?;
        check_status(status, &text)?;

        let content = parse_chat_content(&text)?;
        let value = self.extractor.extract(&content)?;
        tracing::debug!(kind = value.kind(), "generation response extracted");
        Ok(value)
    }

    fn name(&self) -> &str {
        self.config.model.as_deref().unwrap_or("chat-completions")
    }
}

fn check_status(status: StatusCode, body: &str) -> Result<(), GenerationError> {
    if status.is_success() {
        return Ok(());
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(GenerationError::Authentication {
            status: status.as_u16(),
        });
    }
    Err(GenerationError::Status {
        status: status.as_u16(),
        body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
    })
}

/// Pull the first choice's message content out of a chat-completions body
fn parse_chat_content(body: &str) -> Result<String, GenerationError> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| GenerationError::Transport(format!("invalid chat response: {e}")))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or(GenerationError::EmptyResponse)
}
