//! Testing utilities for the casegen workspace
//!
//! Scripted, failing and hanging generation clients plus model fixtures.

#![allow(missing_docs)]

use async_trait::async_trait;
use casegen_core::{
    DocumentText, ModuleBreakdown, Orchestrator, Origin, PipelineConfig, RequirementBreakdown,
    TestPoint,
};
use casegen_llm::{GenerationClient, GenerationError, SharedClient, StructuredValue};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

type Responder = Box<dyn Fn(&str) -> Result<Value, GenerationError> + Send + Sync>;

/// Replays queued responses, then defers to a responder (default: `EmptyResponse`)
pub struct ScriptedClient {
    queue: Mutex<VecDeque<Result<Value, GenerationError>>>,
    responder: Responder,
    prompts: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl std::fmt::Debug for ScriptedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedClient")
            .field("queued", &self.queue.lock().len())
            .field("calls", &self.calls())
            .finish_non_exhaustive()
    }
}

impl Default for ScriptedClient {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl ScriptedClient {
    pub fn new(responses: Vec<Result<Value, GenerationError>>) -> Self {
        Self {
            queue: Mutex::new(responses.into()),
            responder: Box::new(|_| Err(GenerationError::EmptyResponse)),
            prompts: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Sleep for `delay` before answering each prompt
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Answer every prompt with `respond` once the queue is empty
    pub fn with_responder<F>(mut self, respond: F) -> Self
    where
        F: Fn(&str) -> Result<Value, GenerationError> + Send + Sync + 'static,
    {
        self.responder = Box::new(respond);
        self
    }

    pub fn push(&self, response: Result<Value, GenerationError>) {
        self.queue.lock().push_back(response);
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl GenerationClient for ScriptedClient {
    async fn generate(&self, prompt: &str) -> Result<StructuredValue, GenerationError> {
        self.prompts.lock().push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.queue.lock().pop_front();
        let value = next.unwrap_or_else(|| (self.responder)(prompt))?;
        StructuredValue::from_value(value)
            .ok_or_else(|| GenerationError::unexpected_shape("array or object", "scalar"))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Fails every call with the same error
#[derive(Debug)]
pub struct FailingClient {
    error: GenerationError,
    calls: AtomicUsize,
}

impl FailingClient {
    pub fn new(error: GenerationError) -> Self {
        Self {
            error,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn transport() -> Self {
        Self::new(GenerationError::Transport("connection reset by peer".into()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationClient for FailingClient {
    async fn generate(&self, _prompt: &str) -> Result<StructuredValue, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Never answers
#[derive(Debug, Default)]
pub struct HangingClient {
    calls: AtomicUsize,
}

impl HangingClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationClient for HangingClient {
    async fn generate(&self, _prompt: &str) -> Result<StructuredValue, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        futures::future::pending().await
    }

    fn name(&self) -> &str {
        "hanging"
    }
}

/// Orchestrator over `client` with default configuration
pub fn orchestrator(client: SharedClient) -> Orchestrator {
    orchestrator_with(client, PipelineConfig::default())
}

pub fn orchestrator_with(client: SharedClient, config: PipelineConfig) -> Orchestrator {
    Orchestrator::new(client, config).expect("test pipeline config is valid")
}

pub fn sample_requirement() -> String {
    "The trading service lets a signed-in user place market and limit orders. \
     Market orders fill immediately at the best price. Limit orders rest on the \
     book until the price is reached or the user cancels them."
        .to_string()
}

pub fn sample_document() -> DocumentText {
    DocumentText::new(sample_requirement())
}

pub fn sample_breakdown() -> RequirementBreakdown {
    RequirementBreakdown {
        modules: vec![
            ModuleBreakdown {
                module: "Orders".into(),
                requirements: vec![
                    "place a market order".into(),
                    "place a limit order".into(),
                ],
            },
            ModuleBreakdown {
                module: "Cancellation".into(),
                requirements: vec!["cancel a resting limit order".into()],
            },
        ],
        mandatory_coverage: vec!["market order".into()],
    }
}

pub fn test_point(name: &str, module: &str) -> TestPoint {
    TestPoint {
        id: TestPoint::new_id(),
        name: name.to_string(),
        module: module.to_string(),
        source_requirement: None,
        origin: Origin::Inferred,
        is_focus: false,
        priority: "P2".into(),
        category: "functional".into(),
    }
}

pub fn mandatory_point(name: &str, item: &str) -> TestPoint {
    TestPoint {
        source_requirement: Some(item.to_string()),
        origin: Origin::Mandatory,
        is_focus: true,
        ..test_point(name, "Mandatory Coverage")
    }
}
