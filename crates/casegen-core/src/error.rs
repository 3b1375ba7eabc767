//! Error types for casegen core
//!
//! Stage-level generator failures never reach these types: stages recover
//! them into [`crate::outcome::StageOutcome::FellBack`]. What remains here is
//! fatal for a run or a workflow operation.

use crate::workflow::WorkflowStage;
use casegen_llm::GenerationError;

/// Main pipeline error type
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Requirement text is empty after trimming
    #[error("requirement text is empty")]
    EmptyRequirement,

    /// Requirement text is too short for quality analysis
    #[error("requirement text too short: {actual} chars, need at least {min}")]
    RequirementTooShort {
        /// Trimmed length in characters
        actual: usize,
        /// Configured minimum
        min: usize,
    },

    /// No test points to expand into cases
    #[error("no test points available for case generation")]
    EmptyTestPoints,

    /// Generator failure that could not be recovered locally
    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),

    /// Workflow operation failed
    #[error("workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    /// Configuration invalid
    #[error("configuration error: {0}")]
    Config(String),

    /// Producer task died
    #[error("run worker failed: {0}")]
    Worker(#[from] WorkerError),

    /// Consumer went away
    #[error("run cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Check if error must abort the run before any stage starts
    #[inline]
    #[must_use]
    pub fn is_setup(&self) -> bool {
        match self {
            Self::Generation(e) => e.is_setup(),
            Self::Config(_) | Self::EmptyRequirement => true,
            _ => false,
        }
    }

    /// Check if error is a cancellation
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Workflow state errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    /// No workflow with this id
    #[error("workflow not found: {0}")]
    NotFound(String),

    /// Stage change not permitted from the current stage
    #[error("illegal workflow transition: {from} -> {to}")]
    IllegalTransition {
        /// Current stage
        from: WorkflowStage,
        /// Requested stage
        to: WorkflowStage,
    },

    /// Task snapshot could not be serialized
    #[error("workflow snapshot failed: {0}")]
    Snapshot(String),
}

/// Bounded worker errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkerError {
    /// Deadline elapsed before the worker finished
    #[error("worker deadline elapsed")]
    DeadlineElapsed,

    /// Worker task panicked or was aborted
    #[error("worker failed: {0}")]
    Panicked(String),
}
