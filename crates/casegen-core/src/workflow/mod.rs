//! Workflow state machine
//!
//! Tracks one requirement document from upload through analysis to
//! generated cases. Stage, progress and message always change together
//! through a validated transition; business fields change through
//! [`WorkflowUpdate`].

mod registry;
mod session;
mod stage;
mod store;
mod task;

pub use registry::{WorkflowRegistry, RESET_MESSAGE};
pub use session::GenerationSession;
pub use stage::{allowed_transitions, validate_transition, WorkflowStage};
pub use store::{InMemoryWorkflowStore, TaskMutation, WorkflowStore};
pub use task::{WorkflowProgress, WorkflowTask, WorkflowUpdate};
