//! Casegen Core - requirement to test case pipeline
//!
//! Turns a requirement document into test points and test cases through an
//! unreliable generator, guaranteeing:
//! - every mandatory topic gets at least a floor of test points
//! - every test point yields at least one case, synthesized if need be
//! - the event stream never stalls and never ends without an explanation
//!
//! # Example
//!
//! ```rust,ignore
//! use casegen_core::{Orchestrator, PipelineConfig, RunRequest};
//!
//! # async fn example(client: casegen_llm::SharedClient) -> Result<(), Box<dyn std::error::Error>> {
//! let orchestrator = Orchestrator::new(client, PipelineConfig::default())?;
//! let mut run = orchestrator.run(RunRequest::new("book a flight").with_focus("payment failure"));
//!
//! while let Some(event) = run.events.next_event().await {
//!     println!("{}", serde_json::to_string(&event)?);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod analyzer;
pub mod config;
pub mod context;
pub mod coverage;
pub mod display;
pub mod document;
pub mod error;
pub mod orchestrator;
pub mod outcome;
pub mod planner;
pub mod stream;
pub mod test_case;
pub mod test_point;
pub mod types;
pub mod worker;
pub mod workflow;

#[cfg(test)]
mod testing;

pub use analyzer::{AnalysisResult, QualitySummary, RequirementAnalyzer};
pub use config::{PipelineConfig, MAX_CASES_TIMEOUT_SECS, MIN_MANDATORY_POINTS};
pub use context::{merge_generation_context, GenerationWeights, MergedContext};
pub use coverage::{check, focus_hit_stats, overall_status, CoverageResult, CoverageStatus, FocusHitStats};
pub use display::{clean_case_name, clean_module_name};
pub use document::DocumentText;
pub use error::{PipelineError, WorkerError, WorkflowError};
pub use orchestrator::{
    AnalysisReport, CasesInput, CasesReport, Orchestrator, RunHandle, RunRequest, RunSummary,
    TestPointsReport,
};
pub use outcome::StageOutcome;
pub use planner::TaskPlanner;
pub use stream::{EventSender, EventStream, StreamEvent};
pub use test_case::{PointCases, TestCaseGenerator};
pub use test_point::TestPointGenerator;
pub use types::{
    ModuleBreakdown, Origin, Plan, PlanKind, RequirementBreakdown, RequirementInput, RunId,
    TestCase, TestPoint, TestPointGroup, NO_PRECONDITION,
};
pub use workflow::{
    GenerationSession, InMemoryWorkflowStore, WorkflowProgress, WorkflowRegistry, WorkflowStage,
    WorkflowStore, WorkflowTask, WorkflowUpdate,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
