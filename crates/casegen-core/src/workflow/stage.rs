//! Workflow stages and the transition table

use crate::error::WorkflowError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stage of one generation workflow
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WorkflowStage {
    /// Nothing attached yet
    #[default]
    Idle,
    /// Requirement text attached
    FileReady,
    /// Quality analysis running
    Analyzing,
    /// Analysis stored
    AnalysisDone,
    /// Case generation running
    Generating,
    /// Cases generated
    Generated,
    /// Last operation failed
    Error,
}

impl WorkflowStage {
    /// All stages in pipeline order
    pub const ALL: [Self; 7] = [
        Self::Idle,
        Self::FileReady,
        Self::Analyzing,
        Self::AnalysisDone,
        Self::Generating,
        Self::Generated,
        Self::Error,
    ];

    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::FileReady => "fileReady",
            Self::Analyzing => "analyzing",
            Self::AnalysisDone => "analysisDone",
            Self::Generating => "generating",
            Self::Generated => "generated",
            Self::Error => "error",
        }
    }

    /// Progress percentage reported on entering the stage
    #[must_use]
    pub const fn default_progress(self) -> u8 {
        match self {
            Self::Idle | Self::Error => 0,
            Self::FileReady => 10,
            Self::Analyzing => 30,
            Self::AnalysisDone => 60,
            Self::Generating => 70,
            Self::Generated => 100,
        }
    }

    /// Message used when a transition supplies none
    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::Idle => "waiting for requirement document",
            Self::FileReady => "requirement document ready",
            Self::Analyzing => "analyzing requirement",
            Self::AnalysisDone => "analysis completed",
            Self::Generating => "generating test cases",
            Self::Generated => "test cases generated",
            Self::Error => "workflow failed",
        }
    }

    /// Check if work is in flight
    #[inline]
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Analyzing | Self::Generating)
    }
}

impl fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stages reachable from `from`
#[must_use]
pub fn allowed_transitions(from: WorkflowStage) -> Vec<WorkflowStage> {
    use WorkflowStage::{AnalysisDone, Analyzing, Error, FileReady, Generated, Generating, Idle};
    match from {
        Idle => vec![FileReady, Error],
        FileReady => vec![FileReady, Analyzing, Generating, Error],
        Analyzing => vec![AnalysisDone, Error],
        AnalysisDone => vec![Analyzing, Generating, FileReady, Error],
        Generating => vec![Generated, Error],
        Generated => vec![Generating, Analyzing, FileReady, Error],
        Error => vec![FileReady, Analyzing, Generating, Error],
    }
}

/// Validate a stage change
///
/// # Errors
/// Returns `WorkflowError::IllegalTransition` if `to` is not reachable from `from`.
pub fn validate_transition(from: WorkflowStage, to: WorkflowStage) -> Result<(), WorkflowError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(WorkflowError::IllegalTransition { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_match_serde() {
        for stage in WorkflowStage::ALL {
            let json = serde_json::to_value(stage).unwrap();
            assert_eq!(json, stage.as_str());
        }
    }

    #[test]
    fn error_reachable_from_everywhere() {
        for stage in WorkflowStage::ALL {
            assert!(validate_transition(stage, WorkflowStage::Error).is_ok(), "{stage}");
        }
    }

    #[test]
    fn illegal_jumps_rejected() {
        assert_eq!(
            validate_transition(WorkflowStage::Idle, WorkflowStage::Generated),
            Err(WorkflowError::IllegalTransition {
                from: WorkflowStage::Idle,
                to: WorkflowStage::Generated,
            })
        );
        assert!(validate_transition(WorkflowStage::Analyzing, WorkflowStage::Generating).is_err());
        assert!(validate_transition(WorkflowStage::Generating, WorkflowStage::Idle).is_err());
    }

    #[test]
    fn progress_defaults() {
        let progress: Vec<u8> = WorkflowStage::ALL.iter().map(|s| s.default_progress()).collect();
        assert_eq!(progress, vec![0, 10, 30, 60, 70, 100, 0]);
    }
}
