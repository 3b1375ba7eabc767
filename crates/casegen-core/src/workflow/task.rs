//! Workflow task record and its update types

use super::stage::WorkflowStage;
use crate::analyzer::AnalysisResult;
use crate::types::{TestCase, TestPoint};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One generation workflow, owned by the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowTask {
    /// Workflow id
    pub id: String,
    /// Current stage
    pub stage: WorkflowStage,
    /// Progress percentage, 0-100
    pub progress: u8,
    /// Status message
    pub message: String,
    /// Requirement text attached to the workflow
    pub document_text: Option<String>,
    /// User focus topics, raw
    pub focus_requirements: Option<String>,
    /// Latest quality analysis
    pub analysis: Option<AnalysisResult>,
    /// Test points from the latest analysis
    pub test_points: Vec<TestPoint>,
    /// Cases from the latest generation
    pub cases: Vec<TestCase>,
    /// Number of cases generated
    pub total_cases: usize,
    /// Cases tied to a mandatory topic
    pub focus_hit_cases: usize,
    /// Reference to an exported artifact
    pub artifact_ref: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last change
    pub updated_at: DateTime<Utc>,
}

impl WorkflowTask {
    /// Fresh idle task
    #[must_use]
    pub fn new(id: impl Into<String>, focus_requirements: Option<String>) -> Self {
        let now = Utc::now();
        let stage = WorkflowStage::Idle;
        Self {
            id: id.into(),
            stage,
            progress: stage.default_progress(),
            message: stage.default_message().to_string(),
            document_text: None,
            focus_requirements,
            analysis: None,
            test_points: Vec::new(),
            cases: Vec::new(),
            total_cases: 0,
            focus_hit_cases: 0,
            artifact_ref: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if analysis or generation is in flight
    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.stage.is_running()
    }

    /// Check if cases have been generated
    #[inline]
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.stage == WorkflowStage::Generated
    }

    /// Check if the last operation failed
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.stage == WorkflowStage::Error
    }

    /// Status snapshot
    #[must_use]
    pub fn progress_snapshot(&self) -> WorkflowProgress {
        WorkflowProgress {
            stage: self.stage,
            progress: self.progress,
            message: self.message.clone(),
        }
    }

    /// Stage, progress, message and timestamp in one step
    pub(crate) fn enter(&mut self, stage: WorkflowStage, message: Option<String>) {
        self.stage = stage;
        self.progress = stage.default_progress();
        self.message = message.unwrap_or_else(|| stage.default_message().to_string());
        self.updated_at = Utc::now();
    }
}

/// Read-only status snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowProgress {
    /// Current stage
    pub stage: WorkflowStage,
    /// Progress percentage
    pub progress: u8,
    /// Status message
    pub message: String,
}

/// Business-field update
///
/// Stage, progress and message are not representable here; they only change
/// through a transition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowUpdate {
    document_text: Option<String>,
    focus_requirements: Option<String>,
    analysis: Option<AnalysisResult>,
    test_points: Option<Vec<TestPoint>>,
    cases: Option<Vec<TestCase>>,
    total_cases: Option<usize>,
    focus_hit_cases: Option<usize>,
    artifact_ref: Option<String>,
}

impl WorkflowUpdate {
    /// Empty update
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With requirement text
    #[inline]
    #[must_use]
    pub fn with_document_text(mut self, text: impl Into<String>) -> Self {
        self.document_text = Some(text.into());
        self
    }

    /// With focus topics
    #[inline]
    #[must_use]
    pub fn with_focus_requirements(mut self, focus: impl Into<String>) -> Self {
        self.focus_requirements = Some(focus.into());
        self
    }

    /// With analysis
    #[inline]
    #[must_use]
    pub fn with_analysis(mut self, analysis: AnalysisResult) -> Self {
        self.analysis = Some(analysis);
        self
    }

    /// With test points
    #[inline]
    #[must_use]
    pub fn with_test_points(mut self, test_points: Vec<TestPoint>) -> Self {
        self.test_points = Some(test_points);
        self
    }

    /// With generated cases; also sets the case count
    #[inline]
    #[must_use]
    pub fn with_cases(mut self, cases: Vec<TestCase>) -> Self {
        self.total_cases = Some(cases.len());
        self.cases = Some(cases);
        self
    }

    /// With focus-hit count
    #[inline]
    #[must_use]
    pub fn with_focus_hit_cases(mut self, count: usize) -> Self {
        self.focus_hit_cases = Some(count);
        self
    }

    /// With artifact reference
    #[inline]
    #[must_use]
    pub fn with_artifact_ref(mut self, artifact: impl Into<String>) -> Self {
        self.artifact_ref = Some(artifact.into());
        self
    }

    /// Apply every set field to `task`
    pub fn apply(self, task: &mut WorkflowTask) {
        if let Some(text) = self.document_text {
            task.document_text = Some(text);
        }
        if let Some(focus) = self.focus_requirements {
            task.focus_requirements = Some(focus);
        }
        if let Some(analysis) = self.analysis {
            task.analysis = Some(analysis);
        }
        if let Some(points) = self.test_points {
            task.test_points = points;
        }
        if let Some(cases) = self.cases {
            task.cases = cases;
        }
        if let Some(total) = self.total_cases {
            task.total_cases = total;
        }
        if let Some(hits) = self.focus_hit_cases {
            task.focus_hit_cases = hits;
        }
        if let Some(artifact) = self.artifact_ref {
            task.artifact_ref = Some(artifact);
        }
        task.updated_at = Utc::now();
    }
}
