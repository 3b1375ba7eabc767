//! Generation session: workflow bookkeeping around the orchestrator

use super::registry::WorkflowRegistry;
use super::stage::WorkflowStage;
use super::task::{WorkflowTask, WorkflowUpdate};
use crate::document::DocumentText;
use crate::error::PipelineError;
use crate::orchestrator::{join_outcome, AnalysisReport, Orchestrator, RunHandle, RunRequest};

/// Binds a workflow registry to an orchestrator
#[derive(Debug, Clone)]
pub struct GenerationSession {
    registry: WorkflowRegistry,
    orchestrator: Orchestrator,
}

impl GenerationSession {
    /// Create new session
    #[inline]
    #[must_use]
    pub fn new(registry: WorkflowRegistry, orchestrator: Orchestrator) -> Self {
        Self {
            registry,
            orchestrator,
        }
    }

    /// Workflow registry
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &WorkflowRegistry {
        &self.registry
    }

    /// Attach requirement text, creating the workflow if needed
    ///
    /// # Errors
    /// - `PipelineError::EmptyRequirement` if the document has no text
    /// - `PipelineError::Workflow` if the workflow is busy
    pub fn attach_document(
        &self,
        id: &str,
        document: &DocumentText,
        focus: Option<&str>,
    ) -> Result<WorkflowTask, PipelineError> {
        let text = document.requirement_text()?;
        self.registry.create(Some(id), focus);
        let mut update = WorkflowUpdate::new().with_document_text(text);
        if let Some(focus) = focus.map(str::trim).filter(|f| !f.is_empty()) {
            update = update.with_focus_requirements(focus);
        }
        let task = self
            .registry
            .transition_with(id, WorkflowStage::FileReady, None, update)?;
        Ok(task)
    }

    /// Run quality analysis and store the result with its test points
    ///
    /// # Errors
    /// Any analysis failure; the workflow moves to `error` with the message.
    pub async fn analyze(&self, id: &str) -> Result<AnalysisReport, PipelineError> {
        let task = self.registry.get(id)?;
        let text = task.document_text.ok_or(PipelineError::EmptyRequirement)?;
        self.registry.transition(id, WorkflowStage::Analyzing, None)?;

        match self
            .orchestrator
            .analyze(&text, task.focus_requirements.as_deref())
            .await
        {
            Ok(report) => {
                let message = format!(
                    "analysis completed, {} test points",
                    report.test_points.len()
                );
                self.registry.transition_with(
                    id,
                    WorkflowStage::AnalysisDone,
                    Some(&message),
                    WorkflowUpdate::new()
                        .with_analysis(report.analysis.clone())
                        .with_test_points(report.test_points.clone()),
                )?;
                Ok(report)
            }
            Err(e) => {
                self.fail(id, &e);
                Err(e)
            }
        }
    }

    /// Start case generation
    ///
    /// Analysis runs first when the workflow has no test points yet. The
    /// returned handle's outcome also records the result in the workflow:
    /// `generated` with the cases on success, `error` otherwise.
    ///
    /// # Errors
    /// Anything that fails before the run starts; the workflow moves to `error`.
    pub async fn generate(
        &self,
        id: &str,
        requirement_hint: Option<&str>,
    ) -> Result<RunHandle, PipelineError> {
        let mut task = self.registry.get(id)?;
        let text = task
            .document_text
            .clone()
            .ok_or(PipelineError::EmptyRequirement)?;

        if task.test_points.is_empty() {
            tracing::info!(workflow = %id, "no test points yet, analyzing before generation");
            let report = match self
                .orchestrator
                .analyze(&text, task.focus_requirements.as_deref())
                .await
            {
                Ok(report) => report,
                Err(e) => {
                    self.fail(id, &e);
                    return Err(e);
                }
            };
            task = self.registry.update_fields(
                id,
                WorkflowUpdate::new()
                    .with_analysis(report.analysis)
                    .with_test_points(report.test_points),
            )?;
        }

        self.registry.transition(id, WorkflowStage::Generating, None)?;

        let mut request = RunRequest::new(text).with_test_points(task.test_points);
        request.focus = task.focus_requirements;
        request.analysis = task.analysis;
        request.user_requirement = requirement_hint.map(str::to_string);

        let inner = self.orchestrator.run(request);
        let registry = self.registry.clone();
        let workflow = id.to_string();
        let outcome = tokio::spawn(async move {
            let result = join_outcome(inner.outcome).await;
            let recorded = match &result {
                Ok(summary) => registry.transition_with(
                    &workflow,
                    WorkflowStage::Generated,
                    Some(&format!("generated {} test cases", summary.cases.len())),
                    WorkflowUpdate::new()
                        .with_cases(summary.cases.clone())
                        .with_focus_hit_cases(summary.focus.focus_cases),
                ),
                Err(e) => registry.transition(&workflow, WorkflowStage::Error, Some(&e.to_string())),
            };
            if let Err(e) = recorded {
                tracing::warn!(workflow = %workflow, error = %e, "could not record generation result");
            }
            result
        });

        Ok(RunHandle {
            run_id: inner.run_id,
            events: inner.events,
            outcome,
        })
    }

    fn fail(&self, id: &str, error: &PipelineError) {
        tracing::error!(workflow = %id, error = %error, "workflow operation failed");
        if let Err(e) = self
            .registry
            .transition(id, WorkflowStage::Error, Some(&error.to_string()))
        {
            tracing::warn!(workflow = %id, error = %e, "could not record workflow failure");
        }
    }
}
