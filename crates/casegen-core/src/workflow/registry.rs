//! Workflow registry: validated transitions over a [`WorkflowStore`]

use super::stage::{validate_transition, WorkflowStage};
use super::store::{InMemoryWorkflowStore, WorkflowStore};
use super::task::{WorkflowProgress, WorkflowTask, WorkflowUpdate};
use crate::error::WorkflowError;
use std::sync::Arc;

/// Message recorded by [`WorkflowRegistry::reset`]
pub const RESET_MESSAGE: &str = "reset, waiting for requirement document";

/// Registry of workflow tasks keyed by id
#[derive(Clone)]
pub struct WorkflowRegistry {
    store: Arc<dyn WorkflowStore>,
}

impl std::fmt::Debug for WorkflowRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowRegistry")
            .field("tasks", &self.store.len())
            .finish()
    }
}

impl Default for WorkflowRegistry {
    fn default() -> Self {
        Self::with_store(Arc::new(InMemoryWorkflowStore::new()))
    }
}

fn snapshot<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, WorkflowError> {
    serde_json::to_value(value).map_err(|e| WorkflowError::Snapshot(e.to_string()))
}

impl WorkflowRegistry {
    /// Registry over an in-memory store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry over a custom store
    #[inline]
    #[must_use]
    pub fn with_store(store: Arc<dyn WorkflowStore>) -> Self {
        Self { store }
    }

    /// Get or create the workflow `id`; a fresh uuid is used when absent
    ///
    /// Lookup and insertion happen in one store call, so concurrent creators
    /// of the same id all observe the first record.
    pub fn create(&self, id: Option<&str>, focus_requirements: Option<&str>) -> WorkflowTask {
        let id = id.map_or_else(|| uuid::Uuid::new_v4().to_string(), str::to_string);
        let mut focus = focus_requirements
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string);
        let mut created = false;
        let task = self.store.get_or_insert_with(&id, &mut || {
            created = true;
            WorkflowTask::new(id.clone(), focus.take())
        });
        if created {
            tracing::debug!(workflow = %task.id, "workflow created");
        }
        task
    }

    /// Snapshot of a workflow
    ///
    /// # Errors
    /// Returns `WorkflowError::NotFound` for an unknown id.
    pub fn get(&self, id: &str) -> Result<WorkflowTask, WorkflowError> {
        self.store
            .get(id)
            .ok_or_else(|| WorkflowError::NotFound(id.to_string()))
    }

    /// Update business fields without touching the stage
    ///
    /// # Errors
    /// Returns `WorkflowError::NotFound` for an unknown id.
    pub fn update_fields(&self, id: &str, update: WorkflowUpdate) -> Result<WorkflowTask, WorkflowError> {
        let mut update = Some(update);
        self.store.update(id, &mut |task| {
            if let Some(update) = update.take() {
                update.apply(task);
            }
            Ok(())
        })
    }

    /// Move to `stage`, setting progress, message and timestamp together
    ///
    /// # Errors
    /// - `WorkflowError::NotFound` for an unknown id
    /// - `WorkflowError::IllegalTransition` if the table forbids the change
    pub fn transition(
        &self,
        id: &str,
        stage: WorkflowStage,
        message: Option<&str>,
    ) -> Result<WorkflowTask, WorkflowError> {
        self.transition_with(id, stage, message, WorkflowUpdate::new())
    }

    /// Transition and field update in one critical section
    ///
    /// # Errors
    /// Same as [`Self::transition`]; on error neither change is applied.
    pub fn transition_with(
        &self,
        id: &str,
        stage: WorkflowStage,
        message: Option<&str>,
        update: WorkflowUpdate,
    ) -> Result<WorkflowTask, WorkflowError> {
        let mut update = Some(update);
        let task = self.store.update(id, &mut |task| {
            validate_transition(task.stage, stage)?;
            if let Some(update) = update.take() {
                update.apply(task);
            }
            task.enter(stage, message.map(str::to_string));
            Ok(())
        });
        match &task {
            Ok(task) => tracing::info!(workflow = %id, stage = %task.stage, progress = task.progress, "workflow transition"),
            Err(e) => tracing::warn!(workflow = %id, to = %stage, error = %e, "workflow transition rejected"),
        }
        task
    }

    /// Stage, progress and message
    ///
    /// # Errors
    /// Returns `WorkflowError::NotFound` for an unknown id.
    pub fn progress(&self, id: &str) -> Result<WorkflowProgress, WorkflowError> {
        self.get(id).map(|task| task.progress_snapshot())
    }

    /// Back to idle with every business field cleared
    ///
    /// # Errors
    /// Returns `WorkflowError::NotFound` for an unknown id.
    pub fn reset(&self, id: &str) -> Result<WorkflowTask, WorkflowError> {
        let task = self.store.update(id, &mut |task| {
            let created_at = task.created_at;
            *task = WorkflowTask::new(task.id.clone(), None);
            task.created_at = created_at;
            task.message = RESET_MESSAGE.to_string();
            Ok(())
        })?;
        tracing::info!(workflow = %id, "workflow reset");
        Ok(task)
    }

    /// Drop a workflow
    pub fn remove(&self, id: &str) -> Option<WorkflowTask> {
        self.store.remove(id)
    }

    /// JSON snapshot of a workflow
    ///
    /// # Errors
    /// - `WorkflowError::NotFound` for an unknown id
    /// - `WorkflowError::Snapshot` if the task does not serialize
    pub fn to_json(&self, id: &str) -> Result<serde_json::Value, WorkflowError> {
        let task = self.get(id)?;
        snapshot(&task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::AnalysisResult;

    #[test]
    fn create_is_idempotent() {
        let registry = WorkflowRegistry::new();
        let first = registry.create(Some("wf-1"), Some(" refunds "));
        let again = registry.create(Some("wf-1"), Some("other"));
        assert_eq!(first.focus_requirements.as_deref(), Some("refunds"));
        assert_eq!(again.focus_requirements.as_deref(), Some("refunds"));

        let generated = registry.create(None, None);
        assert!(uuid::Uuid::parse_str(&generated.id).is_ok());
    }

    #[test]
    fn happy_path_transitions() {
        let registry = WorkflowRegistry::new();
        registry.create(Some("wf"), None);
        for stage in [
            WorkflowStage::FileReady,
            WorkflowStage::Analyzing,
            WorkflowStage::AnalysisDone,
            WorkflowStage::Generating,
            WorkflowStage::Generated,
        ] {
            registry.transition("wf", stage, None).unwrap();
        }
        let task = registry.get("wf").unwrap();
        assert!(task.is_done());
        assert_eq!(task.progress, 100);
    }

    #[test]
    fn illegal_transition_keeps_state() {
        let registry = WorkflowRegistry::new();
        registry.create(Some("wf"), None);
        let err = registry
            .transition_with(
                "wf",
                WorkflowStage::Generated,
                None,
                WorkflowUpdate::new().with_document_text("x"),
            )
            .unwrap_err();
        assert!(matches!(err, WorkflowError::IllegalTransition { .. }));
        let task = registry.get("wf").unwrap();
        assert_eq!(task.stage, WorkflowStage::Idle);
        assert!(task.document_text.is_none());
    }

    #[test]
    fn reset_clears_business_fields() {
        let registry = WorkflowRegistry::new();
        registry.create(Some("wf"), Some("refunds"));
        registry
            .transition_with(
                "wf",
                WorkflowStage::FileReady,
                Some("loaded"),
                WorkflowUpdate::new()
                    .with_document_text("text")
                    .with_analysis(AnalysisResult::default()),
            )
            .unwrap();
        let task = registry.reset("wf").unwrap();
        assert_eq!(task.stage, WorkflowStage::Idle);
        assert_eq!(task.message, RESET_MESSAGE);
        assert!(task.document_text.is_none());
        assert!(task.analysis.is_none());
        assert!(task.focus_requirements.is_none());
    }

    #[test]
    fn progress_and_json() {
        let registry = WorkflowRegistry::new();
        registry.create(Some("wf"), None);
        registry.transition("wf", WorkflowStage::Error, Some("boom")).unwrap();
        let progress = registry.progress("wf").unwrap();
        assert_eq!(progress.message, "boom");
        assert_eq!(registry.to_json("wf").unwrap()["stage"], "error");
        assert!(registry.progress("missing").is_err());
    }

    #[test]
    fn concurrent_create_sees_one_record() {
        let registry = WorkflowRegistry::new();
        let barrier = std::sync::Arc::new(std::sync::Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    let task = registry.create(Some("wf"), Some(&format!("topic-{i}")));
                    registry
                        .transition_with(
                            "wf",
                            WorkflowStage::FileReady,
                            None,
                            WorkflowUpdate::new().with_document_text(format!("doc-{i}")),
                        )
                        .unwrap();
                    task.focus_requirements
                })
            })
            .collect();
        let seen: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let stored = registry.get("wf").unwrap();
        assert_eq!(stored.stage, WorkflowStage::FileReady);
        assert!(stored.document_text.is_some());
        assert!(seen.iter().all(|focus| *focus == stored.focus_requirements));
    }

    #[test]
    fn snapshot_errors_are_reported() {
        let mut bad = std::collections::HashMap::new();
        bad.insert((1u8, 2u8), "value");
        assert!(matches!(snapshot(&bad), Err(WorkflowError::Snapshot(_))));
        assert!(matches!(
            registry_with_task().to_json("wf"),
            Ok(serde_json::Value::Object(_))
        ));
    }

    fn registry_with_task() -> WorkflowRegistry {
        let registry = WorkflowRegistry::new();
        registry.create(Some("wf"), None);
        registry
    }
}
