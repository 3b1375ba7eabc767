//! Workflow storage
//!
//! All mutation goes through [`WorkflowStore::update`], which runs the
//! closure inside one critical section so readers never see a half-applied
//! change.

use super::task::WorkflowTask;
use crate::error::WorkflowError;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Mutation applied under the store lock
pub type TaskMutation<'a> = &'a mut dyn FnMut(&mut WorkflowTask) -> Result<(), WorkflowError>;

/// Swappable backing for workflow records
pub trait WorkflowStore: Send + Sync {
    /// Insert or replace a task
    fn insert(&self, task: WorkflowTask);

    /// Existing task `id`, or the one built by `make`, inserted under the
    /// same lock
    fn get_or_insert_with(&self, id: &str, make: &mut dyn FnMut() -> WorkflowTask) -> WorkflowTask;

    /// Snapshot of a task
    fn get(&self, id: &str) -> Option<WorkflowTask>;

    /// Apply `mutation` atomically and return the resulting snapshot
    ///
    /// # Errors
    /// Returns `WorkflowError::NotFound` for an unknown id, or whatever the
    /// mutation returns. A failed mutation must leave the task unchanged.
    fn update(&self, id: &str, mutation: TaskMutation<'_>) -> Result<WorkflowTask, WorkflowError>;

    /// Remove a task
    fn remove(&self, id: &str) -> Option<WorkflowTask>;

    /// Number of tasks
    fn len(&self) -> usize;

    /// Check if the store is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local store, lost at exit
#[derive(Debug, Default)]
pub struct InMemoryWorkflowStore {
    tasks: Mutex<HashMap<String, WorkflowTask>>,
}

impl InMemoryWorkflowStore {
    /// Create new empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorkflowStore for InMemoryWorkflowStore {
    fn insert(&self, task: WorkflowTask) {
        self.tasks.lock().insert(task.id.clone(), task);
    }

    fn get_or_insert_with(&self, id: &str, make: &mut dyn FnMut() -> WorkflowTask) -> WorkflowTask {
        self.tasks
            .lock()
            .entry(id.to_string())
            .or_insert_with(make)
            .clone()
    }

    fn get(&self, id: &str) -> Option<WorkflowTask> {
        self.tasks.lock().get(id).cloned()
    }

    fn update(&self, id: &str, mutation: TaskMutation<'_>) -> Result<WorkflowTask, WorkflowError> {
        let mut tasks = self.tasks.lock();
        let task = tasks
            .get_mut(id)
            .ok_or_else(|| WorkflowError::NotFound(id.to_string()))?;
        let mut draft = task.clone();
        mutation(&mut draft)?;
        *task = draft.clone();
        Ok(draft)
    }

    fn remove(&self, id: &str) -> Option<WorkflowTask> {
        self.tasks.lock().remove(id)
    }

    fn len(&self) -> usize {
        self.tasks.lock().len()
    }
}
