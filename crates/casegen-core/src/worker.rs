//! Bounded worker
//!
//! Runs a future on its own task and races it against a deadline. On
//! timeout the task is detached, not aborted: the external call may still
//! finish in the background, its result is simply discarded.

use crate::error::WorkerError;
use std::future::Future;
use tokio::time::Instant;

/// Run `fut` on a dedicated task until `deadline`
///
/// # Errors
/// - `WorkerError::DeadlineElapsed` if the deadline passes first
/// - `WorkerError::Panicked` if the task panics
pub async fn run_until<F, T>(fut: F, deadline: Instant) -> Result<T, WorkerError>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let handle = tokio::spawn(fut);
    match tokio::time::timeout_at(deadline, handle).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(join_error)) => Err(WorkerError::Panicked(join_error.to_string())),
        // Dropping the JoinHandle detaches the task.
        Err(_) => Err(WorkerError::DeadlineElapsed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn completes_before_deadline() {
        let deadline = Instant::now() + Duration::from_secs(5);
        assert_eq!(run_until(async { 7 }, deadline).await, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_wins_over_hung_call() {
        let deadline = Instant::now() + Duration::from_secs(1800);
        let result = run_until(futures::future::pending::<()>(), deadline).await;
        assert_eq!(result, Err(WorkerError::DeadlineElapsed));
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_task_keeps_running() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();
        let deadline = Instant::now() + Duration::from_secs(1);
        let result = run_until(
            async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                flag.store(true, Ordering::SeqCst);
            },
            deadline,
        )
        .await;
        assert_eq!(result, Err(WorkerError::DeadlineElapsed));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn panic_is_reported() {
        let deadline = Instant::now() + Duration::from_secs(5);
        let result = run_until(
            async {
                let fail = true;
                assert!(!fail, "boom");
                1
            },
            deadline,
        )
        .await;
        assert!(matches!(result, Err(WorkerError::Panicked(_))));
    }
}
