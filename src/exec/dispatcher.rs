// src/exec/dispatcher.rs

//! Concurrent fan-out of one wave to the executor.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::exec::backend::{ExecutorError, TaskExecutor};
use crate::types::{Task, TaskId, TaskOutcome};

/// Everything the orchestrator needs to know after a wave finished.
#[derive(Debug, Clone, Default)]
pub struct WaveDispatch {
    /// One outcome per dispatched task.
    pub outcomes: BTreeMap<TaskId, TaskOutcome>,
    /// First `ExecutorError::Unavailable` seen in the wave, if any.
    pub systemic_error: Option<String>,
}

/// Runs every task of a wave on its own Tokio task, at most
/// `max_concurrency` at a time, each bounded by `per_task_timeout`.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    max_concurrency: usize,
    per_task_timeout: Duration,
}

impl Dispatcher {
    /// `max_concurrency` is clamped to at least 1.
    pub fn new(max_concurrency: usize, per_task_timeout: Duration) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
            per_task_timeout,
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn per_task_timeout(&self) -> Duration {
        self.per_task_timeout
    }

    /// Execute `wave_tasks` concurrently and wait for every outcome.
    ///
    /// A failure, timeout or panic in one task never affects its siblings:
    /// each is turned into a failed [`TaskOutcome`] for that task alone.
    pub async fn dispatch_wave<E>(&self, wave_tasks: Vec<Task>, executor: Arc<E>) -> WaveDispatch
    where
        E: TaskExecutor + ?Sized,
    {
        let permits = Arc::new(Semaphore::new(self.max_concurrency));
        let mut handles: Vec<(TaskId, JoinHandle<(TaskOutcome, Option<String>)>)> =
            Vec::with_capacity(wave_tasks.len());

        for task in wave_tasks {
            let id = task.id().to_string();
            let permits = Arc::clone(&permits);
            let executor = Arc::clone(&executor);
            let limit = self.per_task_timeout;

            let handle = tokio::spawn(async move {
                let _permit = match permits.acquire_owned().await {
                    Ok(p) => p,
                    Err(_) => {
                        let outcome = TaskOutcome::failed(task.id(), "worker pool closed", 0);
                        return (outcome, None);
                    }
                };
                run_one(task, executor.as_ref(), limit).await
            });

            handles.push((id, handle));
        }

        let mut result = WaveDispatch::default();

        for (id, handle) in handles {
            let (outcome, systemic) = match handle.await {
                Ok(pair) => pair,
                Err(e) if e.is_panic() => {
                    warn!(task = %id, "executor panicked; recording task as failed");
                    (TaskOutcome::failed(&id, "executor panicked", 0), None)
                }
                Err(e) => {
                    warn!(task = %id, error = %e, "task execution aborted");
                    (TaskOutcome::failed(&id, format!("aborted: {e}"), 0), None)
                }
            };

            if result.systemic_error.is_none() {
                result.systemic_error = systemic;
            }
            result.outcomes.insert(id, outcome);
        }

        result
    }
}

/// Run one task under the timeout and classify the result.
async fn run_one<E>(
    task: Task,
    executor: &E,
    limit: Duration,
) -> (TaskOutcome, Option<String>)
where
    E: TaskExecutor + ?Sized,
{
    let id = task.id().to_string();
    debug!(task = %id, agent_type = %task.agent_type(), "dispatching task");

    let started = Instant::now();
    let res = timeout(limit, executor.execute(task)).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match res {
        Ok(Ok(output)) => {
            info!(task = %id, duration_ms = elapsed_ms, "task succeeded");
            (TaskOutcome::succeeded(id, output, elapsed_ms), None)
        }
        Ok(Err(ExecutorError::Failed(msg))) => {
            warn!(task = %id, duration_ms = elapsed_ms, error = %msg, "task failed");
            (TaskOutcome::failed(id, msg, elapsed_ms), None)
        }
        Ok(Err(err @ ExecutorError::Unavailable(_))) => {
            let msg = err.to_string();
            warn!(task = %id, error = %msg, "executor unavailable");
            (TaskOutcome::failed(id, msg.clone(), elapsed_ms), Some(msg))
        }
        Err(_) => {
            warn!(
                task = %id,
                timeout_ms = limit.as_millis() as u64,
                "task timed out"
            );
            (TaskOutcome::timed_out(id, elapsed_ms), None)
        }
    }
}
