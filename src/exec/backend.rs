// src/exec/backend.rs

//! Pluggable task executor abstraction.
//!
//! The dispatcher talks to a `TaskExecutor` instead of knowing how agents
//! are run. Production code uses [`CommandExecutor`](super::CommandExecutor)
//! (one shell command per agent type); tests provide fakes that record which
//! tasks ran and script their outcomes.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::types::Task;

/// Error reported by an executor for a single task.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    /// The task ran and failed. Only its dependents are affected.
    #[error("{0}")]
    Failed(String),

    /// The executor layer itself is broken (no agent for the task, cannot
    /// spawn, backend down). The orchestrator stops the whole run.
    #[error("executor unavailable: {0}")]
    Unavailable(String),
}

/// Successful executor result: optional output payload.
pub type TaskOutput = Option<String>;

/// Boxed future returned by [`TaskExecutor::execute`].
///
/// It must be `'static` so the dispatcher can run it on its own Tokio task;
/// implementations clone whatever they need out of `&self`.
pub type ExecFuture = Pin<Box<dyn Future<Output = Result<TaskOutput, ExecutorError>> + Send>>;

/// Trait abstracting how a single task is actually performed.
pub trait TaskExecutor: Send + Sync + 'static {
    /// Execute one task. `agent_type` and `description` are passed through
    /// untouched; picking an implementation from them is up to the executor.
    fn execute(&self, task: Task) -> ExecFuture;
}

/// Adapter turning an async closure into a [`TaskExecutor`].
pub struct FnExecutor<F> {
    f: F,
}

/// Build a [`TaskExecutor`] from `Fn(Task) -> impl Future`.
pub fn executor_fn<F, Fut>(f: F) -> FnExecutor<F>
where
    F: Fn(Task) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<TaskOutput, ExecutorError>> + Send + 'static,
{
    FnExecutor { f }
}

impl<F, Fut> TaskExecutor for FnExecutor<F>
where
    F: Fn(Task) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<TaskOutput, ExecutorError>> + Send + 'static,
{
    fn execute(&self, task: Task) -> ExecFuture {
        Box::pin((self.f)(task))
    }
}
