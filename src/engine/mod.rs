// src/engine/mod.rs

//! Wave orchestration engine for wavedag.
//!
//! This module ties together:
//! - the dependency resolver (validation, next-wave selection)
//! - the dispatcher (concurrent execution of one wave)
//! - observers notified at wave and workflow boundaries
//! - cooperative cancellation between waves
//!
//! The pure state machine lives in [`core`]; the async shell that awaits
//! waves is implemented in [`runtime`].

use std::fmt;
use std::time::Duration;

use serde::Serialize;

/// State of one workflow run.
///
/// `Pending -> Validating -> Running -> {Completed, Failed,
/// CircularDependency, Cancelled}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowState {
    Pending,
    Validating,
    Running,
    /// Nothing left to schedule; failures (if any) only pruned dependents.
    Completed,
    /// Halted by fail-fast or a systemic executor error.
    Failed,
    /// Validation rejected the task set (cycle or missing dependency).
    CircularDependency,
    /// Caller requested cancellation; honoured between waves.
    Cancelled,
}

impl WorkflowState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            WorkflowState::Completed
                | WorkflowState::Failed
                | WorkflowState::CircularDependency
                | WorkflowState::Cancelled
        )
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkflowState::Pending => "PENDING",
            WorkflowState::Validating => "VALIDATING",
            WorkflowState::Running => "RUNNING",
            WorkflowState::Completed => "COMPLETED",
            WorkflowState::Failed => "FAILED",
            WorkflowState::CircularDependency => "CIRCULAR_DEPENDENCY",
            WorkflowState::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

/// Options controlling one orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Maximum number of tasks of one wave running at the same time.
    pub max_concurrency: usize,
    /// Stop the whole run on the first task failure instead of only pruning
    /// its dependents.
    pub fail_fast: bool,
    /// Upper bound on a single task execution.
    pub per_task_timeout: Duration,
}

pub const DEFAULT_MAX_CONCURRENCY: usize = 4;
pub const DEFAULT_PER_TASK_TIMEOUT_SECS: u64 = 300;

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            fail_fast: false,
            per_task_timeout: Duration::from_secs(DEFAULT_PER_TASK_TIMEOUT_SECS),
        }
    }
}

pub mod cancel;
pub mod core;
pub mod observer;
pub mod result;
pub mod runtime;

pub use cancel::{CancelHandle, CancelSignal, cancel_pair};
pub use self::core::WaveCore;
pub use observer::{NoopObserver, TracingObserver, WorkflowObserver};
pub use result::{Wave, WorkflowResult};
pub use runtime::{Orchestrator, execute_workflow};
