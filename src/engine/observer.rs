// src/engine/observer.rs

//! Hooks for whoever wants to watch a run (event bus, progress UI, audit log).
//!
//! Observers are passed to the orchestrator explicitly; there is no global
//! registry. All methods default to doing nothing.

use tracing::{info, warn};

use crate::dag::WavePlan;
use crate::engine::result::{Wave, WorkflowResult};
use crate::types::TaskOutcome;

pub trait WorkflowObserver: Send + Sync {
    /// A wave is about to be dispatched.
    fn on_wave_start(&self, _workflow_id: &str, _plan: &WavePlan) {}

    /// Called once per task after the whole wave has joined, in plan order.
    fn on_task_result(&self, _workflow_id: &str, _outcome: &TaskOutcome) {}

    /// Every task of the wave has an outcome.
    fn on_wave_end(&self, _workflow_id: &str, _wave: &Wave) {}

    /// The run reached a terminal state.
    fn on_workflow_end(&self, _result: &WorkflowResult) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl WorkflowObserver for NoopObserver {}

/// Logs every notification through `tracing` under the `wavedag::observer`
/// target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl WorkflowObserver for TracingObserver {
    fn on_wave_start(&self, workflow_id: &str, plan: &WavePlan) {
        info!(
            target: "wavedag::observer",
            workflow = %workflow_id,
            wave = plan.wave_number,
            tasks = ?plan.task_ids,
            "wave started"
        );
    }

    fn on_task_result(&self, workflow_id: &str, outcome: &TaskOutcome) {
        if outcome.success {
            info!(
                target: "wavedag::observer",
                workflow = %workflow_id,
                task = %outcome.task_id,
                duration_ms = outcome.duration_ms,
                "task succeeded"
            );
        } else {
            warn!(
                target: "wavedag::observer",
                workflow = %workflow_id,
                task = %outcome.task_id,
                error = outcome.error.as_deref().unwrap_or("unknown"),
                "task failed"
            );
        }
    }

    fn on_wave_end(&self, workflow_id: &str, wave: &Wave) {
        let elapsed_ms = (wave.completed_at - wave.started_at).num_milliseconds();
        info!(
            target: "wavedag::observer",
            workflow = %workflow_id,
            wave = wave.wave_number,
            succeeded = wave.success_count,
            failed = wave.failure_count,
            elapsed_ms,
            "wave ended"
        );
    }

    fn on_workflow_end(&self, result: &WorkflowResult) {
        info!(
            target: "wavedag::observer",
            workflow = %result.workflow_id,
            state = %result.state,
            completed = result.steps_completed,
            failed = result.steps_failed,
            pruned = result.steps_pruned,
            total = result.steps_total,
            "workflow ended"
        );
    }
}
