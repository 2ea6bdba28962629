// src/engine/core.rs

//! Pure wave state machine.
//!
//! `WaveCore` owns one workflow run and all of its bookkeeping:
//! - validation and the `Pending -> Validating -> Running` transitions
//! - selecting the next wave from the tasks whose dependencies succeeded
//! - recording wave outcomes, fail-fast and systemic-error halts
//! - the final [`WorkflowResult`], including why unscheduled tasks were skipped
//!
//! It has **no** Tokio types, performs no IO and never awaits. The async
//! shell (`engine::runtime::Orchestrator`) calls it between waves, so the
//! completed/failed sets are only ever touched from one place.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::dag::resolver::{ready_tasks, validate_graph};
use crate::dag::{DagGraph, ValidationError, WavePlan};
use crate::engine::WorkflowState;
use crate::engine::result::{Wave, WorkflowResult};
use crate::exec::WaveDispatch;
use crate::types::{Task, TaskId, TaskOutcome, Workflow};

#[derive(Debug)]
pub struct WaveCore {
    workflow: Workflow,
    graph: DagGraph,
    fail_fast: bool,
    state: WorkflowState,
    /// Assigned to some wave (running or finished).
    scheduled: HashSet<TaskId>,
    completed: HashSet<TaskId>,
    failed: HashSet<TaskId>,
    waves: Vec<Wave>,
    errors: BTreeMap<String, String>,
}

impl WaveCore {
    pub fn new(workflow: Workflow, fail_fast: bool) -> Self {
        let graph = DagGraph::from_tasks(workflow.tasks());
        Self {
            workflow,
            graph,
            fail_fast,
            state: WorkflowState::Pending,
            scheduled: HashSet::new(),
            completed: HashSet::new(),
            failed: HashSet::new(),
            waves: Vec::new(),
            errors: BTreeMap::new(),
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    pub fn waves(&self) -> &[Wave] {
        &self.waves
    }

    /// Run validation. Returns `true` if the run may proceed (`Running`).
    ///
    /// On a cycle or missing dependency the run ends in
    /// `CircularDependency` with the details in `errors`; nothing is
    /// executed.
    pub fn validate(&mut self) -> bool {
        if self.state != WorkflowState::Pending {
            warn!(state = %self.state, "validate called twice; ignoring");
            return self.state == WorkflowState::Running;
        }

        self.state = WorkflowState::Validating;
        let validation = validate_graph(&self.graph);

        if validation.is_valid() {
            debug!(workflow = %self.workflow.id(), "validation passed");
            self.state = WorkflowState::Running;
            return true;
        }

        for err in validation.errors() {
            warn!(workflow = %self.workflow.id(), error = %err, "validation failed");
            let detail = match err {
                ValidationError::CircularDependency { path } => path.join(" -> "),
                other => other.to_string(),
            };
            self.errors
                .entry(err.category().to_string())
                .and_modify(|existing| {
                    existing.push_str("; ");
                    existing.push_str(&detail);
                })
                .or_insert(detail);
        }
        self.state = WorkflowState::CircularDependency;
        false
    }

    /// Select the next wave and mark its tasks as scheduled.
    ///
    /// Returns `None` (and finishes the run as `Completed`) once no pending
    /// task has all of its dependencies completed successfully.
    pub fn next_wave(&mut self) -> Option<WavePlan> {
        if self.state != WorkflowState::Running {
            return None;
        }

        let ready = self.ready_ids();

        if ready.is_empty() {
            self.finish(WorkflowState::Completed);
            return None;
        }

        self.scheduled.extend(ready.iter().cloned());
        let plan = WavePlan {
            wave_number: self.waves.len() + 1,
            task_ids: ready,
        };

        info!(
            workflow = %self.workflow.id(),
            wave = plan.wave_number,
            tasks = ?plan.task_ids,
            "scheduling wave"
        );

        Some(plan)
    }

    /// Clone the tasks named by `plan`, in plan order, for dispatch.
    pub fn tasks_for(&self, plan: &WavePlan) -> Vec<Task> {
        plan.task_ids
            .iter()
            .filter_map(|id| self.workflow.get(id).cloned())
            .collect()
    }

    /// Record the outcomes of a dispatched wave and apply the halt rules.
    pub fn record_wave(
        &mut self,
        plan: &WavePlan,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        mut dispatch: WaveDispatch,
    ) -> &Wave {
        let mut outcomes = Vec::with_capacity(plan.task_ids.len());

        for id in &plan.task_ids {
            let outcome = dispatch
                .outcomes
                .remove(id)
                .unwrap_or_else(|| TaskOutcome::failed(id, "no outcome reported", 0));

            if outcome.success {
                self.completed.insert(id.clone());
            } else {
                self.failed.insert(id.clone());
                let reason = outcome.error.clone().unwrap_or_else(|| "failed".to_string());
                debug!(
                    task = %id,
                    blocked = ?self.graph.descendants_of(id),
                    "task failed; dependents will not be scheduled"
                );
                self.errors.insert(format!("task_failed:{id}"), reason);
            }
            outcomes.push(outcome);
        }

        let failure_count = outcomes.iter().filter(|o| !o.success).count();
        let wave = Wave {
            wave_number: plan.wave_number,
            task_ids: plan.task_ids.clone(),
            started_at,
            completed_at,
            success_count: outcomes.len() - failure_count,
            failure_count,
            outcomes,
        };

        info!(
            workflow = %self.workflow.id(),
            wave = wave.wave_number,
            succeeded = wave.success_count,
            failed = wave.failure_count,
            "wave finished"
        );
        self.waves.push(wave);

        if self.state == WorkflowState::Running {
            if let Some(msg) = dispatch.systemic_error {
                self.errors.insert("executor_unavailable".to_string(), msg);
                self.finish(WorkflowState::Failed);
            } else if self.fail_fast && failure_count > 0 {
                self.errors.insert(
                    "fail_fast".to_string(),
                    format!("stopped after wave {} due to task failure", plan.wave_number),
                );
                self.finish(WorkflowState::Failed);
            }
        }

        // Just pushed above.
        &self.waves[self.waves.len() - 1]
    }

    /// Stop scheduling further waves. Only meaningful while `Running`.
    ///
    /// If nothing is left to schedule the run is already over, so it ends
    /// as `Completed` rather than `Cancelled`.
    pub fn cancel(&mut self) {
        if self.state != WorkflowState::Running {
            return;
        }
        if self.ready_ids().is_empty() {
            debug!(
                workflow = %self.workflow.id(),
                "cancellation requested with nothing left to schedule"
            );
            self.finish(WorkflowState::Completed);
            return;
        }
        info!(workflow = %self.workflow.id(), "cancellation requested; stopping between waves");
        self.errors.insert(
            "cancelled".to_string(),
            format!("cancelled after {} wave(s)", self.waves.len()),
        );
        self.finish(WorkflowState::Cancelled);
    }

    /// Snapshot of the run as a [`WorkflowResult`].
    pub fn result(&self) -> WorkflowResult {
        WorkflowResult {
            workflow_id: self.workflow.id().to_string(),
            state: self.state,
            steps_completed: self.completed.len(),
            steps_failed: self.failed.len(),
            steps_pruned: self.workflow.len() - self.scheduled.len(),
            steps_total: self.workflow.len(),
            waves_completed: self.waves.clone(),
            errors: self.errors.clone(),
        }
    }

    pub fn into_result(self) -> WorkflowResult {
        WorkflowResult {
            workflow_id: self.workflow.id().to_string(),
            state: self.state,
            steps_completed: self.completed.len(),
            steps_failed: self.failed.len(),
            steps_pruned: self.workflow.len() - self.scheduled.len(),
            steps_total: self.workflow.len(),
            waves_completed: self.waves,
            errors: self.errors,
        }
    }

    /// Unscheduled tasks whose dependencies all completed, in insertion order.
    fn ready_ids(&self) -> Vec<TaskId> {
        ready_tasks(
            self.workflow.tasks(),
            |id| self.completed.contains(id),
            |id| self.scheduled.contains(id),
        )
        .into_iter()
        .map(|t| t.id().to_string())
        .collect()
    }

    /// Enter a terminal state and explain every task that never ran.
    fn finish(&mut self, state: WorkflowState) {
        self.state = state;

        let skipped: Vec<(String, String)> = self
            .workflow
            .tasks()
            .iter()
            .filter(|t| !self.scheduled.contains(t.id()))
            .map(|t| {
                let reason = match self.failed_ancestor(t.id()) {
                    Some(dep) => format!("dependency '{dep}' failed"),
                    None => "run stopped before task was scheduled".to_string(),
                };
                (format!("skipped:{}", t.id()), reason)
            })
            .collect();

        for (key, reason) in skipped {
            debug!(workflow = %self.workflow.id(), %key, %reason, "task not executed");
            self.errors.insert(key, reason);
        }

        debug!(workflow = %self.workflow.id(), state = %self.state, "entered terminal state");
    }

    /// First failed task reachable through `depends_on`, nearest first.
    fn failed_ancestor(&self, id: &str) -> Option<&str> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut frontier: Vec<&str> = self.graph.dependencies_of(id);

        while !frontier.is_empty() {
            if let Some(hit) = frontier.iter().find(|d| self.failed.contains(**d)) {
                return Some(*hit);
            }
            let mut next = Vec::new();
            for dep in frontier {
                if seen.insert(dep) {
                    next.extend(self.graph.dependencies_of(dep));
                }
            }
            frontier = next;
        }

        None
    }
}
