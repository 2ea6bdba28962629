// src/engine/result.rs

//! Read-only records handed back to the caller.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::engine::WorkflowState;
use crate::types::{TaskId, TaskOutcome};

/// One executed wave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Wave {
    /// 1-based.
    pub wave_number: usize,
    pub task_ids: Vec<TaskId>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub success_count: usize,
    pub failure_count: usize,
    /// Outcomes in the same order as `task_ids`.
    pub outcomes: Vec<TaskOutcome>,
}

impl Wave {
    pub fn contains(&self, id: &str) -> bool {
        self.task_ids.iter().any(|t| t == id)
    }
}

/// Final report of a workflow run, for every terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowResult {
    pub workflow_id: String,
    pub state: WorkflowState,
    pub steps_completed: usize,
    pub steps_failed: usize,
    /// Tasks never scheduled (failed ancestor, or the run stopped first).
    pub steps_pruned: usize,
    pub steps_total: usize,
    pub waves_completed: Vec<Wave>,
    /// Error category -> description, e.g. `"circular_dependency"`,
    /// `"task_failed:A"`, `"skipped:B"`.
    pub errors: BTreeMap<String, String>,
}

impl WorkflowResult {
    pub fn is_success(&self) -> bool {
        self.state == WorkflowState::Completed && self.steps_completed == self.steps_total
    }

    /// Ids of every task that was executed, in wave order.
    pub fn executed_task_ids(&self) -> Vec<&str> {
        self.waves_completed
            .iter()
            .flat_map(|w| w.task_ids.iter().map(String::as_str))
            .collect()
    }

    /// The wave a task ran in, if it ran.
    pub fn wave_of(&self, id: &str) -> Option<usize> {
        self.waves_completed
            .iter()
            .find(|w| w.contains(id))
            .map(|w| w.wave_number)
    }

    pub fn outcome_of(&self, id: &str) -> Option<&TaskOutcome> {
        self.waves_completed
            .iter()
            .flat_map(|w| w.outcomes.iter())
            .find(|o| o.task_id == id)
    }
}
