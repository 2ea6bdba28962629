// src/dag/resolver.rs

//! Validation and wave partitioning over a flat task list.
//!
//! Both entry points are pure functions of their input: no logging of
//! results, no shared state, same answer on every call.

use std::collections::HashSet;
use std::fmt;

use thiserror::Error;

use crate::dag::graph::DagGraph;
use crate::types::{Task, TaskId};

/// Structural problem found in a task set before execution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("task '{task_id}' depends on unknown task '{missing_id}'")]
    MissingDependency { task_id: TaskId, missing_id: TaskId },

    #[error("circular dependency: {}", .path.join(" -> "))]
    CircularDependency { path: Vec<TaskId> },
}

impl ValidationError {
    /// Key used for this error in `WorkflowResult::errors`.
    pub fn category(&self) -> &'static str {
        match self {
            ValidationError::MissingDependency { .. } => "missing_dependency",
            ValidationError::CircularDependency { .. } => "circular_dependency",
        }
    }
}

/// Outcome of [`validate`]: empty means the task set is runnable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn has_cycle(&self) -> bool {
        self.errors
            .iter()
            .any(|e| matches!(e, ValidationError::CircularDependency { .. }))
    }

    /// First error as a `Result`, for callers that only need pass/fail.
    pub fn into_result(self) -> Result<(), ValidationError> {
        match self.errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.is_empty() {
            return write!(f, "valid");
        }
        let msgs: Vec<String> = self.errors.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", msgs.join("; "))
    }
}

/// One layer of the precomputed wave partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WavePlan {
    /// 1-based.
    pub wave_number: usize,
    pub task_ids: Vec<TaskId>,
}

/// Check that every dependency exists and that there are no cycles.
///
/// All dangling references are reported (in task order). Cycle detection
/// only considers references that resolve, and reports at most one cycle
/// path.
pub fn validate(tasks: &[Task]) -> ValidationResult {
    let graph = DagGraph::from_tasks(tasks);
    validate_graph(&graph)
}

pub(crate) fn validate_graph(graph: &DagGraph) -> ValidationResult {
    let mut errors: Vec<ValidationError> = graph
        .missing_dependencies()
        .iter()
        .map(|(task_id, missing_id)| ValidationError::MissingDependency {
            task_id: task_id.clone(),
            missing_id: missing_id.clone(),
        })
        .collect();

    if let Some(path) = graph.find_cycle() {
        errors.push(ValidationError::CircularDependency { path });
    }

    ValidationResult { errors }
}

/// Greedy breadth-first layering of `tasks` into waves.
///
/// Each wave holds every not-yet-scheduled task whose dependencies were all
/// scheduled in earlier waves, in insertion order. If tasks remain but none
/// is ready the input was never validated; the structural problem is
/// reported instead of looping.
pub fn compute_waves(tasks: &[Task]) -> Result<Vec<WavePlan>, ValidationError> {
    let mut scheduled: HashSet<&str> = HashSet::with_capacity(tasks.len());
    let mut waves = Vec::new();

    while scheduled.len() < tasks.len() {
        let ready: Vec<&Task> = ready_tasks(
            tasks,
            |id| scheduled.contains(id),
            |id| scheduled.contains(id),
        );

        if ready.is_empty() {
            return Err(stuck_error(tasks, &scheduled));
        }

        for task in &ready {
            scheduled.insert(task.id());
        }
        waves.push(WavePlan {
            wave_number: waves.len() + 1,
            task_ids: ready.iter().map(|t| t.id().to_string()).collect(),
        });
    }

    Ok(waves)
}

/// Tasks not yet scheduled whose every dependency satisfies `is_done`,
/// in insertion order.
///
/// `compute_waves` treats "scheduled in a prior wave" as done; the
/// orchestrator treats only "completed successfully" as done, which is what
/// prunes the dependents of failed tasks.
pub(crate) fn ready_tasks<'a>(
    tasks: &'a [Task],
    is_done: impl Fn(&str) -> bool,
    is_scheduled: impl Fn(&str) -> bool,
) -> Vec<&'a Task> {
    tasks
        .iter()
        .filter(|t| !is_scheduled(t.id()))
        .filter(|t| t.depends_on().iter().all(|d| is_done(d.as_str())))
        .collect()
}

fn stuck_error(tasks: &[Task], scheduled: &HashSet<&str>) -> ValidationError {
    let graph = DagGraph::from_tasks(tasks);

    if let Some((task_id, missing_id)) = graph.missing_dependencies().first() {
        return ValidationError::MissingDependency {
            task_id: task_id.clone(),
            missing_id: missing_id.clone(),
        };
    }

    let path = graph.find_cycle().unwrap_or_else(|| {
        tasks
            .iter()
            .map(|t| t.id())
            .filter(|id| !scheduled.contains(id))
            .map(str::to_string)
            .collect()
    });
    ValidationError::CircularDependency { path }
}
