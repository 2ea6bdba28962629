// src/types.rs

//! Task and workflow model shared by the resolver, dispatcher and engine.

use std::collections::HashSet;

use serde::Serialize;

use crate::errors::{Result, WavedagError};

/// Canonical task identifier type used throughout the crate.
pub type TaskId = String;

/// One unit of work plus the ids it must wait for.
///
/// `agent_type` and `description` are opaque to the orchestrator; they are
/// handed to the [`TaskExecutor`](crate::exec::TaskExecutor) unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    id: TaskId,
    agent_type: String,
    description: String,
    depends_on: Vec<TaskId>,
}

impl Task {
    pub fn new(
        id: impl Into<TaskId>,
        agent_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            agent_type: agent_type.into(),
            description: description.into(),
            depends_on: Vec::new(),
        }
    }

    /// Add dependencies, keeping first-seen order and dropping repeats.
    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskId>,
    {
        for dep in deps {
            let dep = dep.into();
            if !self.depends_on.contains(&dep) {
                self.depends_on.push(dep);
            }
        }
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn agent_type(&self) -> &str {
        &self.agent_type
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn depends_on(&self) -> &[TaskId] {
        &self.depends_on
    }
}

/// An ordered, immutable set of tasks forming one orchestration run.
#[derive(Debug, Clone)]
pub struct Workflow {
    workflow_id: String,
    tasks: Vec<Task>,
}

impl Workflow {
    /// Build a workflow, rejecting empty or duplicate task ids.
    ///
    /// Dependency references are *not* checked here; that is the resolver's
    /// job so the orchestrator can report it as a validation outcome.
    pub fn new(workflow_id: impl Into<String>, tasks: Vec<Task>) -> Result<Self> {
        let mut seen: HashSet<&str> = HashSet::with_capacity(tasks.len());
        for task in &tasks {
            if task.id.trim().is_empty() {
                return Err(WavedagError::InvalidTask(
                    "task id must not be empty".to_string(),
                ));
            }
            if !seen.insert(task.id.as_str()) {
                return Err(WavedagError::DuplicateTask(task.id.clone()));
            }
        }

        Ok(Self {
            workflow_id: workflow_id.into(),
            tasks,
        })
    }

    pub fn id(&self) -> &str {
        &self.workflow_id
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Result of one task execution as seen by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskOutcome {
    pub task_id: TaskId,
    pub success: bool,
    pub output: Option<String>,
    pub error: Option<String>,
    /// Wall-clock time spent executing (excludes waiting for a worker slot).
    pub duration_ms: u64,
}

impl TaskOutcome {
    pub const TIMEOUT: &'static str = "timeout";

    pub fn succeeded(task_id: impl Into<TaskId>, output: Option<String>, duration_ms: u64) -> Self {
        Self {
            task_id: task_id.into(),
            success: true,
            output,
            error: None,
            duration_ms,
        }
    }

    pub fn failed(task_id: impl Into<TaskId>, error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            task_id: task_id.into(),
            success: false,
            output: None,
            error: Some(error.into()),
            duration_ms,
        }
    }

    pub fn timed_out(task_id: impl Into<TaskId>, duration_ms: u64) -> Self {
        Self::failed(task_id, Self::TIMEOUT, duration_ms)
    }

    pub fn is_timeout(&self) -> bool {
        self.error.as_deref() == Some(Self::TIMEOUT)
    }
}
