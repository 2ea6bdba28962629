#![allow(dead_code)]

use std::time::Duration;

use wavedag::config::{AgentConfig, RawWorkflowFile, TaskConfig, WorkflowFile};
use wavedag::engine::OrchestratorConfig;
use wavedag::types::{Task, Workflow};

/// Builder for an in-memory `Workflow`.
///
/// Every task uses agent type `"worker"` unless set otherwise.
pub struct WorkflowBuilder {
    id: String,
    tasks: Vec<Task>,
}

impl WorkflowBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            tasks: Vec::new(),
        }
    }

    /// Add a task with the given dependencies.
    pub fn task(mut self, id: &str, deps: &[&str]) -> Self {
        self.tasks.push(TaskBuilder::new(id).after_all(deps).build());
        self
    }

    pub fn with_task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn build(self) -> Workflow {
        Workflow::new(self.id, self.tasks).expect("Failed to build valid workflow from builder")
    }
}

/// Builder for `Task`.
pub struct TaskBuilder {
    id: String,
    agent_type: String,
    description: String,
    deps: Vec<String>,
}

impl TaskBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            agent_type: "worker".to_string(),
            description: format!("task {id}"),
            deps: Vec::new(),
        }
    }

    pub fn agent(mut self, agent_type: &str) -> Self {
        self.agent_type = agent_type.to_string();
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.deps.push(dep.to_string());
        self
    }

    pub fn after_all(mut self, deps: &[&str]) -> Self {
        self.deps.extend(deps.iter().map(|d| d.to_string()));
        self
    }

    pub fn build(self) -> Task {
        Task::new(self.id, self.agent_type, self.description).with_dependencies(self.deps)
    }
}

/// Builder for a validated `WorkflowFile`, bypassing TOML.
pub struct WorkflowFileBuilder {
    raw: RawWorkflowFile,
}

impl WorkflowFileBuilder {
    pub fn new(id: &str) -> Self {
        let mut raw = RawWorkflowFile::default();
        raw.workflow.id = id.to_string();
        Self { raw }
    }

    pub fn with_agent(mut self, agent_type: &str, cmd: &str) -> Self {
        self.raw.agents.insert(
            agent_type.to_string(),
            AgentConfig {
                cmd: cmd.to_string(),
            },
        );
        self
    }

    pub fn with_task(mut self, id: &str, agent_type: &str, deps: &[&str]) -> Self {
        self.raw.task.push(TaskConfig {
            id: id.to_string(),
            agent_type: agent_type.to_string(),
            description: String::new(),
            depends_on: deps.iter().map(|d| d.to_string()).collect(),
        });
        self
    }

    pub fn max_concurrency(mut self, n: usize) -> Self {
        self.raw.config.max_concurrency = n;
        self
    }

    pub fn fail_fast(mut self, val: bool) -> Self {
        self.raw.config.fail_fast = val;
        self
    }

    pub fn build(self) -> WorkflowFile {
        WorkflowFile::try_from(self.raw).expect("Failed to build valid workflow file from builder")
    }
}

/// Orchestrator options suitable for tests: short timeout, prune-on-failure.
pub fn test_config() -> OrchestratorConfig {
    OrchestratorConfig {
        max_concurrency: 4,
        fail_fast: false,
        per_task_timeout: Duration::from_secs(5),
    }
}

pub fn fail_fast_config() -> OrchestratorConfig {
    OrchestratorConfig {
        fail_fast: true,
        ..test_config()
    }
}
