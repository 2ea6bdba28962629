// src/config/model.rs

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use serde::Deserialize;

use crate::engine::{DEFAULT_MAX_CONCURRENCY, DEFAULT_PER_TASK_TIMEOUT_SECS, OrchestratorConfig};
use crate::errors::Result;
use crate::types::{Task, Workflow};

/// Workflow file exactly as deserialized from TOML, before validation.
///
/// ```toml
/// [config]
/// max_concurrency = 4
/// fail_fast = false
/// per_task_timeout_secs = 300
///
/// [workflow]
/// id = "release"
///
/// [agents.developer]
/// cmd = "./agents/dev.sh"
///
/// [[task]]
/// id = "A"
/// agent_type = "developer"
/// description = "write code"
/// depends_on = []
/// ```
///
/// Every section is optional at parse time; [`WorkflowFile`] is the
/// validated form the rest of the crate uses.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawWorkflowFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub workflow: WorkflowSection,

    /// `[agents.<agent_type>]` tables, keyed by agent type.
    #[serde(default)]
    pub agents: BTreeMap<String, AgentConfig>,

    /// `[[task]]` entries, in file order. File order is the tie-break order
    /// within a wave.
    #[serde(default)]
    pub task: Vec<TaskConfig>,
}

/// `[config]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigSection {
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    #[serde(default)]
    pub fail_fast: bool,

    #[serde(default = "default_per_task_timeout_secs")]
    pub per_task_timeout_secs: u64,
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

fn default_per_task_timeout_secs() -> u64 {
    DEFAULT_PER_TASK_TIMEOUT_SECS
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            fail_fast: false,
            per_task_timeout_secs: default_per_task_timeout_secs(),
        }
    }
}

/// `[workflow]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowSection {
    #[serde(default = "default_workflow_id")]
    pub id: String,
}

fn default_workflow_id() -> String {
    "workflow".to_string()
}

impl Default for WorkflowSection {
    fn default() -> Self {
        Self {
            id: default_workflow_id(),
        }
    }
}

/// `[agents.<agent_type>]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Shell command run once per task of this agent type.
    pub cmd: String,
}

/// One `[[task]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskConfig {
    pub id: String,
    pub agent_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

/// Validated workflow file.
///
/// Only constructed through `TryFrom<RawWorkflowFile>` (see
/// `config::validate`), so the invariants checked there always hold.
/// Dependency references and cycles are *not* checked here; the resolver
/// reports those as the run's validation outcome.
#[derive(Debug, Clone)]
pub struct WorkflowFile {
    config: ConfigSection,
    workflow: WorkflowSection,
    agents: BTreeMap<String, AgentConfig>,
    tasks: Vec<TaskConfig>,
}

impl WorkflowFile {
    pub(crate) fn new_unchecked(raw: RawWorkflowFile) -> Self {
        Self {
            config: raw.config,
            workflow: raw.workflow,
            agents: raw.agents,
            tasks: raw.task,
        }
    }

    pub fn config(&self) -> &ConfigSection {
        &self.config
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow.id
    }

    pub fn agents(&self) -> &BTreeMap<String, AgentConfig> {
        &self.agents
    }

    pub fn tasks(&self) -> &[TaskConfig] {
        &self.tasks
    }

    /// Orchestrator options from `[config]`.
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            max_concurrency: self.config.max_concurrency,
            fail_fast: self.config.fail_fast,
            per_task_timeout: Duration::from_secs(self.config.per_task_timeout_secs),
        }
    }

    /// Agent type -> shell command, as consumed by `CommandExecutor`.
    pub fn agent_commands(&self) -> HashMap<String, String> {
        self.agents
            .iter()
            .map(|(agent, cfg)| (agent.clone(), cfg.cmd.clone()))
            .collect()
    }

    /// Build the in-memory [`Workflow`], preserving file order.
    pub fn to_workflow(&self) -> Result<Workflow> {
        let tasks = self
            .tasks
            .iter()
            .map(|t| {
                Task::new(&t.id, &t.agent_type, &t.description)
                    .with_dependencies(t.depends_on.iter().cloned())
            })
            .collect();
        Workflow::new(self.workflow.id.clone(), tasks)
    }
}
