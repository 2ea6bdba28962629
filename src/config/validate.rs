// src/config/validate.rs

use std::collections::HashSet;

use crate::config::model::{RawWorkflowFile, WorkflowFile};
use crate::errors::{Result, WavedagError};

impl TryFrom<RawWorkflowFile> for WorkflowFile {
    type Error = WavedagError;

    fn try_from(raw: RawWorkflowFile) -> std::result::Result<Self, Self::Error> {
        validate_config(&raw)?;
        Ok(WorkflowFile::new_unchecked(raw))
    }
}

/// Semantic checks on a freshly parsed workflow file.
pub fn validate_config(cfg: &RawWorkflowFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    validate_workflow_section(cfg)?;
    validate_task_ids(cfg)?;
    validate_agents(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawWorkflowFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(WavedagError::ConfigError(
            "workflow file must contain at least one [[task]] entry".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawWorkflowFile) -> Result<()> {
    if cfg.config.max_concurrency == 0 {
        return Err(WavedagError::ConfigError(
            "[config].max_concurrency must be >= 1 (got 0)".to_string(),
        ));
    }

    if cfg.config.per_task_timeout_secs == 0 {
        return Err(WavedagError::ConfigError(
            "[config].per_task_timeout_secs must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(())
}

fn validate_workflow_section(cfg: &RawWorkflowFile) -> Result<()> {
    if cfg.workflow.id.trim().is_empty() {
        return Err(WavedagError::ConfigError(
            "[workflow].id must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_task_ids(cfg: &RawWorkflowFile) -> Result<()> {
    let mut seen = HashSet::with_capacity(cfg.task.len());

    for (idx, task) in cfg.task.iter().enumerate() {
        if task.id.trim().is_empty() {
            return Err(WavedagError::InvalidTask(format!(
                "[[task]] #{} has an empty id",
                idx + 1
            )));
        }
        if !seen.insert(task.id.as_str()) {
            return Err(WavedagError::DuplicateTask(task.id.clone()));
        }
    }
    Ok(())
}

fn validate_agents(cfg: &RawWorkflowFile) -> Result<()> {
    for (agent, agent_cfg) in cfg.agents.iter() {
        if agent_cfg.cmd.trim().is_empty() {
            return Err(WavedagError::ConfigError(format!(
                "[agents.{agent}].cmd must not be empty"
            )));
        }
    }

    for task in cfg.task.iter() {
        if !cfg.agents.contains_key(&task.agent_type) {
            return Err(WavedagError::ConfigError(format!(
                "task '{}' uses agent_type '{}' which has no [agents.{}] section",
                task.id, task.agent_type, task.agent_type
            )));
        }
    }
    Ok(())
}
