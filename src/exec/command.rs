// src/exec/command.rs

//! Shell-command executor used by the `wavedag` binary.
//!
//! Each agent type maps to a command line from the workflow file. The task is
//! handed to that command through environment variables; its stdout becomes
//! the task output.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::exec::backend::{ExecFuture, ExecutorError, TaskExecutor, TaskOutput};
use crate::types::Task;

pub const ENV_TASK_ID: &str = "WAVEDAG_TASK_ID";
pub const ENV_AGENT_TYPE: &str = "WAVEDAG_AGENT_TYPE";
pub const ENV_TASK_DESCRIPTION: &str = "WAVEDAG_TASK_DESCRIPTION";

/// Runs `sh -c <cmd>` (or `cmd /C` on Windows) for each task, picking `cmd`
/// by the task's agent type.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    commands: Arc<HashMap<String, String>>,
    working_dir: Option<PathBuf>,
}

impl CommandExecutor {
    pub fn new(commands: HashMap<String, String>) -> Self {
        Self {
            commands: Arc::new(commands),
            working_dir: None,
        }
    }

    /// Run every command from `dir` instead of the current directory.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn command_for(&self, agent_type: &str) -> Option<&str> {
        self.commands.get(agent_type).map(String::as_str)
    }
}

impl TaskExecutor for CommandExecutor {
    fn execute(&self, task: Task) -> ExecFuture {
        let cmd = self.command_for(task.agent_type()).map(str::to_string);
        let working_dir = self.working_dir.clone();

        Box::pin(async move {
            let Some(cmd) = cmd else {
                return Err(ExecutorError::Unavailable(format!(
                    "no command configured for agent type '{}'",
                    task.agent_type()
                )));
            };

            let mut child = spawn_agent(&task, &cmd, working_dir)
                .map_err(|e| ExecutorError::Unavailable(format!("{e:#}")))?;

            wait_for_agent(&task, &mut child)
                .await
                .map_err(|e| ExecutorError::Failed(format!("{e:#}")))?
        })
    }
}

fn spawn_agent(
    task: &Task,
    cmd_line: &str,
    working_dir: Option<PathBuf>,
) -> Result<tokio::process::Child> {
    info!(
        task = %task.id(),
        agent_type = %task.agent_type(),
        cmd = %cmd_line,
        "starting agent process"
    );

    // Build a shell command appropriate for the platform.
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd_line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd_line);
        c
    };

    if let Some(dir) = working_dir {
        cmd.current_dir(dir);
    }

    // Killed on drop so a per-task timeout also stops the process.
    cmd.env(ENV_TASK_ID, task.id())
        .env(ENV_AGENT_TYPE, task.agent_type())
        .env(ENV_TASK_DESCRIPTION, task.description())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    cmd.spawn()
        .with_context(|| format!("spawning agent process for task '{}'", task.id()))
}

/// Wait for the agent to exit; the outer `Result` is an IO problem, the
/// inner one the task's own verdict.
async fn wait_for_agent(
    task: &Task,
    child: &mut tokio::process::Child,
) -> Result<std::result::Result<TaskOutput, ExecutorError>> {
    // Always consume stderr so buffers don't fill; log at debug.
    if let Some(stderr) = child.stderr.take() {
        let task_id = task.id().to_string();
        tokio::spawn(async move {
            let mut reader = BufReader::new(stderr);
            let mut line = Vec::new();
            while let Ok(n) = reader.read_until(b'\n', &mut line).await {
                if n == 0 {
                    break;
                }
                debug!(task = %task_id, "stderr: {}", String::from_utf8_lossy(&line).trim_end());
                line.clear();
            }
        });
    }

    // Agent output is not required to be UTF-8.
    let stdout_reader = child.stdout.take().map(|mut stdout| {
        let task_id = task.id().to_string();
        tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Err(e) = stdout.read_to_end(&mut buf).await {
                debug!(task = %task_id, error = %e, "stdout read ended early");
            }
            String::from_utf8_lossy(&buf).into_owned()
        })
    });

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for agent process of task '{}'", task.id()))?;

    let captured = match stdout_reader {
        Some(handle) => handle.await.unwrap_or_default(),
        None => String::new(),
    };

    let code = status.code().unwrap_or(-1);
    info!(
        task = %task.id(),
        exit_code = code,
        success = status.success(),
        "agent process exited"
    );

    if status.success() {
        let output = if captured.is_empty() { None } else { Some(captured) };
        Ok(Ok(output))
    } else {
        Ok(Err(ExecutorError::Failed(format!(
            "agent exited with code {code}"
        ))))
    }
}
