// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{WorkflowFile, load_and_validate};
use crate::dag::{DagGraph, compute_waves};
use crate::engine::{
    Orchestrator, OrchestratorConfig, TracingObserver, WorkflowResult, WorkflowState, cancel_pair,
};
use crate::exec::CommandExecutor;
use crate::types::Workflow;

pub use crate::engine::execute_workflow;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - workflow file loading
/// - CLI overrides of `[config]`
/// - the command executor and orchestrator
/// - Ctrl-C handling (cancel between waves)
/// - the optional JSON report
///
/// Returns the terminal state; the binary maps anything but `Completed` to
/// a non-zero exit code.
pub async fn run(args: CliArgs) -> Result<WorkflowState> {
    let workflow_path = args.workflow.clone();
    let file = load_and_validate(&workflow_path)
        .with_context(|| format!("failed to load workflow file {}", workflow_path.display()))?;

    let workflow = file.to_workflow()?;
    let config = apply_overrides(file.orchestrator_config(), &args);

    if args.dry_run {
        return Ok(print_dry_run(&file, &workflow, &config));
    }

    let executor = CommandExecutor::new(file.agent_commands())
        .with_working_dir(workflow_root_dir(&workflow_path));

    // Ctrl-C → stop after the current wave.
    let (cancel_handle, cancel_signal) = cancel_pair();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            return;
        }
        info!("Ctrl+C received; finishing current wave");
        cancel_handle.cancel();
    });

    let orchestrator = Orchestrator::new(config, Arc::new(executor))
        .with_observer(Arc::new(TracingObserver))
        .with_cancel_signal(cancel_signal);
    debug!(?orchestrator, "orchestrator ready");

    let result = orchestrator.execute(workflow).await;

    print_summary(&result);

    if let Some(path) = args.report.as_deref() {
        write_report(&result, path)?;
        info!(path = %path.display(), "wrote JSON report");
    }

    Ok(result.state)
}

fn apply_overrides(mut config: OrchestratorConfig, args: &CliArgs) -> OrchestratorConfig {
    if args.fail_fast {
        config.fail_fast = true;
    }
    if let Some(n) = args.max_concurrency {
        config.max_concurrency = usize::try_from(n).unwrap_or(usize::MAX);
    }
    if let Some(secs) = args.timeout_secs {
        config.per_task_timeout = Duration::from_secs(secs);
    }
    config
}

/// Agent commands run relative to the directory holding the workflow file.
fn workflow_root_dir(workflow_path: &Path) -> PathBuf {
    match workflow_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Serialize `result` as pretty JSON to `path`.
pub fn write_report(result: &WorkflowResult, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(result).map_err(errors::WavedagError::from)?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write report to {}", path.display()))?;
    Ok(())
}

/// Print agents, tasks and the wave plan without executing anything.
fn print_dry_run(
    file: &WorkflowFile,
    workflow: &Workflow,
    config: &OrchestratorConfig,
) -> WorkflowState {
    println!("wavedag dry-run: workflow '{}'", file.workflow_id());
    println!("  config.max_concurrency = {}", config.max_concurrency);
    println!("  config.fail_fast = {}", config.fail_fast);
    println!(
        "  config.per_task_timeout_secs = {}",
        config.per_task_timeout.as_secs()
    );
    println!();

    println!("agents ({}):", file.agents().len());
    for (name, agent) in file.agents().iter() {
        println!("  - {name}: {}", agent.cmd);
    }
    println!();

    let graph = DagGraph::from_tasks(workflow.tasks());

    println!("tasks ({}):", workflow.len());
    for task in workflow.tasks() {
        println!("  - {} [{}]", task.id(), task.agent_type());
        if !task.description().is_empty() {
            println!("      description: {}", task.description());
        }
        if !task.depends_on().is_empty() {
            println!("      depends_on: {:?}", task.depends_on());
        }
        let unblocks = graph.dependents_of(task.id());
        if !unblocks.is_empty() {
            println!("      unblocks: {unblocks:?}");
        }
    }
    println!();

    let state = match compute_waves(workflow.tasks()) {
        Ok(waves) => {
            println!("waves ({}):", waves.len());
            for wave in &waves {
                println!("  {}: {}", wave.wave_number, wave.task_ids.join(", "));
            }
            WorkflowState::Completed
        }
        Err(err) => {
            println!("invalid dependency graph: {err}");
            WorkflowState::CircularDependency
        }
    };

    debug!("dry-run complete (no execution)");
    state
}

fn print_summary(result: &WorkflowResult) {
    println!(
        "workflow '{}' {}: {} completed, {} failed, {} pruned of {} task(s) in {} wave(s)",
        result.workflow_id,
        result.state,
        result.steps_completed,
        result.steps_failed,
        result.steps_pruned,
        result.steps_total,
        result.waves_completed.len()
    );
    for (category, detail) in &result.errors {
        println!("  {category}: {detail}");
    }
}
