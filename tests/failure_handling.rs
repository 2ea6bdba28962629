// tests/failure_handling.rs

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use wavedag::engine::{OrchestratorConfig, WorkflowState, execute_workflow};
use wavedag_test_utils::builders::{WorkflowBuilder, fail_fast_config, test_config};
use wavedag_test_utils::fake_executor::FakeExecutor;
use wavedag_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn failed_task_prunes_its_dependents() -> TestResult {
    init_tracing();

    let wf = WorkflowBuilder::new("prune")
        .task("A", &[])
        .task("B", &["A"])
        .build();
    let exec = Arc::new(FakeExecutor::new().failing("A", "compile error"));

    let result = with_timeout(execute_workflow(wf, test_config(), exec.clone())).await;

    assert_eq!(result.state, WorkflowState::Completed);
    assert_eq!(result.steps_completed, 0);
    assert_eq!(result.steps_failed, 1);
    assert_eq!(result.steps_pruned, 1);
    assert_eq!(result.steps_total, 2);
    assert!(!result.is_success());

    assert_eq!(exec.executed(), vec!["A"]);
    assert_eq!(
        result.errors.get("task_failed:A").map(String::as_str),
        Some("compile error")
    );
    assert_eq!(
        result.errors.get("skipped:B").map(String::as_str),
        Some("dependency 'A' failed")
    );
    Ok(())
}

#[tokio::test]
async fn pruning_reaches_transitive_dependents_only() -> TestResult {
    init_tracing();

    // A -> B -> C, plus an independent X -> Y.
    let wf = WorkflowBuilder::new("transitive")
        .task("A", &[])
        .task("B", &["A"])
        .task("C", &["B"])
        .task("X", &[])
        .task("Y", &["X"])
        .build();
    let exec = Arc::new(FakeExecutor::new().failing("A", "boom"));

    let result = with_timeout(execute_workflow(wf, test_config(), exec.clone())).await;

    assert_eq!(result.state, WorkflowState::Completed);
    assert_eq!(exec.executed_set().len(), 3);
    assert!(exec.executed_set().contains("Y"));
    assert_eq!(result.steps_completed, 2);
    assert_eq!(result.steps_failed, 1);
    assert_eq!(result.steps_pruned, 2);
    assert_eq!(
        result.errors.get("skipped:C").map(String::as_str),
        Some("dependency 'A' failed")
    );
    Ok(())
}

#[tokio::test]
async fn fail_fast_stops_after_the_failing_wave() -> TestResult {
    init_tracing();

    let wf = WorkflowBuilder::new("fail-fast")
        .task("A", &[])
        .task("X", &[])
        .task("B", &["A"])
        .task("Y", &["X"])
        .build();
    let exec = Arc::new(FakeExecutor::new().failing("A", "boom"));

    let result = with_timeout(execute_workflow(wf, fail_fast_config(), exec.clone())).await;

    assert_eq!(result.state, WorkflowState::Failed);
    assert_eq!(result.waves_completed.len(), 1);
    // X shared the wave with A, so it still ran; Y did not.
    assert_eq!(result.steps_completed, 1);
    assert_eq!(result.steps_failed, 1);
    assert_eq!(result.steps_pruned, 2);
    assert!(result.errors.contains_key("fail_fast"));
    assert!(result.errors.contains_key("skipped:Y"));
    assert!(!exec.executed_set().contains("Y"));
    Ok(())
}

#[tokio::test]
async fn timeout_counts_as_failure_and_prunes() -> TestResult {
    init_tracing();

    let wf = WorkflowBuilder::new("timeout")
        .task("slow", &[])
        .task("after", &["slow"])
        .task("quick", &[])
        .build();
    let exec = Arc::new(FakeExecutor::new().delayed("slow", Duration::from_secs(30)));
    let config = OrchestratorConfig {
        per_task_timeout: Duration::from_millis(100),
        ..test_config()
    };

    let result = with_timeout(execute_workflow(wf, config, exec)).await;

    assert_eq!(result.state, WorkflowState::Completed);
    let slow = result.outcome_of("slow").ok_or("slow has no outcome")?;
    assert!(slow.is_timeout());
    assert!(result.outcome_of("quick").is_some_and(|o| o.success));
    assert!(result.errors.contains_key("skipped:after"));
    Ok(())
}

#[tokio::test]
async fn panicking_executor_only_fails_that_task() -> TestResult {
    init_tracing();

    let wf = WorkflowBuilder::new("panic")
        .task("A", &[])
        .task("B", &[])
        .task("C", &["B"])
        .build();
    let exec = Arc::new(FakeExecutor::new().panicking("A"));

    let result = with_timeout(execute_workflow(wf, test_config(), exec)).await;

    assert_eq!(result.state, WorkflowState::Completed);
    assert_eq!(
        result.errors.get("task_failed:A").map(String::as_str),
        Some("executor panicked")
    );
    assert_eq!(result.steps_completed, 2);
    assert_eq!(result.wave_of("C"), Some(2));
    Ok(())
}

#[tokio::test]
async fn unavailable_executor_halts_the_run() -> TestResult {
    init_tracing();

    let wf = WorkflowBuilder::new("outage")
        .task("A", &[])
        .task("B", &[])
        .task("C", &["B"])
        .build();
    let exec = Arc::new(FakeExecutor::new().unavailable("A", "agent pool offline"));

    let result = with_timeout(execute_workflow(wf, test_config(), exec.clone())).await;

    assert_eq!(result.state, WorkflowState::Failed);
    assert_eq!(result.waves_completed.len(), 1);
    assert!(
        result
            .errors
            .get("executor_unavailable")
            .is_some_and(|e| e.contains("agent pool offline"))
    );
    // C's dependency succeeded, but the run stopped before it was scheduled.
    assert_eq!(
        result.errors.get("skipped:C").map(String::as_str),
        Some("run stopped before task was scheduled")
    );
    assert!(!exec.executed_set().contains("C"));
    Ok(())
}
