// tests/wave_scheduling.rs

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use wavedag::dag::compute_waves;
use wavedag::engine::{OrchestratorConfig, WorkflowState, execute_workflow};
use wavedag_test_utils::builders::{WorkflowBuilder, test_config};
use wavedag_test_utils::fake_executor::FakeExecutor;
use wavedag_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn diamond_runs_in_three_waves() -> TestResult {
    init_tracing();

    let wf = WorkflowBuilder::new("diamond")
        .task("A", &[])
        .task("B", &["A"])
        .task("C", &["A"])
        .task("D", &["B", "C"])
        .build();
    let exec = Arc::new(FakeExecutor::new());

    let result = with_timeout(execute_workflow(wf, test_config(), exec.clone())).await;

    assert_eq!(result.state, WorkflowState::Completed);
    assert_eq!(result.steps_completed, 4);
    assert_eq!(result.steps_total, 4);
    assert!(result.errors.is_empty());

    let waves: Vec<Vec<String>> = result
        .waves_completed
        .iter()
        .map(|w| w.task_ids.clone())
        .collect();
    assert_eq!(waves, vec![vec!["A"], vec!["B", "C"], vec!["D"]]);

    assert_eq!(result.wave_of("D"), Some(3));
    assert_eq!(
        result.outcome_of("D").and_then(|o| o.output.as_deref()),
        Some("ok:D")
    );
    assert_eq!(exec.call_count(), 4);
    Ok(())
}

#[tokio::test]
async fn linear_chain_runs_one_task_per_wave() -> TestResult {
    init_tracing();

    let wf = WorkflowBuilder::new("chain")
        .task("A", &[])
        .task("B", &["A"])
        .task("C", &["B"])
        .build();
    let exec = Arc::new(FakeExecutor::new());

    let result = with_timeout(execute_workflow(wf, test_config(), exec.clone())).await;

    assert_eq!(result.state, WorkflowState::Completed);
    assert_eq!(result.waves_completed.len(), 3);
    assert!(result.waves_completed.iter().all(|w| w.task_ids.len() == 1));
    assert_eq!(exec.executed(), vec!["A", "B", "C"]);
    Ok(())
}

#[tokio::test]
async fn waves_follow_declaration_order_for_ties() -> TestResult {
    init_tracing();

    let wf = WorkflowBuilder::new("ties")
        .task("z", &[])
        .task("m", &[])
        .task("a", &["z"])
        .task("b", &[])
        .build();

    let planned = compute_waves(wf.tasks())?;
    let exec = Arc::new(FakeExecutor::new());
    let result = with_timeout(execute_workflow(wf, test_config(), exec)).await;

    assert_eq!(planned[0].task_ids, vec!["z", "m", "b"]);
    assert_eq!(planned[1].task_ids, vec!["a"]);

    // Runtime waves match the static plan when nothing fails.
    let ran: Vec<Vec<String>> = result
        .waves_completed
        .iter()
        .map(|w| w.task_ids.clone())
        .collect();
    let plan: Vec<Vec<String>> = planned.iter().map(|p| p.task_ids.clone()).collect();
    assert_eq!(ran, plan);
    Ok(())
}

#[tokio::test]
async fn wave_concurrency_respects_max_concurrency() -> TestResult {
    init_tracing();

    let ids = ["t0", "t1", "t2", "t3", "t4", "t5"];
    let wf = ids
        .iter()
        .fold(WorkflowBuilder::new("wide"), |b, id| b.task(id, &[]))
        .build();
    let exec = Arc::new(FakeExecutor::new().all_delayed(&ids, Duration::from_millis(30)));
    let config = OrchestratorConfig {
        max_concurrency: 2,
        ..test_config()
    };

    let result = with_timeout(execute_workflow(wf, config, exec.clone())).await;

    assert_eq!(result.state, WorkflowState::Completed);
    assert_eq!(result.waves_completed.len(), 1);
    assert_eq!(result.steps_completed, 6);
    assert!(exec.peak_concurrency() <= 2);
    assert!(exec.peak_concurrency() >= 1);
    Ok(())
}

#[tokio::test]
async fn wave_records_timestamps_and_counts() -> TestResult {
    init_tracing();

    let wf = WorkflowBuilder::new("stamps")
        .task("A", &[])
        .task("B", &[])
        .build();
    let exec = Arc::new(FakeExecutor::new().failing("B", "nope"));

    let result = with_timeout(execute_workflow(wf, test_config(), exec)).await;

    let wave = &result.waves_completed[0];
    assert!(wave.completed_at >= wave.started_at);
    assert_eq!(wave.success_count, 1);
    assert_eq!(wave.failure_count, 1);
    assert_eq!(wave.outcomes.len(), 2);
    assert_eq!(wave.outcomes[0].task_id, "A");
    assert_eq!(wave.outcomes[1].task_id, "B");
    Ok(())
}
