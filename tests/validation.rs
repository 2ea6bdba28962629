// tests/validation.rs

use std::error::Error;
use std::sync::Arc;

use wavedag::dag::{ValidationError, compute_waves, validate};
use wavedag::engine::{WorkflowState, execute_workflow};
use wavedag::errors::WavedagError;
use wavedag::types::{Task, Workflow};
use wavedag_test_utils::builders::{TaskBuilder, WorkflowBuilder, test_config};
use wavedag_test_utils::fake_executor::FakeExecutor;
use wavedag_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn cycle_is_reported_and_nothing_runs() -> TestResult {
    init_tracing();

    let wf = WorkflowBuilder::new("cycle")
        .task("A", &["B"])
        .task("B", &["A"])
        .task("C", &[])
        .build();
    let exec = Arc::new(FakeExecutor::new());

    let result = with_timeout(execute_workflow(wf, test_config(), exec.clone())).await;

    assert_eq!(result.state, WorkflowState::CircularDependency);
    assert_eq!(exec.call_count(), 0);
    assert!(result.waves_completed.is_empty());
    assert_eq!(result.steps_completed, 0);

    let detail = result
        .errors
        .get("circular_dependency")
        .ok_or("missing circular_dependency entry")?;
    assert!(detail.contains('A') && detail.contains('B'));
    assert!(detail.contains(" -> "));
    Ok(())
}

#[tokio::test]
async fn missing_dependency_is_reported_and_nothing_runs() -> TestResult {
    init_tracing();

    let wf = WorkflowBuilder::new("missing")
        .task("A", &[])
        .task("X", &["nonexistent"])
        .build();
    let exec = Arc::new(FakeExecutor::new());

    let result = with_timeout(execute_workflow(wf, test_config(), exec.clone())).await;

    assert_eq!(result.state, WorkflowState::CircularDependency);
    assert_eq!(exec.call_count(), 0);
    assert!(result.waves_completed.is_empty());

    let detail = result
        .errors
        .get("missing_dependency")
        .ok_or("missing missing_dependency entry")?;
    assert!(detail.contains("'X'"));
    assert!(detail.contains("'nonexistent'"));
    Ok(())
}

#[test]
fn self_dependency_is_a_cycle() {
    let tasks = vec![TaskBuilder::new("A").after("A").build()];

    let report = validate(&tasks);

    assert!(!report.is_valid());
    assert!(report.has_cycle());
    assert_eq!(
        report.errors(),
        &[ValidationError::CircularDependency {
            path: vec!["A".to_string(), "A".to_string()]
        }]
    );
}

#[test]
fn validate_is_idempotent_and_does_not_mutate() {
    let tasks = vec![
        TaskBuilder::new("A").after("C").build(),
        TaskBuilder::new("B").after("A").build(),
        TaskBuilder::new("C").after("B").build(),
    ];
    let before = tasks.clone();

    let first = validate(&tasks);
    let second = validate(&tasks);

    assert_eq!(first, second);
    assert_eq!(tasks, before);
}

#[test]
fn compute_waves_refuses_invalid_sets() {
    let cyclic = vec![
        TaskBuilder::new("A").after("B").build(),
        TaskBuilder::new("B").after("A").build(),
    ];
    let err = compute_waves(&cyclic).unwrap_err();
    assert_eq!(err.category(), "circular_dependency");

    let dangling = vec![TaskBuilder::new("A").after("ghost").build()];
    let err = compute_waves(&dangling).unwrap_err();
    assert_eq!(
        err,
        ValidationError::MissingDependency {
            task_id: "A".to_string(),
            missing_id: "ghost".to_string()
        }
    );
}

#[test]
fn duplicate_task_ids_are_rejected_up_front() {
    let tasks = vec![Task::new("A", "dev", "one"), Task::new("A", "dev", "two")];

    let err = Workflow::new("dup", tasks).unwrap_err();

    assert!(matches!(err, WavedagError::DuplicateTask(ref id) if id == "A"));
}
