// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::engine::cancel::CancelSignal;
use crate::engine::observer::{NoopObserver, WorkflowObserver};
use crate::engine::result::WorkflowResult;
use crate::engine::{OrchestratorConfig, WaveCore};
use crate::exec::{Dispatcher, TaskExecutor};
use crate::types::Workflow;

/// Drives a [`WaveCore`] wave by wave and delegates task execution to a
/// [`TaskExecutor`] through the [`Dispatcher`].
///
/// This is the async IO shell around the core: all state transitions and
/// bookkeeping happen in `WaveCore`; this struct only awaits waves,
/// stamps times, checks cancellation and notifies the observer.
pub struct Orchestrator<E: TaskExecutor + ?Sized> {
    config: OrchestratorConfig,
    dispatcher: Dispatcher,
    executor: Arc<E>,
    observer: Arc<dyn WorkflowObserver>,
    cancel: Option<CancelSignal>,
}

impl<E: TaskExecutor + ?Sized> fmt::Debug for Orchestrator<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("cancellable", &self.cancel.is_some())
            .finish_non_exhaustive()
    }
}

impl<E: TaskExecutor + ?Sized> Orchestrator<E> {
    pub fn new(config: OrchestratorConfig, executor: Arc<E>) -> Self {
        Self {
            dispatcher: Dispatcher::new(config.max_concurrency, config.per_task_timeout),
            config,
            executor,
            observer: Arc::new(NoopObserver),
            cancel: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn WorkflowObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Cancellation is honoured between waves; a running wave always
    /// finishes.
    pub fn with_cancel_signal(mut self, signal: CancelSignal) -> Self {
        self.cancel = Some(signal);
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Validate and run `workflow` to a terminal state.
    ///
    /// Never returns an error: validation problems, task failures and
    /// executor outages are all reported through the returned
    /// [`WorkflowResult`].
    pub async fn execute(&self, workflow: Workflow) -> WorkflowResult {
        let workflow_id = workflow.id().to_string();
        info!(
            workflow = %workflow_id,
            tasks = workflow.len(),
            max_concurrency = self.config.max_concurrency,
            fail_fast = self.config.fail_fast,
            "workflow started"
        );

        let mut core = WaveCore::new(workflow, self.config.fail_fast);

        if core.validate() {
            loop {
                if self.is_cancelled() {
                    core.cancel();
                    break;
                }

                let Some(plan) = core.next_wave() else {
                    break;
                };

                self.observer.on_wave_start(&workflow_id, &plan);
                let tasks = core.tasks_for(&plan);
                debug!(wave = plan.wave_number, count = tasks.len(), "dispatching wave");

                let started_at = Utc::now();
                let dispatch = self
                    .dispatcher
                    .dispatch_wave(tasks, Arc::clone(&self.executor))
                    .await;
                let completed_at = Utc::now();

                for id in &plan.task_ids {
                    if let Some(outcome) = dispatch.outcomes.get(id) {
                        self.observer.on_task_result(&workflow_id, outcome);
                    }
                }
                let wave = core.record_wave(&plan, started_at, completed_at, dispatch);
                self.observer.on_wave_end(&workflow_id, wave);

                if core.state().is_terminal() {
                    break;
                }
            }
        }

        let result = core.into_result();
        info!(
            workflow = %result.workflow_id,
            state = %result.state,
            completed = result.steps_completed,
            failed = result.steps_failed,
            pruned = result.steps_pruned,
            total = result.steps_total,
            "workflow finished"
        );
        self.observer.on_workflow_end(&result);
        result
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelSignal::is_cancelled)
    }
}

/// Run `workflow` once with a fresh [`Orchestrator`] and no observer.
pub async fn execute_workflow<E>(
    workflow: Workflow,
    config: OrchestratorConfig,
    executor: Arc<E>,
) -> WorkflowResult
where
    E: TaskExecutor + ?Sized,
{
    Orchestrator::new(config, executor).execute(workflow).await
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::dag::WavePlan;
    use crate::engine::cancel::cancel_pair;
    use crate::engine::{Wave, WorkflowState};
    use crate::exec::{ExecutorError, TaskOutput, executor_fn};
    use crate::types::{Task, TaskOutcome};

    fn t(id: &str, deps: &[&str]) -> Task {
        Task::new(id, "worker", format!("task {id}")).with_dependencies(deps.iter().copied())
    }

    fn config() -> OrchestratorConfig {
        OrchestratorConfig {
            max_concurrency: 4,
            fail_fast: false,
            per_task_timeout: Duration::from_secs(5),
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl WorkflowObserver for Recorder {
        fn on_wave_start(&self, _workflow_id: &str, plan: &WavePlan) {
            self.events.lock().unwrap().push(format!("start:{}", plan.wave_number));
        }
        fn on_task_result(&self, _workflow_id: &str, outcome: &TaskOutcome) {
            self.events.lock().unwrap().push(format!("task:{}", outcome.task_id));
        }
        fn on_wave_end(&self, _workflow_id: &str, wave: &Wave) {
            self.events.lock().unwrap().push(format!("end:{}", wave.wave_number));
        }
        fn on_workflow_end(&self, result: &WorkflowResult) {
            self.events.lock().unwrap().push(format!("done:{}", result.state));
        }
    }

    #[tokio::test]
    async fn diamond_runs_in_three_waves() {
        let wf = Workflow::new(
            "diamond",
            vec![t("A", &[]), t("B", &["A"]), t("C", &["A"]), t("D", &["B", "C"])],
        )
        .unwrap();
        let exec = Arc::new(executor_fn(|_task: Task| async {
            Ok::<TaskOutput, ExecutorError>(None)
        }));

        let result = execute_workflow(wf, config(), exec).await;

        assert_eq!(result.state, WorkflowState::Completed);
        assert_eq!(result.steps_completed, 4);
        assert_eq!(result.waves_completed.len(), 3);
        assert_eq!(result.waves_completed[1].task_ids, vec!["B", "C"]);
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn observer_sees_events_in_order() {
        let wf = Workflow::new("obs", vec![t("A", &[]), t("B", &["A"])]).unwrap();
        let exec = Arc::new(executor_fn(|_task: Task| async {
            Ok::<TaskOutput, ExecutorError>(None)
        }));
        let recorder = Arc::new(Recorder::default());

        let result = Orchestrator::new(config(), exec)
            .with_observer(recorder.clone())
            .execute(wf)
            .await;

        assert_eq!(result.state, WorkflowState::Completed);
        let events = recorder.events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                "start:1", "task:A", "end:1", "start:2", "task:B", "end:2", "done:COMPLETED"
            ]
        );
    }

    #[tokio::test]
    async fn task_results_are_reported_in_plan_order_after_join() {
        let wf = Workflow::new("order", vec![t("A", &[]), t("B", &[])]).unwrap();
        let exec = Arc::new(executor_fn(|task: Task| async move {
            if task.id() == "A" {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            Ok::<TaskOutput, ExecutorError>(None)
        }));
        let recorder = Arc::new(Recorder::default());

        let result = Orchestrator::new(config(), exec)
            .with_observer(recorder.clone())
            .execute(wf)
            .await;

        assert_eq!(result.state, WorkflowState::Completed);
        let events = recorder.events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec!["start:1", "task:A", "task:B", "end:1", "done:COMPLETED"]
        );
    }

    #[tokio::test]
    async fn cycle_never_reaches_the_executor() {
        let wf = Workflow::new("cycle", vec![t("A", &["B"]), t("B", &["A"])]).unwrap();
        let calls = Arc::new(Mutex::new(0usize));
        let counter = Arc::clone(&calls);
        let exec = Arc::new(executor_fn(move |_task: Task| {
            *counter.lock().unwrap() += 1;
            async { Ok::<TaskOutput, ExecutorError>(None) }
        }));

        let result = execute_workflow(wf, config(), exec).await;

        assert_eq!(result.state, WorkflowState::CircularDependency);
        assert!(result.errors.contains_key("circular_dependency"));
        assert!(result.waves_completed.is_empty());
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn cancel_before_start_runs_nothing() {
        let wf = Workflow::new("cancel", vec![t("A", &[]), t("B", &["A"])]).unwrap();
        let exec = Arc::new(executor_fn(|_task: Task| async {
            Ok::<TaskOutput, ExecutorError>(None)
        }));
        let (handle, signal) = cancel_pair();
        handle.cancel();

        let result = Orchestrator::new(config(), exec)
            .with_cancel_signal(signal)
            .execute(wf)
            .await;

        assert_eq!(result.state, WorkflowState::Cancelled);
        assert_eq!(result.steps_pruned, 2);
        assert!(result.errors.contains_key("cancelled"));
    }

    #[tokio::test]
    async fn cancel_during_wave_stops_before_the_next() {
        let wf = Workflow::new("cancel", vec![t("A", &[]), t("B", &["A"])]).unwrap();
        let (handle, signal) = cancel_pair();
        let exec = Arc::new(executor_fn(move |_task: Task| {
            handle.cancel();
            async { Ok::<TaskOutput, ExecutorError>(None) }
        }));

        let result = Orchestrator::new(config(), exec)
            .with_cancel_signal(signal)
            .execute(wf)
            .await;

        assert_eq!(result.state, WorkflowState::Cancelled);
        assert_eq!(result.executed_task_ids(), vec!["A"]);
        assert_eq!(result.steps_completed, 1);
        assert!(result.errors.contains_key("skipped:B"));
    }

    #[tokio::test]
    async fn empty_workflow_completes_immediately() {
        let wf = Workflow::new("empty", Vec::new()).unwrap();
        let exec = Arc::new(executor_fn(|_task: Task| async {
            Ok::<TaskOutput, ExecutorError>(None)
        }));

        let result = execute_workflow(wf, config(), exec).await;

        assert_eq!(result.state, WorkflowState::Completed);
        assert_eq!(result.steps_total, 0);
        assert!(result.waves_completed.is_empty());
    }
}
