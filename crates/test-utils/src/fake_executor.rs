use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use wavedag::exec::{ExecFuture, ExecutorError, TaskExecutor};
use wavedag::types::Task;

#[derive(Debug, Clone)]
enum Script {
    Fail(String),
    Unavailable(String),
    Panic,
    Delay(Duration),
}

/// A fake executor that:
/// - records which tasks were "run", in call order
/// - succeeds immediately with output `"ok:<id>"` unless scripted otherwise
/// - tracks the peak number of tasks running at once
#[derive(Clone, Default)]
pub struct FakeExecutor {
    scripts: Arc<Mutex<HashMap<String, Script>>>,
    executed: Arc<Mutex<Vec<String>>>,
    running: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(self, id: &str, script: Script) -> Self {
        self.scripts.lock().unwrap().insert(id.to_string(), script);
        self
    }

    /// `id` reports `ExecutorError::Failed(msg)`.
    pub fn failing(self, id: &str, msg: &str) -> Self {
        self.script(id, Script::Fail(msg.to_string()))
    }

    /// `id` reports `ExecutorError::Unavailable(msg)`.
    pub fn unavailable(self, id: &str, msg: &str) -> Self {
        self.script(id, Script::Unavailable(msg.to_string()))
    }

    /// `id` panics inside the executor future.
    pub fn panicking(self, id: &str) -> Self {
        self.script(id, Script::Panic)
    }

    /// `id` sleeps for `delay` and then succeeds.
    pub fn delayed(self, id: &str, delay: Duration) -> Self {
        self.script(id, Script::Delay(delay))
    }

    /// Every task sleeps for `delay` unless scripted otherwise.
    pub fn all_delayed(self, ids: &[&str], delay: Duration) -> Self {
        ids.iter()
            .fold(self, |exec, id| exec.script(id, Script::Delay(delay)))
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    pub fn executed_set(&self) -> HashSet<String> {
        self.executed().into_iter().collect()
    }

    pub fn call_count(&self) -> usize {
        self.executed.lock().unwrap().len()
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

struct RunningGuard(Arc<AtomicUsize>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl TaskExecutor for FakeExecutor {
    fn execute(&self, task: Task) -> ExecFuture {
        let id = task.id().to_string();
        self.executed.lock().unwrap().push(id.clone());
        let script = self.scripts.lock().unwrap().get(&id).cloned();
        let running = Arc::clone(&self.running);
        let peak = Arc::clone(&self.peak);

        Box::pin(async move {
            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            let _guard = RunningGuard(running);

            match script {
                None => Ok(Some(format!("ok:{id}"))),
                Some(Script::Delay(d)) => {
                    tokio::time::sleep(d).await;
                    Ok(Some(format!("ok:{id}")))
                }
                Some(Script::Fail(msg)) => Err(ExecutorError::Failed(msg)),
                Some(Script::Unavailable(msg)) => Err(ExecutorError::Unavailable(msg)),
                Some(Script::Panic) => panic!("scripted panic in task {id}"),
            }
        })
    }
}
