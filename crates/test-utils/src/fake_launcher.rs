use std::collections::HashSet;
use std::fs;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use abiflow::engine::{SchedulerEvent, TaskOutcome};
use abiflow::errors::Result;
use abiflow::exec::LauncherBackend;
use abiflow::flow::ScheduledTask;

/// A fake launcher that:
/// - records which tasks were "run"
/// - fabricates the expected artifact files (empty) for successful tasks
/// - immediately reports `TaskCompleted` for each scheduled task.
///
/// Tasks whose names were registered via [`failing`](Self::failing) report
/// `Failed(1)` and produce no artifacts.
pub struct FakeLauncher {
    runtime_tx: mpsc::Sender<SchedulerEvent>,
    executed: Arc<Mutex<Vec<String>>>,
    failing: HashSet<String>,
}

impl FakeLauncher {
    pub fn new(
        runtime_tx: mpsc::Sender<SchedulerEvent>,
        executed: Arc<Mutex<Vec<String>>>,
    ) -> Self {
        Self {
            runtime_tx,
            executed,
            failing: HashSet::new(),
        }
    }

    /// Make every run of the named task fail.
    pub fn failing(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }
}

impl LauncherBackend for FakeLauncher {
    fn launch_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);
        let failing = self.failing.clone();

        Box::pin(async move {
            for t in tasks {
                {
                    let mut guard = executed.lock().unwrap();
                    guard.push(t.name.clone());
                }

                let outcome = if failing.contains(&t.name) {
                    TaskOutcome::Failed(1)
                } else {
                    fabricate_artifacts(&t)?;
                    TaskOutcome::Success
                };

                tx.send(SchedulerEvent::TaskCompleted {
                    task: t.task,
                    outcome,
                })
                .await
                .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}

/// Write an empty file at every expected artifact location of a task, as
/// the real solver would.
pub fn fabricate_artifacts(task: &ScheduledTask) -> Result<()> {
    for path in &task.artifact_paths {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, b"")?;
    }
    Ok(())
}
