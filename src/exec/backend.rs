// src/exec/backend.rs

//! Pluggable launcher backend abstraction.
//!
//! The runtime talks to a `LauncherBackend` instead of a raw mpsc sender.
//! This makes it easy to swap in a fake launcher in tests while keeping the
//! production implementation in [`command`](crate::exec::command).
//!
//! - `SolverLauncher` is the default implementation. It wraps the launcher
//!   loop and forwards scheduled tasks over an mpsc channel.
//! - Tests can provide their own `LauncherBackend` that records which tasks
//!   were dispatched, fabricates artifact files, and directly emits
//!   `TaskCompleted` events.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;

use crate::engine::SchedulerEvent;
use crate::errors::{Error, Result};
use crate::flow::ScheduledTask;

use super::command::spawn_launcher;

/// Trait abstracting how scheduled tasks are executed.
pub trait LauncherBackend: Send {
    /// Dispatch the given tasks for execution.
    ///
    /// The implementation is free to:
    /// - spawn OS processes (production)
    /// - simulate completion and emit `SchedulerEvent`s (tests)
    fn launch_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Real launcher backend used in production.
pub struct SolverLauncher {
    tx: mpsc::Sender<ScheduledTask>,
}

impl SolverLauncher {
    /// Create a new launcher, wiring it to the given runtime event sender.
    ///
    /// This spawns the background launcher loop immediately. `command` is
    /// the solver invocation (e.g. `"abinit"` or `"mpirun -n 4 abinit"`).
    pub fn new(runtime_tx: mpsc::Sender<SchedulerEvent>, command: String) -> Self {
        let tx = spawn_launcher(runtime_tx, command);
        Self { tx }
    }
}

impl LauncherBackend for SolverLauncher {
    fn launch_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        // Clone the sender so the future doesn't borrow `self` across `await`.
        let tx = self.tx.clone();

        Box::pin(async move {
            for task in tasks {
                tx.send(task).await.map_err(Error::from)?;
            }
            Ok(())
        })
    }
}
