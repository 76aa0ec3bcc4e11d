// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::engine::{CoreCommand, CoreScheduler, SchedulerEvent};
use crate::errors::Result;
use crate::exec::LauncherBackend;
use crate::flow::ScheduledTask;

/// Drives the flow in response to [`SchedulerEvent`]s and delegates actual
/// process execution to a [`LauncherBackend`].
///
/// This is a pure IO shell around [`CoreScheduler`], which contains all the
/// scheduling semantics. This struct handles async IO: reading events from
/// channels and dispatching tasks to the launcher.
pub struct Runtime<L: LauncherBackend> {
    core: CoreScheduler,
    event_rx: mpsc::Receiver<SchedulerEvent>,
    launcher: L,
}

impl<L: LauncherBackend> fmt::Debug for Runtime<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<L: LauncherBackend> Runtime<L> {
    pub fn new(
        core: CoreScheduler,
        event_rx: mpsc::Receiver<SchedulerEvent>,
        launcher: L,
    ) -> Self {
        Self {
            core,
            event_rx,
            launcher,
        }
    }

    /// Main event loop.
    ///
    /// - Builds the flow and dispatches the initial ready set.
    /// - Consumes `SchedulerEvent`s and feeds them into the core.
    /// - Executes commands returned by the core (dispatch, persist, exit).
    pub async fn run(mut self) -> Result<()> {
        info!("abiflow runtime started");

        let step = self.core.start()?;
        let mut keep_running = step.keep_running;
        for command in step.commands {
            self.execute_command(command).await?;
        }

        while keep_running {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "runtime received event");

            let step = self.core.step(event)?;

            for command in step.commands {
                self.execute_command(command).await?;
            }

            if !step.keep_running {
                info!("core requested exit; stopping runtime");
                keep_running = false;
            }
        }

        info!("runtime exiting");
        Ok(())
    }

    /// Execute a single command from the core.
    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::DispatchTasks(tasks) => {
                self.dispatch(tasks).await?;
            }
            CoreCommand::PersistFlow => {
                self.core.persist()?;
            }
            CoreCommand::RequestExit => {
                // The core already returns keep_running=false alongside this
                // command; nothing more to do than note it.
                info!("core issued RequestExit command");
            }
        }
        Ok(())
    }

    async fn dispatch(&mut self, tasks: Vec<ScheduledTask>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }

        let names: Vec<_> = tasks.iter().map(|t| t.name.as_str()).collect();
        debug!(?names, "dispatching ready tasks to launcher");

        self.launcher.launch_ready_tasks(tasks).await
    }
}
