// src/engine/core.rs

//! Pure core scheduler state machine.
//!
//! This is a synchronous, deterministic core that consumes
//! [`SchedulerEvent`]s and produces:
//! - an updated flow state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for
//! reading events from channels, sending `ScheduledTask`s to the launcher
//! and handling Ctrl+C. The core has no channels and no Tokio types, so it
//! can be unit tested without any async machinery.
//!
//! The one blocking call the core makes is the probe run inside dynamic
//! work expansion: the rest of that work cannot be constructed until the
//! probe result exists.

use std::fmt;

use tracing::debug;

use crate::engine::{SchedulerEvent, SchedulerOptions};
use crate::errors::Result;
use crate::exec::ProbeRunner;
use crate::flow::{ArtifactRegistry, Flow, FlowStep, ScheduledTask};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Send these tasks to the launcher.
    DispatchTasks(Vec<ScheduledTask>),
    /// Write the flow state blob to disk.
    PersistFlow,
    /// Request that the process exits (flow done, or shutdown requested).
    RequestExit,
}

/// Decision returned by the core after handling a single event.
#[derive(Debug, Clone)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

/// Pure core scheduler state.
///
/// Owns the flow, the artifact registry and the probe runner; performs all
/// scheduling semantics synchronously.
pub struct CoreScheduler {
    flow: Flow,
    registry: ArtifactRegistry,
    probe: Box<dyn ProbeRunner>,
    options: SchedulerOptions,
}

impl fmt::Debug for CoreScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreScheduler")
            .field("flow", &self.flow)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl CoreScheduler {
    pub fn new(
        flow: Flow,
        registry: ArtifactRegistry,
        probe: Box<dyn ProbeRunner>,
        options: SchedulerOptions,
    ) -> Self {
        Self {
            flow,
            registry,
            probe,
            options,
        }
    }

    pub fn flow(&self) -> &Flow {
        &self.flow
    }

    /// Write the current flow state to its persisted blob.
    pub fn persist(&self) -> Result<()> {
        self.flow.save()
    }

    /// Build the flow (if not already built from a resumed state) and seed
    /// the initial dispatch.
    pub fn start(&mut self) -> Result<CoreStep> {
        self.flow.build(&self.registry)?;
        let step = self.flow.advance(&self.registry, self.probe.as_ref())?;
        Ok(self.step_from_flow(step))
    }

    /// Handle a single event, updating flow state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: SchedulerEvent) -> Result<CoreStep> {
        match event {
            SchedulerEvent::TaskCompleted { task, outcome } => {
                let step = self.flow.handle_completion(
                    task,
                    outcome,
                    &self.registry,
                    self.probe.as_ref(),
                )?;
                Ok(self.step_from_flow(step))
            }
            SchedulerEvent::ShutdownRequested => Ok(CoreStep {
                commands: vec![CoreCommand::PersistFlow],
                keep_running: false,
            }),
        }
    }

    fn step_from_flow(&self, step: FlowStep) -> CoreStep {
        debug!(
            ready = step.newly_ready.len(),
            failed = step.newly_failed.len(),
            finalized = step.newly_finalized.len(),
            done = step.flow_done,
            "core step"
        );

        let mut commands = Vec::new();
        if !step.newly_ready.is_empty() {
            commands.push(CoreCommand::DispatchTasks(step.newly_ready));
        }
        // Persist after every mutation so a crashed scheduler can resume.
        commands.push(CoreCommand::PersistFlow);

        let mut keep_running = true;
        if step.flow_done && self.options.exit_when_done {
            commands.push(CoreCommand::RequestExit);
            keep_running = false;
        }

        CoreStep {
            commands,
            keep_running,
        }
    }
}
