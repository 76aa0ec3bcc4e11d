// src/engine/mod.rs

//! Scheduling engine.
//!
//! This module ties together:
//! - the flow (dependency propagation, continuation firing, persistence)
//! - the launcher backend that actually runs solver processes
//! - the main runtime event loop that reacts to:
//!   - task completion events
//!   - external cancellation
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`]. The core performs no in-process concurrency:
//! on each event it computes the set of tasks whose dependencies are
//! satisfied and hands that set to the launcher. Actual parallelism happens
//! at the OS-process level, outside this module.

pub use crate::types::TaskOutcome;

/// Events flowing into the runtime from launchers and signal handlers.
#[derive(Debug, Clone)]
pub enum SchedulerEvent {
    /// A task process finished (or was cancelled) with a concrete outcome.
    TaskCompleted {
        task: crate::flow::TaskId,
        outcome: TaskOutcome,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C). State is persisted
    /// before the loop exits, so a restarted scheduler resumes from here.
    ShutdownRequested,
}

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerOptions {
    /// If true, exit the runtime once every work is finalized, failed or
    /// blocked. A long-lived daemon would set this to false and keep
    /// polling for external events.
    pub exit_when_done: bool,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            exit_when_done: true,
        }
    }
}

pub mod core;
pub mod runtime;

pub use self::core::{CoreCommand, CoreScheduler, CoreStep};
pub use runtime::Runtime;
