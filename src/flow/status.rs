// src/flow/status.rs

//! Task status state machine and failure records.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a task.
///
/// Statuses only advance forward through the machine; the single exception
/// is the explicit restart-after-failure transition (`Error` back to
/// `Ready`), which the task applies together with a retry-counter bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Created with an input deck, not yet built.
    Init,
    /// Built (workdir exists, deck on disk), dependencies satisfied.
    Ready,
    /// Handed to the external launcher.
    Running,
    /// Process exited; artifacts and log not yet judged.
    Done,
    /// Terminal success: declared artifacts are available to consumers.
    Ok,
    /// Failure. Terminal once the retry budget is exhausted.
    Error,
}

impl TaskStatus {
    /// Position in the forward ordering of the machine.
    pub fn rank(self) -> u8 {
        match self {
            TaskStatus::Init => 0,
            TaskStatus::Ready => 1,
            TaskStatus::Running => 2,
            TaskStatus::Done => 3,
            TaskStatus::Ok => 4,
            TaskStatus::Error => 4,
        }
    }

    /// Process has exited (`Done` or a judged terminal state).
    pub fn has_exited(self) -> bool {
        self.rank() >= TaskStatus::Done.rank()
    }
}

/// Why a task attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The solver process exited with a non-zero code.
    ProcessFailed { exit_code: i32 },
    /// The process exited cleanly but a declared artifact was not produced.
    MissingArtifact,
    /// Externally cancelled while running.
    Cancelled,
}

/// Last captured failure of a task, kept in persisted state so a blocked
/// flow can be diagnosed without re-running anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub reason: FailureReason,
    pub message: String,
    /// How many restarts had been attempted when this failure was recorded.
    pub retries_attempted: u32,
}
