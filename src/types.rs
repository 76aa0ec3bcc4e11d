// src/types.rs

//! Small shared types used across the flow and engine layers.

use serde::{Deserialize, Serialize};

/// How strongly a consumer depends on a producer's artifact.
///
/// - `Hard`: the producer must reach terminal success (`Ok`) before the
///   consumer can run (default).
/// - `Soft`: the producer only needs to have exited (`Done` or later); the
///   consumer tolerates a failed producer and a soft edge never blocks
///   downstream work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepMode {
    Hard,
    Soft,
}

impl Default for DepMode {
    fn default() -> Self {
        DepMode::Hard
    }
}

/// Outcome of an external solver process, as reported to the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Process exited successfully; artifacts still get inspected before the
    /// task is judged `Ok`.
    Success,
    /// Process exited with a non-zero code.
    Failed(i32),
    /// Process was externally cancelled while running.
    Cancelled,
}

/// Default bound on automatic restarts of a failed task.
pub const DEFAULT_MAX_RETRIES: u32 = 2;
