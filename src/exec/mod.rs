// src/exec/mod.rs

//! External process execution.
//!
//! - [`backend`] defines the pluggable launcher abstraction the runtime
//!   talks to, plus the production implementation.
//! - [`command`] spawns and supervises the actual solver processes.
//! - [`probe`] runs the synchronous dry-run probes that dynamic works need
//!   before they can be populated.

pub mod backend;
pub mod command;
pub mod probe;

pub use backend::{LauncherBackend, SolverLauncher};
pub use command::spawn_launcher;
pub use probe::{ProbeRunner, SolverProbeRunner};
