// src/exec/probe.rs

//! Synchronous probe execution.
//!
//! A probe is a throw-away dry-run of the solver whose only purpose is to
//! emit the sub-problem list into its log. It runs to completion as a
//! blocking call: the rest of the dynamic work literally cannot be
//! constructed until the result is known, so there is nothing to overlap
//! it with.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use crate::errors::{AbiflowError, Result};
use crate::input::AbinitInput;

/// Runs a probe input to completion and hands back the log to parse.
///
/// Production uses [`SolverProbeRunner`]; tests substitute an
/// implementation that writes a canned log.
pub trait ProbeRunner: Send {
    fn run_probe(&self, name: &str, workdir: &Path, input: &AbinitInput) -> Result<PathBuf>;
}

/// Probe runner that invokes the real solver binary.
#[derive(Debug, Clone)]
pub struct SolverProbeRunner {
    command: String,
}

impl SolverProbeRunner {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl ProbeRunner for SolverProbeRunner {
    fn run_probe(&self, name: &str, workdir: &Path, input: &AbinitInput) -> Result<PathBuf> {
        fs::create_dir_all(workdir)?;

        let input_file = workdir.join("run.abi");
        let log_file = workdir.join("run.log");
        input.write_to(&input_file)?;

        let shell = format!(
            "cd '{}' && {} '{}' > '{}' 2>&1",
            workdir.display(),
            self.command,
            input_file.display(),
            log_file.display()
        );
        info!(probe = %name, cmd = %shell, "running probe");

        let status = Command::new("sh").arg("-c").arg(&shell).status()?;
        debug!(probe = %name, code = ?status.code(), "probe exited");

        if !status.success() {
            return Err(AbiflowError::TaskExecution {
                task: name.to_string(),
                reason: format!(
                    "probe process exited with code {}",
                    status.code().unwrap_or(-1)
                ),
            });
        }

        Ok(log_file)
    }
}
