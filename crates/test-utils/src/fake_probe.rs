use std::fs;
use std::path::{Path, PathBuf};

use abiflow::errors::{AbiflowError, Result};
use abiflow::exec::ProbeRunner;
use abiflow::input::AbinitInput;

/// A probe runner that writes a canned log instead of running a solver.
pub struct CannedProbe {
    log_text: String,
}

impl CannedProbe {
    pub fn new(log_text: impl Into<String>) -> Self {
        Self {
            log_text: log_text.into(),
        }
    }
}

impl ProbeRunner for CannedProbe {
    fn run_probe(&self, _name: &str, workdir: &Path, input: &AbinitInput) -> Result<PathBuf> {
        fs::create_dir_all(workdir)?;
        input.write_to(&workdir.join("run.abi"))?;

        let log = workdir.join("run.log");
        fs::write(&log, &self.log_text)?;
        Ok(log)
    }
}

/// A probe runner for flows that must never probe; any invocation is
/// reported as a task execution error.
pub struct NoProbe;

impl ProbeRunner for NoProbe {
    fn run_probe(&self, name: &str, _workdir: &Path, _input: &AbinitInput) -> Result<PathBuf> {
        Err(AbiflowError::TaskExecution {
            task: name.to_string(),
            reason: "no probe runner configured for this test".to_string(),
        })
    }
}
