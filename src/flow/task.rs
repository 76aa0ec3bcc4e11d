// src/flow/task.rs

//! One externally-executed solver invocation.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::Result;
use crate::flow::node::{Dependency, TaskId};
use crate::flow::registry::ArtifactRegistry;
use crate::flow::status::{FailureReason, FailureRecord, TaskStatus};
use crate::input::AbinitInput;

/// A single unit of work: an input deck, a working directory, a status and
/// the declared data edges to other nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskNode {
    pub id: TaskId,
    pub name: String,
    workdir: PathBuf,
    input: AbinitInput,
    status: TaskStatus,
    /// Declared dependencies on other nodes' artifacts.
    pub deps: Vec<Dependency>,
    /// Artifact kinds this task writes under `outdata/`.
    pub produces: Vec<String>,
    retry_count: u32,
    max_retries: u32,
    last_failure: Option<FailureRecord>,
    built: bool,
}

impl TaskNode {
    pub fn new(
        id: TaskId,
        name: String,
        workdir: PathBuf,
        input: AbinitInput,
        produces: Vec<String>,
        deps: Vec<Dependency>,
        max_retries: u32,
    ) -> Self {
        Self {
            id,
            name,
            workdir,
            input,
            status: TaskStatus::Init,
            deps,
            produces,
            retry_count: 0,
            max_retries,
            last_failure: None,
            built: false,
        }
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn input(&self) -> &AbinitInput {
        &self.input
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn last_failure(&self) -> Option<&FailureRecord> {
        self.last_failure.as_ref()
    }

    pub fn input_path(&self) -> PathBuf {
        self.workdir.join("run.abi")
    }

    pub fn log_path(&self) -> PathBuf {
        self.workdir.join("run.log")
    }

    pub fn outdata_dir(&self) -> PathBuf {
        self.workdir.join("outdata")
    }

    /// Where the `kind` artifact of this task will live once produced.
    pub fn artifact_path(&self, kind: &str, registry: &ArtifactRegistry) -> Result<PathBuf> {
        registry.path_in(&self.outdata_dir(), kind)
    }

    /// Check whether the working directory currently holds a `kind`
    /// artifact. Absence is a normal, checkable condition, not an error.
    pub fn find_artifact(&self, kind: &str, registry: &ArtifactRegistry) -> Option<PathBuf> {
        let path = self.artifact_path(kind, registry).ok()?;
        path.exists().then_some(path)
    }

    /// Materialize the working directory and serialize the input deck,
    /// overlaying the resolved dependency artifact paths as `get*_filepath`
    /// variables.
    ///
    /// `resolved` pairs each consumer-side input variable with the
    /// producer's artifact location.
    pub fn build(&mut self, resolved: &[(String, PathBuf)]) -> Result<()> {
        fs::create_dir_all(&self.workdir)?;
        fs::create_dir_all(self.outdata_dir())?;

        for (var, path) in resolved {
            self.input.set(var, path.display().to_string().as_str());
        }

        self.input.write_to(&self.input_path())?;
        self.built = true;

        debug!(task = %self.name, workdir = %self.workdir.display(), "task built");
        Ok(())
    }

    /// Forward transition. Regressions are a logic error in the caller.
    pub(crate) fn advance(&mut self, next: TaskStatus) {
        debug_assert!(
            next.rank() >= self.status.rank(),
            "status regression {:?} -> {next:?} for task {}",
            self.status,
            self.name
        );
        self.status = next;
    }

    /// Put a task persisted as `Running` back to `Ready` after a scheduler
    /// restart: the process it referred to no longer exists. Does not touch
    /// the retry budget.
    pub(crate) fn reset_orphaned(&mut self) {
        if self.status == TaskStatus::Running {
            self.status = TaskStatus::Ready;
        }
    }

    /// Record a failed attempt.
    ///
    /// If the retry budget allows, the task is reset to `Ready` with an
    /// incremented retry counter and `true` is returned; otherwise it stays
    /// in terminal `Error` and `false` is returned. Either way the failure
    /// record is kept for introspection.
    pub(crate) fn fail(&mut self, reason: FailureReason, message: String) -> bool {
        self.advance(TaskStatus::Error);
        self.last_failure = Some(FailureRecord {
            reason,
            message,
            retries_attempted: self.retry_count,
        });

        if self.retry_count < self.max_retries {
            self.retry_count += 1;
            // Explicit restart-after-failure transition; the workdir and
            // deck are already on disk, so Ready (not Init) is correct.
            self.status = TaskStatus::Ready;
            true
        } else {
            false
        }
    }
}

/// Description of a task the flow wants the launcher to run now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    pub task: TaskId,
    pub name: String,
    pub workdir: PathBuf,
    pub input_file: PathBuf,
    pub log_file: PathBuf,
    /// Where the declared artifacts are expected to appear. Fake launchers
    /// use this to fabricate outputs without running a solver.
    pub artifact_paths: Vec<PathBuf>,
}

impl ScheduledTask {
    pub fn from_task(task: &TaskNode, registry: &ArtifactRegistry) -> Result<Self> {
        let mut artifact_paths = Vec::with_capacity(task.produces.len());
        for kind in &task.produces {
            artifact_paths.push(task.artifact_path(kind, registry)?);
        }

        Ok(Self {
            task: task.id,
            name: task.name.clone(),
            workdir: task.workdir.to_path_buf(),
            input_file: task.input_path(),
            log_file: task.log_path(),
            artifact_paths,
        })
    }
}
