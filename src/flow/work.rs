// src/flow/work.rs

//! A work: an ordered collection of tasks sharing a working directory,
//! with a finalization step that runs exactly once when every member task
//! has succeeded.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::{AbiflowError, Result};
use crate::flow::dynamic::DynamicSpec;
use crate::flow::node::{TaskId, WorkId};
use crate::flow::registry::ArtifactRegistry;
use crate::flow::status::TaskStatus;
use crate::flow::task::TaskNode;

/// Closed set of work behaviors, decoded from configuration by a factory.
/// The variant decides what `finalize` does and whether the work is
/// populated dynamically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WorkKind {
    /// Plain collection of tasks; finalization is a no-op.
    Generic,
    /// Finalization merges the named partial artifacts of all member tasks
    /// into a single work-level artifact.
    MergeArtifacts { kind: String },
    /// Member tasks are discovered at run time via a probe.
    Dynamic(DynamicSpec),
}

/// Report of a finalization pass.
#[derive(Debug, Clone, Default)]
pub struct FinalizeReport {
    /// Work-level artifact written by a merge, if any.
    pub merged: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Work {
    pub id: WorkId,
    pub name: String,
    workdir: PathBuf,
    kind: WorkKind,
    tasks: Vec<TaskNode>,
    built: bool,
    finalized: bool,
    failed: bool,
    /// Last error that made this work unable to proceed (e.g. a malformed
    /// probe log), kept for introspection.
    failure: Option<String>,
}

impl Work {
    /// Create a detached work. [`Flow::register_work`] assigns the id and
    /// working directory.
    ///
    /// [`Flow::register_work`]: crate::flow::Flow::register_work
    pub fn new(name: &str, kind: WorkKind) -> Self {
        Self {
            id: WorkId(0),
            name: name.to_string(),
            workdir: PathBuf::new(),
            kind,
            tasks: Vec::new(),
            built: false,
            finalized: false,
            failed: false,
            failure: None,
        }
    }

    pub(crate) fn attach(&mut self, id: WorkId, workdir: PathBuf) {
        self.id = id;
        self.workdir = workdir;
    }

    pub fn kind(&self) -> &WorkKind {
        &self.kind
    }

    pub(crate) fn kind_mut(&mut self) -> &mut WorkKind {
        &mut self.kind
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn outdata_dir(&self) -> PathBuf {
        self.workdir.join("outdata")
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub(crate) fn mark_built(&mut self) {
        self.built = true;
    }

    pub(crate) fn mark_failed(&mut self, message: String) {
        self.failed = true;
        self.failure = Some(message);
    }

    pub fn tasks(&self) -> &[TaskNode] {
        &self.tasks
    }

    pub(crate) fn tasks_mut(&mut self) -> &mut Vec<TaskNode> {
        &mut self.tasks
    }

    pub fn task(&self, id: TaskId) -> Option<&TaskNode> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub(crate) fn task_mut(&mut self, id: TaskId) -> Option<&mut TaskNode> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Append a task. Valid only before the work is built; afterwards the
    /// composition is immutable.
    pub(crate) fn register(&mut self, task: TaskNode) -> Result<()> {
        if self.built {
            return Err(AbiflowError::Configuration(format!(
                "work '{}' is already built; cannot register new tasks",
                self.name
            )));
        }
        self.tasks.push(task);
        Ok(())
    }

    /// Whether this work still waits for a probe expansion.
    pub fn awaits_expansion(&self) -> bool {
        matches!(&self.kind, WorkKind::Dynamic(spec) if !spec.expanded)
    }

    /// All member tasks in terminal success. Vacuously true for a work with
    /// zero tasks, which is the contract for a probe that discovered zero
    /// sub-problems.
    pub fn all_ok(&self) -> bool {
        self.tasks.iter().all(|t| t.status() == TaskStatus::Ok)
    }

    /// Any member task in terminal failure (a task in `Error` status has
    /// already exhausted its retries).
    pub fn any_task_failed(&self) -> bool {
        self.tasks.iter().any(|t| t.status() == TaskStatus::Error)
    }

    /// Kinds this work produces at work level through finalization.
    pub fn work_artifacts(&self) -> Vec<String> {
        match &self.kind {
            WorkKind::Generic => Vec::new(),
            WorkKind::MergeArtifacts { kind } => vec![kind.clone()],
            WorkKind::Dynamic(spec) => spec.merge_kind.clone().into_iter().collect(),
        }
    }

    /// Where the work-level `kind` artifact lives once finalization ran.
    pub fn artifact_path(&self, kind: &str, registry: &ArtifactRegistry) -> Result<PathBuf> {
        registry.path_in(&self.outdata_dir(), kind)
    }

    pub fn find_artifact(&self, kind: &str, registry: &ArtifactRegistry) -> Option<PathBuf> {
        let path = self.artifact_path(kind, registry).ok()?;
        path.exists().then_some(path)
    }

    /// Graph-level post-processing, run once every member task is `Ok`.
    ///
    /// The flow guarantees at-most-once dispatch via the finalized flag, but
    /// a careless second call must still be harmless, so this early-returns
    /// when already finalized.
    pub(crate) fn finalize(&mut self, registry: &ArtifactRegistry) -> Result<FinalizeReport> {
        if self.finalized {
            debug!(work = %self.name, "finalize called again; ignoring");
            return Ok(FinalizeReport::default());
        }

        let mut report = FinalizeReport::default();

        let merge_kind = match &self.kind {
            WorkKind::Generic => None,
            WorkKind::MergeArtifacts { kind } => Some(kind.clone()),
            WorkKind::Dynamic(spec) => spec.merge_kind.clone(),
        };

        if let Some(kind) = merge_kind {
            report.merged = Some(self.merge_partials(&kind, registry)?);
        }

        self.finalized = true;
        info!(work = %self.name, merged = ?report.merged, "work finalized");
        Ok(report)
    }

    /// Concatenate each member task's `kind` partial into a single
    /// work-level artifact, in task registration order.
    fn merge_partials(&self, kind: &str, registry: &ArtifactRegistry) -> Result<PathBuf> {
        let outdata = self.outdata_dir();
        fs::create_dir_all(&outdata)?;
        let target = registry.path_in(&outdata, kind)?;

        let mut out = fs::File::create(&target)?;
        for task in &self.tasks {
            let partial = task.artifact_path(kind, registry)?;
            let bytes = fs::read(&partial).map_err(|err| {
                AbiflowError::Configuration(format!(
                    "work '{}': partial {kind} artifact of task '{}' missing at {}: {err}",
                    self.name,
                    task.name,
                    partial.display()
                ))
            })?;
            out.write_all(&bytes)?;
        }

        debug!(
            work = %self.name,
            kind,
            parts = self.tasks.len(),
            target = %target.display(),
            "merged partial artifacts"
        );
        Ok(target)
    }
}
