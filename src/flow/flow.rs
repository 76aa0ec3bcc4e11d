// src/flow/flow.rs

//! Top-level container of works.
//!
//! The flow owns every work (and through them every task), holds the global
//! dependency table between nodes, fires deferred-construction continuations
//! for dynamic works, and persists itself to disk between scheduler polls so
//! that a crashed scheduler process can resume exactly where it left off.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::{AbiflowError, Result};
use crate::exec::ProbeRunner;
use crate::flow::dynamic::{descriptor_label, discover, expand};
use crate::flow::node::{Dependency, NodeId, TaskId, WorkId};
use crate::flow::registry::ArtifactRegistry;
use crate::flow::status::{FailureReason, TaskStatus};
use crate::flow::task::{ScheduledTask, TaskNode};
use crate::flow::work::{Work, WorkKind};
use crate::input::AbinitInput;
use crate::types::{DepMode, TaskOutcome, DEFAULT_MAX_RETRIES};

/// Parameters for registering one task into a work.
#[derive(Debug, Clone)]
pub struct TaskSpec {
    pub name: String,
    pub input: AbinitInput,
    pub produces: Vec<String>,
    pub deps: Vec<Dependency>,
}

impl TaskSpec {
    pub fn new(name: &str, input: AbinitInput) -> Self {
        Self {
            name: name.to_string(),
            input,
            produces: Vec::new(),
            deps: Vec::new(),
        }
    }

    pub fn produces(mut self, kind: &str) -> Self {
        self.produces.push(kind.to_string());
        self
    }

    pub fn needs(mut self, producer: NodeId, kind: &str) -> Self {
        self.deps.push(Dependency::hard(producer, kind));
        self
    }

    pub fn needs_soft(mut self, producer: NodeId, kind: &str) -> Self {
        self.deps.push(Dependency::soft(producer, kind));
        self
    }
}

/// One row of the flow-level dependency table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepEdge {
    pub consumer: NodeId,
    pub dep: Dependency,
}

/// Deferred-construction record: once `trigger`'s producer succeeds, the
/// flow expands the dynamic work `work` (probe, parse, populate, build).
///
/// This is plain data rather than a stored closure: the expansion behavior
/// lives in the work's [`WorkKind::Dynamic`] spec, and invocation happens
/// synchronously inside the poll loop when the trigger resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Continuation {
    pub trigger: Dependency,
    pub work: WorkId,
    pub fired: bool,
}

/// Structured result of one flow mutation step, for the scheduler and for
/// tests that drive the flow manually.
#[derive(Debug, Clone, Default)]
pub struct FlowStep {
    /// Tasks that became ready and were marked running in this step.
    pub newly_ready: Vec<ScheduledTask>,
    /// Names of tasks/works newly recognized as failed or blocked.
    pub newly_failed: Vec<String>,
    /// Works finalized in this step.
    pub newly_finalized: Vec<WorkId>,
    /// Every work is now finalized, failed or terminally blocked.
    pub flow_done: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Flow {
    workdir: PathBuf,
    works: Vec<Work>,
    /// Work-level dependency edges, including continuation triggers.
    /// Task-level edges live on the tasks themselves; the cycle check and
    /// [`dependency_table`](Self::dependency_table) see both.
    deps: Vec<DepEdge>,
    continuations: Vec<Continuation>,
    next_task_id: u32,
    max_retries: u32,
    built: bool,
}

impl Flow {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            works: Vec::new(),
            deps: Vec::new(),
            continuations: Vec::new(),
            next_task_id: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            built: false,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn works(&self) -> &[Work] {
        &self.works
    }

    pub fn work(&self, id: WorkId) -> Option<&Work> {
        self.works.get(id.0 as usize)
    }

    pub fn task(&self, id: TaskId) -> Option<&TaskNode> {
        self.works.iter().find_map(|w| w.task(id))
    }

    /// The work that owns `task`.
    pub fn owner_of(&self, task: TaskId) -> Option<WorkId> {
        self.works
            .iter()
            .find(|w| w.task(task).is_some())
            .map(|w| w.id)
    }

    pub fn continuations(&self) -> &[Continuation] {
        &self.continuations
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Add a work, recording its work-level dependency edges.
    ///
    /// The dependency table must stay a DAG; a violation is reported here,
    /// at registration time, never at schedule time.
    pub fn register_work(&mut self, mut work: Work, deps: Vec<Dependency>) -> Result<WorkId> {
        for dep in &deps {
            self.ensure_producer(dep)?;
        }

        let id = WorkId(self.works.len() as u32);
        let workdir = self.workdir.join(format!("w{}", id.0));
        work.attach(id, workdir);

        let name = work.name.clone();
        self.works.push(work);
        let consumer = NodeId::Work(id);
        for dep in deps {
            self.deps.push(DepEdge { consumer, dep });
        }

        if let Err(err) = self.check_acyclic() {
            // Roll back the rejected registration.
            self.works.pop();
            self.deps.retain(|e| e.consumer != consumer);
            return Err(err);
        }

        debug!(work = %name, id = %consumer, "registered work");
        Ok(id)
    }

    /// Append a task to a work. Valid only before that work is built.
    pub fn register_task(&mut self, work: WorkId, spec: TaskSpec) -> Result<TaskId> {
        for dep in &spec.deps {
            self.ensure_producer(dep)?;
        }
        for kind in &spec.produces {
            if kind.trim().is_empty() {
                return Err(AbiflowError::Configuration(format!(
                    "task '{}' declares an empty artifact kind",
                    spec.name
                )));
            }
        }

        let id = TaskId(self.next_task_id);
        let task = {
            let work = self
                .works
                .get_mut(work.0 as usize)
                .ok_or_else(|| AbiflowError::UnknownNode(format!("w{}", work.0)))?;
            if work.awaits_expansion() {
                return Err(AbiflowError::Configuration(format!(
                    "work '{}' is dynamic; its tasks are populated by the probe",
                    work.name
                )));
            }
            let tdir = work.workdir().join(format!("t{}", work.tasks().len()));
            let node = TaskNode::new(
                id,
                spec.name.clone(),
                tdir,
                spec.input,
                spec.produces,
                spec.deps,
                self.max_retries,
            );
            work.register(node)?;
            id
        };
        self.next_task_id += 1;

        if let Err(err) = self.check_acyclic() {
            let work = &mut self.works[work.0 as usize];
            work.tasks_mut().retain(|t| t.id != id);
            self.next_task_id -= 1;
            return Err(err);
        }

        debug!(task = %spec.name, id = %NodeId::Task(task), "registered task");
        Ok(task)
    }

    /// Register a dynamic work whose construction is deferred until
    /// `trigger`'s producer succeeds.
    pub fn register_cbk(&mut self, work: Work, trigger: Dependency) -> Result<WorkId> {
        if !matches!(work.kind(), WorkKind::Dynamic(_)) {
            return Err(AbiflowError::Configuration(format!(
                "work '{}' registered via register_cbk must be dynamic",
                work.name
            )));
        }

        let id = self.register_work(work, vec![trigger.clone()])?;
        self.continuations.push(Continuation {
            trigger,
            work: id,
            fired: false,
        });
        Ok(id)
    }

    fn ensure_producer(&self, dep: &Dependency) -> Result<()> {
        let produces = match dep.producer {
            NodeId::Task(id) => {
                let task = self
                    .task(id)
                    .ok_or_else(|| AbiflowError::UnknownNode(format!("t{}", id.0)))?;
                task.produces.contains(&dep.kind)
            }
            NodeId::Work(id) => {
                let work = self
                    .work(id)
                    .ok_or_else(|| AbiflowError::UnknownNode(format!("w{}", id.0)))?;
                work.work_artifacts().contains(&dep.kind)
            }
        };

        if !produces {
            return Err(AbiflowError::Configuration(format!(
                "producer {} does not declare artifact kind '{}'",
                dep.producer, dep.kind
            )));
        }
        Ok(())
    }

    /// Depth-first acyclicity check over the full dependency table
    /// (work-level edges, task-level edges, task-in-work containment).
    fn check_acyclic(&self) -> Result<()> {
        let mut graph: DiGraphMap<NodeId, ()> = DiGraphMap::new();

        for work in &self.works {
            let wnode = NodeId::Work(work.id);
            graph.add_node(wnode);
            for task in work.tasks() {
                let tnode = NodeId::Task(task.id);
                // A work consumes all of its member tasks.
                graph.add_edge(tnode, wnode, ());
                for dep in &task.deps {
                    graph.add_edge(dep.producer, tnode, ());
                }
            }
        }
        for edge in &self.deps {
            graph.add_edge(edge.dep.producer, edge.consumer, ());
        }

        match toposort(&graph, None) {
            Ok(_order) => Ok(()),
            Err(cycle) => Err(AbiflowError::CyclicDependency(format!(
                "dependency cycle involving node '{}'",
                cycle.node_id()
            ))),
        }
    }

    // ------------------------------------------------------------------
    // Build
    // ------------------------------------------------------------------

    /// Materialize working directories and input decks for every work that
    /// is not awaiting expansion. After this, work composition is frozen.
    pub fn build(&mut self, registry: &ArtifactRegistry) -> Result<()> {
        fs::create_dir_all(self.state_dir())?;

        for idx in 0..self.works.len() {
            if self.works[idx].awaits_expansion() || self.works[idx].is_built() {
                continue;
            }

            let task_ids: Vec<TaskId> =
                self.works[idx].tasks().iter().map(|t| t.id).collect();
            for tid in task_ids {
                self.build_task(WorkId(idx as u32), tid, registry)?;
            }
            self.works[idx].mark_built();
        }

        self.built = true;
        info!(workdir = %self.workdir.display(), "flow built");
        Ok(())
    }

    /// Build one task: resolve its dependency artifact paths and write the
    /// deck. A producer that cannot supply the declared kind surfaces here
    /// as an immediate configuration error, not a deferred runtime one.
    fn build_task(
        &mut self,
        work: WorkId,
        task: TaskId,
        registry: &ArtifactRegistry,
    ) -> Result<()> {
        let deps = self.works[work.0 as usize]
            .task(task)
            .map(|t| t.deps.clone())
            .unwrap_or_default();

        let mut resolved = Vec::with_capacity(deps.len());
        for dep in &deps {
            let path = self.artifact_path_of(dep.producer, &dep.kind, registry)?;
            let var = registry.naming(&dep.kind)?.input_var.clone();
            resolved.push((var, path));
        }

        let work = &mut self.works[work.0 as usize];
        let node = work
            .task_mut(task)
            .ok_or_else(|| AbiflowError::UnknownNode(format!("t{}", task.0)))?;
        node.build(&resolved)
    }

    /// Deterministic location of `node`'s `kind` artifact.
    pub fn artifact_path_of(
        &self,
        node: NodeId,
        kind: &str,
        registry: &ArtifactRegistry,
    ) -> Result<PathBuf> {
        match node {
            NodeId::Task(id) => self
                .task(id)
                .ok_or_else(|| AbiflowError::UnknownNode(format!("t{}", id.0)))?
                .artifact_path(kind, registry),
            NodeId::Work(id) => self
                .work(id)
                .ok_or_else(|| AbiflowError::UnknownNode(format!("w{}", id.0)))?
                .artifact_path(kind, registry),
        }
    }

    // ------------------------------------------------------------------
    // Scheduling queries and mutations
    // ------------------------------------------------------------------

    /// Whether `dep` is currently satisfied.
    fn dep_satisfied(&self, dep: &Dependency) -> bool {
        match dep.producer {
            NodeId::Task(id) => match self.task(id) {
                Some(task) => match dep.mode {
                    DepMode::Hard => task.status() == TaskStatus::Ok,
                    DepMode::Soft => task.status().has_exited(),
                },
                None => false,
            },
            // Work-level artifacts only exist after finalization, so both
            // modes wait for it.
            NodeId::Work(id) => self.work(id).is_some_and(|w| w.is_finalized()),
        }
    }

    fn work_deps_satisfied(&self, work: WorkId) -> bool {
        self.deps
            .iter()
            .filter(|e| e.consumer == NodeId::Work(work))
            .all(|e| self.dep_satisfied(&e.dep))
    }

    /// Read-only view of tasks whose dependencies are currently satisfied
    /// and that are waiting to be dispatched.
    pub fn ready_tasks(&self) -> Vec<TaskId> {
        let mut ready = Vec::new();
        for work in &self.works {
            if work.awaits_expansion() || !work.is_built() {
                continue;
            }
            if !self.work_deps_satisfied(work.id) {
                continue;
            }
            for task in work.tasks() {
                let eligible = match task.status() {
                    TaskStatus::Init => {
                        task.is_built() && task.deps.iter().all(|d| self.dep_satisfied(d))
                    }
                    TaskStatus::Ready => true,
                    _ => false,
                };
                if eligible {
                    ready.push(task.id);
                }
            }
        }
        ready
    }

    /// Promote eligible tasks to `Ready`, mark them `Running`, and return
    /// their dispatch descriptors. The external launcher is expected to run
    /// each one and report the outcome via
    /// [`handle_completion`](Self::handle_completion).
    pub fn collect_ready(&mut self, registry: &ArtifactRegistry) -> Result<Vec<ScheduledTask>> {
        let candidates = self.ready_tasks();

        let mut out = Vec::with_capacity(candidates.len());
        for id in candidates {
            // Should not happen for ids we just computed, but be defensive.
            let Some(wid) = self.owner_of(id) else { continue };
            let work = &mut self.works[wid.0 as usize];
            let Some(task) = work.task_mut(id) else { continue };
            if task.status() == TaskStatus::Init {
                task.advance(TaskStatus::Ready);
            }
            task.advance(TaskStatus::Running);
            info!(task = %task.name, retries = task.retry_count(), "dispatching task");
            out.push(ScheduledTask::from_task(task, registry)?);
        }
        Ok(out)
    }

    /// Record the outcome of an externally-executed task and propagate:
    /// judge the task, possibly retry it, fail its work on exhausted
    /// retries, fire continuations, finalize all-ok works, and collect
    /// whatever became ready.
    pub fn handle_completion(
        &mut self,
        task: TaskId,
        outcome: TaskOutcome,
        registry: &ArtifactRegistry,
        probe: &dyn ProbeRunner,
    ) -> Result<FlowStep> {
        let Some(work_id) = self.owner_of(task) else {
            warn!(task = %NodeId::Task(task), "completion for unknown task; ignoring");
            return Ok(FlowStep::default());
        };

        let mut newly_failed = Vec::new();
        {
            let work = &mut self.works[work_id.0 as usize];
            let Some(node) = work.task_mut(task) else {
                warn!(task = %NodeId::Task(task), "completion for unknown task; ignoring");
                return Ok(FlowStep::default());
            };

            if node.status() != TaskStatus::Running {
                warn!(
                    task = %node.name,
                    status = ?node.status(),
                    "completion for task that is not running; ignoring"
                );
                return Ok(FlowStep::default());
            }

            node.advance(TaskStatus::Done);

            let failure = match outcome {
                TaskOutcome::Success => {
                    let missing = node
                        .produces
                        .iter()
                        .find(|kind| node.find_artifact(kind, registry).is_none())
                        .cloned();
                    missing.map(|kind| {
                        (
                            FailureReason::MissingArtifact,
                            format!("declared artifact '{kind}' was not produced"),
                        )
                    })
                }
                TaskOutcome::Failed(code) => Some((
                    FailureReason::ProcessFailed { exit_code: code },
                    format!("solver exited with code {code}"),
                )),
                TaskOutcome::Cancelled => Some((
                    FailureReason::Cancelled,
                    "externally cancelled while running".to_string(),
                )),
            };

            match failure {
                None => {
                    node.advance(TaskStatus::Ok);
                    debug!(task = %node.name, "task ok; artifacts available");
                }
                Some((reason, message)) => {
                    let name = node.name.clone();
                    let will_retry = node.fail(reason, message.clone());
                    if will_retry {
                        info!(
                            task = %name,
                            retries = node.retry_count(),
                            "task failed; restarting"
                        );
                    } else {
                        warn!(task = %name, %message, "task failed permanently");
                        newly_failed.push(name.clone());
                        work.mark_failed(format!(
                            "task '{name}' failed permanently: {message}"
                        ));
                    }
                }
            }
        }

        let mut step = self.advance(registry, probe)?;
        if !newly_failed.is_empty() {
            newly_failed.extend(self.blocked_works().into_iter().map(|w| {
                self.works[w.0 as usize].name.clone()
            }));
            step.newly_failed = newly_failed;
        }
        Ok(step)
    }

    /// Drive all pending book-keeping: fire continuations whose triggers
    /// resolved, finalize all-ok works (exactly once each), and collect the
    /// tasks that became ready. Also used to seed the initial dispatch and
    /// to resume a persisted flow.
    pub fn advance(
        &mut self,
        registry: &ArtifactRegistry,
        probe: &dyn ProbeRunner,
    ) -> Result<FlowStep> {
        let mut step = FlowStep::default();

        // Firing a continuation or finalizing a work can enable the next
        // one, so iterate to a fixpoint.
        loop {
            let mut changed = false;

            for idx in 0..self.continuations.len() {
                let cont = self.continuations[idx].clone();
                if cont.fired || !self.dep_satisfied(&cont.trigger) {
                    continue;
                }
                self.continuations[idx].fired = true;
                changed = true;

                if let Err(err) = self.expand_dynamic_work(cont.work, &cont.trigger, registry, probe)
                {
                    let work = &mut self.works[cont.work.0 as usize];
                    warn!(work = %work.name, error = %err, "dynamic expansion failed");
                    work.mark_failed(format!("dynamic expansion failed: {err}"));
                    step.newly_failed.push(work.name.clone());
                }
            }

            for idx in 0..self.works.len() {
                let work = &self.works[idx];
                if work.is_finalized()
                    || work.is_failed()
                    || work.awaits_expansion()
                    || !work.is_built()
                    || !work.all_ok()
                {
                    continue;
                }
                self.works[idx].finalize(registry)?;
                step.newly_finalized.push(WorkId(idx as u32));
                changed = true;
            }

            if !changed {
                break;
            }
        }

        step.newly_ready = self.collect_ready(registry)?;
        step.flow_done = self.is_done();
        Ok(step)
    }

    /// Probe, parse, populate and build a dynamic work. Called exactly once
    /// per dynamic work, when its trigger dependency resolves.
    fn expand_dynamic_work(
        &mut self,
        work_id: WorkId,
        trigger: &Dependency,
        registry: &ArtifactRegistry,
        probe: &dyn ProbeRunner,
    ) -> Result<()> {
        let trigger_path = self.artifact_path_of(trigger.producer, &trigger.kind, registry)?;
        let trigger_var = registry.naming(&trigger.kind)?.input_var.clone();

        let (probe_kind, mut template, produces) = {
            let work = &self.works[work_id.0 as usize];
            match work.kind() {
                WorkKind::Dynamic(spec) => {
                    (spec.probe, spec.template.clone(), spec.produces.clone())
                }
                _ => {
                    return Err(AbiflowError::Configuration(format!(
                        "work '{}' is not dynamic",
                        work.name
                    )))
                }
            }
        };

        template.set(&trigger_var, trigger_path.display().to_string().as_str());

        // The probe runs synchronously: nothing downstream can be built
        // until its result is known.
        let mut probe_input = template.clone();
        let (marker, value) = probe_kind.dry_run_marker();
        probe_input.set(marker, value);

        let probe_dir = self.works[work_id.0 as usize].workdir().join("probe");
        let work_name = self.works[work_id.0 as usize].name.clone();
        let log = probe.run_probe(&work_name, &probe_dir, &probe_input)?;

        let descriptors = discover(&log, probe_kind)?;
        info!(
            work = %work_name,
            count = descriptors.len(),
            "probe discovered sub-problems"
        );

        let task_ids: Vec<TaskId> = {
            let mut ids = Vec::with_capacity(descriptors.len());
            for (index, descriptor) in descriptors.iter().enumerate() {
                let input = expand(&template, descriptor);
                let id = TaskId(self.next_task_id);
                self.next_task_id += 1;

                let work = &mut self.works[work_id.0 as usize];
                let tdir = work.workdir().join(format!("t{index}"));
                let node = TaskNode::new(
                    id,
                    descriptor_label(descriptor, index),
                    tdir,
                    input,
                    produces.clone(),
                    Vec::new(),
                    self.max_retries,
                );
                work.register(node)?;
                ids.push(id);
            }
            ids
        };

        for id in task_ids {
            self.build_task(work_id, id, registry)?;
        }

        let work = &mut self.works[work_id.0 as usize];
        if let WorkKind::Dynamic(spec) = work.kind_mut() {
            spec.expanded = true;
        }
        work.mark_built();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Failure propagation and completion
    // ------------------------------------------------------------------

    /// Nodes that can never reach success: failed tasks and works, plus
    /// everything that (transitively) hard-depends on them. Soft edges do
    /// not propagate doom.
    fn doomed_set(&self) -> HashSet<NodeId> {
        let mut doomed: HashSet<NodeId> = HashSet::new();

        for work in &self.works {
            if work.is_failed() {
                doomed.insert(NodeId::Work(work.id));
            }
            for task in work.tasks() {
                if task.status() == TaskStatus::Error {
                    doomed.insert(NodeId::Task(task.id));
                }
            }
        }

        loop {
            let before = doomed.len();

            for work in &self.works {
                let wnode = NodeId::Work(work.id);
                if work.tasks().iter().any(|t| doomed.contains(&NodeId::Task(t.id))) {
                    doomed.insert(wnode);
                }
                for task in work.tasks() {
                    if task
                        .deps
                        .iter()
                        .any(|d| d.mode == DepMode::Hard && doomed.contains(&d.producer))
                    {
                        doomed.insert(NodeId::Task(task.id));
                    }
                }
            }
            for edge in &self.deps {
                if edge.dep.mode == DepMode::Hard && doomed.contains(&edge.dep.producer) {
                    doomed.insert(edge.consumer);
                }
            }

            if doomed.len() == before {
                break;
            }
        }

        doomed
    }

    /// Works that cannot proceed because an upstream node failed. Blocked
    /// works stay in their initial state awaiting manual intervention;
    /// they are never silently skipped and never auto-failed.
    pub fn blocked_works(&self) -> Vec<WorkId> {
        let doomed = self.doomed_set();
        self.works
            .iter()
            .filter(|w| {
                !w.is_failed()
                    && !w.is_finalized()
                    && doomed.contains(&NodeId::Work(w.id))
            })
            .map(|w| w.id)
            .collect()
    }

    /// The flow is done when every work is either finalized-success or
    /// terminally failed/blocked, and nothing is dispatched or waiting.
    pub fn is_done(&self) -> bool {
        let doomed = self.doomed_set();

        let all_settled = self.works.iter().all(|w| {
            w.is_finalized() || w.is_failed() || doomed.contains(&NodeId::Work(w.id))
        });

        let nothing_pending = !self.works.iter().any(|w| {
            w.tasks().iter().any(|t| {
                matches!(t.status(), TaskStatus::Ready | TaskStatus::Running)
            })
        });

        all_settled && nothing_pending
    }

    /// Recovery hook for a resumed scheduler: tasks persisted as `Running`
    /// have no live process anymore, so put them back to `Ready` for
    /// re-dispatch. Loading itself never mutates state; callers opt in.
    pub fn reset_running_tasks(&mut self) -> usize {
        let mut count = 0;
        for work in &mut self.works {
            for task in work.tasks_mut() {
                if task.status() == TaskStatus::Running {
                    task.reset_orphaned();
                    count += 1;
                }
            }
        }
        count
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// Combined dependency table (work-level and task-level edges) as a
    /// read-only snapshot.
    pub fn dependency_table(&self) -> Vec<DepEdge> {
        let mut edges = self.deps.clone();
        for work in &self.works {
            for task in work.tasks() {
                for dep in &task.deps {
                    edges.push(DepEdge {
                        consumer: NodeId::Task(task.id),
                        dep: dep.clone(),
                    });
                }
            }
        }
        edges
    }

    /// Human-readable dependency listing. Read-only; safe for tooling.
    pub fn show_dependencies(&self) -> String {
        let mut out = String::new();
        for work in &self.works {
            out.push_str(&format!("{} ({})\n", NodeId::Work(work.id), work.name));
            for edge in self.deps.iter().filter(|e| e.consumer == NodeId::Work(work.id)) {
                out.push_str(&format!(
                    "  <- {} [{}{}]\n",
                    edge.dep.producer,
                    edge.dep.kind,
                    if edge.dep.mode == DepMode::Soft { ", soft" } else { "" },
                ));
            }
            for task in work.tasks() {
                out.push_str(&format!("  {} ({})\n", NodeId::Task(task.id), task.name));
                for dep in &task.deps {
                    out.push_str(&format!(
                        "    <- {} [{}{}]\n",
                        dep.producer,
                        dep.kind,
                        if dep.mode == DepMode::Soft { ", soft" } else { "" },
                    ));
                }
            }
        }
        out
    }

    /// Status report answered purely from in-memory (persisted) state.
    pub fn status_report(&self) -> String {
        let blocked: HashSet<WorkId> = self.blocked_works().into_iter().collect();
        let mut out = String::new();

        for work in &self.works {
            let state = if work.is_finalized() {
                "finalized"
            } else if work.is_failed() {
                "failed"
            } else if blocked.contains(&work.id) {
                "blocked"
            } else if work.awaits_expansion() {
                "awaiting expansion"
            } else {
                "in progress"
            };
            out.push_str(&format!(
                "{} {} [{}]\n",
                NodeId::Work(work.id),
                work.name,
                state
            ));
            if let Some(failure) = work.failure() {
                out.push_str(&format!("    failure: {failure}\n"));
            }
            for task in work.tasks() {
                out.push_str(&format!(
                    "    {} {} [{:?}] retries={}\n",
                    NodeId::Task(task.id),
                    task.name,
                    task.status(),
                    task.retry_count()
                ));
                if let Some(failure) = task.last_failure() {
                    out.push_str(&format!(
                        "        last failure: {} (after {} retries)\n",
                        failure.message, failure.retries_attempted
                    ));
                }
            }
        }

        out
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    fn state_dir(&self) -> PathBuf {
        self.workdir.join(".abiflow")
    }

    /// Location of the persisted state blob for a flow rooted at `workdir`.
    pub fn state_path_for(workdir: &Path) -> PathBuf {
        workdir.join(".abiflow").join("flow.json")
    }

    pub fn state_path(&self) -> PathBuf {
        Self::state_path_for(&self.workdir)
    }

    /// Serialize the whole flow (works, tasks, statuses, dependency table,
    /// continuations) to its state file.
    pub fn save(&self) -> Result<()> {
        fs::create_dir_all(self.state_dir())?;
        let blob = serde_json::to_string_pretty(self)?;
        fs::write(self.state_path(), blob)?;
        debug!(path = %self.state_path().display(), "flow state persisted");
        Ok(())
    }

    /// Reload a flow persisted by [`save`](Self::save).
    pub fn load(workdir: &Path) -> Result<Flow> {
        let blob = fs::read_to_string(Self::state_path_for(workdir))?;
        let flow: Flow = serde_json::from_str(&blob)?;
        Ok(flow)
    }
}
