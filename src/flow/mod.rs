// src/flow/mod.rs

//! Flow orchestration: tasks, works and the top-level flow container.
//!
//! - [`node`] defines ids and dependency declarations.
//! - [`status`] holds the task status state machine and failure records.
//! - [`registry`] maps artifact kind tags to file locations.
//! - [`task`] represents one externally-executed solver invocation.
//! - [`work`] groups tasks under a shared directory with a one-shot
//!   finalization step.
//! - [`dynamic`] implements the probe/expand protocol for works whose task
//!   set is discovered at run time.
//! - [`flow`] is the top-level container with the global dependency table,
//!   continuation firing and state persistence.
//! - [`factories`] wire up the common campaign shapes.

pub mod dynamic;
pub mod factories;
#[allow(clippy::module_inception)]
pub mod flow;
pub mod node;
pub mod registry;
pub mod status;
pub mod task;
pub mod work;

pub use dynamic::{discover, expand, Descriptor, DynamicSpec, ProbeKind};
pub use factories::{g0w0_work, phonon_flow, qptdm_work, G0w0Ids, PhononFlowIds};
pub use flow::{Continuation, DepEdge, Flow, FlowStep, TaskSpec};
pub use node::{Dependency, NodeId, TaskId, WorkId};
pub use registry::{ArtifactNaming, ArtifactRegistry};
pub use status::{FailureReason, FailureRecord, TaskStatus};
pub use task::{ScheduledTask, TaskNode};
pub use work::{FinalizeReport, Work, WorkKind};
