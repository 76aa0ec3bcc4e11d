// src/flow/node.rs

//! Node identifiers and dependency declarations.
//!
//! Tasks and works are owned by the [`Flow`](crate::flow::Flow); everything
//! else refers to them through these lightweight ids, so the dependency
//! table never holds an owning edge.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::DepMode;

/// Identifier of a task, unique within one flow.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TaskId(pub u32);

/// Identifier of a work, unique within one flow.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct WorkId(pub u32);

/// A reference to either a task or a whole work.
///
/// Work-level producers expose artifacts created by their finalization step
/// (e.g. a merged screening file), so a consumer can depend on a work the
/// same way it depends on a single task.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum NodeId {
    Task(TaskId),
    Work(WorkId),
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::Task(TaskId(n)) => write!(f, "t{n}"),
            NodeId::Work(WorkId(n)) => write!(f, "w{n}"),
        }
    }
}

/// A declared data dependency: "I consume artifact `kind` from `producer`".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub producer: NodeId,
    /// Artifact kind tag, e.g. `"WFK"`, `"DEN"`, `"SCR"`.
    pub kind: String,
    #[serde(default)]
    pub mode: DepMode,
}

impl Dependency {
    pub fn hard(producer: NodeId, kind: &str) -> Self {
        Self {
            producer,
            kind: kind.to_string(),
            mode: DepMode::Hard,
        }
    }

    pub fn soft(producer: NodeId, kind: &str) -> Self {
        Self {
            producer,
            kind: kind.to_string(),
            mode: DepMode::Soft,
        }
    }
}
