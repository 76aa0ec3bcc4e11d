// src/flow/dynamic.rs

//! The probe/expand protocol for dynamic works.
//!
//! A dynamic work does not know its member tasks at construction time. Once
//! its trigger dependency resolves, the flow runs a cheap dry-run probe,
//! parses the probe log into a list of sub-problem descriptors
//! ([`discover`]), and maps each descriptor onto a concrete input deck
//! ([`expand`]). The two phases are separate functions so each is testable
//! on its own: discovery touches the filesystem, expansion is pure.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::input::{AbinitInput, Var};
use crate::yamlio::probe::{read_irred_perts, read_qpoints, IrredPert};
use crate::yamlio::reader::YamlDocReader;

/// Which kind of sub-problem list the probe emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeKind {
    /// `--- !Kpoints` document listing the q-points of the screening.
    Qpoints,
    /// `--- !IrredPerts` document listing irreducible perturbations.
    IrredPerts,
}

impl ProbeKind {
    /// The input variable that switches the solver into dry-run listing
    /// mode, and the value to set it to.
    pub fn dry_run_marker(self) -> (&'static str, Var) {
        match self {
            ProbeKind::Qpoints => ("nqptdm", Var::Int(-1)),
            ProbeKind::IrredPerts => ("paral_rf", Var::Int(-1)),
        }
    }
}

/// Specification of a dynamic work, carried as data so the whole flow stays
/// serializable: the template input, the probe kind, and what the expanded
/// tasks produce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicSpec {
    pub probe: ProbeKind,
    /// Template deck cloned and overlaid for every discovered sub-problem.
    pub template: AbinitInput,
    /// Artifact kinds each expanded task produces.
    pub produces: Vec<String>,
    /// If set, work finalization merges this kind's partial files from all
    /// member tasks into a single work-level artifact.
    pub merge_kind: Option<String>,
    /// Exactly one expansion pass happens per dynamic work.
    pub expanded: bool,
}

/// One discovered sub-problem.
#[derive(Debug, Clone, PartialEq)]
pub enum Descriptor {
    Qpoint([f64; 3]),
    Perturbation(IrredPert),
}

/// Phase 1: parse the probe log into sub-problem descriptors.
///
/// An empty list is a valid result (the work expands to zero tasks); a log
/// with no matching tagged section at all is `MalformedProbeOutput`.
pub fn discover(log: &Path, probe: ProbeKind) -> Result<Vec<Descriptor>> {
    let mut reader = YamlDocReader::from_path(log)?;

    let descriptors = match probe {
        ProbeKind::Qpoints => read_qpoints(&mut reader)?
            .into_iter()
            .map(Descriptor::Qpoint)
            .collect(),
        ProbeKind::IrredPerts => read_irred_perts(&mut reader)?
            .into_iter()
            .map(Descriptor::Perturbation)
            .collect(),
    };

    Ok(descriptors)
}

/// Phase 2: clone the template and overlay the sub-problem-specific
/// variables. Pure function of (template, descriptor).
pub fn expand(template: &AbinitInput, descriptor: &Descriptor) -> AbinitInput {
    let mut input = template.clone();

    match descriptor {
        Descriptor::Qpoint(qpt) => {
            input.set("nqptdm", 1i64);
            input.set("qptdm", *qpt);
        }
        Descriptor::Perturbation(pert) => {
            input.set("rfphon", 1i64);
            input.set("qpt", pert.qpt);
            input.set("rfdir", direction_mask(pert.idir));
            input.set("rfatpol", vec![pert.ipert, pert.ipert]);
        }
    }

    input
}

/// Short label for the expanded task's directory name.
pub fn descriptor_label(descriptor: &Descriptor, index: usize) -> String {
    match descriptor {
        Descriptor::Qpoint(_) => format!("qpt_{index}"),
        Descriptor::Perturbation(_) => format!("pert_{index}"),
    }
}

fn direction_mask(idir: i64) -> Vec<i64> {
    let mut mask = vec![0, 0, 0];
    if (1..=3).contains(&idir) {
        mask[(idir - 1) as usize] = 1;
    }
    mask
}
