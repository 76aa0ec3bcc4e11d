// src/yamlio/probe.rs

//! Typed payloads of the probe-run YAML documents.
//!
//! A dry-run probe makes the solver emit the list of sub-problems into its
//! log instead of doing real work. Two document shapes exist:
//!
//! - `--- !Kpoints` with `reduced_coordinates_of_qpoints: [[f,f,f], ...]`
//! - `--- !IrredPerts` with `irred_perts: [{idir, ipert, qpt}, ...]`
//!
//! A log with *no* matching tagged section is a fatal configuration problem
//! (`MalformedProbeOutput`), distinct from a matched section containing an
//! empty list (zero sub-problems, which is a valid vacuous result).

use serde::{Deserialize, Serialize};

use crate::errors::{AbiflowError, Result};
use crate::yamlio::reader::YamlDocReader;

pub const KPOINTS_TAG: &str = "!Kpoints";
pub const IRRED_PERTS_TAG: &str = "!IrredPerts";

#[derive(Debug, Deserialize)]
struct QpointsDoc {
    reduced_coordinates_of_qpoints: Vec<[f64; 3]>,
}

/// One irreducible perturbation record from a `!IrredPerts` document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IrredPert {
    /// Displacement direction index (1..=3).
    pub idir: i64,
    /// Perturbed atom index (1-based).
    pub ipert: i64,
    /// Reduced coordinates of the perturbation wavevector.
    pub qpt: [f64; 3],
}

#[derive(Debug, Deserialize)]
struct IrredPertsDoc {
    irred_perts: Vec<IrredPert>,
}

/// Read the first `!Kpoints` document from the reader's current position.
pub fn read_qpoints(reader: &mut YamlDocReader) -> Result<Vec<[f64; 3]>> {
    let doc = next_tagged_doc(reader, KPOINTS_TAG)?;
    let parsed: QpointsDoc = parse_doc(&doc, KPOINTS_TAG)?;
    Ok(parsed.reduced_coordinates_of_qpoints)
}

/// Read the first `!IrredPerts` document from the reader's current position.
pub fn read_irred_perts(reader: &mut YamlDocReader) -> Result<Vec<IrredPert>> {
    let doc = next_tagged_doc(reader, IRRED_PERTS_TAG)?;
    let parsed: IrredPertsDoc = parse_doc(&doc, IRRED_PERTS_TAG)?;
    Ok(parsed.irred_perts)
}

fn next_tagged_doc(reader: &mut YamlDocReader, tag: &str) -> Result<String> {
    reader.next_doc_with_tag(tag)?.ok_or_else(|| {
        AbiflowError::MalformedProbeOutput(format!("no `{tag}` document found in probe log"))
    })
}

fn parse_doc<T: for<'de> Deserialize<'de>>(doc: &str, tag: &str) -> Result<T> {
    serde_yaml::from_str(doc).map_err(|err| {
        AbiflowError::MalformedProbeOutput(format!("`{tag}` document is not valid YAML: {err}"))
    })
}
