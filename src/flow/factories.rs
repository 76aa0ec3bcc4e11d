// src/flow/factories.rs

//! Factory helpers for the common campaign shapes.
//!
//! These wire up the canonical multi-stage pipelines (G0W0, q-point-parallel
//! screening, phonons) so campaign scripts and the TOML loader don't repeat
//! the dependency plumbing by hand.

use std::path::Path;

use crate::errors::Result;
use crate::flow::dynamic::{DynamicSpec, ProbeKind};
use crate::flow::flow::{Flow, TaskSpec};
use crate::flow::node::{Dependency, NodeId, TaskId, WorkId};
use crate::flow::work::{Work, WorkKind};
use crate::input::AbinitInput;

/// Ids of the four tasks of a G0W0 work.
#[derive(Debug, Clone, Copy)]
pub struct G0w0Ids {
    pub work: WorkId,
    pub scf: TaskId,
    pub nscf: TaskId,
    pub scr: TaskId,
    pub sigma: TaskId,
}

/// One work containing the whole G0W0 chain:
/// SCF -> NSCF (needs DEN) -> screening (needs WFK) -> self-energy
/// (needs WFK and SCR).
pub fn g0w0_work(
    flow: &mut Flow,
    scf_input: AbinitInput,
    nscf_input: AbinitInput,
    scr_input: AbinitInput,
    sigma_input: AbinitInput,
) -> Result<G0w0Ids> {
    let work = flow.register_work(Work::new("g0w0", WorkKind::Generic), vec![])?;

    let scf = flow.register_task(
        work,
        TaskSpec::new("scf", scf_input)
            .produces("DEN")
            .produces("WFK"),
    )?;
    let nscf = flow.register_task(
        work,
        TaskSpec::new("nscf", nscf_input)
            .produces("WFK")
            .needs(NodeId::Task(scf), "DEN"),
    )?;
    let scr = flow.register_task(
        work,
        TaskSpec::new("scr", scr_input)
            .produces("SCR")
            .needs(NodeId::Task(nscf), "WFK"),
    )?;
    let sigma = flow.register_task(
        work,
        TaskSpec::new("sigma", sigma_input)
            .needs(NodeId::Task(nscf), "WFK")
            .needs(NodeId::Task(scr), "SCR"),
    )?;

    Ok(G0w0Ids {
        work,
        scf,
        nscf,
        scr,
        sigma,
    })
}

/// Register a q-point-parallel screening work whose construction is
/// deferred until `wfk_producer` has its WFK available.
///
/// The probe runs the screening input in dry-run mode, reads the discovered
/// q-point list from its log, and the work expands to one screening task
/// per q-point. Finalization merges the partial SCR files into a single
/// work-level SCR artifact that downstream self-energy works can consume.
pub fn qptdm_work(
    flow: &mut Flow,
    wfk_producer: NodeId,
    scr_template: AbinitInput,
) -> Result<WorkId> {
    let spec = DynamicSpec {
        probe: ProbeKind::Qpoints,
        template: scr_template,
        produces: vec!["SCR".to_string()],
        merge_kind: Some("SCR".to_string()),
        expanded: false,
    };

    flow.register_cbk(
        Work::new("qptdm", WorkKind::Dynamic(spec)),
        Dependency::hard(wfk_producer, "WFK"),
    )
}

/// Ids of the works of a phonon flow.
#[derive(Debug, Clone, Copy)]
pub struct PhononFlowIds {
    pub gs_work: WorkId,
    pub gs_task: TaskId,
    pub ph_work: WorkId,
}

/// A complete phonon flow: one ground-state work, plus a dynamic DFPT work
/// that expands to one task per irreducible perturbation discovered by the
/// probe. Finalization merges the partial DDB files.
pub fn phonon_flow(
    workdir: &Path,
    gs_input: AbinitInput,
    ph_template: AbinitInput,
) -> Result<(Flow, PhononFlowIds)> {
    let mut flow = Flow::new(workdir);

    let gs_work = flow.register_work(Work::new("gs", WorkKind::Generic), vec![])?;
    let gs_task = flow.register_task(
        gs_work,
        TaskSpec::new("scf", gs_input)
            .produces("DEN")
            .produces("WFK"),
    )?;

    let spec = DynamicSpec {
        probe: ProbeKind::IrredPerts,
        template: ph_template,
        produces: vec!["DDB".to_string(), "1WF".to_string()],
        merge_kind: Some("DDB".to_string()),
        expanded: false,
    };
    let ph_work = flow.register_cbk(
        Work::new("phonons", WorkKind::Dynamic(spec)),
        Dependency::hard(NodeId::Task(gs_task), "WFK"),
    )?;

    Ok((
        flow,
        PhononFlowIds {
            gs_work,
            gs_task,
            ph_work,
        },
    ))
}
