// tests/dynamic_expansion.rs

//! Probe/expand protocol: a dynamic work discovers its task list from a
//! probe log and populates itself exactly once.

use std::collections::HashSet;

use abiflow::flow::{
    qptdm_work, ArtifactRegistry, Flow, NodeId, TaskSpec, Work, WorkKind,
};
use abiflow::flow::{phonon_flow, TaskStatus};
use abiflow::input::Var;
use abiflow::yamlio::IrredPert;
use abiflow_test_utils::builders::{
    irred_perts_log, nscf_input, phonon_template, qpoints_log, scf_input, scr_input,
};
use abiflow_test_utils::fake_probe::CannedProbe;
use abiflow_test_utils::harness::drive_flow;
use abiflow_test_utils::init_tracing;

/// A flow with one static work (producing the WFK) and one q-point-parallel
/// screening work registered via the continuation mechanism.
fn wfk_plus_qptdm(workdir: &std::path::Path) -> (Flow, abiflow::flow::WorkId) {
    let mut flow = Flow::new(workdir);

    let gs = flow
        .register_work(Work::new("gs", WorkKind::Generic), vec![])
        .unwrap();
    let nscf = flow
        .register_task(gs, TaskSpec::new("nscf", nscf_input()).produces("WFK"))
        .unwrap();

    let scr = qptdm_work(&mut flow, NodeId::Task(nscf), scr_input()).unwrap();
    (flow, scr)
}

#[test]
fn probe_with_two_qpoints_expands_to_two_tasks() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let registry = ArtifactRegistry::default();
    let (mut flow, scr) = wfk_plus_qptdm(dir.path());

    let probe = CannedProbe::new(qpoints_log(&[[0.0, 0.0, 0.0], [0.5, 0.0, 0.0]]));
    let order = drive_flow(&mut flow, &registry, &probe, &HashSet::new()).unwrap();

    assert_eq!(order.len(), 3); // nscf + two screening tasks

    let work = flow.work(scr).unwrap();
    assert_eq!(work.tasks().len(), 2);
    assert!(work.is_finalized());

    // Each expanded deck carries the sub-problem overlay plus the template
    // fields untouched.
    let first = work.tasks()[0].input();
    let second = work.tasks()[1].input();
    assert_eq!(first.get("nqptdm"), Some(&Var::Int(1)));
    assert_eq!(first.get("qptdm"), Some(&Var::Reals(vec![0.0, 0.0, 0.0])));
    assert_eq!(second.get("qptdm"), Some(&Var::Reals(vec![0.5, 0.0, 0.0])));
    for input in [first, second] {
        assert_eq!(input.get("ecuteps"), scr_input().get("ecuteps"));
        assert_eq!(input.get("optdriver"), scr_input().get("optdriver"));
    }

    // Finalization merged the partial screening files.
    assert!(work.find_artifact("SCR", &registry).is_some());
    assert!(flow.is_done());
}

#[test]
fn probe_input_carries_the_dry_run_marker() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ArtifactRegistry::default();
    let (mut flow, scr) = wfk_plus_qptdm(dir.path());

    let probe = CannedProbe::new(qpoints_log(&[[0.0, 0.0, 0.0]]));
    drive_flow(&mut flow, &registry, &probe, &HashSet::new()).unwrap();

    let probe_deck = std::fs::read_to_string(
        flow.work(scr).unwrap().workdir().join("probe").join("run.abi"),
    )
    .unwrap();
    assert!(probe_deck.contains("nqptdm -1"));
    // The WFK of the trigger producer was wired into the probe deck too.
    assert!(probe_deck.contains("getwfk_filepath"));
}

#[test]
fn zero_discovered_qpoints_is_vacuous_success() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let registry = ArtifactRegistry::default();
    let (mut flow, scr) = wfk_plus_qptdm(dir.path());

    let probe = CannedProbe::new(qpoints_log(&[]));
    let order = drive_flow(&mut flow, &registry, &probe, &HashSet::new()).unwrap();

    assert_eq!(order, vec!["nscf".to_string()]);

    let work = flow.work(scr).unwrap();
    assert!(work.tasks().is_empty());
    // Finalization still ran exactly once.
    assert!(work.is_finalized());
    assert!(!work.is_failed());
    assert!(flow.is_done());
}

#[test]
fn probe_log_without_tagged_section_fails_only_that_work() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let registry = ArtifactRegistry::default();
    let (mut flow, scr) = wfk_plus_qptdm(dir.path());

    // An unrelated sibling work must be untouched by the probe failure.
    let other = flow
        .register_work(Work::new("relax", WorkKind::Generic), vec![])
        .unwrap();
    flow.register_task(other, TaskSpec::new("relax", scf_input()).produces("DEN"))
        .unwrap();

    let probe = CannedProbe::new("no yaml documents in this log\n");
    drive_flow(&mut flow, &registry, &probe, &HashSet::new()).unwrap();

    let work = flow.work(scr).unwrap();
    assert!(work.is_failed());
    assert!(!work.is_finalized());
    assert!(work.failure().unwrap().contains("expansion failed"));

    assert!(flow.work(other).unwrap().is_finalized());
    assert!(flow.is_done());
}

#[test]
fn irreducible_perturbations_expand_with_direction_overlays() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let registry = ArtifactRegistry::default();

    let (mut flow, ids) = phonon_flow(dir.path(), scf_input(), phonon_template()).unwrap();

    let perts = [
        IrredPert {
            idir: 1,
            ipert: 1,
            qpt: [0.0, 0.0, 0.0],
        },
        IrredPert {
            idir: 3,
            ipert: 2,
            qpt: [0.5, 0.0, 0.0],
        },
    ];
    let probe = CannedProbe::new(irred_perts_log(&perts));
    drive_flow(&mut flow, &registry, &probe, &HashSet::new()).unwrap();

    let work = flow.work(ids.ph_work).unwrap();
    assert_eq!(work.tasks().len(), 2);
    assert!(work.is_finalized());

    let first = work.tasks()[0].input();
    assert_eq!(first.get("rfphon"), Some(&Var::Int(1)));
    assert_eq!(first.get("rfdir"), Some(&Var::Ints(vec![1, 0, 0])));
    assert_eq!(first.get("rfatpol"), Some(&Var::Ints(vec![1, 1])));

    let second = work.tasks()[1].input();
    assert_eq!(second.get("rfdir"), Some(&Var::Ints(vec![0, 0, 1])));
    assert_eq!(second.get("qpt"), Some(&Var::Reals(vec![0.5, 0.0, 0.0])));

    // The merged DDB is a work-level artifact.
    assert!(work.find_artifact("DDB", &registry).is_some());

    // All tasks, including the ground state, ended Ok.
    assert_eq!(flow.task(ids.gs_task).unwrap().status(), TaskStatus::Ok);
    assert!(flow.is_done());
}
