// tests/persistence_roundtrip.rs

//! The resumability contract: the whole flow object graph round-trips
//! through the persisted blob with full fidelity.

use std::collections::HashSet;

use abiflow::engine::TaskOutcome;
use abiflow::flow::{
    qptdm_work, ArtifactRegistry, Flow, NodeId, TaskSpec, TaskStatus, Work, WorkKind,
};
use abiflow_test_utils::builders::{nscf_input, scf_input, scr_input};
use abiflow_test_utils::fake_launcher::fabricate_artifacts;
use abiflow_test_utils::fake_probe::NoProbe;
use abiflow_test_utils::harness::drive_flow;
use abiflow_test_utils::init_tracing;

/// A flow with mixed terminal states: one task `Ok`, one `Error`, one
/// blocked consumer still in `Init`.
fn mixed_state_flow(dir: &std::path::Path) -> (Flow, ArtifactRegistry) {
    let registry = ArtifactRegistry::default();
    let mut flow = Flow::new(dir).with_max_retries(0);

    let gs = flow
        .register_work(Work::new("gs", WorkKind::Generic), vec![])
        .unwrap();
    flow.register_task(gs, TaskSpec::new("good", scf_input()).produces("DEN"))
        .unwrap();
    let bad = flow
        .register_task(gs, TaskSpec::new("bad", scf_input()).produces("WFK"))
        .unwrap();

    let consumer = flow
        .register_work(Work::new("consumer", WorkKind::Generic), vec![])
        .unwrap();
    flow.register_task(
        consumer,
        TaskSpec::new("nscf", nscf_input()).needs(NodeId::Task(bad), "WFK"),
    )
    .unwrap();

    let failing: HashSet<String> = ["bad".to_string()].into_iter().collect();
    drive_flow(&mut flow, &registry, &NoProbe, &failing).unwrap();

    (flow, registry)
}

#[test]
fn mixed_statuses_round_trip_byte_for_byte() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let (flow, _registry) = mixed_state_flow(dir.path());

    flow.save().unwrap();
    let reloaded = Flow::load(dir.path()).unwrap();

    // Full-fidelity check: the serialized object graphs are identical.
    assert_eq!(
        serde_json::to_value(&flow).unwrap(),
        serde_json::to_value(&reloaded).unwrap()
    );

    // And the semantic queries agree.
    assert_eq!(flow.dependency_table(), reloaded.dependency_table());
    assert_eq!(flow.blocked_works(), reloaded.blocked_works());
    assert_eq!(flow.is_done(), reloaded.is_done());
    assert_eq!(flow.status_report(), reloaded.status_report());
}

#[test]
fn reloaded_flow_reports_failures_without_rerunning() {
    let dir = tempfile::tempdir().unwrap();
    let (flow, _registry) = mixed_state_flow(dir.path());
    flow.save().unwrap();

    let reloaded = Flow::load(dir.path()).unwrap();
    let report = reloaded.status_report();

    assert!(report.contains("bad"));
    assert!(report.contains("blocked"));
    assert!(report.contains("exited with code 1"));
}

#[test]
fn a_running_task_survives_persistence_and_can_be_reset() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let registry = ArtifactRegistry::default();
    let mut flow = Flow::new(dir.path());

    let work = flow
        .register_work(Work::new("gs", WorkKind::Generic), vec![])
        .unwrap();
    let task = flow
        .register_task(work, TaskSpec::new("scf", scf_input()).produces("DEN"))
        .unwrap();

    flow.build(&registry).unwrap();
    let ready = flow.advance(&registry, &NoProbe).unwrap().newly_ready;
    assert_eq!(ready.len(), 1);
    assert_eq!(flow.task(task).unwrap().status(), TaskStatus::Running);

    // Simulate a scheduler crash mid-run.
    flow.save().unwrap();
    let mut resumed = Flow::load(dir.path()).unwrap();
    assert_eq!(resumed.task(task).unwrap().status(), TaskStatus::Running);

    // The resumed scheduler has no process for it; reset for re-dispatch.
    assert_eq!(resumed.reset_running_tasks(), 1);
    assert_eq!(resumed.task(task).unwrap().status(), TaskStatus::Ready);

    let redispatched = resumed.collect_ready(&registry).unwrap();
    assert_eq!(redispatched.len(), 1);

    // Completing it on the resumed flow finishes the campaign.
    fabricate_artifacts(&redispatched[0]).unwrap();
    let step = resumed
        .handle_completion(task, TaskOutcome::Success, &registry, &NoProbe)
        .unwrap();
    assert!(step.flow_done);
}

#[test]
fn unfired_continuations_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ArtifactRegistry::default();
    let mut flow = Flow::new(dir.path());

    let gs = flow
        .register_work(Work::new("gs", WorkKind::Generic), vec![])
        .unwrap();
    let nscf = flow
        .register_task(gs, TaskSpec::new("nscf", nscf_input()).produces("WFK"))
        .unwrap();
    qptdm_work(&mut flow, NodeId::Task(nscf), scr_input()).unwrap();

    flow.build(&registry).unwrap();
    flow.save().unwrap();

    let reloaded = Flow::load(dir.path()).unwrap();
    assert_eq!(flow.continuations(), reloaded.continuations());
    assert_eq!(reloaded.continuations().len(), 1);
    assert!(!reloaded.continuations()[0].fired);
}
