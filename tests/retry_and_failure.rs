// tests/retry_and_failure.rs

//! Bounded retries, terminal failure and blocked-downstream propagation.

use std::collections::HashSet;

use abiflow::engine::TaskOutcome;
use abiflow::flow::{
    ArtifactRegistry, FailureReason, Flow, NodeId, TaskSpec, TaskStatus, Work, WorkKind,
};
use abiflow_test_utils::builders::{nscf_input, scf_input};
use abiflow_test_utils::fake_probe::NoProbe;
use abiflow_test_utils::harness::drive_flow;
use abiflow_test_utils::init_tracing;

#[test]
fn failing_task_is_retried_then_terminal_error() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let registry = ArtifactRegistry::default();
    let mut flow = Flow::new(dir.path()).with_max_retries(1);

    let work = flow
        .register_work(Work::new("gs", WorkKind::Generic), vec![])
        .unwrap();
    let bad = flow
        .register_task(work, TaskSpec::new("bad", scf_input()).produces("DEN"))
        .unwrap();

    let failing: HashSet<String> = ["bad".to_string()].into_iter().collect();
    let order = drive_flow(&mut flow, &registry, &NoProbe, &failing).unwrap();

    // One original attempt plus one retry.
    assert_eq!(order, vec!["bad".to_string(), "bad".to_string()]);

    let task = flow.task(bad).unwrap();
    assert_eq!(task.status(), TaskStatus::Error);
    assert_eq!(task.retry_count(), 1);

    let failure = task.last_failure().unwrap();
    assert_eq!(
        failure.reason,
        FailureReason::ProcessFailed { exit_code: 1 }
    );
    assert_eq!(failure.retries_attempted, 1);

    assert!(flow.work(work).unwrap().is_failed());
    assert!(!flow.work(work).unwrap().is_finalized());
    assert!(flow.is_done());
}

#[test]
fn downstream_of_a_failed_work_is_blocked_not_failed() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let registry = ArtifactRegistry::default();
    let mut flow = Flow::new(dir.path()).with_max_retries(0);

    let gs = flow
        .register_work(Work::new("gs", WorkKind::Generic), vec![])
        .unwrap();
    let bad = flow
        .register_task(gs, TaskSpec::new("bad", scf_input()).produces("WFK"))
        .unwrap();

    let downstream = flow
        .register_work(Work::new("downstream", WorkKind::Generic), vec![])
        .unwrap();
    let consumer = flow
        .register_task(
            downstream,
            TaskSpec::new("consumer", nscf_input()).needs(NodeId::Task(bad), "WFK"),
        )
        .unwrap();

    let failing: HashSet<String> = ["bad".to_string()].into_iter().collect();
    let order = drive_flow(&mut flow, &registry, &NoProbe, &failing).unwrap();

    // The consumer was never dispatched and still sits in its initial
    // state, awaiting manual intervention.
    assert_eq!(order, vec!["bad".to_string()]);
    assert_eq!(flow.task(consumer).unwrap().status(), TaskStatus::Init);

    assert!(!flow.work(downstream).unwrap().is_failed());
    assert_eq!(flow.blocked_works(), vec![downstream]);

    // Blocked is a settled state for flow completion purposes.
    assert!(flow.is_done());

    // The report names both the failure and the blockage without re-running
    // anything.
    let report = flow.status_report();
    assert!(report.contains("failed"));
    assert!(report.contains("blocked"));
}

#[test]
fn cancellation_is_a_distinguished_failure_reason() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let registry = ArtifactRegistry::default();
    let mut flow = Flow::new(dir.path()).with_max_retries(0);

    let work = flow
        .register_work(Work::new("gs", WorkKind::Generic), vec![])
        .unwrap();
    let task = flow
        .register_task(work, TaskSpec::new("scf", scf_input()).produces("DEN"))
        .unwrap();

    flow.build(&registry).unwrap();
    let ready = flow.advance(&registry, &NoProbe).unwrap().newly_ready;
    assert_eq!(ready.len(), 1);

    flow.handle_completion(task, TaskOutcome::Cancelled, &registry, &NoProbe)
        .unwrap();

    let node = flow.task(task).unwrap();
    assert_eq!(node.status(), TaskStatus::Error);
    assert_eq!(node.last_failure().unwrap().reason, FailureReason::Cancelled);
}

#[test]
fn clean_exit_without_declared_artifact_is_a_failure() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let registry = ArtifactRegistry::default();
    let mut flow = Flow::new(dir.path()).with_max_retries(0);

    let work = flow
        .register_work(Work::new("gs", WorkKind::Generic), vec![])
        .unwrap();
    let task = flow
        .register_task(work, TaskSpec::new("scf", scf_input()).produces("DEN"))
        .unwrap();

    flow.build(&registry).unwrap();
    flow.advance(&registry, &NoProbe).unwrap();

    // Report success but fabricate nothing: the artifact check must fail
    // the task.
    flow.handle_completion(task, TaskOutcome::Success, &registry, &NoProbe)
        .unwrap();

    let node = flow.task(task).unwrap();
    assert_eq!(node.status(), TaskStatus::Error);
    assert_eq!(
        node.last_failure().unwrap().reason,
        FailureReason::MissingArtifact
    );
}

#[test]
fn completion_for_a_task_that_is_not_running_is_ignored() {
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

    // Never dispatched: a stray completion event must not corrupt state.
    let step = flow
        .handle_completion(task, TaskOutcome::Success, &registry, &NoProbe)
        .unwrap();
    assert!(step.newly_ready.is_empty());
    assert_eq!(flow.task(task).unwrap().status(), TaskStatus::Init);
}
