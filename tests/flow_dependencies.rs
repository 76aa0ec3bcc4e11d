// tests/flow_dependencies.rs

use std::collections::HashSet;

use abiflow::errors::AbiflowError;
use abiflow::flow::{
    ArtifactRegistry, Flow, NodeId, TaskSpec, TaskStatus, Work, WorkKind,
};
use abiflow_test_utils::builders::{nscf_input, scf_input};
use abiflow_test_utils::fake_probe::NoProbe;
use abiflow_test_utils::harness::drive_flow;
use abiflow_test_utils::init_tracing;

#[test]
fn task_cycle_through_work_merge_is_rejected_at_registration() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let mut flow = Flow::new(dir.path());

    let work = flow
        .register_work(
            Work::new(
                "merge",
                WorkKind::MergeArtifacts {
                    kind: "SCR".to_string(),
                },
            ),
            vec![],
        )
        .unwrap();

    // The task consumes its own work's merged output: the work waits for
    // the task and the task waits for the work.
    let err = flow
        .register_task(
            work,
            TaskSpec::new("selfish", scf_input())
                .produces("SCR")
                .needs(NodeId::Work(work), "SCR"),
        )
        .unwrap_err();

    assert!(matches!(err, AbiflowError::CyclicDependency(_)));
    // The rejected task must not have been kept.
    assert!(flow.work(work).unwrap().tasks().is_empty());
}

#[test]
fn needing_an_undeclared_artifact_kind_is_a_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut flow = Flow::new(dir.path());

    let work = flow
        .register_work(Work::new("gs", WorkKind::Generic), vec![])
        .unwrap();
    let scf = flow
        .register_task(work, TaskSpec::new("scf", scf_input()).produces("DEN"))
        .unwrap();

    let err = flow
        .register_task(
            work,
            TaskSpec::new("nscf", nscf_input()).needs(NodeId::Task(scf), "SCR"),
        )
        .unwrap_err();

    assert!(matches!(err, AbiflowError::Configuration(_)));
}

#[test]
fn tasks_wait_for_their_hard_dependencies() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let registry = ArtifactRegistry::default();
    let mut flow = Flow::new(dir.path());

    let work = flow
        .register_work(Work::new("gs", WorkKind::Generic), vec![])
        .unwrap();
    let scf = flow
        .register_task(
            work,
            TaskSpec::new("scf", scf_input())
                .produces("DEN")
                .produces("WFK"),
        )
        .unwrap();
    flow.register_task(
        work,
        TaskSpec::new("nscf", nscf_input())
            .produces("WFK")
            .needs(NodeId::Task(scf), "DEN"),
    )
    .unwrap();

    flow.build(&registry).unwrap();

    // Before anything ran, only the root is ready.
    let ready = flow.ready_tasks();
    assert_eq!(ready, vec![scf]);

    let order = drive_flow(&mut flow, &registry, &NoProbe, &HashSet::new()).unwrap();
    assert_eq!(order, vec!["scf".to_string(), "nscf".to_string()]);
    assert!(flow.is_done());
    assert!(flow.work(work).unwrap().is_finalized());

    // Running the completion check again must not re-finalize anything.
    let again = flow.advance(&registry, &NoProbe).unwrap();
    assert!(again.newly_finalized.is_empty());
    assert!(again.newly_ready.is_empty());
}

#[test]
fn consumer_input_points_at_the_producer_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ArtifactRegistry::default();
    let mut flow = Flow::new(dir.path());

    let work = flow
        .register_work(Work::new("gs", WorkKind::Generic), vec![])
        .unwrap();
    let scf = flow
        .register_task(work, TaskSpec::new("scf", scf_input()).produces("DEN"))
        .unwrap();
    let nscf = flow
        .register_task(
            work,
            TaskSpec::new("nscf", nscf_input()).needs(NodeId::Task(scf), "DEN"),
        )
        .unwrap();

    flow.build(&registry).unwrap();

    let expected = flow
        .task(scf)
        .unwrap()
        .artifact_path("DEN", &registry)
        .unwrap();
    let deck = flow.task(nscf).unwrap().input().to_deck_string();
    assert!(deck.contains("getden_filepath"));
    assert!(deck.contains(&expected.display().to_string()));
}

#[test]
fn soft_dependency_is_satisfied_by_a_failed_producer() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let registry = ArtifactRegistry::default();
    let mut flow = Flow::new(dir.path()).with_max_retries(0);

    let work = flow
        .register_work(Work::new("gs", WorkKind::Generic), vec![])
        .unwrap();
    let shaky = flow
        .register_task(work, TaskSpec::new("shaky", scf_input()).produces("WFK"))
        .unwrap();
    let tolerant = flow
        .register_task(
            work,
            TaskSpec::new("tolerant", nscf_input()).needs_soft(NodeId::Task(shaky), "WFK"),
        )
        .unwrap();

    let failing: HashSet<String> = ["shaky".to_string()].into_iter().collect();
    let order = drive_flow(&mut flow, &registry, &NoProbe, &failing).unwrap();

    // The soft consumer ran even though its producer failed permanently.
    assert!(order.contains(&"tolerant".to_string()));
    assert_eq!(flow.task(shaky).unwrap().status(), TaskStatus::Error);
    assert_eq!(flow.task(tolerant).unwrap().status(), TaskStatus::Ok);
}

#[test]
fn show_dependencies_lists_edges_without_mutating() {
    let dir = tempfile::tempdir().unwrap();
    let mut flow = Flow::new(dir.path());

    let work = flow
        .register_work(Work::new("gs", WorkKind::Generic), vec![])
        .unwrap();
    let scf = flow
        .register_task(work, TaskSpec::new("scf", scf_input()).produces("DEN"))
        .unwrap();
    flow.register_task(
        work,
        TaskSpec::new("nscf", nscf_input()).needs(NodeId::Task(scf), "DEN"),
    )
    .unwrap();

    let before = flow.dependency_table();
    let listing = flow.show_dependencies();
    assert!(listing.contains("gs"));
    assert!(listing.contains("[DEN]"));
    assert_eq!(before, flow.dependency_table());
}
