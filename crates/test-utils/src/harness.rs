//! Synchronous drive loop for flow tests.
//!
//! Many tests don't need the async runtime at all: they build a flow, then
//! play the external launcher by completing scheduled tasks one at a time
//! and feeding outcomes back into the flow.

use std::collections::HashSet;

use abiflow::engine::TaskOutcome;
use abiflow::errors::Result;
use abiflow::exec::ProbeRunner;
use abiflow::flow::{ArtifactRegistry, Flow, ScheduledTask};

use crate::fake_launcher::fabricate_artifacts;

/// Build the flow and run it to quiescence, acting as the external
/// launcher: every scheduled task immediately "succeeds" (with fabricated
/// artifacts) unless its name is in `failing`.
///
/// Returns the names of the tasks in the order they were dispatched.
pub fn drive_flow(
    flow: &mut Flow,
    registry: &ArtifactRegistry,
    probe: &dyn ProbeRunner,
    failing: &HashSet<String>,
) -> Result<Vec<String>> {
    flow.build(registry)?;

    let mut order = Vec::new();
    let mut queue: Vec<ScheduledTask> = flow.advance(registry, probe)?.newly_ready;

    while let Some(task) = queue.pop() {
        order.push(task.name.clone());

        let outcome = if failing.contains(&task.name) {
            TaskOutcome::Failed(1)
        } else {
            fabricate_artifacts(&task)?;
            TaskOutcome::Success
        };

        let step = flow.handle_completion(task.task, outcome, registry, probe)?;
        queue.extend(step.newly_ready);
    }

    Ok(order)
}
