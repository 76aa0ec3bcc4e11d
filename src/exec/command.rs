// src/exec/command.rs

//! Solver process supervision.

use anyhow::{Context, Result};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::engine::SchedulerEvent;
use crate::flow::ScheduledTask;
use crate::types::TaskOutcome;

/// Spawn the background launcher loop and return the channel scheduled
/// tasks are sent over.
///
/// Every received task gets its own supervised process; completion events
/// flow back to the runtime via `runtime_tx`.
pub fn spawn_launcher(
    runtime_tx: mpsc::Sender<SchedulerEvent>,
    command: String,
) -> mpsc::Sender<ScheduledTask> {
    let (tx, mut rx) = mpsc::channel::<ScheduledTask>(64);

    tokio::spawn(async move {
        while let Some(task) = rx.recv().await {
            let events = runtime_tx.clone();
            let command = command.clone();
            tokio::spawn(async move {
                run_solver(task, command, events).await;
            });
        }
    });

    tx
}

/// Run a single solver process and report its outcome.
pub async fn run_solver(
    task: ScheduledTask,
    command: String,
    events: mpsc::Sender<SchedulerEvent>,
) {
    let id = task.task;
    let name = task.name.clone();

    if let Err(err) = run_solver_inner(&task, &command, &events).await {
        error!(task = %name, error = %err, "solver invocation error");
        let _ = events
            .send(SchedulerEvent::TaskCompleted {
                task: id,
                outcome: TaskOutcome::Failed(-1),
            })
            .await;
    }
}

async fn run_solver_inner(
    task: &ScheduledTask,
    command: &str,
    events: &mpsc::Sender<SchedulerEvent>,
) -> Result<()> {
    // The solver writes its log next to the deck; stdout/stderr go there
    // too so the scheduler's own output stays clean.
    let shell = format!(
        "cd '{}' && {} '{}' > '{}' 2>&1",
        task.workdir.display(),
        command,
        task.input_file.display(),
        task.log_file.display()
    );

    info!(task = %task.name, cmd = %shell, "starting solver process");

    let status = Command::new("sh")
        .arg("-c")
        .arg(&shell)
        .kill_on_drop(true)
        .status()
        .await
        .with_context(|| format!("spawning solver process for task '{}'", task.name))?;

    let code = status.code().unwrap_or(-1);
    let outcome = if status.success() {
        TaskOutcome::Success
    } else {
        TaskOutcome::Failed(code)
    };

    info!(
        task = %task.name,
        exit_code = code,
        success = status.success(),
        "solver process exited"
    );

    events
        .send(SchedulerEvent::TaskCompleted {
            task: task.task,
            outcome,
        })
        .await
        .with_context(|| {
            format!(
                "sending TaskCompleted event for task '{}' to runtime",
                task.name
            )
        })?;

    Ok(())
}
