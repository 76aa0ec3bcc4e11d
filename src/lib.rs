// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod flow;
pub mod input;
pub mod logging;
pub mod types;
pub mod yamlio;

use std::path::{Path, PathBuf};

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::info;

use crate::cli::CliArgs;
use crate::config::Campaign;
use crate::engine::{CoreScheduler, Runtime, SchedulerEvent, SchedulerOptions};
use crate::exec::{SolverLauncher, SolverProbeRunner};
use crate::flow::{ArtifactRegistry, Flow};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - campaign loading and validation
/// - flow construction (or resumption from persisted state)
/// - core scheduler / runtime
/// - solver launcher and probe runner
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let campaign_path = PathBuf::from(&args.campaign);
    let campaign = config::load_and_validate(&campaign_path)?;
    let workdir = resolved_workdir(&campaign, args.workdir.as_deref());

    if args.status {
        let flow = Flow::load(&workdir)?;
        print!("{}", flow.status_report());
        return Ok(());
    }

    if args.dry_run {
        print_dry_run(&campaign, &workdir)?;
        return Ok(());
    }

    // Resume from persisted state if a previous scheduler left one behind;
    // otherwise register a fresh flow from the campaign.
    let flow = if Flow::state_path_for(&workdir).exists() {
        let mut flow = Flow::load(&workdir)?;
        let reset = flow.reset_running_tasks();
        info!(
            workdir = %workdir.display(),
            orphaned = reset,
            "resuming persisted flow state"
        );
        flow
    } else {
        config::build_flow(&campaign, Some(&workdir))?
    };

    let registry = ArtifactRegistry::default();
    let solver_cmd = campaign.campaign.solver_cmd.clone();

    // Runtime event channel.
    let (event_tx, event_rx) = mpsc::channel::<SchedulerEvent>(64);

    // Solver process launcher (real implementation in production).
    let launcher = SolverLauncher::new(event_tx.clone(), solver_cmd.clone());
    let probe = SolverProbeRunner::new(solver_cmd);

    // Ctrl-C → graceful shutdown with persisted state.
    {
        let tx = event_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(SchedulerEvent::ShutdownRequested).await;
        });
    }

    let core = CoreScheduler::new(
        flow,
        registry,
        Box::new(probe),
        SchedulerOptions::default(),
    );

    let runtime = Runtime::new(core, event_rx, launcher);
    runtime.run().await?;
    Ok(())
}

/// Flow working directory: CLI override, then the campaign file, then a
/// conventional default.
fn resolved_workdir(campaign: &Campaign, override_dir: Option<&str>) -> PathBuf {
    match override_dir {
        Some(dir) => PathBuf::from(dir),
        None => campaign
            .campaign
            .workdir
            .as_deref()
            .unwrap_or("flow")
            .into(),
    }
}

/// Simple dry-run output: register the flow without building anything and
/// print works, tasks and dependencies.
fn print_dry_run(campaign: &Campaign, workdir: &Path) -> Result<()> {
    let flow = config::build_flow(campaign, Some(workdir))?;

    println!("abiflow dry-run");
    println!("  campaign.workdir = {}", workdir.display());
    println!("  campaign.max_retries = {}", campaign.campaign.max_retries);
    println!("  campaign.solver_cmd = {}", campaign.campaign.solver_cmd);
    println!();

    println!("works ({}):", flow.works().len());
    print!("{}", flow.show_dependencies());

    Ok(())
}
