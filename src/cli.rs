// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `abiflow`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "abiflow",
    version,
    about = "Build and schedule ab-initio calculation campaigns as task DAGs.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the campaign file (TOML).
    ///
    /// Default: `Abiflow.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Abiflow.toml")]
    pub campaign: String,

    /// Override the flow working directory from the campaign file.
    #[arg(long, value_name = "DIR")]
    pub workdir: Option<String>,

    /// Parse + validate, print the works/tasks and their dependencies, but
    /// don't build directories or execute anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Print the status of a previously started flow from its persisted
    /// state and exit. Nothing is re-run.
    #[arg(long)]
    pub status: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ABIFLOW_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
