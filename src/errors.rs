// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AbiflowError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Cyclic dependency: {0}")]
    CyclicDependency(String),

    #[error("Malformed YAML section: {0}")]
    MalformedSection(String),

    #[error("Malformed probe output: {0}")]
    MalformedProbeOutput(String),

    #[error("Task execution error for '{task}': {reason}")]
    TaskExecution { task: String, reason: String },

    #[error("Unknown node: {0}")]
    UnknownNode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("State serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, AbiflowError>;
