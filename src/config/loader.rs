// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{Campaign, RawCampaign};
use crate::errors::Result;

/// Load a campaign file from a given path and return the raw
/// `RawCampaign`.
///
/// This only performs TOML deserialization; it does **not** perform
/// semantic validation (DAG correctness, etc.). Use [`load_and_validate`]
/// for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawCampaign> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let campaign: RawCampaign = toml::from_str(&contents)?;

    Ok(campaign)
}

/// Load a campaign file from path and run validation.
///
/// This is the recommended entry point for the rest of the application:
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks for:
///   - unknown producer references in `needs`/`trigger`,
///   - artifact kinds the producer does not declare,
///   - dependency cycles,
///   - malformed work sections.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Campaign> {
    let raw = load_from_path(&path)?;
    let campaign = Campaign::try_from(raw)?;
    Ok(campaign)
}

/// Default campaign path: `Abiflow.toml` in the current working directory.
pub fn default_campaign_path() -> PathBuf {
    PathBuf::from("Abiflow.toml")
}
