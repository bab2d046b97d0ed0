//! Command implementations for the s1-sweep CLI
//!
//! Each command lives in its own module. Commands that talk to the API load
//! and validate the configuration first, so a bad setup fails before any
//! network call.

pub mod config;
pub mod sites;
pub mod sweep;
pub mod version;

use anyhow::{Context, Result};

use crate::cli::{Cli, SweepArgs};
use crate::config::Settings;

/// Merged and validated settings for commands that reach the API
pub(crate) fn load_settings(cli: &Cli, sweep: Option<&SweepArgs>) -> Result<Settings> {
    let settings = cli
        .load_config(sweep)?
        .settings()
        .context("Failed to read configuration")?;
    settings.validate()?;
    Ok(settings)
}
