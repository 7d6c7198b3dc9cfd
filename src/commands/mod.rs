pub mod ask;
pub mod bots;
pub mod chat;
pub mod check;
pub mod config;

use std::path::Path;

use anyhow::Context;

use crate::config::Config;

/// Output format for machine-readable reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    Text,
    Json,
}

/// Load the effective config, honoring `--config`.
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<Config> {
    let cwd = std::env::current_dir().context("could not determine current directory")?;
    let (config, path) = Config::resolve(explicit, &cwd)?;
    if let Some(path) = path {
        tracing::debug!(path = %path.display(), "loaded config");
    }
    Ok(config)
}
