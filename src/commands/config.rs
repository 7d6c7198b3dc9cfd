use std::path::PathBuf;

use anyhow::Context;
use clap::Subcommand;
use schemars::schema_for;

use super::load_config;
use crate::config::{CONFIG_TOML, Config, user_config_path};
use crate::error::ExitError;

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Write a commented starter config file
    Init {
        /// Write the per-user config instead of ./.pitchdesk.toml
        #[arg(long)]
        user: bool,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective config as TOML
    Show,
    /// Print the JSON Schema for the config file
    Schema,
}

impl ConfigCommand {
    pub fn execute(&self, config_path: Option<&std::path::Path>) -> anyhow::Result<()> {
        match self {
            ConfigCommand::Init { user, force } => init_config(*user, *force),
            ConfigCommand::Show => {
                let config = load_config(config_path)?;
                print!("{}", config.to_toml()?);
                Ok(())
            }
            ConfigCommand::Schema => {
                let schema = schema_for!(Config);
                println!("{}", serde_json::to_string_pretty(&schema)?);
                Ok(())
            }
        }
    }
}

fn init_config(user: bool, force: bool) -> anyhow::Result<()> {
    let path: PathBuf = if user {
        user_config_path().ok_or_else(|| {
            ExitError::Config("no per-user config directory on this platform".into())
        })?
    } else {
        std::env::current_dir()
            .context("could not determine current directory")?
            .join(CONFIG_TOML)
    };

    if path.exists() && !force {
        return Err(ExitError::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        ))
        .into());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    std::fs::write(&path, Config::default().to_toml()?)
        .with_context(|| format!("writing {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}
