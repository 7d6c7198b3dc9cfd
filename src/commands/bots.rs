use clap::Args;
use serde::Serialize;

use super::ReportFormat;
use crate::bots::{BOTS, BotId};
use crate::render::{OutputFormat, Renderer};

#[derive(Debug, Args)]
pub struct BotsArgs {
    /// Output format
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

#[derive(Debug, Serialize)]
pub struct BotEntry {
    pub id: BotId,
    pub name: &'static str,
    pub description: &'static str,
    pub keywords: &'static [&'static str],
}

impl BotsArgs {
    pub fn execute(&self) -> anyhow::Result<()> {
        match self.format {
            ReportFormat::Json => {
                let entries: Vec<BotEntry> = BOTS
                    .iter()
                    .map(|b| BotEntry {
                        id: b.id,
                        name: b.name,
                        description: b.description,
                        keywords: b.keywords,
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&entries)?);
            }
            ReportFormat::Text => {
                print!("{}", Renderer::new(OutputFormat::Text).roster(None));
            }
        }
        Ok(())
    }
}
