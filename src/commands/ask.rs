//! One-shot consultation: save the idea, ask one question, print the log.

use std::path::Path;

use clap::Args;

use super::load_config;
use crate::bots::BotId;
use crate::client::LazyClient;
use crate::error::ExitError;
use crate::render::{OutputFormat, Renderer};
use crate::session::Session;

#[derive(Debug, Args)]
pub struct AskArgs {
    /// Startup idea (pitch), at least 20 characters
    #[arg(long)]
    pub idea: String,
    /// Bot to ask (defaults to config)
    #[arg(long, value_enum)]
    pub bot: Option<BotId>,
    /// Question for the bot
    pub question: String,
    /// Output format (pretty or text)
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,
}

impl AskArgs {
    pub fn execute(&self, config_path: Option<&Path>) -> anyhow::Result<()> {
        let config = load_config(config_path)?;
        let renderer = Renderer::new(OutputFormat::detect(self.format));

        let mut session = Session::from_config(&config);
        if let Some(bot) = self.bot {
            session.select_bot(bot);
        }
        session.submit_idea(&self.idea).map_err(ExitError::from)?;
        if session.idea().is_none() {
            return Err(ExitError::Validation("the idea must not be blank".into()).into());
        }

        let client = LazyClient::new(config);
        let result = session.ask(&self.question, &client);

        print!("{}", renderer.log(&session));
        match result {
            Ok(outcome) => {
                tracing::debug!(?outcome, "ask finished");
                Ok(())
            }
            Err(e) => Err(ExitError::from(e).into()),
        }
    }
}
