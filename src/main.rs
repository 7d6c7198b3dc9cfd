use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use pitchdesk::commands::ask::AskArgs;
use pitchdesk::commands::bots::BotsArgs;
use pitchdesk::commands::chat::ChatArgs;
use pitchdesk::commands::check::CheckArgs;
use pitchdesk::commands::config::ConfigCommand;
use pitchdesk::{error, telemetry};

#[derive(Debug, Parser)]
#[command(
    name = "pitchdesk",
    version,
    about = "Pitch a startup idea, then consult specialist bots"
)]
struct Cli {
    /// Config file (defaults to ./.pitchdesk.toml, then the per-user config)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Start an interactive consultation
    Chat(ChatArgs),
    /// Save an idea and ask one question
    Ask(AskArgs),
    /// Show how a question would be routed, without calling the API
    Check(CheckArgs),
    /// List the specialist bots
    Bots(BotsArgs),
    /// Manage the config file
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

impl Commands {
    const fn name(&self) -> &'static str {
        match self {
            Self::Chat(_) => "chat",
            Self::Ask(_) => "ask",
            Self::Check(_) => "check",
            Self::Bots(_) => "bots",
            Self::Config { .. } => "config",
        }
    }
}

fn main() -> ExitCode {
    telemetry::init();

    let cli = Cli::parse();

    let _span = tracing::info_span!("command", name = cli.command.name()).entered();

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Chat(args) => args.execute(config),
        Commands::Ask(args) => args.execute(config),
        Commands::Check(args) => args.execute(config),
        Commands::Bots(args) => args.execute(),
        Commands::Config { command } => command.execute(config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(exit_err) = e.downcast_ref::<error::ExitError>() {
                eprintln!("error: {exit_err}");
                exit_err.exit_code()
            } else {
                eprintln!("error: {e:#}");
                ExitCode::FAILURE
            }
        }
    }
}
