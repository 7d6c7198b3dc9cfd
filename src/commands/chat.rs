//! Interactive consultation loop.

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Args;

use super::load_config;
use crate::bots::{BOTS, BotId};
use crate::client::{Generate, LazyClient};
use crate::error::ConsultError;
use crate::render::{OutputFormat, Renderer};
use crate::session::{Outcome, Phase, Session};

const TICK: Duration = Duration::from_millis(500);

const HELP: &str = "\
**Commands**
`/bot [id]`  switch specialist (structure, marketing, financial, mvp)
`/bots`      list specialists
`/log`       show the conversation, newest first
`/idea`      show the saved idea
`/reset`     discard the idea and start a new consultation
`/help`      show this help
`/quit`      leave

Any other line starting with `/` is sent as chat text.
";

/// An in-chat command. Lines that do not parse as one are chat input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlashCommand<'a> {
    Quit,
    Help,
    Bots,
    Log,
    Idea,
    Reset,
    /// `/bot` with an optional bot id or name.
    Bot(&'a str),
}

impl<'a> SlashCommand<'a> {
    fn parse(line: &'a str) -> Option<Self> {
        let rest = line.trim().strip_prefix('/')?;
        let (name, arg) = rest
            .split_once(char::is_whitespace)
            .map_or((rest, ""), |(name, arg)| (name, arg.trim()));

        let command = match name {
            "bot" => Self::Bot(arg),
            _ if !arg.is_empty() => return None,
            "quit" | "exit" | "q" => Self::Quit,
            "help" => Self::Help,
            "bots" => Self::Bots,
            "log" => Self::Log,
            "idea" => Self::Idea,
            "reset" => Self::Reset,
            _ => return None,
        };
        Some(command)
    }
}

#[derive(Debug, Args)]
pub struct ChatArgs {
    /// Start with this idea instead of prompting for one
    #[arg(long)]
    pub idea: Option<String>,
    /// Bot to start with (defaults to config)
    #[arg(long, value_enum)]
    pub bot: Option<BotId>,
    /// Output format (pretty or text)
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,
}

impl ChatArgs {
    pub fn execute(&self, config_path: Option<&Path>) -> anyhow::Result<()> {
        let config = load_config(config_path)?;
        let mut chat = Chat {
            renderer: Renderer::new(OutputFormat::detect(self.format)),
            session: Session::from_config(&config),
            client: LazyClient::new(config),
            shown: 0,
        };
        if let Some(bot) = self.bot {
            chat.session.select_bot(bot);
        }

        print!(
            "{}",
            chat.renderer.markdown(
                "**AI Startup Consultant**\nPitch your idea first, then consult the experts. Type `/help` for commands."
            )
        );

        if let Some(idea) = &self.idea {
            chat.submit(idea);
        }

        loop {
            let prompt = match chat.session.phase() {
                Phase::NoIdea => "Describe your startup idea".to_string(),
                Phase::Consulting => format!("Ask the {}", chat.session.selected_bot().name),
            };
            let Some(line) = read_line(&prompt)? else {
                break;
            };

            if let Some(command) = SlashCommand::parse(&line) {
                if !chat.command(command)? {
                    break;
                }
                continue;
            }
            chat.submit(&line);
        }
        Ok(())
    }
}

struct Chat {
    renderer: Renderer,
    session: Session,
    client: LazyClient,
    /// Messages already printed.
    shown: usize,
}

impl Chat {
    fn submit(&mut self, input: &str) {
        let progress = Progress {
            client: &self.client,
            bot_name: self.session.selected_bot().name,
        };
        let result = self.session.submit(input, &progress);

        if matches!(result, Ok(Outcome::IdeaSaved)) {
            self.shown = 0;
        }
        self.print_new();
        if result.is_err()
            && let Some(err) = self.session.last_error()
        {
            eprint!("{}", self.renderer.error(err));
        }
        if let Ok(Outcome::Misdirected { suggested }) = result {
            print!(
                "{}",
                self.renderer
                    .markdown(&format!("Type `/bot {suggested}` to switch."))
            );
        }
    }

    fn print_new(&mut self) {
        let messages = self.session.messages();
        for msg in messages.iter().skip(self.shown) {
            print!("{}", self.renderer.message(msg));
        }
        self.shown = messages.len();
    }

    /// Handle a slash command. Returns false to leave the loop.
    fn command(&mut self, command: SlashCommand<'_>) -> anyhow::Result<bool> {
        match command {
            SlashCommand::Quit => return Ok(false),
            SlashCommand::Help => print!("{}", self.renderer.markdown(HELP)),
            SlashCommand::Bots => print!(
                "{}",
                self.renderer.roster(Some(self.session.selected_bot()))
            ),
            SlashCommand::Log => print!("{}", self.renderer.log(&self.session)),
            SlashCommand::Idea => match self.session.idea() {
                Some(idea) => print!("{}", self.renderer.markdown(&format!("**Idea:** {idea}"))),
                None => print!("{}", self.renderer.markdown("No idea saved yet.")),
            },
            SlashCommand::Reset => {
                self.session.reset();
                self.shown = 0;
                print!(
                    "{}",
                    self.renderer
                        .markdown("Consultation reset. Describe your next startup idea.")
                );
            }
            SlashCommand::Bot(arg) => self.switch_bot(arg)?,
        }
        Ok(true)
    }

    fn switch_bot(&mut self, arg: &str) -> anyhow::Result<()> {
        let picked = if arg.is_empty() {
            pick_bot(self.session.selected())?
        } else {
            BotId::parse(arg)
        };

        match picked {
            Some(bot) => {
                self.session.select_bot(bot);
                print!("{}", self.renderer.bot_banner(bot.bot()));
            }
            None if arg.is_empty() => {
                print!(
                    "{}",
                    self.renderer.roster(Some(self.session.selected_bot()))
                );
            }
            None => eprint!(
                "{}",
                self.renderer.error(&format!("unknown bot {arg:?}; try /bots"))
            ),
        }
        Ok(())
    }
}

/// Runs the model call on a worker thread, drawing progress until it returns.
struct Progress<'a> {
    client: &'a LazyClient,
    bot_name: &'static str,
}

impl Generate for Progress<'_> {
    fn generate(&self, user_query: &str, system_prompt: &str) -> Result<String, ConsultError> {
        let client = self.client.client()?;
        let query = user_query.to_string();
        let system_prompt = system_prompt.to_string();
        let started = Instant::now();
        let handle = thread::spawn(move || client.generate(&query, &system_prompt));

        eprint!("Consulting the {}...", self.bot_name);
        while !handle.is_finished() {
            thread::sleep(TICK);
            eprint!(".");
            let _ = io::stderr().flush();
        }
        eprintln!(" ({:.1}s)", started.elapsed().as_secs_f32());

        match handle.join() {
            Ok(reply) => reply,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

/// Interactive picker on a terminal; `None` when stdin is not one.
fn pick_bot(current: BotId) -> anyhow::Result<Option<BotId>> {
    if !io::stdin().is_terminal() {
        return Ok(None);
    }
    let names: Vec<&str> = BOTS.iter().map(|b| b.name).collect();
    let index = dialoguer::Select::new()
        .with_prompt("Pick a specialist")
        .items(&names)
        .default(current.index())
        .interact()
        .context("reading bot selection")?;
    Ok(BOTS.get(index).map(|b| b.id))
}

/// Read one line of input. `None` on end of input.
fn read_line(prompt: &str) -> anyhow::Result<Option<String>> {
    if io::stdin().is_terminal() {
        return match dialoguer::Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()
        {
            Ok(line) => Ok(Some(line)),
            Err(dialoguer::Error::IO(e))
                if matches!(
                    e.kind(),
                    io::ErrorKind::Interrupted | io::ErrorKind::UnexpectedEof
                ) =>
            {
                Ok(None)
            }
            Err(e) => Err(e).context("reading user input"),
        };
    }

    let mut line = String::new();
    let read = io::stdin()
        .lock()
        .read_line(&mut line)
        .context("reading user input")?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}
