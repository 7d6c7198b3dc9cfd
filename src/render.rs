//! Terminal rendering of the chat log.
//!
//! Messages use `**bold**` markdown. Pretty output renders it with termimad;
//! text output strips the markers.

use std::fmt::Write as _;
use std::io::IsTerminal;
use std::sync::OnceLock;

use regex::Regex;
use termimad::MadSkin;

use crate::bots::{BOTS, Bot};
use crate::session::{Message, Sender, Session};

const EMPTY_LOG: &str = "Start by defining your startup idea to unlock the expert bots.";

/// Output format: pretty (termimad) or text (plain)
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Text,
}

impl OutputFormat {
    pub fn detect(explicit: Option<Self>) -> Self {
        if let Some(fmt) = explicit {
            return fmt;
        }

        if let Ok(env) = std::env::var("FORMAT") {
            if env == "pretty" {
                return Self::Pretty;
            } else if env == "text" {
                return Self::Text;
            }
        }

        if std::io::stdout().is_terminal() {
            Self::Pretty
        } else {
            Self::Text
        }
    }
}

fn bold_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*\*([^*]+)\*\*").expect("valid bold regex"))
}

/// Remove `**` emphasis markers.
pub fn strip_markdown(text: &str) -> String {
    bold_re().replace_all(text, "$1").into_owned()
}

pub struct Renderer {
    format: OutputFormat,
    skin: MadSkin,
}

impl Renderer {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            skin: MadSkin::default(),
        }
    }

    /// Render a markdown snippet for the current format.
    pub fn markdown(&self, md: &str) -> String {
        match self.format {
            OutputFormat::Pretty => self.skin.term_text(md).to_string(),
            OutputFormat::Text => {
                let mut out = strip_markdown(md);
                if !out.ends_with('\n') {
                    out.push('\n');
                }
                out
            }
        }
    }

    fn header(msg: &Message) -> String {
        let stamp = msg.sent_at.format("%H:%M");
        match msg.sender {
            Sender::User => format!("[{stamp}] You asked the {}:", msg.bot_name),
            Sender::Bot | Sender::System => format!("[{stamp}] {} Message:", msg.bot_name),
        }
    }

    pub fn message(&self, msg: &Message) -> String {
        let header = Self::header(msg);
        let header = match self.format {
            OutputFormat::Pretty => self.markdown(&format!("**{header}**")),
            OutputFormat::Text => format!("{header}\n"),
        };
        format!("{header}{}", self.markdown(&msg.text))
    }

    /// Idea banner followed by the log, newest message first.
    pub fn log(&self, session: &Session) -> String {
        let mut out = String::new();
        if let Some(idea) = session.idea() {
            out.push_str(&self.markdown(&format!(
                "**Idea:** {idea}  (`/reset` to start a new consultation)"
            )));
            out.push('\n');
        }

        out.push_str(&self.markdown("**Conversation Log**"));
        if session.messages().is_empty() {
            out.push_str(&self.markdown(EMPTY_LOG));
            return out;
        }
        for msg in session.messages_newest_first() {
            out.push('\n');
            out.push_str(&self.message(msg));
        }
        out
    }

    /// "Ask the X" banner shown when a bot is selected.
    pub fn bot_banner(&self, bot: &Bot) -> String {
        self.markdown(&format!(
            "**Ask the {}**\nThe {} specializes in **{}**",
            bot.name, bot.name, bot.description
        ))
    }

    /// Roster of specialists with the selected one marked.
    pub fn roster(&self, selected: Option<&Bot>) -> String {
        let mut md = String::new();
        for bot in &BOTS {
            let marker = if selected.is_some_and(|s| s.id == bot.id) {
                "*"
            } else {
                " "
            };
            let _ = writeln!(
                md,
                "{marker} **{}** (`{}`): {}",
                bot.name,
                bot.id.as_str(),
                bot.description
            );
        }
        self.markdown(&md)
    }

    pub fn error(&self, text: &str) -> String {
        self.markdown(&format!("⚠️ **{text}**"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bots::BotId;

    fn plain() -> Renderer {
        Renderer::new(OutputFormat::Text)
    }

    #[test]
    fn strip_markdown_removes_bold() {
        assert_eq!(
            strip_markdown("I am the **Marketing Bot**, see **Structure Bot**."),
            "I am the Marketing Bot, see Structure Bot."
        );
        assert_eq!(strip_markdown("no markers"), "no markers");
    }

    #[test]
    fn explicit_format_wins() {
        assert_eq!(
            OutputFormat::detect(Some(OutputFormat::Text)),
            OutputFormat::Text
        );
    }

    #[test]
    fn empty_log_shows_placeholder() {
        let s = Session::new(BotId::Structure, 20);
        let out = plain().log(&s);
        assert!(out.contains("Conversation Log"));
        assert!(out.contains(EMPTY_LOG));
        assert!(!out.contains("Idea:"));
    }

    #[test]
    fn log_lists_newest_first_with_headers() {
        let mut s = Session::new(BotId::Marketing, 20);
        s.submit_idea("A mobile app that uses computer vision to identify plants")
            .unwrap();
        s.begin_question("What legal structure should I use?").unwrap();

        let out = plain().log(&s);
        assert!(out.contains("Idea: A mobile app"));
        let advisory = out.find("Marketing Bot Message:").unwrap();
        let question = out.find("You asked the Marketing Bot:").unwrap();
        let saved = out.find("System Message:").unwrap();
        assert!(advisory < question && question < saved);
        assert!(!out.contains("**"));
    }

    #[test]
    fn roster_marks_selection() {
        let out = plain().roster(Some(BotId::Mvp.bot()));
        assert!(out.contains("* MVP Bot (`mvp`)"));
        assert!(out.contains("  Structure Bot (`structure`)"));
    }

    #[test]
    fn banner_names_specialty() {
        let out = plain().bot_banner(BotId::Financial.bot());
        assert!(out.contains("Ask the Financial Bot"));
        assert!(out.contains("revenue models, initial costs, and funding avenues."));
    }
}
