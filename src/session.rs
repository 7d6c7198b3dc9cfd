//! Consultation state machine.
//!
//! A session starts without an idea. The first accepted submission becomes
//! the idea; every later submission is a question for the selected bot. A
//! question passes the relevance gate and the misdirection check before the
//! generator is called. Reset discards the idea and the log.
//!
//! Asking is split into [`Session::begin_question`] and [`Session::complete`]
//! so the model call can run on another thread while the session refuses new
//! submissions.

use chrono::{DateTime, Local};

use crate::bots::{Bot, BotId};
use crate::client::Generate;
use crate::config::Config;
use crate::error::ConsultError;
use crate::relevance::is_on_topic;
use crate::routing::find_better_bot;
use crate::template;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Bot,
    System,
}

/// One chat log entry.
#[derive(Debug, Clone)]
pub struct Message {
    pub sender: Sender,
    pub text: String,
    /// Originating bot, or `None` for system entries.
    pub bot_id: Option<BotId>,
    pub bot_name: &'static str,
    pub sent_at: DateTime<Local>,
}

impl Message {
    fn system(text: String) -> Self {
        Self {
            sender: Sender::System,
            text,
            bot_id: None,
            bot_name: "System",
            sent_at: Local::now(),
        }
    }

    fn user(text: String, bot: &Bot) -> Self {
        Self {
            sender: Sender::User,
            text,
            bot_id: Some(bot.id),
            bot_name: bot.name,
            sent_at: Local::now(),
        }
    }

    fn bot(text: String, bot: &Bot) -> Self {
        Self {
            sender: Sender::Bot,
            text,
            bot_id: Some(bot.id),
            bot_name: bot.name,
            sent_at: Local::now(),
        }
    }

    /// Bot id key, or `"system"`.
    pub fn origin(&self) -> &'static str {
        self.bot_id.map_or("system", BotId::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NoIdea,
    Consulting,
}

/// What a submission did to the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Blank input; nothing changed.
    Ignored,
    IdeaSaved,
    /// Failed the relevance gate; a system advisory was logged.
    OutOfScope,
    /// Another bot fits better; the current bot logged a redirect.
    Misdirected { suggested: BotId },
    /// The bot's reply was logged.
    Answered,
}

/// A question that passed both checks and now needs a model reply.
#[derive(Debug)]
pub struct PendingCall {
    pub bot: BotId,
    pub query: String,
    pub system_prompt: &'static str,
    consultation: u64,
}

/// Result of starting a question.
#[derive(Debug)]
pub enum Turn {
    Done(Outcome),
    Call(PendingCall),
}

#[derive(Debug)]
pub struct Session {
    idea: Option<String>,
    selected: BotId,
    messages: Vec<Message>,
    in_flight: bool,
    last_error: Option<String>,
    min_idea_chars: usize,
    consultation: u64,
}

impl Session {
    pub const fn new(selected: BotId, min_idea_chars: usize) -> Self {
        Self {
            idea: None,
            selected,
            messages: Vec::new(),
            in_flight: false,
            last_error: None,
            min_idea_chars,
            consultation: 0,
        }
    }

    pub const fn from_config(config: &Config) -> Self {
        Self::new(
            config.consultation.default_bot,
            config.consultation.min_idea_chars,
        )
    }

    pub const fn phase(&self) -> Phase {
        if self.idea.is_some() {
            Phase::Consulting
        } else {
            Phase::NoIdea
        }
    }

    pub fn idea(&self) -> Option<&str> {
        self.idea.as_deref()
    }

    pub const fn selected(&self) -> BotId {
        self.selected
    }

    pub fn selected_bot(&self) -> &'static Bot {
        self.selected.bot()
    }

    /// Log in insertion order, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Log in display order, newest first.
    pub fn messages_newest_first(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().rev()
    }

    pub const fn in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub const fn select_bot(&mut self, bot: BotId) {
        self.selected = bot;
    }

    /// Discard idea, log and error, and start a new consultation.
    ///
    /// A reply still in flight for the old consultation is dropped when it
    /// completes.
    pub fn reset(&mut self) {
        tracing::info!(messages = self.messages.len(), "consultation reset");
        self.idea = None;
        self.messages.clear();
        self.last_error = None;
        self.consultation += 1;
    }

    /// Handle one submission from the input box, whichever phase we are in.
    pub fn submit(
        &mut self,
        input: &str,
        generator: &impl Generate,
    ) -> Result<Outcome, ConsultError> {
        match self.phase() {
            Phase::NoIdea => self.submit_idea(input),
            Phase::Consulting => self.ask(input, generator),
        }
    }

    /// Save the startup pitch.
    pub fn submit_idea(&mut self, input: &str) -> Result<Outcome, ConsultError> {
        let result = self.try_submit_idea(input);
        self.note(result)
    }

    fn try_submit_idea(&mut self, input: &str) -> Result<Outcome, ConsultError> {
        if self.idea.is_some() {
            return Err(ConsultError::IdeaLocked);
        }
        let idea = input.trim();
        if idea.is_empty() {
            return Ok(Outcome::Ignored);
        }
        if idea.chars().count() < self.min_idea_chars {
            return Err(ConsultError::Validation {
                min_chars: self.min_idea_chars,
            });
        }

        let saved = template::render_idea_saved(idea)?;
        self.idea = Some(idea.to_string());
        self.messages = vec![Message::system(saved)];
        self.last_error = None;
        tracing::info!(chars = idea.chars().count(), "idea saved");
        Ok(Outcome::IdeaSaved)
    }

    /// Ask the selected bot and wait for the reply.
    pub fn ask(
        &mut self,
        question: &str,
        generator: &impl Generate,
    ) -> Result<Outcome, ConsultError> {
        match self.begin_question(question)? {
            Turn::Done(outcome) => Ok(outcome),
            Turn::Call(call) => {
                let reply = generator.generate(&call.query, call.system_prompt);
                self.complete(call, reply)
            }
        }
    }

    /// Log the question and run the gate and the misdirection check.
    ///
    /// Returns [`Turn::Call`] when the model must be asked; the session is
    /// then in flight until [`Session::complete`] is called.
    pub fn begin_question(&mut self, question: &str) -> Result<Turn, ConsultError> {
        let result = self.try_begin_question(question);
        self.note(result)
    }

    fn try_begin_question(&mut self, question: &str) -> Result<Turn, ConsultError> {
        if self.in_flight {
            return Err(ConsultError::Busy);
        }
        let Some(idea) = self.idea.as_deref() else {
            return Err(ConsultError::NoIdea);
        };
        if question.trim().is_empty() {
            return Ok(Turn::Done(Outcome::Ignored));
        }

        let bot = self.selected.bot();
        self.last_error = None;

        if !is_on_topic(question, idea) {
            let advisory = template::render_out_of_scope()?;
            self.messages.push(Message::user(question.to_string(), bot));
            self.messages.push(Message::system(advisory));
            tracing::info!(bot = %bot.id, "question out of scope");
            return Ok(Turn::Done(Outcome::OutOfScope));
        }

        if let Some(better) = find_better_bot(question, bot.id) {
            let advisory = template::render_misdirected(bot, better.bot())?;
            self.messages.push(Message::user(question.to_string(), bot));
            self.messages.push(Message::bot(advisory, bot));
            tracing::info!(bot = %bot.id, suggested = %better, "question misdirected");
            return Ok(Turn::Done(Outcome::Misdirected { suggested: better }));
        }

        let query = template::render_query(idea, question)?;
        self.messages.push(Message::user(question.to_string(), bot));
        self.in_flight = true;
        Ok(Turn::Call(PendingCall {
            bot: bot.id,
            query,
            system_prompt: bot.system_instruction,
            consultation: self.consultation,
        }))
    }

    /// Record the model's reply (or failure) for a pending call.
    pub fn complete(
        &mut self,
        call: PendingCall,
        reply: Result<String, ConsultError>,
    ) -> Result<Outcome, ConsultError> {
        self.in_flight = false;
        let reply = self.note(reply)?;

        if call.consultation != self.consultation {
            tracing::debug!(bot = %call.bot, "dropping reply for a reset consultation");
            return Ok(Outcome::Ignored);
        }
        self.messages.push(Message::bot(reply, call.bot.bot()));
        Ok(Outcome::Answered)
    }

    fn note<T>(&mut self, result: Result<T, ConsultError>) -> Result<T, ConsultError> {
        if let Err(e) = &result {
            tracing::warn!(error = %e, "submission failed");
            self.last_error = Some(if e.is_remote() {
                format!("An error occurred: {e}")
            } else {
                e.to_string()
            });
        }
        result
    }
}
