//! Dry run of the relevance gate and the misdirection check.

use clap::Args;
use serde::Serialize;

use super::{ReportFormat, load_config};
use crate::bots::BotId;
use crate::error::ExitError;
use crate::relevance::{Relevance, idea_keywords, tokenize};
use crate::routing::{BotScore, find_better_bot, score_all};
use crate::session::Session;

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Startup idea (pitch)
    #[arg(long)]
    pub idea: String,
    /// Bot the question is addressed to (defaults to config)
    #[arg(long, value_enum)]
    pub bot: Option<BotId>,
    /// Question to check
    pub question: String,
    /// Output format
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Answer,
    OutOfScope,
    Misdirected,
}

#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub bot: BotId,
    pub question_tokens: Vec<String>,
    pub idea_keywords: Vec<String>,
    pub relevance: Relevance,
    pub scores: Vec<BotScore>,
    pub verdict: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested: Option<BotId>,
}

impl CheckReport {
    /// Evaluate `question` for `bot` in the same order a session does.
    pub fn build(idea: &str, bot: BotId, question: &str) -> Self {
        let relevance = Relevance::assess(question, idea);
        let suggested = if relevance.accepted() {
            find_better_bot(question, bot)
        } else {
            None
        };
        let verdict = if !relevance.accepted() {
            Verdict::OutOfScope
        } else if suggested.is_some() {
            Verdict::Misdirected
        } else {
            Verdict::Answer
        };

        Self {
            bot,
            question_tokens: tokenize(question),
            idea_keywords: idea_keywords(idea),
            relevance,
            scores: score_all(question),
            verdict,
            suggested,
        }
    }
}

impl CheckArgs {
    pub fn execute(&self, config_path: Option<&std::path::Path>) -> anyhow::Result<()> {
        let config = load_config(config_path)?;
        let bot = self.bot.unwrap_or(config.consultation.default_bot);

        // Same pitch validation as a real consultation.
        let mut session = Session::from_config(&config);
        session.submit_idea(&self.idea).map_err(ExitError::from)?;
        let Some(idea) = session.idea() else {
            return Err(ExitError::Validation("the idea must not be blank".into()).into());
        };

        let report = CheckReport::build(idea, bot, &self.question);
        match self.format {
            ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            ReportFormat::Text => print_text(&report),
        }
        Ok(())
    }
}

fn print_text(report: &CheckReport) {
    println!("bot:            {}", report.bot);
    println!("question tokens: {}", report.question_tokens.join(" "));
    println!("idea keywords:  {}", report.idea_keywords.join(" "));
    println!(
        "idea overlap:   {}   topic keyword: {}",
        report.relevance.has_idea_overlap, report.relevance.touches_topic
    );
    let scores = report
        .scores
        .iter()
        .map(|s| format!("{}={}", s.bot, s.score))
        .collect::<Vec<_>>()
        .join(" ");
    println!("scores:         {scores}");
    match (report.verdict, report.suggested) {
        (Verdict::Misdirected, Some(better)) => {
            println!("verdict:        misdirected (ask {})", better.bot().name);
        }
        (Verdict::OutOfScope, _) => println!("verdict:        out of scope"),
        _ => println!("verdict:        answer"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLANTS: &str = "A mobile app that uses computer vision to identify plants";

    #[test]
    fn report_verdicts() {
        let r = CheckReport::build(PLANTS, BotId::Structure, "What legal structure should I use?");
        assert_eq!(r.verdict, Verdict::Answer);
        assert_eq!(r.suggested, None);

        let r = CheckReport::build(PLANTS, BotId::Marketing, "What legal structure should I use?");
        assert_eq!(r.verdict, Verdict::Misdirected);
        assert_eq!(r.suggested, Some(BotId::Structure));

        let r = CheckReport::build(PLANTS, BotId::Structure, "What's the capital of France?");
        assert_eq!(r.verdict, Verdict::OutOfScope);
        assert_eq!(r.scores.len(), 4);
    }

    #[test]
    fn report_serializes_snake_case() {
        let r = CheckReport::build(PLANTS, BotId::Structure, "What's the capital of France?");
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["verdict"], "out_of_scope");
        assert_eq!(json["bot"], "structure");
        assert!(json.get("suggested").is_none());
    }
}
