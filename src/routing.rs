//! Misdirection check: is another specialist a better fit for the question?

use serde::Serialize;

use crate::bots::{BOTS, Bot, BotId};

/// Number of `bot`'s keywords that occur anywhere in the lower-cased question.
///
/// This is substring containment, so "org" also matches inside "organic".
pub fn score(bot: &Bot, question: &str) -> usize {
    let q = question.to_lowercase();
    bot.keywords.iter().filter(|kw| q.contains(*kw)).count()
}

/// Score of a single bot, as reported by `pitchdesk check`.
#[derive(Debug, Clone, Serialize)]
pub struct BotScore {
    pub bot: BotId,
    pub score: usize,
}

/// Scores for every bot in declaration order.
pub fn score_all(question: &str) -> Vec<BotScore> {
    BOTS.iter()
        .map(|b| BotScore {
            bot: b.id,
            score: score(b, question),
        })
        .collect()
}

/// Suggest a different bot when `current` is not the best match.
///
/// A challenger must strictly outscore the current bot; among challengers the
/// first one with the top score wins. When the current bot scores zero, the
/// first other bot with any hit is suggested.
pub fn find_better_bot(question: &str, current: BotId) -> Option<BotId> {
    let current_score = score(current.bot(), question);

    let mut best: Option<BotId> = None;
    let mut best_score = current_score;
    for bot in &BOTS {
        let sc = score(bot, question);
        if sc > best_score {
            best = Some(bot.id);
            best_score = sc;
        }
    }

    if let Some(better) = best
        && better != current
    {
        return Some(better);
    }

    if current_score == 0 {
        return BOTS
            .iter()
            .filter(|b| b.id != current)
            .find(|b| score(b, question) > 0)
            .map(|b| b.id);
    }

    None
}
