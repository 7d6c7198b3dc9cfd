//! Tokenizing and the relevance gate.
//!
//! A question is in scope when it shares a token with the saved idea or
//! touches any specialist's topic keywords. Matching here is by whole token;
//! the misdirection scorer in [`crate::routing`] uses substring containment.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::bots::BOTS;

/// Maximum number of keywords derived from an idea.
pub const IDEA_KEYWORD_CAP: usize = 40;

/// Minimum token length for an idea keyword.
pub const IDEA_KEYWORD_MIN_LEN: usize = 4;

/// Below this many idea keywords the idea is considered too thin to discriminate.
pub const THIN_IDEA_KEYWORDS: usize = 3;

fn token_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("[a-z0-9]+").expect("valid token regex"))
}

/// Lower-case `text` and split it into alphanumeric runs.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    token_pattern()
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Distinct tokens of at least four characters, in first-seen order, capped at 40.
pub fn idea_keywords(idea: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    tokenize(idea)
        .into_iter()
        .filter(|t| t.len() >= IDEA_KEYWORD_MIN_LEN)
        .filter(|t| seen.insert(t.clone()))
        .take(IDEA_KEYWORD_CAP)
        .collect()
}

/// Union of every bot's keyword list, deduplicated, in declaration order.
pub fn global_topic_keywords() -> &'static [&'static str] {
    static KEYWORDS: OnceLock<Vec<&'static str>> = OnceLock::new();
    KEYWORDS.get_or_init(|| {
        let mut seen = HashSet::new();
        BOTS.iter()
            .flat_map(|b| b.keywords.iter().copied())
            .filter(|k| seen.insert(*k))
            .collect()
    })
}

/// How a question relates to the idea and the topic vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Relevance {
    pub has_idea_overlap: bool,
    pub touches_topic: bool,
    pub idea_keyword_count: usize,
}

impl Relevance {
    pub fn assess(question: &str, idea: &str) -> Self {
        let q_tokens = tokenize(question);
        let i_keywords = idea_keywords(idea);
        let topic = global_topic_keywords();

        Self {
            has_idea_overlap: q_tokens.iter().any(|t| i_keywords.contains(t)),
            touches_topic: q_tokens.iter().any(|t| topic.contains(&t.as_str())),
            idea_keyword_count: i_keywords.len(),
        }
    }

    pub const fn accepted(&self) -> bool {
        // A thin idea lets topic words carry the question on their own. The
        // general rule happens to accept the same set.
        if self.idea_keyword_count < THIN_IDEA_KEYWORDS {
            return self.touches_topic || self.has_idea_overlap;
        }
        self.has_idea_overlap || self.touches_topic
    }
}

/// Whether `question` is in scope for a consultation about `idea`.
pub fn is_on_topic(question: &str, idea: &str) -> bool {
    Relevance::assess(question, idea).accepted()
}
