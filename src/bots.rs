//! The fixed roster of specialist bots.
//!
//! The set is closed: four consultants, each with a keyword list used for
//! routing and a system instruction sent along with every question.

use serde::{Deserialize, Serialize};

/// Identifier of a specialist bot.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    schemars::JsonSchema,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum BotId {
    #[default]
    Structure,
    Marketing,
    Financial,
    Mvp,
}

/// Static definition of a specialist.
#[derive(Debug)]
pub struct Bot {
    pub id: BotId,
    pub name: &'static str,
    pub description: &'static str,
    pub keywords: &'static [&'static str],
    pub system_instruction: &'static str,
}

impl Bot {
    /// Leading clause of the description, used in redirect advisories.
    pub fn specialty(&self) -> &'static str {
        self.description
            .split(", ")
            .next()
            .unwrap_or(self.description)
    }
}

/// All bots in declaration order. Routing tie-breaks depend on this order.
pub static BOTS: [Bot; 4] = [
    Bot {
        id: BotId::Structure,
        name: "Structure Bot",
        description: "legal setup, team roles, and initial operations.",
        keywords: &[
            "team",
            "legal",
            "incorporate",
            "roles",
            "setup",
            "compliance",
            "company",
            "co-founder",
            "org",
            "roadmap",
            "operations",
            "structure",
            "hiring",
            "process",
        ],
        system_instruction: "Act as a seasoned operations and organizational development expert. \
Your goal is to provide a concise, single-paragraph summary on the optimal business structure \
(e.g., LLC, Inc.), initial team roles, and required operational setup for the user's startup idea. \
DO NOT discuss marketing, finance, or product definition (MVP).",
    },
    Bot {
        id: BotId::Marketing,
        name: "Marketing Bot",
        description: "target audience, acquisition channels, and brand strategy.",
        keywords: &[
            "advertise",
            "audience",
            "channel",
            "brand",
            "seo",
            "growth",
            "sales",
            "customers",
            "promotion",
            "social",
            "content",
            "launch",
            "retention",
            "positioning",
            "awareness",
            "campaign",
        ],
        system_instruction: "Act as a leading digital marketing strategist. Your goal is to suggest \
a concise, single-paragraph initial marketing strategy, including target audience identification \
and key acquisition channels (e.g., social, content). DO NOT discuss structure, finance, or \
product definition (MVP).",
    },
    Bot {
        id: BotId::Financial,
        name: "Financial Bot",
        description: "revenue models, initial costs, and funding avenues.",
        keywords: &[
            "cost",
            "budget",
            "revenue",
            "funding",
            "investment",
            "expense",
            "price",
            "monetize",
            "valuation",
            "raise",
            "cac",
            "ltv",
            "runway",
            "forecast",
            "break-even",
            "pricing",
        ],
        system_instruction: "Act as a financial modeling and planning consultant. Your goal is to \
provide a concise, single-paragraph overview of potential revenue models (e.g., subscription, \
one-time sale), initial estimated costs, and potential funding avenues (e.g., bootstrapping, \
seed round). DO NOT discuss structure, marketing, or product definition (MVP).",
    },
    Bot {
        id: BotId::Mvp,
        name: "MVP Bot",
        description: "Minimal Viable Product and core feature set for validation.",
        keywords: &[
            "feature",
            "product",
            "prototype",
            "mock",
            "validation",
            "core",
            "roadmap",
            "user story",
            "spec",
            "version 1",
            "acceptance criteria",
            "experiment",
            "wireframe",
            "pilot",
        ],
        system_instruction: "Act as a Chief Product Officer (CPO). Your goal is to define a concise, \
single-paragraph Minimal Viable Product (MVP) for the user's idea, including its absolute core \
feature set and the primary validation metric (how to measure success). DO NOT discuss \
structure, marketing, or finance.",
    },
];

impl BotId {
    /// Stable string key, as used on the command line and in config.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Structure => "structure",
            Self::Marketing => "marketing",
            Self::Financial => "financial",
            Self::Mvp => "mvp",
        }
    }

    /// Look up the bot definition.
    pub fn bot(self) -> &'static Bot {
        match self {
            Self::Structure => &BOTS[0],
            Self::Marketing => &BOTS[1],
            Self::Financial => &BOTS[2],
            Self::Mvp => &BOTS[3],
        }
    }

    /// Parse a bot id, accepting the key or the display name (case-insensitive).
    pub fn parse(raw: &str) -> Option<Self> {
        let needle = raw.trim().to_lowercase();
        BOTS.iter()
            .find(|b| b.id.as_str() == needle || b.name.to_lowercase() == needle)
            .map(|b| b.id)
    }

    /// Position in [`BOTS`].
    pub fn index(self) -> usize {
        BOTS.iter().position(|b| b.id == self).unwrap_or(0)
    }
}

impl std::fmt::Display for BotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_matches_ids() {
        for (i, bot) in BOTS.iter().enumerate() {
            assert_eq!(bot.id.bot().name, bot.name);
            assert_eq!(bot.id.index(), i);
        }
    }

    #[test]
    fn specialty_is_first_clause() {
        assert_eq!(BotId::Structure.bot().specialty(), "legal setup");
        assert_eq!(BotId::Marketing.bot().specialty(), "target audience");
        assert_eq!(
            BotId::Mvp.bot().specialty(),
            "Minimal Viable Product and core feature set for validation."
        );
    }

    #[test]
    fn parse_accepts_key_and_name() {
        assert_eq!(BotId::parse("mvp"), Some(BotId::Mvp));
        assert_eq!(BotId::parse("  Financial Bot "), Some(BotId::Financial));
        assert_eq!(BotId::parse("MARKETING"), Some(BotId::Marketing));
        assert_eq!(BotId::parse("legal"), None);
    }

    #[test]
    fn default_is_first_bot() {
        assert_eq!(BotId::default(), BOTS[0].id);
    }
}
