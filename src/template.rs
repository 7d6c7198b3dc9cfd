//! Template rendering for the scoped query and the advisory log entries.

use minijinja::{Environment, context};
use serde::Serialize;

use crate::bots::Bot;

const QUERY_TEMPLATE: &str = include_str!("templates/query.jinja");
const IDEA_SAVED_TEMPLATE: &str = include_str!("templates/idea_saved.jinja");
const OUT_OF_SCOPE_TEMPLATE: &str = include_str!("templates/out_of_scope.jinja");
const MISDIRECTED_TEMPLATE: &str = include_str!("templates/misdirected.jinja");

/// Bot fields exposed to templates.
#[derive(Debug, Serialize)]
struct BotInfo {
    name: &'static str,
    specialty: &'static str,
}

impl From<&Bot> for BotInfo {
    fn from(bot: &Bot) -> Self {
        Self {
            name: bot.name,
            specialty: bot.specialty(),
        }
    }
}

fn render<S: Serialize>(name: &str, source: &str, ctx: S) -> Result<String, minijinja::Error> {
    let mut env = Environment::new();
    env.add_template(name, source)?;
    env.get_template(name)?.render(ctx)
}

/// The user turn sent to the model: idea and question, scoped to the specialty.
pub fn render_query(idea: &str, question: &str) -> Result<String, minijinja::Error> {
    render("query", QUERY_TEMPLATE, context! { idea, question })
}

/// System message logged when a pitch is accepted.
pub fn render_idea_saved(idea: &str) -> Result<String, minijinja::Error> {
    render("idea_saved", IDEA_SAVED_TEMPLATE, context! { idea })
}

/// Advisory logged when a question fails the relevance gate.
pub fn render_out_of_scope() -> Result<String, minijinja::Error> {
    render("out_of_scope", OUT_OF_SCOPE_TEMPLATE, context! {})
}

/// Advisory logged by `current` when `target` is the better specialist.
pub fn render_misdirected(current: &Bot, target: &Bot) -> Result<String, minijinja::Error> {
    render(
        "misdirected",
        MISDIRECTED_TEMPLATE,
        context! {
            current => BotInfo::from(current),
            target => BotInfo::from(target),
        },
    )
}
