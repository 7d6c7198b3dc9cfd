//! Tracing subscriber setup.
//!
//! Logs go to stderr so stdout carries only the conversation. The filter
//! comes from `PITCHDESK_LOG` (default `warn`); `PITCHDESK_LOG_FORMAT=json`
//! switches to JSON lines.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

pub const LOG_ENV: &str = "PITCHDESK_LOG";
pub const LOG_FORMAT_ENV: &str = "PITCHDESK_LOG_FORMAT";

pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let json = std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::NONE);

    // A second init (e.g. in tests) keeps the first subscriber.
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.with_target(false).try_init()
    };
}
