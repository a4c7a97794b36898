//! Diagnostic tracing output for the binary

use tracing::{debug, Level as TracingLevel};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, Registry};

/// Environment variable holding the tracing level
pub const LOG_ENV: &str = "BLOCKFLOW_LOG";

/// Parse a tracing level, falling back to `INFO`
#[must_use]
pub fn parse_tracing_level(value: Option<&str>) -> TracingLevel {
    value
        .and_then(|level| level.parse::<TracingLevel>().ok())
        .unwrap_or(TracingLevel::INFO)
}

/// Install a stderr fmt subscriber filtered by [`LOG_ENV`]
///
/// Does nothing if a global subscriber is already set.
pub fn init_tracing() {
    let level = parse_tracing_level(std::env::var(LOG_ENV).ok().as_deref());
    if let Err(err) = Registry::default()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(LevelFilter::from_level(level)),
        )
        .try_init()
    {
        debug!(error = %err, "tracing subscriber already installed");
    }
}
