//! Tracing subscriber setup.
//!
//! The level comes from `-v` repetition when given, else from
//! `ARDUINO_LINT_LOG_LEVEL`, else `warn`. `ARDUINO_LINT_LOG_FORMAT=json`
//! switches to one JSON object per event. Logs always go to stderr.

use anyhow::{Context, Result};
use arduino_lint_core::{LogFormat, Settings};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// The filter directive for a verbosity count and optional environment level.
pub fn filter_directive(verbose: u8, env_level: Option<Level>) -> String {
    match (verbose, env_level) {
        (0, Some(level)) => level.as_str().to_ascii_lowercase(),
        (0, _) => "warn".to_string(),
        (1, _) => "info".to_string(),
        (2, _) => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Fails if the level directive is invalid or a subscriber is already set.
pub fn init(verbose: u8, settings: &Settings) -> Result<()> {
    let directive = filter_directive(verbose, settings.log_level);
    let filter = EnvFilter::try_new(&directive)
        .with_context(|| format!("invalid log level {directive:?}"))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    let installed = match settings.log_format.unwrap_or(LogFormat::Text) {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("cannot install log subscriber: {e}"))
}

/// Installs a plain `warn` subscriber, ignoring failure. Used when the
/// settings themselves could not be parsed.
pub fn init_fallback() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("warn"))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
