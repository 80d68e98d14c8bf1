//! Structured logging via `tracing` (§10.2). One entry point, called once at
//! process start by the CLI; library code only ever emits `tracing` events
//! and never configures a subscriber itself.

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Output format for the stdout logging layer.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Initializes the global `tracing` subscriber. `level` is the default
/// filter directive, overridden entirely if `DEEPWIKI_LOG` is set.
pub fn init_logging(level: &str, format: LogFormat) -> Result<(), String> {
    let filter = EnvFilter::try_from_env("DEEPWIKI_LOG").unwrap_or_else(|_| EnvFilter::new(level));

    let registry = Registry::default().with(filter);
    let result = match format {
        LogFormat::Json => {
            let layer = fmt::layer().json().with_target(true).with_thread_ids(true);
            registry.with(layer).try_init()
        }
        LogFormat::Text => {
            let layer = fmt::layer().with_target(true);
            registry.with(layer).try_init()
        }
    };
    result.map_err(|e| format!("failed to initialize logging: {e}"))?;
    tracing::info!(level, ?format, "logging initialized");
    Ok(())
}

impl std::fmt::Debug for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

/// Parses a level string the same way the config layer accepts one.
pub fn parse_level(level: &str) -> Result<Level, String> {
    match level.to_ascii_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => Err(format!("invalid log level: {other} (use trace, debug, info, warn, or error)")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_level_accepts_known_levels() {
        assert_eq!(parse_level("info").unwrap(), Level::INFO);
        assert_eq!(parse_level("WARN").unwrap(), Level::WARN);
    }

    #[test]
    fn parse_level_rejects_unknown_levels() {
        assert!(parse_level("verbose").is_err());
    }
}
