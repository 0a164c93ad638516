//! Logging bootstrap.
//!
//! The crates log through `tracing`. Applications that do not install their
//! own subscriber can call [`init`], which reads:
//!
//! - `SESSIONDB_DEBUG=1` - Enable debug logging
//! - `SESSIONDB_LOG_LEVEL=trace|debug|info|warn|error|off` - Set log level
//! - `SESSIONDB_LOG_FORMAT=json|pretty|compact` - Set output format
//!
//! `RUST_LOG`, when set, takes precedence over the level.

use std::env;
use std::sync::Once;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Output format for log messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Multi-line human readable output
    Pretty,
    /// Single-line output
    Compact,
    /// One JSON object per line (default)
    Json,
}

impl Format {
    /// Parse a format name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pretty" => Some(Self::Pretty),
            "compact" => Some(Self::Compact),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Whether debug mode is enabled
    pub debug: bool,
    /// Minimum level directive (e.g. "info")
    pub level: String,
    /// Output format
    pub format: Format,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            debug: false,
            level: "info".to_string(),
            format: Format::Json,
        }
    }
}

impl LogConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let debug = env::var("SESSIONDB_DEBUG")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let level = env::var("SESSIONDB_LOG_LEVEL")
            .ok()
            .map(|s| s.to_lowercase())
            .filter(|s| {
                matches!(
                    s.as_str(),
                    "trace" | "debug" | "info" | "warn" | "error" | "off"
                )
            })
            .unwrap_or_else(|| if debug { "debug" } else { "info" }.to_string());

        let format = env::var("SESSIONDB_LOG_FORMAT")
            .ok()
            .and_then(|s| Format::parse(&s))
            .unwrap_or(Format::Json);

        Self {
            debug,
            level,
            format,
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level))
    }
}

static INIT: Once = Once::new();

/// Install a global subscriber configured from the environment.
///
/// Safe to call more than once; only the first call has an effect, and it
/// does nothing if another subscriber is already installed.
pub fn init() {
    INIT.call_once(|| {
        let config = LogConfig::from_env();
        let filter = config.filter();
        let registry = tracing_subscriber::registry().with(filter);

        let result = match config.format {
            Format::Json => registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .try_init(),
            Format::Pretty => registry
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .try_init(),
            Format::Compact => registry
                .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
                .try_init(),
        };

        if result.is_ok() {
            tracing::debug!(level = %config.level, format = ?config.format, "Logging initialized");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parse() {
        assert_eq!(Format::parse("pretty"), Some(Format::Pretty));
        assert_eq!(Format::parse("COMPACT"), Some(Format::Compact));
        assert_eq!(Format::parse("json"), Some(Format::Json));
        assert_eq!(Format::parse("xml"), None);
    }

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert!(!config.debug);
        assert_eq!(config.level, "info");
        assert_eq!(config.format, Format::Json);
    }

    #[test]
    fn test_init_is_idempotent() {
        init();
        init();
    }
}
