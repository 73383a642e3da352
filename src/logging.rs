//! Structured logging initialization
//!
//! The crate itself only emits `tracing` events. Host applications that do
//! not install their own subscriber can call [`init_logging`] or
//! [`init_logging_with_config`] once at startup.
//!
//! Worker lane and request events carry `request_id`, `kind` and `uri`
//! fields; token values are never logged.

use anyhow::{Context, Result};
use std::env;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log format: JSON for production, pretty-print for development
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level: trace/debug/info/warn/error
    pub log_level: String,
    /// Log format: json/pretty
    pub format: LogFormat,
    /// Write through a non-blocking background writer
    pub async_logging: bool,
    /// Extra filter directives (comma-separated, e.g. `authlane::http=trace`)
    pub target_filter: Option<String>,
    /// Include file:line location (dev only)
    pub include_location: bool,
}

impl LogConfig {
    /// Parse configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            log_level: env::var("AUTHLANE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: LogFormat::parse(
                &env::var("AUTHLANE_LOG_FORMAT").unwrap_or_else(|_| "json".to_string()),
            ),
            async_logging: env::var("AUTHLANE_LOG_ASYNC")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(false),
            target_filter: env::var("AUTHLANE_LOG_TARGET_FILTER").ok(),
            include_location: env::var("AUTHLANE_LOG_INCLUDE_LOCATION")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(false),
        }
    }

    /// Configuration for local development and tests
    pub fn default_dev() -> Self {
        Self {
            log_level: "debug".to_string(),
            format: LogFormat::Pretty,
            async_logging: false,
            target_filter: None,
            include_location: true,
        }
    }

    /// Default production configuration
    pub fn default_prod() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Json,
            async_logging: true,
            target_filter: None,
            include_location: false,
        }
    }

    fn level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        let mut env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level().as_str()));

        // reqwest/hyper connection pool chatter drowns out lane events at debug.
        if let Ok(directive) = "hyper_util=warn".parse() {
            env_filter = env_filter.add_directive(directive);
        }

        if let Some(target_filter) = &self.target_filter {
            for filter in target_filter.split(',') {
                let filter = filter.trim();
                if filter.is_empty() {
                    continue;
                }
                match filter.parse() {
                    Ok(directive) => env_filter = env_filter.add_directive(directive),
                    Err(_) => eprintln!("Warning: Invalid log filter directive: {}", filter),
                }
            }
        }
        env_filter
    }
}

/// Initialize logging at the given level, other settings from the environment
///
/// # Example
///
/// ```no_run
/// authlane::logging::init_logging("debug").expect("Failed to initialize logging");
/// ```
pub fn init_logging(log_level: &str) -> Result<()> {
    let mut config = LogConfig::from_env();
    config.log_level = log_level.to_string();
    init_logging_with_config(&config)
}

/// Initialize logging with a complete configuration
///
/// Fails if a global subscriber is already installed.
pub fn init_logging_with_config(config: &LogConfig) -> Result<()> {
    let registry = tracing_subscriber::registry().with(config.env_filter());

    if config.async_logging {
        let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stdout());

        let fmt_layer = match config.format {
            LogFormat::Json => tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_target(true)
                .with_thread_names(true)
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .with_writer(non_blocking)
                .boxed(),
            LogFormat::Pretty => tracing_subscriber::fmt::layer()
                .pretty()
                .with_target(true)
                .with_thread_names(true)
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .with_writer(non_blocking)
                .boxed(),
        };

        registry
            .with(fmt_layer)
            .try_init()
            .context("Failed to initialize async logging")?;

        // The writer flushes on guard drop; keep it for the process lifetime.
        std::mem::forget(guard);
    } else {
        let fmt_layer = match config.format {
            LogFormat::Json => tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_target(true)
                .with_thread_names(true)
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .boxed(),
            LogFormat::Pretty => tracing_subscriber::fmt::layer()
                .pretty()
                .with_target(true)
                .with_thread_names(true)
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .boxed(),
        };

        registry
            .with(fmt_layer)
            .try_init()
            .context("Failed to initialize sync logging")?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("PRETTY"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("anything"), LogFormat::Json);
    }

    #[test]
    fn test_default_configs() {
        let dev = LogConfig::default_dev();
        assert_eq!(dev.level(), Level::DEBUG);
        assert_eq!(dev.format, LogFormat::Pretty);
        assert!(!dev.async_logging);

        let prod = LogConfig::default_prod();
        assert_eq!(prod.level(), Level::INFO);
        assert_eq!(prod.format, LogFormat::Json);
        assert!(prod.async_logging);
    }

    #[test]
    fn test_unknown_level_falls_back_to_info() {
        let mut config = LogConfig::default_dev();
        config.log_level = "chatty".to_string();
        assert_eq!(config.level(), Level::INFO);
    }

    #[test]
    fn test_second_init_fails() {
        let config = LogConfig::default_dev();
        // Another test binary thread may already have installed one; either way
        // the second call in this process must report an error.
        let _ = init_logging_with_config(&config);
        assert!(init_logging_with_config(&config).is_err());
    }
}
