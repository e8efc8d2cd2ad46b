//! Logging utilities and configuration for flow-guard.
//!
//! The engine emits `tracing` events while it walks a record. Per-rule output
//! is gated by [`LogConfig`] so that hot validation loops stay quiet unless
//! explicitly asked for details.

/// Logging configuration attached to a validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Whether to log the outcome of every rule evaluation
    pub log_rule_details: bool,
    /// Whether to log values written by defaults and sanitizers
    pub log_sanitization: bool,
    /// Maximum length for logged values (to prevent huge logs)
    pub max_field_length: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_rule_details: false,
            log_sanitization: true,
            max_field_length: 256,
        }
    }
}

impl LogConfig {
    /// Creates a verbose configuration suitable for debugging schemas.
    pub fn verbose() -> Self {
        Self {
            log_rule_details: true,
            log_sanitization: true,
            max_field_length: 1024,
        }
    }

    /// Creates a minimal configuration for production with lowest overhead.
    pub fn production() -> Self {
        Self {
            log_rule_details: false,
            log_sanitization: false,
            max_field_length: 128,
        }
    }
}

/// Macro for conditional rule logging.
#[macro_export]
macro_rules! log_rule {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_rule_details {
            tracing::trace!($($arg)*);
        }
    };
}

/// Macro for logging values written into the record.
#[macro_export]
macro_rules! log_sanitize {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_sanitization {
            tracing::debug!($($arg)*);
        }
    };
}

/// Truncates a string to the maximum field length if needed.
pub fn truncate_field(value: &str, max_length: usize) -> String {
    if value.len() <= max_length {
        return value.to_string();
    }
    let mut end = max_length;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...(truncated)", &value[..end])
}

/// Utilities for installing a `tracing` subscriber.
pub mod setup {
    use tracing::Level;
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    /// Output format of the installed subscriber.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum LogFormat {
        #[default]
        Pretty,
        Compact,
        /// One JSON object per event
        Json,
    }

    /// Global subscriber settings.
    #[derive(Debug, Clone)]
    pub struct LoggingConfig {
        /// Level for every other crate
        pub level: Level,
        /// Level for `flow_guard` events
        pub flow_level: Level,
        pub format: LogFormat,
        /// Full filter directive, replacing the two levels
        pub directives: Option<String>,
    }

    impl Default for LoggingConfig {
        fn default() -> Self {
            Self {
                level: Level::INFO,
                flow_level: Level::DEBUG,
                format: LogFormat::Pretty,
                directives: None,
            }
        }
    }

    impl LoggingConfig {
        /// Quiet JSON output for services.
        pub fn production() -> Self {
            Self {
                level: Level::WARN,
                flow_level: Level::INFO,
                format: LogFormat::Json,
                directives: None,
            }
        }

        /// Everything flow-guard emits, including per-rule traces.
        pub fn development() -> Self {
            Self {
                level: Level::DEBUG,
                flow_level: Level::TRACE,
                ..Self::default()
            }
        }

        pub fn with_format(mut self, format: LogFormat) -> Self {
            self.format = format;
            self
        }

        pub fn with_directives(mut self, directives: impl Into<String>) -> Self {
            self.directives = Some(directives.into());
            self
        }

        /// The `EnvFilter` directive this configuration stands for.
        pub fn directives(&self) -> String {
            match &self.directives {
                Some(directives) => directives.clone(),
                None => format!(
                    "{},flow_guard={}",
                    self.level.as_str().to_lowercase(),
                    self.flow_level.as_str().to_lowercase()
                ),
            }
        }
    }

    /// Installs the global subscriber. `RUST_LOG` wins over the configured
    /// directives.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use flow_guard::logging::setup::{init_logging, LogFormat, LoggingConfig};
    ///
    /// init_logging(LoggingConfig::development().with_format(LogFormat::Json)).unwrap();
    /// ```
    pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(config.directives()))?;

        let layer = match config.format {
            LogFormat::Pretty => tracing_subscriber::fmt::layer().boxed(),
            LogFormat::Compact => tracing_subscriber::fmt::layer().compact().boxed(),
            LogFormat::Json => tracing_subscriber::fmt::layer().json().boxed(),
        };

        tracing_subscriber::registry().with(filter).with(layer).try_init()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::setup::{LogFormat, LoggingConfig};
    use super::*;

    #[test]
    fn test_presets() {
        let default = LogConfig::default();
        assert!(!default.log_rule_details);
        assert!(default.log_sanitization);

        assert!(LogConfig::verbose().log_rule_details);
        let production = LogConfig::production();
        assert_eq!(production.max_field_length, 128);
        assert!(!production.log_sanitization);
    }

    #[test]
    fn test_truncate_field() {
        assert_eq!(truncate_field("short", 10), "short");
        assert_eq!(
            truncate_field("0123456789abcdef", 10),
            "0123456789...(truncated)"
        );
        assert_eq!(truncate_field("h\u{e9}llo", 2), "h...(truncated)");
    }

    #[test]
    fn test_directives() {
        assert_eq!(LoggingConfig::default().directives(), "info,flow_guard=debug");
        assert_eq!(LoggingConfig::production().directives(), "warn,flow_guard=info");
        assert_eq!(LoggingConfig::production().format, LogFormat::Json);

        let custom = LoggingConfig::development().with_directives("flow_guard=trace");
        assert_eq!(custom.directives(), "flow_guard=trace");
        assert_eq!(custom.with_format(LogFormat::Compact).format, LogFormat::Compact);
    }
}
