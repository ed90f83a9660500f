//! Logging configuration

use std::fmt;

use crate::app_config::EnvLookup;

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable multi-line output for development
    #[default]
    Pretty,
    /// One JSON object per line for log shippers
    Json,
    /// Compact single-line format
    Compact,
}

impl LogFormat {
    /// Case-insensitive parse; `None` for unknown names.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            "compact" => Some(Self::Compact),
            _ => None,
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
            Self::Compact => write!(f, "compact"),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ObservabilityConfig {
    /// Log output format
    pub log_format: LogFormat,
    /// `EnvFilter` directive (e.g., "info", "schoolbook=debug,tower_http=info")
    pub log_filter: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::default(),
            log_filter: "info".to_string(),
        }
    }
}

impl ObservabilityConfig {
    /// Create configuration from environment variables.
    ///
    /// - `LOG_FORMAT`: "pretty", "json", or "compact" (default: "pretty")
    /// - `RUST_LOG`: Log filter directive (default: "info")
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(&|key| std::env::var(key).ok());
        config
    }

    /// Overlay `LOG_FORMAT` and `RUST_LOG`. An unknown format is ignored with
    /// a note on stderr, since logging is not up yet.
    pub fn apply_env(&mut self, get: EnvLookup<'_>) {
        if let Some(raw) = get("LOG_FORMAT") {
            match LogFormat::from_str_loose(&raw) {
                Some(format) => self.log_format = format,
                None => eprintln!("Warning: unknown LOG_FORMAT '{}', keeping {}", raw, self.log_format),
            }
        }
        if let Some(filter) = get("RUST_LOG") {
            self.log_filter = filter;
        }
    }
}
