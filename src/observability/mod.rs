//! Logging setup and security event vocabulary
//!
//! Application code logs through the `tracing` macros and never touches the
//! subscriber. [`init`] installs a stdout subscriber once at startup with the
//! filter and format from [`ObservabilityConfig`].
//!
//! Security-relevant moments (logins, rejected tokens, the first-run admin
//! account) are logged through [`security_event!`](crate::security_event) so
//! they carry a consistent `security_event`, `category` and `severity` field.
//!
//! # Usage
//!
//! ```ignore
//! use schoolbook::observability::{self, ObservabilityConfig};
//!
//! observability::init(&ObservabilityConfig::from_env())?;
//! ```

mod config;
mod events;
mod providers;

pub use config::{LogFormat, ObservabilityConfig};
pub use events::{security_event, SecurityEvent, Severity};

use tracing::info;

/// Install the global tracing subscriber.
///
/// Fails if the filter does not parse or a subscriber is already installed.
pub fn init(config: &ObservabilityConfig) -> Result<(), ObservabilityError> {
    providers::init_stdout_tracing(config)?;

    info!(
        log_format = %config.log_format,
        log_filter = %config.log_filter,
        "Logging initialized"
    );

    Ok(())
}

/// Logging initialization errors
#[derive(Debug)]
pub enum ObservabilityError {
    /// Invalid filter directive
    Config(String),
    /// Subscriber could not be installed
    Provider(String),
}

impl std::fmt::Display for ObservabilityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "Logging config error: {}", msg),
            Self::Provider(msg) => write!(f, "Logging provider error: {}", msg),
        }
    }
}

impl std::error::Error for ObservabilityError {}
