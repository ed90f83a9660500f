//! Security event logging
//!
//! ```ignore
//! use schoolbook::observability::SecurityEvent;
//!
//! security_event!(
//!     SecurityEvent::AuthenticationFailure,
//!     username = %username,
//!     reason = "unknown_user",
//!     "Login rejected"
//! );
//! ```

use std::fmt;

/// Security-relevant things that happen in the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityEvent {
    /// Credentials accepted and a token issued
    AuthenticationSuccess,
    /// Credentials rejected
    AuthenticationFailure,
    /// Client announced it discarded its token
    Logout,
    /// Protected route called without a valid token
    AccessDenied,
    /// First-run administrator account created
    AccountBootstrapped,
    /// Server accepted its listener
    SystemStartup,
    /// Server stopped accepting requests
    SystemShutdown,
    /// Storage opened and schema ready
    DatabaseConnected,
}

impl SecurityEvent {
    /// Get the event category for filtering/grouping
    pub fn category(&self) -> &'static str {
        match self {
            Self::AuthenticationSuccess | Self::AuthenticationFailure | Self::Logout => {
                "authentication"
            }
            Self::AccessDenied => "authorization",
            Self::AccountBootstrapped => "user_management",
            Self::SystemStartup | Self::SystemShutdown | Self::DatabaseConnected => "system",
        }
    }

    /// Get the severity level for the event
    pub fn severity(&self) -> Severity {
        match self {
            Self::AuthenticationFailure | Self::AccessDenied => Severity::High,
            Self::AuthenticationSuccess | Self::AccountBootstrapped => Severity::Medium,
            Self::Logout | Self::SystemStartup | Self::SystemShutdown | Self::DatabaseConnected => {
                Severity::Low
            }
        }
    }

    /// Get the event name as a string
    pub fn name(&self) -> &'static str {
        match self {
            Self::AuthenticationSuccess => "authentication_success",
            Self::AuthenticationFailure => "authentication_failure",
            Self::Logout => "logout",
            Self::AccessDenied => "access_denied",
            Self::AccountBootstrapped => "account_bootstrapped",
            Self::SystemStartup => "system_startup",
            Self::SystemShutdown => "system_shutdown",
            Self::DatabaseConnected => "database_connected",
        }
    }
}

impl fmt::Display for SecurityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Event severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Routine operations
    Low,
    /// Important state changes
    Medium,
    /// Security-relevant failures
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Log a security event with `security_event`, `category` and `severity`
/// fields attached. High maps to `warn`, medium to `info`, low to `debug`.
#[macro_export]
macro_rules! security_event {
    ($event:expr, $($field:tt)*) => {{
        let event: $crate::observability::SecurityEvent = $event;
        let event_name = event.name();
        let category = event.category();

        match event.severity() {
            $crate::observability::Severity::High => {
                ::tracing::warn!(
                    security_event = event_name,
                    category = category,
                    severity = "high",
                    $($field)*
                );
            }
            $crate::observability::Severity::Medium => {
                ::tracing::info!(
                    security_event = event_name,
                    category = category,
                    severity = "medium",
                    $($field)*
                );
            }
            $crate::observability::Severity::Low => {
                ::tracing::debug!(
                    security_event = event_name,
                    category = category,
                    severity = "low",
                    $($field)*
                );
            }
        }
    }};
}

pub use security_event;
