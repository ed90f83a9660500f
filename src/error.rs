//! Error responses for the HTTP surface
//!
//! Every failure a handler can produce is an [`AppError`]. It carries a kind
//! that decides the HTTP status and the stable `error` code in the JSON body,
//! a client-safe message, and optional internal details that are logged but
//! only returned to clients when the development error mode is active.
//!
//! Wire format:
//!
//! ```json
//! {"error": "invalid_credentials", "message": "Invalid credentials"}
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use schoolbook::error::{AppError, Result};
//!
//! async fn handler(state: State<AppState>) -> Result<Json<Vec<Student>>> {
//!     let students = state.store.list_students().await?;
//!     Ok(Json(students))
//! }
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::fmt;

use crate::store::StoreError;

// ============================================================================
// Error Configuration
// ============================================================================

/// Error handling configuration
#[derive(Debug, Clone)]
pub struct ErrorConfig {
    /// Whether to expose internal details in responses
    /// Should be `false` in production
    pub expose_details: bool,

    /// Whether to log errors as they are converted to responses
    pub log_errors: bool,

    /// Message returned for internal errors when details are hidden
    pub internal_error_message: String,
}

impl Default for ErrorConfig {
    fn default() -> Self {
        Self::production()
    }
}

impl ErrorConfig {
    /// Production configuration (secure defaults)
    pub fn production() -> Self {
        Self {
            expose_details: false,
            log_errors: true,
            internal_error_message: "An internal error occurred".to_string(),
        }
    }

    /// Development configuration (detailed errors)
    pub fn development() -> Self {
        Self {
            expose_details: true,
            log_errors: true,
            internal_error_message: "Internal server error".to_string(),
        }
    }

    /// Load from environment
    ///
    /// Uses `RUST_ENV` or `APP_ENV` to determine mode:
    /// - "production" or "prod" -> production config
    /// - anything else -> development config
    pub fn from_env() -> Self {
        let env = std::env::var("RUST_ENV")
            .or_else(|_| std::env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        Self::for_environment(&env)
    }

    /// Pick the mode for a named environment
    pub fn for_environment(env: &str) -> Self {
        match env.to_lowercase().as_str() {
            "production" | "prod" => Self::production(),
            _ => Self::development(),
        }
    }
}

// Set once at startup
static ERROR_CONFIG: std::sync::OnceLock<ErrorConfig> = std::sync::OnceLock::new();

/// Initialize error handling configuration
///
/// Only the first call has an effect.
pub fn init(config: ErrorConfig) {
    let _ = ERROR_CONFIG.set(config);
}

/// Get the current error configuration
pub fn config() -> &'static ErrorConfig {
    ERROR_CONFIG.get_or_init(ErrorConfig::default)
}

// ============================================================================
// Error Types
// ============================================================================

/// Application error returned by handlers and middleware
#[derive(Debug)]
pub struct AppError {
    /// Error kind determines HTTP status and handling
    pub kind: ErrorKind,
    /// User-facing message (safe to expose)
    pub message: String,
    /// Internal details (logged, not exposed in production)
    pub details: Option<String>,
    /// Original error (for logging)
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

/// Error categories with their HTTP status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Login rejected (401); never says which half was wrong
    InvalidCredentials,
    /// Missing or invalid bearer token (401)
    Unauthorized,
    /// Request body could not be understood (400)
    Validation,
    /// Not found (404)
    NotFound,
    /// Uniqueness violation in storage (409)
    Conflict,
    /// Request body over the configured limit (413)
    PayloadTooLarge,
    /// Request did not finish within the configured timeout (408)
    Timeout,
    /// Storage backend fault (500)
    Storage,
    /// Internal server error (500)
    Internal,
    /// Service unavailable (503)
    Unavailable,
}

impl ErrorKind {
    /// Get the HTTP status code for this error kind
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidCredentials | Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Timeout => StatusCode::REQUEST_TIMEOUT,
            Self::Storage | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Whether the message is safe to return verbatim in production
    pub fn expose_message(&self) -> bool {
        !matches!(self, Self::Storage | Self::Internal | Self::Unauthorized)
    }
}

impl AppError {
    /// Create a new error
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// Uniform login failure (401)
    pub fn invalid_credentials() -> Self {
        Self::new(ErrorKind::InvalidCredentials, "Invalid credentials")
    }

    /// Create an unauthorized error (401)
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    /// Create a validation error (400)
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a not found error (404)
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create a conflict error (409)
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Create an internal error (500) with source
    ///
    /// The message is what users see; the source is logged but not exposed.
    pub fn internal(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind: ErrorKind::Internal,
            message: message.into(),
            details: Some(source.to_string()),
            source: Some(Box::new(source)),
        }
    }

    /// Request body too large (413)
    pub fn payload_too_large() -> Self {
        Self::new(ErrorKind::PayloadTooLarge, "Request body is too large")
    }

    /// Request timed out (408)
    pub fn timeout() -> Self {
        Self::new(ErrorKind::Timeout, "Request took too long")
    }

    /// Create a service unavailable error (503)
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unavailable, message)
    }

    /// Add internal details (logged but not exposed)
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Stable code written to the `error` field
    pub fn code(&self) -> &'static str {
        match self.kind {
            ErrorKind::InvalidCredentials => "invalid_credentials",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Validation => "validation_failure",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "storage_conflict",
            ErrorKind::PayloadTooLarge => "payload_too_large",
            ErrorKind::Timeout => "request_timeout",
            ErrorKind::Storage => "storage_failure",
            ErrorKind::Internal => "internal_error",
            ErrorKind::Unavailable => "service_unavailable",
        }
    }

    fn log(&self) {
        if !config().log_errors {
            return;
        }

        let details = self.details.as_deref().unwrap_or("none");

        match self.kind {
            ErrorKind::Storage | ErrorKind::Internal | ErrorKind::Unavailable => {
                tracing::error!(
                    error_kind = %self.kind,
                    message = %self.message,
                    details = %details,
                    "Request failed"
                );
            }
            ErrorKind::InvalidCredentials | ErrorKind::Unauthorized => {
                tracing::warn!(
                    error_kind = %self.kind,
                    message = %self.message,
                    "Auth error"
                );
            }
            _ => {
                tracing::debug!(
                    error_kind = %self.kind,
                    message = %self.message,
                    details = %details,
                    "Client error"
                );
            }
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCredentials => write!(f, "invalid_credentials"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::Validation => write!(f, "validation"),
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::PayloadTooLarge => write!(f, "payload_too_large"),
            Self::Timeout => write!(f, "timeout"),
            Self::Storage => write!(f, "storage"),
            Self::Internal => write!(f, "internal"),
            Self::Unavailable => write!(f, "unavailable"),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

// ============================================================================
// Error Response
// ============================================================================

/// JSON error response body
#[derive(Debug, Clone, serde::Serialize)]
pub struct ErrorResponse {
    /// Stable error code
    pub error: String,
    /// Human-readable message
    pub message: String,
    /// Internal details (development mode only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();

        let cfg = config();
        let status = self.kind.status_code();

        let message = if cfg.expose_details || self.kind.expose_message() {
            self.message.clone()
        } else {
            match self.kind {
                ErrorKind::Unauthorized => "Authentication required".to_string(),
                ErrorKind::Storage => "Storage operation failed".to_string(),
                _ => cfg.internal_error_message.clone(),
            }
        };

        let response = ErrorResponse {
            error: self.code().to_string(),
            message,
            details: if cfg.expose_details { self.details } else { None },
        };

        (status, Json(response)).into_response()
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate { .. } => Self {
                kind: ErrorKind::Conflict,
                message: "A record with the same unique value already exists".to_string(),
                details: Some(err.to_string()),
                source: Some(Box::new(err)),
            },
            other => Self {
                kind: ErrorKind::Storage,
                message: "Storage operation failed".to_string(),
                details: Some(other.to_string()),
                source: Some(Box::new(other)),
            },
        }
    }
}

impl From<crate::password::PasswordError> for AppError {
    fn from(err: crate::password::PasswordError) -> Self {
        AppError::internal("Password processing failed", err)
    }
}

// ============================================================================
// Result type alias
// ============================================================================

/// Result type alias for handlers returning AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_status_codes() {
        assert_eq!(ErrorKind::InvalidCredentials.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorKind::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorKind::Validation.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorKind::Conflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorKind::Storage.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ErrorKind::Unavailable.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(ErrorKind::PayloadTooLarge.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(ErrorKind::Timeout.status_code(), StatusCode::REQUEST_TIMEOUT);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(AppError::invalid_credentials().code(), "invalid_credentials");
        assert_eq!(AppError::validation("x").code(), "validation_failure");
        assert_eq!(AppError::conflict("x").code(), "storage_conflict");
        assert_eq!(AppError::payload_too_large().code(), "payload_too_large");
        assert_eq!(AppError::timeout().code(), "request_timeout");
        assert_eq!(
            AppError::from(StoreError::Backend("disk I/O error".into())).code(),
            "storage_failure"
        );
    }

    #[test]
    fn test_duplicate_maps_to_conflict() {
        let err = AppError::from(StoreError::Duplicate {
            constraint: "students.roll".into(),
        });
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert!(err.details.unwrap().contains("students.roll"));
    }

    #[test]
    fn test_storage_message_is_not_exposed() {
        assert!(!ErrorKind::Storage.expose_message());
        assert!(!ErrorKind::Internal.expose_message());
        assert!(ErrorKind::InvalidCredentials.expose_message());
        assert!(ErrorKind::Validation.expose_message());
    }

    #[test]
    fn test_config_modes() {
        assert!(!ErrorConfig::production().expose_details);
        assert!(ErrorConfig::development().expose_details);
        assert!(!ErrorConfig::for_environment("PROD").expose_details);
        assert!(ErrorConfig::for_environment("staging").expose_details);
    }

    #[test]
    fn test_error_display() {
        let err = AppError::not_found("No such route");
        assert_eq!(format!("{}", err), "not_found: No such route");
    }
}
