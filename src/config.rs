//! HTTP hardening settings
//!
//! Consumed by [`SecureRouter::with_security`](crate::SecureRouter::with_security).

use std::time::Duration;

use crate::app_config::{env_duration, env_flag, env_size, ConfigError, EnvLookup};

/// Settings for the layers wrapped around the API router.
///
/// # Example
///
/// ```ignore
/// use schoolbook::SecurityConfig;
///
/// let config = SecurityConfig::builder()
///     .max_request_size(64 * 1024)
///     .request_timeout(Duration::from_secs(10))
///     .cors_origins(vec!["https://office.example-school.org"])
///     .build();
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SecurityConfig {
    /// Maximum request body size in bytes
    pub max_request_size: usize,

    /// Requests running longer than this are aborted
    pub request_timeout: Duration,

    /// CORS allowed origins
    /// Empty = restrictive (same-origin only)
    /// ["*"] = permissive (any origin, mirrored so credentials still work)
    /// ["https://..."] = explicit allowlist
    pub cors_origins: Vec<String>,

    /// Add security response headers
    pub security_headers_enabled: bool,

    /// Log every request/response through tower-http
    pub tracing_enabled: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_request_size: 1024 * 1024, // 1MB
            request_timeout: Duration::from_secs(30),
            cors_origins: Vec::new(),
            security_headers_enabled: true,
            tracing_enabled: true,
        }
    }
}

impl SecurityConfig {
    /// Relaxed settings for local development: any origin, larger bodies.
    pub fn development() -> Self {
        Self {
            max_request_size: 10 * 1024 * 1024, // 10MB
            request_timeout: Duration::from_secs(60),
            cors_origins: vec!["*".to_string()],
            security_headers_enabled: true,
            tracing_enabled: true,
        }
    }

    /// Defaults overridden by environment variables.
    ///
    /// - `MAX_REQUEST_SIZE`: e.g., "10MB" (default: "1MB")
    /// - `REQUEST_TIMEOUT`: e.g., "30s", "5m" (default: "30s")
    /// - `CORS_ALLOWED_ORIGINS`: comma-separated, or "*" (default: empty/restrictive)
    /// - `SECURITY_HEADERS_ENABLED`: "true"/"false" (default: "true")
    /// - `TRACING_ENABLED`: "true"/"false" (default: "true")
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env(&|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Overlay whichever variables `get` returns onto this config.
    pub fn apply_env(&mut self, get: EnvLookup<'_>) -> Result<(), ConfigError> {
        if let Some(size) = env_size(get, "MAX_REQUEST_SIZE")? {
            self.max_request_size = size;
        }
        if let Some(timeout) = env_duration(get, "REQUEST_TIMEOUT")? {
            self.request_timeout = timeout;
        }
        if let Some(origins) = get("CORS_ALLOWED_ORIGINS") {
            self.cors_origins = split_origins(&origins);
        }
        if let Some(enabled) = env_flag(get, "SECURITY_HEADERS_ENABLED")? {
            self.security_headers_enabled = enabled;
        }
        if let Some(enabled) = env_flag(get, "TRACING_ENABLED")? {
            self.tracing_enabled = enabled;
        }
        Ok(())
    }

    /// Create a new builder for programmatic configuration.
    pub fn builder() -> SecurityConfigBuilder {
        SecurityConfigBuilder::default()
    }

    /// Check if CORS is in permissive mode (allows any origin).
    pub fn cors_is_permissive(&self) -> bool {
        self.cors_origins.iter().any(|o| o == "*")
    }

    /// Check if CORS is in restrictive mode (same-origin only).
    pub fn cors_is_restrictive(&self) -> bool {
        self.cors_origins.is_empty()
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect()
}

/// Builder for SecurityConfig
#[derive(Debug, Clone, Default)]
pub struct SecurityConfigBuilder {
    config: SecurityConfig,
}

impl SecurityConfigBuilder {
    /// Set maximum request body size in bytes.
    pub fn max_request_size(mut self, size: usize) -> Self {
        self.config.max_request_size = size;
        self
    }

    /// Set request timeout duration.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Set CORS allowed origins.
    pub fn cors_origins(mut self, origins: Vec<&str>) -> Self {
        self.config.cors_origins = origins.into_iter().map(String::from).collect();
        self
    }

    /// Allow any CORS origin.
    pub fn cors_permissive(mut self) -> Self {
        self.config.cors_origins = vec!["*".to_string()];
        self
    }

    /// Disable security headers.
    pub fn disable_security_headers(mut self) -> Self {
        self.config.security_headers_enabled = false;
        self
    }

    /// Disable request/response tracing.
    pub fn disable_tracing(mut self) -> Self {
        self.config.tracing_enabled = false;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> SecurityConfig {
        self.config
    }
}
