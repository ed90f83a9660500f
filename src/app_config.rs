//! Application configuration
//!
//! One [`AppConfig`] holds everything the server needs. It is resolved in
//! three layers: built-in defaults, then an optional TOML file, then
//! environment variables. The signing secret is checked against the policy
//! for the deployment environment before the config is handed out.
//!
//! # Example
//!
//! ```ignore
//! use schoolbook::app_config::AppConfig;
//!
//! let config = AppConfig::load(Some(Path::new("schoolbook.toml")))?;
//! schoolbook::server::serve(config).await?;
//! ```
//!
//! # Environment Variables
//!
//! - `APP_ENV` or `RUST_ENV`: development | testing | staging | production
//! - `LISTEN_ADDR`: socket address (default: `127.0.0.1:5000`)
//! - `JWT_SECRET`: HS256 signing secret (required in staging and production)
//! - `TOKEN_LIFETIME`: e.g. "12h"; unset means tokens never expire
//! - `ADMIN_USERNAME`, `ADMIN_PASSWORD`: first-run account
//! - plus the variables read by [`DatabaseConfig`], [`SecurityConfig`] and
//!   [`ObservabilityConfig`]

use serde::Deserialize;
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::config::SecurityConfig;
use crate::database::DatabaseConfig;
use crate::jwt_secret::{generate_secret, JwtSecretError, SecretPolicy};
use crate::observability::{LogFormat, ObservabilityConfig};
use crate::parse::{parse_duration, parse_size};

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:5000";
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

/// Source of environment values; `std::env::var` in production, a map in tests.
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

// ============================================================================
// Errors
// ============================================================================

/// Configuration could not be resolved.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}: expected {expected}")]
    Invalid {
        key: String,
        value: String,
        expected: &'static str,
    },

    #[error("JWT_SECRET must be set in the {0} environment")]
    MissingSecret(Environment),

    #[error(transparent)]
    WeakSecret(#[from] JwtSecretError),

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    fn invalid(key: &str, value: &str, expected: &'static str) -> Self {
        Self::Invalid {
            key: key.to_string(),
            value: value.to_string(),
            expected,
        }
    }
}

// ============================================================================
// Environment-variable helpers
// ============================================================================

pub(crate) fn env_parsed<T: FromStr>(
    get: EnvLookup<'_>,
    key: &str,
    expected: &'static str,
) -> Result<Option<T>, ConfigError> {
    match get(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::invalid(key, &raw, expected)),
    }
}

pub(crate) fn env_duration(get: EnvLookup<'_>, key: &str) -> Result<Option<Duration>, ConfigError> {
    match get(key) {
        None => Ok(None),
        Some(raw) => parse_duration(&raw)
            .map(Some)
            .ok_or_else(|| ConfigError::invalid(key, &raw, "a duration like 30s or 5m")),
    }
}

pub(crate) fn env_size(get: EnvLookup<'_>, key: &str) -> Result<Option<usize>, ConfigError> {
    match get(key) {
        None => Ok(None),
        Some(raw) => parse_size(&raw)
            .map(Some)
            .ok_or_else(|| ConfigError::invalid(key, &raw, "a size like 512KB or 1MB")),
    }
}

pub(crate) fn env_flag(get: EnvLookup<'_>, key: &str) -> Result<Option<bool>, ConfigError> {
    match get(key) {
        None => Ok(None),
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::invalid(key, &raw, "true or false")),
        },
    }
}

fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

// ============================================================================
// Environment
// ============================================================================

/// Deployment environment; decides secret policy and error verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Testing,
    Staging,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Testing => "testing",
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }

    /// Staging and production refuse to invent a signing secret.
    pub fn requires_explicit_secret(&self) -> bool {
        matches!(self, Self::Staging | Self::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "testing" | "test" => Ok(Self::Testing),
            "staging" | "stage" => Ok(Self::Staging),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(()),
        }
    }
}

// ============================================================================
// Auth settings
// ============================================================================

/// Fixed credentials created on first run.
#[derive(Clone, PartialEq)]
pub struct AdminAccount {
    pub username: String,
    pub password: String,
}

impl Default for AdminAccount {
    fn default() -> Self {
        Self {
            username: DEFAULT_ADMIN_USERNAME.to_string(),
            password: DEFAULT_ADMIN_PASSWORD.to_string(),
        }
    }
}

impl fmt::Debug for AdminAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminAccount")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Token signing and bootstrap settings.
#[derive(Clone, PartialEq)]
pub struct AuthConfig {
    /// HS256 signing secret
    pub jwt_secret: String,
    /// True when the secret was generated for this process only
    pub secret_generated: bool,
    /// `None` issues tokens without an `exp` claim
    pub token_lifetime: Option<Duration>,
    /// Account created when the user table is empty
    pub admin: AdminAccount,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("secret_generated", &self.secret_generated)
            .field("token_lifetime", &self.token_lifetime)
            .field("admin", &self.admin)
            .finish()
    }
}

impl AuthConfig {
    /// Settings with an explicit secret and default admin account.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: secret.into(),
            secret_generated: false,
            token_lifetime: None,
            admin: AdminAccount::default(),
        }
    }
}

// ============================================================================
// Config file
// ============================================================================

/// On-disk TOML layout. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub environment: Option<String>,
    pub listen_addr: Option<String>,
    #[serde(default)]
    pub database: DatabaseSection,
    #[serde(default)]
    pub auth: AuthSection,
    #[serde(default)]
    pub admin: AdminSection,
    #[serde(default)]
    pub http: HttpSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseSection {
    pub url: Option<String>,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout: Option<String>,
    pub busy_timeout: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthSection {
    pub jwt_secret: Option<String>,
    pub token_lifetime: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdminSection {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpSection {
    pub max_request_size: Option<String>,
    pub request_timeout: Option<String>,
    pub cors_allowed_origins: Option<Vec<String>>,
    pub security_headers: Option<bool>,
    pub tracing: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    pub filter: Option<String>,
    pub format: Option<String>,
}

impl ConfigFile {
    /// Read and parse a TOML file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn file_duration(key: &str, raw: &Option<String>) -> Result<Option<Duration>, ConfigError> {
    raw.as_deref()
        .map(|s| parse_duration(s).ok_or_else(|| ConfigError::invalid(key, s, "a duration like 30s or 5m")))
        .transpose()
}

// ============================================================================
// AppConfig
// ============================================================================

/// Everything needed to run the server.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub listen_addr: SocketAddr,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub security: SecurityConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Resolve from the optional file and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => ConfigFile::from_path(path)?,
            None => ConfigFile::default(),
        };
        Self::resolve(file, &process_env)
    }

    /// Resolve from environment variables only.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Layer defaults, then `file`, then whatever `get` returns.
    pub fn resolve(file: ConfigFile, get: EnvLookup<'_>) -> Result<Self, ConfigError> {
        let environment = match get("APP_ENV").or_else(|| get("RUST_ENV")) {
            Some(raw) => raw.parse().map_err(|_| {
                ConfigError::invalid("APP_ENV", &raw, "development, testing, staging or production")
            })?,
            None => match file.environment.as_deref() {
                Some(raw) => raw.parse().map_err(|_| {
                    ConfigError::invalid("environment", raw, "development, testing, staging or production")
                })?,
                None => Environment::default(),
            },
        };

        let listen_raw = get("LISTEN_ADDR")
            .or(file.listen_addr)
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr = listen_raw
            .parse()
            .map_err(|_| ConfigError::invalid("LISTEN_ADDR", &listen_raw, "host:port"))?;

        // Database
        let mut database = DatabaseConfig::default();
        let db = file.database;
        if let Some(url) = db.url {
            database.database_url = url;
        }
        if let Some(n) = db.max_connections {
            database.max_connections = n;
        }
        if let Some(n) = db.min_connections {
            database.min_connections = n;
        }
        if let Some(t) = file_duration("database.acquire_timeout", &db.acquire_timeout)? {
            database.acquire_timeout = t;
        }
        if let Some(t) = file_duration("database.busy_timeout", &db.busy_timeout)? {
            database.busy_timeout = t;
        }
        database.apply_env(get)?;

        // HTTP layers
        let mut security = match environment {
            Environment::Development => SecurityConfig::development(),
            _ => SecurityConfig::default(),
        };
        let http = file.http;
        if let Some(raw) = http.max_request_size.as_deref() {
            security.max_request_size = parse_size(raw)
                .ok_or_else(|| ConfigError::invalid("http.max_request_size", raw, "a size like 512KB or 1MB"))?;
        }
        if let Some(t) = file_duration("http.request_timeout", &http.request_timeout)? {
            security.request_timeout = t;
        }
        if let Some(origins) = http.cors_allowed_origins {
            security.cors_origins = origins;
        }
        if let Some(enabled) = http.security_headers {
            security.security_headers_enabled = enabled;
        }
        if let Some(enabled) = http.tracing {
            security.tracing_enabled = enabled;
        }
        security.apply_env(get)?;

        // Logging
        let mut observability = ObservabilityConfig::default();
        if let Some(filter) = file.logging.filter {
            observability.log_filter = filter;
        }
        if let Some(raw) = file.logging.format.as_deref() {
            observability.log_format = LogFormat::from_str_loose(raw)
                .ok_or_else(|| ConfigError::invalid("logging.format", raw, "pretty, json or compact"))?;
        }
        observability.apply_env(get);

        // Auth
        let token_lifetime = match get("TOKEN_LIFETIME") {
            Some(_) => env_duration(get, "TOKEN_LIFETIME")?,
            None => file_duration("auth.token_lifetime", &file.auth.token_lifetime)?,
        }
        .filter(|d| !d.is_zero());

        let admin = AdminAccount {
            username: get("ADMIN_USERNAME")
                .or(file.admin.username)
                .unwrap_or_else(|| DEFAULT_ADMIN_USERNAME.to_string()),
            password: get("ADMIN_PASSWORD")
                .or(file.admin.password)
                .unwrap_or_else(|| DEFAULT_ADMIN_PASSWORD.to_string()),
        };

        let (jwt_secret, secret_generated) = match get("JWT_SECRET").or(file.auth.jwt_secret) {
            Some(secret) => {
                SecretPolicy::for_environment(environment).validate(&secret)?;
                (secret, false)
            }
            None if environment.requires_explicit_secret() => {
                return Err(ConfigError::MissingSecret(environment));
            }
            None => (generate_secret(environment), true),
        };

        Ok(Self {
            environment,
            listen_addr,
            database,
            auth: AuthConfig {
                jwt_secret,
                secret_generated,
                token_lifetime,
                admin,
            },
            security,
            observability,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt_secret::generate_secret;
    use std::collections::HashMap;

    fn resolve_with(file: ConfigFile, vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::resolve(file, &|k| vars.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = resolve_with(ConfigFile::default(), &[]).unwrap();
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.listen_addr, "127.0.0.1:5000".parse().unwrap());
        assert_eq!(config.database.database_url, "sqlite://school_api.db");
        assert_eq!(config.auth.admin, AdminAccount::default());
        assert_eq!(config.auth.token_lifetime, None);
        assert!(config.auth.secret_generated);
        assert!(config.security.cors_is_permissive());
    }

    #[test]
    fn test_production_requires_secret() {
        let err = resolve_with(ConfigFile::default(), &[("APP_ENV", "production")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSecret(Environment::Production)));
    }

    #[test]
    fn test_production_rejects_weak_secret() {
        let err = resolve_with(
            ConfigFile::default(),
            &[("APP_ENV", "prod"), ("JWT_SECRET", "super-secret-key")],
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::WeakSecret(_)));
    }

    #[test]
    fn test_production_with_strong_secret() {
        let secret = generate_secret(Environment::Production);
        let config = resolve_with(
            ConfigFile::default(),
            &[
                ("APP_ENV", "production"),
                ("JWT_SECRET", secret.as_str()),
                ("TOKEN_LIFETIME", "12h"),
            ],
        )
        .unwrap();
        assert!(config.is_production());
        assert!(!config.auth.secret_generated);
        assert_eq!(config.auth.jwt_secret, secret);
        assert_eq!(config.auth.token_lifetime, Some(Duration::from_secs(12 * 3600)));
        assert!(config.security.cors_is_restrictive());
    }

    #[test]
    fn test_file_then_env_layering() {
        let file: ConfigFile = toml::from_str(
            r#"
            listen_addr = "0.0.0.0:8000"

            [database]
            url = "sqlite://from-file.db"
            busy_timeout = "2s"

            [admin]
            username = "principal"

            [http]
            cors_allowed_origins = ["https://office.example"]

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        let config = resolve_with(file, &[("DATABASE_URL", "sqlite://from-env.db")]).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:8000".parse().unwrap());
        assert_eq!(config.database.database_url, "sqlite://from-env.db");
        assert_eq!(config.database.busy_timeout, Duration::from_secs(2));
        assert_eq!(config.auth.admin.username, "principal");
        assert_eq!(config.auth.admin.password, DEFAULT_ADMIN_PASSWORD);
        assert_eq!(config.security.cors_origins, vec!["https://office.example"]);
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }

    #[test]
    fn test_unknown_file_keys_rejected() {
        let parsed: Result<ConfigFile, _> = toml::from_str("listen_port = 5000");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_invalid_values_name_the_key() {
        let err = resolve_with(ConfigFile::default(), &[("LISTEN_ADDR", "localhost")]).unwrap_err();
        assert!(err.to_string().contains("LISTEN_ADDR"));

        let err = resolve_with(ConfigFile::default(), &[("APP_ENV", "qa")]).unwrap_err();
        assert!(err.to_string().contains("APP_ENV"));

        let err = resolve_with(ConfigFile::default(), &[("TOKEN_LIFETIME", "forever")]).unwrap_err();
        assert!(err.to_string().contains("TOKEN_LIFETIME"));
    }

    #[test]
    fn test_zero_lifetime_means_no_expiry() {
        let config = resolve_with(ConfigFile::default(), &[("TOKEN_LIFETIME", "0s")]).unwrap();
        assert_eq!(config.auth.token_lifetime, None);
    }

    #[test]
    fn test_missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigFile::from_path(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = resolve_with(ConfigFile::default(), &[]).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains(&config.auth.jwt_secret));
        assert!(!debug.contains(DEFAULT_ADMIN_PASSWORD));
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!("PROD".parse::<Environment>(), Ok(Environment::Production));
        assert_eq!("stage".parse::<Environment>(), Ok(Environment::Staging));
        assert!("qa".parse::<Environment>().is_err());
        assert!(Environment::Staging.requires_explicit_secret());
        assert!(!Environment::Testing.requires_explicit_secret());
    }
}
