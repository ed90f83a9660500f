//! SQLite connection pool configuration
//!
//! Opens the pool that backs [`SqliteStore`](crate::store::SqliteStore) with
//! conservative limits and a startup health check.
//!
//! Foreign-key enforcement is switched off on every connection. The
//! `student_id` columns reference `students(id)` for documentation only; a
//! result or attendance row may name a student that does not exist.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::app_config::{env_duration, env_parsed, ConfigError, EnvLookup};

/// Default on-disk database, relative to the working directory.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://school_api.db";

/// Database configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseConfig {
    /// Connection URL (`sqlite://path.db` or `sqlite::memory:`)
    pub database_url: String,

    /// Maximum number of connections in the pool
    /// Default: 5
    pub max_connections: u32,

    /// Minimum number of idle connections to maintain
    /// Default: 1
    pub min_connections: u32,

    /// Maximum time to wait for a connection from the pool
    /// Default: 30 seconds
    pub acquire_timeout: Duration,

    /// How long a writer waits on a locked database before failing
    /// Default: 5 seconds
    pub busy_timeout: Duration,

    /// Create the database file if it does not exist
    pub create_if_missing: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: 5,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
            create_if_missing: true,
        }
    }
}

impl DatabaseConfig {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `DATABASE_URL`: SQLite URL (default: `sqlite://school_api.db`)
    /// - `DB_MAX_CONNECTIONS`: Max pool size (default: 5)
    /// - `DB_MIN_CONNECTIONS`: Min idle connections (default: 1)
    /// - `DB_ACQUIRE_TIMEOUT`: Connection acquire timeout (default: "30s")
    /// - `DB_BUSY_TIMEOUT`: Lock wait before a write fails (default: "5s")
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env(&|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Overlay whichever variables `get` returns onto this config.
    pub fn apply_env(&mut self, get: EnvLookup<'_>) -> Result<(), ConfigError> {
        if let Some(url) = get("DATABASE_URL") {
            self.database_url = url;
        }
        if let Some(n) = env_parsed(get, "DB_MAX_CONNECTIONS", "a positive integer")? {
            self.max_connections = n;
        }
        if let Some(n) = env_parsed(get, "DB_MIN_CONNECTIONS", "a non-negative integer")? {
            self.min_connections = n;
        }
        if let Some(t) = env_duration(get, "DB_ACQUIRE_TIMEOUT")? {
            self.acquire_timeout = t;
        }
        if let Some(t) = env_duration(get, "DB_BUSY_TIMEOUT")? {
            self.busy_timeout = t;
        }
        Ok(())
    }

    /// Private in-memory database, gone when the pool closes.
    pub fn in_memory() -> Self {
        Self::builder("sqlite::memory:").build()
    }

    /// Create a new builder for programmatic configuration.
    pub fn builder(database_url: impl Into<String>) -> DatabaseConfigBuilder {
        DatabaseConfigBuilder::new(database_url)
    }

    /// Whether the URL names an in-memory database.
    pub fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:") || self.database_url.contains("mode=memory")
    }
}

/// Builder for DatabaseConfig
#[derive(Debug, Clone)]
pub struct DatabaseConfigBuilder {
    config: DatabaseConfig,
}

impl DatabaseConfigBuilder {
    /// Create a new builder with the required database URL.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            config: DatabaseConfig {
                database_url: database_url.into(),
                ..Default::default()
            },
        }
    }

    /// Set maximum connections (default: 5)
    pub fn max_connections(mut self, n: u32) -> Self {
        self.config.max_connections = n;
        self
    }

    /// Set minimum idle connections (default: 1)
    pub fn min_connections(mut self, n: u32) -> Self {
        self.config.min_connections = n;
        self
    }

    /// Set connection acquire timeout
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.config.acquire_timeout = timeout;
        self
    }

    /// Set busy timeout for locked writes
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.config.busy_timeout = timeout;
        self
    }

    /// Fail instead of creating a missing database file
    pub fn require_existing(mut self) -> Self {
        self.config.create_if_missing = false;
        self
    }

    /// Build the configuration
    pub fn build(self) -> DatabaseConfig {
        self.config
    }
}

/// Create a connection pool with the given configuration.
///
/// An in-memory database lives inside a single connection, so the pool is
/// pinned to exactly one connection that is never recycled.
pub async fn create_pool(config: &DatabaseConfig) -> Result<SqlitePool, DatabaseError> {
    info!(
        max_connections = config.max_connections,
        in_memory = config.is_in_memory(),
        "Initializing database connection pool"
    );

    let mut connect_options = SqliteConnectOptions::from_str(&config.database_url)
        .map_err(|e| DatabaseError::Configuration(format!("Invalid DATABASE_URL: {}", e)))?
        .create_if_missing(config.create_if_missing)
        .foreign_keys(false)
        .busy_timeout(config.busy_timeout);

    if !config.is_in_memory() {
        connect_options = connect_options.journal_mode(SqliteJournalMode::Wal);
    }

    let mut pool_options = SqlitePoolOptions::new().acquire_timeout(config.acquire_timeout);

    pool_options = if config.is_in_memory() {
        pool_options
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
    } else {
        pool_options
            .max_connections(config.max_connections.max(1))
            .min_connections(config.min_connections.min(config.max_connections))
    };

    let pool = pool_options
        .connect_with(connect_options)
        .await
        .map_err(|e| DatabaseError::Connection(format!("Failed to connect: {}", e)))?;

    health_check(&pool).await?;

    info!("Database connection pool initialized successfully");

    Ok(pool)
}

/// Run a trivial query and report latency and pool occupancy.
pub async fn health_check(pool: &SqlitePool) -> Result<HealthStatus, DatabaseError> {
    let start = std::time::Instant::now();

    let result: (i64,) = sqlx::query_as("SELECT 1")
        .fetch_one(pool)
        .await
        .map_err(|e| DatabaseError::HealthCheck(format!("Query failed: {}", e)))?;

    if result.0 != 1 {
        return Err(DatabaseError::HealthCheck("Unexpected query result".into()));
    }

    let status = HealthStatus {
        connected: true,
        latency: start.elapsed(),
        pool_size: pool.size(),
        idle_connections: pool.num_idle() as u32,
    };

    tracing::debug!(latency_ms = ?status.latency.as_millis(), "Database health check passed");

    Ok(status)
}

/// Database health status
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Connection is alive
    pub connected: bool,
    /// Query latency
    pub latency: Duration,
    /// Current pool size
    pub pool_size: u32,
    /// Idle connections in pool
    pub idle_connections: u32,
}

impl HealthStatus {
    /// Check if the pool is healthy
    pub fn is_healthy(&self) -> bool {
        self.connected && self.latency < Duration::from_secs(5)
    }
}

/// Database-specific errors
#[derive(Debug)]
pub enum DatabaseError {
    /// Configuration error (invalid URL, etc.)
    Configuration(String),
    /// Connection error
    Connection(String),
    /// Health check failed
    HealthCheck(String),
    /// Schema creation failed
    Schema(String),
}

impl std::fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration(msg) => write!(f, "Database configuration error: {}", msg),
            Self::Connection(msg) => write!(f, "Database connection error: {}", msg),
            Self::HealthCheck(msg) => write!(f, "Database health check failed: {}", msg),
            Self::Schema(msg) => write!(f, "Database schema error: {}", msg),
        }
    }
}

impl std::error::Error for DatabaseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DatabaseConfig::default();
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.max_connections, 5);
        assert!(config.create_if_missing);
        assert!(!config.is_in_memory());
    }

    #[test]
    fn test_builder() {
        let config = DatabaseConfig::builder("sqlite://test.db")
            .max_connections(2)
            .busy_timeout(Duration::from_millis(250))
            .require_existing()
            .build();
        assert_eq!(config.max_connections, 2);
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
        assert!(!config.create_if_missing);
    }

    #[test]
    fn test_apply_env() {
        let mut config = DatabaseConfig::default();
        config
            .apply_env(&|k| match k {
                "DATABASE_URL" => Some("sqlite://other.db".to_string()),
                "DB_MAX_CONNECTIONS" => Some("3".to_string()),
                "DB_BUSY_TIMEOUT" => Some("750ms".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.database_url, "sqlite://other.db");
        assert_eq!(config.max_connections, 3);
        assert_eq!(config.busy_timeout, Duration::from_millis(750));

        let err = config
            .apply_env(&|k| (k == "DB_MAX_CONNECTIONS").then(|| "many".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("DB_MAX_CONNECTIONS"));
    }

    #[test]
    fn test_in_memory_detection() {
        assert!(DatabaseConfig::in_memory().is_in_memory());
        assert!(DatabaseConfig::builder("sqlite:file:x?mode=memory&cache=shared")
            .build()
            .is_in_memory());
    }

    #[tokio::test]
    async fn test_create_pool_in_memory() {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        let status = health_check(&pool).await.unwrap();
        assert!(status.is_healthy());
        assert_eq!(status.pool_size, 1);
    }

    #[tokio::test]
    async fn test_create_pool_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("school.db").display());
        let pool = create_pool(&DatabaseConfig::builder(url).build()).await.unwrap();
        assert!(health_check(&pool).await.unwrap().connected);
        pool.close().await;
    }

    #[tokio::test]
    async fn test_missing_file_rejected_when_required() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("absent.db").display());
        let config = DatabaseConfig::builder(url).require_existing().build();
        assert!(matches!(
            create_pool(&config).await,
            Err(DatabaseError::Connection(_))
        ));
    }
}
