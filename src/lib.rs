//! # Schoolbook
//!
//! A small records API for a school office: staff log in with a password,
//! receive a bearer token, and use it to list and add students, exam
//! results and attendance.
//!
//! ## Features
//!
//! - **Token login**: HS256 JWTs, Argon2id password hashes, uniform login failures
//! - **First-run bootstrap**: creates the configured admin account on an empty store
//! - **SQLite storage** behind the [`Store`] trait
//! - **Hardened HTTP**: body limits, timeouts, security headers, CORS
//! - **Structured logging**: tracing with security events
//!
//! ## Quick Start
//!
//! ```ignore
//! use schoolbook::{AppConfig, observability, server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::from_env()?;
//!     observability::init(&config.observability)?;
//!     server::serve(config).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod app_config;
pub mod auth;
pub mod bootstrap;
mod config;
mod database;
pub mod error;
pub mod jwt_secret;
mod layers;
pub mod login;
pub mod models;
pub mod observability;
mod parse;
pub mod password;
pub mod server;
pub mod store;
pub mod validation;

// Re-exports
pub use api::{router, AppState};
pub use app_config::{AdminAccount, AppConfig, AuthConfig, ConfigError, ConfigFile, Environment};
pub use auth::{Identity, TokenIssuer};
pub use config::{SecurityConfig, SecurityConfigBuilder};
pub use database::{
    create_pool, health_check, DatabaseConfig, DatabaseConfigBuilder, DatabaseError, HealthStatus,
};
pub use error::{AppError, ErrorConfig};
pub use jwt_secret::{JwtSecretError, SecretPolicy};
pub use layers::SecureRouter;
pub use parse::{parse_duration, parse_size};
pub use password::PasswordHasher;
pub use store::{SqliteStore, Store, StoreError};
