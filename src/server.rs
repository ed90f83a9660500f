//! Server lifecycle
//!
//! Open the store, build the router, serve until Ctrl-C or SIGTERM, then
//! close the store once in-flight requests have drained.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

use crate::api::{self, AppState};
use crate::app_config::AppConfig;
use crate::auth::TokenIssuer;
use crate::error::{self, ErrorConfig};
use crate::observability::SecurityEvent;
use crate::password::{PasswordError, PasswordHasher};
use crate::security_event;
use crate::store::{SqliteStore, Store, StoreError};

/// Startup and serving failures
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to open store: {0}")]
    Store(#[from] StoreError),

    #[error("failed to prepare password hasher: {0}")]
    Password(#[from] PasswordError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Run the API with a resolved configuration.
///
/// Logging must already be initialized.
pub async fn serve(config: AppConfig) -> Result<(), ServerError> {
    error::init(ErrorConfig::for_environment(config.environment.as_str()));

    if config.auth.secret_generated {
        tracing::warn!(
            environment = %config.environment,
            "JWT_SECRET not set; using a random per-process secret. Tokens will not survive a restart"
        );
    }

    let store = Arc::new(SqliteStore::open(&config.database).await?);
    security_event!(
        SecurityEvent::DatabaseConnected,
        database_url = %config.database.database_url,
        "Store opened"
    );

    let state = AppState::new(
        store.clone(),
        PasswordHasher::new()?,
        TokenIssuer::from_config(&config.auth),
        config.auth.admin.clone(),
    );
    let app = api::router(state, &config.security);

    let listener = TcpListener::bind(config.listen_addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: config.listen_addr,
            source,
        })?;

    security_event!(
        SecurityEvent::SystemStartup,
        addr = %config.listen_addr,
        environment = %config.environment,
        token_lifetime = ?config.auth.token_lifetime,
        "Server listening"
    );

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Serve);

    store.close().await;
    security_event!(SecurityEvent::SystemShutdown, "Server stopped");

    served
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
