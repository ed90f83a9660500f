//! HTTP routes
//!
//! ```text
//! POST /api/login        public
//! POST /api/logout       public
//! GET|POST /api/students   bearer
//! GET|POST /api/results    bearer
//! GET|POST /api/attendance bearer
//! GET /health, /health/ready
//! ```
//!
//! Every `/api` request first passes the bootstrap layer, so the admin
//! account exists before a login is checked or a token is verified. The
//! health probes skip it; a dead store must still show up as 503 there.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::app_config::AdminAccount;
use crate::auth::{require_bearer, TokenIssuer};
use crate::bootstrap::{bootstrap_layer, BootstrapState};
use crate::config::SecurityConfig;
use crate::error::AppError;
use crate::layers::SecureRouter;
use crate::password::PasswordHasher;
use crate::store::Store;

mod attendance;
mod auth;
mod health;
mod results;
mod students;

pub use auth::{LoginRequest, LoginResponse, MessageResponse};
pub use health::ReadyResponse;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub hasher: Arc<PasswordHasher>,
    pub tokens: Arc<TokenIssuer>,
    pub admin: Arc<AdminAccount>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        hasher: PasswordHasher,
        tokens: TokenIssuer,
        admin: AdminAccount,
    ) -> Self {
        Self {
            store,
            hasher: Arc::new(hasher),
            tokens: Arc::new(tokens),
            admin: Arc::new(admin),
        }
    }

    fn bootstrap(&self) -> BootstrapState {
        BootstrapState {
            store: self.store.clone(),
            hasher: self.hasher.clone(),
            admin: self.admin.clone(),
        }
    }
}

/// Build the complete application router, hardening layers included.
pub fn router(state: AppState, security: &SecurityConfig) -> Router {
    let protected = Router::new()
        .route("/api/students", get(students::list).post(students::create))
        .route("/api/results", get(results::list).post(results::create))
        .route(
            "/api/attendance",
            get(attendance::list).post(attendance::create),
        )
        .route_layer(middleware::from_fn_with_state(
            state.tokens.clone(),
            require_bearer,
        ));

    let api = Router::new()
        .route("/api/login", post(auth::login))
        .route("/api/logout", post(auth::logout))
        .merge(protected)
        .layer(middleware::from_fn_with_state(
            state.bootstrap(),
            bootstrap_layer,
        ));

    Router::new()
        .merge(api)
        .route("/health", get(health::live))
        .route("/health/ready", get(health::ready))
        .fallback(not_found)
        .with_state(state)
        .with_security(security)
}

async fn not_found() -> AppError {
    AppError::not_found("No such endpoint")
}
