//! Bearer tokens and the route guard
//!
//! A successful login yields an HS256-signed JWT whose `sub` claim is the
//! user's numeric id. Protected routes sit behind [`require_bearer`], which
//! verifies the token, attaches an [`Identity`] to the request and otherwise
//! answers 401 before any handler runs.
//!
//! Tokens are stateless. Nothing is recorded server-side when one is issued,
//! so there is nothing to revoke at logout. An `exp` claim is only written
//! (and then enforced) when a token lifetime is configured.
//!
//! # Usage
//!
//! ```ignore
//! let tokens = Arc::new(TokenIssuer::new(&secret, None));
//!
//! let protected = Router::new()
//!     .route("/api/students", get(list_students))
//!     .route_layer(middleware::from_fn_with_state(tokens.clone(), require_bearer));
//!
//! async fn list_students(identity: Identity) -> ... {
//!     tracing::debug!(user_id = identity.user_id, "listing students");
//! }
//! ```

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::AuthConfig;
use crate::error::AppError;
use crate::observability::SecurityEvent;
use crate::security_event;

/// Claims carried by every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id, decimal
    pub sub: String,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expiry (Unix seconds); absent when tokens do not expire
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// Unique token id
    pub jti: String,
}

/// The verified subject of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
}

/// Token failures. All of them surface to clients as a plain 401.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("authorization header missing")]
    MissingHeader,

    #[error("authorization header is not a bearer token")]
    NotBearer,

    #[error("token expired")]
    Expired,

    #[error("token rejected: {0}")]
    Invalid(String),

    #[error("token subject '{0}' is not a user id")]
    InvalidSubject(String),

    #[error("token signing failed: {0}")]
    Signing(String),
}

impl TokenError {
    /// Short machine-readable reason for logs.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingHeader => "missing_header",
            Self::NotBearer => "not_bearer",
            Self::Expired => "expired",
            Self::Invalid(_) => "invalid_token",
            Self::InvalidSubject(_) => "invalid_subject",
            Self::Signing(_) => "signing_failed",
        }
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Signing(_) => AppError::internal("Could not issue token", err),
            TokenError::Expired => AppError::unauthorized("Token expired"),
            other => AppError::unauthorized("Missing or invalid token").with_details(other.to_string()),
        }
    }
}

/// Issues and verifies HS256 tokens with one shared secret.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    lifetime: Option<Duration>,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("algorithm", &Algorithm::HS256)
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

impl TokenIssuer {
    pub fn new(secret: &str, lifetime: Option<Duration>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_aud = false;
        // `exp` is always checked when present, but only demanded when we write it.
        validation.validate_exp = true;
        validation.required_spec_claims = match lifetime {
            Some(_) => HashSet::from(["exp".to_string()]),
            None => HashSet::new(),
        };

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            lifetime,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(&config.jwt_secret, config.token_lifetime)
    }

    /// Sign a token for `user_id`.
    pub fn issue(&self, user_id: i64) -> Result<String, TokenError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now,
            exp: self
                .lifetime
                .map(|lifetime| now.saturating_add(lifetime.as_secs() as i64)),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Check signature, structure and expiry, then read the subject.
    pub fn verify(&self, token: &str) -> Result<Identity, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })?;

        match claims.sub.parse::<i64>() {
            Ok(user_id) if user_id > 0 => Ok(Identity { user_id }),
            _ => Err(TokenError::InvalidSubject(claims.sub)),
        }
    }

    /// Pull the token out of an `Authorization: Bearer <token>` value.
    pub fn bearer_token(header: Option<&str>) -> Result<&str, TokenError> {
        let header = header.ok_or(TokenError::MissingHeader)?;
        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .ok_or(TokenError::NotBearer)?;
        if token.is_empty() {
            return Err(TokenError::NotBearer);
        }
        Ok(token)
    }
}

/// Route layer for protected endpoints.
///
/// Use with `middleware::from_fn_with_state(tokens, require_bearer)`.
pub async fn require_bearer(
    State(tokens): State<Arc<TokenIssuer>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let verified = TokenIssuer::bearer_token(header).and_then(|token| tokens.verify(token));

    match verified {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            Ok(next.run(request).await)
        }
        Err(err) => {
            security_event!(
                SecurityEvent::AccessDenied,
                method = %request.method(),
                path = %request.uri().path(),
                reason = err.reason(),
                "Rejected request to protected route"
            );
            Err(err.into())
        }
    }
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .copied()
            .ok_or_else(|| AppError::unauthorized("Not authenticated"))
    }
}
