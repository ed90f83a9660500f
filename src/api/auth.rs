//! Login and logout

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::Result;
use crate::login::authenticate;
use crate::observability::SecurityEvent;
use crate::security_event;
use crate::validation::JsonBody;

/// Body of `POST /api/login`. Either field may be missing; that is a
/// failed login, not a malformed request.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

pub(super) async fn login(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let user = authenticate(
        state.store.as_ref(),
        &state.hasher,
        request.username.as_deref(),
        request.password.as_deref(),
    )
    .await?;

    let access_token = state.tokens.issue(user.id)?;
    Ok(Json(LoginResponse { access_token }))
}

/// Tokens are not tracked server-side; the client drops its copy.
pub(super) async fn logout() -> Json<MessageResponse> {
    security_event!(SecurityEvent::Logout, "Logout acknowledged");
    Json(MessageResponse {
        message: "Logged out".to_string(),
    })
}
