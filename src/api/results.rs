use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use super::AppState;
use crate::auth::Identity;
use crate::error::Result;
use crate::models::{ExamResult, NewExamResult};
use crate::validation::JsonBody;

pub(super) async fn list(State(state): State<AppState>) -> Result<Json<Vec<ExamResult>>> {
    Ok(Json(state.store.list_results().await?))
}

/// `student_id` is taken as given; no student lookup happens.
pub(super) async fn create(
    State(state): State<AppState>,
    identity: Identity,
    JsonBody(result): JsonBody<NewExamResult>,
) -> Result<(StatusCode, Json<Value>)> {
    let result = state.store.insert_result(result).await?;
    tracing::info!(
        result_id = result.id,
        student_id = ?result.student_id,
        created_by = identity.user_id,
        "Result added"
    );
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Result added", "result": result })),
    ))
}
