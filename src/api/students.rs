use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use super::AppState;
use crate::auth::Identity;
use crate::error::Result;
use crate::models::{NewStudent, Student};
use crate::validation::JsonBody;

pub(super) async fn list(State(state): State<AppState>) -> Result<Json<Vec<Student>>> {
    Ok(Json(state.store.list_students().await?))
}

pub(super) async fn create(
    State(state): State<AppState>,
    identity: Identity,
    JsonBody(student): JsonBody<NewStudent>,
) -> Result<(StatusCode, Json<Value>)> {
    let student = state.store.insert_student(student).await?;
    tracing::info!(
        student_id = student.id,
        created_by = identity.user_id,
        "Student added"
    );
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Student added", "student": student })),
    ))
}
