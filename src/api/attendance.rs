use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use super::AppState;
use crate::auth::Identity;
use crate::error::Result;
use crate::models::{AttendanceRecord, NewAttendance};
use crate::validation::JsonBody;

pub(super) async fn list(State(state): State<AppState>) -> Result<Json<Vec<AttendanceRecord>>> {
    Ok(Json(state.store.list_attendance().await?))
}

pub(super) async fn create(
    State(state): State<AppState>,
    identity: Identity,
    JsonBody(record): JsonBody<NewAttendance>,
) -> Result<(StatusCode, Json<Value>)> {
    let record = state.store.insert_attendance(record).await?;
    tracing::info!(
        attendance_id = record.id,
        day = ?record.day,
        created_by = identity.user_id,
        "Attendance added"
    );
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Attendance added", "attendance": record })),
    ))
}
