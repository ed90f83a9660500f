//! Record types stored by the API
//!
//! Every resource attribute other than `id` is nullable. A create body that
//! omits a field stores NULL and the field comes back as JSON `null`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Login account. The verifier is an Argon2 PHC string, never the plaintext.
#[derive(Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password_hash", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Student {
    pub id: i64,
    pub name: Option<String>,
    pub age: Option<i64>,
    pub roll: Option<i64>,
    pub grade: Option<String>,
}

/// Body of `POST /api/students`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewStudent {
    pub name: Option<String>,
    pub age: Option<i64>,
    pub roll: Option<i64>,
    pub grade: Option<String>,
}

/// An exam mark for one subject.
///
/// `student_id` is stored as supplied; it need not name an existing student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ExamResult {
    pub id: i64,
    pub subject: Option<String>,
    pub mark: Option<i64>,
    pub student_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewExamResult {
    pub subject: Option<String>,
    pub mark: Option<i64>,
    pub student_id: Option<i64>,
}

/// Presence for one student on one day label (the label is free text).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AttendanceRecord {
    pub id: i64,
    pub day: Option<String>,
    pub present: Option<bool>,
    pub student_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewAttendance {
    pub day: Option<String>,
    pub present: Option<bool>,
    pub student_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_debug_redacts_hash() {
        let user = User {
            id: 1,
            username: "admin".into(),
            password_hash: "$argon2id$v=19$secret".into(),
        };
        let debug = format!("{:?}", user);
        assert!(debug.contains("admin"));
        assert!(!debug.contains("argon2id"));
    }

    #[test]
    fn test_partial_body_leaves_fields_empty() {
        let body: NewStudent = serde_json::from_str(r#"{"name": "Asha"}"#).unwrap();
        assert_eq!(body.name.as_deref(), Some("Asha"));
        assert!(body.roll.is_none());
        assert!(body.grade.is_none());
    }

    #[test]
    fn test_missing_fields_serialize_as_null() {
        let record = AttendanceRecord {
            id: 3,
            day: Some("Monday".into()),
            present: None,
            student_id: None,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["present"], serde_json::Value::Null);
        assert_eq!(value["student_id"], serde_json::Value::Null);
        assert_eq!(value["day"], "Monday");
    }
}
