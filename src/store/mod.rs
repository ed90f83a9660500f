//! Persistence boundary
//!
//! Handlers and the authentication flow see storage only through the
//! [`Store`] trait, injected as `Arc<dyn Store>` in application state. The
//! store is opened once at startup and closed explicitly at shutdown.
//!
//! Every write is a single auto-committed statement. List operations return
//! records in insertion (id) order.

use std::future::Future;
use std::pin::Pin;

use crate::database::DatabaseError;
use crate::models::{
    AttendanceRecord, ExamResult, NewAttendance, NewExamResult, NewStudent, Student, User,
};

mod sqlite;

pub use sqlite::SqliteStore;

/// Boxed future returned by [`Store`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Durable storage for accounts and school records.
pub trait Store: Send + Sync {
    /// True once any user row exists.
    fn has_users(&self) -> StoreFuture<'_, bool>;

    /// Insert a user. A taken username fails with [`StoreError::Duplicate`].
    fn insert_user(&self, username: &str, password_hash: &str) -> StoreFuture<'_, User>;

    /// Exact, case-sensitive lookup.
    fn find_user_by_username(&self, username: &str) -> StoreFuture<'_, Option<User>>;

    fn list_students(&self) -> StoreFuture<'_, Vec<Student>>;

    /// A taken roll fails with [`StoreError::Duplicate`].
    fn insert_student(&self, student: NewStudent) -> StoreFuture<'_, Student>;

    fn list_results(&self) -> StoreFuture<'_, Vec<ExamResult>>;

    fn insert_result(&self, result: NewExamResult) -> StoreFuture<'_, ExamResult>;

    fn list_attendance(&self) -> StoreFuture<'_, Vec<AttendanceRecord>>;

    fn insert_attendance(&self, record: NewAttendance) -> StoreFuture<'_, AttendanceRecord>;

    /// Cheap liveness probe for readiness checks.
    fn ping(&self) -> StoreFuture<'_, std::time::Duration>;

    /// Release connections. Later calls fail with a backend error.
    fn close(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

/// Storage failures
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A UNIQUE constraint rejected the write
    #[error("unique constraint violated: {constraint}")]
    Duplicate { constraint: String },

    /// Connection, I/O, or query failure
    #[error("storage backend error: {0}")]
    Backend(String),

    /// Pool creation or schema setup failed
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl StoreError {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                // SQLite reports "UNIQUE constraint failed: table.column"
                let constraint = db
                    .message()
                    .rsplit(": ")
                    .next()
                    .unwrap_or_default()
                    .to_string();
                return Self::Duplicate { constraint };
            }
        }
        Self::Backend(err.to_string())
    }
}
