use sqlx::SqlitePool;
use tracing::{info, trace};

use super::{Store, StoreError, StoreFuture};
use crate::database::{create_pool, health_check, DatabaseConfig, DatabaseError};
use crate::models::{
    AttendanceRecord, ExamResult, NewAttendance, NewExamResult, NewStudent, Student, User,
};

/// (table, CREATE statement), created in order inside one transaction.
static SCHEMA: &[(&str, &str)] = &[
    (
        "users",
        "CREATE TABLE IF NOT EXISTS users (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            username      TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL
        )",
    ),
    (
        "students",
        "CREATE TABLE IF NOT EXISTS students (
            id    INTEGER PRIMARY KEY AUTOINCREMENT,
            name  TEXT,
            age   INTEGER,
            roll  INTEGER UNIQUE,
            grade TEXT
        )",
    ),
    (
        "results",
        "CREATE TABLE IF NOT EXISTS results (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            subject    TEXT,
            mark       INTEGER,
            student_id INTEGER REFERENCES students(id)  /* not enforced */
        )",
    ),
    (
        "attendance",
        "CREATE TABLE IF NOT EXISTS attendance (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            day        TEXT,
            present    BOOLEAN,
            student_id INTEGER REFERENCES students(id)  /* not enforced */
        )",
    ),
];

/// [`Store`] backed by a SQLite connection pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open the pool and make sure every table exists.
    pub async fn open(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = create_pool(config).await?;
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Fresh private database for tests and throwaway runs.
    pub async fn in_memory() -> Result<Self, StoreError> {
        Self::open(&DatabaseConfig::in_memory()).await
    }

    async fn ensure_schema(&self) -> Result<(), StoreError> {
        trace!("SqliteStore::ensure_schema() called");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DatabaseError::Schema(format!("unable to begin transaction: {}", e)))?;

        for (table, create_stmt) in SCHEMA.iter() {
            sqlx::query(create_stmt)
                .execute(&mut *tx)
                .await
                .map_err(|e| DatabaseError::Schema(format!("creating {}: {}", table, e)))?;
        }

        tx.commit()
            .await
            .map_err(|e| DatabaseError::Schema(format!("committing schema: {}", e)))?;

        info!(tables = SCHEMA.len(), "Database schema ready");
        Ok(())
    }

    #[cfg(test)]
    pub(crate) async fn count_users(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }
}

impl Store for SqliteStore {
    fn has_users(&self) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users)")
                .fetch_one(&self.pool)
                .await?;
            Ok(exists)
        })
    }

    fn insert_user(&self, username: &str, password_hash: &str) -> StoreFuture<'_, User> {
        let username = username.to_string();
        let password_hash = password_hash.to_string();
        Box::pin(async move {
            let user = sqlx::query_as::<_, User>(
                "INSERT INTO users (username, password_hash) VALUES (?, ?)
                 RETURNING id, username, password_hash",
            )
            .bind(username)
            .bind(password_hash)
            .fetch_one(&self.pool)
            .await?;
            Ok(user)
        })
    }

    fn find_user_by_username(&self, username: &str) -> StoreFuture<'_, Option<User>> {
        let username = username.to_string();
        Box::pin(async move {
            let user = sqlx::query_as::<_, User>(
                "SELECT id, username, password_hash FROM users WHERE username = ?",
            )
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
            Ok(user)
        })
    }

    fn list_students(&self) -> StoreFuture<'_, Vec<Student>> {
        Box::pin(async move {
            let rows = sqlx::query_as::<_, Student>(
                "SELECT id, name, age, roll, grade FROM students ORDER BY id",
            )
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        })
    }

    fn insert_student(&self, student: NewStudent) -> StoreFuture<'_, Student> {
        Box::pin(async move {
            let row = sqlx::query_as::<_, Student>(
                "INSERT INTO students (name, age, roll, grade) VALUES (?, ?, ?, ?)
                 RETURNING id, name, age, roll, grade",
            )
            .bind(student.name)
            .bind(student.age)
            .bind(student.roll)
            .bind(student.grade)
            .fetch_one(&self.pool)
            .await?;
            Ok(row)
        })
    }

    fn list_results(&self) -> StoreFuture<'_, Vec<ExamResult>> {
        Box::pin(async move {
            let rows = sqlx::query_as::<_, ExamResult>(
                "SELECT id, subject, mark, student_id FROM results ORDER BY id",
            )
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        })
    }

    fn insert_result(&self, result: NewExamResult) -> StoreFuture<'_, ExamResult> {
        Box::pin(async move {
            let row = sqlx::query_as::<_, ExamResult>(
                "INSERT INTO results (subject, mark, student_id) VALUES (?, ?, ?)
                 RETURNING id, subject, mark, student_id",
            )
            .bind(result.subject)
            .bind(result.mark)
            .bind(result.student_id)
            .fetch_one(&self.pool)
            .await?;
            Ok(row)
        })
    }

    fn list_attendance(&self) -> StoreFuture<'_, Vec<AttendanceRecord>> {
        Box::pin(async move {
            let rows = sqlx::query_as::<_, AttendanceRecord>(
                "SELECT id, day, present, student_id FROM attendance ORDER BY id",
            )
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        })
    }

    fn insert_attendance(&self, record: NewAttendance) -> StoreFuture<'_, AttendanceRecord> {
        Box::pin(async move {
            let row = sqlx::query_as::<_, AttendanceRecord>(
                "INSERT INTO attendance (day, present, student_id) VALUES (?, ?, ?)
                 RETURNING id, day, present, student_id",
            )
            .bind(record.day)
            .bind(record.present)
            .bind(record.student_id)
            .fetch_one(&self.pool)
            .await?;
            Ok(row)
        })
    }

    fn ping(&self) -> StoreFuture<'_, std::time::Duration> {
        Box::pin(async move {
            let status = health_check(&self.pool)
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            Ok(status.latency)
        })
    }

    fn close(&self) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            self.pool.close().await;
            info!("Database pool closed");
        })
    }
}
