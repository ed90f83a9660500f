//! Credential verification
//!
//! [`authenticate`] is the whole login decision. It never tells the caller
//! why a login failed: unknown user, wrong password and missing fields all
//! come back as [`LoginError::InvalidCredentials`]. The real reason only goes
//! to the security log.

use std::sync::Arc;

use crate::error::AppError;
use crate::models::User;
use crate::observability::SecurityEvent;
use crate::password::{PasswordError, PasswordHasher};
use crate::security_event;
use crate::store::{Store, StoreError};

/// Why a login did not produce a user.
#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Password(#[from] PasswordError),
}

impl From<LoginError> for AppError {
    fn from(err: LoginError) -> Self {
        match err {
            LoginError::InvalidCredentials => AppError::invalid_credentials(),
            LoginError::Store(e) => e.into(),
            LoginError::Password(e) => e.into(),
        }
    }
}

/// Look up `username` and check `password` against its stored hash.
///
/// A missing field is a failed check, not a malformed request. Argon2 runs
/// on the blocking pool.
pub async fn authenticate(
    store: &dyn Store,
    hasher: &Arc<PasswordHasher>,
    username: Option<&str>,
    password: Option<&str>,
) -> Result<User, LoginError> {
    let (username, password) = match (username, password) {
        (Some(u), Some(p)) => (u, p),
        _ => {
            hasher
                .clone()
                .verify_dummy_blocking(password.unwrap_or_default())
                .await?;
            reject(username.unwrap_or_default(), "missing_field");
            return Err(LoginError::InvalidCredentials);
        }
    };

    let Some(user) = store.find_user_by_username(username).await? else {
        hasher.clone().verify_dummy_blocking(password).await?;
        reject(username, "unknown_user");
        return Err(LoginError::InvalidCredentials);
    };

    if !hasher
        .clone()
        .verify_blocking(password, &user.password_hash)
        .await?
    {
        reject(username, "wrong_password");
        return Err(LoginError::InvalidCredentials);
    }

    security_event!(
        SecurityEvent::AuthenticationSuccess,
        user_id = user.id,
        username = %user.username,
        "Login succeeded"
    );

    Ok(user)
}

fn reject(username: &str, reason: &'static str) {
    security_event!(
        SecurityEvent::AuthenticationFailure,
        username = %username,
        reason = reason,
        "Login rejected"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use argon2::Params;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    async fn store_with_admin(hasher: &PasswordHasher) -> SqliteStore {
        let store = SqliteStore::in_memory().await.unwrap();
        let hash = hasher.hash("admin123").unwrap();
        store.insert_user("admin", &hash).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_correct_credentials() {
        let hasher = Arc::new(PasswordHasher::low_cost());
        let store = store_with_admin(&hasher).await;
        let user = authenticate(&store, &hasher, Some("admin"), Some("admin123"))
            .await
            .unwrap();
        assert_eq!(user.username, "admin");
    }

    #[tokio::test]
    async fn test_failures_are_indistinguishable() {
        let hasher = Arc::new(PasswordHasher::low_cost());
        let store = store_with_admin(&hasher).await;

        let cases = [
            (Some("admin"), Some("wrong")),
            (Some("nobody"), Some("admin123")),
            (Some("ADMIN"), Some("admin123")),
            (None, Some("admin123")),
            (Some("admin"), None),
            (None, None),
        ];

        for (username, password) in cases {
            let err = authenticate(&store, &hasher, username, password)
                .await
                .unwrap_err();
            assert!(
                matches!(err, LoginError::InvalidCredentials),
                "{username:?}/{password:?} gave {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_storage_failure_is_not_invalid_credentials() {
        let hasher = Arc::new(PasswordHasher::low_cost());
        let store = store_with_admin(&hasher).await;
        store.close().await;
        let err = authenticate(&store, &hasher, Some("admin"), Some("admin123"))
            .await
            .unwrap_err();
        assert!(matches!(err, LoginError::Store(_)));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_login_leaves_runtime_responsive() {
        // Expensive enough that a verify takes tens of milliseconds.
        let params = Params::new(16 * 1024, 4, 1, None).unwrap();
        let hasher = Arc::new(PasswordHasher::with_params(params).unwrap());
        let store = store_with_admin(&hasher).await;

        let ticks = Arc::new(AtomicUsize::new(0));
        let ticker = tokio::spawn({
            let ticks = ticks.clone();
            async move {
                loop {
                    tokio::time::sleep(Duration::from_millis(1)).await;
                    ticks.fetch_add(1, Ordering::SeqCst);
                }
            }
        });

        let user = authenticate(&store, &hasher, Some("admin"), Some("admin123"))
            .await
            .unwrap();
        let during = ticks.load(Ordering::SeqCst);
        ticker.abort();

        assert_eq!(user.username, "admin");
        assert!(during >= 3, "runtime stalled during login ({during} ticks)");
    }
}
