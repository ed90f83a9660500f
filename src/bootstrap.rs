//! First-run administrator account
//!
//! Runs in front of every request. While the user table is empty it creates
//! the configured admin account; afterwards it costs one `EXISTS` query.
//! Two first requests racing each other both try the insert, the UNIQUE
//! username constraint turns one of them away, and that loser reports
//! [`Bootstrap::Existing`] instead of failing its request.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::app_config::AdminAccount;
use crate::error::AppError;
use crate::observability::SecurityEvent;
use crate::password::PasswordHasher;
use crate::security_event;
use crate::store::Store;

/// What [`ensure_admin`] found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bootstrap {
    /// At least one user already existed
    Existing,
    /// The admin account was created by this call
    Created { user_id: i64 },
}

/// Create the admin account if no user exists yet.
pub async fn ensure_admin(
    store: &dyn Store,
    hasher: &Arc<PasswordHasher>,
    admin: &AdminAccount,
) -> Result<Bootstrap, AppError> {
    if store.has_users().await? {
        return Ok(Bootstrap::Existing);
    }

    let hash = hasher.clone().hash_blocking(&admin.password).await?;

    match store.insert_user(&admin.username, &hash).await {
        Ok(user) => {
            security_event!(
                SecurityEvent::AccountBootstrapped,
                user_id = user.id,
                username = %user.username,
                "Created initial administrator account"
            );
            Ok(Bootstrap::Created { user_id: user.id })
        }
        Err(e) if e.is_duplicate() => {
            tracing::debug!(username = %admin.username, "Admin account created concurrently");
            Ok(Bootstrap::Existing)
        }
        Err(e) => Err(e.into()),
    }
}

/// Everything the bootstrap layer needs, shared across requests.
#[derive(Clone)]
pub struct BootstrapState {
    pub store: Arc<dyn Store>,
    pub hasher: Arc<PasswordHasher>,
    pub admin: Arc<AdminAccount>,
}

/// Outermost application middleware: make sure an account exists, then
/// continue. A storage fault here fails the request with 500.
pub async fn bootstrap_layer(
    State(state): State<BootstrapState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    ensure_admin(state.store.as_ref(), &state.hasher, &state.admin).await?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;

    #[tokio::test]
    async fn test_creates_once() {
        let store = SqliteStore::in_memory().await.unwrap();
        let hasher = Arc::new(PasswordHasher::low_cost());
        let admin = AdminAccount::default();

        let first = ensure_admin(&store, &hasher, &admin).await.unwrap();
        assert!(matches!(first, Bootstrap::Created { .. }));

        let second = ensure_admin(&store, &hasher, &admin).await.unwrap();
        assert_eq!(second, Bootstrap::Existing);

        let user = store.find_user_by_username("admin").await.unwrap().unwrap();
        assert!(hasher.verify("admin123", &user.password_hash));
    }

    #[tokio::test]
    async fn test_noop_when_any_user_exists() {
        let store = SqliteStore::in_memory().await.unwrap();
        let hasher = Arc::new(PasswordHasher::low_cost());
        store.insert_user("registrar", "$argon2id$x").await.unwrap();

        let outcome = ensure_admin(&store, &hasher, &AdminAccount::default())
            .await
            .unwrap();
        assert_eq!(outcome, Bootstrap::Existing);
        assert!(store.find_user_by_username("admin").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_bootstrap_never_fails() {
        let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().await.unwrap());
        let hasher = Arc::new(PasswordHasher::low_cost());
        let admin = Arc::new(AdminAccount::default());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let (store, hasher, admin) = (store.clone(), hasher.clone(), admin.clone());
            handles.push(tokio::spawn(async move {
                ensure_admin(store.as_ref(), &hasher, &admin).await
            }));
        }

        let mut created = 0;
        for handle in handles {
            if let Bootstrap::Created { .. } = handle.await.unwrap().unwrap() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
    }

    #[tokio::test]
    async fn test_custom_admin_account() {
        let store = SqliteStore::in_memory().await.unwrap();
        let hasher = Arc::new(PasswordHasher::low_cost());
        let admin = AdminAccount {
            username: "principal".into(),
            password: "Staffroom!2024".into(),
        };
        ensure_admin(&store, &hasher, &admin).await.unwrap();
        let user = store.find_user_by_username("principal").await.unwrap().unwrap();
        assert!(hasher.verify("Staffroom!2024", &user.password_hash));
    }
}
