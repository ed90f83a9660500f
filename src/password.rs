//! Password hashing
//!
//! Passwords are stored as Argon2id PHC strings (`$argon2id$v=19$...`), each
//! with its own random salt. The plaintext is never persisted.
//!
//! [`PasswordHasher::verify_dummy`] runs a full verification against a fixed
//! hash so a login for an unknown username costs about the same as a login
//! with a wrong password.
//!
//! Argon2 is deliberately slow, so async callers go through
//! [`PasswordHasher::hash_blocking`], [`PasswordHasher::verify_blocking`] and
//! [`PasswordHasher::verify_dummy_blocking`], which run on tokio's blocking
//! pool.
//!
//! # Usage
//!
//! ```ignore
//! use schoolbook::password::PasswordHasher;
//!
//! let hasher = PasswordHasher::new()?;
//! let stored = hasher.hash("admin123")?;
//! assert!(hasher.verify("admin123", &stored));
//! ```

use argon2::password_hash::{
    PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use std::fmt;
use std::sync::Arc;
use tokio::task;

const DUMMY_PASSWORD: &str = "schoolbook-dummy-password";

/// Argon2id hasher and verifier.
#[derive(Clone)]
pub struct PasswordHasher {
    params: Params,
    dummy_hash: String,
}

impl fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("m_cost", &self.params.m_cost())
            .field("t_cost", &self.params.t_cost())
            .field("p_cost", &self.params.p_cost())
            .finish()
    }
}

impl PasswordHasher {
    /// Hasher with the Argon2 default parameters (19 MiB, 2 passes, 1 lane).
    pub fn new() -> Result<Self, PasswordError> {
        Self::with_params(Params::default())
    }

    /// Hasher with explicit cost parameters.
    pub fn with_params(params: Params) -> Result<Self, PasswordError> {
        let mut hasher = Self {
            params,
            dummy_hash: String::new(),
        };
        hasher.dummy_hash = hasher.hash(DUMMY_PASSWORD)?;
        Ok(hasher)
    }

    /// Cheap parameters so tests do not spend seconds in Argon2.
    #[cfg(test)]
    pub fn low_cost() -> Self {
        let params = Params::new(Params::MIN_M_COST, 1, 1, None)
            .expect("minimum argon2 params are valid");
        Self::with_params(params).expect("hashing with minimum params succeeds")
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password with a fresh salt.
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| PasswordError::Hashing(e.to_string()))
    }

    /// Check a password against a stored PHC string.
    ///
    /// An unparseable stored hash verifies as `false`. The cost parameters
    /// embedded in the stored hash are used, not this hasher's.
    pub fn verify(&self, password: &str, stored_hash: &str) -> bool {
        match PasswordHash::new(stored_hash) {
            Ok(parsed) => self
                .argon2()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::warn!(error = %e, "Stored password hash is malformed");
                false
            }
        }
    }

    /// Burn one verification against the dummy hash. Always `false`.
    pub fn verify_dummy(&self, password: &str) -> bool {
        let _ = self.verify(password, &self.dummy_hash);
        false
    }

    /// [`hash`](Self::hash) on the blocking pool.
    pub async fn hash_blocking(self: Arc<Self>, password: &str) -> Result<String, PasswordError> {
        let password = password.to_owned();
        task::spawn_blocking(move || self.hash(&password))
            .await
            .map_err(|e| PasswordError::Task(e.to_string()))?
    }

    /// [`verify`](Self::verify) on the blocking pool.
    pub async fn verify_blocking(
        self: Arc<Self>,
        password: &str,
        stored_hash: &str,
    ) -> Result<bool, PasswordError> {
        let (password, stored_hash) = (password.to_owned(), stored_hash.to_owned());
        task::spawn_blocking(move || self.verify(&password, &stored_hash))
            .await
            .map_err(|e| PasswordError::Task(e.to_string()))
    }

    /// [`verify_dummy`](Self::verify_dummy) on the blocking pool.
    pub async fn verify_dummy_blocking(self: Arc<Self>, password: &str) -> Result<bool, PasswordError> {
        let password = password.to_owned();
        task::spawn_blocking(move || self.verify_dummy(&password))
            .await
            .map_err(|e| PasswordError::Task(e.to_string()))
    }
}

/// Password hashing errors
#[derive(Debug, Clone)]
pub enum PasswordError {
    /// Argon2 refused to hash (bad parameters or output length)
    Hashing(String),
    /// The blocking task panicked or was cancelled
    Task(String),
}

impl fmt::Display for PasswordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hashing(e) => write!(f, "Password hashing failed: {}", e),
            Self::Task(e) => write!(f, "Password task failed: {}", e),
        }
    }
}

impl std::error::Error for PasswordError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hasher = PasswordHasher::low_cost();
        let stored = hasher.hash("admin123").unwrap();
        assert!(stored.starts_with("$argon2id$"));
        assert!(!stored.contains("admin123"));
        assert!(hasher.verify("admin123", &stored));
        assert!(!hasher.verify("admin124", &stored));
    }

    #[test]
    fn test_salts_differ() {
        let hasher = PasswordHasher::low_cost();
        assert_ne!(hasher.hash("same").unwrap(), hasher.hash("same").unwrap());
    }

    #[test]
    fn test_malformed_stored_hash() {
        let hasher = PasswordHasher::low_cost();
        assert!(!hasher.verify("admin123", "admin123"));
        assert!(!hasher.verify("admin123", ""));
    }

    #[test]
    fn test_dummy_never_matches() {
        let hasher = PasswordHasher::low_cost();
        assert!(!hasher.verify_dummy(DUMMY_PASSWORD));
        assert!(!hasher.verify_dummy("anything"));
    }

    #[test]
    fn test_verify_uses_stored_params() {
        let cheap = PasswordHasher::low_cost();
        let stored = cheap.hash("pw").unwrap();
        let other = PasswordHasher::with_params(Params::new(16, 1, 1, None).unwrap()).unwrap();
        assert!(other.verify("pw", &stored));
    }

    #[tokio::test]
    async fn test_blocking_variants_agree() {
        let hasher = Arc::new(PasswordHasher::low_cost());
        let stored = hasher.clone().hash_blocking("admin123").await.unwrap();
        assert!(hasher.clone().verify_blocking("admin123", &stored).await.unwrap());
        assert!(!hasher.clone().verify_blocking("admin124", &stored).await.unwrap());
        assert!(!hasher.verify_dummy_blocking("admin123").await.unwrap());
    }

    #[test]
    fn test_debug_hides_dummy_hash() {
        let debug = format!("{:?}", PasswordHasher::low_cost());
        assert!(!debug.contains("argon2id"));
    }
}
