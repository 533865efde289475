//! Password hashing.
//!
//! Hashing uses Argon2id with default parameters and a fresh `OsRng` salt,
//! stored as a PHC string. Every password assignment in the crate goes
//! through [`hash_password`].
//!
//! # Example
//!
//! ```
//! use gipe_auth::password::{hash_password, verify_password};
//!
//! let hash = hash_password("senha123").unwrap();
//! assert!(verify_password("senha123", &hash));
//! assert!(!verify_password("outra", &hash));
//! ```

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use std::sync::LazyLock;

use crate::error::AuthError;

static DUMMY_HASH: LazyLock<String> =
    LazyLock::new(|| hash_password("gipe-dummy-password").unwrap_or_default());

/// A valid Argon2 hash that matches no real password.
///
/// Verifying against it when no principal exists makes an unknown login
/// cost the same as a wrong password.
#[must_use]
pub fn dummy_hash() -> &'static str {
    &DUMMY_HASH
}

/// Hashes a plaintext password for storage.
///
/// # Errors
///
/// Returns `AuthError::Internal` if hashing fails (rare).
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::internal(format!("password hashing failed: {e}")))
}

/// Verifies a plaintext password against a stored PHC string.
///
/// A malformed stored hash never verifies.
#[must_use]
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// [`hash_password`] on the blocking pool, to avoid blocking the async runtime.
///
/// # Errors
///
/// Returns `AuthError::Internal` if hashing fails or the task panics.
pub async fn hash_password_async(password: String) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AuthError::internal(format!("password hashing task failed: {e}")))?
}

/// [`verify_password`] on the blocking pool.
pub async fn verify_password_async(password: String, hash: String) -> bool {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_async_variants() {
        let hash = hash_password_async("senha123".to_string()).await.unwrap();
        assert!(verify_password_async("senha123".to_string(), hash.clone()).await);
        assert!(!verify_password_async("errada".to_string(), hash).await);
    }

    #[test]
    fn test_hash_is_not_plaintext() {
        let hash = hash_password("senha123").unwrap();
        assert_ne!(hash, "senha123");
        assert!(hash.starts_with("$argon2id$"));
    }

    #[test]
    fn test_hash_is_salted() {
        let a = hash_password("senha123").unwrap();
        let b = hash_password("senha123").unwrap();
        assert_ne!(a, b);
        assert!(verify_password("senha123", &a));
        assert!(verify_password("senha123", &b));
    }

    #[test]
    fn test_wrong_password_fails() {
        let hash = hash_password("senha123").unwrap();
        assert!(!verify_password("senha124", &hash));
    }

    #[test]
    fn test_dummy_hash_is_a_real_hash() {
        assert!(PasswordHash::new(dummy_hash()).is_ok());
        assert!(dummy_hash().starts_with("$argon2id$"));
        assert!(!verify_password("senha123", dummy_hash()));
    }

    #[test]
    fn test_malformed_hash_fails() {
        assert!(!verify_password("senha123", "senha123"));
        assert!(!verify_password("senha123", ""));
    }
}
