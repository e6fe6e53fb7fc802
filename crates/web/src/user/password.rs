//! Password hashing with Argon2id.
//!
//! Hashing is deliberately slow, so both operations run on the blocking pool
//! instead of a runtime worker.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use tracing::warn;

use crate::error::ApiError;

/// Hashes `password` into a PHC string with a fresh random salt.
pub async fn hash_password(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default().hash_password(password.as_bytes(), &salt).map(|hash| hash.to_string()).map_err(ApiError::password)
    })
    .await
    .map_err(ApiError::password)?
}

/// Whether `candidate` matches the stored hash. A hash that does not parse
/// matches nothing.
pub async fn verify_password(hash: String, candidate: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || match PasswordHash::new(&hash) {
        Ok(parsed) => Argon2::default().verify_password(candidate.as_bytes(), &parsed).is_ok(),
        Err(e) => {
            warn!(cause = %e, "stored password hash does not parse");
            false
        }
    })
    .await
    .map_err(ApiError::password)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_then_verify() {
        let hash = hash_password("Secr3t!x".to_string()).await.unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password(hash.clone(), "Secr3t!x".to_string()).await.unwrap());
        assert!(!verify_password(hash, "Secr3t!y".to_string()).await.unwrap());
    }

    #[tokio::test]
    async fn salts_differ() {
        let first = hash_password("Secr3t!x".to_string()).await.unwrap();
        let second = hash_password("Secr3t!x".to_string()).await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn garbage_hash_never_matches() {
        assert!(!verify_password("plain".to_string(), "plain".to_string()).await.unwrap());
    }
}
