//! Argon2id password hashing.
//!
//! Hashing is CPU bound, so both operations run on the blocking pool.

use anyhow::{anyhow, Context, Result};
use argon2::{password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand::rngs::OsRng;

/// Hash `password` into a PHC string with a fresh random salt.
///
/// # Errors
/// Only on catastrophic entropy or parameter failure.
pub async fn hash_password(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| anyhow!("failed to hash password: {err}"))
    })
    .await
    .context("password hashing task failed")?
}

/// Check `password` against a stored PHC string.
///
/// Accounts created through SSO have no hash; they, and any unparseable hash,
/// never verify.
pub async fn verify_password(stored_hash: String, password: String) -> bool {
    if stored_hash.is_empty() {
        return false;
    }
    tokio::task::spawn_blocking(move || {
        PasswordHash::new(&stored_hash).is_ok_and(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
    })
    .await
    .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_then_verify() -> Result<()> {
        let hash = hash_password("P@ssw0rd1".to_string()).await?;
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password(hash.clone(), "P@ssw0rd1".to_string()).await);
        assert!(!verify_password(hash, "P@ssw0rd2".to_string()).await);
        Ok(())
    }

    #[tokio::test]
    async fn salts_differ_between_hashes() -> Result<()> {
        let first = hash_password("same".to_string()).await?;
        let second = hash_password("same".to_string()).await?;
        assert_ne!(first, second);
        Ok(())
    }

    #[tokio::test]
    async fn empty_or_garbage_hash_never_verifies() {
        assert!(!verify_password(String::new(), String::new()).await);
        assert!(!verify_password("not-a-phc-string".to_string(), "x".to_string()).await);
    }
}
