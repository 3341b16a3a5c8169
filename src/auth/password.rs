//! Argon2id password hashing.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("failed to hash password: {0}")]
    HashingFailed(String),

    #[error("stored password hash is malformed: {0}")]
    InvalidHashFormat(String),
}

/// PHC string (`$argon2id$v=19$...`) with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed =
        PasswordHash::new(hash).map_err(|e| PasswordError::InvalidHashFormat(e.to_string()))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::InvalidHashFormat(e.to_string())),
    }
}

/// Hashing is CPU-bound; keep it off the async workers.
pub async fn hash_password_blocking(password: String) -> anyhow::Result<String> {
    Ok(tokio::task::spawn_blocking(move || hash_password(&password)).await??)
}

/// A malformed stored hash counts as a mismatch (and is logged).
pub async fn verify_password_blocking(password: String, hash: String) -> anyhow::Result<bool> {
    let outcome = tokio::task::spawn_blocking(move || verify_password(&password, &hash)).await?;
    Ok(outcome.unwrap_or_else(|e| {
        log::warn!("password verification failed: {e}");
        false
    }))
}
