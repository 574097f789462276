//! Password hashing and strength policy.
//!
//! Passwords are stored as Argon2id PHC strings
//! (`$argon2id$v=19$m=...,t=...,p=...$<salt>$<hash>`), so parameters can be
//! raised later without invalidating existing hashes.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::error::AppError;

pub const MAX_PASSWORD_LENGTH: usize = 100;

/// Hash a password with a fresh random salt.
///
/// CPU bound: call from `tokio::task::spawn_blocking` inside request handlers.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
}

/// Check a password against a stored hash. Malformed hashes never verify.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "stored password hash is malformed");
            false
        }
    }
}

/// Hash on the blocking pool.
pub async fn hash_password_blocking(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(format!("hashing task failed: {e}")))?
}

/// Verify on the blocking pool.
pub async fn verify_password_blocking(password: String, password_hash: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &password_hash))
        .await
        .map_err(|e| AppError::Internal(format!("verification task failed: {e}")))
}

/// Enforce the password strength rules.
///
/// A password needs at least `min_length` characters (at most 100), an
/// upper-case letter, a lower-case letter and a digit.
pub fn check_policy(password: &str, min_length: usize) -> Result<(), AppError> {
    let len = password.chars().count();

    if len < min_length {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {min_length} characters long"
        )));
    }
    if len > MAX_PASSWORD_LENGTH {
        return Err(AppError::BadRequest(format!(
            "Password must be at most {MAX_PASSWORD_LENGTH} characters long"
        )));
    }
    if !password.chars().any(char::is_uppercase) {
        return Err(AppError::BadRequest(
            "Password must contain at least one upper-case letter".to_string(),
        ));
    }
    if !password.chars().any(char::is_lowercase) {
        return Err(AppError::BadRequest(
            "Password must contain at least one lower-case letter".to_string(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AppError::BadRequest(
            "Password must contain at least one digit".to_string(),
        ));
    }

    Ok(())
}
