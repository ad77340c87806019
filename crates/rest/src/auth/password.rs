//! Argon2id password hashing.

use argon2::Argon2;
use argon2::password_hash::{
    PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
};

use crate::error::RestError;

/// Shortest accepted password.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Hashes a password into a PHC string.
pub fn hash_password(password: &str) -> Result<String, RestError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| RestError::internal(format!("Failed to hash password: {}", e)))
}

/// Checks a password against a stored PHC string.
///
/// A malformed stored hash counts as a mismatch.
pub fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Runs [`hash_password`] on the blocking pool.
pub async fn hash_password_off_thread(password: String) -> Result<String, RestError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| RestError::internal(format!("Password hashing task failed: {}", e)))?
}

/// Runs [`verify_password`] on the blocking pool.
pub async fn verify_password_off_thread(password: String, stored: String) -> bool {
    tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .unwrap_or(false)
}
