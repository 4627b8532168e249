use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use super::SessionError;

/// Hash a password with Argon2id, returning the PHC string.
pub fn hash_password(password: &str) -> Result<String, SessionError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| SessionError::Hash(e.to_string()))
}

/// Returns false for a wrong password; errors only on an unreadable stored hash.
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, SessionError> {
    let parsed = PasswordHash::new(password_hash).map_err(|e| SessionError::Hash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
