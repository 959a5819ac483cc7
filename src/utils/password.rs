use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::AppError;

/// Hash a password using Argon2id.
///
/// The salt is generated per call and embedded in the returned PHC string.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let argon2 = Argon2::default();
    let salt = SaltString::generate(&mut OsRng);

    let digest = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to hash password: {}", e)))?
        .to_string();

    Ok(digest)
}

/// Verify a password against a stored digest.
///
/// Returns `Ok(false)` on mismatch. The only error case is a stored digest
/// that is not a parsable PHC string, which signals data corruption rather
/// than a failed login attempt.
pub fn verify_password(digest: &str, password: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(digest).map_err(|e| {
        AppError::PersistenceFailure(anyhow::anyhow!("Stored password digest is invalid: {}", e))
    })?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AppError::Internal(anyhow::anyhow!(
            "Password verification failed: {}",
            e
        ))),
    }
}
