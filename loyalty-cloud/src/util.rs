//! Password hashing helpers

use shared::error::{AppError, ErrorCode};

/// Minimum password length for customers and employees
pub const MIN_PASSWORD_LEN: usize = 8;

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    use argon2::password_hash::SaltString;
    use argon2::password_hash::rand_core::OsRng;
    use argon2::{Argon2, PasswordHasher};
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Reject passwords shorter than [`MIN_PASSWORD_LEN`] characters.
pub fn check_password_strength(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::new(ErrorCode::PasswordTooShort));
    }
    Ok(())
}

/// Hash a password, mapping hasher failures to an internal error.
pub fn hash_or_internal(password: &str) -> Result<String, AppError> {
    hash_password(password).map_err(|e| {
        tracing::error!(%e, "Password hash error");
        AppError::new(ErrorCode::InternalError)
    })
}
