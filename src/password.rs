//! Password policy, hashing and verification.
//!
//! Policy checks run in a fixed order and report only the first rule that
//! fails: length, uppercase, lowercase, digit, symbol.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

pub const MIN_PASSWORD_LEN: usize = 8;

/// Characters accepted as the required symbol.
pub const SYMBOLS: &str = "!@#~$%^&*()+|_.,<>?/{}-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PolicyViolation {
    #[error("password must be at least 8 characters long")]
    TooShort,
    #[error("password must contain at least one uppercase letter")]
    MissingUppercase,
    #[error("password must contain at least one lowercase letter")]
    MissingLowercase,
    #[error("password must contain at least one number")]
    MissingDigit,
    #[error("password must contain at least one special character")]
    MissingSymbol,
}

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("password does not match")]
    Mismatch,
}

pub fn validate(password: &str) -> Result<(), PolicyViolation> {
    // byte length, so multi-byte characters count more than once
    if password.len() < MIN_PASSWORD_LEN {
        return Err(PolicyViolation::TooShort);
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(PolicyViolation::MissingUppercase);
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(PolicyViolation::MissingLowercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(PolicyViolation::MissingDigit);
    }
    if !password.chars().any(|c| SYMBOLS.contains(c)) {
        return Err(PolicyViolation::MissingSymbol);
    }
    Ok(())
}

/// Salted Argon2id hash in PHC string format.
pub fn hash(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

/// A digest that fails to parse is reported as a mismatch.
pub fn verify(password: &str, digest: &str) -> Result<(), PasswordError> {
    let parsed = PasswordHash::new(digest).map_err(|_| PasswordError::Mismatch)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| PasswordError::Mismatch)
}
