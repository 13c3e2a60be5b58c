//! Argon2id password hashes in PHC string form, plus constant-time comparison.

use crate::error::AppError;
use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use subtle::ConstantTimeEq;
use uuid::Uuid;

fn crypto_error(e: password_hash::Error) -> AppError {
    AppError::Cryptography(format!("hashing failed: {}.", e))
}

/// Hashes `plain` with Argon2id under a fresh random 16-byte salt.
pub fn salt_and_hash(plain: &str) -> Result<String, AppError> {
    let salt = SaltString::encode_b64(&Uuid::new_v4().into_bytes()).map_err(crypto_error)?;
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(crypto_error)?;
    Ok(hash.to_string())
}

/// True when `plain` verifies against `hashword`. A malformed hashword is a CryptographyError.
pub fn is_match(plain: &str, hashword: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(hashword)
        .map_err(|_| AppError::Cryptography("stored hashword is malformed.".into()))?;
    match Argon2::default().verify_password(plain.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(crypto_error(e)),
    }
}

pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

pub fn constant_time_eq_str(a: &str, b: &str) -> bool {
    constant_time_eq(a.as_bytes(), b.as_bytes())
}
