//! Staff PINs.
//!
//! PINs are short numeric secrets typed on a shared salon tablet. They are
//! stored as Argon2id PHC strings like any password.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use salon_core::error::CoreError;

pub const MIN_PIN_LENGTH: usize = 4;
pub const MAX_PIN_LENGTH: usize = 8;

/// A PIN is 4 to 8 ASCII digits.
pub fn validate_pin(pin: &str) -> Result<(), CoreError> {
    let len_ok = (MIN_PIN_LENGTH..=MAX_PIN_LENGTH).contains(&pin.len());
    if !len_ok || !pin.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CoreError::Validation(format!(
            "PIN must be {MIN_PIN_LENGTH} to {MAX_PIN_LENGTH} digits"
        )));
    }
    Ok(())
}

pub fn hash_pin(pin: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(pin.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// `Ok(false)` on mismatch; `Err` only for a malformed stored hash.
pub fn verify_pin(pin: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(pin.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify() {
        let hash = hash_pin("4711").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_pin("4711", &hash).unwrap());
        assert!(!verify_pin("4712", &hash).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_pin("4711", "not-a-phc-string").is_err());
    }

    #[test]
    fn pin_format() {
        assert!(validate_pin("1234").is_ok());
        assert!(validate_pin("12345678").is_ok());
        assert!(validate_pin("123").is_err());
        assert!(validate_pin("123456789").is_err());
        assert!(validate_pin("12a4").is_err());
        assert!(validate_pin("").is_err());
    }
}
