use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use thiserror::Error;

/// An error produced while hashing or verifying a password.
#[derive(Error, Debug)]
pub enum PasswordError {
    /// The stored hash string was not a valid Argon2 PHC string.
    #[error("stored password hash is malformed")]
    MalformedHash,
    /// The password did not match the stored hash.
    #[error("password does not match")]
    Mismatch,
}

/// Hashes `password` with Argon2id and a fresh random salt, returning a self-describing PHC
/// string suitable for storage in the `users` table.
#[must_use]
pub fn hash_password(password: &str) -> String {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .expect("argon2 hashing with a freshly generated salt cannot fail")
        .to_string()
}

/// Verifies `password` against a PHC hash string previously produced by [`hash_password`].
///
/// # Errors
/// Returns [`PasswordError::MalformedHash`] if `stored_hash` isn't a valid PHC string, or
/// [`PasswordError::Mismatch`] if the password is wrong.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<(), PasswordError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|_| PasswordError::MalformedHash)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| PasswordError::Mismatch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trips() {
        let hash = hash_password("correct horse battery staple");
        assert!(verify_password("correct horse battery staple", &hash).is_ok());
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let hash = hash_password("correct horse battery staple");
        assert!(verify_password("wrong password", &hash).is_err());
    }

    #[test]
    fn verify_rejects_malformed_hash() {
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }

    #[test]
    fn same_password_hashes_differ_by_salt() {
        let a = hash_password("same-password");
        let b = hash_password("same-password");
        assert_ne!(a, b, "salts should differ between calls");
    }
}
