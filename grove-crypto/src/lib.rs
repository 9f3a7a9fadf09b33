//! Low-level cryptographic primitives: HMAC-SHA256 signing/verification for session tokens and
//! Argon2 password hashing for registered-user login. Neither the wire `Token` shape (that's
//! `grove-auth`) nor any network call lives here — this crate only turns bytes into bytes.

/// HMAC-SHA256 sign/verify over raw byte payloads.
pub mod hmac_sig;
/// Argon2id password hashing.
pub mod password;

pub use hmac_sig::{sign, verify, HmacError};
pub use password::{hash_password, verify_password, PasswordError};
