use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// An error produced while signing or verifying an HMAC.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum HmacError {
    /// The secret could not be used to key the HMAC (never happens for `HmacSha256`, which
    /// accepts any key length, but the underlying constructor still returns a `Result`).
    #[error("invalid HMAC key")]
    InvalidKey,
    /// The signature did not match the recomputed value.
    #[error("signature mismatch")]
    Mismatch,
    /// The signature was not valid base64.
    #[error("malformed base64 signature")]
    MalformedSignature,
}

/// Computes `base64(HMAC-SHA256(secret, payload))`.
///
/// # Errors
/// Returns [`HmacError::InvalidKey`] if `secret` cannot key an HMAC (unreachable for
/// `HmacSha256`, kept so the signature matches [`verify`]'s fallibility).
pub fn sign(secret: &[u8], payload: &[u8]) -> Result<String, HmacError> {
    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| HmacError::InvalidKey)?;
    mac.update(payload);
    let sig = mac.finalize().into_bytes();
    Ok(URL_SAFE_NO_PAD.encode(sig))
}

/// Recomputes the HMAC over `payload` and constant-time-compares it against `sig_b64`.
///
/// # Errors
/// Returns [`HmacError::MalformedSignature`] if `sig_b64` is not valid base64, or
/// [`HmacError::Mismatch`] if the recomputed signature differs.
pub fn verify(secret: &[u8], payload: &[u8], sig_b64: &str) -> Result<(), HmacError> {
    let given = URL_SAFE_NO_PAD
        .decode(sig_b64)
        .map_err(|_| HmacError::MalformedSignature)?;

    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| HmacError::InvalidKey)?;
    mac.update(payload);
    // `verify_slice` is constant-time; never compare signatures byte-by-byte with `==`.
    mac.verify_slice(&given).map_err(|_| HmacError::Mismatch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_round_trips() {
        let secret = b"test-secret";
        let payload = b"{\"gid\":\"g1\",\"exp\":1234}";
        let sig = sign(secret, payload).unwrap();
        assert!(verify(secret, payload, &sig).is_ok());
    }

    #[test]
    fn verify_rejects_tampered_payload() {
        let secret = b"test-secret";
        let sig = sign(secret, b"payload-a").unwrap();
        assert_eq!(verify(secret, b"payload-b", &sig), Err(HmacError::Mismatch));
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let payload = b"payload";
        let sig = sign(b"secret-a", payload).unwrap();
        assert_eq!(
            verify(b"secret-b", payload, &sig),
            Err(HmacError::Mismatch)
        );
    }

    #[test]
    fn verify_rejects_malformed_base64() {
        let result = verify(b"secret", b"payload", "not base64!!");
        assert_eq!(result, Err(HmacError::MalformedSignature));
    }

    #[test]
    fn signature_is_deterministic() {
        let secret = b"test-secret";
        let payload = b"payload";
        assert_eq!(sign(secret, payload).unwrap(), sign(secret, payload).unwrap());
    }
}
