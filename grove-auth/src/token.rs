//! Session token issuance and verification (§4.1).
//!
//! Both directions share one codec so the wire format cannot drift between issuer and verifier:
//! a token is `<payloadB64>.<sigB64>`, where `payloadB64` is the base64 encoding of
//! `{"gid":"...","exp":<unix seconds>}`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a token failed verification.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    /// Not of the form `<payload>.<sig>`, or the payload is not valid base64/JSON.
    #[error("malformed token")]
    Malformed,
    /// The signature does not match.
    #[error("invalid signature")]
    Invalid,
    /// `now > exp`.
    #[error("token expired")]
    Expired,
}

impl From<grove_crypto::HmacError> for TokenError {
    fn from(_: grove_crypto::HmacError) -> Self {
        Self::Invalid
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenPayload {
    gid: String,
    exp: i64,
}

/// A freshly issued token, with its expiry for the caller to echo back to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    /// The full `<payload>.<sig>` token string.
    pub token: String,
    /// Expiry, in epoch milliseconds.
    pub exp_ms: i64,
}

/// Signs and verifies session tokens for one HMAC secret (§4.1).
pub struct TokenCodec {
    secret: Vec<u8>,
}

impl TokenCodec {
    /// Builds a codec over `secret`.
    #[must_use]
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self { secret: secret.into() }
    }

    /// Issues a token for `guest_id`, expiring `ttl_secs` after `now_ms`.
    ///
    /// # Errors
    /// Propagates [`grove_crypto::HmacError`] wrapped as [`TokenError::Invalid`], which in
    /// practice cannot happen for an HMAC-SHA256 key of any length.
    pub fn issue(&self, guest_id: &str, now_ms: i64, ttl_secs: i64) -> Result<IssuedToken, TokenError> {
        let exp = now_ms / 1000 + ttl_secs;
        let payload = TokenPayload {
            gid: guest_id.to_string(),
            exp,
        };
        let payload_json = serde_json::to_vec(&payload).map_err(|_| TokenError::Malformed)?;
        let payload_b64 = URL_SAFE_NO_PAD.encode(payload_json);
        let sig = grove_crypto::sign(&self.secret, payload_b64.as_bytes())?;
        Ok(IssuedToken {
            token: format!("{payload_b64}.{sig}"),
            exp_ms: exp * 1000,
        })
    }

    /// Verifies `token` at `now_ms`, returning the guest id it was issued for.
    pub fn verify(&self, token: &str, now_ms: i64) -> Result<String, TokenError> {
        let (payload_b64, sig) = token.split_once('.').ok_or(TokenError::Malformed)?;
        grove_crypto::verify(&self.secret, payload_b64.as_bytes(), sig)?;
        let payload_bytes = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| TokenError::Malformed)?;
        let payload: TokenPayload =
            serde_json::from_slice(&payload_bytes).map_err(|_| TokenError::Malformed)?;
        if now_ms / 1000 > payload.exp {
            return Err(TokenError::Expired);
        }
        Ok(payload.gid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_then_verify_round_trips() {
        let codec = TokenCodec::new(b"secret".to_vec());
        let issued = codec.issue("g1", 0, 3600).unwrap();
        assert_eq!(codec.verify(&issued.token, 1_000).unwrap(), "g1");
    }

    #[test]
    fn verify_rejects_expired_token() {
        let codec = TokenCodec::new(b"secret".to_vec());
        let issued = codec.issue("g1", 0, 60).unwrap();
        let err = codec.verify(&issued.token, 61_000).unwrap_err();
        assert_eq!(err, TokenError::Expired);
    }

    #[test]
    fn verify_rejects_tampered_signature() {
        let codec = TokenCodec::new(b"secret".to_vec());
        let issued = codec.issue("g1", 0, 3600).unwrap();
        let mut tampered = issued.token.clone();
        tampered.push('x');
        assert_eq!(codec.verify(&tampered, 0).unwrap_err(), TokenError::Invalid);
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let issuer = TokenCodec::new(b"secret-a".to_vec());
        let verifier = TokenCodec::new(b"secret-b".to_vec());
        let issued = issuer.issue("g1", 0, 3600).unwrap();
        assert_eq!(verifier.verify(&issued.token, 0).unwrap_err(), TokenError::Invalid);
    }

    #[test]
    fn verify_rejects_malformed_token() {
        let codec = TokenCodec::new(b"secret".to_vec());
        assert_eq!(codec.verify("not-a-token", 0).unwrap_err(), TokenError::Malformed);
    }
}
