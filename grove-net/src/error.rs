//! The HTTP/WS error boundary (§7): the one place every crate's domain error is mapped into the
//! wire-level codes enumerated there, via a `From` impl chain (§7 implementation convention).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use grove_auth::{AuthError, AuthStoreError, TokenError};
use grove_arbiter::ArbiterError;
use grove_chest::{ChestError, ChestStoreError};
use grove_forge::ForgeError;
use grove_lock::LockError;
use grove_protocol::{ErrorCode, RejectReason};
use serde::Serialize;
use thiserror::Error;

/// The boundary error type (§7): every handler returns this, never a raw domain error.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No `join`/bearer credential presented yet.
    #[error("auth required")]
    AuthRequired,
    /// Token signature/shape invalid.
    #[error("invalid token")]
    AuthInvalid,
    /// Token's `exp` has passed.
    #[error("token expired")]
    AuthExpired,
    /// Caller is not the resource's owner.
    #[error("forbidden")]
    Forbidden,
    /// Resource is held by another lease holder.
    #[error("locked")]
    Locked,
    /// Referenced resource does not exist.
    #[error("not found")]
    NotFound,
    /// Request body failed validation.
    #[error("invalid body: {0}")]
    InvalidBody(String),
    /// Query parameters failed validation.
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    /// Username already registered.
    #[error("username taken")]
    UsernameTaken,
    /// Device's guest has migrated to a registered account.
    #[error("guest migrated, login required")]
    GuestMigratedRequiresLogin,
    /// Username/password did not match.
    #[error("invalid credentials")]
    InvalidCredentials,
    /// Persistence or shared KV layer unreachable.
    #[error("backend unavailable: {0}")]
    DbUnavailable(String),
}

impl GatewayError {
    /// The HTTP status this error maps to (§7).
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::AuthRequired | Self::AuthInvalid | Self::AuthExpired => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Locked => StatusCode::LOCKED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::InvalidBody(_) | Self::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            Self::UsernameTaken | Self::GuestMigratedRequiresLogin => StatusCode::CONFLICT,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::DbUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// The snake_case wire code returned in the HTTP error body.
    #[must_use]
    pub const fn wire_code(&self) -> &'static str {
        match self {
            Self::AuthRequired => "auth_required",
            Self::AuthInvalid => "auth_invalid",
            Self::AuthExpired => "auth_expired",
            Self::Forbidden => "forbidden",
            Self::Locked => "locked",
            Self::NotFound => "not_found",
            Self::InvalidBody(_) => "invalid_body",
            Self::InvalidQuery(_) => "invalid_query",
            Self::UsernameTaken => "username_taken",
            Self::GuestMigratedRequiresLogin => "guest_migrated_requires_login",
            Self::InvalidCredentials => "invalid_credentials",
            Self::DbUnavailable(_) => "db_unavailable",
        }
    }

    /// The WS [`ErrorCode`] this maps to, for the subset of failures reachable from the gateway
    /// (auth and frame-shape failures; arbitration rejections use `worldEventResult` instead).
    #[must_use]
    pub const fn ws_code(&self) -> Option<ErrorCode> {
        match self {
            Self::AuthRequired => Some(ErrorCode::AuthRequired),
            Self::AuthInvalid => Some(ErrorCode::AuthInvalid),
            Self::AuthExpired => Some(ErrorCode::AuthExpired),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.wire_code(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<TokenError> for GatewayError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => Self::AuthExpired,
            TokenError::Malformed | TokenError::Invalid => Self::AuthInvalid,
        }
    }
}

impl From<LockError> for GatewayError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::Locked | LockError::TokenMismatch => Self::Locked,
            LockError::Backend(backend) => Self::DbUnavailable(backend.to_string()),
        }
    }
}

impl From<ForgeError> for GatewayError {
    fn from(err: ForgeError) -> Self {
        match err {
            ForgeError::NotFound => Self::NotFound,
            ForgeError::Backend(msg) => Self::DbUnavailable(msg),
        }
    }
}

impl From<ChestStoreError> for GatewayError {
    fn from(err: ChestStoreError) -> Self {
        match err {
            ChestStoreError::NotFound => Self::NotFound,
            ChestStoreError::Backend(msg) => Self::DbUnavailable(msg),
        }
    }
}

impl From<ChestError> for GatewayError {
    fn from(err: ChestError) -> Self {
        match err {
            ChestError::Forbidden => Self::Forbidden,
            ChestError::Locked | ChestError::TokenMismatch => Self::Locked,
            ChestError::Store(store_err) => store_err.into(),
        }
    }
}

impl From<AuthStoreError> for GatewayError {
    fn from(err: AuthStoreError) -> Self {
        match err {
            AuthStoreError::Backend(msg) => Self::DbUnavailable(msg),
        }
    }
}

impl From<AuthError> for GatewayError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::GuestMigratedRequiresLogin => Self::GuestMigratedRequiresLogin,
            AuthError::UsernameTaken => Self::UsernameTaken,
            AuthError::InvalidCredentials => Self::InvalidCredentials,
            AuthError::Token(token_err) => token_err.into(),
            AuthError::Store(store_err) => store_err.into(),
        }
    }
}

impl From<ArbiterError> for GatewayError {
    fn from(err: ArbiterError) -> Self {
        match err {
            ArbiterError::Reject(_) => Self::InvalidBody("world event rejected".to_string()),
            ArbiterError::Backend(msg) => Self::DbUnavailable(msg),
        }
    }
}

/// Maps an [`ArbiterError`] straight to the `reason` carried on `worldEventResult`, for the one
/// call site (the gateway's `worldEvent` handling) that needs the typed reason rather than a
/// generic [`GatewayError`].
#[must_use]
pub fn arbiter_reject_reason(err: &ArbiterError) -> Option<RejectReason> {
    match err {
        ArbiterError::Reject(reason) => Some(*reason),
        ArbiterError::Backend(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_expired_maps_to_auth_expired() {
        let err: GatewayError = TokenError::Expired.into();
        assert!(matches!(err, GatewayError::AuthExpired));
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn lock_backend_failure_maps_to_db_unavailable() {
        let err: GatewayError = LockError::Backend(grove_lock::KvError::Unavailable("down".into())).into();
        assert!(matches!(err, GatewayError::DbUnavailable(_)));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn chest_forbidden_maps_to_403() {
        let err: GatewayError = ChestError::Forbidden.into();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(err.wire_code(), "forbidden");
    }
}
