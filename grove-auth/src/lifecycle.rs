//! Guest provisioning, registration, and login (§4.11).

use crate::store::{AuthStore, AuthStoreError};
use crate::token::{IssuedToken, TokenCodec, TokenError};

/// The world new guests are dropped into absent any other hint (single-world deployments, §9).
pub const DEFAULT_WORLD_ID: &str = "world-1";

/// Errors surfaced by the identity lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The device's guest has already been claimed by a registered user; the client must log in.
    #[error("guest migrated, login required")]
    GuestMigratedRequiresLogin,
    /// Username already taken.
    #[error("username taken")]
    UsernameTaken,
    /// Username not found, or password did not match.
    #[error("invalid credentials")]
    InvalidCredentials,
    /// Token issuance/verification failure.
    #[error(transparent)]
    Token(#[from] TokenError),
    /// Persistence failure.
    #[error(transparent)]
    Store(#[from] AuthStoreError),
}

/// A resolved identity: which guest the caller now speaks for, in which world, with a session
/// token already issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// The guest id the session speaks for.
    pub guest_id: String,
    /// The world that guest belongs to.
    pub world_id: String,
    /// The freshly issued session token.
    pub token: IssuedToken,
}

/// Result of [`AuthService::register`]: the freshly created user row plus the resulting identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registered {
    /// The newly created user's id, distinct from the guest id it now owns.
    pub user_id: String,
    /// The identity the caller should use for its next session.
    pub identity: Identity,
}

/// Guest/device/registered-user identity operations (§4.11), sharing one [`TokenCodec`] with
/// session verification so issued tokens are always valid for the gateway that issued them.
pub struct AuthService<S> {
    store: S,
    codec: TokenCodec,
    token_ttl_secs: i64,
}

impl<S: AuthStore> AuthService<S> {
    /// Builds a service over `store`, signing tokens with `codec` that live for `token_ttl_secs`.
    #[must_use]
    pub fn new(store: S, codec: TokenCodec, token_ttl_secs: i64) -> Self {
        Self {
            store,
            codec,
            token_ttl_secs,
        }
    }

    /// `POST /api/auth/device/guest` — resolves `device_key` to a guest, creating one on first
    /// use, and issues a session token for it.
    ///
    /// # Errors
    /// [`AuthError::GuestMigratedRequiresLogin`] if the device's guest has since registered.
    pub async fn device_guest(&self, device_key: &str, now_ms: i64) -> Result<Identity, AuthError> {
        let guest_id = match self.store.find_device_link(device_key).await? {
            Some(link) if link.migrated => return Err(AuthError::GuestMigratedRequiresLogin),
            Some(link) => link.guest_id,
            None => {
                let guest_id = self.store.create_guest(DEFAULT_WORLD_ID).await?;
                self.store.link_device(device_key, &guest_id).await?;
                guest_id
            }
        };
        let world_id = self.store.guest_world(&guest_id).await?;
        let token = self.codec.issue(&guest_id, now_ms, self.token_ttl_secs)?;
        Ok(Identity {
            guest_id,
            world_id,
            token,
        })
    }

    /// `POST /api/auth/register` — claims `username`/`password` over an existing guest (carrying
    /// its world progress forward) or a freshly created one, and marks the guest's device links
    /// migrated so they can no longer mint guest sessions directly.
    ///
    /// # Errors
    /// [`AuthError::UsernameTaken`] if the username is already registered.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        guest_id: Option<&str>,
        now_ms: i64,
    ) -> Result<Registered, AuthError> {
        if self.store.find_user(username).await?.is_some() {
            return Err(AuthError::UsernameTaken);
        }
        let guest_id = match guest_id {
            Some(id) => id.to_string(),
            None => self.store.create_guest(DEFAULT_WORLD_ID).await?,
        };
        let password_hash = grove_crypto::hash_password(password);
        let user_id = self.store.create_user(username, &password_hash, &guest_id).await?;
        self.store.mark_guest_migrated(&guest_id).await?;
        let world_id = self.store.guest_world(&guest_id).await?;
        let token = self.codec.issue(&guest_id, now_ms, self.token_ttl_secs)?;
        Ok(Registered {
            user_id,
            identity: Identity {
                guest_id,
                world_id,
                token,
            },
        })
    }

    /// `POST /api/auth/login` — verifies credentials and issues a session token for the user's
    /// guest profile.
    ///
    /// # Errors
    /// [`AuthError::InvalidCredentials`] if the username is unknown or the password does not match.
    pub async fn login(&self, username: &str, password: &str, now_ms: i64) -> Result<Identity, AuthError> {
        let user = self
            .store
            .find_user(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        grove_crypto::verify_password(password, &user.password_hash)
            .map_err(|_| AuthError::InvalidCredentials)?;
        let world_id = self.store.guest_world(&user.guest_id).await?;
        let token = self.codec.issue(&user.guest_id, now_ms, self.token_ttl_secs)?;
        Ok(Identity {
            guest_id: user.guest_id,
            world_id,
            token,
        })
    }
}
