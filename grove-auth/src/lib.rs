//! Identity: stateless session tokens (§4.1) and the guest/register/login lifecycle (§4.11).

/// Guest provisioning, registration, and login.
pub mod lifecycle;
/// Persistence seam for guests, devices, and registered users.
pub mod store;
/// Session token issuance and verification.
pub mod token;

pub use lifecycle::{AuthError, AuthService, Identity, Registered, DEFAULT_WORLD_ID};
pub use store::{AuthStore, AuthStoreError, DeviceGuestLink, UserRecord};
pub use token::{IssuedToken, TokenCodec, TokenError};
