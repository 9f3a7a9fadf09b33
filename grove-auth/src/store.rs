//! Persistence seam for the identity tables (§6.3 `users`, `devices`, `device_guest_links`).

use std::future::Future;
use thiserror::Error;

/// Errors from the identity persistence layer.
#[derive(Debug, Error)]
pub enum AuthStoreError {
    /// The backing store could not be reached.
    #[error("backend unavailable: {0}")]
    Backend(String),
}

/// A device's link to its guest profile (§3.1, §6.2 device-guest flow).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceGuestLink {
    /// The guest this device is linked to.
    pub guest_id: String,
    /// Set once the guest has been claimed by a registered user (§4.11 `register`).
    pub migrated: bool,
}

/// A registered user (§6.3 `users`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// The user's id.
    pub user_id: String,
    /// The Argon2id PHC hash of the user's password.
    pub password_hash: String,
    /// The guest profile this user owns.
    pub guest_id: String,
}

/// Read/write access to guests, devices, and registered users.
pub trait AuthStore: Send + Sync {
    /// Looks up the guest linked to `device_key`, if any.
    fn find_device_link(
        &self,
        device_key: &str,
    ) -> impl Future<Output = Result<Option<DeviceGuestLink>, AuthStoreError>> + Send;

    /// Creates a fresh guest in `world_id`, returning its id.
    fn create_guest(&self, world_id: &str) -> impl Future<Output = Result<String, AuthStoreError>> + Send;

    /// Links `device_key` to `guest_id` (first use of a device).
    fn link_device(
        &self,
        device_key: &str,
        guest_id: &str,
    ) -> impl Future<Output = Result<(), AuthStoreError>> + Send;

    /// Marks every device link pointing at `guest_id` as migrated, so future `device/guest` calls
    /// for those devices are rejected with `guest_migrated_requires_login`.
    fn mark_guest_migrated(&self, guest_id: &str) -> impl Future<Output = Result<(), AuthStoreError>> + Send;

    /// The world a guest belongs to.
    fn guest_world(&self, guest_id: &str) -> impl Future<Output = Result<String, AuthStoreError>> + Send;

    /// Looks up a registered user by username.
    fn find_user(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Option<UserRecord>, AuthStoreError>> + Send;

    /// Creates a registered user owning `guest_id`, returning the new user's id.
    fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        guest_id: &str,
    ) -> impl Future<Output = Result<String, AuthStoreError>> + Send;
}
