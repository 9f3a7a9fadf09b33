//! The shared-resource locking layer: a `KeyValueStore` abstraction over in-memory and Redis
//! backends, and the named-lease `LockService` built on top of it (§4.5).

/// The `KeyValueStore` trait and its in-process implementation.
pub mod kv;
/// A `KeyValueStore` backed by Redis, for multi-replica deployments.
pub mod redis_kv;
/// Named leases with TTL and reentrancy.
pub mod service;

pub use kv::{InMemoryKv, KeyValueStore, KvError};
pub use redis_kv::RedisKv;
pub use service::{LockError, LockService, LockStatus, DEFAULT_LOCK_TTL};
