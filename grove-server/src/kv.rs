//! Picks the `KeyValueStore` backend at startup (`SHARED_REDIS_URL` present or absent, §9 Open
//! Question 3) behind one concrete type, since [`KeyValueStore`]'s `impl Future` return types keep
//! it from being object-safe — an enum stands in for the `dyn` dispatch a trait object would
//! otherwise give us.

use grove_lock::{InMemoryKv, KeyValueStore, KvError, RedisKv};
use grove_utils::SystemClock;
use std::time::Duration;

/// Either a shared Redis backend or the in-process fallback used in degraded, single-replica
/// deployments.
pub enum AnyKv {
    /// Multi-replica deployments with `SHARED_REDIS_URL` configured.
    Redis(RedisKv),
    /// Single-replica fallback; locks and leader election only hold within this process.
    Memory(InMemoryKv<SystemClock>),
}

impl KeyValueStore for AnyKv {
    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, KvError> {
        match self {
            Self::Redis(kv) => kv.set_nx_ex(key, value, ttl).await,
            Self::Memory(kv) => kv.set_nx_ex(key, value, ttl).await,
        }
    }

    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        match self {
            Self::Redis(kv) => kv.get(key).await,
            Self::Memory(kv) => kv.get(key).await,
        }
    }

    async fn compare_delete(&self, key: &str, expected: &str) -> Result<bool, KvError> {
        match self {
            Self::Redis(kv) => kv.compare_delete(key, expected).await,
            Self::Memory(kv) => kv.compare_delete(key, expected).await,
        }
    }

    async fn compare_set_ex(&self, key: &str, expected: &str, value: &str, ttl: Duration) -> Result<bool, KvError> {
        match self {
            Self::Redis(kv) => kv.compare_set_ex(key, expected, value, ttl).await,
            Self::Memory(kv) => kv.compare_set_ex(key, expected, value, ttl).await,
        }
    }
}
