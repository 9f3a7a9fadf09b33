//! A `KeyValueStore` backed by Redis, for deployments with more than one server replica (§4.5,
//! §4.6 leader election).

use crate::kv::{KeyValueStore, KvError};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use std::sync::LazyLock;
use std::time::Duration;

/// Deletes `KEYS[1]` only if its current value equals `ARGV[1]`, in one round trip — the
/// textbook atomic-unlock script (Redlock docs §"Is there an easy way..."), since a plain
/// GET-then-DEL leaves a window where the key can expire and be reclaimed by another holder
/// between the two calls.
static COMPARE_DELETE: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r"
        if redis.call('get', KEYS[1]) == ARGV[1] then
            return redis.call('del', KEYS[1])
        else
            return 0
        end
        ",
    )
});

/// Sets `KEYS[1]` to `ARGV[2]` with a refreshed TTL of `ARGV[3]` seconds, only if its current
/// value equals `ARGV[1]`, in one round trip.
static COMPARE_SET_EX: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r"
        if redis.call('get', KEYS[1]) == ARGV[1] then
            redis.call('set', KEYS[1], ARGV[2], 'EX', ARGV[3])
            return 1
        else
            return 0
        end
        ",
    )
});

/// A `KeyValueStore` over a shared Redis instance, reachable from every server replica.
#[derive(Clone)]
pub struct RedisKv {
    conn: ConnectionManager,
}

impl RedisKv {
    /// Connects to `redis_url`, retrying internally via [`ConnectionManager`]'s own
    /// reconnect policy.
    pub async fn connect(redis_url: &str) -> Result<Self, KvError> {
        let client = redis::Client::open(redis_url).map_err(|err| KvError::Unavailable(err.to_string()))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|err| KvError::Unavailable(err.to_string()))?;
        Ok(Self { conn })
    }
}

impl KeyValueStore for RedisKv {
    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, KvError> {
        let mut conn = self.conn.clone();
        let result: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await
            .map_err(|err| KvError::Unavailable(err.to_string()))?;
        Ok(result.is_some())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let mut conn = self.conn.clone();
        conn.get(key)
            .await
            .map_err(|err| KvError::Unavailable(err.to_string()))
    }

    async fn compare_delete(&self, key: &str, expected: &str) -> Result<bool, KvError> {
        let mut conn = self.conn.clone();
        let deleted: i64 = COMPARE_DELETE
            .key(key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await
            .map_err(|err| KvError::Unavailable(err.to_string()))?;
        Ok(deleted > 0)
    }

    async fn compare_set_ex(
        &self,
        key: &str,
        expected: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, KvError> {
        let mut conn = self.conn.clone();
        let set: i64 = COMPARE_SET_EX
            .key(key)
            .arg(expected)
            .arg(value)
            .arg(ttl.as_secs().max(1))
            .invoke_async(&mut conn)
            .await
            .map_err(|err| KvError::Unavailable(err.to_string()))?;
        Ok(set > 0)
    }
}
