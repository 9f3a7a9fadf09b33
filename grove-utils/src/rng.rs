use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// A deterministic RNG seeded from a world's id, used to add a small, reproducible jitter to
/// passive respawn schedules so every tree/rock/ore in a chunk doesn't pop back on the exact
/// same tick.
///
/// Seeding from `worldId` (rather than OS entropy) means replaying the same world id always
/// produces the same jitter sequence, which keeps the scenario tests in §8 reproducible.
pub struct WorldRng {
    inner: crate::locks::SyncMutex<StdRng>,
}

impl WorldRng {
    /// Seeds a new generator from `world_id`.
    #[must_use]
    pub fn seeded(world_id: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        world_id.hash(&mut hasher);
        let seed = hasher.finish();
        Self {
            inner: parking_lot::Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Returns a jitter in milliseconds in `[-spread_ms, spread_ms]`, added to a base respawn
    /// delay so resources in the same chunk don't all reappear in lockstep.
    pub fn jitter_ms(&self, spread_ms: i64) -> i64 {
        if spread_ms <= 0 {
            return 0;
        }
        let mut rng = self.inner.lock();
        rng.gen_range(-spread_ms..=spread_ms)
    }
}
