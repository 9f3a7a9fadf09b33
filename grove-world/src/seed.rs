//! Deterministic per-chunk resource seeding.
//!
//! World generation itself is out of scope; what the chunk store and arbiter need is a fixed,
//! reproducible set of resource ids per chunk so `unknownId` rejection (invariant 1) has
//! something concrete to check against.

use crate::respawn::ResourceKind;
use grove_utils::ChunkKey;

const TREES_PER_CHUNK: u32 = 6;
const ROCKS_PER_CHUNK: u32 = 4;
const STICKS_PER_CHUNK: u32 = 4;
const BUSHES_PER_CHUNK: u32 = 3;
const ORES_PER_CHUNK: u32 = 2;

/// The seeded resource ids for one chunk, generated from its coordinates alone — two worlds with
/// the same chunk layout see identical seeded ids; only respawn jitter (seeded per world via
/// `grove_utils::rng::WorldRng`) differs between worlds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSeed {
    /// Seeded tree ids.
    pub trees: Vec<String>,
    /// Seeded rock ids.
    pub rocks: Vec<String>,
    /// Seeded stick ids.
    pub sticks: Vec<String>,
    /// Seeded bush ids.
    pub bushes: Vec<String>,
    /// Seeded ore vein ids.
    pub ores: Vec<String>,
}

impl ChunkSeed {
    /// Generates the seeded content of `key`.
    #[must_use]
    pub fn generate(key: ChunkKey) -> Self {
        let (cx, cz) = key.unpack();
        Self {
            trees: ids("T", cx, cz, TREES_PER_CHUNK),
            rocks: ids("R", cx, cz, ROCKS_PER_CHUNK),
            sticks: ids("S", cx, cz, STICKS_PER_CHUNK),
            bushes: ids("B", cx, cz, BUSHES_PER_CHUNK),
            ores: ids("O", cx, cz, ORES_PER_CHUNK),
        }
    }

    /// Whether `id` is a seeded id of `kind` in this chunk (invariant 1).
    #[must_use]
    pub fn contains(&self, kind: ResourceKind, id: &str) -> bool {
        match kind {
            ResourceKind::Tree => self.trees.iter().any(|t| t == id),
            ResourceKind::Rock => self.rocks.iter().any(|t| t == id),
            ResourceKind::Stick => self.sticks.iter().any(|t| t == id),
            ResourceKind::Bush => self.bushes.iter().any(|t| t == id),
            ResourceKind::Ore => self.ores.iter().any(|t| t == id),
        }
    }

    /// World-space positions of every seeded tree, for the movement loop's trunk colliders. No
    /// position is transmitted by clients for these; deriving one from the id deterministically
    /// (same scheme as `ids`) keeps every replica's collider set identical without a stored
    /// per-tree row.
    #[must_use]
    pub fn tree_positions(&self, key: ChunkKey, chunk_size: i32) -> Vec<(String, f64, f64)> {
        let (cx, cz) = key.unpack();
        let origin_x = f64::from(cx * chunk_size);
        let origin_z = f64::from(cz * chunk_size);
        self.trees
            .iter()
            .map(|id| {
                let (ox, oz) = offset_within_chunk(id, chunk_size);
                (id.clone(), origin_x + ox, origin_z + oz)
            })
            .collect()
    }
}

fn ids(prefix: &str, cx: i32, cz: i32, count: u32) -> Vec<String> {
    (0..count).map(|i| format!("{prefix}{cx}:{cz}:{i}")).collect()
}

/// A stable pseudo-random `(x, z)` offset within `[0, chunk_size)`, derived from `id` alone.
fn offset_within_chunk(id: &str, chunk_size: i32) -> (f64, f64) {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in id.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01B3);
    }
    let span = f64::from(chunk_size);
    let fx = (hash & 0xFFFF) as f64 / f64::from(u16::MAX);
    let fz = ((hash >> 16) & 0xFFFF) as f64 / f64::from(u16::MAX);
    (fx * span, fz * span)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_is_deterministic_per_chunk() {
        let key = ChunkKey::new(2, -3);
        assert_eq!(ChunkSeed::generate(key), ChunkSeed::generate(key));
    }

    #[test]
    fn counts_match_budget() {
        let seed = ChunkSeed::generate(ChunkKey::new(0, 0));
        assert_eq!(seed.trees.len(), TREES_PER_CHUNK as usize);
        assert_eq!(seed.rocks.len(), ROCKS_PER_CHUNK as usize);
        assert_eq!(seed.ores.len(), ORES_PER_CHUNK as usize);
    }

    #[test]
    fn contains_checks_the_right_kind() {
        let seed = ChunkSeed::generate(ChunkKey::new(0, 0));
        let tree_id = seed.trees[0].clone();
        assert!(seed.contains(ResourceKind::Tree, &tree_id));
        assert!(!seed.contains(ResourceKind::Rock, &tree_id));
    }

    #[test]
    fn different_chunks_yield_different_ids() {
        let a = ChunkSeed::generate(ChunkKey::new(0, 0));
        let b = ChunkSeed::generate(ChunkKey::new(1, 0));
        assert_ne!(a.trees, b.trees);
    }

    #[test]
    fn tree_positions_are_deterministic_and_within_chunk_bounds() {
        let key = ChunkKey::new(3, -2);
        let seed = ChunkSeed::generate(key);
        let a = seed.tree_positions(key, 32);
        let b = seed.tree_positions(key, 32);
        assert_eq!(a, b);
        let origin_x = f64::from(3 * 32);
        let origin_z = f64::from(-2 * 32);
        for (_, x, z) in &a {
            assert!((*x - origin_x) >= 0.0 && (*x - origin_x) < 32.0);
            assert!((*z - origin_z) >= 0.0 && (*z - origin_z) < 32.0);
        }
    }
}
