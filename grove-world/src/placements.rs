//! The placed-object registry (§4.3): range/freshness/type/spacing validation for campfires,
//! forges, forge-tables, and chests.

use grove_protocol::domain::PlacementKind;
use grove_utils::{ChunkKey, Vector2};
use std::collections::HashMap;
use thiserror::Error;

/// Default `WORLD_EVENT_RADIUS` (§6.4), used to validate a placement's declared position against
/// the session's last known position.
pub const DEFAULT_WORLD_EVENT_RADIUS: f64 = 3.5;

/// A registered placement (§4.3).
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementRecord {
    /// Client-assigned id.
    pub id: String,
    /// What was placed.
    pub kind: PlacementKind,
    /// World X coordinate.
    pub x: f64,
    /// World Z coordinate.
    pub z: f64,
    /// The owning guest, set for chests (invariant 3).
    pub owner_id: Option<String>,
    /// The chunk this placement's position falls in.
    pub chunk: ChunkKey,
}

/// Why a placement attempt was rejected.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PlacementError {
    #[error("target is out of range")]
    OutOfRange,
    #[error("id already registered")]
    Duplicate,
    #[error("too close to an existing placement")]
    Spacing,
    #[error("placement not found")]
    NotFound,
}

/// Per-world registry of placed structures, keyed by id (§4.3).
#[derive(Debug, Default)]
pub struct PlacedObjectRegistry {
    by_id: HashMap<String, PlacementRecord>,
}

impl PlacedObjectRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and registers a new placement (§4.3 rules 1-4). `owner_id` is set by the caller
    /// for chest placements (the placing session's guest id becomes the chest's immutable owner,
    /// invariant 3).
    #[allow(clippy::too_many_arguments)]
    pub fn place(
        &mut self,
        id: &str,
        kind: PlacementKind,
        x: f64,
        z: f64,
        owner_id: Option<String>,
        session_pos: (f64, f64),
        world_event_radius: f64,
        chunk_size: i32,
    ) -> Result<PlacementRecord, PlacementError> {
        let target = Vector2::new(x, z);
        let session = Vector2::new(session_pos.0, session_pos.1);
        if target.distance(session) > world_event_radius {
            return Err(PlacementError::OutOfRange);
        }
        if self.by_id.contains_key(id) {
            return Err(PlacementError::Duplicate);
        }
        let chunk = ChunkKey::containing(x, z, chunk_size);
        if self.conflicts_within_spacing(kind, target, chunk) {
            return Err(PlacementError::Spacing);
        }
        let record = PlacementRecord {
            id: id.to_string(),
            kind,
            x,
            z,
            owner_id,
            chunk,
        };
        self.by_id.insert(id.to_string(), record.clone());
        Ok(record)
    }

    /// Removes a placement, returning the removed record (so callers can check ownership/empty
    /// preconditions first via [`Self::get`]).
    pub fn remove(&mut self, id: &str) -> Result<PlacementRecord, PlacementError> {
        self.by_id.remove(id).ok_or(PlacementError::NotFound)
    }

    /// Looks up a placement without removing it.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&PlacementRecord> {
        self.by_id.get(id)
    }

    /// Checks `kind` at `target` against every placement in `chunk` and its 8 neighbors, using
    /// the larger of the two kinds' minimum spacing so the requirement is symmetric.
    fn conflicts_within_spacing(&self, kind: PlacementKind, target: Vector2, chunk: ChunkKey) -> bool {
        let neighbors = chunk.with_neighbors();
        self.by_id.values().any(|existing| {
            neighbors.contains(&existing.chunk) && {
                let required = kind.min_spacing_m().max(existing.kind.min_spacing_m());
                target.distance(Vector2::new(existing.x, existing.z)) < required
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn place_rejects_out_of_range() {
        let mut registry = PlacedObjectRegistry::new();
        let err = registry
            .place(
                "P1",
                PlacementKind::Campfire,
                10.0,
                0.0,
                None,
                (0.0, 0.0),
                DEFAULT_WORLD_EVENT_RADIUS,
                32,
            )
            .unwrap_err();
        assert_eq!(err, PlacementError::OutOfRange);
    }

    #[test]
    fn place_rejects_duplicate_id() {
        let mut registry = PlacedObjectRegistry::new();
        registry
            .place("P1", PlacementKind::Campfire, 0.0, 0.0, None, (0.0, 0.0), 3.5, 32)
            .unwrap();
        let err = registry
            .place("P1", PlacementKind::Chest, 1.0, 0.0, None, (0.0, 0.0), 3.5, 32)
            .unwrap_err();
        assert_eq!(err, PlacementError::Duplicate);
    }

    #[test]
    fn place_rejects_spacing_violation_across_chunk_border() {
        let mut registry = PlacedObjectRegistry::new();
        registry
            .place("P1", PlacementKind::Forge, 31.5, 0.0, None, (31.5, 0.0), 3.5, 32)
            .unwrap();
        // 32.2 sits in the neighboring chunk but only 0.7m from P1 at 31.5 - within forge's 1.6m.
        let err = registry
            .place("P2", PlacementKind::Forge, 32.2, 0.0, None, (32.2, 0.0), 3.5, 32)
            .unwrap_err();
        assert_eq!(err, PlacementError::Spacing);
    }

    #[test]
    fn remove_then_get_reflects_removal() {
        let mut registry = PlacedObjectRegistry::new();
        registry
            .place("P1", PlacementKind::Chest, 0.0, 0.0, Some("g1".to_string()), (0.0, 0.0), 3.5, 32)
            .unwrap();
        let removed = registry.remove("P1").unwrap();
        assert_eq!(removed.owner_id, Some("g1".to_string()));
        assert!(registry.get("P1").is_none());
        assert_eq!(registry.remove("P1").unwrap_err(), PlacementError::NotFound);
    }
}
