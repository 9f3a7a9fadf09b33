use crate::domain::PlacementKind;
use serde::{Deserialize, Serialize};

/// A world event proposed by a client and arbitrated by the server (§4.4, §6.1).
///
/// Internally tagged on `kind` so an unrecognized kind is a deserialization error rather than a
/// silently-dropped message (see the "from dynamic maps to tagged variants" redesign note).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum WorldEvent {
    /// Cut down a tree.
    TreeCut {
        /// The tree's seeded id.
        tree_id: String,
        /// Target world X.
        x: f64,
        /// Target world Z.
        z: f64,
        /// Client timestamp, epoch milliseconds.
        at: i64,
    },
    /// Collect a rock.
    RockCollect {
        /// The rock's seeded id.
        rock_id: String,
        /// Target world X.
        x: f64,
        /// Target world Z.
        z: f64,
        /// Client timestamp, epoch milliseconds.
        at: i64,
    },
    /// Collect a stick.
    StickCollect {
        /// The stick's seeded id.
        stick_id: String,
        /// Target world X.
        x: f64,
        /// Target world Z.
        z: f64,
        /// Client timestamp, epoch milliseconds.
        at: i64,
    },
    /// Collect a bush (drop table is rolled server-side and ignored by the arbiter; see §9).
    BushCollect {
        /// The bush's seeded id.
        bush_id: String,
        /// Target world X.
        x: f64,
        /// Target world Z.
        z: f64,
        /// Client timestamp, epoch milliseconds.
        at: i64,
    },
    /// Break an ore vein.
    OreBreak {
        /// The ore vein's seeded id.
        ore_id: String,
        /// Target world X.
        x: f64,
        /// Target world Z.
        z: f64,
        /// Client timestamp, epoch milliseconds.
        at: i64,
    },
    /// Till a farm tile.
    PlotTill {
        /// Target world X.
        x: f64,
        /// Target world Z.
        z: f64,
        /// Client timestamp, epoch milliseconds.
        at: i64,
    },
    /// Plant a seed in an already-tilled plot.
    Plant {
        /// The plot's `"tx:tz"` id.
        plot_id: String,
        /// The seed to plant; its grow duration is looked up server-side.
        seed_id: String,
        /// Client timestamp, epoch milliseconds.
        at: i64,
    },
    /// Harvest a ready plot.
    Harvest {
        /// The plot's `"tx:tz"` id.
        plot_id: String,
        /// Client timestamp, epoch milliseconds.
        at: i64,
    },
    /// Place a structure.
    Place {
        /// Client-assigned UUID for the new structure.
        id: String,
        /// What to place.
        place_kind: PlacementKind,
        /// Target world X.
        x: f64,
        /// Target world Z.
        z: f64,
        /// Client timestamp, epoch milliseconds.
        at: i64,
    },
    /// Remove a previously-placed structure.
    PlaceRemove {
        /// The structure's id.
        id: String,
        /// Client timestamp, epoch milliseconds.
        at: i64,
    },
}

impl WorldEvent {
    /// The `kind` discriminant as it appears on the wire, used for `worldEventResult.kind`.
    #[must_use]
    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::TreeCut { .. } => "treeCut",
            Self::RockCollect { .. } => "rockCollect",
            Self::StickCollect { .. } => "stickCollect",
            Self::BushCollect { .. } => "bushCollect",
            Self::OreBreak { .. } => "oreBreak",
            Self::PlotTill { .. } => "plotTill",
            Self::Plant { .. } => "plant",
            Self::Harvest { .. } => "harvest",
            Self::Place { .. } => "place",
            Self::PlaceRemove { .. } => "placeRemove",
        }
    }

    /// The event's declared target position, for range/chunk validation (§4.4 step 2).
    ///
    /// `harvest`/`placeRemove` don't carry an explicit position (they reference an existing
    /// plot/placement by id); range checks for those resolve the position from the existing
    /// record instead, so this returns `None`.
    #[must_use]
    pub fn target_xz(&self) -> Option<(f64, f64)> {
        match self {
            Self::TreeCut { x, z, .. }
            | Self::RockCollect { x, z, .. }
            | Self::StickCollect { x, z, .. }
            | Self::BushCollect { x, z, .. }
            | Self::OreBreak { x, z, .. }
            | Self::PlotTill { x, z, .. }
            | Self::Place { x, z, .. } => Some((*x, *z)),
            Self::Plant { .. } | Self::Harvest { .. } | Self::PlaceRemove { .. } => None,
        }
    }

    /// The id this event refers to (the seeded resource id, plot id, or placement id), used to
    /// echo back on `worldEventResult`.
    #[must_use]
    pub fn subject_id(&self) -> &str {
        match self {
            Self::TreeCut { tree_id, .. } => tree_id,
            Self::RockCollect { rock_id, .. } => rock_id,
            Self::StickCollect { stick_id, .. } => stick_id,
            Self::BushCollect { bush_id, .. } => bush_id,
            Self::OreBreak { ore_id, .. } => ore_id,
            Self::PlotTill { .. } => "",
            Self::Plant { plot_id, .. } | Self::Harvest { plot_id, .. } => plot_id,
            Self::Place { id, .. } | Self::PlaceRemove { id, .. } => id,
        }
    }
}

/// The wire tag for a world event kind, independent of any particular payload — used where the
/// dispatch table (§4.4) needs to talk about a kind without an instance in hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorldEventKind {
    /// See [`WorldEvent::TreeCut`].
    TreeCut,
    /// See [`WorldEvent::RockCollect`].
    RockCollect,
    /// See [`WorldEvent::StickCollect`].
    StickCollect,
    /// See [`WorldEvent::BushCollect`].
    BushCollect,
    /// See [`WorldEvent::OreBreak`].
    OreBreak,
    /// See [`WorldEvent::PlotTill`].
    PlotTill,
    /// See [`WorldEvent::Plant`].
    Plant,
    /// See [`WorldEvent::Harvest`].
    Harvest,
    /// See [`WorldEvent::Place`].
    Place,
    /// See [`WorldEvent::PlaceRemove`].
    PlaceRemove,
}

/// Why a world event was rejected (§4.4, §6.1 `worldEventResult.reason`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// The target resource was already removed.
    AlreadyRemoved,
    /// The target is farther than `WORLD_EVENT_RADIUS` from the session's last known position.
    OutOfRange,
    /// The target id isn't a seeded id for this chunk.
    UnknownId,
    /// `plant` targeted a plot that hasn't been tilled.
    NotTilled,
    /// `plant` named a seed id the registry doesn't recognize.
    InvalidSeed,
    /// `harvest` targeted a plot that isn't ready yet.
    NotReady,
    /// `harvest` targeted a plot with no planted seed (§9 Open Question 1: reject, don't accept).
    Empty,
    /// `place` reused an id already registered.
    Duplicate,
    /// `place` violated minimum spacing against an existing placement.
    Spacing,
    /// `placeRemove` was attempted by a guest other than the chest's owner.
    Unauthorized,
    /// `placeRemove` targeted a chest with at least one occupied slot.
    NotEmpty,
    /// The referenced id doesn't exist.
    NotFound,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_str_matches_wire_tag() {
        let event = WorldEvent::TreeCut {
            tree_id: "T1".into(),
            x: 0.0,
            z: 0.0,
            at: 0,
        };
        assert_eq!(event.kind_str(), "treeCut");
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"kind\":\"treeCut\""));
    }

    #[test]
    fn unknown_kind_fails_to_deserialize() {
        let json = r#"{"kind":"teleportHack","x":0.0,"z":0.0,"at":0}"#;
        assert!(serde_json::from_str::<WorldEvent>(json).is_err());
    }

    #[test]
    fn harvest_and_place_remove_have_no_target_position() {
        let harvest = WorldEvent::Harvest {
            plot_id: "1:1".into(),
            at: 0,
        };
        assert_eq!(harvest.target_xz(), None);
    }
}
