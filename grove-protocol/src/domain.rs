use serde::{Deserialize, Serialize};

/// A single inventory/slot entry: an item id and a quantity, or an empty slot.
///
/// Slots are `Option<ItemStack>` wherever they appear (chest slots, furnace fuel/input/output)
/// so JSON renders empty slots as `null`, matching the wire shape in §3.1/§6.1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemStack {
    /// Item identifier (e.g. `"log"`, `"iron_ore"`, `"iron_ingot"`).
    pub id: String,
    /// Stack quantity. Never negative; callers clamp at zero instead of going below it.
    pub qty: u32,
}

impl ItemStack {
    /// Builds a stack, or returns `None` if `qty` is zero (an empty slot is `None`, not a
    /// zero-quantity stack).
    #[must_use]
    pub fn new_or_empty(id: impl Into<String>, qty: u32) -> Option<Self> {
        if qty == 0 {
            None
        } else {
            Some(Self { id: id.into(), qty })
        }
    }
}

/// The kind of a player-placed structure (§3.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlacementKind {
    /// A cosmetic/light source with no persisted state of its own.
    Campfire,
    /// A smelting station; see [`FurnaceState`].
    Forge,
    /// A crafting-adjacent structure with no persisted state of its own.
    ForgeTable,
    /// Single-owner storage; see [`ChestState`].
    Chest,
}

impl PlacementKind {
    /// Minimum center-to-center spacing (meters) required against any other placement in the
    /// same or a neighboring chunk (§4.3 supplementary detail).
    #[must_use]
    pub const fn min_spacing_m(self) -> f64 {
        match self {
            Self::Campfire => 1.2,
            Self::Forge | Self::ForgeTable => 1.6,
            Self::Chest => 1.0,
        }
    }

    /// Whether this placement kind owns a row in the chest store.
    #[must_use]
    pub const fn is_chest(self) -> bool {
        matches!(self, Self::Chest)
    }

    /// Whether this placement kind owns a row in the furnace store.
    #[must_use]
    pub const fn is_forge(self) -> bool {
        matches!(self, Self::Forge)
    }
}

/// A player-placed structure as recorded in its owning chunk's `placed` list (§3.1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedStructure {
    /// UUID assigned by the placing session.
    pub id: String,
    /// What was placed.
    #[serde(rename = "type")]
    pub kind: PlacementKind,
    /// World X coordinate.
    pub x: f64,
    /// World Z coordinate.
    pub z: f64,
    /// The guest that placed this structure, if ownership applies (chests).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
}

/// A farm plot, keyed on an integer tile snap (`"tx:tz"`) (§3.1, invariant 5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmPlot {
    /// `"{tileX}:{tileZ}"`.
    pub id: String,
    /// World X coordinate of the tile center.
    pub x: f64,
    /// World Z coordinate of the tile center.
    pub z: f64,
    /// When the plot was last tilled, in epoch milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tilled_at: Option<i64>,
    /// The seed planted, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed_id: Option<String>,
    /// When the current seed was planted, in epoch milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planted_at: Option<i64>,
    /// Growth duration, in milliseconds, for the currently planted seed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grow_ms: Option<i64>,
}

impl FarmPlot {
    /// A freshly-tilled plot with no seed planted.
    #[must_use]
    pub fn tilled(id: impl Into<String>, x: f64, z: f64, now_ms: i64) -> Self {
        Self {
            id: id.into(),
            x,
            z,
            tilled_at: Some(now_ms),
            seed_id: None,
            planted_at: None,
            grow_ms: None,
        }
    }

    /// Whether a seed is currently planted.
    #[must_use]
    pub fn is_planted(&self) -> bool {
        self.seed_id.is_some() && self.planted_at.is_some() && self.grow_ms.is_some()
    }

    /// Whether the planted seed is ready to harvest at `now_ms` (invariant 5). A plot that
    /// isn't planted is never ready (§9 Open Question 1: resolved as reject, not accept).
    #[must_use]
    pub fn is_ready(&self, now_ms: i64) -> bool {
        match (self.planted_at, self.grow_ms) {
            (Some(planted_at), Some(grow_ms)) => now_ms >= planted_at + grow_ms,
            _ => false,
        }
    }

    /// Clears the planted-seed fields, leaving `tilled_at` intact.
    pub fn clear_plant(&mut self) {
        self.seed_id = None;
        self.planted_at = None;
        self.grow_ms = None;
    }

    /// Whether this plot has fully reset and should be dropped from the chunk (§3.3).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tilled_at.is_none() && !self.is_planted()
    }
}

/// The full snapshot of one chunk's mutable state (§3.1, §6.1 `worldChunk`).
///
/// Broadcasts always carry the complete state, never a delta (§4.8): this keeps every client
/// view convergent even after a dropped message, at the cost of larger frames.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkState {
    /// Tree ids that have been cut and not yet respawned.
    pub removed_trees: Vec<String>,
    /// Rock ids that have been collected and not yet respawned.
    pub removed_rocks: Vec<String>,
    /// Stick ids that have been collected and not yet respawned.
    pub removed_sticks: Vec<String>,
    /// Bush ids that have been collected and not yet respawned.
    pub removed_bushes: Vec<String>,
    /// Ore vein ids that have been broken and not yet respawned.
    pub removed_ores: Vec<String>,
    /// Farm plots in this chunk.
    pub farm_plots: Vec<FarmPlot>,
    /// Structures placed in this chunk.
    pub placed: Vec<PlacedStructure>,
    /// Monotonically increasing per-chunk version (invariant 8).
    pub version: u64,
}

/// Persisted furnace state (§3.1). `fuel`/`input`/`output` slots are `Option<ItemStack>` so an
/// empty slot serializes as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FurnaceState {
    /// Whether the furnace is actively burning.
    pub enabled: bool,
    /// Remaining burn time of the current fuel, in seconds. Capped at 90.
    pub burn: f64,
    /// Smelting progress toward the next ingot, in seconds. In `[0, secondsPerIngot]`.
    pub prog: f64,
    /// Two fuel slots.
    pub fuel: [Option<ItemStack>; 2],
    /// Two ore/input slots.
    pub input: [Option<ItemStack>; 2],
    /// Two output slots, capped at 100 per slot.
    pub output: [Option<ItemStack>; 2],
}

impl Default for FurnaceState {
    fn default() -> Self {
        Self {
            enabled: false,
            burn: 0.0,
            prog: 0.0,
            fuel: [None, None],
            input: [None, None],
            output: [None, None],
        }
    }
}

/// Persisted chest state: 15 slots plus the owning guest (§3.1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChestState {
    /// 15 inventory slots.
    pub slots: Vec<Option<ItemStack>>,
}

/// Number of slots in a chest (§3.1).
pub const CHEST_SLOT_COUNT: usize = 15;

impl Default for ChestState {
    fn default() -> Self {
        Self {
            slots: vec![None; CHEST_SLOT_COUNT],
        }
    }
}

impl ChestState {
    /// Whether every slot is empty (invariant 4: a chest may be destroyed only when empty).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn farm_plot_ready_requires_full_plant_state() {
        let mut plot = FarmPlot::tilled("1:2", 32.0, 64.0, 0);
        assert!(!plot.is_ready(1_000_000));
        plot.seed_id = Some("wheat".to_string());
        plot.planted_at = Some(0);
        plot.grow_ms = Some(1_000);
        assert!(!plot.is_ready(500));
        assert!(plot.is_ready(1_000));
        assert!(plot.is_ready(1_001));
    }

    #[test]
    fn farm_plot_clear_plant_keeps_tilled_at() {
        let mut plot = FarmPlot::tilled("1:2", 0.0, 0.0, 5);
        plot.seed_id = Some("wheat".to_string());
        plot.planted_at = Some(5);
        plot.grow_ms = Some(10);
        plot.clear_plant();
        assert!(!plot.is_planted());
        assert!(!plot.is_empty());
        assert_eq!(plot.tilled_at, Some(5));
    }

    #[test]
    fn chest_default_has_fifteen_empty_slots() {
        let chest = ChestState::default();
        assert_eq!(chest.slots.len(), CHEST_SLOT_COUNT);
        assert!(chest.is_empty());
    }

    #[test]
    fn item_stack_zero_qty_is_empty_slot() {
        assert_eq!(ItemStack::new_or_empty("log", 0), None);
        assert!(ItemStack::new_or_empty("log", 1).is_some());
    }

    #[test]
    fn placed_structure_round_trips_through_json() {
        let structure = PlacedStructure {
            id: "P1".to_string(),
            kind: PlacementKind::Chest,
            x: 1.0,
            z: 2.0,
            owner_id: Some("g1".to_string()),
        };
        let json = serde_json::to_string(&structure).unwrap();
        assert!(json.contains("\"type\":\"chest\""));
        let back: PlacedStructure = serde_json::from_str(&json).unwrap();
        assert_eq!(back, structure);
    }
}
