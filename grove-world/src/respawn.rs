//! Per-chunk respawn scheduling: a min-heap keyed on `respawnAt`, tie-broken by insertion order.

use std::collections::BinaryHeap;

/// A respawnable resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Tree,
    Rock,
    Stick,
    Bush,
    Ore,
}

/// Base respawn delay in seconds per resource kind. Stick and bush durations aren't named in the
/// distilled spec; both are resolved to match rock's 20 s rather than inventing new constants.
pub const RESPAWN_SECS: [(ResourceKind, i64); 5] = [
    (ResourceKind::Tree, 5),
    (ResourceKind::Rock, 20),
    (ResourceKind::Stick, 20),
    (ResourceKind::Bush, 20),
    (ResourceKind::Ore, 90),
];

impl ResourceKind {
    /// The base respawn delay for this kind, in seconds.
    #[must_use]
    pub fn respawn_secs(self) -> i64 {
        RESPAWN_SECS
            .iter()
            .find(|(kind, _)| *kind == self)
            .map_or(20, |(_, secs)| *secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    respawn_at_ms: i64,
    seq: u64,
    kind: ResourceKind,
    id: String,
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Reversed so `BinaryHeap`, a max-heap, pops the smallest `respawn_at_ms` first; ties
        // break on insertion order (lower `seq` first).
        other
            .respawn_at_ms
            .cmp(&self.respawn_at_ms)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// A per-chunk queue of pending respawns (§4.2 key algorithm).
#[derive(Debug, Default)]
pub struct RespawnQueue {
    heap: BinaryHeap<Entry>,
    next_seq: u64,
}

impl RespawnQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `id` to respawn `kind.respawn_secs()` (plus `jitter_ms`) after `removed_at_ms`.
    pub fn schedule(
        &mut self,
        kind: ResourceKind,
        id: impl Into<String>,
        removed_at_ms: i64,
        jitter_ms: i64,
    ) {
        let respawn_at_ms = removed_at_ms + kind.respawn_secs() * 1000 + jitter_ms;
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Entry {
            respawn_at_ms,
            seq,
            kind,
            id: id.into(),
        });
    }

    /// Pops every entry due at or before `now_ms`, in due order.
    pub fn drain_due(&mut self, now_ms: i64) -> Vec<(ResourceKind, String)> {
        let mut due = Vec::new();
        while let Some(top) = self.heap.peek() {
            if top.respawn_at_ms > now_ms {
                break;
            }
            let entry = self.heap.pop().expect("just peeked Some");
            due.push((entry.kind, entry.id));
        }
        due
    }

    /// Whether any respawns are still pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_respawns_after_five_seconds() {
        let mut queue = RespawnQueue::new();
        queue.schedule(ResourceKind::Tree, "T1", 1_000, 0);
        assert!(queue.drain_due(5_999).is_empty());
        assert_eq!(queue.drain_due(6_000), vec![(ResourceKind::Tree, "T1".to_string())]);
    }

    #[test]
    fn drain_respects_due_order_across_kinds() {
        let mut queue = RespawnQueue::new();
        queue.schedule(ResourceKind::Ore, "O1", 0, 0);
        queue.schedule(ResourceKind::Tree, "T1", 0, 0);
        let due = queue.drain_due(90_000);
        assert_eq!(
            due,
            vec![
                (ResourceKind::Tree, "T1".to_string()),
                (ResourceKind::Ore, "O1".to_string()),
            ]
        );
    }

    #[test]
    fn ties_break_on_insertion_order() {
        let mut queue = RespawnQueue::new();
        queue.schedule(ResourceKind::Rock, "R1", 0, 0);
        queue.schedule(ResourceKind::Rock, "R2", 0, 0);
        let due = queue.drain_due(20_000);
        assert_eq!(
            due,
            vec![
                (ResourceKind::Rock, "R1".to_string()),
                (ResourceKind::Rock, "R2".to_string()),
            ]
        );
    }

    #[test]
    fn queue_reports_emptiness() {
        let mut queue = RespawnQueue::new();
        assert!(queue.is_empty());
        queue.schedule(ResourceKind::Bush, "B1", 0, 0);
        assert!(!queue.is_empty());
        queue.drain_due(20_000);
        assert!(queue.is_empty());
    }
}
