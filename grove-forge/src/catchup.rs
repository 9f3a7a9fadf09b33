//! Offline catch-up: advancing a furnace by however long it sat unobserved (§4.6 context 1).

use crate::advance::advance;
use crate::store::{ForgeError, ForgeStateStore};
use grove_protocol::domain::FurnaceState;
use grove_utils::Clock;

/// Reads `forge_id`'s state, advances it by `now - updatedAt`, persists, and returns the result.
/// Called whenever a player opens a forge (§4.6 context 1).
pub async fn catch_up<S: ForgeStateStore, C: Clock>(
    store: &S,
    clock: &C,
    world_id: &str,
    forge_id: &str,
) -> Result<FurnaceState, ForgeError> {
    let (state, updated_at_ms) = store.get(world_id, forge_id).await?;
    let now_ms = clock.now_ms();
    let dt_secs = (now_ms - updated_at_ms).max(0) as f64 / 1000.0;
    let next = advance(&state, dt_secs);
    store.put(world_id, forge_id, &next, now_ms).await?;
    Ok(next)
}
