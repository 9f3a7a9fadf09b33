//! The pure furnace-simulation core (§4.6): `advance(state, Δt) -> state'`.
//!
//! A free function rather than a method so the background worker and the on-open catch-up path
//! (§4.6 contexts 1 and 2) share one implementation with no persistence concerns mixed in.

use grove_protocol::domain::{FurnaceState, ItemStack};

/// Smelting progress needed to produce one ingot.
pub const SECONDS_PER_INGOT: f64 = 10.0;
/// Maximum stored burn time.
pub const BURN_CAP_SECS: f64 = 90.0;
/// Maximum items per output stack.
pub const OUTPUT_STACK_CAP: u32 = 100;
/// Upper bound on a single `advance` call's `Δt`, so an absurdly stale `updatedAt` can't spin the
/// loop for an unbounded number of iterations.
pub const MAX_ADVANCE_SECS: f64 = 6.0 * 3600.0;

const FUEL_SECONDS: &[(&str, f64)] = &[("log", 22.0), ("stick", 6.0), ("leaf", 2.0)];
const ORE_TO_INGOT: &[(&str, &str)] = &[
    ("iron_ore", "iron_ingot"),
    ("copper_ore", "copper_ingot"),
    ("gold_ore", "gold_ingot"),
];

fn fuel_seconds(id: &str) -> Option<f64> {
    FUEL_SECONDS.iter().find(|(fid, _)| *fid == id).map(|(_, secs)| *secs)
}

fn ingot_for_ore(id: &str) -> Option<&'static str> {
    ORE_TO_INGOT.iter().find(|(oid, _)| *oid == id).map(|(_, ingot)| *ingot)
}

fn has_fuel(state: &FurnaceState) -> bool {
    state
        .fuel
        .iter()
        .flatten()
        .any(|stack| stack.qty > 0 && fuel_seconds(&stack.id).is_some())
}

fn has_ore(state: &FurnaceState) -> bool {
    state
        .input
        .iter()
        .flatten()
        .any(|stack| stack.qty > 0 && ingot_for_ore(&stack.id).is_some())
}

fn output_has_space(state: &FurnaceState) -> bool {
    state
        .output
        .iter()
        .any(|slot| slot.as_ref().is_none_or(|stack| stack.qty < OUTPUT_STACK_CAP))
}

/// Consumes one unit of the first recognized fuel item, adding its burn seconds (capped).
fn consume_fuel(state: &mut FurnaceState) {
    for slot in &mut state.fuel {
        let Some(stack) = slot else { continue };
        let Some(secs) = fuel_seconds(&stack.id) else { continue };
        stack.qty -= 1;
        if stack.qty == 0 {
            *slot = None;
        }
        state.burn = (state.burn + secs).min(BURN_CAP_SECS);
        return;
    }
}

/// Consumes one unit of the first recognized ore item and deposits one ingot into output.
fn consume_ore_produce_ingot(state: &mut FurnaceState) {
    let Some((ingot_id, _)) = state.input.iter_mut().find_map(|slot| {
        let stack = slot.as_mut()?;
        let ingot_id = ingot_for_ore(&stack.id)?;
        if stack.qty == 0 {
            return None;
        }
        stack.qty -= 1;
        let emptied = stack.qty == 0;
        Some((ingot_id, emptied))
    }) else {
        return;
    };
    for slot in state.input.iter_mut() {
        if slot.as_ref().is_some_and(|stack| stack.qty == 0) {
            *slot = None;
        }
    }
    if let Some(existing) = state
        .output
        .iter_mut()
        .flatten()
        .find(|stack| stack.id == ingot_id && stack.qty < OUTPUT_STACK_CAP)
    {
        existing.qty += 1;
        return;
    }
    for slot in &mut state.output {
        if slot.is_none() {
            *slot = Some(ItemStack {
                id: ingot_id.to_string(),
                qty: 1,
            });
            return;
        }
    }
}

/// Advances `state` by `dt_secs` of wall-clock time (§4.6 algorithm).
#[must_use]
pub fn advance(state: &FurnaceState, dt_secs: f64) -> FurnaceState {
    let mut s = state.clone();
    let mut remaining = dt_secs.clamp(0.0, MAX_ADVANCE_SECS);

    while remaining > 0.0 && s.enabled {
        if !has_ore(&s) || !output_has_space(&s) {
            s.enabled = false;
            break;
        }
        if (s.burn <= 0.1 || (s.burn < 2.5 && has_ore(&s))) && has_fuel(&s) {
            consume_fuel(&mut s);
        }
        if s.burn <= 0.0 {
            if !has_fuel(&s) {
                s.enabled = false;
                break;
            }
            continue;
        }
        let step = remaining.min(s.burn);
        s.burn -= step;
        remaining -= step;
        s.prog += step;
        while s.prog >= SECONDS_PER_INGOT && has_ore(&s) && output_has_space(&s) {
            s.prog -= SECONDS_PER_INGOT;
            consume_ore_produce_ingot(&mut s);
        }
        if !has_ore(&s) || (!has_fuel(&s) && s.burn <= 0.0) {
            s.enabled = false;
            break;
        }
    }
    s.burn = s.burn.clamp(0.0, BURN_CAP_SECS);
    s.prog = s.prog.clamp(0.0, SECONDS_PER_INGOT);
    s
}
