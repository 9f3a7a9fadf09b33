//! Pure farm-plot transition helpers (§4.4 `plotTill`/`plant`/`harvest`, invariant 5).

use grove_protocol::domain::FarmPlot;
use thiserror::Error;

/// Growth duration in milliseconds for each recognized seed id.
const SEED_GROW_MS: &[(&str, i64)] = &[("wheat", 60_000), ("carrot", 45_000), ("potato", 50_000)];

/// Looks up the grow duration for a seed id, or `None` if unrecognized.
#[must_use]
pub fn grow_ms_for_seed(seed_id: &str) -> Option<i64> {
    SEED_GROW_MS
        .iter()
        .find(|(id, _)| *id == seed_id)
        .map(|(_, ms)| *ms)
}

/// Why a farm operation was rejected.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FarmError {
    #[error("seed id not recognized")]
    InvalidSeed,
    #[error("plot has not been tilled")]
    NotTilled,
    #[error("plot is not ready to harvest")]
    NotReady,
    #[error("plot has nothing planted")]
    Empty,
}

/// Tills (or re-tills) the plot at `plot_id`, inserting a fresh record if absent. Idempotent:
/// tilling an already-tilled plot just refreshes `tilled_at`.
pub fn till(plots: &mut Vec<FarmPlot>, plot_id: &str, x: f64, z: f64, now_ms: i64) {
    if let Some(plot) = plots.iter_mut().find(|p| p.id == plot_id) {
        plot.tilled_at = Some(now_ms);
    } else {
        plots.push(FarmPlot::tilled(plot_id, x, z, now_ms));
    }
}

/// Plants `seed_id` into an existing tilled plot.
pub fn plant(
    plots: &mut [FarmPlot],
    plot_id: &str,
    seed_id: &str,
    now_ms: i64,
) -> Result<(), FarmError> {
    let grow_ms = grow_ms_for_seed(seed_id).ok_or(FarmError::InvalidSeed)?;
    let plot = plots
        .iter_mut()
        .find(|p| p.id == plot_id && p.tilled_at.is_some())
        .ok_or(FarmError::NotTilled)?;
    plot.seed_id = Some(seed_id.to_string());
    plot.planted_at = Some(now_ms);
    plot.grow_ms = Some(grow_ms);
    Ok(())
}

/// Harvests a ready plot, clearing its planted-seed fields but keeping `tilled_at`. A plot
/// missing plant state is rejected as `Empty`, never silently accepted (§9 Open Question 1).
pub fn harvest(plots: &mut [FarmPlot], plot_id: &str, now_ms: i64) -> Result<String, FarmError> {
    let plot = plots.iter_mut().find(|p| p.id == plot_id).ok_or(FarmError::Empty)?;
    if !plot.is_planted() {
        return Err(FarmError::Empty);
    }
    if !plot.is_ready(now_ms) {
        return Err(FarmError::NotReady);
    }
    let seed_id = plot.seed_id.clone().expect("is_planted guarantees seed_id");
    plot.clear_plant();
    Ok(seed_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tilling_twice_is_idempotent() {
        let mut plots = Vec::new();
        till(&mut plots, "1:1", 32.0, 32.0, 1_000);
        till(&mut plots, "1:1", 32.0, 32.0, 2_000);
        assert_eq!(plots.len(), 1);
        assert_eq!(plots[0].tilled_at, Some(2_000));
    }

    #[test]
    fn plant_rejects_unknown_seed() {
        let mut plots = vec![FarmPlot::tilled("1:1", 32.0, 32.0, 0)];
        assert_eq!(
            plant(&mut plots, "1:1", "diamond_seed", 0),
            Err(FarmError::InvalidSeed)
        );
    }

    #[test]
    fn plant_rejects_untilled_plot() {
        let mut plots = Vec::new();
        assert_eq!(plant(&mut plots, "1:1", "wheat", 0), Err(FarmError::NotTilled));
    }

    #[test]
    fn harvest_rejects_not_ready_then_succeeds() {
        let mut plots = vec![FarmPlot::tilled("1:1", 0.0, 0.0, 0)];
        plant(&mut plots, "1:1", "wheat", 0).unwrap();
        assert_eq!(harvest(&mut plots, "1:1", 1_000), Err(FarmError::NotReady));
        let seed = harvest(&mut plots, "1:1", 60_000).unwrap();
        assert_eq!(seed, "wheat");
        assert!(!plots[0].is_planted());
        assert_eq!(plots[0].tilled_at, Some(0));
    }

    #[test]
    fn harvest_rejects_empty_plot() {
        let mut plots = vec![FarmPlot::tilled("1:1", 0.0, 0.0, 0)];
        assert_eq!(harvest(&mut plots, "1:1", 1_000), Err(FarmError::Empty));
    }
}
