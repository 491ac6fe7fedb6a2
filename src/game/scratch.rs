//! Scratch Card
//!
//! A grid of covered cells with a few hidden gems. The player scratches
//! cells (singly or in batches from a drag) until enough of the card is
//! uncovered. Gems are revealed as they are scratched.

use std::collections::BTreeSet;

use serde::{Serialize, Deserialize};
use serde_json::{json, Value};

use crate::config::GameConfig;
use crate::core::rng::DeterministicRng;
use super::autoplay::{Pace, ScriptedAction};
use super::event::Step;
use super::heuristics::TimingThresholds;
use super::result::{FailureReason, Metrics};
use super::scoring::ScoringConfig;
use super::{Evaluation, GameModule, GameType};

/// Generated card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScratchSpec {
    /// Cells per side.
    pub size: u8,
    /// Share of cells to uncover, in percent.
    pub min_coverage_pct: u8,
    /// Cells hiding a gem, ascending.
    pub gem_cells: Vec<usize>,
}

impl ScratchSpec {
    fn cells(&self) -> usize {
        self.size as usize * self.size as usize
    }

    /// Cells needed to reach the coverage requirement.
    pub fn cells_required(&self) -> usize {
        (self.cells() * self.min_coverage_pct as usize).div_ceil(100)
    }
}

/// Client projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScratchView {
    /// Cells per side.
    pub size: u8,
    /// Share of cells to uncover, in percent.
    pub min_coverage_pct: u8,
    /// Number of hidden gems.
    pub gems: usize,
}

/// Replay state.
#[derive(Debug, Clone, PartialEq)]
pub struct ScratchState {
    scratched: Vec<bool>,
}

/// Outcome breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScratchDetail {
    /// Cells uncovered.
    pub scratched: u32,
    /// Cells on the card.
    pub cells: u32,
    /// Uncovered share, in percent.
    pub coverage_pct: u32,
    /// Gems uncovered.
    pub gems_found: u32,
    /// Gems on the card.
    pub gems: u32,
}

fn step_cells(step: &Step<'_>) -> Vec<usize> {
    match step.index("cell") {
        Some(cell) => vec![cell],
        None => step.indices("cells"),
    }
}

/// Scratch card game module.
pub struct ScratchGame;

impl GameModule for ScratchGame {
    const GAME_TYPE: GameType = GameType::ScratchCard;
    const EVENT_KINDS: &'static [&'static str] = &["scratch"];
    const SECRET_FIELDS: &'static [&'static str] = &["gem_cells"];

    type Spec = ScratchSpec;
    type Client = ScratchView;
    type State = ScratchState;
    type Detail = ScratchDetail;

    fn default_config() -> GameConfig {
        GameConfig {
            time_limit_ms: 45_000,
            grid_size: 6,
            item_count: 3,
            // Drag input arrives in quick bursts
            timing: TimingThresholds {
                gap_floor_ms: 10,
                min_mean_gap_ms: 40,
                min_gap_std_dev_ms: 0,
                min_perfect_completion_ms: 1_500,
                review_mean_gap_ms: 0,
                ..TimingThresholds::default()
            },
            scoring: ScoringConfig { penalty_per_unit: 150, ..ScoringConfig::default() },
        }
    }

    fn generate(rng: &mut DeterministicRng, config: &GameConfig) -> ScratchSpec {
        let size = config.grid_size.clamp(3, 10);
        let cells = size as usize * size as usize;
        let gems = (config.item_count as usize).clamp(1, cells / 2);

        let mut order: Vec<usize> = (0..cells).collect();
        rng.shuffle(&mut order);
        let mut gem_cells: Vec<usize> = order.into_iter().take(gems).collect();
        gem_cells.sort_unstable();

        ScratchSpec { size, min_coverage_pct: 85, gem_cells }
    }

    fn project(spec: &ScratchSpec) -> ScratchView {
        ScratchView {
            size: spec.size,
            min_coverage_pct: spec.min_coverage_pct,
            gems: spec.gem_cells.len(),
        }
    }

    fn initial_state(spec: &ScratchSpec) -> ScratchState {
        ScratchState { scratched: vec![false; spec.cells()] }
    }

    fn apply(_spec: &ScratchSpec, mut state: ScratchState, step: &Step<'_>) -> ScratchState {
        for cell in step_cells(step) {
            if let Some(s) = state.scratched.get_mut(cell) {
                *s = true;
            }
        }
        state
    }

    fn evaluate(spec: &ScratchSpec, state: &ScratchState) -> Evaluation<ScratchDetail> {
        let cells = state.scratched.len() as u32;
        let scratched = state.scratched.iter().filter(|&&s| s).count() as u32;
        let coverage_pct = if cells == 0 { 100 } else { scratched * 100 / cells };
        let gems = spec.gem_cells.len() as u32;
        let gems_found = spec
            .gem_cells
            .iter()
            .filter(|&&g| state.scratched.get(g).copied().unwrap_or(false))
            .count() as u32;

        Evaluation {
            metrics: Metrics {
                correct: scratched,
                total: cells,
                mistakes: 0,
                penalty_units: gems - gems_found,
            },
            detail: ScratchDetail { scratched, cells, coverage_pct, gems_found, gems },
            failure: (coverage_pct < spec.min_coverage_pct as u32).then_some(FailureReason::LowCoverage),
        }
    }

    fn reveal(spec: &ScratchSpec, _state: &ScratchState, step: &Step<'_>) -> Option<Value> {
        let found: BTreeSet<usize> = step_cells(step)
            .into_iter()
            .filter(|cell| spec.gem_cells.contains(cell))
            .collect();
        (!found.is_empty()).then(|| json!({ "gems": found }))
    }

    /// Gems first, then row-major until the requirement is met.
    fn script(spec: &ScratchSpec) -> Vec<ScriptedAction> {
        let rest = (0..spec.cells()).filter(|c| !spec.gem_cells.contains(c));
        spec.gem_cells
            .iter()
            .copied()
            .chain(rest)
            .take(spec.cells_required().max(spec.gem_cells.len()))
            .map(|cell| ScriptedAction {
                kind: "scratch",
                payload: json!({ "cell": cell }),
                pace: Pace::Free,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> ScratchSpec {
        ScratchSpec { size: 3, min_coverage_pct: 85, gem_cells: vec![1, 7] }
    }

    fn scratch(spec: &ScratchSpec, payloads: &[Value]) -> ScratchState {
        let mut state = ScratchGame::initial_state(spec);
        for payload in payloads {
            state = ScratchGame::apply(spec, state, &Step { kind: "scratch", payload, at_ms: 0 });
        }
        state
    }

    #[test]
    fn test_coverage_threshold() {
        let spec = spec();
        assert_eq!(spec.cells_required(), 8);

        let state = scratch(&spec, &[json!({"cells": [0, 1, 2, 3, 4, 5, 6]})]);
        let eval = ScratchGame::evaluate(&spec, &state);
        assert_eq!(eval.detail.coverage_pct, 77);
        assert_eq!(eval.failure, Some(FailureReason::LowCoverage));

        let state = scratch(&spec, &[json!({"cells": [0, 1, 2, 3, 4, 5, 6]}), json!({"cell": 8})]);
        let eval = ScratchGame::evaluate(&spec, &state);
        assert_eq!(eval.failure, None);
        assert_eq!(eval.detail.gems_found, 1);
        assert_eq!(eval.metrics.penalty_units, 1);
    }

    #[test]
    fn test_repeat_and_out_of_range_cells() {
        let spec = spec();
        let state = scratch(&spec, &[json!({"cell": 0}), json!({"cell": 0}), json!({"cell": 9}), json!({"cells": "x"})]);
        assert_eq!(ScratchGame::evaluate(&spec, &state).detail.scratched, 1);
    }

    #[test]
    fn test_reveal_gems_only() {
        let spec = spec();
        let state = ScratchGame::initial_state(&spec);
        let payload = json!({"cells": [0, 7, 1]});
        let step = Step { kind: "scratch", payload: &payload, at_ms: 0 };
        assert_eq!(ScratchGame::reveal(&spec, &state, &step), Some(json!({"gems": [1, 7]})));

        let payload = json!({"cell": 4});
        let step = Step { kind: "scratch", payload: &payload, at_ms: 0 };
        assert_eq!(ScratchGame::reveal(&spec, &state, &step), None);
    }

    #[test]
    fn test_script_meets_coverage() {
        let spec = ScratchGame::generate(&mut DeterministicRng::new(5), &ScratchGame::default_config());
        let payloads: Vec<Value> = ScratchGame::script(&spec).into_iter().map(|a| a.payload).collect();
        let eval = ScratchGame::evaluate(&spec, &scratch(&spec, &payloads));
        assert_eq!(eval.failure, None);
        assert_eq!(eval.metrics.penalty_units, 0);
        assert_eq!(payloads.len(), 31);
    }
}
