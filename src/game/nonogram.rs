//! Nonogram
//!
//! A hidden picture described by run-length clues for every row and column.
//! The board is judged against the clues, not the picture, so a puzzle with
//! more than one answer accepts all of them.

use serde::{Serialize, Deserialize};
use serde_json::json;

use crate::config::GameConfig;
use crate::core::rng::DeterministicRng;
use super::autoplay::{Pace, ScriptedAction};
use super::event::Step;
use super::result::{FailureReason, Metrics};
use super::scoring::ScoringConfig;
use super::{Evaluation, GameModule, GameType};

/// Generated picture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonogramSpec {
    /// Cells per side.
    pub size: u8,
    /// Filled runs per row, top to bottom.
    pub row_clues: Vec<Vec<u8>>,
    /// Filled runs per column, left to right.
    pub col_clues: Vec<Vec<u8>>,
    /// The picture, row-major.
    pub solution: Vec<bool>,
}

/// Client projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonogramView {
    /// Cells per side.
    pub size: u8,
    /// Filled runs per row.
    pub row_clues: Vec<Vec<u8>>,
    /// Filled runs per column.
    pub col_clues: Vec<Vec<u8>>,
}

/// Replay state.
#[derive(Debug, Clone, PartialEq)]
pub struct NonogramState {
    filled: Vec<bool>,
    toggles: u32,
}

/// Outcome breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonogramDetail {
    /// Rows and columns matching their clue.
    pub lines_matched: u32,
    /// Rows plus columns.
    pub lines: u32,
    /// Cells toggled.
    pub toggles: u32,
    /// Filled cells in the picture.
    pub par_toggles: u32,
}

/// Lengths of the filled runs in a line.
fn runs(line: impl Iterator<Item = bool>) -> Vec<u8> {
    let mut out = Vec::new();
    let mut current = 0u8;
    for filled in line {
        if filled {
            current += 1;
        } else if current > 0 {
            out.push(current);
            current = 0;
        }
    }
    if current > 0 {
        out.push(current);
    }
    out
}

fn row_runs(cells: &[bool], n: usize, row: usize) -> Vec<u8> {
    runs((0..n).map(|c| cells[row * n + c]))
}

fn col_runs(cells: &[bool], n: usize, col: usize) -> Vec<u8> {
    runs((0..n).map(|r| cells[r * n + col]))
}

/// Nonogram game module.
pub struct NonogramGame;

impl GameModule for NonogramGame {
    const GAME_TYPE: GameType = GameType::Nonogram;
    const EVENT_KINDS: &'static [&'static str] = &["toggle"];
    const SECRET_FIELDS: &'static [&'static str] = &["solution"];
    const ENDS_ON_SOLVE: bool = true;

    type Spec = NonogramSpec;
    type Client = NonogramView;
    type State = NonogramState;
    type Detail = NonogramDetail;

    fn default_config() -> GameConfig {
        GameConfig {
            time_limit_ms: 180_000,
            grid_size: 6,
            // Fill percentage
            item_count: 55,
            scoring: ScoringConfig { penalty_per_unit: 20, ..ScoringConfig::default() },
            ..GameConfig::default()
        }
    }

    fn generate(rng: &mut DeterministicRng, config: &GameConfig) -> NonogramSpec {
        let size = config.grid_size.clamp(5, 10);
        let n = size as usize;
        let density = u32::from(config.item_count.clamp(20, 80));

        let mut solution: Vec<bool> = (0..n * n).map(|_| rng.next_percent(density)).collect();
        // At least a third of the picture is ink
        while solution.iter().filter(|&&f| f).count() < n * n / 3 {
            let cell = rng.next_index(n * n);
            solution[cell] = true;
        }

        let row_clues = (0..n).map(|r| row_runs(&solution, n, r)).collect();
        let col_clues = (0..n).map(|c| col_runs(&solution, n, c)).collect();
        NonogramSpec { size, row_clues, col_clues, solution }
    }

    fn project(spec: &NonogramSpec) -> NonogramView {
        NonogramView {
            size: spec.size,
            row_clues: spec.row_clues.clone(),
            col_clues: spec.col_clues.clone(),
        }
    }

    fn initial_state(spec: &NonogramSpec) -> NonogramState {
        NonogramState {
            filled: vec![false; spec.size as usize * spec.size as usize],
            toggles: 0,
        }
    }

    fn apply(_spec: &NonogramSpec, mut state: NonogramState, step: &Step<'_>) -> NonogramState {
        if let Some(cell) = step.index("cell") {
            if let Some(f) = state.filled.get_mut(cell) {
                *f = !*f;
                state.toggles += 1;
            }
        }
        state
    }

    fn evaluate(spec: &NonogramSpec, state: &NonogramState) -> Evaluation<NonogramDetail> {
        let n = spec.size as usize;
        let lines = (spec.row_clues.len() + spec.col_clues.len()) as u32;
        let lines_matched = if state.filled.len() == n * n {
            let rows = spec.row_clues.iter().enumerate().filter(|(r, clue)| row_runs(&state.filled, n, *r) == **clue);
            let cols = spec.col_clues.iter().enumerate().filter(|(c, clue)| col_runs(&state.filled, n, *c) == **clue);
            (rows.count() + cols.count()) as u32
        } else {
            0
        };
        let par_toggles = spec.solution.iter().filter(|&&f| f).count() as u32;
        let extra = state.toggles.saturating_sub(par_toggles);

        Evaluation {
            metrics: Metrics {
                correct: lines_matched,
                total: lines,
                mistakes: extra,
                penalty_units: extra,
            },
            detail: NonogramDetail {
                lines_matched,
                lines,
                toggles: state.toggles,
                par_toggles,
            },
            failure: (lines_matched < lines).then_some(FailureReason::Incomplete),
        }
    }

    fn script(spec: &NonogramSpec) -> Vec<ScriptedAction> {
        spec.solution
            .iter()
            .enumerate()
            .filter(|&(_, &f)| f)
            .map(|(cell, _)| ScriptedAction {
                kind: "toggle",
                payload: json!({ "cell": cell }),
                pace: Pace::Free,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toggle_all(spec: &NonogramSpec, cells: &[usize]) -> NonogramState {
        let mut state = NonogramGame::initial_state(spec);
        for cell in cells {
            let payload = json!({ "cell": cell });
            state = NonogramGame::apply(spec, state, &Step { kind: "toggle", payload: &payload, at_ms: 0 });
        }
        state
    }

    #[test]
    fn test_runs() {
        assert_eq!(runs([true, true, false, true].into_iter()), vec![2, 1]);
        assert_eq!(runs([false, false].into_iter()), Vec::<u8>::new());
        assert_eq!(runs([false, true, true, true].into_iter()), vec![3]);
    }

    #[test]
    fn test_clues_match_solution() {
        for seed in 0..50 {
            let spec = NonogramGame::generate(&mut DeterministicRng::new(seed), &NonogramGame::default_config());
            assert_eq!(spec.row_clues.len(), 6);
            assert!(spec.solution.iter().filter(|&&f| f).count() >= 12);

            let cells: Vec<usize> = (0..36).filter(|&c| spec.solution[c]).collect();
            let eval = NonogramGame::evaluate(&spec, &toggle_all(&spec, &cells));
            assert_eq!(eval.failure, None);
            assert_eq!(eval.metrics.penalty_units, 0);
        }
    }

    #[test]
    fn test_any_picture_fitting_the_clues_wins() {
        // A 2x2 diagonal has two answers
        let spec = NonogramSpec {
            size: 2,
            row_clues: vec![vec![1], vec![1]],
            col_clues: vec![vec![1], vec![1]],
            solution: vec![true, false, false, true],
        };
        let eval = NonogramGame::evaluate(&spec, &toggle_all(&spec, &[1, 2]));
        assert_eq!(eval.failure, None);
    }

    #[test]
    fn test_untoggle_costs_moves() {
        let spec = NonogramSpec {
            size: 2,
            row_clues: vec![vec![2], vec![]],
            col_clues: vec![vec![1], vec![1]],
            solution: vec![true, true, false, false],
        };
        let state = toggle_all(&spec, &[0, 2, 2, 1, 9]);
        let eval = NonogramGame::evaluate(&spec, &state);
        assert_eq!(eval.failure, None);
        assert_eq!(eval.detail.toggles, 4);
        assert_eq!(eval.metrics.penalty_units, 2);

        let partial = NonogramGame::evaluate(&spec, &toggle_all(&spec, &[0]));
        assert_eq!(partial.failure, Some(FailureReason::Incomplete));
        // Empty second row and first column already fit
        assert_eq!(partial.detail.lines_matched, 2);
    }
}
