//! Mini Sudoku
//!
//! 4x4, 6x6 or 9x9 boards built by shuffling a canonical solved grid
//! (digits, rows within bands, bands, columns within stacks, stacks) and
//! blanking cells. Any filled grid that satisfies the row, column and box
//! rules wins, whether or not it matches the generated solution.

use serde::{Serialize, Deserialize};
use serde_json::json;

use crate::config::GameConfig;
use crate::core::rng::DeterministicRng;
use super::autoplay::{Pace, ScriptedAction};
use super::event::Step;
use super::result::{FailureReason, Metrics};
use super::scoring::ScoringConfig;
use super::{Evaluation, GameModule, GameType};

/// Generated board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SudokuSpec {
    /// Digits per row.
    pub size: u8,
    /// Rows per box.
    pub box_rows: u8,
    /// Columns per box.
    pub box_cols: u8,
    /// Given digits, 0 for blanks, row-major.
    pub givens: Vec<u8>,
    /// Generated full grid.
    pub solution: Vec<u8>,
}

impl SudokuSpec {
    fn cells(&self) -> usize {
        self.size as usize * self.size as usize
    }

    /// True when `grid` is full and breaks no rule.
    fn is_solved(&self, grid: &[u8]) -> bool {
        let n = self.size as usize;
        if grid.len() != n * n || grid.iter().any(|&d| d == 0 || d as usize > n) {
            return false;
        }
        let (br, bc) = (self.box_rows as usize, self.box_cols as usize);
        if br * bc != n {
            return false;
        }
        let distinct = |cells: &mut dyn Iterator<Item = usize>| {
            let mut seen = 0u32;
            Iterator::all(&mut &mut *cells, |cell| {
                let bit = 1 << grid[cell];
                let fresh = seen & bit == 0;
                seen |= bit;
                fresh
            })
        };

        (0..n).all(|i| {
            let box_row = i / (n / bc) * br;
            let box_col = i % (n / bc) * bc;
            distinct(&mut (0..n).map(|c| i * n + c))
                && distinct(&mut (0..n).map(|r| r * n + i))
                && distinct(&mut (0..n).map(|k| (box_row + k / bc) * n + box_col + k % bc))
        })
    }
}

/// Client projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SudokuView {
    /// Digits per row.
    pub size: u8,
    /// Rows per box.
    pub box_rows: u8,
    /// Columns per box.
    pub box_cols: u8,
    /// Given digits, 0 for blanks.
    pub givens: Vec<u8>,
}

/// Replay state.
#[derive(Debug, Clone, PartialEq)]
pub struct SudokuState {
    grid: Vec<u8>,
    corrections: u32,
}

/// Outcome breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SudokuDetail {
    /// Blanks filled at the end.
    pub filled: u32,
    /// Blanks on the board.
    pub blanks: u32,
    /// Filled cells changed or cleared.
    pub corrections: u32,
}

/// Box shape for a board size.
fn box_shape(size: u8) -> (u8, u8) {
    match size {
        4 => (2, 2),
        6 => (2, 3),
        _ => (3, 3),
    }
}

/// Order of `groups` blocks of `width` lines, shuffled at both levels.
fn shuffled_lines(rng: &mut DeterministicRng, groups: usize, width: usize) -> Vec<usize> {
    let mut blocks: Vec<usize> = (0..groups).collect();
    rng.shuffle(&mut blocks);
    blocks
        .into_iter()
        .flat_map(|block| {
            let mut lines: Vec<usize> = (0..width).map(|i| block * width + i).collect();
            rng.shuffle(&mut lines);
            lines
        })
        .collect()
}

/// Mini sudoku game module.
pub struct SudokuGame;

impl GameModule for SudokuGame {
    const GAME_TYPE: GameType = GameType::Sudoku;
    const EVENT_KINDS: &'static [&'static str] = &["fill"];
    const SECRET_FIELDS: &'static [&'static str] = &["solution"];
    const ENDS_ON_SOLVE: bool = true;

    type Spec = SudokuSpec;
    type Client = SudokuView;
    type State = SudokuState;
    type Detail = SudokuDetail;

    fn default_config() -> GameConfig {
        GameConfig {
            time_limit_ms: 240_000,
            grid_size: 6,
            item_count: 16,
            scoring: ScoringConfig { penalty_per_unit: 30, ..ScoringConfig::default() },
            ..GameConfig::default()
        }
    }

    fn generate(rng: &mut DeterministicRng, config: &GameConfig) -> SudokuSpec {
        let size = match config.grid_size {
            0..=4 => 4,
            5..=7 => 6,
            _ => 9,
        };
        let (box_rows, box_cols) = box_shape(size);
        let (n, br, bc) = (size as usize, box_rows as usize, box_cols as usize);

        let mut digits: Vec<u8> = (1..=size).collect();
        rng.shuffle(&mut digits);
        let rows = shuffled_lines(rng, n / br, br);
        let cols = shuffled_lines(rng, n / bc, bc);

        // Canonical grid: each row shifts by a box width, each band by one
        let pattern = |r: usize, c: usize| (bc * (r % br) + r / br + c) % n;
        let solution: Vec<u8> = (0..n * n)
            .map(|cell| digits[pattern(rows[cell / n], cols[cell % n])])
            .collect();

        let mut order: Vec<usize> = (0..n * n).collect();
        rng.shuffle(&mut order);
        let blanks = (config.item_count as usize).clamp(1, n * n - 1);
        let mut givens = solution.clone();
        for &cell in &order[..blanks] {
            givens[cell] = 0;
        }

        SudokuSpec { size, box_rows, box_cols, givens, solution }
    }

    fn project(spec: &SudokuSpec) -> SudokuView {
        SudokuView {
            size: spec.size,
            box_rows: spec.box_rows,
            box_cols: spec.box_cols,
            givens: spec.givens.clone(),
        }
    }

    fn initial_state(spec: &SudokuSpec) -> SudokuState {
        SudokuState { grid: spec.givens.clone(), corrections: 0 }
    }

    fn apply(spec: &SudokuSpec, mut state: SudokuState, step: &Step<'_>) -> SudokuState {
        let (Some(cell), Some(value)) = (step.index("cell"), step.index("value")) else {
            return state;
        };
        if value > spec.size as usize || spec.givens.get(cell) != Some(&0) {
            return state;
        }
        let Some(slot) = state.grid.get_mut(cell) else {
            return state;
        };

        let value = value as u8;
        if *slot != 0 && *slot != value {
            state.corrections += 1;
        }
        *slot = value;
        state
    }

    fn evaluate(spec: &SudokuSpec, state: &SudokuState) -> Evaluation<SudokuDetail> {
        let blanks = spec.givens.iter().filter(|&&d| d == 0).count() as u32;
        let filled = spec
            .givens
            .iter()
            .zip(&state.grid)
            .filter(|&(&given, &now)| given == 0 && now != 0)
            .count() as u32;

        Evaluation {
            metrics: Metrics {
                correct: filled,
                total: blanks,
                mistakes: state.corrections,
                penalty_units: state.corrections,
            },
            detail: SudokuDetail { filled, blanks, corrections: state.corrections },
            failure: (!spec.is_solved(&state.grid)).then_some(FailureReason::Incomplete),
        }
    }

    fn script(spec: &SudokuSpec) -> Vec<ScriptedAction> {
        (0..spec.cells())
            .filter(|&cell| spec.givens[cell] == 0)
            .map(|cell| ScriptedAction {
                kind: "fill",
                payload: json!({ "cell": cell, "value": spec.solution[cell] }),
                pace: Pace::Free,
            })
            .collect()
    }
}
