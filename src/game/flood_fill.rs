//! Flood Fill
//!
//! A board of coloured cells. Each pick recolours the region connected to
//! the top-left cell, absorbing neighbours of the picked colour. The board
//! must become one colour within `max_moves`. Par is what a greedy player
//! (largest region after each pick) needs.

use std::collections::VecDeque;

use serde::{Serialize, Deserialize};
use serde_json::json;

use crate::config::GameConfig;
use crate::core::rng::DeterministicRng;
use super::autoplay::{Pace, ScriptedAction};
use super::event::Step;
use super::grid::Grid;
use super::result::{FailureReason, Metrics};
use super::scoring::ScoringConfig;
use super::{Evaluation, GameModule, GameType};

/// Moves allowed beyond par.
const SLACK_MOVES: u16 = 4;

/// Generated board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloodFillSpec {
    /// Cells per side.
    pub size: u8,
    /// Palette size.
    pub colors: u8,
    /// Colour of each cell, row-major.
    pub cells: Vec<u8>,
    /// Picks allowed.
    pub max_moves: u16,
    /// Picks the greedy strategy needs.
    pub par_moves: u16,
}

/// Client projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloodFillView {
    pub size: u8,
    pub colors: u8,
    pub cells: Vec<u8>,
    pub max_moves: u16,
}

/// Replay state.
#[derive(Debug, Clone, PartialEq)]
pub struct FloodFillState {
    cells: Vec<u8>,
    moves: u16,
}

/// Outcome breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloodFillDetail {
    pub moves: u16,
    pub par_moves: u16,
    pub max_moves: u16,
    /// Cells in the flooded region at the end.
    pub flooded: u32,
}

/// Cells connected to the top-left cell through its colour.
fn region(size: usize, cells: &[u8]) -> Vec<usize> {
    let Some(&color) = cells.first() else {
        return Vec::new();
    };
    let grid = Grid::square(size);
    let mut seen = vec![false; cells.len()];
    let mut queue = VecDeque::from([0]);
    let mut out = Vec::new();
    seen[0] = true;
    while let Some(cell) = queue.pop_front() {
        out.push(cell);
        for (_, next) in grid.neighbors(cell) {
            if !seen[next] && cells[next] == color {
                seen[next] = true;
                queue.push_back(next);
            }
        }
    }
    out
}

/// Recolour the top-left region. Returns false for a no-op pick.
fn flood(size: usize, cells: &mut [u8], color: u8) -> bool {
    if cells.first() == Some(&color) {
        return false;
    }
    for cell in region(size, cells) {
        cells[cell] = color;
    }
    true
}

fn is_uniform(cells: &[u8]) -> bool {
    cells.windows(2).all(|w| w[0] == w[1])
}

/// Greedy pick sequence: always the colour that leaves the largest region.
fn greedy_picks(size: usize, colors: u8, cells: &[u8]) -> Vec<u8> {
    let mut board = cells.to_vec();
    let mut picks = Vec::new();
    while !is_uniform(&board) {
        let best = (0..colors)
            .filter(|&c| board.first() != Some(&c))
            .max_by_key(|&c| {
                let mut trial = board.clone();
                flood(size, &mut trial, c);
                // Ties go to the lowest colour
                (region(size, &trial).len(), std::cmp::Reverse(c))
            });
        let Some(color) = best else {
            break;
        };
        flood(size, &mut board, color);
        picks.push(color);
    }
    picks
}

/// Flood fill game module.
pub struct FloodFillGame;

impl GameModule for FloodFillGame {
    const GAME_TYPE: GameType = GameType::FloodFill;
    const EVENT_KINDS: &'static [&'static str] = &["pick"];
    const SECRET_FIELDS: &'static [&'static str] = &["par_moves"];
    const ENDS_ON_SOLVE: bool = true;

    type Spec = FloodFillSpec;
    type Client = FloodFillView;
    type State = FloodFillState;
    type Detail = FloodFillDetail;

    fn default_config() -> GameConfig {
        GameConfig {
            time_limit_ms: 120_000,
            grid_size: 8,
            // Palette size
            item_count: 5,
            scoring: ScoringConfig { penalty_per_unit: 60, ..ScoringConfig::default() },
            ..GameConfig::default()
        }
    }

    fn generate(rng: &mut DeterministicRng, config: &GameConfig) -> FloodFillSpec {
        let size = config.grid_size.clamp(4, 14);
        let colors = config.item_count.clamp(3, 8) as u8;
        let n = size as usize;

        let mut cells: Vec<u8> = (0..n * n).map(|_| rng.next_int(colors as u32) as u8).collect();
        // A board that starts solved, or nearly, is no puzzle
        while greedy_picks(n, colors, &cells).len() < 3 {
            let cell = rng.next_index(cells.len());
            cells[cell] = (cells[cell] + 1) % colors;
        }

        let par_moves = greedy_picks(n, colors, &cells).len() as u16;
        FloodFillSpec {
            size,
            colors,
            cells,
            max_moves: par_moves + SLACK_MOVES,
            par_moves,
        }
    }

    fn project(spec: &FloodFillSpec) -> FloodFillView {
        FloodFillView {
            size: spec.size,
            colors: spec.colors,
            cells: spec.cells.clone(),
            max_moves: spec.max_moves,
        }
    }

    fn initial_state(spec: &FloodFillSpec) -> FloodFillState {
        FloodFillState { cells: spec.cells.clone(), moves: 0 }
    }

    fn apply(spec: &FloodFillSpec, mut state: FloodFillState, step: &Step<'_>) -> FloodFillState {
        if state.moves >= spec.max_moves {
            return state;
        }
        let Some(color) = step.index("color").filter(|&c| c < spec.colors as usize) else {
            return state;
        };
        if flood(spec.size as usize, &mut state.cells, color as u8) {
            state.moves += 1;
        }
        state
    }

    fn evaluate(spec: &FloodFillSpec, state: &FloodFillState) -> Evaluation<FloodFillDetail> {
        let flooded = region(spec.size as usize, &state.cells).len() as u32;
        let over_par = state.moves.saturating_sub(spec.par_moves) as u32;

        Evaluation {
            metrics: Metrics {
                correct: flooded,
                total: state.cells.len() as u32,
                mistakes: over_par,
                penalty_units: over_par,
            },
            detail: FloodFillDetail {
                moves: state.moves,
                par_moves: spec.par_moves,
                max_moves: spec.max_moves,
                flooded,
            },
            failure: (!is_uniform(&state.cells)).then_some(FailureReason::Incomplete),
        }
    }

    fn script(spec: &FloodFillSpec) -> Vec<ScriptedAction> {
        greedy_picks(spec.size as usize, spec.colors, &spec.cells)
            .into_iter()
            .map(|color| ScriptedAction {
                kind: "pick",
                payload: json!({ "color": color }),
                pace: Pace::Free,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 3x3 board:
    ///
    /// ```text
    /// 0 0 1
    /// 1 1 2
    /// 2 2 2
    /// ```
    fn spec() -> FloodFillSpec {
        FloodFillSpec {
            size: 3,
            colors: 3,
            cells: vec![0, 0, 1, 1, 1, 2, 2, 2, 2],
            max_moves: 3,
            par_moves: 2,
        }
    }

    fn pick(spec: &FloodFillSpec, colors: &[usize]) -> FloodFillState {
        let mut state = FloodFillGame::initial_state(spec);
        for color in colors {
            let payload = json!({ "color": color });
            state = FloodFillGame::apply(spec, state, &Step { kind: "pick", payload: &payload, at_ms: 0 });
        }
        state
    }

    #[test]
    fn test_flood_absorbs_neighbours() {
        let spec = spec();
        let state = pick(&spec, &[1]);
        assert_eq!(state.cells, vec![1, 1, 1, 1, 1, 2, 2, 2, 2]);
        assert_eq!(region(3, &state.cells).len(), 5);
    }

    #[test]
    fn test_greedy_par() {
        let spec = spec();
        assert_eq!(greedy_picks(3, 3, &spec.cells), vec![1, 2]);
        let eval = FloodFillGame::evaluate(&spec, &pick(&spec, &[1, 2]));
        assert_eq!(eval.failure, None);
        assert_eq!(eval.metrics.penalty_units, 0);
    }

    #[test]
    fn test_same_colour_pick_is_free() {
        let spec = spec();
        let state = pick(&spec, &[0, 0, 7]);
        assert_eq!(state.moves, 0);
        assert_eq!(state.cells, spec.cells);
    }

    #[test]
    fn test_move_cap() {
        let spec = spec();
        // Three wasted picks use up the allowance
        let state = pick(&spec, &[2, 0, 2, 1, 2]);
        assert_eq!(state.moves, 3);
        let eval = FloodFillGame::evaluate(&spec, &state);
        assert_eq!(eval.failure, Some(FailureReason::Incomplete));

        let state = pick(&spec, &[2, 1, 2]);
        let eval = FloodFillGame::evaluate(&spec, &state);
        assert_eq!(eval.failure, None);
        assert_eq!(eval.detail.moves, 3);
        assert_eq!(eval.metrics.penalty_units, 1);
    }

    #[test]
    fn test_generated_boards_need_moves() {
        for seed in 0..30 {
            let spec = FloodFillGame::generate(&mut DeterministicRng::new(seed), &FloodFillGame::default_config());
            assert_eq!(spec.cells.len(), 64);
            assert!(spec.cells.iter().all(|&c| c < 5));
            assert!(spec.par_moves >= 3);
            assert_eq!(spec.max_moves, spec.par_moves + SLACK_MOVES);
            assert_eq!(FloodFillGame::script(&spec).len(), spec.par_moves as usize);
        }
    }
}
