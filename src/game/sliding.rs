//! Sliding Puzzle
//!
//! The classic 15-puzzle family. Boards are made by scrambling a solved
//! board with legal slides, so every board is solvable; the scramble never
//! undoes its previous move and never ends on a solved board.

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

/// Blank square marker.
const BLANK: u16 = 0;

/// Generated board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlidingSpec {
    /// Tiles per side.
    pub size: u8,
    /// Tile numbers row-major, `0` for the blank. Solved is `1..n` then `0`.
    pub tiles: Vec<u16>,
    /// Tiles slid while scrambling, in order.
    pub scramble: Vec<u16>,
}

/// Client projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlidingView {
    /// Tiles per side.
    pub size: u8,
    /// Starting board.
    pub tiles: Vec<u16>,
}

/// Replay state.
#[derive(Debug, Clone, PartialEq)]
pub struct SlidingState {
    tiles: Vec<u16>,
    moves: u32,
    invalid: u32,
}

/// Outcome breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlidingDetail {
    /// Board solved.
    pub solved: bool,
    /// Tiles in their home square.
    pub tiles_home: u32,
    /// Slides made.
    pub moves: u32,
    /// Scramble length.
    pub par_moves: u32,
    /// Slides of tiles not next to the blank.
    pub invalid_slides: u32,
}

fn is_solved(tiles: &[u16]) -> bool {
    tiles_home(tiles) as usize + 1 == tiles.len() && tiles.last() == Some(&BLANK)
}

fn tiles_home(tiles: &[u16]) -> u32 {
    tiles
        .iter()
        .enumerate()
        .filter(|&(i, &t)| t != BLANK && t as usize == i + 1)
        .count() as u32
}

/// Slide `tile` into the blank if adjacent. Returns false otherwise.
fn slide(grid: &Grid, tiles: &mut [u16], tile: u16) -> bool {
    if tile == BLANK {
        return false;
    }
    let (Some(from), Some(blank)) = (
        tiles.iter().position(|&t| t == tile),
        tiles.iter().position(|&t| t == BLANK),
    ) else {
        return false;
    };
    if grid.direction_between(from, blank).is_none() {
        return false;
    }
    tiles.swap(from, blank);
    true
}

/// Sliding puzzle game module.
pub struct SlidingGame;

impl GameModule for SlidingGame {
    const GAME_TYPE: GameType = GameType::SlidingPuzzle;
    const EVENT_KINDS: &'static [&'static str] = &["slide"];
    const SECRET_FIELDS: &'static [&'static str] = &["scramble"];
    const ENDS_ON_SOLVE: bool = true;

    type Spec = SlidingSpec;
    type Client = SlidingView;
    type State = SlidingState;
    type Detail = SlidingDetail;

    fn default_config() -> GameConfig {
        GameConfig {
            time_limit_ms: 120_000,
            grid_size: 3,
            item_count: 30,
            scoring: ScoringConfig { penalty_per_unit: 10, ..ScoringConfig::default() },
            ..GameConfig::default()
        }
    }

    fn generate(rng: &mut DeterministicRng, config: &GameConfig) -> SlidingSpec {
        let size = config.grid_size.clamp(2, 5);
        let grid = Grid::square(size as usize);
        let n = grid.len();

        let mut tiles: Vec<u16> = (1..n as u16).chain([BLANK]).collect();
        let mut blank = n - 1;
        let mut previous_blank = None;
        let mut scramble = Vec::new();
        let target = (config.item_count as usize).clamp(1, 200);

        while scramble.len() < target || is_solved(&tiles) {
            let options: Vec<usize> = grid
                .neighbors(blank)
                .map(|(_, cell)| cell)
                .filter(|&cell| Some(cell) != previous_blank)
                .collect();
            let Some(&from) = rng.choose(&options) else {
                break;
            };
            scramble.push(tiles[from]);
            tiles.swap(from, blank);
            previous_blank = Some(blank);
            blank = from;
        }

        SlidingSpec { size, tiles, scramble }
    }

    fn project(spec: &SlidingSpec) -> SlidingView {
        SlidingView { size: spec.size, tiles: spec.tiles.clone() }
    }

    fn initial_state(spec: &SlidingSpec) -> SlidingState {
        SlidingState { tiles: spec.tiles.clone(), moves: 0, invalid: 0 }
    }

    fn apply(spec: &SlidingSpec, mut state: SlidingState, step: &Step<'_>) -> SlidingState {
        let Some(tile) = step.index("tile").and_then(|t| u16::try_from(t).ok()) else {
            return state;
        };
        if tile == BLANK || tile as usize >= state.tiles.len() {
            return state;
        }
        if is_solved(&state.tiles) {
            return state;
        }

        let grid = Grid::square(spec.size as usize);
        if slide(&grid, &mut state.tiles, tile) {
            state.moves += 1;
        } else {
            state.invalid += 1;
        }
        state
    }

    fn evaluate(spec: &SlidingSpec, state: &SlidingState) -> Evaluation<SlidingDetail> {
        let solved = is_solved(&state.tiles);
        let par_moves = spec.scramble.len() as u32;
        let extra = state.moves.saturating_sub(par_moves);
        let home = tiles_home(&state.tiles);

        Evaluation {
            metrics: Metrics {
                correct: home,
                total: state.tiles.len().saturating_sub(1) as u32,
                mistakes: state.invalid + extra,
                penalty_units: state.invalid + extra,
            },
            detail: SlidingDetail {
                solved,
                tiles_home: home,
                moves: state.moves,
                par_moves,
                invalid_slides: state.invalid,
            },
            failure: (!solved).then_some(FailureReason::Incomplete),
        }
    }

    /// Undo the scramble.
    fn script(spec: &SlidingSpec) -> Vec<ScriptedAction> {
        spec.scramble
            .iter()
            .rev()
            .map(|tile| ScriptedAction {
                kind: "slide",
                payload: json!({ "tile": tile }),
                pace: Pace::Free,
            })
            .collect()
    }
}
