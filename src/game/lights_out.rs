//! Lights Out
//!
//! Pressing a cell toggles it and its orthogonal neighbours. Boards are
//! made by pressing distinct cells on a dark board, so the set of pressed
//! cells is a known solution.

use serde::{Serialize, Deserialize};
use serde_json::json;

use crate::config::GameConfig;
use crate::core::rng::DeterministicRng;
use super::autoplay::{Pace, ScriptedAction};
use super::event::Step;
use super::grid::Grid;
use super::result::{FailureReason, Metrics};
use super::{Evaluation, GameModule, GameType};

/// Generated board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightsOutSpec {
    /// Cells per side.
    pub size: u8,
    /// Lit cells, row-major.
    pub lights: Vec<bool>,
    /// Cells whose presses turn every light off, ascending.
    pub solution: Vec<usize>,
}

/// Client projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightsOutView {
    /// Cells per side.
    pub size: u8,
    /// Lit cells.
    pub lights: Vec<bool>,
}

/// Replay state.
#[derive(Debug, Clone, PartialEq)]
pub struct LightsOutState {
    lights: Vec<bool>,
    presses: u32,
}

/// Outcome breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightsOutDetail {
    /// Cells still lit.
    pub lights_on: u32,
    /// Presses made.
    pub presses: u32,
    /// Presses in the known solution.
    pub par_presses: u32,
}

fn toggle(grid: &Grid, lights: &mut [bool], cell: usize) {
    lights[cell] = !lights[cell];
    for (_, next) in grid.neighbors(cell) {
        lights[next] = !lights[next];
    }
}

/// Lights out game module.
pub struct LightsOutGame;

impl GameModule for LightsOutGame {
    const GAME_TYPE: GameType = GameType::LightsOut;
    const EVENT_KINDS: &'static [&'static str] = &["press"];
    const SECRET_FIELDS: &'static [&'static str] = &["solution"];
    const ENDS_ON_SOLVE: bool = true;

    type Spec = LightsOutSpec;
    type Client = LightsOutView;
    type State = LightsOutState;
    type Detail = LightsOutDetail;

    fn default_config() -> GameConfig {
        GameConfig {
            time_limit_ms: 90_000,
            grid_size: 5,
            item_count: 6,
            ..GameConfig::default()
        }
    }

    fn generate(rng: &mut DeterministicRng, config: &GameConfig) -> LightsOutSpec {
        let size = config.grid_size.clamp(3, 7);
        let grid = Grid::square(size as usize);
        let presses = (config.item_count as usize).clamp(1, grid.len());

        let mut order: Vec<usize> = (0..grid.len()).collect();
        rng.shuffle(&mut order);

        let mut lights = vec![false; grid.len()];
        let mut used = 0;
        // Some press sets cancel out; keep pressing fresh cells until lit
        while used < order.len() && (used < presses || lights.iter().all(|&l| !l)) {
            toggle(&grid, &mut lights, order[used]);
            used += 1;
        }

        let mut solution = order[..used].to_vec();
        solution.sort_unstable();

        LightsOutSpec { size, lights, solution }
    }

    fn project(spec: &LightsOutSpec) -> LightsOutView {
        LightsOutView { size: spec.size, lights: spec.lights.clone() }
    }

    fn initial_state(spec: &LightsOutSpec) -> LightsOutState {
        LightsOutState { lights: spec.lights.clone(), presses: 0 }
    }

    fn apply(spec: &LightsOutSpec, mut state: LightsOutState, step: &Step<'_>) -> LightsOutState {
        let grid = Grid::square(spec.size as usize);
        if grid.len() != state.lights.len() {
            return state;
        }
        if let Some(cell) = step.index("cell").filter(|&c| grid.contains(c)) {
            toggle(&grid, &mut state.lights, cell);
            state.presses += 1;
        }
        state
    }

    fn evaluate(spec: &LightsOutSpec, state: &LightsOutState) -> Evaluation<LightsOutDetail> {
        let lights_on = state.lights.iter().filter(|&&l| l).count() as u32;
        let cells = state.lights.len() as u32;
        let par_presses = spec.solution.len() as u32;
        let extra = state.presses.saturating_sub(par_presses);

        Evaluation {
            metrics: Metrics {
                correct: cells - lights_on,
                total: cells,
                mistakes: extra,
                penalty_units: extra,
            },
            detail: LightsOutDetail { lights_on, presses: state.presses, par_presses },
            failure: (lights_on > 0).then_some(FailureReason::Incomplete),
        }
    }

    fn script(spec: &LightsOutSpec) -> Vec<ScriptedAction> {
        spec.solution
            .iter()
            .map(|cell| ScriptedAction {
                kind: "press",
                payload: json!({ "cell": cell }),
                pace: Pace::Free,
            })
            .collect()
    }
}
