//! Jigsaw
//!
//! An image cut into a square grid of pieces presented in a shuffled bank.
//! Pieces carry opaque random labels so the bank order says nothing about
//! where a piece belongs.

use std::collections::BTreeSet;

use serde::{Serialize, Deserialize};
use serde_json::json;

use crate::config::GameConfig;
use crate::core::rng::DeterministicRng;
use super::autoplay::{Pace, ScriptedAction};
use super::event::Step;
use super::result::{FailureReason, Metrics};
use super::{Evaluation, GameModule, GameType};

/// Generated jigsaw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JigsawSpec {
    /// Pieces per side.
    pub grid_size: u8,
    /// Image cut into pieces.
    pub image_id: u32,
    /// Piece labels in bank order.
    pub bank: Vec<u32>,
    /// Target cell of each bank piece.
    pub solution: Vec<usize>,
}

/// Client projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JigsawView {
    /// Pieces per side.
    pub grid_size: u8,
    /// Image cut into pieces.
    pub image_id: u32,
    /// Piece labels in bank order.
    pub bank: Vec<u32>,
}

/// Replay state.
#[derive(Debug, Clone, PartialEq)]
pub struct JigsawState {
    placed: Vec<bool>,
    filled: Vec<bool>,
    wrong_drops: u32,
}

/// Outcome breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JigsawDetail {
    /// Pieces in their cell.
    pub placed: u32,
    /// Piece count.
    pub pieces: u32,
    /// Drops on a wrong or occupied cell.
    pub wrong_drops: u32,
}

/// Jigsaw game module.
pub struct JigsawGame;

impl GameModule for JigsawGame {
    const GAME_TYPE: GameType = GameType::Jigsaw;
    const EVENT_KINDS: &'static [&'static str] = &["place_piece"];
    const SECRET_FIELDS: &'static [&'static str] = &["solution"];
    const ENDS_ON_SOLVE: bool = true;

    type Spec = JigsawSpec;
    type Client = JigsawView;
    type State = JigsawState;
    type Detail = JigsawDetail;

    fn default_config() -> GameConfig {
        GameConfig {
            time_limit_ms: 90_000,
            grid_size: 3,
            item_count: 24,
            ..GameConfig::default()
        }
    }

    fn generate(rng: &mut DeterministicRng, config: &GameConfig) -> JigsawSpec {
        let grid_size = config.grid_size.clamp(2, 6);
        let pieces = grid_size as usize * grid_size as usize;
        let image_id = rng.next_int(config.item_count.max(1) as u32);

        let mut seen = BTreeSet::new();
        let mut bank = Vec::with_capacity(pieces);
        while bank.len() < pieces {
            let label = rng.next_u32();
            if seen.insert(label) {
                bank.push(label);
            }
        }

        let mut solution: Vec<usize> = (0..pieces).collect();
        rng.shuffle(&mut solution);

        JigsawSpec { grid_size, image_id, bank, solution }
    }

    fn project(spec: &JigsawSpec) -> JigsawView {
        JigsawView {
            grid_size: spec.grid_size,
            image_id: spec.image_id,
            bank: spec.bank.clone(),
        }
    }

    fn initial_state(spec: &JigsawSpec) -> JigsawState {
        JigsawState {
            placed: vec![false; spec.bank.len()],
            filled: vec![false; spec.solution.len()],
            wrong_drops: 0,
        }
    }

    fn apply(spec: &JigsawSpec, mut state: JigsawState, step: &Step<'_>) -> JigsawState {
        let (Some(label), Some(cell)) = (step.index("piece"), step.index("cell")) else {
            return state;
        };
        let Some(piece) = spec.bank.iter().position(|&l| l as usize == label) else {
            return state;
        };
        if cell >= state.filled.len() || state.placed[piece] {
            return state;
        }

        if !state.filled[cell] && spec.solution.get(piece) == Some(&cell) {
            state.placed[piece] = true;
            state.filled[cell] = true;
        } else {
            state.wrong_drops += 1;
        }
        state
    }

    fn evaluate(_spec: &JigsawSpec, state: &JigsawState) -> Evaluation<JigsawDetail> {
        let pieces = state.placed.len() as u32;
        let placed = state.placed.iter().filter(|&&p| p).count() as u32;

        Evaluation {
            metrics: Metrics {
                correct: placed,
                total: pieces,
                mistakes: state.wrong_drops,
                penalty_units: state.wrong_drops,
            },
            detail: JigsawDetail { placed, pieces, wrong_drops: state.wrong_drops },
            failure: (placed < pieces).then_some(FailureReason::Incomplete),
        }
    }

    fn script(spec: &JigsawSpec) -> Vec<ScriptedAction> {
        spec.bank
            .iter()
            .zip(&spec.solution)
            .map(|(label, cell)| ScriptedAction {
                kind: "place_piece",
                payload: json!({ "piece": label, "cell": cell }),
                pace: Pace::Free,
            })
            .collect()
    }
}
