//! Image Rotation
//!
//! A picture cut into a square grid of tiles, each turned by a multiple of
//! 90°. Every click turns one tile a quarter turn counter-clockwise, so a
//! tile offset by `r` degrees needs `r / 90` clicks.

use serde::{Serialize, Deserialize};
use serde_json::json;

use crate::config::GameConfig;
use crate::core::rng::DeterministicRng;
use super::autoplay::{Pace, ScriptedAction};
use super::event::Step;
use super::heuristics::TimingThresholds;
use super::result::{FailureReason, Metrics};
use super::scoring::ScoringConfig;
use super::{Evaluation, GameModule, GameType};

/// Quarter turns per click, in degrees.
const CLICK_DEGREES: u16 = 90;

/// Generated rotation puzzle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationSpec {
    /// Tiles per side.
    pub grid_size: u8,
    /// Image shown on the tiles.
    pub image_id: u32,
    /// Clockwise offset of each tile in degrees (0, 90, 180, 270), row-major.
    pub initial_rotations: Vec<u16>,
    /// Fewest clicks that solve the puzzle.
    pub min_clicks: u32,
}

impl RotationSpec {
    /// Build a spec, deriving `min_clicks` from the rotations.
    pub fn new(grid_size: u8, image_id: u32, initial_rotations: Vec<u16>) -> Self {
        let min_clicks = initial_rotations
            .iter()
            .map(|&r| (r % 360 / CLICK_DEGREES) as u32)
            .sum();
        Self { grid_size, image_id, initial_rotations, min_clicks }
    }
}

/// Client projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationView {
    /// Tiles per side.
    pub grid_size: u8,
    /// Image shown on the tiles.
    pub image_id: u32,
    /// Starting offsets.
    pub initial_rotations: Vec<u16>,
}

/// Replay state.
#[derive(Debug, Clone, PartialEq)]
pub struct RotationState {
    rotations: Vec<u16>,
    clicks: u32,
}

/// Outcome breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationDetail {
    /// Tiles at 0°.
    pub tiles_solved: u32,
    /// Tile count.
    pub tiles: u32,
    /// Clicks made.
    pub clicks: u32,
    /// Clicks beyond the minimum.
    pub extra_rotations: u32,
}

/// Image rotation game module.
pub struct RotationGame;

impl GameModule for RotationGame {
    const GAME_TYPE: GameType = GameType::ImageRotation;
    const EVENT_KINDS: &'static [&'static str] = &["rotate"];
    const SECRET_FIELDS: &'static [&'static str] = &["min_clicks"];
    const ENDS_ON_SOLVE: bool = true;

    type Spec = RotationSpec;
    type Client = RotationView;
    type State = RotationState;
    type Detail = RotationDetail;

    fn default_config() -> GameConfig {
        GameConfig {
            time_limit_ms: 60_000,
            grid_size: 3,
            item_count: 24,
            timing: TimingThresholds {
                min_perfect_completion_ms: 1_500,
                ..TimingThresholds::default()
            },
            scoring: ScoringConfig { penalty_per_unit: 25, ..ScoringConfig::default() },
        }
    }

    fn generate(rng: &mut DeterministicRng, config: &GameConfig) -> RotationSpec {
        let size = config.grid_size.clamp(2, 6);
        let tiles = size as usize * size as usize;
        let image_id = rng.next_int(config.item_count.max(1) as u32);

        let mut rotations: Vec<u16> = (0..tiles)
            .map(|_| rng.next_int(4) as u16 * CLICK_DEGREES)
            .collect();

        // At least one tile must need turning
        if rotations.iter().all(|&r| r == 0) {
            let tile = rng.next_index(tiles);
            rotations[tile] = (1 + rng.next_int(3) as u16) * CLICK_DEGREES;
        }

        RotationSpec::new(size, image_id, rotations)
    }

    fn project(spec: &RotationSpec) -> RotationView {
        RotationView {
            grid_size: spec.grid_size,
            image_id: spec.image_id,
            initial_rotations: spec.initial_rotations.clone(),
        }
    }

    fn initial_state(spec: &RotationSpec) -> RotationState {
        RotationState {
            rotations: spec.initial_rotations.iter().map(|r| r % 360).collect(),
            clicks: 0,
        }
    }

    fn apply(_spec: &RotationSpec, mut state: RotationState, step: &Step<'_>) -> RotationState {
        if let Some(tile) = step.index("tile") {
            if let Some(r) = state.rotations.get_mut(tile) {
                *r = (*r + 360 - CLICK_DEGREES) % 360;
                state.clicks += 1;
            }
        }
        state
    }

    fn evaluate(spec: &RotationSpec, state: &RotationState) -> Evaluation<RotationDetail> {
        let tiles = state.rotations.len() as u32;
        let tiles_solved = state.rotations.iter().filter(|&&r| r == 0).count() as u32;
        let extra_rotations = state.clicks.saturating_sub(spec.min_clicks);

        Evaluation {
            metrics: Metrics {
                correct: tiles_solved,
                total: tiles,
                mistakes: extra_rotations,
                penalty_units: extra_rotations,
            },
            detail: RotationDetail {
                tiles_solved,
                tiles,
                clicks: state.clicks,
                extra_rotations,
            },
            failure: (tiles_solved < tiles).then_some(FailureReason::Incomplete),
        }
    }

    fn script(spec: &RotationSpec) -> Vec<ScriptedAction> {
        spec.initial_rotations
            .iter()
            .enumerate()
            .flat_map(|(tile, &r)| {
                (0..r % 360 / CLICK_DEGREES).map(move |_| ScriptedAction {
                    kind: "rotate",
                    payload: json!({ "tile": tile }),
                    pace: Pace::Free,
                })
            })
            .collect()
    }
}
