//! Spot the Difference
//!
//! Two copies of a seeded scene with circular spots that differ. The client
//! renders the scene from `scene_seed`; the server alone knows where the
//! spots are. Taps are in scene units.

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

/// Scene width in scene units.
pub const SCENE_WIDTH: u32 = 400;
/// Scene height in scene units.
pub const SCENE_HEIGHT: u32 = 300;

/// One hidden difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spot {
    pub x: u32,
    pub y: u32,
    pub r: u32,
}

impl Spot {
    fn contains(&self, x: u32, y: u32) -> bool {
        let dx = x as i64 - self.x as i64;
        let dy = y as i64 - self.y as i64;
        dx * dx + dy * dy <= (self.r as i64) * (self.r as i64)
    }

    fn overlaps(&self, other: &Spot) -> bool {
        let dx = self.x as i64 - other.x as i64;
        let dy = self.y as i64 - other.y as i64;
        let reach = (self.r + other.r) as i64;
        dx * dx + dy * dy <= reach * reach
    }
}

/// Generated scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpotDifferenceSpec {
    /// Seed the client draws the scene from.
    pub scene_seed: u64,
    /// Spots to find.
    pub count: u16,
    /// Where the scenes differ.
    pub differences: Vec<Spot>,
}

/// Client projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpotDifferenceView {
    /// Seed the client draws the scene from.
    pub scene_seed: u64,
    /// Spots to find.
    pub count: u16,
    pub width: u32,
    pub height: u32,
}

/// Replay state.
#[derive(Debug, Clone, PartialEq)]
pub struct SpotDifferenceState {
    found: Vec<bool>,
    misses: u32,
    last_hit: Option<usize>,
}

/// Outcome breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpotDifferenceDetail {
    /// Spots found.
    pub found: u32,
    /// Spots in the scene.
    pub spots: u32,
    /// Taps that hit nothing.
    pub misses: u32,
}

/// Spot-the-difference game module.
pub struct SpotDifferenceGame;

impl GameModule for SpotDifferenceGame {
    const GAME_TYPE: GameType = GameType::SpotDifference;
    const EVENT_KINDS: &'static [&'static str] = &["tap"];
    const SECRET_FIELDS: &'static [&'static str] = &["differences"];
    const ENDS_ON_SOLVE: bool = true;

    type Spec = SpotDifferenceSpec;
    type Client = SpotDifferenceView;
    type State = SpotDifferenceState;
    type Detail = SpotDifferenceDetail;

    fn default_config() -> GameConfig {
        GameConfig {
            time_limit_ms: 90_000,
            // Spot radius is 12 + 2 * grid_size
            grid_size: 4,
            item_count: 6,
            timing: TimingThresholds {
                min_perfect_completion_ms: 2_000,
                ..TimingThresholds::default()
            },
            scoring: ScoringConfig { penalty_per_unit: 60, ..ScoringConfig::default() },
        }
    }

    fn generate(rng: &mut DeterministicRng, config: &GameConfig) -> SpotDifferenceSpec {
        let wanted = config.item_count.clamp(1, 10) as usize;
        let radius = 12 + 2 * config.grid_size.clamp(1, 6) as u32;

        let mut differences: Vec<Spot> = Vec::with_capacity(wanted);
        // Rejection sampling; a crowded scene may end up with fewer spots
        for _ in 0..wanted * 50 {
            if differences.len() == wanted {
                break;
            }
            let spot = Spot {
                x: radius + rng.next_int(SCENE_WIDTH - 2 * radius),
                y: radius + rng.next_int(SCENE_HEIGHT - 2 * radius),
                r: radius,
            };
            if differences.iter().all(|d| !d.overlaps(&spot)) {
                differences.push(spot);
            }
        }

        SpotDifferenceSpec {
            scene_seed: rng.next_u64(),
            count: differences.len() as u16,
            differences,
        }
    }

    fn project(spec: &SpotDifferenceSpec) -> SpotDifferenceView {
        SpotDifferenceView {
            scene_seed: spec.scene_seed,
            count: spec.count,
            width: SCENE_WIDTH,
            height: SCENE_HEIGHT,
        }
    }

    fn initial_state(spec: &SpotDifferenceSpec) -> SpotDifferenceState {
        SpotDifferenceState {
            found: vec![false; spec.differences.len()],
            misses: 0,
            last_hit: None,
        }
    }

    fn apply(spec: &SpotDifferenceSpec, mut state: SpotDifferenceState, step: &Step<'_>) -> SpotDifferenceState {
        let (Some(x), Some(y)) = (step.index("x"), step.index("y")) else {
            return state;
        };
        let (x, y) = (x.min(u32::MAX as usize) as u32, y.min(u32::MAX as usize) as u32);

        let hit = spec.differences.iter().position(|spot| spot.contains(x, y));
        match hit {
            Some(i) if !state.found[i] => {
                state.found[i] = true;
                state.last_hit = Some(i);
            }
            // Tapping a found spot again does nothing
            Some(_) => {}
            None => {
                state.misses += 1;
                state.last_hit = None;
            }
        }
        state
    }

    fn evaluate(_spec: &SpotDifferenceSpec, state: &SpotDifferenceState) -> Evaluation<SpotDifferenceDetail> {
        let spots = state.found.len() as u32;
        let found = state.found.iter().filter(|&&f| f).count() as u32;

        Evaluation {
            metrics: Metrics {
                correct: found,
                total: spots,
                mistakes: state.misses,
                penalty_units: state.misses,
            },
            detail: SpotDifferenceDetail { found, spots, misses: state.misses },
            failure: (found < spots).then_some(FailureReason::Incomplete),
        }
    }

    fn reveal(spec: &SpotDifferenceSpec, state: &SpotDifferenceState, _step: &Step<'_>) -> Option<Value> {
        let index = state.last_hit?;
        let spot = spec.differences.get(index)?;
        Some(json!({ "spot": index, "x": spot.x, "y": spot.y, "r": spot.r }))
    }

    fn script(spec: &SpotDifferenceSpec) -> Vec<ScriptedAction> {
        spec.differences
            .iter()
            .map(|spot| ScriptedAction {
                kind: "tap",
                payload: json!({ "x": spot.x, "y": spot.y }),
                pace: Pace::Free,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> SpotDifferenceSpec {
        SpotDifferenceSpec {
            scene_seed: 7,
            count: 2,
            differences: vec![Spot { x: 50, y: 50, r: 20 }, Spot { x: 200, y: 150, r: 20 }],
        }
    }

    fn tap(spec: &SpotDifferenceSpec, state: SpotDifferenceState, x: u32, y: u32) -> SpotDifferenceState {
        let payload = json!({ "x": x, "y": y });
        SpotDifferenceGame::apply(spec, state, &Step { kind: "tap", payload: &payload, at_ms: 0 })
    }

    #[test]
    fn test_hits_misses_and_repeats() {
        let spec = spec();
        let mut state = SpotDifferenceGame::initial_state(&spec);
        state = tap(&spec, state, 62, 62); // inside the first spot
        state = tap(&spec, state, 50, 50); // repeat
        state = tap(&spec, state, 300, 40); // miss
        assert_eq!(state.misses, 1);
        assert_eq!(SpotDifferenceGame::evaluate(&spec, &state).failure, Some(FailureReason::Incomplete));

        state = tap(&spec, state, 200, 170); // edge of the second
        let eval = SpotDifferenceGame::evaluate(&spec, &state);
        assert_eq!(eval.failure, None);
        assert_eq!(eval.detail, SpotDifferenceDetail { found: 2, spots: 2, misses: 1 });
    }

    #[test]
    fn test_repeat_tap_leaves_state_unchanged() {
        let spec = spec();
        let once = tap(&spec, SpotDifferenceGame::initial_state(&spec), 50, 50);
        let twice = tap(&spec, once.clone(), 55, 45);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_reveal_only_on_hit() {
        let spec = spec();
        let payload = json!({});
        let step = Step { kind: "tap", payload: &payload, at_ms: 0 };

        let state = tap(&spec, SpotDifferenceGame::initial_state(&spec), 200, 150);
        assert_eq!(
            SpotDifferenceGame::reveal(&spec, &state, &step),
            Some(json!({"spot": 1, "x": 200, "y": 150, "r": 20}))
        );
        let state = tap(&spec, state, 10, 290);
        assert_eq!(SpotDifferenceGame::reveal(&spec, &state, &step), None);
    }

    #[test]
    fn test_generated_spots_inside_and_apart() {
        for seed in 0..50 {
            let spec = SpotDifferenceGame::generate(&mut DeterministicRng::new(seed), &SpotDifferenceGame::default_config());
            assert_eq!(spec.differences.len(), 6);
            assert_eq!(spec.count, 6);
            for (i, a) in spec.differences.iter().enumerate() {
                assert!(a.x >= a.r && a.x + a.r <= SCENE_WIDTH);
                assert!(a.y >= a.r && a.y + a.r <= SCENE_HEIGHT);
                assert!(spec.differences[i + 1..].iter().all(|b| !a.overlaps(b)));
            }
        }
    }
}
