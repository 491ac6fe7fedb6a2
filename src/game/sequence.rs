//! Sequence Recall
//!
//! Simon-style recall. Round `r` shows the first `r` colours of a hidden
//! sequence and the player repeats them. One wrong press ends the game.

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

/// Generated sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceSpec {
    /// Distinct colours.
    pub colors: u8,
    /// Rounds (and sequence length).
    pub length: u16,
    /// Colour of each position.
    pub sequence: Vec<u8>,
}

/// Client projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceView {
    /// Distinct colours.
    pub colors: u8,
    /// Rounds.
    pub length: u16,
}

/// Replay state.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceState {
    /// Round being entered (1-based), if any.
    round: Option<usize>,
    position: usize,
    completed: usize,
    failed_round: Option<usize>,
    presses: u32,
}

/// Outcome breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceDetail {
    /// Rounds repeated correctly.
    pub rounds_completed: u32,
    /// Rounds available.
    pub length: u32,
    /// Round ended by a wrong press.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_round: Option<u32>,
    /// Presses accepted.
    pub presses: u32,
}

/// Sequence recall game module.
pub struct SequenceGame;

impl GameModule for SequenceGame {
    const GAME_TYPE: GameType = GameType::SequenceRecall;
    const EVENT_KINDS: &'static [&'static str] = &["round_ready", "press"];
    // `round_ready` is sent by the client UI, not the player
    const TIMED_KINDS: &'static [&'static str] = &["press"];
    const SECRET_FIELDS: &'static [&'static str] = &["sequence"];

    type Spec = SequenceSpec;
    type Client = SequenceView;
    type State = SequenceState;
    type Detail = SequenceDetail;

    fn default_config() -> GameConfig {
        GameConfig {
            time_limit_ms: 120_000,
            grid_size: 4,
            item_count: 8,
            timing: TimingThresholds {
                min_mean_gap_ms: 150,
                review_mean_gap_ms: 250,
                ..TimingThresholds::default()
            },
            scoring: ScoringConfig { penalty_per_unit: 100, ..ScoringConfig::default() },
        }
    }

    fn generate(rng: &mut DeterministicRng, config: &GameConfig) -> SequenceSpec {
        let colors = config.grid_size.clamp(2, 9);
        let length = config.item_count.clamp(1, 32);
        let sequence = (0..length).map(|_| rng.next_int(colors as u32) as u8).collect();
        SequenceSpec { colors, length, sequence }
    }

    fn project(spec: &SequenceSpec) -> SequenceView {
        SequenceView { colors: spec.colors, length: spec.length }
    }

    fn initial_state(_spec: &SequenceSpec) -> SequenceState {
        SequenceState {
            round: None,
            position: 0,
            completed: 0,
            failed_round: None,
            presses: 0,
        }
    }

    fn apply(spec: &SequenceSpec, mut state: SequenceState, step: &Step<'_>) -> SequenceState {
        if state.failed_round.is_some() {
            return state;
        }
        match step.kind {
            "round_ready" => {
                if state.round.is_none() && state.completed < spec.sequence.len() {
                    state.round = Some(state.completed + 1);
                    state.position = 0;
                }
            }
            "press" => {
                let (Some(color), Some(round)) = (step.index("color"), state.round) else {
                    return state;
                };
                state.presses += 1;
                if spec.sequence.get(state.position).map(|&c| c as usize) == Some(color) {
                    state.position += 1;
                    if state.position == round {
                        state.completed = round;
                        state.round = None;
                    }
                } else {
                    state.failed_round = Some(round);
                    state.round = None;
                }
            }
            _ => {}
        }
        state
    }

    fn evaluate(spec: &SequenceSpec, state: &SequenceState) -> Evaluation<SequenceDetail> {
        let length = spec.sequence.len() as u32;
        let completed = state.completed as u32;
        let failure = match (completed, state.failed_round) {
            (0, Some(_)) => Some(FailureReason::IncorrectOrder),
            (0, None) => Some(FailureReason::NoRoundsCompleted),
            _ => None,
        };

        Evaluation {
            metrics: Metrics {
                correct: completed,
                total: length,
                mistakes: state.failed_round.is_some() as u32,
                penalty_units: length - completed,
            },
            detail: SequenceDetail {
                rounds_completed: completed,
                length,
                failed_round: state.failed_round.map(|r| r as u32),
                presses: state.presses,
            },
            failure,
        }
    }

    fn reveal(spec: &SequenceSpec, state: &SequenceState, step: &Step<'_>) -> Option<Value> {
        match step.kind {
            "round_ready" => {
                let round = state.round?;
                Some(json!({ "round": round, "sequence": spec.sequence.get(..round)? }))
            }
            "press" => Some(json!({
                "ok": state.failed_round.is_none(),
                "rounds_completed": state.completed,
            })),
            _ => None,
        }
    }

    fn script(spec: &SequenceSpec) -> Vec<ScriptedAction> {
        let mut actions = Vec::new();
        for round in 1..=spec.sequence.len() {
            actions.push(ScriptedAction {
                kind: "round_ready",
                payload: json!({}),
                pace: Pace::Free,
            });
            for color in &spec.sequence[..round] {
                actions.push(ScriptedAction {
                    kind: "press",
                    payload: json!({ "color": color }),
                    pace: Pace::Free,
                });
            }
        }
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> SequenceSpec {
        SequenceSpec { colors: 4, length: 3, sequence: vec![2, 0, 3] }
    }

    fn play(spec: &SequenceSpec, steps: &[(&str, Value)]) -> SequenceState {
        let mut state = SequenceGame::initial_state(spec);
        for (kind, payload) in steps {
            state = SequenceGame::apply(spec, state, &Step { kind: *kind, payload, at_ms: 0 });
        }
        state
    }

    fn ready() -> (&'static str, Value) {
        ("round_ready", json!({}))
    }

    fn press(color: u8) -> (&'static str, Value) {
        ("press", json!({ "color": color }))
    }

    #[test]
    fn test_rounds_progress() {
        let spec = spec();
        let state = play(&spec, &[ready(), press(2), ready(), press(2), press(0)]);
        assert_eq!(state.completed, 2);
        assert_eq!(state.round, None);
        assert_eq!(SequenceGame::evaluate(&spec, &state).metrics.penalty_units, 1);
    }

    #[test]
    fn test_wrong_press_ends_game() {
        let spec = spec();
        let state = play(&spec, &[ready(), press(2), ready(), press(1), ready(), press(2)]);
        let eval = SequenceGame::evaluate(&spec, &state);
        assert_eq!(eval.detail.failed_round, Some(2));
        assert_eq!(eval.detail.rounds_completed, 1);
        assert_eq!(eval.failure, None);
    }

    #[test]
    fn test_failure_reasons() {
        let spec = spec();
        let state = play(&spec, &[ready(), press(1)]);
        assert_eq!(SequenceGame::evaluate(&spec, &state).failure, Some(FailureReason::IncorrectOrder));

        let state = play(&spec, &[press(2), ready()]);
        assert_eq!(SequenceGame::evaluate(&spec, &state).failure, Some(FailureReason::NoRoundsCompleted));
    }

    #[test]
    fn test_reveal_prefix() {
        let spec = spec();
        let state = play(&spec, &[ready(), press(2), ready()]);
        let payload = json!({});
        let step = Step { kind: "round_ready", payload: &payload, at_ms: 0 };
        assert_eq!(
            SequenceGame::reveal(&spec, &state, &step),
            Some(json!({"round": 2, "sequence": [2, 0]}))
        );
    }

    #[test]
    fn test_script_completes_all_rounds() {
        let spec = SequenceGame::generate(&mut DeterministicRng::new(11), &SequenceGame::default_config());
        let steps: Vec<(&str, Value)> = SequenceGame::script(&spec)
            .into_iter()
            .map(|a| (a.kind, a.payload))
            .collect();
        let eval = SequenceGame::evaluate(&spec, &play(&spec, &steps));
        assert_eq!(eval.detail.rounds_completed, 8);
        assert_eq!(eval.metrics.penalty_units, 0);
        assert_eq!(eval.detail.presses, 36);
    }
}
