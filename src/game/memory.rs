//! Memory Match
//!
//! Face-down cards in pairs. Flip two cards; matching faces stay up.
//! Faces are revealed one flip at a time through the event ack.

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

/// Generated memory board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySpec {
    /// Number of pairs.
    pub pairs: u16,
    /// Cards per row on screen.
    pub columns: u8,
    /// Face of each card, row-major. Every face appears exactly twice.
    pub layout: Vec<u16>,
}

/// Client projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryView {
    /// Number of pairs.
    pub pairs: u16,
    /// Cards per row.
    pub columns: u8,
    /// Card count.
    pub cards: usize,
}

/// Replay state.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryState {
    matched: Vec<bool>,
    face_up: Option<usize>,
    attempts: u32,
    misses: u32,
}

impl MemoryState {
    fn attempt(&mut self, layout: &[u16], first: usize, second: usize) {
        self.attempts += 1;
        if layout[first] == layout[second] {
            self.matched[first] = true;
            self.matched[second] = true;
        } else {
            self.misses += 1;
        }
    }

    fn open(&self, card: usize) -> bool {
        card < self.matched.len() && !self.matched[card]
    }
}

/// Outcome breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryDetail {
    /// Pairs found.
    pub pairs_matched: u32,
    /// Pairs on the board.
    pub pairs: u32,
    /// Pair attempts.
    pub attempts: u32,
    /// Failed attempts.
    pub misses: u32,
}

/// Memory match game module.
pub struct MemoryGame;

impl GameModule for MemoryGame {
    const GAME_TYPE: GameType = GameType::MemoryMatch;
    const EVENT_KINDS: &'static [&'static str] = &["flip", "match_attempt"];
    const SECRET_FIELDS: &'static [&'static str] = &["layout"];
    const ENDS_ON_SOLVE: bool = true;

    type Spec = MemorySpec;
    type Client = MemoryView;
    type State = MemoryState;
    type Detail = MemoryDetail;

    fn default_config() -> GameConfig {
        GameConfig {
            time_limit_ms: 90_000,
            grid_size: 4,
            item_count: 8,
            timing: TimingThresholds {
                min_perfect_completion_ms: 4_000,
                ..TimingThresholds::default()
            },
            scoring: ScoringConfig { penalty_per_unit: 25, ..ScoringConfig::default() },
        }
    }

    fn generate(rng: &mut DeterministicRng, config: &GameConfig) -> MemorySpec {
        let pairs = config.item_count.clamp(2, 18);
        let mut layout: Vec<u16> = (0..pairs).flat_map(|face| [face, face]).collect();
        rng.shuffle(&mut layout);

        let cards = layout.len();
        let columns = (1..=cards).find(|c| c * c >= cards).unwrap_or(cards) as u8;

        MemorySpec { pairs, columns, layout }
    }

    fn project(spec: &MemorySpec) -> MemoryView {
        MemoryView {
            pairs: spec.pairs,
            columns: spec.columns,
            cards: spec.layout.len(),
        }
    }

    fn initial_state(spec: &MemorySpec) -> MemoryState {
        MemoryState {
            matched: vec![false; spec.layout.len()],
            face_up: None,
            attempts: 0,
            misses: 0,
        }
    }

    fn apply(spec: &MemorySpec, mut state: MemoryState, step: &Step<'_>) -> MemoryState {
        match step.kind {
            "flip" => {
                let Some(card) = step.index("card").filter(|&c| state.open(c)) else {
                    return state;
                };
                match state.face_up {
                    None => state.face_up = Some(card),
                    // Same card again
                    Some(first) if first == card => {}
                    Some(first) => {
                        state.face_up = None;
                        state.attempt(&spec.layout, first, card);
                    }
                }
            }
            "match_attempt" => {
                let (Some(first), Some(second)) = (step.index("first"), step.index("second")) else {
                    return state;
                };
                if first != second && state.open(first) && state.open(second) {
                    state.face_up = None;
                    state.attempt(&spec.layout, first, second);
                }
            }
            _ => {}
        }
        state
    }

    fn evaluate(spec: &MemorySpec, state: &MemoryState) -> Evaluation<MemoryDetail> {
        let pairs = spec.pairs as u32;
        let pairs_matched = (state.matched.iter().filter(|&&m| m).count() / 2) as u32;

        Evaluation {
            metrics: Metrics {
                correct: pairs_matched,
                total: pairs,
                mistakes: state.misses,
                penalty_units: state.misses,
            },
            detail: MemoryDetail {
                pairs_matched,
                pairs,
                attempts: state.attempts,
                misses: state.misses,
            },
            failure: (pairs_matched < pairs).then_some(FailureReason::Incomplete),
        }
    }

    fn reveal(spec: &MemorySpec, _state: &MemoryState, step: &Step<'_>) -> Option<Value> {
        let face = |card: usize| spec.layout.get(card).map(|f| json!({ "card": card, "face": f }));
        match step.kind {
            "flip" => face(step.index("card")?),
            "match_attempt" => {
                let first = face(step.index("first")?)?;
                let second = face(step.index("second")?)?;
                Some(json!({ "cards": [first, second] }))
            }
            _ => None,
        }
    }

    fn script(spec: &MemorySpec) -> Vec<ScriptedAction> {
        let mut actions = Vec::with_capacity(spec.layout.len());
        for face in 0..spec.pairs {
            for (card, _) in spec.layout.iter().enumerate().filter(|&(_, &f)| f == face) {
                actions.push(ScriptedAction {
                    kind: "flip",
                    payload: json!({ "card": card }),
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

    fn spec() -> MemorySpec {
        MemorySpec { pairs: 4, columns: 4, layout: vec![0, 1, 2, 3, 0, 1, 2, 3] }
    }

    fn apply_all(spec: &MemorySpec, steps: &[(&str, Value)]) -> MemoryState {
        let mut state = MemoryGame::initial_state(spec);
        for (kind, payload) in steps {
            state = MemoryGame::apply(spec, state, &Step { kind: *kind, payload, at_ms: 0 });
        }
        state
    }

    #[test]
    fn test_flip_pairs() {
        let spec = spec();
        let state = apply_all(&spec, &[
            ("flip", json!({"card": 0})),
            ("flip", json!({"card": 1})), // miss
            ("flip", json!({"card": 0})),
            ("flip", json!({"card": 4})), // match
        ]);
        assert_eq!(state.attempts, 2);
        assert_eq!(state.misses, 1);
        assert!(state.matched[0] && state.matched[4]);
    }

    #[test]
    fn test_repeat_flips_are_noops() {
        let spec = spec();
        let state = apply_all(&spec, &[
            ("flip", json!({"card": 0})),
            ("flip", json!({"card": 0})),
            ("flip", json!({"card": 4})),
            // Already matched
            ("flip", json!({"card": 0})),
            ("match_attempt", json!({"first": 0, "second": 4})),
            ("flip", json!({"card": 99})),
        ]);
        assert_eq!(state.attempts, 1);
        assert_eq!(state.misses, 0);
        assert_eq!(state.face_up, None);
    }

    #[test]
    fn test_match_attempt() {
        let spec = spec();
        let state = apply_all(&spec, &[
            ("match_attempt", json!({"first": 1, "second": 5})),
            ("match_attempt", json!({"first": 2, "second": 3})),
            ("match_attempt", json!({"first": 2, "second": 2})),
        ]);
        let eval = MemoryGame::evaluate(&spec, &state);
        assert_eq!(eval.detail, MemoryDetail { pairs_matched: 1, pairs: 4, attempts: 2, misses: 1 });
        assert_eq!(eval.failure, Some(FailureReason::Incomplete));
    }

    #[test]
    fn test_reveal_faces() {
        let spec = spec();
        let state = MemoryGame::initial_state(&spec);
        let payload = json!({"card": 6});
        let step = Step { kind: "flip", payload: &payload, at_ms: 0 };
        assert_eq!(MemoryGame::reveal(&spec, &state, &step), Some(json!({"card": 6, "face": 2})));

        let payload = json!({"card": 8});
        let step = Step { kind: "flip", payload: &payload, at_ms: 0 };
        assert_eq!(MemoryGame::reveal(&spec, &state, &step), None);
    }

    #[test]
    fn test_generate_layout_is_pairs() {
        let config = MemoryGame::default_config();
        for seed in 0..50 {
            let spec = MemoryGame::generate(&mut DeterministicRng::new(seed), &config);
            assert_eq!(spec.layout.len(), 16);
            assert_eq!(spec.columns, 4);
            for face in 0..spec.pairs {
                assert_eq!(spec.layout.iter().filter(|&&f| f == face).count(), 2);
            }
        }
    }

    #[test]
    fn test_script_solves() {
        let spec = MemoryGame::generate(&mut DeterministicRng::new(9), &MemoryGame::default_config());
        let script = MemoryGame::script(&spec);
        let steps: Vec<(&str, Value)> = script.iter().map(|a| (a.kind, a.payload.clone())).collect();
        let eval = MemoryGame::evaluate(&spec, &apply_all(&spec, &steps));
        assert_eq!(eval.failure, None);
        assert_eq!(eval.metrics.mistakes, 0);
    }
}
