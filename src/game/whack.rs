//! Whack-a-Mole
//!
//! Rounds of a single mole popping out of one hole. The client announces
//! each round with `round_ready`; the server then reveals where the mole
//! will appear and after what delay. Whacks are judged on the server clock.

use serde::{Serialize, Deserialize};
use serde_json::{json, Value};

use crate::config::GameConfig;
use crate::core::rng::DeterministicRng;
use super::autoplay::{Pace, ScriptedAction};
use super::event::Step;
use super::result::{FailureReason, Metrics};
use super::scoring::ScoringConfig;
use super::{Evaluation, GameModule, GameType};

/// Reaction time the reference script uses.
const SCRIPT_REACTION_MS: u64 = 350;

/// Generated rounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhackSpec {
    /// Holes per side.
    pub grid_size: u8,
    /// Rounds in the turn.
    pub rounds: u16,
    /// How long a mole stays up.
    pub visible_ms: u64,
    /// Hole of each round's mole.
    pub targets: Vec<usize>,
    /// Delay from `round_ready` to the mole appearing, per round.
    pub delays: Vec<u64>,
}

/// Client projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhackView {
    /// Holes per side.
    pub grid_size: u8,
    /// Rounds in the turn.
    pub rounds: u16,
    /// How long a mole stays up.
    pub visible_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Armed {
    round: usize,
    appears_at: u64,
}

/// Replay state.
#[derive(Debug, Clone, PartialEq)]
pub struct WhackState {
    next_round: usize,
    armed: Option<Armed>,
    hits: u32,
    misses: u32,
    early: u32,
    last: Option<(usize, bool)>,
}

impl WhackState {
    fn resolve(&mut self, round: usize, hit: bool) {
        self.armed = None;
        self.last = Some((round, hit));
        if hit {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
    }
}

/// Outcome breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhackDetail {
    /// Moles hit.
    pub hits: u32,
    /// Rounds missed (wrong hole, too early, too late).
    pub misses: u32,
    /// Whacks before the mole appeared.
    pub early: u32,
    /// Rounds started.
    pub rounds_played: u32,
    /// Rounds in the turn.
    pub rounds: u32,
}

/// Whack-a-mole game module.
pub struct WhackGame;

impl GameModule for WhackGame {
    const GAME_TYPE: GameType = GameType::WhackAMole;
    const EVENT_KINDS: &'static [&'static str] = &["round_ready", "whack"];
    // `round_ready` is sent by the client UI, not the player
    const TIMED_KINDS: &'static [&'static str] = &["whack"];
    const SECRET_FIELDS: &'static [&'static str] = &["targets", "delays"];

    type Spec = WhackSpec;
    type Client = WhackView;
    type State = WhackState;
    type Detail = WhackDetail;

    fn default_config() -> GameConfig {
        GameConfig {
            time_limit_ms: 60_000,
            grid_size: 3,
            item_count: 10,
            scoring: ScoringConfig { penalty_per_unit: 80, ..ScoringConfig::default() },
            ..GameConfig::default()
        }
    }

    fn generate(rng: &mut DeterministicRng, config: &GameConfig) -> WhackSpec {
        let grid_size = config.grid_size.clamp(2, 5);
        let holes = grid_size as u32 * grid_size as u32;
        let rounds = config.item_count.clamp(1, 50);

        let mut targets = Vec::with_capacity(rounds as usize);
        let mut delays = Vec::with_capacity(rounds as usize);
        for _ in 0..rounds {
            targets.push(rng.next_int(holes) as usize);
            delays.push(rng.next_int_range(400, 1_500) as u64);
        }

        WhackSpec { grid_size, rounds, visible_ms: 1_200, targets, delays }
    }

    fn project(spec: &WhackSpec) -> WhackView {
        WhackView {
            grid_size: spec.grid_size,
            rounds: spec.rounds,
            visible_ms: spec.visible_ms,
        }
    }

    fn initial_state(_spec: &WhackSpec) -> WhackState {
        WhackState {
            next_round: 0,
            armed: None,
            hits: 0,
            misses: 0,
            early: 0,
            last: None,
        }
    }

    fn apply(spec: &WhackSpec, mut state: WhackState, step: &Step<'_>) -> WhackState {
        match step.kind {
            "round_ready" => {
                if let Some(armed) = state.armed {
                    if step.at_ms <= armed.appears_at + spec.visible_ms {
                        // Current mole still up
                        return state;
                    }
                    state.resolve(armed.round, false);
                }
                if let Some(&delay) = spec.delays.get(state.next_round) {
                    state.armed = Some(Armed {
                        round: state.next_round,
                        appears_at: step.at_ms + delay,
                    });
                    state.next_round += 1;
                }
            }
            "whack" => {
                let (Some(cell), Some(armed)) = (step.index("cell"), state.armed) else {
                    return state;
                };
                if step.at_ms < armed.appears_at {
                    state.early += 1;
                    state.resolve(armed.round, false);
                } else {
                    let in_time = step.at_ms <= armed.appears_at + spec.visible_ms;
                    let on_target = spec.targets.get(armed.round) == Some(&cell);
                    state.resolve(armed.round, in_time && on_target);
                }
            }
            _ => {}
        }
        state
    }

    fn evaluate(spec: &WhackSpec, state: &WhackState) -> Evaluation<WhackDetail> {
        let rounds = spec.targets.len().min(spec.delays.len()) as u32;
        let hits = state.hits;

        Evaluation {
            metrics: Metrics {
                correct: hits,
                total: rounds,
                mistakes: state.misses,
                penalty_units: rounds.saturating_sub(hits),
            },
            detail: WhackDetail {
                hits,
                misses: state.misses,
                early: state.early,
                rounds_played: state.next_round as u32,
                rounds,
            },
            failure: (hits == 0).then_some(FailureReason::NoRoundsCompleted),
        }
    }

    fn reveal(spec: &WhackSpec, state: &WhackState, step: &Step<'_>) -> Option<Value> {
        match step.kind {
            "round_ready" => {
                let armed = state.armed?;
                Some(json!({
                    "round": armed.round,
                    "cell": spec.targets.get(armed.round)?,
                    "appears_in_ms": armed.appears_at.saturating_sub(step.at_ms),
                }))
            }
            "whack" => {
                let (round, hit) = state.last?;
                Some(json!({ "round": round, "hit": hit }))
            }
            _ => None,
        }
    }

    fn script(spec: &WhackSpec) -> Vec<ScriptedAction> {
        let mut actions = Vec::with_capacity(spec.targets.len() * 2);
        for (cell, delay) in spec.targets.iter().zip(&spec.delays) {
            actions.push(ScriptedAction {
                kind: "round_ready",
                payload: json!({}),
                pace: Pace::Free,
            });
            actions.push(ScriptedAction {
                kind: "whack",
                payload: json!({ "cell": cell }),
                pace: Pace::After(delay + SCRIPT_REACTION_MS),
            });
        }
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> WhackSpec {
        WhackSpec {
            grid_size: 3,
            rounds: 3,
            visible_ms: 1_000,
            targets: vec![4, 0, 8],
            delays: vec![500, 800, 600],
        }
    }

    fn play(spec: &WhackSpec, steps: &[(&str, u64, Value)]) -> WhackState {
        let mut state = WhackGame::initial_state(spec);
        for (kind, at_ms, payload) in steps {
            state = WhackGame::apply(spec, state, &Step { kind: *kind, payload, at_ms: *at_ms });
        }
        state
    }

    #[test]
    fn test_hit_miss_and_early() {
        let spec = spec();
        let state = play(&spec, &[
            ("round_ready", 1_000, json!({})),
            ("whack", 1_800, json!({"cell": 4})), // hit
            ("round_ready", 2_000, json!({})),
            ("whack", 2_100, json!({"cell": 0})), // early
            ("round_ready", 3_000, json!({})),
            ("whack", 3_700, json!({"cell": 7})), // wrong hole
        ]);
        let eval = WhackGame::evaluate(&spec, &state);
        assert_eq!(eval.detail, WhackDetail { hits: 1, misses: 2, early: 1, rounds_played: 3, rounds: 3 });
        assert_eq!(eval.metrics.penalty_units, 2);
        assert_eq!(eval.failure, None);
    }

    #[test]
    fn test_late_whack_misses() {
        let spec = spec();
        let state = play(&spec, &[
            ("round_ready", 0, json!({})),
            ("whack", 1_501, json!({"cell": 4})),
        ]);
        assert_eq!(state.hits, 0);
        assert_eq!(WhackGame::evaluate(&spec, &state).failure, Some(FailureReason::NoRoundsCompleted));
    }

    #[test]
    fn test_round_ready_while_mole_up_is_noop() {
        let spec = spec();
        let state = play(&spec, &[
            ("round_ready", 0, json!({})),
            ("round_ready", 200, json!({})),
        ]);
        assert_eq!(state.next_round, 1);
        assert_eq!(state.armed.map(|a| a.appears_at), Some(500));

        // After the mole hides the round expires as a miss
        let state = play(&spec, &[
            ("round_ready", 0, json!({})),
            ("round_ready", 1_600, json!({})),
        ]);
        assert_eq!(state.next_round, 2);
        assert_eq!(state.misses, 1);
    }

    #[test]
    fn test_stray_whack_ignored() {
        let spec = spec();
        let state = play(&spec, &[("whack", 100, json!({"cell": 4}))]);
        assert_eq!(state.hits + state.misses, 0);
    }

    #[test]
    fn test_reveal_after_round_ready() {
        let spec = spec();
        let state = play(&spec, &[("round_ready", 1_000, json!({}))]);
        let payload = json!({});
        let step = Step { kind: "round_ready", payload: &payload, at_ms: 1_000 };
        assert_eq!(
            WhackGame::reveal(&spec, &state, &step),
            Some(json!({"round": 0, "cell": 4, "appears_in_ms": 500}))
        );
    }

    #[test]
    fn test_generated_delays_in_range() {
        let spec = WhackGame::generate(&mut DeterministicRng::new(2), &WhackGame::default_config());
        assert_eq!(spec.targets.len(), 10);
        assert!(spec.delays.iter().all(|d| (400..=1_500).contains(d)));
        assert!(spec.targets.iter().all(|&t| t < 9));
    }
}
