//! Reaction Time
//!
//! Rounds of wait-for-the-signal. The client announces each round with
//! `round_ready`; the server reveals the signal delay and judges the tap on
//! its own clock. Taps that beat the signal, or follow it faster than a
//! human can react, are false starts.

use serde::{Serialize, Deserialize};
use serde_json::{json, Value};

use crate::config::GameConfig;
use crate::core::rng::DeterministicRng;
use super::autoplay::{Pace, ScriptedAction};
use super::event::Step;
use super::result::{FailureReason, Metrics};
use super::scoring::ScoringConfig;
use super::{Evaluation, GameModule, GameType};

/// Reactions faster than this are anticipation.
const FALSE_START_MS: u64 = 100;

/// A round with no tap this long after the signal is lost.
const ROUND_TIMEOUT_MS: u64 = 2_000;

/// Reaction time worth one penalty unit.
const MS_PER_PENALTY_UNIT: u64 = 100;

/// Penalty units per false start.
const FALSE_START_UNITS: u32 = 5;

/// Reaction time the reference script uses.
const SCRIPT_REACTION_MS: u64 = 320;

/// Generated rounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionTimeSpec {
    pub rounds: u16,
    /// Delay from `round_ready` to the signal, per round.
    pub delays: Vec<u64>,
}

/// Client projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionTimeView {
    pub rounds: u16,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Armed {
    round: usize,
    signal_at: u64,
}

/// How a round ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundOutcome {
    Reaction(u64),
    FalseStart,
    Missed,
}

/// Replay state.
#[derive(Debug, Clone, PartialEq)]
pub struct ReactionTimeState {
    next_round: usize,
    armed: Option<Armed>,
    outcomes: Vec<RoundOutcome>,
}

impl ReactionTimeState {
    fn reactions(&self) -> impl Iterator<Item = u64> + '_ {
        self.outcomes.iter().filter_map(|o| match o {
            RoundOutcome::Reaction(ms) => Some(*ms),
            _ => None,
        })
    }

    fn count(&self, outcome: RoundOutcome) -> u32 {
        self.outcomes.iter().filter(|&&o| o == outcome).count() as u32
    }
}

/// Outcome breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionTimeDetail {
    /// Rounds with a clean reaction.
    pub completed: u32,
    pub false_starts: u32,
    pub missed: u32,
    /// Fastest clean reaction.
    pub best_ms: Option<u64>,
    /// Mean clean reaction.
    pub mean_ms: Option<u64>,
    /// Rounds in the turn.
    pub rounds: u32,
}

/// Reaction time game module.
pub struct ReactionTimeGame;

impl GameModule for ReactionTimeGame {
    const GAME_TYPE: GameType = GameType::ReactionTime;
    const EVENT_KINDS: &'static [&'static str] = &["round_ready", "tap"];
    const TIMED_KINDS: &'static [&'static str] = &["tap"];
    const SECRET_FIELDS: &'static [&'static str] = &["delays"];

    type Spec = ReactionTimeSpec;
    type Client = ReactionTimeView;
    type State = ReactionTimeState;
    type Detail = ReactionTimeDetail;

    fn default_config() -> GameConfig {
        GameConfig {
            time_limit_ms: 60_000,
            grid_size: 1,
            item_count: 5,
            scoring: ScoringConfig { penalty_per_unit: 20, ..ScoringConfig::default() },
            ..GameConfig::default()
        }
    }

    fn generate(rng: &mut DeterministicRng, config: &GameConfig) -> ReactionTimeSpec {
        let rounds = config.item_count.clamp(1, 20);
        let delays = (0..rounds).map(|_| rng.next_int_range(1_000, 4_000) as u64).collect();
        ReactionTimeSpec { rounds, delays }
    }

    fn project(spec: &ReactionTimeSpec) -> ReactionTimeView {
        ReactionTimeView { rounds: spec.rounds }
    }

    fn initial_state(_spec: &ReactionTimeSpec) -> ReactionTimeState {
        ReactionTimeState { next_round: 0, armed: None, outcomes: Vec::new() }
    }

    fn apply(spec: &ReactionTimeSpec, mut state: ReactionTimeState, step: &Step<'_>) -> ReactionTimeState {
        match step.kind {
            "round_ready" => {
                if let Some(armed) = state.armed {
                    if step.at_ms <= armed.signal_at + ROUND_TIMEOUT_MS {
                        return state;
                    }
                    state.armed = None;
                    state.outcomes.push(RoundOutcome::Missed);
                }
                if let Some(&delay) = spec.delays.get(state.next_round) {
                    state.armed = Some(Armed { round: state.next_round, signal_at: step.at_ms + delay });
                    state.next_round += 1;
                }
            }
            "tap" => {
                let Some(armed) = state.armed.take() else {
                    return state;
                };
                let outcome = match step.at_ms.checked_sub(armed.signal_at) {
                    Some(ms) if ms > ROUND_TIMEOUT_MS => RoundOutcome::Missed,
                    Some(ms) if ms >= FALSE_START_MS => RoundOutcome::Reaction(ms),
                    _ => RoundOutcome::FalseStart,
                };
                state.outcomes.push(outcome);
            }
            _ => {}
        }
        state
    }

    fn evaluate(spec: &ReactionTimeSpec, state: &ReactionTimeState) -> Evaluation<ReactionTimeDetail> {
        let rounds = spec.delays.len() as u32;
        let completed = state.reactions().count() as u32;
        let false_starts = state.count(RoundOutcome::FalseStart);
        let missed = state.count(RoundOutcome::Missed);
        let total_ms: u64 = state.reactions().sum();

        // Slow reactions cost in proportion; rounds never played cost like a false start
        let unplayed = rounds.saturating_sub(state.outcomes.len() as u32);
        let penalty_units = (total_ms / MS_PER_PENALTY_UNIT) as u32
            + (false_starts + missed + unplayed) * FALSE_START_UNITS;

        Evaluation {
            metrics: Metrics {
                correct: completed,
                total: rounds,
                mistakes: false_starts + missed,
                penalty_units,
            },
            detail: ReactionTimeDetail {
                completed,
                false_starts,
                missed,
                best_ms: state.reactions().min(),
                mean_ms: (completed > 0).then(|| total_ms / completed as u64),
                rounds,
            },
            failure: (completed == 0).then_some(FailureReason::NoRoundsCompleted),
        }
    }

    fn reveal(_spec: &ReactionTimeSpec, state: &ReactionTimeState, step: &Step<'_>) -> Option<Value> {
        match step.kind {
            "round_ready" => {
                let armed = state.armed?;
                Some(json!({
                    "round": armed.round,
                    "signal_in_ms": armed.signal_at.saturating_sub(step.at_ms),
                }))
            }
            "tap" => {
                let outcome = state.outcomes.last()?;
                Some(json!({ "round": state.outcomes.len() - 1, "outcome": outcome }))
            }
            _ => None,
        }
    }

    fn script(spec: &ReactionTimeSpec) -> Vec<ScriptedAction> {
        let mut actions = Vec::with_capacity(spec.delays.len() * 2);
        for delay in &spec.delays {
            actions.push(ScriptedAction {
                kind: "round_ready",
                payload: json!({}),
                pace: Pace::Free,
            });
            actions.push(ScriptedAction {
                kind: "tap",
                payload: json!({}),
                pace: Pace::After(delay + SCRIPT_REACTION_MS),
            });
        }
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> ReactionTimeSpec {
        ReactionTimeSpec { rounds: 3, delays: vec![1_500, 2_000, 1_200] }
    }

    fn play(spec: &ReactionTimeSpec, steps: &[(&'static str, u64)]) -> ReactionTimeState {
        let payload = json!({});
        let mut state = ReactionTimeGame::initial_state(spec);
        for (kind, at_ms) in steps {
            state = ReactionTimeGame::apply(spec, state, &Step { kind: *kind, payload: &payload, at_ms: *at_ms });
        }
        state
    }

    #[test]
    fn test_reaction_false_start_and_late_tap() {
        let spec = spec();
        let state = play(&spec, &[
            ("round_ready", 0),
            ("tap", 1_750),  // 250 ms
            ("round_ready", 3_000),
            ("tap", 5_050),  // 50 ms after the signal
            ("round_ready", 6_000),
            ("tap", 9_500),  // long after the signal
        ]);
        let eval = ReactionTimeGame::evaluate(&spec, &state);
        assert_eq!(eval.detail.completed, 1);
        assert_eq!(eval.detail.false_starts, 1);
        assert_eq!(eval.detail.missed, 1);
        assert_eq!(eval.detail.best_ms, Some(250));
        assert_eq!(eval.metrics.penalty_units, 2 + 2 * FALSE_START_UNITS);
        assert_eq!(eval.failure, None);
    }

    #[test]
    fn test_faster_reactions_cost_less() {
        let spec = spec();
        let quick = play(&spec, &[("round_ready", 0), ("tap", 1_700)]);
        let slow = play(&spec, &[("round_ready", 0), ("tap", 2_400)]);
        let units = |s: &ReactionTimeState| ReactionTimeGame::evaluate(&spec, s).metrics.penalty_units;
        assert!(units(&quick) < units(&slow));
    }

    #[test]
    fn test_tap_before_signal_is_false_start() {
        let spec = spec();
        let state = play(&spec, &[("round_ready", 0), ("tap", 900)]);
        assert_eq!(state.outcomes, vec![RoundOutcome::FalseStart]);
        assert_eq!(
            ReactionTimeGame::evaluate(&spec, &state).failure,
            Some(FailureReason::NoRoundsCompleted)
        );
    }

    #[test]
    fn test_round_ready_while_waiting_is_noop() {
        let spec = spec();
        let state = play(&spec, &[("round_ready", 0), ("round_ready", 500)]);
        assert_eq!(state.next_round, 1);
        assert_eq!(state.armed.map(|a| a.signal_at), Some(1_500));

        let state = play(&spec, &[("round_ready", 0), ("round_ready", 4_000)]);
        assert_eq!(state.outcomes, vec![RoundOutcome::Missed]);
        assert_eq!(state.next_round, 2);
    }

    #[test]
    fn test_reveal_signal_delay() {
        let spec = spec();
        let state = play(&spec, &[("round_ready", 1_000)]);
        let payload = json!({});
        let step = Step { kind: "round_ready", payload: &payload, at_ms: 1_000 };
        assert_eq!(
            ReactionTimeGame::reveal(&spec, &state, &step),
            Some(json!({"round": 0, "signal_in_ms": 1_500}))
        );
    }

    #[test]
    fn test_generated_delays_in_range() {
        let spec = ReactionTimeGame::generate(&mut DeterministicRng::new(4), &ReactionTimeGame::default_config());
        assert_eq!(spec.delays.len(), 5);
        assert!(spec.delays.iter().all(|d| (1_000..=4_000).contains(d)));
    }
}
