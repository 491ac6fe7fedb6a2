//! Replay Harness
//!
//! The single validation path shared by every game:
//!
//! 1. Locate the first `start` (none ⇒ `no_start_event`)
//! 2. Fold gameplay events after it through the game's reducer, stopping at
//!    the first terminal event. Unknown kinds and extra `start`s are skipped.
//!    A step counts only if it changed the state before the game settled.
//! 3. Evaluate the win condition (failure ⇒ incomplete-class reason)
//! 4. Elapsed = last counted step − start; over limit + grace ⇒ `timeout`
//! 5. Timing heuristics (rejection ⇒ `flag = true`)
//! 6. Score

use serde_json::Value;
use tracing::debug;

use crate::TIMEOUT_GRACE_MS;
use super::event::{kinds, Event, Step};
use super::heuristics::{assess_timing, TimingContext, TimingVerdict};
use super::result::{FailureReason, TurnResult};
use super::{GameModule, TurnSpec};

/// Milliseconds from `start_ts` to `ts`, floored at zero.
#[inline]
fn offset_ms(start_ts: i64, ts: i64) -> u64 {
    ts.saturating_sub(start_ts).max(0) as u64
}

/// Start timestamp and the gameplay steps that follow it.
fn gameplay_steps<'a, M: GameModule>(events: &'a [Event]) -> Option<(i64, Vec<(&'a Event, Step<'a>)>)> {
    let start = events.iter().position(|e| e.kind == kinds::START)?;
    let start_ts = events[start].server_ts_ms;

    let steps = events[start + 1..]
        .iter()
        .take_while(|e| !kinds::is_terminal(&e.kind))
        .filter(|e| M::EVENT_KINDS.contains(&e.kind.as_str()))
        .map(|e| {
            let step = Step {
                kind: e.kind.as_str(),
                payload: &e.payload,
                at_ms: offset_ms(start_ts, e.server_ts_ms),
            };
            (e, step)
        })
        .collect();

    Some((start_ts, steps))
}

/// Fold steps until the game settles, keeping the ones that changed state.
fn fold_counted<'s, 'a, M: GameModule>(
    spec: &M::Spec,
    steps: &'s [(&'a Event, Step<'a>)],
) -> (M::State, Vec<&'s (&'a Event, Step<'a>)>) {
    let mut state = M::initial_state(spec);
    let mut counted = Vec::with_capacity(steps.len());
    for entry in steps {
        if M::is_settled(spec, &state) {
            break;
        }
        let next = M::apply(spec, state.clone(), &entry.1);
        if next != state {
            state = next;
            counted.push(entry);
        }
    }
    (state, counted)
}

/// Validate a recorded turn.
///
/// `spec` is the game-specific part of `turn`.
pub fn run<M: GameModule>(turn: &TurnSpec, spec: &M::Spec, events: &[Event]) -> TurnResult {
    let Some((start_ts, steps)) = gameplay_steps::<M>(events) else {
        debug!(game = %M::GAME_TYPE, events = events.len(), "no start event");
        return TurnResult::rejected(FailureReason::NoStartEvent);
    };

    let (state, counted) = fold_counted::<M>(spec, &steps);
    let mut timed = vec![start_ts];
    let mut elapsed_ms = 0;
    for (event, step) in &counted {
        if M::TIMED_KINDS.contains(&step.kind) {
            timed.push(event.server_ts_ms);
        }
        elapsed_ms = elapsed_ms.max(step.at_ms);
    }
    if counted.len() < steps.len() {
        debug!(game = %M::GAME_TYPE, ignored = steps.len() - counted.len(), "steps without effect");
    }

    let evaluation = M::evaluate(spec, &state);
    let mut result = TurnResult {
        valid: false,
        reason: None,
        score: None,
        elapsed_ms: Some(elapsed_ms),
        metrics: evaluation.metrics,
        detail: Some(evaluation.detail.into()),
        flag: false,
        signals: Vec::new(),
    };

    if let Some(reason) = evaluation.failure {
        debug!(game = %M::GAME_TYPE, ?reason, steps = steps.len(), "turn not completed");
        result.reason = Some(reason);
        return result;
    }

    if elapsed_ms > turn.time_limit_ms.saturating_add(TIMEOUT_GRACE_MS) {
        debug!(game = %M::GAME_TYPE, elapsed_ms, limit_ms = turn.time_limit_ms, "turn over time");
        result.reason = Some(FailureReason::Timeout);
        return result;
    }

    let assessment = assess_timing(
        &timed,
        TimingContext { mistakes: result.metrics.mistakes, elapsed_ms },
        &turn.rules.timing,
    );
    result.signals = assessment.signals;

    if let Some(verdict) = assessment.verdict {
        debug!(game = %M::GAME_TYPE, ?verdict, signals = result.signals.len(), "timing rejected");
        result.reason = Some(match verdict {
            TimingVerdict::ImpossibleSpeed => FailureReason::ImpossibleSpeed,
            TimingVerdict::SuspiciousTiming => FailureReason::SuspiciousTiming,
        });
        result.flag = true;
        return result;
    }

    let score = M::score(spec, &result.metrics, elapsed_ms, turn.time_limit_ms, &turn.rules.scoring);
    debug!(game = %M::GAME_TYPE, score, elapsed_ms, review = assessment.review, "turn accepted");

    result.valid = true;
    result.score = Some(score);
    result.flag = assessment.review;
    result
}

/// Information earned by the newest event, if it is a gameplay event.
pub fn reveal<M: GameModule>(spec: &M::Spec, events: &[Event]) -> Option<Value> {
    let newest = events.last()?;
    let (_, steps) = gameplay_steps::<M>(events)?;
    let (state, counted) = fold_counted::<M>(spec, &steps);
    let (last_event, last_step) = counted.last()?;
    if !std::ptr::eq(*last_event, newest) {
        return None;
    }
    M::reveal(spec, &state, last_step)
}

// =============================================================================
// TESTS
// =============================================================================
