//! Reference Autoplay
//!
//! Perfect action scripts built from the full spec (answer keys included).
//! Used by the demo binary, the replay benchmark, and tests; never exposed
//! to clients.

use serde_json::{json, Value};

use super::event::{kinds, Event};
use super::{GameModule, TurnSpec};

/// When a scripted action happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pace {
    /// Whenever the player is ready: one think-time gap after the previous action.
    Free,
    /// Exactly this long after the previous action.
    After(u64),
    /// At this offset from `start`.
    At(u64),
}

/// One scripted gameplay event.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptedAction {
    /// Event kind.
    pub kind: &'static str,
    /// Event payload.
    pub payload: Value,
    /// Timing.
    pub pace: Pace,
}

/// Perfect action script for a spec.
pub fn script(spec: &TurnSpec) -> Vec<ScriptedAction> {
    super::with_module!(&spec.puzzle, |puzzle, M| M::script(puzzle))
}

/// Play a script into a complete event list: `start`, the actions, `finish`.
///
/// `think_ms` supplies the gap before each [`Pace::Free`] action and before
/// `finish`. Timestamps never decrease.
pub fn play(spec: &TurnSpec, start_ts: i64, mut think_ms: impl FnMut() -> u64) -> Vec<Event> {
    let actions = script(spec);
    let mut events = Vec::with_capacity(actions.len() + 2);
    events.push(Event::new(kinds::START, json!({}), start_ts));

    let mut now = start_ts;
    for action in actions {
        now = match action.pace {
            Pace::Free => now + think_ms() as i64,
            Pace::After(ms) => now + ms as i64,
            Pace::At(offset) => (start_ts + offset as i64).max(now),
        };
        events.push(Event::new(action.kind, action.payload, now));
    }

    now += think_ms() as i64;
    events.push(Event::new(kinds::FINISH, json!({}), now));
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::core::rng::Seed;
    use crate::game::{generate, validate, GameType};

    fn seed(n: u64) -> Seed {
        let mut bytes = [0u8; 32];
        bytes[..8].copy_from_slice(&n.to_le_bytes());
        Seed(bytes)
    }

    #[test]
    fn test_every_script_wins() {
        let mut gaps = [450u64, 750, 520, 680, 600, 390, 810].into_iter().cycle();
        for game in GameType::ALL {
            for n in 0..5 {
                let spec = generate(game, &seed(n), &GameConfig::for_game(game));
                let events = play(&spec, 1_700_000_000_000, || gaps.next().unwrap_or(600));
                let result = validate(&spec, &events);
                assert!(result.valid, "{game} seed {n}: {result:?}");
                assert_eq!(result.metrics.mistakes, 0, "{game}");
            }
        }
    }

    #[test]
    fn test_play_timestamps_monotonic() {
        let spec = generate(GameType::Rhythm, &seed(3), &GameConfig::for_game(GameType::Rhythm));
        let events = play(&spec, 0, || 500);
        assert_eq!(events.first().map(|e| e.kind.as_str()), Some(kinds::START));
        assert_eq!(events.last().map(|e| e.kind.as_str()), Some(kinds::FINISH));
        assert!(events.windows(2).all(|w| w[0].server_ts_ms <= w[1].server_ts_ms));
    }
}
