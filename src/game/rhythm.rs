//! Rhythm
//!
//! Notes fall in lanes on a beat grid; the player taps a lane as each note
//! crosses the hit line. Timing is judged on the server clock relative to
//! `start`, so the judgement windows are kept secret.

use serde::{Serialize, Deserialize};
use serde_json::json;

use crate::config::GameConfig;
use crate::core::rng::DeterministicRng;
use super::autoplay::{Pace, ScriptedAction};
use super::event::Step;
use super::heuristics::TimingThresholds;
use super::result::{FailureReason, Metrics};
use super::scoring::{self, ScoringConfig};
use super::{Evaluation, GameModule, GameType};

/// Delay before the first note.
const LEAD_IN_MS: u64 = 2_000;

/// Tempo range in beats per minute.
const MIN_BPM: u32 = 90;
const MAX_BPM: u32 = 140;

/// One note on the chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Time after `start` at which the note crosses the hit line.
    pub at_ms: u64,
    /// Lane index.
    pub lane: u8,
}

/// Generated chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RhythmSpec {
    /// Lane count.
    pub lanes: u8,
    /// Tempo.
    pub bpm: u16,
    /// Notes in time order.
    pub notes: Vec<Note>,
    /// Share of notes that must be hit, in percent.
    pub min_hit_pct: u8,
    /// Largest offset that still counts as a hit.
    pub hit_window_ms: u64,
    /// Largest offset that counts as perfect.
    pub perfect_window_ms: u64,
}

/// Client projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RhythmView {
    /// Lane count.
    pub lanes: u8,
    /// Tempo.
    pub bpm: u16,
    /// Notes in time order.
    pub notes: Vec<Note>,
    /// Share of notes that must be hit, in percent.
    pub min_hit_pct: u8,
}

/// How a note was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Judgement {
    Perfect,
    Good,
}

/// Replay state.
#[derive(Debug, Clone, PartialEq)]
pub struct RhythmState {
    judged: Vec<Option<Judgement>>,
    stray: u32,
}

/// Outcome breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RhythmDetail {
    /// Hits inside the perfect window.
    pub perfect: u32,
    /// Other hits.
    pub good: u32,
    /// Notes never hit.
    pub missed: u32,
    /// Taps that matched no note.
    pub stray: u32,
    /// Hits as a share of notes, in percent.
    pub hit_pct: u32,
}

/// Rhythm game module.
pub struct RhythmGame;

impl RhythmGame {
    fn counts(state: &RhythmState) -> (u32, u32) {
        state.judged.iter().fold((0, 0), |(p, g), j| match j {
            Some(Judgement::Perfect) => (p + 1, g),
            Some(Judgement::Good) => (p, g + 1),
            None => (p, g),
        })
    }
}

impl GameModule for RhythmGame {
    const GAME_TYPE: GameType = GameType::Rhythm;
    const EVENT_KINDS: &'static [&'static str] = &["hit"];
    const SECRET_FIELDS: &'static [&'static str] = &["hit_window_ms", "perfect_window_ms"];

    type Spec = RhythmSpec;
    type Client = RhythmView;
    type State = RhythmState;
    type Detail = RhythmDetail;

    fn default_config() -> GameConfig {
        GameConfig {
            time_limit_ms: 60_000,
            grid_size: 4,
            item_count: 24,
            // Taps follow the beat, so cadence rules do not apply
            timing: TimingThresholds {
                min_mean_gap_ms: 150,
                min_gap_std_dev_ms: 0,
                min_perfect_completion_ms: 0,
                review_mean_gap_ms: 0,
                ..TimingThresholds::default()
            },
            scoring: ScoringConfig { penalty_per_unit: 20, ..ScoringConfig::default() },
        }
    }

    fn generate(rng: &mut DeterministicRng, config: &GameConfig) -> RhythmSpec {
        const HIT_WINDOW_MS: u64 = 180;

        let lanes = config.grid_size.clamp(2, 6);
        let count = config.item_count.clamp(4, 64);
        let bpm = (MIN_BPM + rng.next_int(MAX_BPM - MIN_BPM + 1)) as u16;
        let beat_ms = 60_000 / bpm as u64;
        let last_note_ms = config.clamped_time_limit_ms().saturating_sub(HIT_WINDOW_MS);

        let mut notes = Vec::with_capacity(count as usize);
        let mut at_ms = LEAD_IN_MS;
        for _ in 0..count {
            if at_ms > last_note_ms {
                break;
            }
            notes.push(Note { at_ms, lane: rng.next_int(lanes as u32) as u8 });
            at_ms += beat_ms * (1 + rng.next_int(2) as u64);
        }

        RhythmSpec {
            lanes,
            bpm,
            notes,
            min_hit_pct: 70,
            hit_window_ms: HIT_WINDOW_MS,
            perfect_window_ms: 60,
        }
    }

    fn project(spec: &RhythmSpec) -> RhythmView {
        RhythmView {
            lanes: spec.lanes,
            bpm: spec.bpm,
            notes: spec.notes.clone(),
            min_hit_pct: spec.min_hit_pct,
        }
    }

    fn initial_state(spec: &RhythmSpec) -> RhythmState {
        RhythmState {
            judged: vec![None; spec.notes.len()],
            stray: 0,
        }
    }

    fn apply(spec: &RhythmSpec, mut state: RhythmState, step: &Step<'_>) -> RhythmState {
        let Some(lane) = step.index("lane").filter(|&l| l < spec.lanes as usize) else {
            return state;
        };

        // Nearest unjudged note in the lane; earlier note wins a tie
        let target = spec
            .notes
            .iter()
            .enumerate()
            .filter(|&(i, note)| note.lane as usize == lane && state.judged[i].is_none())
            .map(|(i, note)| (i, note.at_ms.abs_diff(step.at_ms)))
            .filter(|&(_, offset)| offset <= spec.hit_window_ms)
            .min_by_key(|&(i, offset)| (offset, i));

        match target {
            Some((i, offset)) => {
                state.judged[i] = Some(if offset <= spec.perfect_window_ms {
                    Judgement::Perfect
                } else {
                    Judgement::Good
                });
            }
            None => state.stray += 1,
        }
        state
    }

    fn evaluate(spec: &RhythmSpec, state: &RhythmState) -> Evaluation<RhythmDetail> {
        let total = spec.notes.len() as u32;
        let (perfect, good) = Self::counts(state);
        let hits = perfect + good;
        let missed = total - hits;
        let hit_pct = if total == 0 { 100 } else { hits * 100 / total };

        Evaluation {
            metrics: Metrics {
                correct: hits,
                total,
                mistakes: missed + state.stray,
                penalty_units: state.stray,
            },
            detail: RhythmDetail { perfect, good, missed, stray: state.stray, hit_pct },
            failure: (hit_pct < spec.min_hit_pct as u32).then_some(FailureReason::LowAccuracy),
        }
    }

    /// Hit share of the quality, less stray taps; the chart length is fixed,
    /// so there is no speed factor.
    fn score(spec: &RhythmSpec, metrics: &Metrics, _elapsed_ms: u64, _time_limit_ms: u64, config: &ScoringConfig) -> u32 {
        let total = spec.notes.len() as u64;
        if total == 0 {
            return scoring::quality(metrics.penalty_units, config);
        }
        let accuracy = config.max_quality as u64 * metrics.correct.min(total as u32) as u64 / total;
        let penalty = config.penalty_per_unit as u64 * metrics.penalty_units as u64;
        accuracy.saturating_sub(penalty) as u32
    }

    fn script(spec: &RhythmSpec) -> Vec<ScriptedAction> {
        spec.notes
            .iter()
            .map(|note| ScriptedAction {
                kind: "hit",
                payload: json!({ "lane": note.lane }),
                pace: Pace::At(note.at_ms),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> RhythmSpec {
        RhythmSpec {
            lanes: 4,
            bpm: 120,
            notes: vec![
                Note { at_ms: 2_000, lane: 0 },
                Note { at_ms: 2_500, lane: 1 },
                Note { at_ms: 3_000, lane: 0 },
                Note { at_ms: 3_500, lane: 2 },
            ],
            min_hit_pct: 70,
            hit_window_ms: 180,
            perfect_window_ms: 60,
        }
    }

    fn play(spec: &RhythmSpec, taps: &[(u64, usize)]) -> RhythmState {
        let mut state = RhythmGame::initial_state(spec);
        for &(at_ms, lane) in taps {
            let payload = json!({ "lane": lane });
            state = RhythmGame::apply(spec, state, &Step { kind: "hit", payload: &payload, at_ms });
        }
        state
    }

    #[test]
    fn test_judgement_windows() {
        let spec = spec();
        let state = play(&spec, &[(2_050, 0), (2_650, 1), (3_300, 0), (3_500, 3)]);
        let eval = RhythmGame::evaluate(&spec, &state);
        assert_eq!(eval.detail, RhythmDetail { perfect: 1, good: 1, missed: 2, stray: 2, hit_pct: 50 });
        assert_eq!(eval.failure, Some(FailureReason::LowAccuracy));
    }

    #[test]
    fn test_note_judged_once() {
        let spec = spec();
        let state = play(&spec, &[(2_000, 0), (2_010, 0)]);
        assert_eq!(state.judged[0], Some(Judgement::Perfect));
        assert_eq!(state.stray, 1);
    }

    #[test]
    fn test_bad_lane_ignored() {
        let spec = spec();
        let state = play(&spec, &[(2_000, 9)]);
        assert_eq!(state.stray, 0);
        assert!(state.judged.iter().all(Option::is_none));
    }

    #[test]
    fn test_score_is_accuracy_based() {
        let spec = spec();
        let config = ScoringConfig { penalty_per_unit: 20, ..ScoringConfig::default() };
        let all = Metrics { correct: 4, total: 4, mistakes: 0, penalty_units: 0 };
        let three = Metrics { correct: 3, total: 4, mistakes: 1, penalty_units: 0 };
        let stray = Metrics { correct: 3, total: 4, mistakes: 2, penalty_units: 1 };

        assert_eq!(RhythmGame::score(&spec, &all, 3_500, 60_000, &config), 1_000);
        assert_eq!(RhythmGame::score(&spec, &three, 3_500, 60_000, &config), 750);
        assert_eq!(RhythmGame::score(&spec, &stray, 3_500, 60_000, &config), 730);
    }

    #[test]
    fn test_generate_fits_time_limit() {
        let mut config = RhythmGame::default_config();
        config.time_limit_ms = 5_000;
        config.item_count = 64;
        for seed in 0..20 {
            let spec = RhythmGame::generate(&mut DeterministicRng::new(seed), &config);
            assert!(!spec.notes.is_empty());
            assert!(spec.notes.iter().all(|n| n.at_ms + spec.hit_window_ms <= 5_000));
            assert!(spec.notes.windows(2).all(|w| w[0].at_ms < w[1].at_ms));
            assert!((90..=140).contains(&spec.bpm));
        }
    }
}
