//! Anti-Automation Heuristics
//!
//! Statistical checks over the server-stamped inter-event gaps of a turn.
//!
//! ## Detection Methods
//!
//! - **Gap floor**: two inputs closer together than any human can produce
//! - **Fast perfect completion**: a flawless turn finished implausibly quickly
//! - **Fast mean**: a flawless turn with a very short average gap
//! - **Uniform cadence**: short gaps with almost no variance (scripted clicking)
//!
//! Every threshold is a heuristic and is configurable per game. Passing all
//! checks means "not obviously automated", never "human verified".

use serde::{Serialize, Deserialize};

/// Thresholds for timing analysis.
///
/// A threshold of zero disables its rule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingThresholds {
    /// Any gap below this is impossible.
    pub gap_floor_ms: u64,
    /// Zero-mistake turns with a lower mean gap are suspicious.
    pub min_mean_gap_ms: u64,
    /// Gap standard deviation below this is suspicious...
    pub min_gap_std_dev_ms: u64,
    /// ...when the mean gap is also below this.
    pub low_variance_mean_ceiling_ms: u64,
    /// Gaps required before the variance rule applies.
    pub min_samples: u32,
    /// Zero-mistake turns faster than this are impossible.
    pub min_perfect_completion_ms: u64,
    /// Zero-mistake turns with a lower mean gap are flagged for review.
    pub review_mean_gap_ms: u64,
}

impl Default for TimingThresholds {
    fn default() -> Self {
        Self {
            gap_floor_ms: 50,
            min_mean_gap_ms: 200,
            min_gap_std_dev_ms: 25,
            low_variance_mean_ceiling_ms: 400,
            min_samples: 4,
            min_perfect_completion_ms: 3_000,
            review_mean_gap_ms: 350,
        }
    }
}

/// Facts about the turn the heuristics need besides timestamps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimingContext {
    /// Mistakes made during the turn.
    pub mistakes: u32,
    /// Elapsed time from `start` to the last gameplay event.
    pub elapsed_ms: u64,
}

/// One triggered timing rule.
///
/// Values are whole milliseconds so results compare exactly after a JSON
/// round trip.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum TimingSignal {
    /// First gap below the floor.
    GapBelowFloor {
        /// Gap position (0 = start to first input).
        index: usize,
        /// Gap length.
        gap_ms: u64,
    },
    /// Zero-mistake completion below the minimum duration.
    FastPerfectCompletion {
        /// Elapsed time.
        elapsed_ms: u64,
    },
    /// Zero-mistake turn with a mean gap below the minimum.
    FastMeanWithoutMistakes {
        /// Mean gap (floored).
        mean_gap_ms: u64,
    },
    /// Low variance at a fast cadence.
    UniformCadence {
        /// Mean gap (floored).
        mean_gap_ms: u64,
        /// Standard deviation (floored).
        std_dev_ms: u64,
    },
    /// Review tier: close to the automation thresholds but not over them.
    NearThresholdCadence {
        /// Mean gap (floored).
        mean_gap_ms: u64,
    },
}

/// Rejecting outcome of the analysis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingVerdict {
    /// Physically implausible.
    ImpossibleSpeed,
    /// Statistically bot-like.
    SuspiciousTiming,
}

/// Summary statistics over the gaps.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GapStats {
    /// Number of gaps.
    pub count: usize,
    /// Shortest gap.
    pub min_ms: u64,
    /// Arithmetic mean.
    pub mean_ms: f64,
    /// Population standard deviation.
    pub std_dev_ms: f64,
}

/// Result of [`assess_timing`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimingAssessment {
    /// Rejection, if any rule rejects. `ImpossibleSpeed` wins over `SuspiciousTiming`.
    pub verdict: Option<TimingVerdict>,
    /// Review tier reached without a rejection.
    pub review: bool,
    /// Every rule that triggered, in evaluation order.
    pub signals: Vec<TimingSignal>,
    /// Gap statistics (none when there are no gaps).
    pub stats: Option<GapStats>,
}

/// Gaps between consecutive timestamps. A negative difference counts as zero.
pub fn gaps(timestamps: &[i64]) -> Vec<u64> {
    timestamps
        .windows(2)
        .map(|w| w[1].saturating_sub(w[0]).max(0) as u64)
        .collect()
}

/// Statistics over the gaps of a timestamp sequence.
pub fn gap_stats(timestamps: &[i64]) -> Option<GapStats> {
    stats_of(&gaps(timestamps))
}

fn stats_of(gaps: &[u64]) -> Option<GapStats> {
    let min_ms = *gaps.iter().min()?;
    let count = gaps.len();
    let n = count as f64;
    let mean_ms = gaps.iter().map(|&g| g as f64).sum::<f64>() / n;
    let variance = gaps
        .iter()
        .map(|&g| {
            let d = g as f64 - mean_ms;
            d * d
        })
        .sum::<f64>()
        / n;

    Some(GapStats {
        count,
        min_ms,
        mean_ms,
        std_dev_ms: variance.sqrt(),
    })
}

/// Run every timing rule.
///
/// `timestamps` are server timestamps, `start` first, then each timed input.
pub fn assess_timing(
    timestamps: &[i64],
    ctx: TimingContext,
    thresholds: &TimingThresholds,
) -> TimingAssessment {
    let gaps = gaps(timestamps);
    let stats = stats_of(&gaps);
    let perfect = ctx.mistakes == 0;

    let mut impossible = false;
    let mut suspicious = false;
    let mut signals = Vec::new();

    // Impossible speed
    if let Some((index, &gap_ms)) = gaps
        .iter()
        .enumerate()
        .find(|&(_, &g)| g < thresholds.gap_floor_ms)
    {
        impossible = true;
        signals.push(TimingSignal::GapBelowFloor { index, gap_ms });
    }

    if perfect && ctx.elapsed_ms < thresholds.min_perfect_completion_ms {
        impossible = true;
        signals.push(TimingSignal::FastPerfectCompletion { elapsed_ms: ctx.elapsed_ms });
    }

    let mut review = false;
    if let Some(s) = stats {
        let mean_gap_ms = s.mean_ms as u64;

        // Suspicious timing
        if perfect && s.mean_ms < thresholds.min_mean_gap_ms as f64 {
            suspicious = true;
            signals.push(TimingSignal::FastMeanWithoutMistakes { mean_gap_ms });
        }

        if s.count >= thresholds.min_samples as usize
            && s.std_dev_ms < thresholds.min_gap_std_dev_ms as f64
            && s.mean_ms < thresholds.low_variance_mean_ceiling_ms as f64
        {
            suspicious = true;
            signals.push(TimingSignal::UniformCadence {
                mean_gap_ms,
                std_dev_ms: s.std_dev_ms as u64,
            });
        }

        // Review tier
        if perfect && !impossible && !suspicious && s.mean_ms < thresholds.review_mean_gap_ms as f64 {
            review = true;
            signals.push(TimingSignal::NearThresholdCadence { mean_gap_ms });
        }
    }

    let verdict = if impossible {
        Some(TimingVerdict::ImpossibleSpeed)
    } else if suspicious {
        Some(TimingVerdict::SuspiciousTiming)
    } else {
        None
    };

    TimingAssessment { verdict, review, signals, stats }
}

// =============================================================================
// TESTS
// =============================================================================
