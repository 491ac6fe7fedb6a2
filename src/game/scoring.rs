//! Two-Factor Scoring
//!
//! `score = round(quality × sqrt(time_limit / max(elapsed, min_clamp)))`
//!
//! `quality = max(0, max_quality − penalty_per_unit × penalty_units)`
//!
//! Non-negative, deterministic, and non-increasing in both penalty units
//! and elapsed time.

use serde::{Serialize, Deserialize};

/// Scoring constants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Quality of a flawless turn.
    pub max_quality: u32,
    /// Quality lost per penalty unit.
    pub penalty_per_unit: u32,
    /// Elapsed times below this are scored as this.
    pub min_clamp_ms: u64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            max_quality: 1_000,
            penalty_per_unit: 50,
            min_clamp_ms: 1_000,
        }
    }
}

/// Quality after penalties, floored at zero.
#[inline]
pub fn quality(penalty_units: u32, config: &ScoringConfig) -> u32 {
    config
        .max_quality
        .saturating_sub(config.penalty_per_unit.saturating_mul(penalty_units))
}

/// `sqrt(time_limit / max(elapsed, min_clamp))`.
#[inline]
pub fn speed_factor(time_limit_ms: u64, elapsed_ms: u64, config: &ScoringConfig) -> f64 {
    let denominator = elapsed_ms.max(config.min_clamp_ms).max(1);
    (time_limit_ms as f64 / denominator as f64).sqrt()
}

/// Combine a quality value with the speed factor.
pub fn two_factor_score(quality: u32, time_limit_ms: u64, elapsed_ms: u64, config: &ScoringConfig) -> u32 {
    let raw = quality as f64 * speed_factor(time_limit_ms, elapsed_ms, config);
    // `as` saturates: NaN -> 0, overflow -> u32::MAX
    raw.round() as u32
}

/// Standard score: quality from penalty units, then the speed factor.
pub fn penalty_score(penalty_units: u32, time_limit_ms: u64, elapsed_ms: u64, config: &ScoringConfig) -> u32 {
    two_factor_score(quality(penalty_units, config), time_limit_ms, elapsed_ms, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_floors_at_zero() {
        let config = ScoringConfig::default();
        assert_eq!(quality(0, &config), 1_000);
        assert_eq!(quality(3, &config), 850);
        assert_eq!(quality(20, &config), 0);
        assert_eq!(quality(u32::MAX, &config), 0);
    }

    #[test]
    fn test_known_scores() {
        let config = ScoringConfig::default();
        // Finishing at the limit scores the quality
        assert_eq!(penalty_score(0, 60_000, 60_000, &config), 1_000);
        // A quarter of the limit doubles it
        assert_eq!(penalty_score(0, 60_000, 15_000, &config), 2_000);
        assert_eq!(penalty_score(2, 60_000, 15_000, &config), 1_800);
        // Sub-second turns are clamped
        assert_eq!(
            penalty_score(0, 60_000, 10, &config),
            penalty_score(0, 60_000, 1_000, &config)
        );
    }

    #[test]
    fn test_monotonic() {
        let config = ScoringConfig::default();
        let mut last = u32::MAX;
        for elapsed in (0..120_000).step_by(997) {
            let score = penalty_score(1, 60_000, elapsed, &config);
            assert!(score <= last);
            last = score;
        }

        let mut last = u32::MAX;
        for mistakes in 0..30 {
            let score = penalty_score(mistakes, 60_000, 20_000, &config);
            assert!(score <= last);
            last = score;
        }
    }

    #[test]
    fn test_zero_clamp_and_zero_elapsed() {
        let config = ScoringConfig { min_clamp_ms: 0, ..ScoringConfig::default() };
        // Never divides by zero
        assert_eq!(penalty_score(0, 4, 0, &config), 2_000);
    }
}
