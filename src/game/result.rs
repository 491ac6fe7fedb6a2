//! Turn Results
//!
//! The single immutable outcome of validating a turn, and the reduced view
//! returned to the player.

use serde::{Serialize, Deserialize};

use super::TurnDetail;
use super::heuristics::TimingSignal;

/// Why a turn was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// No `start` event in the log.
    NoStartEvent,
    /// Win condition not met.
    Incomplete,
    /// Objectives visited in the wrong order.
    IncorrectOrder,
    /// Not enough of the board uncovered.
    LowCoverage,
    /// Hit ratio below the requirement.
    LowAccuracy,
    /// Not a single round completed.
    NoRoundsCompleted,
    /// A mine was uncovered.
    MineHit,
    /// Last gameplay event after the time limit plus grace.
    Timeout,
    /// Physically implausible timing.
    ImpossibleSpeed,
    /// Statistically bot-like timing.
    SuspiciousTiming,
}

/// Families of failure reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonClass {
    /// Turn never started.
    NotStarted,
    /// Game not won.
    Incomplete,
    /// Over time.
    Timeout,
    /// Rejected by the anti-automation heuristics.
    Automation,
}

impl FailureReason {
    /// Family of this reason.
    pub fn class(self) -> ReasonClass {
        match self {
            FailureReason::NoStartEvent => ReasonClass::NotStarted,
            FailureReason::Incomplete
            | FailureReason::IncorrectOrder
            | FailureReason::LowCoverage
            | FailureReason::LowAccuracy
            | FailureReason::NoRoundsCompleted
            | FailureReason::MineHit => ReasonClass::Incomplete,
            FailureReason::Timeout => ReasonClass::Timeout,
            FailureReason::ImpossibleSpeed | FailureReason::SuspiciousTiming => ReasonClass::Automation,
        }
    }

    /// Message shown to the player.
    ///
    /// Automation rejections share one message that names no rule.
    pub fn player_message(self) -> &'static str {
        match self {
            FailureReason::NoStartEvent => "The turn was never started.",
            FailureReason::Incomplete => "The puzzle was not finished.",
            FailureReason::IncorrectOrder => "The goals were not completed in order.",
            FailureReason::LowCoverage => "Not enough of the card was uncovered.",
            FailureReason::LowAccuracy => "Too few answers were on target.",
            FailureReason::NoRoundsCompleted => "No rounds were completed.",
            FailureReason::MineHit => "A mine was uncovered.",
            FailureReason::Timeout => "Time ran out.",
            FailureReason::ImpossibleSpeed | FailureReason::SuspiciousTiming => {
                "This turn could not be verified."
            }
        }
    }
}

/// Counters every game reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    /// Objectives achieved (pairs matched, tiles solved, notes hit...).
    pub correct: u32,
    /// Objectives available.
    pub total: u32,
    /// Wrong or wasted actions.
    pub mistakes: u32,
    /// Units fed into the quality penalty.
    pub penalty_units: u32,
}

impl Metrics {
    /// `correct / total` in percent (100 when there is nothing to do).
    pub fn completion_pct(&self) -> u32 {
        if self.total == 0 {
            100
        } else {
            ((self.correct as u64 * 100) / self.total as u64) as u32
        }
    }
}

/// Outcome of validating one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnResult {
    /// Turn accepted.
    pub valid: bool,
    /// Rejection reason when not valid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailureReason>,
    /// Score when valid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    /// Start to last gameplay event (absent without a start).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
    /// Game counters.
    #[serde(default)]
    pub metrics: Metrics,
    /// Game-specific breakdown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<TurnDetail>,
    /// Marked for manual review.
    #[serde(default)]
    pub flag: bool,
    /// Timing rules that triggered.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signals: Vec<TimingSignal>,
}

impl TurnResult {
    /// Accepted turn.
    pub fn accepted(score: u32, elapsed_ms: u64, metrics: Metrics, detail: TurnDetail) -> Self {
        Self {
            valid: true,
            reason: None,
            score: Some(score),
            elapsed_ms: Some(elapsed_ms),
            metrics,
            detail: Some(detail),
            flag: false,
            signals: Vec::new(),
        }
    }

    /// Rejected turn.
    pub fn rejected(reason: FailureReason) -> Self {
        Self {
            valid: false,
            reason: Some(reason),
            score: None,
            elapsed_ms: None,
            metrics: Metrics::default(),
            detail: None,
            flag: false,
            signals: Vec::new(),
        }
    }

    /// Reduced view for the player.
    pub fn player_view(&self) -> PlayerResult {
        let reason = self.reason.filter(|r| r.class() != ReasonClass::Automation);
        PlayerResult {
            valid: self.valid,
            score: self.score,
            reason,
            message: self.reason.map(|r| r.player_message().to_string()),
            elapsed_ms: self.elapsed_ms,
            metrics: self.metrics,
            detail: self.detail.clone(),
        }
    }
}

/// What the client sees after completing a turn.
///
/// Carries no review flag, no timing signals, and no specific automation
/// reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerResult {
    /// Turn accepted.
    pub valid: bool,
    /// Score when valid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    /// Rejection reason, except for automation rejections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailureReason>,
    /// Human-readable rejection message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Elapsed time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
    /// Game counters.
    pub metrics: Metrics,
    /// Game-specific breakdown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<TurnDetail>,
}
