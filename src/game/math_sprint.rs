//! Math Sprint
//!
//! A sheet of arithmetic problems answered against the clock. Every result
//! is a non-negative integer. Only the first answer to each problem counts.

use std::fmt;

use serde::{Serialize, Deserialize};
use serde_json::{json, Value};

use crate::config::GameConfig;
use crate::core::rng::DeterministicRng;
use super::autoplay::{Pace, ScriptedAction};
use super::event::Step;
use super::result::{FailureReason, Metrics};
use super::scoring::ScoringConfig;
use super::{Evaluation, GameModule, GameType};

/// Share of right answers required to pass, in percent.
const MIN_CORRECT_PCT: u8 = 70;

/// Arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Op {
    Add,
    Sub,
    Mul,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "x",
        })
    }
}

/// One problem on the sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub a: u32,
    pub op: Op,
    pub b: u32,
}

impl Problem {
    fn solve(&self) -> u32 {
        match self.op {
            Op::Add => self.a + self.b,
            Op::Sub => self.a.saturating_sub(self.b),
            Op::Mul => self.a * self.b,
        }
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.a, self.op, self.b)
    }
}

/// Generated sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MathSprintSpec {
    pub problems: Vec<Problem>,
    /// Share of right answers required, in percent.
    pub min_correct_pct: u8,
    /// Results in problem order.
    pub answers: Vec<u32>,
}

/// Client projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MathSprintView {
    pub problems: Vec<Problem>,
    /// Share of right answers required, in percent.
    pub min_correct_pct: u8,
}

/// Replay state.
#[derive(Debug, Clone, PartialEq)]
pub struct MathSprintState {
    /// Per problem: unanswered, or whether the first answer was right.
    marks: Vec<Option<bool>>,
    last: Option<usize>,
}

/// Outcome breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MathSprintDetail {
    /// Problems answered right.
    pub correct: u32,
    /// Problems answered wrong.
    pub wrong: u32,
    /// Problems on the sheet.
    pub problems: u32,
}

/// Math sprint game module.
pub struct MathSprintGame;

impl GameModule for MathSprintGame {
    const GAME_TYPE: GameType = GameType::MathSprint;
    const EVENT_KINDS: &'static [&'static str] = &["answer"];
    const SECRET_FIELDS: &'static [&'static str] = &["answers"];

    type Spec = MathSprintSpec;
    type Client = MathSprintView;
    type State = MathSprintState;
    type Detail = MathSprintDetail;

    fn default_config() -> GameConfig {
        GameConfig {
            time_limit_ms: 90_000,
            // Difficulty: operands up to 10 * grid_size
            grid_size: 2,
            item_count: 12,
            scoring: ScoringConfig { penalty_per_unit: 60, ..ScoringConfig::default() },
            ..GameConfig::default()
        }
    }

    fn generate(rng: &mut DeterministicRng, config: &GameConfig) -> MathSprintSpec {
        let count = config.item_count.clamp(1, 40);
        let max = 10 * config.grid_size.clamp(1, 10) as u32;

        let problems: Vec<Problem> = (0..count)
            .map(|_| match rng.next_int(3) {
                0 => Problem { a: rng.next_int(max + 1), op: Op::Add, b: rng.next_int(max + 1) },
                1 => {
                    let a = rng.next_int(max + 1);
                    Problem { a, op: Op::Sub, b: rng.next_int(a + 1) }
                }
                // Products stay on the times table
                _ => Problem { a: 2 + rng.next_int(11), op: Op::Mul, b: 2 + rng.next_int(11) },
            })
            .collect();
        let answers = problems.iter().map(Problem::solve).collect();

        MathSprintSpec { problems, min_correct_pct: MIN_CORRECT_PCT, answers }
    }

    fn project(spec: &MathSprintSpec) -> MathSprintView {
        MathSprintView {
            problems: spec.problems.clone(),
            min_correct_pct: spec.min_correct_pct,
        }
    }

    fn initial_state(spec: &MathSprintSpec) -> MathSprintState {
        MathSprintState { marks: vec![None; spec.answers.len()], last: None }
    }

    fn apply(spec: &MathSprintSpec, mut state: MathSprintState, step: &Step<'_>) -> MathSprintState {
        let (Some(problem), Some(value)) = (step.index("problem"), step.index("value")) else {
            return state;
        };
        let (Some(mark), Some(&answer)) = (state.marks.get_mut(problem), spec.answers.get(problem)) else {
            return state;
        };
        if mark.is_none() {
            *mark = Some(value == answer as usize);
            state.last = Some(problem);
        }
        state
    }

    fn evaluate(spec: &MathSprintSpec, state: &MathSprintState) -> Evaluation<MathSprintDetail> {
        let problems = state.marks.len() as u32;
        let correct = state.marks.iter().filter(|m| **m == Some(true)).count() as u32;
        let wrong = state.marks.iter().filter(|m| **m == Some(false)).count() as u32;

        let failure = if correct + wrong < problems {
            Some(FailureReason::Incomplete)
        } else if correct * 100 < u32::from(spec.min_correct_pct) * problems {
            Some(FailureReason::LowAccuracy)
        } else {
            None
        };

        Evaluation {
            metrics: Metrics {
                correct,
                total: problems,
                mistakes: wrong,
                penalty_units: wrong,
            },
            detail: MathSprintDetail { correct, wrong, problems },
            failure,
        }
    }

    fn reveal(_spec: &MathSprintSpec, state: &MathSprintState, _step: &Step<'_>) -> Option<Value> {
        let problem = state.last?;
        let correct = state.marks.get(problem).copied().flatten()?;
        Some(json!({ "problem": problem, "correct": correct }))
    }

    fn script(spec: &MathSprintSpec) -> Vec<ScriptedAction> {
        spec.answers
            .iter()
            .enumerate()
            .map(|(problem, value)| ScriptedAction {
                kind: "answer",
                payload: json!({ "problem": problem, "value": value }),
                pace: Pace::Free,
            })
            .collect()
    }
}
