//! Game Logic Module
//!
//! Every mini-game is a [`GameModule`]: a seeded generator, a client
//! projection, a pure `(State, Step) -> State` reducer, a win check and a
//! score. One replay harness and one set of timing heuristics serve them all.
//!
//! ## Module Structure
//!
//! - `event`: Event records, the append-only log, step payload accessors
//! - `replay`: Shared validation loop
//! - `heuristics`: Anti-automation timing checks
//! - `scoring`: Score formulas
//! - `result`: Turn outcome and player view
//! - `grid`: Square grid helpers used by board games
//! - `autoplay`: Perfect scripts for demos, benches and tests
//! - one module per game type

/// Run `$body` with `$m` aliased to the game module of a [`PuzzleSpec`]
/// and `$p` bound to its inner spec.
macro_rules! with_module {
    ($puzzle:expr, |$p:ident, $m:ident| $body:expr) => {
        match $puzzle {
            $crate::game::PuzzleSpec::ImageRotation($p) => { type $m = $crate::game::rotation::RotationGame; $body }
            $crate::game::PuzzleSpec::MemoryMatch($p) => { type $m = $crate::game::memory::MemoryGame; $body }
            $crate::game::PuzzleSpec::Maze($p) => { type $m = $crate::game::maze::MazeGame; $body }
            $crate::game::PuzzleSpec::Rhythm($p) => { type $m = $crate::game::rhythm::RhythmGame; $body }
            $crate::game::PuzzleSpec::Jigsaw($p) => { type $m = $crate::game::jigsaw::JigsawGame; $body }
            $crate::game::PuzzleSpec::SlidingPuzzle($p) => { type $m = $crate::game::sliding::SlidingGame; $body }
            $crate::game::PuzzleSpec::ScratchCard($p) => { type $m = $crate::game::scratch::ScratchGame; $body }
            $crate::game::PuzzleSpec::WhackAMole($p) => { type $m = $crate::game::whack::WhackGame; $body }
            $crate::game::PuzzleSpec::SequenceRecall($p) => { type $m = $crate::game::sequence::SequenceGame; $body }
            $crate::game::PuzzleSpec::LightsOut($p) => { type $m = $crate::game::lights_out::LightsOutGame; $body }
            $crate::game::PuzzleSpec::WordSearch($p) => { type $m = $crate::game::word_search::WordSearchGame; $body }
            $crate::game::PuzzleSpec::Minesweeper($p) => { type $m = $crate::game::minesweeper::MinesweeperGame; $body }
            $crate::game::PuzzleSpec::Sudoku($p) => { type $m = $crate::game::sudoku::SudokuGame; $body }
            $crate::game::PuzzleSpec::Nonogram($p) => { type $m = $crate::game::nonogram::NonogramGame; $body }
            $crate::game::PuzzleSpec::SpotDifference($p) => { type $m = $crate::game::spot_difference::SpotDifferenceGame; $body }
            $crate::game::PuzzleSpec::MathSprint($p) => { type $m = $crate::game::math_sprint::MathSprintGame; $body }
            $crate::game::PuzzleSpec::ReactionTime($p) => { type $m = $crate::game::reaction_time::ReactionTimeGame; $body }
            $crate::game::PuzzleSpec::FloodFill($p) => { type $m = $crate::game::flood_fill::FloodFillGame; $body }
        }
    };
}
pub(crate) use with_module;

/// Run `$body` with `$m` aliased to the game module of a [`GameType`].
macro_rules! with_game {
    ($game:expr, |$m:ident| $body:expr) => {
        match $game {
            $crate::game::GameType::ImageRotation => { type $m = $crate::game::rotation::RotationGame; $body }
            $crate::game::GameType::MemoryMatch => { type $m = $crate::game::memory::MemoryGame; $body }
            $crate::game::GameType::Maze => { type $m = $crate::game::maze::MazeGame; $body }
            $crate::game::GameType::Rhythm => { type $m = $crate::game::rhythm::RhythmGame; $body }
            $crate::game::GameType::Jigsaw => { type $m = $crate::game::jigsaw::JigsawGame; $body }
            $crate::game::GameType::SlidingPuzzle => { type $m = $crate::game::sliding::SlidingGame; $body }
            $crate::game::GameType::ScratchCard => { type $m = $crate::game::scratch::ScratchGame; $body }
            $crate::game::GameType::WhackAMole => { type $m = $crate::game::whack::WhackGame; $body }
            $crate::game::GameType::SequenceRecall => { type $m = $crate::game::sequence::SequenceGame; $body }
            $crate::game::GameType::LightsOut => { type $m = $crate::game::lights_out::LightsOutGame; $body }
            $crate::game::GameType::WordSearch => { type $m = $crate::game::word_search::WordSearchGame; $body }
            $crate::game::GameType::Minesweeper => { type $m = $crate::game::minesweeper::MinesweeperGame; $body }
            $crate::game::GameType::Sudoku => { type $m = $crate::game::sudoku::SudokuGame; $body }
            $crate::game::GameType::Nonogram => { type $m = $crate::game::nonogram::NonogramGame; $body }
            $crate::game::GameType::SpotDifference => { type $m = $crate::game::spot_difference::SpotDifferenceGame; $body }
            $crate::game::GameType::MathSprint => { type $m = $crate::game::math_sprint::MathSprintGame; $body }
            $crate::game::GameType::ReactionTime => { type $m = $crate::game::reaction_time::ReactionTimeGame; $body }
            $crate::game::GameType::FloodFill => { type $m = $crate::game::flood_fill::FloodFillGame; $body }
        }
    };
}
pub(crate) use with_game;

pub mod autoplay;
pub mod event;
pub mod grid;
pub mod heuristics;
pub mod replay;
pub mod result;
pub mod scoring;

pub mod rotation;
pub mod memory;
pub mod maze;
pub mod rhythm;
pub mod jigsaw;
pub mod sliding;
pub mod scratch;
pub mod whack;
pub mod sequence;
pub mod lights_out;
pub mod word_search;
pub mod minesweeper;
pub mod sudoku;
pub mod nonogram;
pub mod spot_difference;
pub mod math_sprint;
pub mod reaction_time;
pub mod flood_fill;

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Deserialize};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::config::GameConfig;
use crate::core::hash::{Digest32, DigestBuilder};
use crate::core::rng::{DeterministicRng, Seed};

use autoplay::ScriptedAction;
use heuristics::TimingThresholds;
use scoring::{penalty_score, ScoringConfig};

// Re-export key types
pub use event::{Event, EventLog, AppendError, Step, event_log_digest};
pub use result::{FailureReason, Metrics, PlayerResult, ReasonClass, TurnResult};

// =============================================================================
// GAME TYPES
// =============================================================================

/// Mini-game tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameType {
    ImageRotation,
    MemoryMatch,
    Maze,
    Rhythm,
    Jigsaw,
    SlidingPuzzle,
    ScratchCard,
    WhackAMole,
    SequenceRecall,
    LightsOut,
    WordSearch,
    Minesweeper,
    Sudoku,
    Nonogram,
    SpotDifference,
    MathSprint,
    ReactionTime,
    FloodFill,
}

/// Tag that names no game.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown game type: {0}")]
pub struct UnknownGameType(pub String);

impl GameType {
    /// Every game, in tag order.
    pub const ALL: [GameType; 18] = [
        GameType::ImageRotation,
        GameType::MemoryMatch,
        GameType::Maze,
        GameType::Rhythm,
        GameType::Jigsaw,
        GameType::SlidingPuzzle,
        GameType::ScratchCard,
        GameType::WhackAMole,
        GameType::SequenceRecall,
        GameType::LightsOut,
        GameType::WordSearch,
        GameType::Minesweeper,
        GameType::Sudoku,
        GameType::Nonogram,
        GameType::SpotDifference,
        GameType::MathSprint,
        GameType::ReactionTime,
        GameType::FloodFill,
    ];

    /// Wire tag.
    pub fn as_str(self) -> &'static str {
        match self {
            GameType::ImageRotation => "image_rotation",
            GameType::MemoryMatch => "memory_match",
            GameType::Maze => "maze",
            GameType::Rhythm => "rhythm",
            GameType::Jigsaw => "jigsaw",
            GameType::SlidingPuzzle => "sliding_puzzle",
            GameType::ScratchCard => "scratch_card",
            GameType::WhackAMole => "whack_a_mole",
            GameType::SequenceRecall => "sequence_recall",
            GameType::LightsOut => "lights_out",
            GameType::WordSearch => "word_search",
            GameType::Minesweeper => "minesweeper",
            GameType::Sudoku => "sudoku",
            GameType::Nonogram => "nonogram",
            GameType::SpotDifference => "spot_difference",
            GameType::MathSprint => "math_sprint",
            GameType::ReactionTime => "reaction_time",
            GameType::FloodFill => "flood_fill",
        }
    }

    /// Built-in configuration.
    pub fn default_config(self) -> GameConfig {
        with_game!(self, |M| M::default_config())
    }

    /// Spec fields that must never reach the client.
    pub fn secret_fields(self) -> &'static [&'static str] {
        with_game!(self, |M| M::SECRET_FIELDS)
    }

    /// Gameplay event kinds the validator understands.
    pub fn event_kinds(self) -> &'static [&'static str] {
        with_game!(self, |M| M::EVENT_KINDS)
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameType {
    type Err = UnknownGameType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GameType::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| UnknownGameType(s.to_string()))
    }
}

// =============================================================================
// GAME MODULE
// =============================================================================

/// Win check output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation<D> {
    /// Counters for scoring and display.
    pub metrics: Metrics,
    /// Game-specific breakdown.
    pub detail: D,
    /// Set when the win condition is not met.
    pub failure: Option<FailureReason>,
}

/// Capability set of one mini-game.
///
/// Everything here is pure and deterministic; the replay harness owns the
/// loop, timing and elapsed-time logic.
pub trait GameModule {
    const GAME_TYPE: GameType;
    /// Gameplay event kinds. Anything else between `start` and the terminal
    /// event is ignored.
    const EVENT_KINDS: &'static [&'static str];
    /// Kinds whose timestamps feed the timing heuristics.
    const TIMED_KINDS: &'static [&'static str] = Self::EVENT_KINDS;
    /// Spec fields hidden from the client.
    const SECRET_FIELDS: &'static [&'static str];
    /// Once solved, later input is ignored.
    const ENDS_ON_SOLVE: bool = false;

    type Spec: Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Into<PuzzleSpec>;
    type Client: Into<PuzzleView>;
    type State: Clone + fmt::Debug + PartialEq;
    type Detail: Clone + fmt::Debug + Into<TurnDetail>;

    fn default_config() -> GameConfig;

    fn generate(rng: &mut DeterministicRng, config: &GameConfig) -> Self::Spec;

    fn project(spec: &Self::Spec) -> Self::Client;

    fn initial_state(spec: &Self::Spec) -> Self::State;

    /// Fold one gameplay step. Malformed or out-of-range payloads leave the
    /// state unchanged.
    fn apply(spec: &Self::Spec, state: Self::State, step: &Step<'_>) -> Self::State;

    fn evaluate(spec: &Self::Spec, state: &Self::State) -> Evaluation<Self::Detail>;

    /// True when no further step can change the outcome.
    fn is_settled(spec: &Self::Spec, state: &Self::State) -> bool {
        Self::ENDS_ON_SOLVE && Self::evaluate(spec, state).failure.is_none()
    }

    /// Score of an accepted turn.
    fn score(
        _spec: &Self::Spec,
        metrics: &Metrics,
        elapsed_ms: u64,
        time_limit_ms: u64,
        config: &ScoringConfig,
    ) -> u32 {
        penalty_score(metrics.penalty_units, time_limit_ms, elapsed_ms, config)
    }

    /// Information earned by `step`, given the state after it.
    fn reveal(_spec: &Self::Spec, _state: &Self::State, _step: &Step<'_>) -> Option<Value> {
        None
    }

    /// Perfect action script.
    fn script(spec: &Self::Spec) -> Vec<ScriptedAction>;
}

// =============================================================================
// TURN SPEC
// =============================================================================

/// Timing and scoring rules frozen into a spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRules {
    pub timing: TimingThresholds,
    pub scoring: ScoringConfig,
}

/// Full generated turn, answer key included. Server side only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnSpec {
    pub time_limit_ms: u64,
    pub rules: TurnRules,
    pub puzzle: PuzzleSpec,
}

impl TurnSpec {
    /// Attach the rules of `config` to a puzzle.
    pub fn wrap(config: &GameConfig, puzzle: impl Into<PuzzleSpec>) -> Self {
        Self {
            time_limit_ms: config.clamped_time_limit_ms(),
            rules: TurnRules {
                timing: config.timing.clone(),
                scoring: config.scoring.clone(),
            },
            puzzle: puzzle.into(),
        }
    }

    pub fn game_type(&self) -> GameType {
        with_module!(&self.puzzle, |_p, M| M::GAME_TYPE)
    }

    /// See [`spec_digest`].
    pub fn digest(&self) -> Result<Digest32, serde_json::Error> {
        spec_digest(self)
    }
}

/// What the client receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSpec {
    pub time_limit_ms: u64,
    pub puzzle: PuzzleView,
}

/// Per-game spec, tagged by `game_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "game_type", rename_all = "snake_case")]
pub enum PuzzleSpec {
    ImageRotation(rotation::RotationSpec),
    MemoryMatch(memory::MemorySpec),
    Maze(maze::MazeSpec),
    Rhythm(rhythm::RhythmSpec),
    Jigsaw(jigsaw::JigsawSpec),
    SlidingPuzzle(sliding::SlidingSpec),
    ScratchCard(scratch::ScratchSpec),
    WhackAMole(whack::WhackSpec),
    SequenceRecall(sequence::SequenceSpec),
    LightsOut(lights_out::LightsOutSpec),
    WordSearch(word_search::WordSearchSpec),
    Minesweeper(minesweeper::MinesweeperSpec),
    Sudoku(sudoku::SudokuSpec),
    Nonogram(nonogram::NonogramSpec),
    SpotDifference(spot_difference::SpotDifferenceSpec),
    MathSprint(math_sprint::MathSprintSpec),
    ReactionTime(reaction_time::ReactionTimeSpec),
    FloodFill(flood_fill::FloodFillSpec),
}

/// Per-game client projection, tagged by `game_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "game_type", rename_all = "snake_case")]
pub enum PuzzleView {
    ImageRotation(rotation::RotationView),
    MemoryMatch(memory::MemoryView),
    Maze(maze::MazeView),
    Rhythm(rhythm::RhythmView),
    Jigsaw(jigsaw::JigsawView),
    SlidingPuzzle(sliding::SlidingView),
    ScratchCard(scratch::ScratchView),
    WhackAMole(whack::WhackView),
    SequenceRecall(sequence::SequenceView),
    LightsOut(lights_out::LightsOutView),
    WordSearch(word_search::WordSearchView),
    Minesweeper(minesweeper::MinesweeperView),
    Sudoku(sudoku::SudokuView),
    Nonogram(nonogram::NonogramView),
    SpotDifference(spot_difference::SpotDifferenceView),
    MathSprint(math_sprint::MathSprintView),
    ReactionTime(reaction_time::ReactionTimeView),
    FloodFill(flood_fill::FloodFillView),
}

/// Per-game outcome breakdown, tagged by `game_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "game_type", rename_all = "snake_case")]
pub enum TurnDetail {
    ImageRotation(rotation::RotationDetail),
    MemoryMatch(memory::MemoryDetail),
    Maze(maze::MazeDetail),
    Rhythm(rhythm::RhythmDetail),
    Jigsaw(jigsaw::JigsawDetail),
    SlidingPuzzle(sliding::SlidingDetail),
    ScratchCard(scratch::ScratchDetail),
    WhackAMole(whack::WhackDetail),
    SequenceRecall(sequence::SequenceDetail),
    LightsOut(lights_out::LightsOutDetail),
    WordSearch(word_search::WordSearchDetail),
    Minesweeper(minesweeper::MinesweeperDetail),
    Sudoku(sudoku::SudokuDetail),
    Nonogram(nonogram::NonogramDetail),
    SpotDifference(spot_difference::SpotDifferenceDetail),
    MathSprint(math_sprint::MathSprintDetail),
    ReactionTime(reaction_time::ReactionTimeDetail),
    FloodFill(flood_fill::FloodFillDetail),
}

macro_rules! impl_variant_from {
    ($($variant:ident: $spec:ty, $view:ty, $detail:ty;)*) => {
        $(
            impl From<$spec> for PuzzleSpec {
                fn from(spec: $spec) -> Self { PuzzleSpec::$variant(spec) }
            }
            impl From<$view> for PuzzleView {
                fn from(view: $view) -> Self { PuzzleView::$variant(view) }
            }
            impl From<$detail> for TurnDetail {
                fn from(detail: $detail) -> Self { TurnDetail::$variant(detail) }
            }
        )*
    };
}

impl_variant_from! {
    ImageRotation: rotation::RotationSpec, rotation::RotationView, rotation::RotationDetail;
    MemoryMatch: memory::MemorySpec, memory::MemoryView, memory::MemoryDetail;
    Maze: maze::MazeSpec, maze::MazeView, maze::MazeDetail;
    Rhythm: rhythm::RhythmSpec, rhythm::RhythmView, rhythm::RhythmDetail;
    Jigsaw: jigsaw::JigsawSpec, jigsaw::JigsawView, jigsaw::JigsawDetail;
    SlidingPuzzle: sliding::SlidingSpec, sliding::SlidingView, sliding::SlidingDetail;
    ScratchCard: scratch::ScratchSpec, scratch::ScratchView, scratch::ScratchDetail;
    WhackAMole: whack::WhackSpec, whack::WhackView, whack::WhackDetail;
    SequenceRecall: sequence::SequenceSpec, sequence::SequenceView, sequence::SequenceDetail;
    LightsOut: lights_out::LightsOutSpec, lights_out::LightsOutView, lights_out::LightsOutDetail;
    WordSearch: word_search::WordSearchSpec, word_search::WordSearchView, word_search::WordSearchDetail;
    Minesweeper: minesweeper::MinesweeperSpec, minesweeper::MinesweeperView, minesweeper::MinesweeperDetail;
    Sudoku: sudoku::SudokuSpec, sudoku::SudokuView, sudoku::SudokuDetail;
    Nonogram: nonogram::NonogramSpec, nonogram::NonogramView, nonogram::NonogramDetail;
    SpotDifference: spot_difference::SpotDifferenceSpec, spot_difference::SpotDifferenceView, spot_difference::SpotDifferenceDetail;
    MathSprint: math_sprint::MathSprintSpec, math_sprint::MathSprintView, math_sprint::MathSprintDetail;
    ReactionTime: reaction_time::ReactionTimeSpec, reaction_time::ReactionTimeView, reaction_time::ReactionTimeDetail;
    FloodFill: flood_fill::FloodFillSpec, flood_fill::FloodFillView, flood_fill::FloodFillDetail;
}

// =============================================================================
// ENGINE ENTRY POINTS
// =============================================================================

/// Generate the turn for `seed`. Same inputs, same spec, on every host.
pub fn generate(game: GameType, seed: &Seed, config: &GameConfig) -> TurnSpec {
    let mut rng = DeterministicRng::from_seed(seed);
    with_game!(game, |M| TurnSpec::wrap(config, M::generate(&mut rng, config)))
}

/// Strip the answer key.
pub fn project(spec: &TurnSpec) -> ClientSpec {
    ClientSpec {
        time_limit_ms: spec.time_limit_ms,
        puzzle: with_module!(&spec.puzzle, |puzzle, M| M::project(puzzle).into()),
    }
}

/// Replay `events` against `spec`.
pub fn validate(spec: &TurnSpec, events: &[Event]) -> TurnResult {
    with_module!(&spec.puzzle, |puzzle, M| replay::run::<M>(spec, puzzle, events))
}

/// Information the newest event earned the player, if any.
pub fn reveal(spec: &TurnSpec, events: &[Event]) -> Option<Value> {
    with_module!(&spec.puzzle, |puzzle, M| replay::reveal::<M>(puzzle, events))
}

/// Score `metrics` under the rules of `spec`.
pub fn score(spec: &TurnSpec, metrics: &Metrics, elapsed_ms: u64) -> u32 {
    with_module!(&spec.puzzle, |puzzle, M| {
        M::score(puzzle, metrics, elapsed_ms, spec.time_limit_ms, &spec.rules.scoring)
    })
}

/// SHA-256 fingerprint of a spec's canonical JSON.
pub fn spec_digest(spec: &TurnSpec) -> Result<Digest32, serde_json::Error> {
    let mut hasher = DigestBuilder::new(b"ARENA_TURN_SPEC_V1");
    hasher.update_json(spec)?;
    Ok(hasher.finalize())
}

// =============================================================================
// TESTS
// =============================================================================
