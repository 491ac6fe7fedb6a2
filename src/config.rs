//! Engine Configuration
//!
//! Per-game tunables (grid size, time limit, difficulty knobs, timing
//! thresholds, scoring constants) and the engine-wide override table.
//!
//! Resolution order for a game: built-in defaults from the game module,
//! then any patch from the engine config file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::game::GameType;
use crate::game::heuristics::TimingThresholds;
use crate::game::scoring::ScoringConfig;

/// Environment variable naming the engine config file.
pub const ENGINE_CONFIG_ENV: &str = "ARENA_ENGINE_CONFIG";

/// Shortest time limit a turn may be created with.
pub const MIN_TIME_LIMIT_MS: u64 = 5_000;

/// Longest time limit a turn may be created with.
pub const MAX_TIME_LIMIT_MS: u64 = 600_000;

/// Tunables for one game type.
///
/// `grid_size` and `item_count` are read per game:
///
/// | game | `grid_size` | `item_count` |
/// |---|---|---|
/// | image_rotation | tiles per side | image pool size |
/// | memory_match | unused | pairs |
/// | maze | cells per side | checkpoints |
/// | rhythm | lanes | notes |
/// | jigsaw | pieces per side | image pool size |
/// | sliding_puzzle | tiles per side | scramble moves |
/// | scratch_card | cells per side | hidden gems |
/// | whack_a_mole | holes per side | rounds |
/// | sequence_recall | colours | sequence length |
/// | lights_out | cells per side | scramble presses |
/// | word_search | cells per side | words |
/// | minesweeper | cells per side | mines |
/// | sudoku | board size (4, 6 or 9) | blanks |
/// | nonogram | cells per side | fill percentage |
/// | spot_difference | spot radius step | spots |
/// | math_sprint | operand range in tens | problems |
/// | reaction_time | unused | rounds |
/// | flood_fill | cells per side | colours |
///
/// Out-of-range values are clamped by the generator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Time allowed from `start` to the last gameplay event.
    pub time_limit_ms: u64,
    /// Board dimension.
    pub grid_size: u8,
    /// Count knob (pairs, notes, rounds...).
    pub item_count: u16,
    /// Anti-automation thresholds.
    pub timing: TimingThresholds,
    /// Scoring constants.
    pub scoring: ScoringConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            time_limit_ms: 60_000,
            grid_size: 4,
            item_count: 8,
            timing: TimingThresholds::default(),
            scoring: ScoringConfig::default(),
        }
    }
}

impl GameConfig {
    /// Built-in defaults for a game type.
    pub fn for_game(game: GameType) -> Self {
        game.default_config()
    }

    /// Time limit clamped to the supported range.
    pub fn clamped_time_limit_ms(&self) -> u64 {
        self.time_limit_ms.clamp(MIN_TIME_LIMIT_MS, MAX_TIME_LIMIT_MS)
    }
}

/// Partial override for one game type.
///
/// Only the fields present replace the built-in defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfigPatch {
    /// Replacement time limit.
    pub time_limit_ms: Option<u64>,
    /// Replacement grid size.
    pub grid_size: Option<u8>,
    /// Replacement count knob.
    pub item_count: Option<u16>,
    /// Replacement timing thresholds (whole block).
    pub timing: Option<TimingThresholds>,
    /// Replacement scoring constants (whole block).
    pub scoring: Option<ScoringConfig>,
}

impl GameConfigPatch {
    /// Apply this patch on top of a base config.
    pub fn apply_to(&self, mut base: GameConfig) -> GameConfig {
        if let Some(v) = self.time_limit_ms {
            base.time_limit_ms = v;
        }
        if let Some(v) = self.grid_size {
            base.grid_size = v;
        }
        if let Some(v) = self.item_count {
            base.item_count = v;
        }
        if let Some(v) = &self.timing {
            base.timing = v.clone();
        }
        if let Some(v) = &self.scoring {
            base.scoring = v.clone();
        }
        base
    }
}

/// Engine-wide configuration: per-game overrides keyed by game type.
///
/// ```json
/// { "games": { "maze": { "grid_size": 9, "time_limit_ms": 120000 } } }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Overrides by game type.
    pub games: BTreeMap<GameType, GameConfigPatch>,
}

impl EngineConfig {
    /// Resolved config for a game type.
    pub fn game(&self, game: GameType) -> GameConfig {
        let base = GameConfig::for_game(game);
        match self.games.get(&game) {
            Some(patch) => patch.apply_to(base),
            None => base,
        }
    }

    /// Parse from a JSON string.
    pub fn from_json(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Load from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Load from the file named by `ARENA_ENGINE_CONFIG`, or defaults if unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var_os(ENGINE_CONFIG_ENV) {
            Some(path) => Self::from_file(PathBuf::from(path)),
            None => Ok(Self::default()),
        }
    }
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid JSON for the schema.
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    /// Environment variable has an unusable value.
    #[error("Invalid value for {name}: {value}")]
    InvalidEnv {
        /// Variable name.
        name: &'static str,
        /// Offending value.
        value: String,
    },
}
