//! Turn Records
//!
//! One record per completed turn. Small enough to store as a JSON blob next
//! to the leaderboard row; complete enough to replay the turn on any host.

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

use crate::config::GameConfig;
use crate::core::rng::{Seed, RNG_VERSION};
use crate::game::{EventLog, GameType, TurnResult, TurnSpec};

/// Current record version.
pub const RECORD_VERSION: u8 = 1;

/// Durable record of one turn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    /// Version for forward compatibility.
    pub version: u8,

    /// Opaque turn token (UUID string).
    pub token: String,

    /// Authenticated player identity.
    pub user_id: String,

    /// Game played.
    pub game_type: GameType,

    /// Turn seed. Server side only.
    pub seed: Seed,

    /// Generator algorithm the puzzle was built with.
    pub rng_version: u16,

    /// Resolved configuration the puzzle was generated from.
    pub config: GameConfig,

    /// Hex SHA-256 of the generated spec.
    pub spec_digest: String,

    /// Every event, as appended.
    pub events: EventLog,

    /// Stored outcome (None until completion).
    pub result: Option<TurnResult>,

    /// Turn creation time.
    pub created_at: DateTime<Utc>,
}

impl TurnRecord {
    /// Record for a freshly generated turn.
    pub fn new(
        token: String,
        user_id: String,
        seed: Seed,
        config: GameConfig,
        spec: &TurnSpec,
        created_at: DateTime<Utc>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            version: RECORD_VERSION,
            token,
            user_id,
            game_type: spec.game_type(),
            seed,
            rng_version: RNG_VERSION,
            config,
            spec_digest: hex::encode(spec.digest()?),
            events: EventLog::new(),
            result: None,
            created_at,
        })
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Hex SHA-256 of the event log.
    pub fn events_digest(&self) -> Result<String, serde_json::Error> {
        Ok(hex::encode(self.events.digest()?))
    }
}
