//! Turn Session Management
//!
//! Owns the lifecycle of a turn from creation to completion:
//!
//! ```text
//! create ──► start ──► event* ──► complete
//!   │                               │
//!   └ seed, spec, client spec       └ TurnResult (stored, idempotent)
//! ```
//!
//! Every turn sits behind its own async mutex, so appends and completion of
//! one turn are serialised while distinct turns never contend. Server
//! receive time comes from a [`ServerClock`].
//!
//! Turns are held in memory only until [`TurnManager::cleanup`] evicts them:
//! completed turns after a short retention window (so a retried `complete`
//! still gets its stored result), anything else once it outlives the turn TTL.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::audit::TurnRecord;
use crate::config::GameConfig;
use crate::core::rng::{derive_turn_seed, Seed};
use crate::game::event::kinds;
use crate::game::{self, AppendError, ClientSpec, EventLog, GameType, TurnResult, TurnSpec};

/// Opaque turn token (UUID v4 string).
pub type TurnToken = String;

// =============================================================================
// CLOCK
// =============================================================================

/// Source of trusted server receive time.
pub trait ServerClock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> i64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl ServerClock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Hand-driven clock for tests, demos and replays.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    /// Clock reading `now_ms`.
    pub fn new(now_ms: i64) -> Self {
        Self { now_ms: AtomicI64::new(now_ms) }
    }

    /// Jump to `now_ms` (backwards allowed).
    pub fn set(&self, now_ms: i64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    /// Move forward by `ms`.
    pub fn advance(&self, ms: i64) {
        self.now_ms.fetch_add(ms, Ordering::SeqCst);
    }
}

impl ServerClock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

// =============================================================================
// ERRORS & LIMITS
// =============================================================================

/// Session errors.
#[derive(Debug, Error)]
pub enum TurnError {
    /// No turn with this token.
    #[error("unknown turn: {0}")]
    UnknownTurn(TurnToken),

    /// Event log rejected the append.
    #[error("event rejected: {0}")]
    Append(#[from] AppendError),

    /// Turn already completed.
    #[error("turn already completed")]
    AlreadyCompleted,

    /// Event type or payload unusable.
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    /// Event log is full.
    #[error("event limit reached ({limit})")]
    TooManyEvents {
        /// Configured maximum.
        limit: usize,
    },

    /// Digest input could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Per-turn input and retention limits.
#[derive(Debug, Clone)]
pub struct SessionLimits {
    /// Events per turn, `start` included.
    pub max_events: usize,
    /// Longest accepted event type.
    pub max_kind_len: usize,
    /// Largest accepted payload, in JSON bytes.
    pub max_payload_bytes: usize,
    /// How long a completed turn stays queryable.
    pub completed_retention_ms: i64,
    /// Age at which any turn is dropped, completed or not.
    pub turn_ttl_ms: i64,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_events: 2_000,
            max_kind_len: 32,
            max_payload_bytes: 2_048,
            completed_retention_ms: 5 * 60 * 1_000,
            // Longest time limit (10 min) plus generous slack
            turn_ttl_ms: 30 * 60 * 1_000,
        }
    }
}

// =============================================================================
// TURN SESSION
// =============================================================================

/// Returned by `create`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedTurn {
    /// Token for every later call.
    pub turn_token: TurnToken,
    /// Puzzle without its answer key.
    pub client_spec: ClientSpec,
}

/// Returned by `start` and `event`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventAck {
    /// Stamp stored with the event.
    pub server_ts_ms: i64,
    /// Hidden information earned by this event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reveal: Option<Value>,
}

/// One live turn.
#[derive(Debug)]
pub struct TurnSession {
    token: TurnToken,
    user_id: String,
    seed: Seed,
    config: GameConfig,
    spec: TurnSpec,
    log: EventLog,
    result: Option<TurnResult>,
    created_at: DateTime<Utc>,
    created_ms: i64,
    completed_ms: Option<i64>,
}

impl TurnSession {
    /// Generate a turn.
    pub fn new(token: TurnToken, user_id: String, seed: Seed, config: GameConfig, game_type: GameType, now_ms: i64) -> Self {
        let spec = game::generate(game_type, &seed, &config);
        Self {
            token,
            user_id,
            seed,
            config,
            spec,
            log: EventLog::new(),
            result: None,
            created_at: DateTime::from_timestamp_millis(now_ms).unwrap_or_default(),
            created_ms: now_ms,
            completed_ms: None,
        }
    }

    /// Turn token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Game played.
    pub fn game_type(&self) -> GameType {
        self.spec.game_type()
    }

    /// Full spec. Server side only.
    pub fn spec(&self) -> &TurnSpec {
        &self.spec
    }

    /// Events so far.
    pub fn log(&self) -> &EventLog {
        &self.log
    }

    /// Stored result, once completed.
    pub fn result(&self) -> Option<&TurnResult> {
        self.result.as_ref()
    }

    /// Append a client event stamped at `now_ms`.
    pub fn append(
        &mut self,
        kind: &str,
        payload: Value,
        client_ts_ms: Option<i64>,
        now_ms: i64,
        limits: &SessionLimits,
    ) -> Result<EventAck, TurnError> {
        if self.result.is_some() {
            return Err(TurnError::AlreadyCompleted);
        }
        if kind.is_empty() || kind.len() > limits.max_kind_len {
            return Err(TurnError::InvalidEvent(format!("event type must be 1..={} bytes", limits.max_kind_len)));
        }
        if !(payload.is_object() || payload.is_null()) {
            return Err(TurnError::InvalidEvent("payload must be an object".into()));
        }
        if serde_json::to_vec(&payload)?.len() > limits.max_payload_bytes {
            return Err(TurnError::InvalidEvent("payload too large".into()));
        }
        if self.log.len() >= limits.max_events {
            return Err(TurnError::TooManyEvents { limit: limits.max_events });
        }

        let server_ts_ms = self.log.append(kind, payload, client_ts_ms, now_ms)?.server_ts_ms;
        let reveal = game::reveal(&self.spec, self.log.events());
        Ok(EventAck { server_ts_ms, reveal })
    }

    /// Validate once; later calls return the stored result.
    pub fn complete(&mut self, now_ms: i64) -> &TurnResult {
        let spec = &self.spec;
        let log = &self.log;
        self.completed_ms.get_or_insert(now_ms);
        self.result.get_or_insert_with(|| game::validate(spec, log.events()))
    }

    /// Whether this turn may be dropped at `now_ms`.
    pub fn is_expired(&self, now_ms: i64, limits: &SessionLimits) -> bool {
        if now_ms.saturating_sub(self.created_ms) >= limits.turn_ttl_ms {
            return true;
        }
        self.completed_ms
            .is_some_and(|done| now_ms.saturating_sub(done) >= limits.completed_retention_ms)
    }

    /// Durable record of this turn.
    pub fn record(&self) -> Result<TurnRecord, TurnError> {
        let mut record = TurnRecord::new(
            self.token.clone(),
            self.user_id.clone(),
            self.seed,
            self.config.clone(),
            &self.spec,
            self.created_at,
        )?;
        record.events = self.log.clone();
        record.result = self.result.clone();
        Ok(record)
    }
}

// =============================================================================
// TURN MANAGER
// =============================================================================

/// Turn manager.
pub struct TurnManager {
    /// Live turns.
    turns: RwLock<BTreeMap<TurnToken, Arc<Mutex<TurnSession>>>>,
    /// Receive-time source.
    clock: Arc<dyn ServerClock>,
    /// Input limits.
    limits: SessionLimits,
}

impl TurnManager {
    /// Manager on the wall clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Manager on a custom clock.
    pub fn with_clock(clock: Arc<dyn ServerClock>) -> Self {
        Self {
            turns: RwLock::new(BTreeMap::new()),
            clock,
            limits: SessionLimits::default(),
        }
    }

    /// Replace the input limits.
    pub fn with_limits(mut self, limits: SessionLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Create a turn: derive a fresh seed, generate, and project.
    pub async fn create(&self, game_type: GameType, config: GameConfig, user_id: &str) -> CreatedTurn {
        let now_ms = self.clock.now_ms();
        let token = uuid::Uuid::new_v4().to_string();
        let nonce = uuid::Uuid::new_v4().into_bytes();
        let seed = derive_turn_seed(user_id, &nonce, now_ms);

        let session = TurnSession::new(token.clone(), user_id.to_string(), seed, config, game_type, now_ms);
        let client_spec = game::project(session.spec());

        debug!(token = %token, game = %game_type, seed = %&seed.to_hex()[..8], "turn created");

        let mut turns = self.turns.write().await;
        turns.insert(token.clone(), Arc::new(Mutex::new(session)));

        CreatedTurn { turn_token: token, client_spec }
    }

    /// Get a turn by token.
    pub async fn get(&self, token: &str) -> Result<Arc<Mutex<TurnSession>>, TurnError> {
        let turns = self.turns.read().await;
        turns.get(token).cloned().ok_or_else(|| TurnError::UnknownTurn(token.to_string()))
    }

    /// Record the `start` event.
    pub async fn start(&self, token: &str) -> Result<EventAck, TurnError> {
        self.event(token, kinds::START, Value::Null, None).await
    }

    /// Record a client event.
    pub async fn event(
        &self,
        token: &str,
        kind: &str,
        payload: Value,
        client_ts_ms: Option<i64>,
    ) -> Result<EventAck, TurnError> {
        let turn = self.get(token).await?;
        let mut session = turn.lock().await;
        let now_ms = self.clock.now_ms();

        match session.append(kind, payload, client_ts_ms, now_ms, &self.limits) {
            Ok(ack) => Ok(ack),
            Err(e) => {
                debug!(token = %token, kind, error = %e, "event rejected");
                Err(e)
            }
        }
    }

    /// Complete a turn. Idempotent.
    pub async fn complete(&self, token: &str) -> Result<TurnResult, TurnError> {
        let turn = self.get(token).await?;
        let mut session = turn.lock().await;

        let first = session.result().is_none();
        let game_type = session.game_type();
        let result = session.complete(self.clock.now_ms()).clone();

        if first {
            if result.flag {
                warn!(token = %token, game = %game_type, reason = ?result.reason, "turn flagged for review");
            }
            info!(
                token = %token,
                game = %game_type,
                valid = result.valid,
                score = ?result.score,
                elapsed_ms = ?result.elapsed_ms,
                "turn completed"
            );
        }
        Ok(result)
    }

    /// Durable record of a turn.
    pub async fn record(&self, token: &str) -> Result<TurnRecord, TurnError> {
        let turn = self.get(token).await?;
        let session = turn.lock().await;
        session.record()
    }

    /// Drop a turn.
    pub async fn remove(&self, token: &str) -> Option<Arc<Mutex<TurnSession>>> {
        let mut turns = self.turns.write().await;
        turns.remove(token)
    }

    /// Live turn count.
    pub async fn turn_count(&self) -> usize {
        let turns = self.turns.read().await;
        turns.len()
    }

    /// Evict completed turns past retention and turns past their TTL.
    ///
    /// Turns busy with a request are left for the next pass. Returns the
    /// number evicted.
    pub async fn cleanup(&self) -> usize {
        let now_ms = self.clock.now_ms();
        let expired: Vec<TurnToken> = {
            let turns = self.turns.read().await;
            turns
                .iter()
                .filter(|(_, turn)| {
                    turn.try_lock()
                        .is_ok_and(|session| session.is_expired(now_ms, &self.limits))
                })
                .map(|(token, _)| token.clone())
                .collect()
        };
        if expired.is_empty() {
            return 0;
        }

        let mut turns = self.turns.write().await;
        for token in &expired {
            if let Some(turn) = turns.remove(token) {
                if let Ok(session) = turn.try_lock() {
                    if session.result().is_none() {
                        debug!(token = %token, game = %session.game_type(), "abandoned turn evicted");
                    }
                }
            }
        }
        info!(evicted = expired.len(), live = turns.len(), "turn cleanup");
        expired.len()
    }
}

impl Default for TurnManager {
    fn default() -> Self {
        Self::new()
    }
}
