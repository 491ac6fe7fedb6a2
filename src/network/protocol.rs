//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! All messages are JSON objects tagged by `type`.

use serde::{Serialize, Deserialize};
use serde_json::Value;

use crate::game::{ClientSpec, GameType, PlayerResult};

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Create a turn. Configuration is resolved server side.
    Create {
        /// Game to play.
        game_type: GameType,
        /// Authenticated player identity.
        user_id: String,
    },

    /// Record the `start` event.
    Start {
        /// Turn token from `created`.
        turn_token: String,
    },

    /// Record a gameplay event.
    Event {
        /// Turn token.
        turn_token: String,
        /// Event type (`rotate`, `flip`, `finish`...).
        event_type: String,
        /// Event payload.
        #[serde(default)]
        payload: Value,
        /// Advisory client timestamp.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_ts_ms: Option<i64>,
    },

    /// Validate and score the turn.
    Complete {
        /// Turn token.
        turn_token: String,
    },

    /// Ping for latency measurement.
    Ping {
        /// Client timestamp echoed back.
        timestamp: u64,
    },
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Turn created.
    Created {
        /// Token for every later call.
        turn_token: String,
        /// Puzzle without its answer key.
        client_spec: ClientSpec,
    },

    /// Event stored.
    Ack {
        /// Turn token.
        turn_token: String,
        /// Stored server timestamp.
        server_ts_ms: i64,
        /// Hidden information earned by the event.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reveal: Option<Value>,
    },

    /// Turn outcome.
    Result {
        /// Turn token.
        turn_token: String,
        /// Player-facing result.
        result: PlayerResult,
    },

    /// Pong response.
    Pong {
        /// Echoed client timestamp.
        timestamp: u64,
        /// Server time in ms.
        server_time: i64,
    },

    /// Error message.
    Error(ServerError),

    /// Server is shutting down.
    Shutdown {
        /// Why.
        reason: String,
    },
}

/// Server error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerError {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Message could not be parsed.
    InvalidMessage,
    /// Token names no turn.
    UnknownTurn,
    /// Event rejected by the log contract.
    InvalidEvent,
    /// Turn already completed.
    TurnCompleted,
    /// Per-turn event limit hit.
    RateLimited,
    /// Server overloaded.
    ServerOverloaded,
    /// Internal error.
    InternalError,
}

impl ServerMessage {
    /// Error message shorthand.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        ServerMessage::Error(ServerError { code, message: message.into() })
    }
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
