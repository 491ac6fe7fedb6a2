//! Turn Event Log
//!
//! Append-only, server-timestamped record of the events a client submits
//! during one turn. The log is the only input to replay validation.
//!
//! # Contract
//!
//! - Exactly one `start`, and it comes first
//! - Server timestamps never decrease (a backwards clock step is clamped)
//! - Nothing is appended after a terminal event (`finish` / `timeout`)

use serde::{Serialize, Deserialize};
use serde_json::Value;
use thiserror::Error;

use crate::core::hash::{Digest32, DigestBuilder};

/// Reserved event kinds shared by every game.
pub mod kinds {
    /// Opens the turn. Timing is measured from here.
    pub const START: &str = "start";
    /// Client declares the turn finished.
    pub const FINISH: &str = "finish";
    /// Client declares its own timer expired.
    pub const TIMEOUT: &str = "timeout";

    /// True for events that close the log.
    #[inline]
    pub fn is_terminal(kind: &str) -> bool {
        kind == FINISH || kind == TIMEOUT
    }
}

fn empty_payload() -> Value {
    Value::Object(Default::default())
}

/// One recorded client event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event kind (`start`, `rotate`, `flip`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Game-specific payload. Always a JSON object when appended through [`EventLog`].
    #[serde(default = "empty_payload")]
    pub payload: Value,
    /// Server receive time, the only trusted timestamp.
    pub server_ts_ms: i64,
    /// Client-reported time. Advisory only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_ts_ms: Option<i64>,
}

impl Event {
    /// Build an event directly (tests, audit fixtures, autoplay).
    pub fn new(kind: impl Into<String>, payload: Value, server_ts_ms: i64) -> Self {
        Self {
            kind: kind.into(),
            payload,
            server_ts_ms,
            client_ts_ms: None,
        }
    }
}

/// A gameplay event as seen by a reducer.
#[derive(Clone, Copy, Debug)]
pub struct Step<'a> {
    /// Event kind.
    pub kind: &'a str,
    /// Raw payload.
    pub payload: &'a Value,
    /// Milliseconds since `start` (server clock, floored at zero).
    pub at_ms: u64,
}

impl<'a> Step<'a> {
    /// Non-negative integer field, as an index.
    ///
    /// Strings, floats, negatives and missing keys all yield `None`.
    pub fn index(&self, key: &str) -> Option<usize> {
        self.payload
            .get(key)?
            .as_u64()
            .and_then(|v| usize::try_from(v).ok())
    }

    /// String field.
    pub fn text(&self, key: &str) -> Option<&'a str> {
        let payload: &'a Value = self.payload;
        payload.get(key)?.as_str()
    }

    /// Array of non-negative integers. Malformed entries are dropped.
    pub fn indices(&self, key: &str) -> Vec<usize> {
        match self.payload.get(key).and_then(Value::as_array) {
            Some(items) => items
                .iter()
                .filter_map(Value::as_u64)
                .filter_map(|v| usize::try_from(v).ok())
                .collect(),
            None => Vec::new(),
        }
    }
}

/// Append rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AppendError {
    /// A second `start`.
    #[error("turn already started")]
    AlreadyStarted,
    /// Gameplay event before `start`.
    #[error("turn not started")]
    NotStarted,
    /// Append after `finish` / `timeout`.
    #[error("event log is closed")]
    Terminated,
}

/// Append-only event log for one turn.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap already-recorded events without checking the append contract.
    ///
    /// Replay tolerates any ordering; this is how audit tooling loads a log.
    pub fn from_events(events: Vec<Event>) -> Self {
        Self { events }
    }

    /// Append an event, stamping it with `server_ts_ms`.
    ///
    /// The stored stamp is `max(server_ts_ms, previous stamp)`.
    pub fn append(
        &mut self,
        kind: &str,
        payload: Value,
        client_ts_ms: Option<i64>,
        server_ts_ms: i64,
    ) -> Result<&Event, AppendError> {
        if self.is_terminated() {
            return Err(AppendError::Terminated);
        }
        let started = self.is_started();
        if kind == kinds::START {
            if started {
                return Err(AppendError::AlreadyStarted);
            }
        } else if !started {
            return Err(AppendError::NotStarted);
        }

        let server_ts_ms = match self.last_server_ts() {
            Some(prev) if server_ts_ms < prev => prev,
            _ => server_ts_ms,
        };
        let payload = if payload.is_null() { empty_payload() } else { payload };

        self.events.push(Event {
            kind: kind.to_string(),
            payload,
            server_ts_ms,
            client_ts_ms,
        });
        let idx = self.events.len() - 1;
        Ok(&self.events[idx])
    }

    /// True once a `start` has been recorded.
    pub fn is_started(&self) -> bool {
        self.events.iter().any(|e| e.kind == kinds::START)
    }

    /// True once a terminal event has been recorded.
    pub fn is_terminated(&self) -> bool {
        self.events.iter().any(|e| kinds::is_terminal(&e.kind))
    }

    /// Timestamp of the most recent event.
    pub fn last_server_ts(&self) -> Option<i64> {
        self.events.last().map(|e| e.server_ts_ms)
    }

    /// Events in append order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True if nothing has been appended.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Consume into the raw events.
    pub fn into_events(self) -> Vec<Event> {
        self.events
    }

    /// SHA-256 fingerprint over the canonical JSON of every event.
    pub fn digest(&self) -> Result<Digest32, serde_json::Error> {
        event_log_digest(&self.events)
    }
}

/// SHA-256 fingerprint of an event sequence.
pub fn event_log_digest(events: &[Event]) -> Result<Digest32, serde_json::Error> {
    let mut hasher = DigestBuilder::new(b"ARENA_TURN_EVENTS_V1");
    hasher.update_u64(events.len() as u64);
    for event in events {
        hasher.update_json(event)?;
    }
    Ok(hasher.finalize())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn started_log() -> EventLog {
        let mut log = EventLog::new();
        log.append(kinds::START, json!({}), None, 1_000).unwrap();
        log
    }

    #[test]
    fn test_start_must_come_first() {
        let mut log = EventLog::new();
        assert_eq!(
            log.append("rotate", json!({"tile": 0}), None, 1_000).unwrap_err(),
            AppendError::NotStarted
        );
        assert!(log.is_empty());

        log.append(kinds::START, json!({}), None, 1_000).unwrap();
        assert_eq!(
            log.append(kinds::START, json!({}), None, 1_100).unwrap_err(),
            AppendError::AlreadyStarted
        );
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_no_append_after_terminal() {
        let mut log = started_log();
        log.append(kinds::FINISH, json!({}), None, 2_000).unwrap();
        assert_eq!(
            log.append("rotate", json!({"tile": 0}), None, 2_100).unwrap_err(),
            AppendError::Terminated
        );
        assert_eq!(
            log.append(kinds::TIMEOUT, json!({}), None, 2_100).unwrap_err(),
            AppendError::Terminated
        );
    }

    #[test]
    fn test_clock_step_backwards_is_clamped() {
        let mut log = started_log();
        log.append("rotate", json!({"tile": 0}), None, 5_000).unwrap();
        let event = log.append("rotate", json!({"tile": 1}), Some(4_000), 4_000).unwrap();
        assert_eq!(event.server_ts_ms, 5_000);
        assert_eq!(event.client_ts_ms, Some(4_000));
    }

    #[test]
    fn test_null_payload_becomes_object() {
        let mut log = EventLog::new();
        let event = log.append(kinds::START, Value::Null, None, 0).unwrap();
        assert!(event.payload.is_object());
    }

    #[test]
    fn test_event_wire_shape() {
        let event = Event::new("flip", json!({"card": 3}), 1_234);
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value, json!({"type": "flip", "payload": {"card": 3}, "server_ts_ms": 1234}));

        let back: Event = serde_json::from_value(json!({"type": "start", "server_ts_ms": 5})).unwrap();
        assert_eq!(back.payload, json!({}));
        assert_eq!(back.client_ts_ms, None);
    }

    #[test]
    fn test_step_field_access() {
        let payload = json!({"tile": 4, "neg": -1, "float": 1.5, "s": "up", "cells": [1, "x", 2, -3]});
        let step = Step { kind: "rotate", payload: &payload, at_ms: 0 };
        assert_eq!(step.index("tile"), Some(4));
        assert_eq!(step.index("neg"), None);
        assert_eq!(step.index("float"), None);
        assert_eq!(step.index("s"), None);
        assert_eq!(step.index("missing"), None);
        assert_eq!(step.text("s"), Some("up"));
        assert_eq!(step.text("tile"), None);
        assert_eq!(step.indices("cells"), vec![1, 2]);
        assert!(step.indices("tile").is_empty());
    }

    #[test]
    fn test_digest_tracks_content() {
        let mut a = started_log();
        let mut b = started_log();
        assert_eq!(a.digest().unwrap(), b.digest().unwrap());

        a.append("flip", json!({"card": 1}), None, 1_500).unwrap();
        b.append("flip", json!({"card": 2}), None, 1_500).unwrap();
        assert_ne!(a.digest().unwrap(), b.digest().unwrap());
    }
}
