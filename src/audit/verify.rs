//! Verification API
//!
//! Verify a stored turn by regeneration and replay:
//! 1. Versions match this build
//! 2. `generate(seed, config)` reproduces the recorded spec digest
//! 3. `validate(spec, events)` reproduces the stored result

use thiserror::Error;
use tracing::{debug, warn};

use crate::core::rng::RNG_VERSION;
use crate::game::{generate, validate, GameType, TurnResult};
use super::record::{TurnRecord, RECORD_VERSION};

/// Successful audit.
#[derive(Clone, Debug, PartialEq)]
pub struct AuditReport {
    /// Turn token.
    pub token: String,
    /// Game played.
    pub game_type: GameType,
    /// Hex digest of the regenerated spec.
    pub spec_digest: String,
    /// Hex digest of the event log.
    pub events_digest: String,
    /// Recomputed (and matching) result.
    pub result: TurnResult,
}

/// Reasons a record fails verification.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Record written by an incompatible build.
    #[error("record version mismatch: expected {expected}, got {got}")]
    VersionMismatch {
        /// Supported version.
        expected: u8,
        /// Version in the record.
        got: u8,
    },

    /// Spec generated with another generator algorithm.
    #[error("rng version mismatch: expected {expected}, got {got}")]
    RngVersionMismatch {
        /// Supported version.
        expected: u16,
        /// Version in the record.
        got: u16,
    },

    /// Seed and config no longer produce the recorded spec.
    #[error("spec digest mismatch: recorded {recorded}, computed {computed}")]
    SpecDigestMismatch {
        /// Digest in the record.
        recorded: String,
        /// Digest of the regenerated spec.
        computed: String,
    },

    /// Replay disagrees with the stored result.
    #[error("stored result does not match replay")]
    ResultMismatch {
        /// Result in the record.
        stored: Box<TurnResult>,
        /// Result of the replay.
        recomputed: Box<TurnResult>,
    },

    /// Turn was never completed.
    #[error("turn has no stored result")]
    NotCompleted,

    /// Digest input could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Verify a turn record by full regeneration and replay.
pub fn verify_record(record: &TurnRecord) -> Result<AuditReport, AuditError> {
    if record.version != RECORD_VERSION {
        return Err(AuditError::VersionMismatch { expected: RECORD_VERSION, got: record.version });
    }
    if record.rng_version != RNG_VERSION {
        return Err(AuditError::RngVersionMismatch { expected: RNG_VERSION, got: record.rng_version });
    }

    let spec = generate(record.game_type, &record.seed, &record.config);
    let spec_digest = hex::encode(spec.digest()?);
    if spec_digest != record.spec_digest {
        warn!(token = %record.token, recorded = %record.spec_digest, computed = %spec_digest, "spec digest mismatch");
        return Err(AuditError::SpecDigestMismatch {
            recorded: record.spec_digest.clone(),
            computed: spec_digest,
        });
    }

    let stored = record.result.as_ref().ok_or(AuditError::NotCompleted)?;
    let recomputed = validate(&spec, record.events.events());
    if &recomputed != stored {
        warn!(token = %record.token, "stored result does not match replay");
        return Err(AuditError::ResultMismatch {
            stored: Box::new(stored.clone()),
            recomputed: Box::new(recomputed),
        });
    }

    debug!(token = %record.token, game = %record.game_type, "turn record verified");
    Ok(AuditReport {
        token: record.token.clone(),
        game_type: record.game_type,
        spec_digest,
        events_digest: record.events_digest()?,
        result: recomputed,
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use serde_json::json;
    use crate::config::GameConfig;
    use crate::core::rng::Seed;
    use crate::game::{autoplay, EventLog, Event, FailureReason};

    fn completed_record(game: GameType) -> TurnRecord {
        let seed = Seed([3; 32]);
        let config = GameConfig::for_game(game);
        let spec = generate(game, &seed, &config);
        let mut record = TurnRecord::new(
            "turn-1".into(),
            "user-1".into(),
            seed,
            config,
            &spec,
            DateTime::from_timestamp_millis(0).unwrap_or_default(),
        )
        .unwrap();
        let events = autoplay::play(&spec, 10_000, || 650);
        record.result = Some(validate(&spec, &events));
        record.events = EventLog::from_events(events);
        record
    }

    #[test]
    fn test_verify_valid_record() {
        for game in GameType::ALL {
            let record = completed_record(game);
            let report = verify_record(&record).unwrap();
            assert_eq!(report.game_type, game);
            assert_eq!(report.spec_digest, record.spec_digest);
            assert!(report.result.valid, "{game}");
        }
    }

    #[test]
    fn test_tampered_events_detected() {
        let mut record = completed_record(GameType::ImageRotation);
        let mut events = record.events.clone().into_events();
        events.truncate(1);
        record.events = EventLog::from_events(events);

        match verify_record(&record) {
            Err(AuditError::ResultMismatch { recomputed, .. }) => {
                assert_eq!(recomputed.reason, Some(FailureReason::Incomplete));
            }
            other => panic!("expected result mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_tampered_config_detected() {
        let mut record = completed_record(GameType::Maze);
        record.config.time_limit_ms += 1_000;
        assert!(matches!(verify_record(&record), Err(AuditError::SpecDigestMismatch { .. })));
    }

    #[test]
    fn test_tampered_score_detected() {
        let mut record = completed_record(GameType::LightsOut);
        if let Some(result) = record.result.as_mut() {
            result.score = result.score.map(|s| s + 1);
        }
        assert!(matches!(verify_record(&record), Err(AuditError::ResultMismatch { .. })));
    }

    #[test]
    fn test_incomplete_and_version_errors() {
        let mut record = completed_record(GameType::Jigsaw);
        record.result = None;
        assert!(matches!(verify_record(&record), Err(AuditError::NotCompleted)));

        record.rng_version = RNG_VERSION + 1;
        assert!(matches!(verify_record(&record), Err(AuditError::RngVersionMismatch { .. })));

        record.version = 0;
        assert!(matches!(verify_record(&record), Err(AuditError::VersionMismatch { expected: 1, got: 0 })));
    }

    #[test]
    fn test_added_event_after_finish_changes_nothing() {
        let mut record = completed_record(GameType::MemoryMatch);
        let mut events = record.events.clone().into_events();
        events.push(Event::new("flip", json!({"card": 0}), i64::MAX));
        record.events = EventLog::from_events(events);
        assert!(verify_record(&record).is_ok());
    }
}
