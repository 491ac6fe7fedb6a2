//! Turn Audit
//!
//! Everything needed to re-derive a turn's outcome after the fact:
//! - Turn records (seed, config, event log, stored result)
//! - Verification by regeneration and replay
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       AUDIT                                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  record.rs   - TurnRecord, written once a turn completes    │
//! │  verify.rs   - Regenerate spec, compare digests, replay     │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod record;
pub mod verify;

// Re-export key types
pub use record::{TurnRecord, RECORD_VERSION};
pub use verify::{verify_record, AuditReport, AuditError};
