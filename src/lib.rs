//! # Arena Turns
//!
//! Server-authoritative turn validation and scoring for a daily mini-game
//! arena.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       ARENA TURNS                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                 │
//! │  ├── rng.rs      - Seeds and the pinned Xorshift128+ PRNG   │
//! │  └── hash.rs     - Domain-separated SHA-256 digests         │
//! │                                                             │
//! │  game/           - Turn engine (deterministic)              │
//! │  ├── mod.rs      - GameModule trait, specs, dispatch        │
//! │  ├── event.rs    - Event log                                │
//! │  ├── replay.rs   - Shared validation loop                   │
//! │  ├── heuristics.rs - Anti-automation timing checks          │
//! │  ├── scoring.rs  - Score formulas                           │
//! │  └── <game>.rs   - One module per mini-game                 │
//! │                                                             │
//! │  audit/          - Turn records, verification by replay     │
//! │  config.rs       - Per-game tunables and overrides          │
//! │                                                             │
//! │  network/        - Sessions and WebSocket (non-determ.)     │
//! │  ├── session.rs  - Turn lifecycle, per-turn locking         │
//! │  ├── protocol.rs - Message types                            │
//! │  └── server.rs   - WebSocket server                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! `core/` and `game/` never read the clock or an unseeded random source:
//! - Puzzles come from the versioned PRNG seeded only by the turn seed
//! - Maps are BTreeMaps, so canonical JSON (and digests) are stable
//! - Elapsed time comes from server timestamps stored in the event log
//!
//! Given the same seed, config and events, `generate` and `validate`
//! produce identical results on any platform.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod config;
pub mod game;
pub mod audit;
pub mod network;

// Re-export commonly used types
pub use core::rng::{DeterministicRng, Seed};
pub use config::{EngineConfig, GameConfig};
pub use game::{
    generate, project, validate, ClientSpec, Event, EventLog, FailureReason,
    GameType, Metrics, PlayerResult, TurnResult, TurnSpec,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Slack past the time limit before a turn counts as timed out (ms).
pub const TIMEOUT_GRACE_MS: u64 = 5_000;
