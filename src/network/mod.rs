//! Network Layer
//!
//! Turn sessions and the WebSocket front.
//! This layer is **non-deterministic** (wall clock, random nonces); all
//! validation runs through `game/`.

pub mod protocol;
pub mod session;
pub mod server;

pub use protocol::{ClientMessage, ServerMessage, ErrorCode};
pub use session::{
    TurnManager, TurnSession, TurnError, TurnToken, CreatedTurn, EventAck,
    SessionLimits, ServerClock, SystemClock, ManualClock,
};
pub use server::{TurnServer, ServerConfig, ServerError, dispatch};
