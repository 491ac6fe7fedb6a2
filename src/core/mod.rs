//! Core deterministic primitives.
//!
//! Everything in this module is platform independent: the same seed
//! produces the same puzzle and the same digest on every host.

pub mod rng;
pub mod hash;

// Re-export core types
pub use rng::{DeterministicRng, Seed, derive_turn_seed, RNG_VERSION};
pub use hash::{Digest32, DigestBuilder};
