//! Digests for Audit
//!
//! Provides deterministic SHA-256 digests of turn data for:
//! - Spec regeneration checks (same seed + config ⇒ same digest)
//! - Event log fingerprints in turn records
//! - Audit tooling that compares stored and recomputed turns

use serde::Serialize;
use sha2::{Sha256, Digest as _};

/// 256-bit digest.
pub type Digest32 = [u8; 32];

/// SHA-256 over a domain tag followed by length-framed fields.
///
/// Field order is part of the digest.
pub struct DigestBuilder {
    inner: Sha256,
}

impl DigestBuilder {
    /// Start a digest under `domain` (e.g. `b"ARENA_TURN_SPEC_V1"`).
    pub fn new(domain: &[u8]) -> Self {
        let mut inner = Sha256::new();
        inner.update((domain.len() as u64).to_le_bytes());
        inner.update(domain);
        Self { inner }
    }

    /// Little-endian u64.
    #[inline]
    pub fn update_u64(&mut self, value: u64) {
        self.inner.update(value.to_le_bytes());
    }

    /// Canonical JSON encoding of a value, length-prefixed.
    ///
    /// Struct fields serialize in declaration order and maps are BTreeMaps,
    /// so the encoding is stable for every type in this crate.
    pub fn update_json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), serde_json::Error> {
        let bytes = serde_json::to_vec(value)?;
        self.update_u64(bytes.len() as u64);
        self.inner.update(&bytes);
        Ok(())
    }

    /// Consume the builder.
    pub fn finalize(self) -> Digest32 {
        self.inner.finalize().into()
    }
}
