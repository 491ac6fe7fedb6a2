//! Seeded PRNG
//!
//! Xorshift128+ state, initialised through SplitMix64. Every puzzle is drawn
//! from this generator, so the sequence is part of the stored record format.
//!
//! The algorithm is pinned as [`RNG_VERSION`]. Any change to the state
//! update, the SplitMix64 initialisation, or the seed folding is a new
//! version: stored turn records regenerate their puzzles through it.

use serde::{Serialize, Deserialize};
use sha2::{Sha256, Digest as _};

/// Version of the generator algorithm recorded with every turn.
pub const RNG_VERSION: u16 = 1;

/// Opaque 256-bit turn seed.
///
/// Derived server-side at turn creation and never sent to a client.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Seed(pub [u8; 32]);

impl Seed {
    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex encoding (for logs and audit tooling).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Fold the seed into the 64-bit value used to initialise the PRNG.
    ///
    /// XOR of the four little-endian u64 lanes.
    pub fn fold_u64(&self) -> u64 {
        self.0
            .chunks_exact(8)
            .map(|lane| {
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(lane);
                u64::from_le_bytes(bytes)
            })
            .fold(0, |acc, lane| acc ^ lane)
    }
}

impl std::fmt::Debug for Seed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Only a prefix: full seeds stay out of debug logs.
        write!(f, "Seed({}..)", hex::encode(&self.0[..4]))
    }
}

/// Xorshift128+ generator.
///
/// Integer-only arithmetic with wrapping ops: identical output on every
/// target.
///
/// ```
/// use arena_turns::core::rng::DeterministicRng;
///
/// let mut rng = DeterministicRng::new(12345);
/// assert_eq!(rng.next_u64(), 6233086606872742541);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeterministicRng {
    state: [u64; 2],
}

impl Default for DeterministicRng {
    fn default() -> Self {
        Self::new(0)
    }
}

impl DeterministicRng {
    /// Generator for a raw 64-bit value.
    pub fn new(seed: u64) -> Self {
        let mut cursor = seed;
        let lo = splitmix64(&mut cursor);
        let hi = splitmix64(&mut cursor);

        // All-zero state is a fixed point of xorshift
        let state = if (lo | hi) == 0 { [1, 1] } else { [lo, hi] };
        Self { state }
    }

    /// Generator for a turn seed (lanes folded by [`Seed::fold_u64`]).
    pub fn from_seed(seed: &Seed) -> Self {
        Self::new(seed.fold_u64())
    }

    /// Next raw output.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let [a, b] = self.state;
        let out = a.wrapping_add(b);

        let mixed = b ^ a;
        self.state = [a.rotate_left(24) ^ mixed ^ (mixed << 16), mixed.rotate_left(37)];
        out
    }

    /// Low 32 bits of the next output.
    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        self.next_u64() as u32
    }

    /// Uniform-ish value in `[0, max)`; 0 when `max` is 0.
    ///
    /// Plain modulo. The bias is negligible for board-sized ranges and the
    /// exact reduction is part of the pinned sequence.
    #[inline]
    pub fn next_int(&mut self, max: u32) -> u32 {
        match max {
            0 => 0,
            m => (self.next_u64() % u64::from(m)) as u32,
        }
    }

    /// Value in `[lo, hi]` inclusive; `lo` when the range is empty.
    #[inline]
    pub fn next_int_range(&mut self, lo: i32, hi: i32) -> i32 {
        if lo >= hi {
            return lo;
        }
        let span = hi.abs_diff(lo) + 1;
        lo + self.next_int(span) as i32
    }

    /// Generate a random index in range [0, len).
    #[inline]
    pub fn next_index(&mut self, len: usize) -> usize {
        self.next_int(len.min(u32::MAX as usize) as u32) as usize
    }

    /// Generate a random boolean that is true `percent` times out of 100.
    #[inline]
    pub fn next_percent(&mut self, percent: u32) -> bool {
        self.next_int(100) < percent
    }

    /// Fisher-Yates, walking from the back.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for last in (1..items.len()).rev() {
            let pick = self.next_index(last + 1);
            items.swap(last, pick);
        }
    }

    /// One element, or `None` for an empty slice.
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let idx = self.next_index(items.len());
        items.get(idx)
    }
}

#[inline]
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Derive a turn seed.
///
/// - `user_id`: authenticated player identity
/// - `nonce`: fresh random component (UUID v4 bytes)
/// - `issued_at_ms`: server time at turn creation
///
/// The nonce makes the seed unpredictable to the client even when the
/// user id and creation time are known.
pub fn derive_turn_seed(user_id: &str, nonce: &[u8; 16], issued_at_ms: i64) -> Seed {
    let mut hasher = Sha256::new();
    hasher.update(b"ARENA_TURN_SEED_V1");

    // Length-prefixed so ("ab", nonce) and ("a", b + nonce) never collide
    hasher.update((user_id.len() as u64).to_le_bytes());
    hasher.update(user_id.as_bytes());

    hasher.update(nonce);
    hasher.update(issued_at_ms.to_le_bytes());

    Seed(hasher.finalize().into())
}

// =============================================================================
// TESTS
// =============================================================================
