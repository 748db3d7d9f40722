//! Deterministic seeded randomness.
//!
//! Per-cell values are derived from `(seed, x, y)` alone so that a random
//! field is identical regardless of which tile or thread evaluates a cell.
//! Sequential algorithms draw from a seeded ChaCha stream instead.
//!
//! Nothing here depends on std's hasher, so a seed reproduces the same field
//! across Rust releases.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Golden-ratio multiplier that spreads packed coordinates over all 64 bits.
const CELL_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

/// Pack `(x, y)` into one word and scramble it.
fn mix_cell(x: usize, y: usize) -> u64 {
    ((y as u64) << 32 | (x as u64 & 0xFFFF_FFFF)).wrapping_mul(CELL_MIX)
}

/// Derive a u64 for one cell from the pass seed and the cell coordinates.
///
/// The first output of a ChaCha8 stream keyed by `seed ^ mix(x, y)`.
pub fn derive_cell_seed(seed: u64, x: usize, y: usize) -> u64 {
    ChaCha8Rng::seed_from_u64(seed ^ mix_cell(x, y)).next_u64()
}

/// A uniform value in `[0, 1)` for one cell.
pub fn cell_unit(seed: u64, x: usize, y: usize) -> f32 {
    // The top 24 bits fill an f32 mantissa exactly.
    (derive_cell_seed(seed, x, y) >> 40) as f32 / (1_u32 << 24) as f32
}

/// The RNG stream for a sequential generation pass.
pub fn pass_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Deterministic `base^exp` using libm (not platform libc).
#[inline]
pub fn det_powf(base: f32, exp: f32) -> f32 {
    libm::powf(base, exp)
}
