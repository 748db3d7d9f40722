//! Perlin noise normalized to `[0, 1]` and fractal Brownian motion over it.

use noise::{NoiseFn, Perlin};

/// Seed of the shared gradient table. Every sampler uses the same table so
/// that separate tiles of one pass see one continuous noise field.
pub const PERLIN_SEED: u32 = 0;

/// Upper bound on fBm octaves; beyond this the frequency exceeds `f64` detail.
pub const MAX_OCTAVES: u32 = 32;

/// Samples 2D gradient noise remapped into `[0, 1]`.
#[derive(Clone, Debug)]
pub struct PerlinSampler {
    noise: Perlin,
}

impl PerlinSampler {
    /// Create a sampler over the shared gradient table.
    pub fn new() -> Self {
        Self {
            noise: Perlin::new(PERLIN_SEED),
        }
    }

    /// Sample the noise at `(x, y)`. The result lies in `[0, 1]`.
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        let raw = self.noise.get([x, y]);
        (raw * 0.5 + 0.5).clamp(0.0, 1.0)
    }

    /// Fractal sum of `octaves` samples, each at double the previous
    /// frequency and `persistence` times the previous amplitude, divided by
    /// the total amplitude so the result stays in `[0, 1]`.
    ///
    /// Returns 0 when `octaves` is 0.
    pub fn fbm(&self, x: f64, y: f64, octaves: u32, persistence: f64) -> f64 {
        let mut total = 0.0;
        let mut frequency = 1.0;
        let mut amplitude = 1.0;

        for _ in 0..octaves {
            total += self.sample(x * frequency, y * frequency) * amplitude;
            amplitude *= persistence;
            frequency *= 2.0;
        }

        let max_value = amplitude_total(octaves, persistence);
        if max_value > 0.0 {
            (total / max_value).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

impl Default for PerlinSampler {
    fn default() -> Self {
        Self::new()
    }
}

/// Sum of the octave amplitudes `Σ persistence^i` for `i < octaves`.
pub fn amplitude_total(octaves: u32, persistence: f64) -> f64 {
    let mut sum = 0.0;
    let mut amp = 1.0;
    for _ in 0..octaves {
        sum += amp;
        amp *= persistence;
    }
    sum
}
