//! Height generation algorithms.
//!
//! Every partitionable algorithm implements [`TileGenerator`] and writes only
//! the cells of the tile it is handed. Midpoint displacement reads across the
//! whole grid at every recursion level, so it only runs over a full
//! [`HeightGrid`].

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::TerrainError;
use crate::grid::{GreyscaleGrid, HeightGrid};
use crate::heightmap::{MAX_OCTAVES, PerlinSampler};
use crate::partition::{TileLayout, TileViewMut, split_tiles_mut};
use crate::seed::{cell_unit, det_powf, pass_rng};

/// The available generation algorithms.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    /// Heights read from a greyscale image.
    Heightmap,
    /// Single-octave Perlin noise.
    #[default]
    Perlin,
    /// Fractal Brownian motion over Perlin noise.
    PerlinFbm,
    /// Diamond-square midpoint displacement.
    MidpointDisplacement,
    /// Uniform random heights.
    Random,
}

impl Algorithm {
    /// All algorithms, in declaration order.
    pub const ALL: [Algorithm; 5] = [
        Algorithm::Heightmap,
        Algorithm::Perlin,
        Algorithm::PerlinFbm,
        Algorithm::MidpointDisplacement,
        Algorithm::Random,
    ];

    /// The kebab-case name used on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Heightmap => "heightmap",
            Algorithm::Perlin => "perlin",
            Algorithm::PerlinFbm => "perlin-fbm",
            Algorithm::MidpointDisplacement => "midpoint-displacement",
            Algorithm::Random => "random",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Algorithm::ALL
            .into_iter()
            .find(|a| a.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let names: Vec<_> = Algorithm::ALL.iter().map(|a| a.name()).collect();
                format!("unknown algorithm '{s}', expected one of: {}", names.join(", "))
            })
    }
}

/// Fills the cells of one tile.
pub trait TileGenerator: Sync {
    /// Write a height into every cell of `tile`.
    fn generate(&self, tile: &mut TileViewMut<'_>);
}

/// Heights taken from a precomputed greyscale grid.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageParams {
    /// One greyscale sample per height cell.
    pub greyscale: GreyscaleGrid,
    /// Vertical scale applied to each sample.
    pub height_scale: f32,
}

impl TileGenerator for ImageParams {
    fn generate(&self, tile: &mut TileViewMut<'_>) {
        let min_x = tile.partition().min_x;
        for (y, row) in tile.rows_mut() {
            for (i, cell) in row.iter_mut().enumerate() {
                *cell = self.greyscale.get(min_x + i, y) * self.height_scale;
            }
        }
    }
}

/// Coordinates of the Perlin field: `((x + offset_x) * scale_x, (y + offset_y) * scale_y)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PerlinParams {
    pub offset_x: i32,
    pub scale_x: f32,
    pub offset_y: i32,
    pub scale_y: f32,
}

impl PerlinParams {
    /// Noise-space coordinates of grid cell `(x, y)`.
    #[inline]
    pub fn noise_coords(&self, x: usize, y: usize) -> (f64, f64) {
        (
            (x as f64 + self.offset_x as f64) * self.scale_x as f64,
            (y as f64 + self.offset_y as f64) * self.scale_y as f64,
        )
    }
}

impl Default for PerlinParams {
    fn default() -> Self {
        Self {
            offset_x: 0,
            scale_x: 0.01,
            offset_y: 0,
            scale_y: 0.01,
        }
    }
}

impl TileGenerator for PerlinParams {
    fn generate(&self, tile: &mut TileViewMut<'_>) {
        let sampler = PerlinSampler::new();
        let min_x = tile.partition().min_x;
        for (y, row) in tile.rows_mut() {
            for (i, cell) in row.iter_mut().enumerate() {
                let (nx, ny) = self.noise_coords(min_x + i, y);
                *cell = sampler.sample(nx, ny) as f32;
            }
        }
    }
}

/// Fractal Brownian motion over [`PerlinParams`] coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FbmParams {
    pub perlin: PerlinParams,
    /// Number of octaves; each doubles the frequency.
    pub octaves: u32,
    /// Amplitude ratio between successive octaves.
    pub persistence: f32,
    /// Multiplier applied to the normalized fBm value.
    pub height_scale: f32,
}

impl Default for FbmParams {
    fn default() -> Self {
        Self {
            perlin: PerlinParams::default(),
            octaves: 3,
            persistence: 8.0,
            height_scale: 0.09,
        }
    }
}

impl TileGenerator for FbmParams {
    fn generate(&self, tile: &mut TileViewMut<'_>) {
        let sampler = PerlinSampler::new();
        let min_x = tile.partition().min_x;
        let persistence = self.persistence as f64;
        for (y, row) in tile.rows_mut() {
            for (i, cell) in row.iter_mut().enumerate() {
                let (nx, ny) = self.perlin.noise_coords(min_x + i, y);
                let fbm = sampler.fbm(nx, ny, self.octaves, persistence);
                *cell = fbm as f32 * self.height_scale;
            }
        }
    }
}

/// Uniform random heights in `[min_height, max_height)`, hashed per cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RandomParams {
    pub min_height: f32,
    pub max_height: f32,
    pub seed: u64,
}

impl Default for RandomParams {
    fn default() -> Self {
        Self {
            min_height: 0.0,
            max_height: 1.0,
            seed: 0,
        }
    }
}

impl TileGenerator for RandomParams {
    fn generate(&self, tile: &mut TileViewMut<'_>) {
        let min_x = tile.partition().min_x;
        let span = self.max_height - self.min_height;
        for (y, row) in tile.rows_mut() {
            for (i, cell) in row.iter_mut().enumerate() {
                *cell = self.min_height + cell_unit(self.seed, min_x + i, y) * span;
            }
        }
    }
}

/// Diamond-square midpoint displacement.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MidpointParams {
    /// Lower bound of the first level's random offset.
    pub height_min: f32,
    /// Upper bound of the first level's random offset.
    pub height_max: f32,
    /// Base of the per-level decay `dampening^(-roughness)`.
    pub dampening: f32,
    /// Exponent of the per-level decay.
    pub roughness: f32,
    /// Seed of the offset stream.
    pub seed: u64,
}

impl Default for MidpointParams {
    fn default() -> Self {
        Self {
            height_min: -2.0,
            height_max: 2.0,
            dampening: 2.0,
            roughness: 2.0,
            seed: 0,
        }
    }
}

impl MidpointParams {
    /// Run diamond-square over the whole grid.
    ///
    /// Corners start at whatever the grid holds. Each level first sets the
    /// centre of every square to the mean of its corners plus an offset,
    /// then runs the diamond step. The offset range shrinks by
    /// `dampening^(-roughness)` after each level.
    ///
    /// The diamond step skips a whole square, not just its outer edge
    /// midpoints, when its centre `(mx, my)` satisfies `mx <= size`,
    /// `my <= size`, `mx + size >= width - 1` or `my + size >= width - 1`
    /// (`width = resolution - 1`). This is the reference rule. Squares
    /// touching the border never get edge midpoints from this step, and at
    /// small resolutions (5 included) the diamond step writes nothing.
    pub fn displace(&self, grid: &mut HeightGrid) {
        let resolution = grid.resolution();
        if resolution < 2 {
            return;
        }

        let width = resolution - 1;
        let damper = det_powf(self.dampening, -self.roughness);
        let mut height_min = self.height_min;
        let mut height_max = self.height_max;
        let mut square = width;
        let mut rng = pass_rng(self.seed);
        let mut offset = |lo: f32, hi: f32| lo + rng.random::<f32>() * (hi - lo);

        while square > 0 {
            let half = square / 2;
            let origins = move || (0..width).step_by(square).filter(move |o| o + square <= width);

            // Square step. At size 1 the midpoint coincides with the origin.
            for x in origins() {
                for y in origins() {
                    let (cx, cy) = (x + square, y + square);
                    let mean =
                        (grid.get(x, y) + grid.get(cx, y) + grid.get(x, cy) + grid.get(cx, cy))
                            / 4.0;
                    grid.set(x + half, y + half, mean + offset(height_min, height_max));
                }
            }

            // Diamond step.
            for x in origins() {
                for y in origins() {
                    let (cx, cy) = (x + square, y + square);
                    let (mx, my) = (x + half, y + half);
                    if mx <= square
                        || my <= square
                        || mx + square >= width - 1
                        || my + square >= width - 1
                    {
                        continue;
                    }
                    let (left, right) = (mx - square, mx + square);
                    let (down, up) = (my - square, my + square);

                    let bottom = (grid.get(mx, my) + grid.get(x, y) + grid.get(mx, down)
                        + grid.get(cx, y))
                        / 4.0;
                    grid.set(mx, y, bottom + offset(height_min, height_max));

                    let top = (grid.get(x, cy) + grid.get(mx, my) + grid.get(cx, cy)
                        + grid.get(mx, up))
                        / 4.0;
                    grid.set(mx, cy, top + offset(height_min, height_max));

                    let west = (grid.get(x, y) + grid.get(left, my) + grid.get(x, cy)
                        + grid.get(mx, my))
                        / 4.0;
                    grid.set(x, my, west + offset(height_min, height_max));

                    let east = (grid.get(cx, y) + grid.get(mx, my) + grid.get(cx, cy)
                        + grid.get(right, my))
                        / 4.0;
                    grid.set(cx, my, east + offset(height_min, height_max));
                }
            }

            square /= 2;
            height_min *= damper;
            height_max *= damper;
        }
    }
}

/// Parameters for one generation pass, one variant per algorithm.
#[derive(Clone, Debug, PartialEq)]
pub enum GenerationParams {
    ImageHeight(ImageParams),
    Perlin(PerlinParams),
    PerlinFbm(FbmParams),
    MidpointDisplacement(MidpointParams),
    RandomHeights(RandomParams),
}

impl GenerationParams {
    /// The algorithm this variant selects.
    pub fn algorithm(&self) -> Algorithm {
        match self {
            GenerationParams::ImageHeight(_) => Algorithm::Heightmap,
            GenerationParams::Perlin(_) => Algorithm::Perlin,
            GenerationParams::PerlinFbm(_) => Algorithm::PerlinFbm,
            GenerationParams::MidpointDisplacement(_) => Algorithm::MidpointDisplacement,
            GenerationParams::RandomHeights(_) => Algorithm::Random,
        }
    }

    /// Whether the algorithm may run independently over disjoint tiles.
    pub fn supports_partitioning(&self) -> bool {
        self.tile_generator().is_some()
    }

    /// The per-tile implementation, or `None` for full-grid-only algorithms.
    pub fn tile_generator(&self) -> Option<&dyn TileGenerator> {
        match self {
            GenerationParams::ImageHeight(p) => Some(p),
            GenerationParams::Perlin(p) => Some(p),
            GenerationParams::PerlinFbm(p) => Some(p),
            GenerationParams::RandomHeights(p) => Some(p),
            GenerationParams::MidpointDisplacement(_) => None,
        }
    }

    /// Reject parameters that would produce non-finite heights or read
    /// outside the supplied inputs.
    pub fn validate(&self, resolution: usize) -> Result<(), TerrainError> {
        match self {
            GenerationParams::ImageHeight(p) => {
                if p.greyscale.resolution() != resolution {
                    return Err(TerrainError::DimensionMismatch {
                        what: "greyscale resolution",
                        expected: resolution,
                        actual: p.greyscale.resolution(),
                    });
                }
                finite("height_scale", p.height_scale)
            }
            GenerationParams::Perlin(p) => validate_perlin(p),
            GenerationParams::PerlinFbm(p) => {
                validate_perlin(&p.perlin)?;
                finite("height_scale", p.height_scale)?;
                if p.octaves == 0 || p.octaves > MAX_OCTAVES {
                    return Err(TerrainError::InvalidParameters(format!(
                        "octaves must be in 1..={MAX_OCTAVES}, got {}",
                        p.octaves
                    )));
                }
                if !(p.persistence.is_finite() && p.persistence > 0.0) {
                    return Err(TerrainError::InvalidParameters(format!(
                        "persistence must be positive, got {}",
                        p.persistence
                    )));
                }
                Ok(())
            }
            GenerationParams::MidpointDisplacement(p) => {
                finite("height_min", p.height_min)?;
                finite("height_max", p.height_max)?;
                finite("roughness", p.roughness)?;
                ordered(p.height_min, p.height_max)?;
                if !(p.dampening.is_finite() && p.dampening > 0.0) {
                    return Err(TerrainError::InvalidParameters(format!(
                        "dampening must be positive, got {}",
                        p.dampening
                    )));
                }
                Ok(())
            }
            GenerationParams::RandomHeights(p) => {
                finite("min_height", p.min_height)?;
                finite("max_height", p.max_height)?;
                ordered(p.min_height, p.max_height)
            }
        }
    }

    /// Fill every cell of `grid` on the calling thread.
    pub fn generate_full(&self, grid: &mut HeightGrid) -> Result<(), TerrainError> {
        match self.tile_generator() {
            Some(generator) => {
                let resolution = grid.resolution();
                let tiles = split_tiles_mut(
                    grid.cells_mut(),
                    resolution,
                    resolution,
                    1,
                    TileLayout::SINGLE,
                )?;
                for mut tile in tiles {
                    generator.generate(&mut tile);
                }
                Ok(())
            }
            None => {
                if let GenerationParams::MidpointDisplacement(p) = self {
                    p.displace(grid);
                }
                Ok(())
            }
        }
    }
}

fn validate_perlin(p: &PerlinParams) -> Result<(), TerrainError> {
    finite("scale_x", p.scale_x)?;
    finite("scale_y", p.scale_y)
}

fn finite(name: &str, value: f32) -> Result<(), TerrainError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(TerrainError::InvalidParameters(format!(
            "{name} must be finite, got {value}"
        )))
    }
}

fn ordered(min: f32, max: f32) -> Result<(), TerrainError> {
    if min <= max {
        Ok(())
    } else {
        Err(TerrainError::InvalidParameters(format!(
            "minimum {min} exceeds maximum {max}"
        )))
    }
}
