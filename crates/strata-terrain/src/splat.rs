//! Splat map derivation: per-cell layer weights from height bands.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::TerrainError;
use crate::grid::HeightGrid;
use crate::partition::{TileLayout, TileViewMut, split_tiles_mut};
use crate::workers::run_tiles;

/// Opaque reference to the texture a layer paints with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextureHandle(pub u32);

/// A ground-cover layer applied to heights within `[min_height, max_height]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplatLayer {
    /// Lowest height covered by this layer (inclusive).
    pub min_height: f32,
    /// Highest height covered by this layer (inclusive).
    pub max_height: f32,
    /// Texture placement offset.
    pub tile_offset: Vec2,
    /// Texture tiling size in world units.
    pub tile_size: Vec2,
    /// Texture painted by this layer.
    pub texture: TextureHandle,
}

impl SplatLayer {
    /// Returns `true` if `height` falls inside the closed band.
    pub fn contains(&self, height: f32) -> bool {
        height >= self.min_height && height <= self.max_height
    }
}

impl Default for SplatLayer {
    fn default() -> Self {
        Self {
            min_height: 0.1,
            max_height: 0.2,
            tile_offset: Vec2::ZERO,
            tile_size: Vec2::new(50.0, 50.0),
            texture: TextureHandle::default(),
        }
    }
}

/// Dimensions and layers of a splat map to derive.
#[derive(Clone, Debug, PartialEq)]
pub struct SplatRequest {
    /// Alphamap width; must not exceed the height grid resolution.
    pub width: usize,
    /// Alphamap height; must not exceed the height grid resolution.
    pub height: usize,
    /// Channels per cell; at least `layers.len()`.
    pub layer_count: usize,
    /// Layers in channel order.
    pub layers: Vec<SplatLayer>,
}

impl SplatRequest {
    /// A request with one channel per layer.
    pub fn new(width: usize, height: usize, layers: Vec<SplatLayer>) -> Self {
        Self {
            width,
            height,
            layer_count: layers.len(),
            layers,
        }
    }

    /// Check the request against a height grid resolution.
    pub fn validate(&self, resolution: usize) -> Result<(), TerrainError> {
        if self.width > resolution {
            return Err(TerrainError::DimensionMismatch {
                what: "alphamap width",
                expected: resolution,
                actual: self.width,
            });
        }
        if self.height > resolution {
            return Err(TerrainError::DimensionMismatch {
                what: "alphamap height",
                expected: resolution,
                actual: self.height,
            });
        }
        if self.layer_count < self.layers.len() {
            return Err(TerrainError::DimensionMismatch {
                what: "alphamap layer count",
                expected: self.layers.len(),
                actual: self.layer_count,
            });
        }
        Ok(())
    }
}

/// Layer weights stored as `[(y * width + x) * layer_count + layer]`.
#[derive(Clone, Debug, PartialEq)]
pub struct SplatWeights {
    width: usize,
    height: usize,
    layer_count: usize,
    weights: Vec<f32>,
}

impl SplatWeights {
    /// Create an all-zero weight map.
    pub fn new(width: usize, height: usize, layer_count: usize) -> Self {
        Self {
            width,
            height,
            layer_count,
            weights: vec![0.0; width * height * layer_count],
        }
    }

    /// Returns `(width, height)`.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn layer_count(&self) -> usize {
        self.layer_count
    }

    /// Weight vector of cell `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `x >= width` or `y >= height`.
    pub fn cell(&self, x: usize, y: usize) -> &[f32] {
        assert!(x < self.width && y < self.height);
        let start = (y * self.width + x) * self.layer_count;
        &self.weights[start..start + self.layer_count]
    }

    /// All weights in storage order.
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Index of the heaviest layer at `(x, y)`, or `None` if no band matched.
    pub fn dominant_layer(&self, x: usize, y: usize) -> Option<usize> {
        self.cell(x, y)
            .iter()
            .enumerate()
            .filter(|&(_, &w)| w > 0.0)
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
    }

    /// Number of cells whose weights are all zero.
    pub fn uncovered_cells(&self) -> usize {
        if self.layer_count == 0 {
            return self.width * self.height;
        }
        self.weights
            .chunks_exact(self.layer_count)
            .filter(|cell| cell.iter().all(|&w| w == 0.0))
            .count()
    }
}

/// Scale `weights` so they sum to 1. A zero vector is left as is.
pub fn normalize_weights(weights: &mut [f32]) {
    let total: f32 = weights.iter().sum();
    if total > 0.0 {
        for w in weights.iter_mut() {
            *w /= total;
        }
    }
}

/// Derive the weight map on the calling thread.
pub fn derive_splat(
    heights: &HeightGrid,
    request: &SplatRequest,
) -> Result<SplatWeights, TerrainError> {
    request.validate(heights.resolution())?;
    let mut splat = SplatWeights::new(request.width, request.height, request.layer_count);
    if request.layer_count > 0 {
        let tiles = split_tiles_mut(
            &mut splat.weights,
            request.width,
            request.height,
            request.layer_count,
            TileLayout::SINGLE,
        )?;
        for mut tile in tiles {
            fill_tile(heights, &request.layers, &mut tile);
        }
    }
    report_uncovered(&splat);
    Ok(splat)
}

/// Derive the weight map with one worker per alphamap tile.
///
/// Produces exactly the same weights as [`derive_splat`].
pub fn derive_splat_partitioned(
    heights: &HeightGrid,
    request: &SplatRequest,
    layout: TileLayout,
) -> Result<SplatWeights, TerrainError> {
    request.validate(heights.resolution())?;
    let mut splat = SplatWeights::new(request.width, request.height, request.layer_count);
    if request.layer_count > 0 {
        let tiles = split_tiles_mut(
            &mut splat.weights,
            request.width,
            request.height,
            request.layer_count,
            layout,
        )?;
        run_tiles(tiles, |tile| {
            fill_tile(heights, &request.layers, tile);
            Ok(())
        })?;
    }
    report_uncovered(&splat);
    Ok(splat)
}

fn fill_tile(heights: &HeightGrid, layers: &[SplatLayer], tile: &mut TileViewMut<'_>) {
    let min_x = tile.partition().min_x;
    let stride = tile.stride();
    for (y, row) in tile.rows_mut() {
        for (i, cell) in row.chunks_exact_mut(stride).enumerate() {
            let height = heights.get(min_x + i, y);
            for (weight, layer) in cell.iter_mut().zip(layers) {
                *weight = if layer.contains(height) { 1.0 } else { 0.0 };
            }
            normalize_weights(cell);
        }
    }
}

fn report_uncovered(splat: &SplatWeights) {
    let uncovered = splat.uncovered_cells();
    if uncovered > 0 {
        tracing::warn!(
            uncovered,
            total = splat.width * splat.height,
            "splat cells outside every layer band"
        );
    }
}
