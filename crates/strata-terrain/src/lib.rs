//! Parallel heightfield synthesis: grid partitioning, height generation
//! algorithms, a tile-per-worker driver, and splat map derivation.

mod driver;
mod error;
mod generators;
mod grid;
mod heightmap;
mod partition;
mod seed;
mod splat;
mod workers;

pub use driver::{GenerationRequest, HeightfieldDriver, PassOutput, PassState, Threading};
pub use error::TerrainError;
pub use generators::{
    Algorithm, FbmParams, GenerationParams, ImageParams, MidpointParams, PerlinParams,
    RandomParams, TileGenerator,
};
pub use grid::{GreyscaleGrid, HeightGrid};
pub use heightmap::{MAX_OCTAVES, PERLIN_SEED, PerlinSampler, amplitude_total};
pub use partition::{
    Partition, TileLayout, TileViewMut, WorkerCount, partitions, partitions_rect,
    split_tiles_mut, tile_bounds, tile_bounds_rect, tile_layout,
};
pub use seed::{cell_unit, derive_cell_seed};
pub use splat::{
    SplatLayer, SplatRequest, SplatWeights, TextureHandle, derive_splat,
    derive_splat_partitioned, normalize_weights,
};
pub use workers::TileReport;
