use std::path::PathBuf;

use strata_config::ConfigError;
use strata_terrain::TerrainError;

/// Anything that stops a `strata` run.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("generation failed: {0}")]
    Terrain(#[from] TerrainError),

    #[error("failed to read heightmap {}: {source}", path.display())]
    ReadImage {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to write {}: {source}", path.display())]
    WriteImage {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to create output directory {}: {source}", path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
