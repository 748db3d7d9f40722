//! Error types for heightfield generation.

/// Errors returned by partitioning, generation, and splat derivation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TerrainError {
    /// A tile index outside `[0, rows * cols)` was requested.
    #[error("tile index {index} is outside the partition grid of {tiles} tiles")]
    InvalidTileIndex {
        /// The requested tile index.
        index: usize,
        /// Number of tiles in the layout.
        tiles: usize,
    },

    /// A worker count that cannot be mapped onto a supported tile layout.
    #[error("worker count {0} is not supported")]
    InvalidWorkerCount(usize),

    /// A supplied buffer disagrees with the dimensions of the pass.
    #[error("{what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// What was being measured.
        what: &'static str,
        /// The size required by the pass.
        expected: usize,
        /// The size actually supplied.
        actual: usize,
    },

    /// A partition task failed or panicked during generation.
    #[error("tile {tile} failed: {message}")]
    TaskFailure {
        /// Index of the failing tile.
        tile: usize,
        /// Panic payload or error text from the task.
        message: String,
    },

    /// Algorithm parameters that cannot produce finite heights.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// A pass was started while another pass is still running.
    #[error("a generation pass is already running")]
    PassInProgress,
}
