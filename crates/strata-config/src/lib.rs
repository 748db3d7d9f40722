//! Configuration for Strata.
//!
//! Settings persist to disk as a RON file. Every section falls back to its
//! defaults when missing, unknown fields are ignored, and command-line flags
//! override whatever was loaded.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    AlgorithmConfig, Config, DebugConfig, EngineConfig, FbmConfig, HeightmapConfig,
    MidpointConfig, PerlinConfig, RandomConfig, default_config_dir,
};
pub use error::ConfigError;
