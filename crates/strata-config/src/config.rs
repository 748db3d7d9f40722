//! Configuration structs with defaults, RON persistence, and conversion into
//! engine requests.

use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};
use strata_terrain::{
    Algorithm, FbmParams, GenerationParams, GreyscaleGrid, ImageParams, MidpointParams,
    PerlinParams, RandomParams, SplatLayer, SplatRequest, Threading,
};

use crate::error::ConfigError;

const CONFIG_FILE: &str = "config.ron";

/// Platform config directory for Strata, e.g. `~/.config/strata` on Linux.
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("strata"))
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Grid size and threading.
    pub engine: EngineConfig,
    /// Selected algorithm and the tunables of every algorithm.
    pub algorithm: AlgorithmConfig,
    /// Splat layers in channel order. Empty disables splat derivation.
    pub splat: Vec<SplatLayer>,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            algorithm: AlgorithmConfig::default(),
            splat: vec![SplatLayer::default()],
            debug: DebugConfig::default(),
        }
    }
}

/// Grid and worker settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Side length of the height grid.
    pub resolution: usize,
    /// Split generation across worker threads.
    pub threaded: bool,
    /// Concurrency level used instead of the logical CPU count.
    pub worker_override: Option<usize>,
    /// Splat map width in cells.
    pub alphamap_width: usize,
    /// Splat map height in cells.
    pub alphamap_height: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            resolution: 513,
            threaded: true,
            worker_override: None,
            alphamap_width: 512,
            alphamap_height: 512,
        }
    }
}

impl EngineConfig {
    pub fn threading(&self) -> Threading {
        match (self.threaded, self.worker_override) {
            (false, _) => Threading::Unthreaded,
            (true, Some(n)) => Threading::Available(n),
            (true, None) => Threading::Auto,
        }
    }
}

/// Algorithm selection plus per-algorithm settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AlgorithmConfig {
    pub selected: Algorithm,
    pub heightmap: HeightmapConfig,
    pub perlin: PerlinConfig,
    pub fbm: FbmConfig,
    pub midpoint: MidpointConfig,
    pub random: RandomConfig,
}

/// Heights from a greyscale image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HeightmapConfig {
    /// Image to sample. Required when the heightmap algorithm is selected.
    pub image: Option<PathBuf>,
    /// `x` and `z` scale the sampling position, `y` scales the height.
    pub scale: Vec3,
}

impl Default for HeightmapConfig {
    fn default() -> Self {
        Self {
            image: None,
            scale: Vec3::ONE,
        }
    }
}

/// Perlin sampling position. Shared by plain Perlin and fBm.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PerlinConfig {
    pub offset_x: i32,
    pub offset_y: i32,
    pub scale_x: f32,
    pub scale_y: f32,
}

impl Default for PerlinConfig {
    fn default() -> Self {
        Self {
            offset_x: 0,
            offset_y: 0,
            scale_x: 0.01,
            scale_y: 0.01,
        }
    }
}

impl PerlinConfig {
    pub fn params(&self) -> PerlinParams {
        PerlinParams {
            offset_x: self.offset_x,
            scale_x: self.scale_x,
            offset_y: self.offset_y,
            scale_y: self.scale_y,
        }
    }
}

/// Fractal Brownian motion settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FbmConfig {
    pub octaves: u32,
    pub persistence: f32,
    pub height_scale: f32,
}

impl Default for FbmConfig {
    fn default() -> Self {
        Self {
            octaves: 3,
            persistence: 8.0,
            height_scale: 0.09,
        }
    }
}

/// Midpoint displacement settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MidpointConfig {
    pub height_min: f32,
    pub height_max: f32,
    pub dampening: f32,
    pub roughness: f32,
    pub seed: u64,
}

impl Default for MidpointConfig {
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

/// Uniform random heights.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RandomConfig {
    pub min_height: f32,
    pub max_height: f32,
    pub seed: u64,
}

impl Default for RandomConfig {
    fn default() -> Self {
        Self {
            min_height: 0.0,
            max_height: 1.0,
            seed: 0,
        }
    }
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

// --- Engine requests ---

impl Config {
    /// Check settings the engine would otherwise reject mid-run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.resolution == 0 {
            return Err(ConfigError::InvalidValue {
                field: "engine.resolution",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.engine.worker_override == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "engine.worker_override",
                reason: "must be at least 1".to_string(),
            });
        }
        for (field, size) in [
            ("engine.alphamap_width", self.engine.alphamap_width),
            ("engine.alphamap_height", self.engine.alphamap_height),
        ] {
            if !self.splat.is_empty() && size > self.engine.resolution {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: format!(
                        "{size} exceeds the grid resolution {}",
                        self.engine.resolution
                    ),
                });
            }
        }
        if self.algorithm.selected == Algorithm::Heightmap && self.algorithm.heightmap.image.is_none()
        {
            return Err(ConfigError::InvalidValue {
                field: "algorithm.heightmap.image",
                reason: "an image is required for the heightmap algorithm".to_string(),
            });
        }
        Ok(())
    }

    /// Parameters for the selected algorithm.
    ///
    /// `greyscale` is only consulted by the heightmap algorithm, which fails
    /// without it.
    pub fn generation_params(
        &self,
        greyscale: Option<GreyscaleGrid>,
    ) -> Result<GenerationParams, ConfigError> {
        let algorithm = &self.algorithm;
        let params = match algorithm.selected {
            Algorithm::Heightmap => {
                let greyscale = greyscale.ok_or_else(|| ConfigError::InvalidValue {
                    field: "algorithm.heightmap.image",
                    reason: "no greyscale samples were supplied".to_string(),
                })?;
                GenerationParams::ImageHeight(ImageParams {
                    greyscale,
                    height_scale: algorithm.heightmap.scale.y,
                })
            }
            Algorithm::Perlin => GenerationParams::Perlin(algorithm.perlin.params()),
            Algorithm::PerlinFbm => GenerationParams::PerlinFbm(FbmParams {
                perlin: algorithm.perlin.params(),
                octaves: algorithm.fbm.octaves,
                persistence: algorithm.fbm.persistence,
                height_scale: algorithm.fbm.height_scale,
            }),
            Algorithm::MidpointDisplacement => {
                let m = &algorithm.midpoint;
                GenerationParams::MidpointDisplacement(MidpointParams {
                    height_min: m.height_min,
                    height_max: m.height_max,
                    dampening: m.dampening,
                    roughness: m.roughness,
                    seed: m.seed,
                })
            }
            Algorithm::Random => GenerationParams::RandomHeights(RandomParams {
                min_height: algorithm.random.min_height,
                max_height: algorithm.random.max_height,
                seed: algorithm.random.seed,
            }),
        };
        Ok(params)
    }

    /// The splat request for the configured layers, or `None` when there are none.
    pub fn splat_request(&self) -> Option<SplatRequest> {
        if self.splat.is_empty() {
            return None;
        }
        Some(SplatRequest::new(
            self.engine.alphamap_width,
            self.engine.alphamap_height,
            self.splat.clone(),
        ))
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let config = Self::read(&config_path)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(|source| ConfigError::Write {
            path: config_dir.to_path_buf(),
            source,
        })?;

        let config_path = config_dir.join(CONFIG_FILE);
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(4)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized = ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::Serialize)?;

        std::fs::write(&config_path, serialized).map_err(|source| ConfigError::Write {
            path: config_path.clone(),
            source,
        })?;
        Ok(())
    }

    /// Returns `Some(new_config)` if the file on disk differs from `self`.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let new_config = Self::read(&config_dir.join(CONFIG_FILE))?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        ron::from_str(&contents).map_err(ConfigError::Parse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_engine_tunables() {
        let config = Config::default();
        assert_eq!(config.engine.resolution, 513);
        assert_eq!(config.engine.threading(), Threading::Auto);
        assert_eq!(config.algorithm.selected, Algorithm::Perlin);
        assert_eq!(config.algorithm.fbm.octaves, 3);
        assert_eq!(config.algorithm.heightmap.scale, Vec3::ONE);
        assert_eq!(config.splat, vec![SplatLayer::default()]);
        assert_eq!(config.debug.log_level, "info");
    }

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(4))
                .unwrap();
        assert!(ron_str.contains("resolution: 513"));
        assert!(ron_str.contains("selected: Perlin"));
    }

    #[test]
    fn test_missing_section_uses_default() {
        let ron_str = "(engine: (resolution: 129))";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.engine.resolution, 129);
        assert!(config.engine.threaded);
        assert_eq!(config.algorithm, AlgorithmConfig::default());
    }

    #[test]
    fn test_extra_field_ignored() {
        let result: Result<Config, _> = ron::from_str("(future_setting: true)");
        assert!(result.is_ok());
    }

    #[test]
    fn test_splat_layers_parse_with_defaults() {
        let ron_str = "(splat: [(min_height: 0.0, max_height: 0.5), (max_height: 0.9)])";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.splat.len(), 2);
        assert_eq!(config.splat[0].max_height, 0.5);
        assert_eq!(config.splat[1].min_height, 0.1);
        assert_eq!(config.splat[1].tile_size, SplatLayer::default().tile_size);

        let request = config.splat_request().unwrap();
        assert_eq!((request.width, request.height), (512, 512));
        assert_eq!(request.layer_count, 2);
    }

    #[test]
    fn test_no_layers_means_no_splat() {
        let mut config = Config::default();
        assert!(config.splat_request().is_some());
        config.splat.clear();
        assert!(config.splat_request().is_none());
    }

    #[test]
    fn test_threading_from_engine_settings() {
        let mut engine = EngineConfig::default();
        engine.worker_override = Some(6);
        assert_eq!(engine.threading(), Threading::Available(6));
        engine.threaded = false;
        assert_eq!(engine.threading(), Threading::Unthreaded);
    }

    #[test]
    fn test_generation_params_follow_selection() {
        let mut config = Config::default();
        config.algorithm.selected = Algorithm::PerlinFbm;
        config.algorithm.perlin.scale_x = 0.5;
        let params = config.generation_params(None).unwrap();
        let GenerationParams::PerlinFbm(fbm) = params else {
            panic!("expected fbm params");
        };
        assert_eq!(fbm.perlin.scale_x, 0.5);
        assert_eq!(fbm.persistence, 8.0);

        config.algorithm.selected = Algorithm::Random;
        config.algorithm.random.seed = 9;
        assert!(matches!(
            config.generation_params(None),
            Ok(GenerationParams::RandomHeights(RandomParams { seed: 9, .. }))
        ));
    }

    #[test]
    fn test_heightmap_requires_samples() {
        let mut config = Config::default();
        config.algorithm.selected = Algorithm::Heightmap;
        config.algorithm.heightmap.scale = Vec3::new(1.0, 0.25, 1.0);
        assert!(matches!(
            config.generation_params(None),
            Err(ConfigError::InvalidValue { .. })
        ));

        let greyscale = GreyscaleGrid::from_fn(3, |_, _| 1.0);
        let Ok(GenerationParams::ImageHeight(image)) = config.generation_params(Some(greyscale))
        else {
            panic!("expected image params");
        };
        assert_eq!(image.height_scale, 0.25);
    }

    #[test]
    fn test_validate_rejects_unusable_values() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.engine.worker_override = Some(0);
        assert!(config.validate().is_err());
        config.engine.worker_override = None;

        config.algorithm.selected = Algorithm::Heightmap;
        assert!(config.validate().is_err());
        config.algorithm.heightmap.image = Some(PathBuf::from("terrain.png"));
        assert!(config.validate().is_ok());

        config.engine.resolution = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_alphamap_larger_than_grid() {
        let mut config = Config::default();
        config.engine.resolution = 257;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "engine.alphamap_width",
                ..
            })
        ));

        config.engine.alphamap_width = 256;
        config.engine.alphamap_height = 256;
        assert!(config.validate().is_ok());

        // Without layers no splat map is derived, so the size is irrelevant.
        config.engine.alphamap_height = 4096;
        config.splat.clear();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.engine.resolution = 257;
        config.algorithm.selected = Algorithm::MidpointDisplacement;
        config.splat.push(SplatLayer {
            min_height: 0.5,
            max_height: 1.0,
            ..Default::default()
        });

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join(CONFIG_FILE).exists());
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();
        assert!(config.reload(dir.path()).unwrap().is_none());

        let mut modified = config.clone();
        modified.engine.threaded = false;
        modified.save(dir.path()).unwrap();

        let reloaded = config.reload(dir.path()).unwrap().unwrap();
        assert!(!reloaded.engine.threaded);
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{{not valid}}").unwrap();
        assert!(matches!(
            Config::load_or_create(dir.path()),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_reload_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Config::default().reload(dir.path()),
            Err(ConfigError::Read { .. })
        ));
    }
}
