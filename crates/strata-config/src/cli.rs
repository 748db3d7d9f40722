//! Command-line argument parsing for the `strata` binary.

use std::path::PathBuf;

use clap::Parser;
use strata_terrain::Algorithm;

use crate::Config;

/// Strata command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "strata", about = "Parallel heightfield synthesis")]
pub struct CliArgs {
    /// Generation algorithm (heightmap, perlin, perlin-fbm, midpoint-displacement, random).
    #[arg(long)]
    pub algorithm: Option<Algorithm>,

    /// Side length of the height grid.
    #[arg(long)]
    pub resolution: Option<usize>,

    /// Concurrency level used instead of the logical CPU count.
    #[arg(long, conflicts_with = "no_threads")]
    pub threads: Option<usize>,

    /// Generate on the calling thread only.
    #[arg(long)]
    pub no_threads: bool,

    /// Greyscale image for the heightmap algorithm.
    #[arg(long)]
    pub heightmap: Option<PathBuf>,

    /// Directory that receives the PNG previews.
    #[arg(long, default_value = ".")]
    pub output: PathBuf,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(algorithm) = args.algorithm {
            self.algorithm.selected = algorithm;
        }
        if let Some(resolution) = args.resolution {
            self.engine.resolution = resolution;
            // Keep the splat map inside the shrunken grid.
            let limit = resolution.saturating_sub(1).max(1);
            self.engine.alphamap_width = self.engine.alphamap_width.min(limit);
            self.engine.alphamap_height = self.engine.alphamap_height.min(limit);
        }
        if let Some(threads) = args.threads {
            self.engine.threaded = true;
            self.engine.worker_override = Some(threads);
        }
        if args.no_threads {
            self.engine.threaded = false;
        }
        if let Some(ref image) = args.heightmap {
            self.algorithm.heightmap.image = Some(image.clone());
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_terrain::Threading;

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            algorithm: Some(Algorithm::MidpointDisplacement),
            threads: Some(8),
            heightmap: Some(PathBuf::from("island.png")),
            ..Default::default()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.algorithm.selected, Algorithm::MidpointDisplacement);
        assert_eq!(config.engine.threading(), Threading::Available(8));
        assert_eq!(
            config.algorithm.heightmap.image,
            Some(PathBuf::from("island.png"))
        );
        // Non-overridden fields retain defaults
        assert_eq!(config.engine.resolution, 513);
        assert_eq!(config.debug.log_level, "info");
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&CliArgs::default());
        assert_eq!(config, original);
    }

    #[test]
    fn test_parse_flags() {
        let args = CliArgs::try_parse_from([
            "strata",
            "--algorithm",
            "perlin-fbm",
            "--resolution",
            "129",
            "--no-threads",
            "--output",
            "out",
        ])
        .unwrap();
        assert_eq!(args.algorithm, Some(Algorithm::PerlinFbm));
        assert_eq!(args.resolution, Some(129));
        assert!(args.no_threads);
        assert_eq!(args.output, PathBuf::from("out"));

        let mut config = Config::default();
        config.apply_cli_overrides(&args);
        assert_eq!(config.engine.threading(), Threading::Unthreaded);
    }

    #[test]
    fn test_resolution_override_shrinks_alphamap() {
        let args = CliArgs::try_parse_from(["strata", "--resolution", "129"]).unwrap();
        let mut config = Config::default();
        config.apply_cli_overrides(&args);
        assert_eq!(config.engine.resolution, 129);
        assert_eq!(config.engine.alphamap_width, 128);
        assert_eq!(config.engine.alphamap_height, 128);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_resolution_override_keeps_smaller_alphamap() {
        let mut config = Config::default();
        config.engine.alphamap_width = 64;
        config.engine.alphamap_height = 32;
        config.apply_cli_overrides(&CliArgs {
            resolution: Some(1025),
            ..Default::default()
        });
        assert_eq!(config.engine.alphamap_width, 64);
        assert_eq!(config.engine.alphamap_height, 32);
    }

    #[test]
    fn test_unknown_algorithm_rejected() {
        assert!(CliArgs::try_parse_from(["strata", "--algorithm", "voronoi"]).is_err());
    }

    #[test]
    fn test_threads_conflicts_with_no_threads() {
        assert!(CliArgs::try_parse_from(["strata", "--threads", "4", "--no-threads"]).is_err());
    }
}
