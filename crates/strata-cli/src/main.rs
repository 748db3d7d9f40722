//! `strata`: generate one heightfield and write PNG previews.
//!
//! Configuration is loaded from `config.ron` and can be overridden via CLI flags.
//! Run with `cargo run -p strata-cli -- --algorithm perlin-fbm --output out`.

mod error;
mod preview;
mod sampling;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use strata_config::{CliArgs, Config, default_config_dir};
use strata_terrain::{Algorithm, GenerationRequest, HeightfieldDriver};
use tracing::{error, info};

use crate::error::CliError;

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let config_dir = args
        .config
        .clone()
        .or_else(default_config_dir)
        .unwrap_or_else(|| PathBuf::from(".strata"));

    // Load or create config, then apply CLI overrides
    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.join("logs");
    if let Err(e) = strata_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config))
    {
        eprintln!("Failed to initialise logging: {e}");
    }

    match run(&config, &args.output) {
        Ok(written) => {
            for path in written {
                info!(path = %path.display(), "wrote preview");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(%err, "strata run failed");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config, output_dir: &Path) -> Result<Vec<PathBuf>, CliError> {
    let request = build_request(config)?;
    info!(
        algorithm = %request.params.algorithm(),
        resolution = request.resolution,
        threading = ?request.threading,
        "starting generation pass"
    );

    let output = HeightfieldDriver::new().run(&request)?;
    let (lo, hi) = output.heights.min_max();
    info!(
        workers = output.workers.get(),
        partitioned = output.partitioned,
        elapsed_ms = output.elapsed.as_millis() as u64,
        min_height = lo,
        max_height = hi,
        "heightfield ready"
    );

    preview::write_previews(output_dir, &output.heights, output.splat.as_ref())
}

fn build_request(config: &Config) -> Result<GenerationRequest, CliError> {
    config.validate()?;
    let resolution = config.engine.resolution;

    let greyscale = match (&config.algorithm.heightmap.image, config.algorithm.selected) {
        (Some(path), Algorithm::Heightmap) => {
            let scale = config.algorithm.heightmap.scale;
            Some(sampling::load_greyscale(path, resolution, scale.x, scale.z)?)
        }
        _ => None,
    };

    let mut request = GenerationRequest::new(resolution, config.generation_params(greyscale)?)
        .with_threading(config.engine.threading());
    if let Some(splat) = config.splat_request() {
        request = request.with_splat(splat);
    }
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_terrain::{GenerationParams, Threading};

    #[test]
    fn test_request_from_default_config() {
        let request = build_request(&Config::default()).unwrap();
        assert_eq!(request.resolution, 513);
        assert_eq!(request.threading, Threading::Auto);
        assert!(matches!(request.params, GenerationParams::Perlin(_)));
        assert_eq!(request.splat.map(|s| s.layer_count), Some(1));
    }

    #[test]
    fn test_heightmap_without_image_is_rejected() {
        let mut config = Config::default();
        config.algorithm.selected = Algorithm::Heightmap;
        assert!(matches!(build_request(&config), Err(CliError::Config(_))));
    }

    #[test]
    fn test_run_writes_previews() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.engine.resolution = 33;
        config.engine.alphamap_width = 32;
        config.engine.alphamap_height = 32;
        config.algorithm.selected = Algorithm::Random;

        let written = run(&config, dir.path()).unwrap();
        assert_eq!(written.len(), 2);
        assert!(dir.path().join(preview::HEIGHTS_FILE).exists());
        assert!(dir.path().join(preview::SPLAT_FILE).exists());
    }

    #[test]
    fn test_resolution_flag_runs_with_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let args = CliArgs::try_parse_from(["strata", "--resolution", "129"]).unwrap();
        let mut config = Config::default();
        config.apply_cli_overrides(&args);

        let written = run(&config, dir.path()).unwrap();
        assert_eq!(written.len(), 2);
        assert!(dir.path().join(preview::HEIGHTS_FILE).exists());
        assert!(dir.path().join(preview::SPLAT_FILE).exists());
    }

    #[test]
    fn test_oversized_alphamap_in_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.engine.resolution = 17;
        assert!(matches!(
            run(&config, dir.path()),
            Err(CliError::Config(_))
        ));
    }
}
