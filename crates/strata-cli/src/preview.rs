//! PNG previews of a finished pass.

use std::path::{Path, PathBuf};

use image::{ImageBuffer, Luma, Rgb, RgbImage};
use strata_terrain::{HeightGrid, SplatWeights};

use crate::error::CliError;

pub const HEIGHTS_FILE: &str = "heights.png";
pub const SPLAT_FILE: &str = "splat.png";

/// Colours for dominant layers, reused cyclically past the end.
const LAYER_PALETTE: [[u8; 3]; 8] = [
    [100, 180, 60],
    [220, 200, 130],
    [130, 110, 90],
    [30, 80, 200],
    [200, 210, 220],
    [30, 120, 30],
    [220, 190, 80],
    [180, 170, 60],
];

/// Cells no layer covers.
const UNCOVERED: [u8; 3] = [0, 0, 0];

/// Heights stretched over the full 16-bit range between the grid's min and max.
pub fn heights_image(heights: &HeightGrid) -> ImageBuffer<Luma<u16>, Vec<u16>> {
    let resolution = heights.resolution() as u32;
    let (lo, hi) = heights.min_max();
    let range = hi - lo;
    ImageBuffer::from_fn(resolution, resolution, |x, y| {
        let h = heights.get(x as usize, y as usize);
        let t = if range > 0.0 { (h - lo) / range } else { 0.0 };
        Luma([(t.clamp(0.0, 1.0) * u16::MAX as f32).round() as u16])
    })
}

/// One palette colour per cell, chosen by the heaviest layer.
pub fn splat_image(splat: &SplatWeights) -> RgbImage {
    let (width, height) = splat.dimensions();
    RgbImage::from_fn(width as u32, height as u32, |x, y| {
        let colour = splat
            .dominant_layer(x as usize, y as usize)
            .map_or(UNCOVERED, |layer| LAYER_PALETTE[layer % LAYER_PALETTE.len()]);
        Rgb(colour)
    })
}

/// Write `heights.png`, plus `splat.png` when a splat map was derived.
/// Returns the paths written.
pub fn write_previews(
    output_dir: &Path,
    heights: &HeightGrid,
    splat: Option<&SplatWeights>,
) -> Result<Vec<PathBuf>, CliError> {
    std::fs::create_dir_all(output_dir).map_err(|source| CliError::OutputDir {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let mut written = Vec::with_capacity(2);

    let heights_path = output_dir.join(HEIGHTS_FILE);
    heights_image(heights)
        .save(&heights_path)
        .map_err(|source| CliError::WriteImage {
            path: heights_path.clone(),
            source,
        })?;
    written.push(heights_path);

    if let Some(splat) = splat {
        let splat_path = output_dir.join(SPLAT_FILE);
        splat_image(splat)
            .save(&splat_path)
            .map_err(|source| CliError::WriteImage {
                path: splat_path.clone(),
                source,
            })?;
        written.push(splat_path);
    }

    Ok(written)
}
