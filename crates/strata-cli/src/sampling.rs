//! Greyscale sampling of heightmap images.

use std::path::Path;

use image::{DynamicImage, ImageBuffer, Luma};
use strata_terrain::GreyscaleGrid;

use crate::error::CliError;

type LumaF32Image = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Decode `path` and sample one greyscale value per height cell.
pub fn load_greyscale(
    path: &Path,
    resolution: usize,
    scale_x: f32,
    scale_z: f32,
) -> Result<GreyscaleGrid, CliError> {
    let image = image::open(path).map_err(|source| CliError::ReadImage {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        "decoded heightmap"
    );
    Ok(sample_greyscale(&image, resolution, scale_x, scale_z))
}

/// Cell `(x, z)` reads pixel `(x * scale_x, z * scale_z)`, clamped to the
/// image edges.
pub fn sample_greyscale(
    image: &DynamicImage,
    resolution: usize,
    scale_x: f32,
    scale_z: f32,
) -> GreyscaleGrid {
    let luma = image.to_luma32f();
    GreyscaleGrid::from_fn(resolution, |x, z| {
        let px = clamp_pixel(x as f32 * scale_x, luma.width());
        let pz = clamp_pixel(z as f32 * scale_z, luma.height());
        sample(&luma, px, pz)
    })
}

fn sample(luma: &LumaF32Image, x: u32, y: u32) -> f32 {
    if luma.width() == 0 || luma.height() == 0 {
        return 0.0;
    }
    let value = luma.get_pixel(x, y)[0];
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn clamp_pixel(coord: f32, extent: u32) -> u32 {
    if extent == 0 || !coord.is_finite() {
        return 0;
    }
    // `as` saturates, so negative coordinates land on 0.
    (coord.floor() as u32).min(extent - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GrayImage;

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_fn(width, height, |x, _| {
            Luma([(x * 255 / (width - 1)) as u8])
        }))
    }

    #[test]
    fn test_unit_scale_reads_matching_pixels() {
        let grid = sample_greyscale(&gradient(5, 5), 5, 1.0, 1.0);
        assert_eq!(grid.get(0, 2), 0.0);
        assert_eq!(grid.get(4, 2), 1.0);
        assert!(grid.get(2, 0) > 0.4 && grid.get(2, 0) < 0.6);
    }

    #[test]
    fn test_out_of_range_samples_clamp_to_edge() {
        let grid = sample_greyscale(&gradient(4, 4), 9, 1.0, 1.0);
        for x in 3..9 {
            assert_eq!(grid.get(x, 8), 1.0);
        }
    }

    #[test]
    fn test_scale_stretches_image() {
        let grid = sample_greyscale(&gradient(3, 3), 5, 0.5, 0.5);
        assert_eq!(grid.get(0, 0), 0.0);
        assert_eq!(grid.get(1, 0), 0.0);
        assert_eq!(grid.get(4, 0), 1.0);
    }

    #[test]
    fn test_clamp_pixel() {
        assert_eq!(clamp_pixel(-3.0, 10), 0);
        assert_eq!(clamp_pixel(3.7, 10), 3);
        assert_eq!(clamp_pixel(42.0, 10), 9);
        assert_eq!(clamp_pixel(f32::NAN, 10), 0);
        assert_eq!(clamp_pixel(1.0, 0), 0);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_greyscale(&dir.path().join("absent.png"), 4, 1.0, 1.0);
        assert!(matches!(result, Err(CliError::ReadImage { .. })));
    }
}
