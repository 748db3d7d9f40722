//! Square height and greyscale grids stored as flat row-major arrays.

use crate::error::TerrainError;

/// A square `resolution × resolution` grid of heights.
///
/// Cells are stored row-major: the cell at `(x, y)` lives at
/// `y * resolution + x`.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightGrid {
    resolution: usize,
    cells: Vec<f32>,
}

impl HeightGrid {
    /// Create a zero-filled grid.
    pub fn new(resolution: usize) -> Self {
        Self {
            resolution,
            cells: vec![0.0; resolution * resolution],
        }
    }

    /// Wrap an existing buffer, checking it holds `resolution²` cells.
    pub fn from_cells(resolution: usize, cells: Vec<f32>) -> Result<Self, TerrainError> {
        let expected = resolution * resolution;
        if cells.len() != expected {
            return Err(TerrainError::DimensionMismatch {
                what: "height grid cells",
                expected,
                actual: cells.len(),
            });
        }
        Ok(Self { resolution, cells })
    }

    /// Side length of the grid.
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// Height at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `x` or `y` is not below the resolution.
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.cells[self.index(x, y)]
    }

    /// Overwrite the height at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `x` or `y` is not below the resolution.
    pub fn set(&mut self, x: usize, y: usize, height: f32) {
        let idx = self.index(x, y);
        self.cells[idx] = height;
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> &[f32] {
        &self.cells
    }

    /// Mutable access to all cells in row-major order.
    pub fn cells_mut(&mut self) -> &mut [f32] {
        &mut self.cells
    }

    /// Smallest and largest height, or `(0.0, 0.0)` for an empty grid.
    pub fn min_max(&self) -> (f32, f32) {
        if self.cells.is_empty() {
            return (0.0, 0.0);
        }
        self.cells
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &h| {
                (lo.min(h), hi.max(h))
            })
    }

    /// Returns `true` if every cell holds a finite value.
    pub fn is_finite(&self) -> bool {
        self.cells.iter().all(|h| h.is_finite())
    }

    #[inline]
    fn index(&self, x: usize, y: usize) -> usize {
        assert!(
            x < self.resolution && y < self.resolution,
            "cell ({x}, {y}) outside grid of resolution {}",
            self.resolution
        );
        y * self.resolution + x
    }
}

/// Precomputed greyscale samples in `[0, 1]`, one per height cell.
///
/// Produced by whatever decodes the source image; the engine only reads it.
#[derive(Clone, Debug, PartialEq)]
pub struct GreyscaleGrid {
    resolution: usize,
    samples: Vec<f32>,
}

impl GreyscaleGrid {
    /// Wrap a row-major sample buffer of `resolution²` values.
    pub fn from_samples(resolution: usize, samples: Vec<f32>) -> Result<Self, TerrainError> {
        let expected = resolution * resolution;
        if samples.len() != expected {
            return Err(TerrainError::DimensionMismatch {
                what: "greyscale samples",
                expected,
                actual: samples.len(),
            });
        }
        if let Some(bad) = samples.iter().find(|s| !s.is_finite()) {
            return Err(TerrainError::InvalidParameters(format!(
                "greyscale sample {bad} is not finite"
            )));
        }
        Ok(Self {
            resolution,
            samples,
        })
    }

    /// Build a grid by evaluating `sample(x, y)` for every cell.
    pub fn from_fn(resolution: usize, mut sample: impl FnMut(usize, usize) -> f32) -> Self {
        let mut samples = Vec::with_capacity(resolution * resolution);
        for y in 0..resolution {
            for x in 0..resolution {
                samples.push(sample(x, y));
            }
        }
        Self {
            resolution,
            samples,
        }
    }

    /// Side length of the grid.
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// Sample at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `x` or `y` is not below the resolution.
    pub fn get(&self, x: usize, y: usize) -> f32 {
        assert!(x < self.resolution && y < self.resolution);
        self.samples[y * self.resolution + x]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_grid_is_zeroed() {
        let grid = HeightGrid::new(5);
        assert_eq!(grid.resolution(), 5);
        assert_eq!(grid.cells().len(), 25);
        assert!(grid.cells().iter().all(|&h| h == 0.0));
    }

    #[test]
    fn test_set_get_is_row_major() {
        let mut grid = HeightGrid::new(4);
        grid.set(3, 1, 0.75);
        assert_eq!(grid.get(3, 1), 0.75);
        assert_eq!(grid.cells()[4 + 3], 0.75);
    }

    #[test]
    fn test_from_cells_rejects_wrong_length() {
        let err = HeightGrid::from_cells(3, vec![0.0; 8]).unwrap_err();
        assert_eq!(
            err,
            TerrainError::DimensionMismatch {
                what: "height grid cells",
                expected: 9,
                actual: 8,
            }
        );
    }

    #[test]
    fn test_min_max() {
        let grid = HeightGrid::from_cells(2, vec![0.5, -1.0, 2.0, 0.0]).unwrap();
        assert_eq!(grid.min_max(), (-1.0, 2.0));
        assert_eq!(HeightGrid::new(0).min_max(), (0.0, 0.0));
    }

    #[test]
    #[should_panic]
    fn test_out_of_bounds_get_panics() {
        let grid = HeightGrid::new(3);
        let _ = grid.get(3, 0);
    }

    #[test]
    fn test_greyscale_from_fn_matches_coordinates() {
        let grey = GreyscaleGrid::from_fn(3, |x, y| (x * 10 + y) as f32);
        assert_eq!(grey.get(2, 1), 21.0);
        assert_eq!(grey.get(0, 2), 2.0);
    }

    #[test]
    fn test_greyscale_rejects_nan() {
        let result = GreyscaleGrid::from_samples(1, vec![f32::NAN]);
        assert!(matches!(result, Err(TerrainError::InvalidParameters(_))));
    }
}
