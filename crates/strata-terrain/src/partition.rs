//! Grid partitioning for parallel work distribution.
//!
//! A worker count maps to a fixed `rows × cols` tiling. Each tile covers an
//! equal share of `[0, extent - 1)` along both axes, and the last row and
//! column are stretched to `extent` so the shared edge sample is covered
//! exactly once. [`split_tiles_mut`] turns that tiling into non-aliasing
//! mutable views of a single buffer, one per tile.

use crate::error::TerrainError;

/// A worker count drawn from the supported set `{1, 2, 4, 6, 8, 16}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerCount(usize);

impl WorkerCount {
    /// Every worker count with a tile layout.
    pub const SUPPORTED: [usize; 6] = [1, 2, 4, 6, 8, 16];

    /// A single worker.
    pub const ONE: Self = Self(1);

    /// Accept exactly one of [`Self::SUPPORTED`].
    pub fn new(count: usize) -> Result<Self, TerrainError> {
        if Self::SUPPORTED.contains(&count) {
            Ok(Self(count))
        } else {
            Err(TerrainError::InvalidWorkerCount(count))
        }
    }

    /// Clamp a host-reported concurrency level into the supported set.
    ///
    /// `1 → 1`, `2..=3 → 2`, `4..=7 → 4`, `8..=15 → 8`, anything else
    /// (including 0) → 16.
    pub fn resolve(available: usize) -> Self {
        let count = match available {
            1 => 1,
            2..=3 => 2,
            4..=7 => 4,
            8..=15 => 8,
            _ => 16,
        };
        Self(count)
    }

    /// The raw count.
    pub fn get(self) -> usize {
        self.0
    }

    /// The `rows × cols` tiling used for this many workers.
    pub fn layout(self) -> TileLayout {
        let (rows, cols) = match self.0 {
            1 => (1, 1),
            2 => (2, 1),
            4 => (2, 2),
            6 => (2, 3),
            8 => (2, 4),
            _ => (4, 4),
        };
        TileLayout { rows, cols }
    }
}

/// Look up the tiling for a worker count.
pub fn tile_layout(workers: usize) -> Result<TileLayout, TerrainError> {
    WorkerCount::new(workers).map(WorkerCount::layout)
}

/// A fixed 2D tiling of the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileLayout {
    /// Tiles along Y.
    pub rows: usize,
    /// Tiles along X.
    pub cols: usize,
}

impl TileLayout {
    /// One tile covering the whole grid.
    pub const SINGLE: Self = Self { rows: 1, cols: 1 };

    /// Total number of tiles.
    pub fn tile_count(&self) -> usize {
        self.rows * self.cols
    }
}

/// A half-open rectangle `[min_x, max_x) × [min_y, max_y)` of cell indices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Partition {
    pub min_x: usize,
    pub max_x: usize,
    pub min_y: usize,
    pub max_y: usize,
}

impl Partition {
    pub fn new(min_x: usize, max_x: usize, min_y: usize, max_y: usize) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    /// The whole `resolution × resolution` grid.
    pub fn full(resolution: usize) -> Self {
        Self::new(0, resolution, 0, resolution)
    }

    pub fn width(&self) -> usize {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> usize {
        self.max_y - self.min_y
    }

    pub fn cell_count(&self) -> usize {
        self.width() * self.height()
    }

    pub fn is_empty(&self) -> bool {
        self.cell_count() == 0
    }

    pub fn contains(&self, x: usize, y: usize) -> bool {
        (self.min_x..self.max_x).contains(&x) && (self.min_y..self.max_y).contains(&y)
    }
}

/// Bounds of tile `tile_index` on a square grid.
pub fn tile_bounds(
    resolution: usize,
    layout: TileLayout,
    tile_index: usize,
) -> Result<Partition, TerrainError> {
    tile_bounds_rect(resolution, resolution, layout, tile_index)
}

/// Bounds of tile `tile_index` over a `width × height` extent.
pub fn tile_bounds_rect(
    width: usize,
    height: usize,
    layout: TileLayout,
    tile_index: usize,
) -> Result<Partition, TerrainError> {
    let tiles = layout.tile_count();
    if tile_index >= tiles {
        return Err(TerrainError::InvalidTileIndex {
            index: tile_index,
            tiles,
        });
    }
    Ok(bounds_of(width, height, layout, tile_index))
}

/// Every tile of a square grid, in tile-index order.
pub fn partitions(resolution: usize, layout: TileLayout) -> Vec<Partition> {
    partitions_rect(resolution, resolution, layout)
}

/// Every tile of a `width × height` extent, in tile-index order.
pub fn partitions_rect(width: usize, height: usize, layout: TileLayout) -> Vec<Partition> {
    (0..layout.tile_count())
        .map(|index| bounds_of(width, height, layout, index))
        .collect()
}

fn bounds_of(width: usize, height: usize, layout: TileLayout, index: usize) -> Partition {
    let row = index / layout.cols;
    let col = index % layout.cols;
    let (min_x, max_x) = axis_span(width, layout.cols, col);
    let (min_y, max_y) = axis_span(height, layout.rows, row);
    Partition::new(min_x, max_x, min_y, max_y)
}

/// Span of part `part` out of `parts` along an axis of length `extent`.
/// The last part absorbs the remainder and the trailing edge sample.
fn axis_span(extent: usize, parts: usize, part: usize) -> (usize, usize) {
    let step = extent.saturating_sub(1) / parts;
    let min = part * step;
    let max = if part + 1 == parts { extent } else { min + step };
    (min, max)
}

/// Exclusive mutable access to the cells of one partition.
///
/// Holds one row segment per `y` in the partition. Each cell is `stride`
/// consecutive values (1 for heights, the layer count for splat weights).
#[derive(Debug)]
pub struct TileViewMut<'a> {
    index: usize,
    partition: Partition,
    stride: usize,
    rows: Vec<&'a mut [f32]>,
}

impl<'a> TileViewMut<'a> {
    /// Tile index within its layout.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Cell bounds covered by this view.
    pub fn partition(&self) -> Partition {
        self.partition
    }

    /// Values per cell.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Iterate `(y, row)` pairs; `row[i * stride..]` is cell `min_x + i`.
    pub fn rows_mut(&mut self) -> impl Iterator<Item = (usize, &mut [f32])> {
        let min_y = self.partition.min_y;
        self.rows
            .iter_mut()
            .enumerate()
            .map(move |(i, row)| (min_y + i, &mut **row))
    }

    /// Values of the cell at absolute coordinates `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` lies outside the partition.
    pub fn cell_mut(&mut self, x: usize, y: usize) -> &mut [f32] {
        assert!(
            self.partition.contains(x, y),
            "cell ({x}, {y}) outside tile {} {:?}",
            self.index,
            self.partition
        );
        let start = (x - self.partition.min_x) * self.stride;
        &mut self.rows[y - self.partition.min_y][start..start + self.stride]
    }
}

/// Slice a row-major `width × height × stride` buffer into one view per tile.
///
/// The views borrow disjoint segments of `cells`, so tasks holding them can
/// run concurrently without synchronisation.
pub fn split_tiles_mut(
    cells: &mut [f32],
    width: usize,
    height: usize,
    stride: usize,
    layout: TileLayout,
) -> Result<Vec<TileViewMut<'_>>, TerrainError> {
    let expected = width * height * stride;
    if cells.len() != expected {
        return Err(TerrainError::DimensionMismatch {
            what: "tiled buffer length",
            expected,
            actual: cells.len(),
        });
    }

    let mut tiles: Vec<TileViewMut<'_>> = partitions_rect(width, height, layout)
        .into_iter()
        .enumerate()
        .map(|(index, partition)| TileViewMut {
            index,
            partition,
            stride,
            rows: Vec::with_capacity(partition.height()),
        })
        .collect();

    if width == 0 || stride == 0 {
        return Ok(tiles);
    }

    for (y, row) in cells.chunks_exact_mut(width * stride).enumerate() {
        let tile_row = (0..layout.rows)
            .find(|&r| {
                let bounds = tiles[r * layout.cols].partition;
                (bounds.min_y..bounds.max_y).contains(&y)
            })
            .ok_or_else(|| {
                TerrainError::InvalidParameters(format!("row {y} is not covered by any tile"))
            })?;

        let mut rest = row;
        for col in 0..layout.cols {
            let tile = &mut tiles[tile_row * layout.cols + col];
            let len = tile.partition.width() * stride;
            let (segment, tail) = std::mem::take(&mut rest).split_at_mut(len);
            tile.rows.push(segment);
            rest = tail;
        }
    }

    Ok(tiles)
}
