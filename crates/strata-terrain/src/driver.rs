//! The parallel generation driver.
//!
//! One [`HeightfieldDriver::run`] call is one pass: allocate the height grid,
//! fill it either on the calling thread or with one worker per tile, join
//! every worker, then derive the splat map. Passes never overlap.

use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::error::TerrainError;
use crate::generators::GenerationParams;
use crate::grid::HeightGrid;
use crate::partition::{Partition, TileLayout, WorkerCount, split_tiles_mut};
use crate::splat::{SplatRequest, SplatWeights, derive_splat, derive_splat_partitioned};
use crate::workers::{TileReport, run_tiles};

/// Lifecycle of the driver's most recent pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum PassState {
    /// No pass has run yet.
    Idle = 0,
    /// A pass is in progress.
    Running = 1,
    /// The last pass completed and every worker joined.
    Finished = 2,
    /// The last pass returned an error.
    Failed = 3,
}

impl PassState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => PassState::Idle,
            1 => PassState::Running,
            2 => PassState::Finished,
            _ => PassState::Failed,
        }
    }
}

/// How a pass distributes work.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Threading {
    /// Generate on the calling thread.
    Unthreaded,
    /// One worker per tile, sized from the host's logical CPU count.
    #[default]
    Auto,
    /// One worker per tile, sized from a caller-supplied concurrency level.
    Available(usize),
    /// One worker per tile with an exact supported worker count.
    Exact(WorkerCount),
}

impl Threading {
    /// Resolve to a supported worker count. Unthreaded passes use one.
    pub fn worker_count(self) -> WorkerCount {
        match self {
            Threading::Unthreaded => WorkerCount::ONE,
            Threading::Auto => WorkerCount::resolve(num_cpus::get()),
            Threading::Available(n) => WorkerCount::resolve(n),
            Threading::Exact(count) => count,
        }
    }

    pub fn is_threaded(self) -> bool {
        self != Threading::Unthreaded
    }
}

/// Everything one pass needs.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationRequest {
    /// Side length of the height grid.
    pub resolution: usize,
    /// Algorithm and its parameters.
    pub params: GenerationParams,
    /// Work distribution.
    pub threading: Threading,
    /// Splat map to derive after heights, if any.
    pub splat: Option<SplatRequest>,
}

impl GenerationRequest {
    pub fn new(resolution: usize, params: GenerationParams) -> Self {
        Self {
            resolution,
            params,
            threading: Threading::default(),
            splat: None,
        }
    }

    pub fn with_threading(mut self, threading: Threading) -> Self {
        self.threading = threading;
        self
    }

    pub fn with_splat(mut self, splat: SplatRequest) -> Self {
        self.splat = Some(splat);
        self
    }

    /// Check every input before any thread starts.
    pub fn validate(&self) -> Result<(), TerrainError> {
        if self.resolution == 0 {
            return Err(TerrainError::InvalidParameters(
                "resolution must be at least 1".to_string(),
            ));
        }
        self.params.validate(self.resolution)?;
        if let Some(splat) = &self.splat {
            splat.validate(self.resolution)?;
        }
        Ok(())
    }
}

/// The result of a finished pass. Owned by the caller.
#[derive(Clone, Debug)]
pub struct PassOutput {
    /// The filled height grid.
    pub heights: HeightGrid,
    /// Layer weights, when a splat request was supplied.
    pub splat: Option<SplatWeights>,
    /// Worker count the pass resolved to.
    pub workers: WorkerCount,
    /// Whether heights were generated over partitions.
    pub partitioned: bool,
    /// Per-tile timings, sorted by tile index.
    pub tiles: Vec<TileReport>,
    /// Wall time of the whole pass.
    pub elapsed: Duration,
}

/// Runs generation passes and tracks their state.
#[derive(Debug)]
pub struct HeightfieldDriver {
    state: AtomicU8,
}

impl HeightfieldDriver {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(PassState::Idle as u8),
        }
    }

    /// State of the current or most recent pass.
    pub fn state(&self) -> PassState {
        PassState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Run one pass to completion or failure.
    ///
    /// Fails with [`TerrainError::PassInProgress`] if another pass on this
    /// driver has not finished. On any other error the driver is left in
    /// [`PassState::Failed`] and may run again.
    pub fn run(&self, request: &GenerationRequest) -> Result<PassOutput, TerrainError> {
        let guard = self.begin()?;
        let outcome = execute(request);
        guard.finish(outcome.is_ok());
        outcome
    }

    fn begin(&self) -> Result<PassGuard<'_>, TerrainError> {
        let running = PassState::Running as u8;
        self.state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |s| {
                (s != running).then_some(running)
            })
            .map_err(|_| TerrainError::PassInProgress)?;
        Ok(PassGuard {
            state: &self.state,
            done: false,
        })
    }
}

impl Default for HeightfieldDriver {
    fn default() -> Self {
        Self::new()
    }
}

/// Marks the pass failed if it unwinds before finishing.
struct PassGuard<'a> {
    state: &'a AtomicU8,
    done: bool,
}

impl PassGuard<'_> {
    fn finish(mut self, ok: bool) {
        let next = if ok {
            PassState::Finished
        } else {
            PassState::Failed
        };
        self.state.store(next as u8, Ordering::Release);
        self.done = true;
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.state.store(PassState::Failed as u8, Ordering::Release);
        }
    }
}

fn execute(request: &GenerationRequest) -> Result<PassOutput, TerrainError> {
    let start = Instant::now();
    request.validate()?;

    let workers = request.threading.worker_count();
    let algorithm = request.params.algorithm();
    let partitioned = request.threading.is_threaded() && request.params.supports_partitioning();
    if request.threading.is_threaded() && !partitioned {
        debug!(%algorithm, "algorithm is sequential-only, generating unthreaded");
    }

    let resolution = request.resolution;
    let mut heights = HeightGrid::new(resolution);
    let layout = if partitioned {
        workers.layout()
    } else {
        TileLayout::SINGLE
    };

    let tiles = match request.params.tile_generator().filter(|_| partitioned) {
        Some(generator) => {
            let views =
                split_tiles_mut(heights.cells_mut(), resolution, resolution, 1, layout)?;
            for view in &views {
                debug!(tile = view.index(), partition = ?view.partition(), "dispatching tile");
            }
            run_tiles(views, |tile| {
                generator.generate(tile);
                Ok(())
            })?
        }
        None => {
            let tile_start = Instant::now();
            request.params.generate_full(&mut heights)?;
            vec![TileReport {
                index: 0,
                partition: Partition::full(resolution),
                elapsed_us: tile_start.elapsed().as_micros() as u64,
            }]
        }
    };

    if !heights.is_finite() {
        return Err(TerrainError::InvalidParameters(format!(
            "{algorithm} produced non-finite heights"
        )));
    }

    let splat = match &request.splat {
        Some(splat) if partitioned => Some(derive_splat_partitioned(&heights, splat, layout)?),
        Some(splat) => Some(derive_splat(&heights, splat)?),
        None => None,
    };

    let elapsed = start.elapsed();
    info!(
        %algorithm,
        resolution,
        workers = workers.get(),
        partitioned,
        elapsed_ms = elapsed.as_millis() as u64,
        "heightfield pass finished"
    );

    Ok(PassOutput {
        heights,
        splat,
        workers,
        partitioned,
        tiles,
        elapsed,
    })
}
