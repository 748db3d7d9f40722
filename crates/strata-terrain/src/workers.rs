//! Scoped worker threads, one per tile.
//!
//! Each tile view is moved into its own named thread. Workers report back
//! over a bounded channel sized to the tile count, so no send ever blocks.
//! Joining every handle is the only synchronisation point.

use std::any::Any;
use std::time::Instant;

use crossbeam_channel::bounded;

use crate::error::TerrainError;
use crate::partition::{Partition, TileViewMut};

/// Timing for one finished tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileReport {
    /// Tile index within the layout.
    pub index: usize,
    /// Cells covered by the tile.
    pub partition: Partition,
    /// Wall time spent in the tile job, in microseconds.
    pub elapsed_us: u64,
}

/// Run `job` over every tile concurrently and wait for all of them.
///
/// The first failure (a job error or a panic) is returned as
/// [`TerrainError::TaskFailure`]; otherwise the reports come back sorted by
/// tile index.
pub(crate) fn run_tiles<F>(
    tiles: Vec<TileViewMut<'_>>,
    job: F,
) -> Result<Vec<TileReport>, TerrainError>
where
    F: Fn(&mut TileViewMut<'_>) -> Result<(), TerrainError> + Sync,
{
    let (report_tx, report_rx) = bounded::<Result<TileReport, TerrainError>>(tiles.len().max(1));
    let job = &job;
    let mut first_failure = None;

    std::thread::scope(|scope| {
        let mut handles = Vec::with_capacity(tiles.len());

        for mut tile in tiles {
            let index = tile.index();
            let sender = report_tx.clone();
            let spawned = std::thread::Builder::new()
                .name(format!("strata-tile-{index}"))
                .spawn_scoped(scope, move || {
                    let start = Instant::now();
                    let outcome = job(&mut tile)
                        .map(|()| TileReport {
                            index,
                            partition: tile.partition(),
                            elapsed_us: start.elapsed().as_micros() as u64,
                        })
                        .map_err(|err| TerrainError::TaskFailure {
                            tile: index,
                            message: err.to_string(),
                        });
                    tracing::trace!(tile = index, ok = outcome.is_ok(), "tile finished");
                    let _ = sender.send(outcome);
                });

            match spawned {
                Ok(handle) => handles.push((index, handle)),
                Err(err) => {
                    first_failure = Some(TerrainError::TaskFailure {
                        tile: index,
                        message: format!("failed to spawn worker: {err}"),
                    });
                    break;
                }
            }
        }

        for (index, handle) in handles {
            if let Err(payload) = handle.join() {
                first_failure.get_or_insert(TerrainError::TaskFailure {
                    tile: index,
                    message: panic_message(payload.as_ref()),
                });
            }
        }
    });
    drop(report_tx);

    if let Some(failure) = first_failure {
        return Err(failure);
    }

    let mut reports = report_rx
        .try_iter()
        .collect::<Result<Vec<_>, _>>()?;
    reports.sort_by_key(|r| r.index);
    Ok(reports)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::{TileLayout, split_tiles_mut, tile_layout};

    #[test]
    fn test_every_tile_runs_once() {
        let layout = tile_layout(8).unwrap();
        let mut cells = vec![0.0_f32; 17 * 17];
        let tiles = split_tiles_mut(&mut cells, 17, 17, 1, layout).unwrap();
        let reports = run_tiles(tiles, |tile| {
            for (_, row) in tile.rows_mut() {
                for cell in row.iter_mut() {
                    *cell += 1.0;
                }
            }
            Ok(())
        })
        .unwrap();

        assert_eq!(reports.len(), 8);
        assert!(reports.iter().enumerate().all(|(i, r)| r.index == i));
        assert!(cells.iter().all(|&c| c == 1.0));
    }

    #[test]
    fn test_panicking_tile_is_reported() {
        let layout = tile_layout(4).unwrap();
        let mut cells = vec![0.0_f32; 9 * 9];
        let tiles = split_tiles_mut(&mut cells, 9, 9, 1, layout).unwrap();
        let result = run_tiles(tiles, |tile| {
            if tile.index() == 2 {
                panic!("boom in tile 2");
            }
            Ok(())
        });
        assert_eq!(
            result,
            Err(TerrainError::TaskFailure {
                tile: 2,
                message: "boom in tile 2".to_string(),
            })
        );
    }

    #[test]
    fn test_job_error_becomes_task_failure() {
        let mut cells = vec![0.0_f32; 4];
        let tiles = split_tiles_mut(&mut cells, 2, 2, 1, TileLayout::SINGLE).unwrap();
        let result = run_tiles(tiles, |_| {
            Err(TerrainError::InvalidParameters("bad".to_string()))
        });
        assert!(matches!(
            result,
            Err(TerrainError::TaskFailure { tile: 0, .. })
        ));
    }
}
