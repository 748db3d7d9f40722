use criterion::{Criterion, black_box, criterion_group, criterion_main};
use strata_terrain::*;

const RESOLUTION: usize = 257;

fn fbm_request(threading: Threading) -> GenerationRequest {
    GenerationRequest::new(
        RESOLUTION,
        GenerationParams::PerlinFbm(FbmParams {
            octaves: 6,
            persistence: 0.5,
            ..Default::default()
        }),
    )
    .with_threading(threading)
}

fn bench_fbm_unthreaded(c: &mut Criterion) {
    let driver = HeightfieldDriver::new();
    let request = fbm_request(Threading::Unthreaded);
    c.bench_function("fbm_257_unthreaded", |bencher| {
        bencher.iter(|| black_box(driver.run(black_box(&request))))
    });
}

fn bench_fbm_threaded(c: &mut Criterion) {
    let driver = HeightfieldDriver::new();
    for workers in [4, 16] {
        let Ok(count) = WorkerCount::new(workers) else {
            continue;
        };
        let request = fbm_request(Threading::Exact(count));
        c.bench_function(&format!("fbm_257_threaded_{workers}"), |bencher| {
            bencher.iter(|| black_box(driver.run(black_box(&request))))
        });
    }
}

fn bench_midpoint(c: &mut Criterion) {
    let driver = HeightfieldDriver::new();
    let request = GenerationRequest::new(
        RESOLUTION,
        GenerationParams::MidpointDisplacement(MidpointParams::default()),
    );
    c.bench_function("midpoint_257", |bencher| {
        bencher.iter(|| black_box(driver.run(black_box(&request))))
    });
}

fn bench_splat(c: &mut Criterion) {
    let heights = HeightGrid::from_cells(
        RESOLUTION,
        (0..RESOLUTION * RESOLUTION)
            .map(|i| (i % 97) as f32 / 96.0)
            .collect(),
    )
    .unwrap_or_else(|_| HeightGrid::new(RESOLUTION));
    let request = SplatRequest::new(
        256,
        256,
        vec![
            SplatLayer {
                min_height: 0.0,
                max_height: 0.5,
                ..Default::default()
            },
            SplatLayer {
                min_height: 0.3,
                max_height: 1.0,
                ..Default::default()
            },
        ],
    );
    c.bench_function("splat_256_two_layers", |bencher| {
        bencher.iter(|| black_box(derive_splat(black_box(&heights), &request)))
    });
}

criterion_group!(
    benches,
    bench_fbm_unthreaded,
    bench_fbm_threaded,
    bench_midpoint,
    bench_splat
);
criterion_main!(benches);
