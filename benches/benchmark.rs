use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use hexworld::chunk::{Chunk, GenerationQueue, StepProgress};
use hexworld::diag::WallClock;
use hexworld::hex::{self, AxialHex};
use hexworld::layout::{LayoutConstraints, LayoutGenerator};
use hexworld::settings::LayoutSettings;
use hexworld::world::WorldMap;

fn build_world(centers: &[AxialHex], radius: u32) -> WorldMap {
    let mut world = WorldMap::new();
    for center in centers {
        let mut chunk = Chunk::placeholder(*center, 1.0);
        let mut cursor = 0;
        while let StepProgress::More(next) = chunk.grid_step(radius, cursor) {
            cursor = next;
        }
        chunk.neighbors_step(radius);
        chunk.initialized = true;
        let tiles: Vec<AxialHex> = chunk.tiles.iter().map(|t| t.hex).collect();
        world.add_placeholder(chunk);
        for hex in tiles {
            world.publish_tile(hex, *center);
        }
    }
    world
}

/// Ring/grid enumeration for a production-sized chunk.
fn bench_chunk_grid(c: &mut Criterion) {
    c.bench_function("chunk_grid_r10", |b| {
        b.iter(|| {
            let grid = hex::chunk_grid(black_box(AxialHex::new(7, -3)), black_box(10));
            black_box(grid.len());
        })
    });
}

/// World-to-hex conversions across a sweep of off-center points.
fn bench_world_to_hex(c: &mut Criterion) {
    c.bench_function("world_to_hex_sweep", |b| {
        b.iter(|| {
            let size = 20.0 / 3.0;
            for i in 0..1_000i32 {
                let x = f64::from(i) * 1.37 - 600.0;
                let z = f64::from(i) * 0.91 - 400.0;
                black_box(hex::world_to_hex(black_box(x), black_box(z), size));
            }
        })
    });
}

/// Full layout pipeline over a two-chunk union.
fn bench_layout_generate(c: &mut Criterion) {
    let radius = 6;
    let centers = [AxialHex::ZERO, hex::packing_neighbors(AxialHex::ZERO, radius)[0]];
    c.bench_function("layout_generate_two_chunks", |b| {
        b.iter_batched(
            || {
                (
                    build_world(&centers, radius),
                    LayoutGenerator::new(LayoutSettings::default(), LayoutConstraints::default()),
                )
            },
            |(mut world, mut generator)| {
                let report = generator.generate(&mut world, &centers).unwrap();
                black_box(report.road_tiles);
            },
            BatchSize::SmallInput,
        )
    });
}

/// Queue drain for a fresh chunk with a generous budget.
fn bench_queue_drain(c: &mut Criterion) {
    c.bench_function("queue_drain_r10", |b| {
        b.iter_batched(
            || {
                (
                    WorldMap::new(),
                    GenerationQueue::new(10, 1.0, 50.0, Box::new(WallClock::new())),
                )
            },
            |(mut world, mut queue)| {
                drop(queue.enqueue(AxialHex::ZERO, 0, &mut world));
                while queue.process_one_frame(&mut world)
                    == hexworld::chunk::FrameOutcome::MorePending
                {}
                black_box(world.chunk_count());
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(
    benches,
    bench_chunk_grid,
    bench_world_to_hex,
    bench_layout_generate,
    bench_queue_drain
);
criterion_main!(benches);
