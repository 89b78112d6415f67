//! Scalability benchmarks for the decision engine
//!
//! Measures per-tick cost at various competitor and target-point counts.
//!
//! Run with: cargo bench --bench scalability

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use arena_sentinel::config::EngineConfig;
use arena_sentinel::engine::risk::RiskEvaluator;
use arena_sentinel::engine::spatial::TargetGrid;
use arena_sentinel::engine::targeting::TargetSelector;
use arena_sentinel::engine::world::{Actuator, WorldProvider, WorldSnapshot};
use arena_sentinel::engine::Engine;
use arena_sentinel::sim::SimulatedWorld;

/// Simulated world advanced past spawn so bodies have grown
fn warmed_world(competitors: usize, targets: usize) -> SimulatedWorld {
    let mut world = SimulatedWorld::new(42, competitors, targets);
    for _ in 0..120 {
        world.snapshot();
    }
    world
}

/// Snapshot with a live controlled entity
fn live_snapshot(world: &mut SimulatedWorld) -> WorldSnapshot {
    loop {
        let snapshot = world.snapshot();
        if snapshot.entity.is_some() {
            return snapshot;
        }
    }
}

/// Benchmark a full engine tick against a frozen snapshot
fn bench_full_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_tick");
    group.sample_size(50);

    for count in [0, 8, 32, 128] {
        let mut world = warmed_world(count, 800);
        let snapshot = live_snapshot(&mut world);
        let mut engine = Engine::new(EngineConfig::default());

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("competitors", count), &count, |b, _| {
            b.iter(|| black_box(engine.tick(&snapshot)))
        });
    }
    group.finish();
}

/// Benchmark the closed loop: simulate, decide, actuate
fn bench_closed_loop(c: &mut Criterion) {
    let mut group = c.benchmark_group("closed_loop");
    group.sample_size(30);

    for count in [8, 32, 128] {
        let mut world = warmed_world(count, 800);
        let mut engine = Engine::new(EngineConfig::default());

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("competitors", count), &count, |b, _| {
            b.iter(|| {
                let snapshot = world.snapshot();
                let outcome = engine.tick(&snapshot);
                world.apply(outcome.command);
                black_box(outcome)
            })
        });
    }
    group.finish();
}

/// Benchmark a full target scan at various target-point counts
fn bench_target_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("target_selection");
    group.sample_size(50);
    let risk = RiskEvaluator::default();

    for count in [100, 500, 2_000, 5_000] {
        let mut world = warmed_world(16, count);
        let snapshot = live_snapshot(&mut world);
        let Some(entity) = snapshot.entity else {
            continue;
        };
        let competitors: Vec<_> = snapshot.competitors.iter().collect();
        let mut selector = TargetSelector::default();

        group.throughput(Throughput::Elements(snapshot.targets.len() as u64));
        group.bench_with_input(BenchmarkId::new("targets", count), &count, |b, _| {
            b.iter(|| {
                black_box(selector.select(&entity, &snapshot.targets, &competitors, &risk).cloned())
            })
        });
    }
    group.finish();
}

/// Benchmark target grid build time
fn bench_target_grid(c: &mut Criterion) {
    let mut group = c.benchmark_group("target_grid");
    group.sample_size(50);

    for count in [500, 2_000, 10_000] {
        let world = live_snapshot(&mut warmed_world(0, count));
        let mut grid = TargetGrid::new(64.0);

        group.throughput(Throughput::Elements(world.targets.len() as u64));
        group.bench_with_input(BenchmarkId::new("rebuild", count), &count, |b, _| {
            b.iter(|| {
                grid.rebuild(&world.targets);
                black_box(grid.occupied_cells())
            })
        });
    }
    group.finish();
}

/// Tick time vs the 60 Hz frame budget (16.6ms)
fn bench_tick_budget(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick_budget");
    group.sample_size(100);
    group.measurement_time(std::time::Duration::from_secs(10));

    for count in [64, 128] {
        let mut world = warmed_world(count, 2_000);
        let snapshot = live_snapshot(&mut world);
        let mut engine = Engine::new(EngineConfig::default());

        group.bench_with_input(BenchmarkId::new("vs_budget", count), &count, |b, _| {
            b.iter(|| engine.tick(&snapshot))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_full_tick,
    bench_closed_loop,
    bench_target_selection,
    bench_target_grid,
    bench_tick_budget,
);

criterion_main!(benches);
