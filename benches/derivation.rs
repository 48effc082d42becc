//! Derivation and query benchmarks
//!
//! Every derived attribute rescans the event log, so cost grows with log
//! length:
//! - status / config / metrics over long logs
//! - collection sort and filter
//! - whole-file save/load

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kepler::experiment::{Experiment, ExperimentCollection, ExperimentFilter, ExperimentStatus, SortField};
use kepler::storage::ExperimentStorage;

/// Experiment with `events` metric/config/tag events after Start
#[allow(clippy::cast_precision_loss)]
fn create_experiment(id: &str, events: usize) -> Experiment {
    let mut exp = Experiment::builder(id, format!("bench {id}"))
        .config("lr", 0.01)
        .tag("bench")
        .build();
    for i in 0..events {
        match i % 10 {
            0 => exp.set_config(format!("param_{}", i % 50), i as f64),
            1 => exp.add_tag(format!("tag_{}", i % 7)),
            _ => exp.set_metric(format!("metric_{}", i % 20), i as f64 * 0.5),
        }
    }
    if events % 3 == 0 {
        exp.complete();
    }
    exp
}

fn create_collection(experiments: usize, events: usize) -> ExperimentCollection {
    (0..experiments)
        .map(|i| create_experiment(&format!("exp-{i:05}"), events + i % 7))
        .collect()
}

/// Benchmark single-experiment derivations
fn bench_derivation(c: &mut Criterion) {
    let mut group = c.benchmark_group("derivation");

    for size in [100, 1_000, 10_000].iter() {
        let exp = create_experiment("exp", *size);

        group.bench_with_input(BenchmarkId::new("status", size), size, |b, _| {
            b.iter(|| black_box(exp.status()));
        });
        group.bench_with_input(BenchmarkId::new("metrics", size), size, |b, _| {
            b.iter(|| black_box(exp.metrics()));
        });
        group.bench_with_input(BenchmarkId::new("tags", size), size, |b, _| {
            b.iter(|| black_box(exp.tags().len()));
        });
    }

    group.finish();
}

/// Benchmark collection sort and filter
fn bench_collection_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("collection_queries");

    for size in [100, 1_000].iter() {
        let collection = create_collection(*size, 50);

        group.bench_with_input(BenchmarkId::new("sort_start_time", size), size, |b, _| {
            b.iter(|| black_box(collection.sort_by_field(SortField::StartTime, true).len()));
        });
        group.bench_with_input(BenchmarkId::new("sort_duration", size), size, |b, _| {
            b.iter(|| black_box(collection.sort_by_field(SortField::Duration, false).len()));
        });
        group.bench_with_input(BenchmarkId::new("filter_status_tag", size), size, |b, _| {
            let filter = ExperimentFilter::new()
                .status(ExperimentStatus::Running)
                .tag("bench");
            b.iter(|| black_box(collection.filter(&filter).count()));
        });
    }

    group.finish();
}

/// Benchmark whole-file persistence
fn bench_persistence(c: &mut Criterion) {
    let mut group = c.benchmark_group("persistence");
    group.sample_size(20);

    for size in [100, 1_000].iter() {
        let dir = tempfile::tempdir().unwrap();
        let storage = ExperimentStorage::new(dir.path());
        let collection = create_collection(*size, 50);
        storage.save(&collection).unwrap();

        group.bench_with_input(BenchmarkId::new("save", size), size, |b, _| {
            b.iter(|| storage.save(black_box(&collection)).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("load", size), size, |b, _| {
            b.iter(|| black_box(storage.try_load().unwrap()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_derivation,
    bench_collection_queries,
    bench_persistence
);
criterion_main!(benches);
