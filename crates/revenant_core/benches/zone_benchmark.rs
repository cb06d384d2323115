//! # Zone Benchmark
//!
//! Allocation churn and eviction cost of the tagged zone.
//!
//! Run with: `cargo bench --package revenant_core`

// Benchmarks don't need docs
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use revenant_core::{OwnerSlot, PurgeTag, Zone};

const ZONE_SIZE: usize = 16 * 1024 * 1024;

/// Benchmark: allocate a level's worth of blocks, then purge them in bulk.
fn bench_level_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("level_cycle");

    for count in [100usize, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let mut zone = Zone::new(ZONE_SIZE).unwrap();
            b.iter(|| {
                for i in 0..count {
                    black_box(zone.malloc(64 + (i % 512), PurgeTag::Level, None).unwrap());
                }
                zone.free_tags(PurgeTag::Level, PurgeTag::LevSpec)
            });
        });
    }

    group.finish();
}

/// Benchmark: allocations that each force an eviction pass over cache data.
fn bench_eviction_pressure(c: &mut Criterion) {
    c.bench_function("eviction_pressure", |b| {
        let mut zone = Zone::new(1024 * 1024).unwrap();
        let owners: Vec<OwnerSlot> = (0..64).map(|_| OwnerSlot::new()).collect();
        let mut next = 0usize;

        b.iter(|| {
            let owner = &owners[next % owners.len()];
            next += 1;
            black_box(zone.malloc(64 * 1024, PurgeTag::Cache, Some(owner)).unwrap())
        });
    });
}

criterion_group!(benches, bench_level_cycle, bench_eviction_pressure);
criterion_main!(benches);
