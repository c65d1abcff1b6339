//! # Engine Benchmarks
//!
//! Matching, splicing, repair and decomposition over growing pools.
//!
//! Run with: `cargo bench -p filmswap-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use filmswap_core::{
    AssignmentGraph, Participant, ParticipantId, Snapshot, decompose, match_participants,
    pretty_report, remove_participant,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::hint::black_box;

fn pool(size: u64) -> Snapshot {
    Snapshot::new(
        (1..=size).map(|id| Participant::new(ParticipantId(id), format!("p{id}")).with_letter("x")),
        [],
    )
}

fn matched(size: u64) -> Snapshot {
    let snapshot = pool(size);
    let outcome = match_participants(&snapshot, &mut StdRng::seed_from_u64(size)).expect("match");
    let mut after = snapshot;
    after.apply(&outcome.mutations).expect("apply");
    after
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_fresh_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("fresh_matching");

    for size in [10u64, 100, 500].iter() {
        let snapshot = pool(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let mut rng = StdRng::seed_from_u64(size);
            b.iter(|| black_box(match_participants(&snapshot, &mut rng).expect("match")));
        });
    }

    group.finish();
}

fn bench_splice_latecomers(c: &mut Criterion) {
    let mut group = c.benchmark_group("splice_latecomers");

    for size in [10u64, 100, 500].iter() {
        let base = matched(*size);
        let snapshot = Snapshot::new(
            base.participants().cloned().chain(
                (1..=10).map(|i| Participant::new(ParticipantId(10_000 + i), "late").with_letter("x")),
            ),
            [],
        );
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let mut rng = StdRng::seed_from_u64(size);
            b.iter(|| black_box(match_participants(&snapshot, &mut rng).expect("splice")));
        });
    }

    group.finish();
}

fn bench_repair(c: &mut Criterion) {
    let mut group = c.benchmark_group("repair");

    for size in [10u64, 100, 500].iter() {
        let snapshot = matched(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| black_box(remove_participant(&snapshot, ParticipantId(size / 2)).expect("repair")));
        });
    }

    group.finish();
}

fn bench_decompose(c: &mut Criterion) {
    let mut group = c.benchmark_group("decompose");

    for size in [10u64, 100, 500].iter() {
        let snapshot = matched(*size);
        let graph = AssignmentGraph::from_snapshot(&snapshot).expect("valid");
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(decompose(&graph).expect("decompose")));
        });
    }

    group.finish();
}

fn bench_pretty_report(c: &mut Criterion) {
    let snapshot = matched(200);
    c.bench_function("pretty_report_200", |b| {
        b.iter(|| black_box(pretty_report(&snapshot).expect("report")));
    });
}

criterion_group!(
    benches,
    bench_fresh_matching,
    bench_splice_latecomers,
    bench_repair,
    bench_decompose,
    bench_pretty_report,
);
criterion_main!(benches);
