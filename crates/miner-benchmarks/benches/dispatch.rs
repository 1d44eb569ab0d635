//! Request queue dispatch benchmarks
//!
//! Measures the overhead a wrapped call adds over calling the operation
//! directly, with and without retries.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use futures::future::join_all;
use miner_benchmarks::{bench_runtime, criterion_config, fail_odd, instant_ok, zero_delay_policy};
use miner_queue::wrap;

/// Single call round trip through the queue
fn bench_single_call(c: &mut Criterion) {
    let runtime = bench_runtime();
    let call = runtime
        .block_on(async { wrap("bench", zero_delay_policy(1), instant_ok) })
        .unwrap();

    let mut group = c.benchmark_group("single_call");

    group.bench_function("direct", |b| {
        b.to_async(&runtime).iter(|| async { black_box(instant_ok(1).await.unwrap()) });
    });

    group.bench_function("wrapped", |b| {
        b.to_async(&runtime).iter(|| {
            let call = call.clone();
            async move { black_box(call(1).await.unwrap()) }
        });
    });

    group.finish();
}

/// Many concurrent calls sharing one queue
fn bench_concurrent_calls(c: &mut Criterion) {
    let runtime = bench_runtime();
    let call = runtime
        .block_on(async { wrap("bench", zero_delay_policy(1), instant_ok) })
        .unwrap();

    let mut group = c.benchmark_group("concurrent_calls");

    for count in [10u64, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*count));

        group.bench_with_input(BenchmarkId::new("calls", count), count, |b, &count| {
            b.to_async(&runtime).iter(|| {
                let call = call.clone();
                async move {
                    let outcomes = join_all((0..count).map(&call)).await;
                    black_box(outcomes.len())
                }
            });
        });
    }

    group.finish();
}

/// Half the calls exhaust three attempts before failing
fn bench_retrying_calls(c: &mut Criterion) {
    let runtime = bench_runtime();
    let call = runtime
        .block_on(async { wrap("bench", zero_delay_policy(3), fail_odd) })
        .unwrap();

    let mut group = c.benchmark_group("retrying_calls");
    group.throughput(Throughput::Elements(100));

    group.bench_function("mixed_100", |b| {
        b.to_async(&runtime).iter(|| {
            let call = call.clone();
            async move {
                let outcomes = join_all((0..100u64).map(&call)).await;
                black_box(outcomes.iter().filter(|outcome| outcome.is_err()).count())
            }
        });
    });

    group.finish();
}

criterion_group! {
    name = benches;
    config = criterion_config();
    targets = bench_single_call, bench_concurrent_calls, bench_retrying_calls
}
criterion_main!(benches);
