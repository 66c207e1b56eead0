//! Scheduler dispatch benchmarks.
//!
//! Measures enqueue + dequeue throughput as the number of clients grows.
//! Cache recomputation is a linear scan, so per-dispatch cost is expected to
//! scale with the client count.

#![allow(missing_docs)]

use criterion::{
    black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput,
};

use mclock_core::{ClientId, ServiceLevelObjective};
use mclock_sched::{MClockScheduler, SchedulerConfig};

const TOKENS_PER_CLIENT: u64 = 64;

/// Builds a scheduler with a full backlog for `clients` clients with mixed
/// objectives.
fn backlogged(clients: u64) -> MClockScheduler<u64> {
    let config = SchedulerConfig::new(10_000).with_client_capacity(clients as usize);
    let mut sched = MClockScheduler::new(&config).unwrap();

    for seq in 0..TOKENS_PER_CLIENT {
        for id in 0..clients {
            let slo = match id % 3 {
                0 => ServiceLevelObjective::new(100, 1, 0),
                1 => ServiceLevelObjective::weighted(2),
                _ => ServiceLevelObjective::weighted(4).with_limit(2_000),
            };
            sched.enqueue(ClientId::new(id), slo, seq).unwrap();
        }
    }
    sched
}

fn bench_dequeue(c: &mut Criterion) {
    let mut group = c.benchmark_group("dequeue");

    for clients in [1_u64, 8, 64, 256] {
        group.throughput(Throughput::Elements(clients * TOKENS_PER_CLIENT));
        group.bench_with_input(
            BenchmarkId::new("clients", clients),
            &clients,
            |b, &clients| {
                b.iter_batched(
                    || backlogged(clients),
                    |mut sched| {
                        while let Ok(token) = sched.dequeue() {
                            black_box(token);
                        }
                    },
                    BatchSize::LargeInput,
                );
            },
        );
    }

    group.finish();
}

fn bench_reactivation_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("reactivation");
    let clients = 32_u64;
    let rounds = 256_u64;
    group.throughput(Throughput::Elements(clients * rounds));

    // Every client drains after each dispatch, so each enqueue reactivates.
    group.bench_function("drain_refill", |b| {
        b.iter(|| {
            let mut sched = MClockScheduler::with_throughput(10_000).unwrap();
            for round in 0..rounds {
                for id in 0..clients {
                    let slo = ServiceLevelObjective::new(50, 1, 0);
                    sched.enqueue(ClientId::new(id), slo, round).unwrap();
                }
                while let Ok(token) = sched.dequeue() {
                    black_box(token);
                }
            }
            black_box(sched.now());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_dequeue, bench_reactivation_churn);
criterion_main!(benches);
