//! Seeded randomized runs checking scheduler invariants.
//!
//! Each run draws a client population with random objectives and then
//! interleaves enqueues and dequeues at random, so clients repeatedly drain
//! and reactivate. Every dispatch is checked against a shadow model.

use std::collections::{HashMap, VecDeque};

use mclock_core::{ClientId, ServiceLevelObjective};
use mclock_sched::{MClockScheduler, SchedError, SchedulerConfig, SelectionMode};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const SEEDS: u64 = 32;
const OPERATIONS: usize = 4_000;

/// Token carrying its client and per-client sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Token {
    client: ClientId,
    seq: u64,
}

/// Per-client shadow state.
#[derive(Debug, Default)]
struct Shadow {
    queue: VecDeque<u64>,
    next_seq: u64,
    registered_at: u64,
    dispatches: u64,
    last_tick: u64,
}

fn random_slo(rng: &mut ChaCha8Rng, throughput: u64) -> ServiceLevelObjective {
    let reserve = if rng.gen_bool(0.4) {
        rng.gen_range(1..=throughput / 8)
    } else {
        0
    };
    // Occasionally neither a reservation nor a weight.
    let weight = if (reserve == 0 && rng.gen_bool(0.9)) || rng.gen_bool(0.5) {
        rng.gen_range(1..=10)
    } else {
        0
    };
    let limit = if rng.gen_bool(0.4) {
        rng.gen_range(1..=throughput / 2)
    } else {
        0
    };
    ServiceLevelObjective::new(reserve, weight, limit)
}

/// Runs one seeded scenario and checks invariants after every operation.
fn run_seed(seed: u64) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let throughput = rng.gen_range(100..=5_000);
    let client_count = rng.gen_range(1..=8);

    let slos: Vec<ServiceLevelObjective> = (0..client_count)
        .map(|_| random_slo(&mut rng, throughput))
        .collect();

    let mut sched = MClockScheduler::new(&SchedulerConfig::new(throughput)).unwrap();
    let mut shadow: HashMap<ClientId, Shadow> = HashMap::new();
    let mut pending = 0_usize;
    let mut last_now = sched.now();

    for _ in 0..OPERATIONS {
        if pending == 0 || rng.gen_bool(0.55) {
            let index = rng.gen_range(0..client_count);
            let client = ClientId::new(index as u64);
            let now = sched.now();
            let entry = shadow.entry(client).or_insert_with(|| Shadow {
                registered_at: now,
                ..Shadow::default()
            });
            let seq = entry.next_seq;
            entry.next_seq += 1;
            entry.queue.push_back(seq);
            pending += 1;

            sched.enqueue(client, slos[index], Token { client, seq }).unwrap();
        } else {
            let dispatch = sched.dequeue_dispatch().unwrap();
            let token = dispatch.token;
            let slo = slos[usize::try_from(token.client.get()).unwrap()];

            // Routed to the right client, in FIFO order, never duplicated.
            assert_eq!(token.client, dispatch.client_id, "seed {seed}: misrouted");
            let entry = shadow.get_mut(&token.client).unwrap();
            assert_eq!(
                entry.queue.pop_front(),
                Some(token.seq),
                "seed {seed}: FIFO violated for {}",
                token.client
            );
            pending -= 1;

            // Selection ticks strictly increase per client.
            assert!(entry.dispatches == 0 || dispatch.tick > entry.last_tick);
            entry.dispatches += 1;
            entry.last_tick = dispatch.tick;

            if dispatch.mode == SelectionMode::Reservation {
                assert!(slo.has_reservation(), "seed {seed}: reservation without reserve");
            } else {
                assert!(
                    slo.has_weight() || slo.is_best_effort(),
                    "seed {seed}: proportional for a reservation-only client"
                );
            }

            // Limit ceiling: at most one dispatch per limit spacing since
            // registration, plus the one at registration.
            let limit = slo.normalized().limit;
            if limit > 0 {
                let elapsed = (dispatch.tick - entry.registered_at) as f64;
                let spacings = elapsed * limit as f64 / throughput as f64;
                let allowed = (spacings + 1e-6).floor() as u64 + 1;
                assert!(
                    entry.dispatches <= allowed,
                    "seed {seed}: {} exceeded limit: {} > {allowed}",
                    token.client,
                    entry.dispatches
                );
            }
        }

        // Clock is monotone; pending matches the shadow.
        assert!(sched.now() >= last_now);
        last_now = sched.now();
        assert_eq!(sched.pending(), pending, "seed {seed}: pending drift");
    }

    // Drain and verify nothing was lost.
    while let Ok(token) = sched.dequeue() {
        let entry = shadow.get_mut(&token.client).unwrap();
        assert_eq!(entry.queue.pop_front(), Some(token.seq));
    }
    assert!(shadow.values().all(|s| s.queue.is_empty()), "seed {seed}: lost tokens");
    assert!(matches!(sched.dequeue(), Err(SchedError::Empty)));

    let stats = sched.stats();
    assert_eq!(stats.total_enqueued, stats.total_dequeued);
    assert_eq!(
        stats.reservation_dispatches + stats.proportional_dispatches,
        stats.total_dequeued
    );
    assert_eq!(stats.active_clients, 0);
}

#[test]
fn test_random_runs_preserve_invariants() {
    for seed in 0..SEEDS {
        run_seed(seed);
    }
}

#[test]
fn test_unlimited_weighted_clients_never_idle() {
    for seed in 0..SEEDS {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut sched = MClockScheduler::with_throughput(1_000).unwrap();
        let slos: Vec<ServiceLevelObjective> = (0..5)
            .map(|_| ServiceLevelObjective::weighted(rng.gen_range(1..=5)))
            .collect();

        for _ in 0..2_000 {
            if sched.is_empty() || rng.gen_bool(0.5) {
                let index = rng.gen_range(0..slos.len());
                sched
                    .enqueue(ClientId::new(index as u64), slos[index], ())
                    .unwrap();
            } else {
                sched.dequeue().unwrap();
            }
        }

        // Work conserving: some weighted client is always eligible.
        assert_eq!(sched.stats().idle_ticks, 0, "seed {seed}");
    }
}

#[test]
fn test_backlogged_weights_split_capacity() {
    let mut sched = MClockScheduler::with_throughput(1_000).unwrap();
    let light = ClientId::new(1);
    let heavy = ClientId::new(2);
    for seq in 0..1_000 {
        sched.enqueue(light, ServiceLevelObjective::weighted(1), seq).unwrap();
        sched.enqueue(heavy, ServiceLevelObjective::weighted(3), seq).unwrap();
    }

    for _ in 0..800 {
        sched.dequeue().unwrap();
    }

    let light = sched.client_stats(light).unwrap().dispatches();
    let heavy = sched.client_stats(heavy).unwrap().dispatches();
    assert_eq!(light + heavy, 800);
    assert!(light.abs_diff(200) <= 1, "light got {light}");
    assert!(heavy.abs_diff(600) <= 1, "heavy got {heavy}");
}

#[test]
fn test_reservation_floor_under_contention() {
    let mut sched = MClockScheduler::with_throughput(1_000).unwrap();
    let reserved = ClientId::new(1);
    let greedy = ClientId::new(2);
    for seq in 0..1_000 {
        sched
            .enqueue(reserved, ServiceLevelObjective::reserved(200), seq)
            .unwrap();
        sched
            .enqueue(greedy, ServiceLevelObjective::weighted(1_000), seq)
            .unwrap();
    }

    for _ in 0..1_000 {
        sched.dequeue().unwrap();
    }

    // A zero-weight client gets its reservation and nothing more.
    let stats = sched.client_stats(reserved).unwrap();
    assert_eq!(stats.reservation_dispatches, 200);
    assert_eq!(stats.proportional_dispatches, 0);
}

#[test]
fn test_best_effort_client_only_takes_leftover_capacity() {
    let mut sched = MClockScheduler::with_throughput(1_000).unwrap();
    let weighted = ClientId::new(1);
    let best_effort = ClientId::new(2);
    for seq in 0..500 {
        sched.enqueue(weighted, ServiceLevelObjective::weighted(1), seq).unwrap();
    }
    for seq in 0..100 {
        sched
            .enqueue(best_effort, ServiceLevelObjective::default(), seq)
            .unwrap();
    }

    let mut order = Vec::new();
    while let Ok(dispatch) = sched.dequeue_dispatch() {
        order.push(dispatch.client_id);
    }

    // One dispatch on joining, then nothing until the weighted backlog drains.
    assert_eq!(order.len(), 600);
    assert_eq!(order[0], best_effort);
    assert!(order[1..=500].iter().all(|&client| client == weighted));
    assert!(order[501..].iter().all(|&client| client == best_effort));
    assert_eq!(sched.stats().idle_ticks, 0);
}
