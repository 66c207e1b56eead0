//! Workload generation and execution.
//!
//! Drives one scheduler deterministically from a [`SimulationProfile`] and a
//! seed, recording every operation for verification.

use std::collections::BTreeMap;

use hdrhistogram::Histogram;
use mclock_core::{ClientId, ServiceLevelObjective};
use mclock_sched::{MClockScheduler, SchedulerConfig};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, trace, warn};

use crate::error::{WorkloadError, WorkloadResult};
use crate::history::{History, TokenTag};
use crate::profiles::{PatternProfile, SimulationProfile};
use crate::verification::{Verification, Violation};

/// Builder for creating workloads.
#[derive(Debug, Default)]
pub struct WorkloadBuilder {
    seed: u64,
    profile: SimulationProfile,
    dispatches: Option<u64>,
}

impl WorkloadBuilder {
    /// Creates a new workload builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the random seed.
    #[must_use]
    pub const fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the profile.
    #[must_use]
    pub fn profile(mut self, profile: SimulationProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Overrides the profile's dispatch count.
    #[must_use]
    pub const fn dispatches(mut self, dispatches: u64) -> Self {
        self.dispatches = Some(dispatches);
        self
    }

    /// Builds the workload.
    ///
    /// # Errors
    ///
    /// Returns `WorkloadError::InvalidProfile` if the profile cannot be run.
    pub fn build(self) -> WorkloadResult<Workload> {
        let mut profile = self.profile;
        if let Some(dispatches) = self.dispatches {
            if dispatches != profile.dispatches {
                profile.dispatches = dispatches;
                profile.clear_expectations();
            }
        }
        profile.validate()?;
        Ok(Workload::new(profile, self.seed))
    }
}

/// A verifiable workload.
#[derive(Debug)]
pub struct Workload {
    profile: SimulationProfile,
    seed: u64,
    rng: ChaCha8Rng,
    history: History,
    next_seq: BTreeMap<ClientId, u64>,
    remaining: Vec<u64>,
}

impl Workload {
    fn new(profile: SimulationProfile, seed: u64) -> Self {
        let remaining = profile.clients.iter().map(|c| c.tokens).collect();
        Self {
            history: History::new(profile.system_throughput),
            rng: ChaCha8Rng::seed_from_u64(seed),
            profile,
            seed,
            next_seq: BTreeMap::new(),
            remaining,
        }
    }

    /// Creates a workload builder.
    #[must_use]
    pub fn builder() -> WorkloadBuilder {
        WorkloadBuilder::new()
    }

    /// Returns the profile being run.
    #[must_use]
    pub const fn profile(&self) -> &SimulationProfile {
        &self.profile
    }

    /// Returns the history of the last run.
    #[must_use]
    pub const fn history(&self) -> &History {
        &self.history
    }

    /// Runs the workload against a fresh scheduler and verifies the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the scheduler rejects an operation or a histogram
    /// cannot be created. Property violations are reported in the stats, not
    /// as errors.
    pub fn run(&mut self) -> WorkloadResult<WorkloadStats> {
        let config = SchedulerConfig::new(self.profile.system_throughput)
            .with_client_capacity(self.profile.clients.len());
        let mut sched = MClockScheduler::new(&config)?;

        self.history = History::new(self.profile.system_throughput);
        self.next_seq.clear();
        self.remaining = self.profile.clients.iter().map(|c| c.tokens).collect();

        debug!(
            profile = %self.profile.name,
            seed = self.seed,
            clients = self.profile.clients.len(),
            dispatches = self.profile.dispatches,
            "starting workload"
        );

        match self.profile.pattern {
            PatternProfile::Backlogged => self.run_backlogged(&mut sched)?,
            PatternProfile::Interleaved {
                enqueue_probability,
            } => self.run_interleaved(&mut sched, enqueue_probability)?,
        }
        self.history.record_pending(sched.pending());

        let violations = self.verify();
        for violation in &violations {
            warn!(profile = %self.profile.name, %violation, "verification failed");
        }

        let stats = self.summarize(&sched, violations)?;
        info!(
            profile = %stats.profile,
            seed = stats.seed,
            enqueued = stats.enqueued,
            dispatched = stats.dispatched,
            virtual_ticks = stats.virtual_ticks,
            idle_ticks = stats.idle_ticks,
            violations = stats.violations.len(),
            "workload complete"
        );
        Ok(stats)
    }

    /// Enqueues every client's tokens up front, one per client per round,
    /// then dispatches.
    fn run_backlogged(&mut self, sched: &mut MClockScheduler<TokenTag>) -> WorkloadResult<()> {
        let rounds = self.profile.clients.iter().map(|c| c.tokens).max().unwrap_or(0);
        for round in 0..rounds {
            for index in 0..self.profile.clients.len() {
                if self.profile.clients[index].tokens > round {
                    self.enqueue(sched, index)?;
                }
            }
        }

        let dispatches = self.profile.dispatches.min(sched.pending() as u64);
        for _ in 0..dispatches {
            self.dispatch(sched)?;
        }
        Ok(())
    }

    /// Mixes enqueues and dispatches at random until the dispatch count is
    /// reached or every token has been dispatched.
    fn run_interleaved(
        &mut self,
        sched: &mut MClockScheduler<TokenTag>,
        enqueue_probability: f64,
    ) -> WorkloadResult<()> {
        let mut dispatched = 0;
        while dispatched < self.profile.dispatches {
            let candidates: Vec<usize> = (0..self.remaining.len())
                .filter(|&i| self.remaining[i] > 0)
                .collect();
            let enqueue = !candidates.is_empty()
                && (sched.is_empty() || self.rng.gen_bool(enqueue_probability));

            if enqueue {
                if let Some(&index) = candidates.choose(&mut self.rng) {
                    self.enqueue(sched, index)?;
                }
            } else if sched.is_empty() {
                break;
            } else {
                self.dispatch(sched)?;
                dispatched += 1;
            }
        }
        Ok(())
    }

    fn enqueue(&mut self, sched: &mut MClockScheduler<TokenTag>, index: usize) -> WorkloadResult<()> {
        let client = &self.profile.clients[index];
        let (id, slo) = (client.client_id(), client.slo());

        let next = self.next_seq.entry(id).or_insert(0);
        let token = TokenTag {
            client: id,
            seq: *next,
        };
        *next += 1;

        let now = sched.now();
        sched.enqueue(id, slo, token)?;
        self.history.record_registration(id, slo, now);
        self.history.record_enqueue(token, now);
        self.remaining[index] -= 1;
        Ok(())
    }

    fn dispatch(&mut self, sched: &mut MClockScheduler<TokenTag>) -> WorkloadResult<()> {
        let dispatch = sched.dequeue_dispatch()?;
        trace!(
            client = %dispatch.client_id,
            seq = dispatch.token.seq,
            mode = ?dispatch.mode,
            tick = dispatch.tick,
            "dispatch"
        );
        self.history.record_dispatch(&dispatch);
        Ok(())
    }

    fn verify(&self) -> Vec<Violation> {
        let mut violations = Verification::verify(&self.history);

        if self.profile.pattern == PatternProfile::Backlogged && self.profile.reservations_fit() {
            violations.extend(Verification::check_reservation_floor(&self.history));
        }

        let expected: BTreeMap<ClientId, u64> = self
            .profile
            .clients
            .iter()
            .filter_map(|c| c.expected_dispatches.map(|n| (c.client_id(), n)))
            .collect();
        violations.extend(Verification::check_expected_counts(&self.history, &expected));

        violations
    }

    fn summarize(
        &self,
        sched: &MClockScheduler<TokenTag>,
        violations: Vec<Violation>,
    ) -> WorkloadResult<WorkloadStats> {
        let mut clients = Vec::with_capacity(self.profile.clients.len());

        for profile in &self.profile.clients {
            let id = profile.client_id();
            let mut waits = Histogram::<u64>::new(3).map_err(|e| WorkloadError::Histogram {
                message: e.to_string(),
            })?;
            for record in self.history.dispatches_for(id) {
                if let Some(enqueued_at) = self.history.enqueued_at(&record.token) {
                    let _ = waits.record(record.tick.saturating_sub(enqueued_at));
                }
            }

            let (reservation_dispatches, proportional_dispatches) = sched
                .client_stats(id)
                .map_or((0, 0), |s| (s.reservation_dispatches, s.proportional_dispatches));

            clients.push(ClientSummary {
                client: id,
                slo: profile.slo().normalized(),
                enqueued: self.history.enqueued_for(id),
                dispatched: reservation_dispatches + proportional_dispatches,
                reservation_dispatches,
                proportional_dispatches,
                pending: sched.pending_for(id),
                wait_p50: waits.value_at_quantile(0.50),
                wait_p99: waits.value_at_quantile(0.99),
                wait_max: waits.max(),
            });
        }

        let sched_stats = sched.stats();
        Ok(WorkloadStats {
            profile: self.profile.name.clone(),
            seed: self.seed,
            system_throughput: self.profile.system_throughput,
            enqueued: sched_stats.total_enqueued,
            dispatched: sched_stats.total_dequeued,
            virtual_ticks: sched_stats.virtual_clock,
            idle_ticks: sched_stats.idle_ticks,
            clients,
            violations,
        })
    }
}

/// Per-client results of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSummary {
    /// The client.
    pub client: ClientId,
    /// Objective, limit clamped.
    pub slo: ServiceLevelObjective,
    /// Tokens enqueued.
    pub enqueued: u64,
    /// Tokens dispatched.
    pub dispatched: u64,
    /// Dispatches admitted by the reservation.
    pub reservation_dispatches: u64,
    /// Dispatches admitted by the proportional share.
    pub proportional_dispatches: u64,
    /// Tokens still queued at the end of the run.
    pub pending: usize,
    /// Median wait in virtual ticks.
    pub wait_p50: u64,
    /// 99th percentile wait in virtual ticks.
    pub wait_p99: u64,
    /// Longest wait in virtual ticks.
    pub wait_max: u64,
}

/// Statistics from a workload run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadStats {
    /// Profile name.
    pub profile: String,
    /// Seed the run used.
    pub seed: u64,
    /// Scheduler capacity baseline.
    pub system_throughput: u64,
    /// Tokens enqueued.
    pub enqueued: u64,
    /// Tokens dispatched.
    pub dispatched: u64,
    /// Virtual clock at the end of the run.
    pub virtual_ticks: u64,
    /// Ticks spent with no eligible client.
    pub idle_ticks: u64,
    /// Per-client results in profile order.
    pub clients: Vec<ClientSummary>,
    /// Verification violations found.
    pub violations: Vec<Violation>,
}

impl WorkloadStats {
    /// Returns the summary for one client.
    #[must_use]
    pub fn client(&self, client: ClientId) -> Option<&ClientSummary> {
        self.clients.iter().find(|c| c.client == client)
    }

    /// Returns whether verification found nothing.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// Prints a human-readable summary.
    pub fn print_summary(&self) {
        println!("=== Workload Statistics ===");
        println!(
            "Profile: {} (seed {}, throughput {})",
            self.profile, self.seed, self.system_throughput
        );
        println!(
            "Tokens: {} enqueued, {} dispatched over {} ticks ({} idle)",
            self.enqueued, self.dispatched, self.virtual_ticks, self.idle_ticks
        );
        for c in &self.clients {
            println!(
                "  {}: reserve={} weight={} limit={} dispatched={} (R={} P={}) pending={} \
                 wait p50={} p99={} max={}",
                c.client,
                c.slo.reserve,
                c.slo.weight,
                c.slo.limit,
                c.dispatched,
                c.reservation_dispatches,
                c.proportional_dispatches,
                c.pending,
                c.wait_p50,
                c.wait_p99,
                c.wait_max
            );
        }
        if self.violations.is_empty() {
            println!("Violations: none");
        } else {
            println!("Violations: {}", self.violations.len());
            for violation in &self.violations {
                println!("  - {violation}");
            }
        }
    }
}
