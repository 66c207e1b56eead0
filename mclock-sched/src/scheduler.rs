//! The reservation / limit / weight tag scheduler.
//!
//! Callers push opaque tokens with [`MClockScheduler::enqueue`] and pull the
//! next token with [`MClockScheduler::dequeue`]. Each dequeue advances the
//! virtual clock until some client is eligible, pops that client's oldest
//! token, charges the client's deadlines, and refreshes the deadline cache.

use mclock_core::{ClientId, ServiceLevelObjective};
use tracing::{debug, trace};

use crate::cache::DeadlineCache;
use crate::clock::VirtualClock;
use crate::config::SchedulerConfig;
use crate::error::{SchedError, SchedResult};
use crate::registry::ClientRegistry;
use crate::stats::{ClientStats, SchedulerStats};
use crate::tag::{ClientTag, SelectionMode};

/// A dispatched token with the decision that released it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch<T> {
    /// Client the token belonged to.
    pub client_id: ClientId,
    /// Series that admitted the dispatch.
    pub mode: SelectionMode,
    /// Virtual tick at which the client was selected.
    pub tick: u64,
    /// The token.
    pub token: T,
}

impl<T> Dispatch<T> {
    /// Discards the metadata and returns the token.
    pub fn into_token(self) -> T {
        self.token
    }
}

/// mClock-style scheduler over opaque tokens of type `T`.
///
/// Single-threaded by construction: every mutating call takes `&mut self`.
/// Share it behind one owning task or an external lock.
#[derive(Debug)]
pub struct MClockScheduler<T> {
    /// Capacity baseline for spacing computation.
    system_throughput: u64,

    /// Registered clients, their queues and tags.
    registry: ClientRegistry<T>,

    /// Logical time.
    clock: VirtualClock,

    /// Cached best candidates, always current before selection.
    cache: DeadlineCache,

    /// Sum of weights of every client ever registered.
    total_weight: u64,

    /// Tokens waiting across all clients.
    total_pending: usize,

    /// Total tokens enqueued.
    total_enqueued: u64,

    /// Total tokens dequeued.
    total_dequeued: u64,

    /// Clock ticks spent with no eligible client.
    idle_ticks: u64,
}

impl<T> MClockScheduler<T> {
    /// Creates a scheduler.
    ///
    /// # Errors
    ///
    /// Returns `SchedError::InvalidConfig` if the configuration is invalid.
    pub fn new(config: &SchedulerConfig) -> SchedResult<Self> {
        config.validate()?;
        Ok(Self {
            system_throughput: config.system_throughput,
            registry: ClientRegistry::with_capacity(config.client_capacity),
            clock: VirtualClock::new(),
            cache: DeadlineCache::new(),
            total_weight: 0,
            total_pending: 0,
            total_enqueued: 0,
            total_dequeued: 0,
            idle_ticks: 0,
        })
    }

    /// Creates a scheduler with default settings and the given throughput.
    ///
    /// # Errors
    ///
    /// Returns `SchedError::InvalidConfig` if `system_throughput` is zero.
    pub fn with_throughput(system_throughput: u64) -> SchedResult<Self> {
        Self::new(&SchedulerConfig::new(system_throughput))
    }

    /// Enqueues a token for a client.
    ///
    /// The first enqueue for a client registers it with `slo`; later calls
    /// ignore `slo`. Enqueueing to a registered client with an empty queue
    /// reactivates it. Every objective is accepted, including all zeros.
    ///
    /// # Errors
    ///
    /// Returns `SchedError::UnknownClient` only if the registry index is
    /// corrupt; not reachable through the public API.
    pub fn enqueue(
        &mut self,
        client_id: ClientId,
        slo: ServiceLevelObjective,
        token: T,
    ) -> SchedResult<()> {
        let index = match self.registry.lookup(client_id) {
            Some(index) => {
                if self.registry.get(index)?.queue.is_empty() {
                    self.reactivate(index)?;
                }
                index
            }
            None => self.register(client_id, slo),
        };

        self.registry.get_mut(index)?.queue.push_back(token);
        self.total_pending += 1;
        self.total_enqueued += 1;
        Ok(())
    }

    /// Dequeues the next token.
    ///
    /// # Errors
    ///
    /// Returns `SchedError::Empty` if nothing is pending.
    pub fn dequeue(&mut self) -> SchedResult<T> {
        self.dequeue_dispatch().map(Dispatch::into_token)
    }

    /// Dequeues the next token along with the scheduling decision.
    ///
    /// # Errors
    ///
    /// Returns `SchedError::Empty` if nothing is pending. Scheduler state is
    /// untouched in that case.
    pub fn dequeue_dispatch(&mut self) -> SchedResult<Dispatch<T>> {
        if self.total_pending == 0 {
            return Err(SchedError::Empty);
        }

        // Every active client has a reservation or a proportional series, so
        // the wait is bounded by the largest limit spacing.
        let mut idle = 0_u64;
        let (index, mode) = loop {
            if let Some(selected) = self.select_next()? {
                break selected;
            }
            self.clock.advance();
            idle += 1;
            self.recompute_cache();
        };
        if idle > 0 {
            self.idle_ticks += idle;
            trace!(idle_ticks = idle, now = self.clock.now(), "no client eligible");
        }

        let tick = self.clock.now();
        let entry = self.registry.get_mut(index)?;
        let token = entry
            .queue
            .pop_front()
            .ok_or(SchedError::UnknownClient { index })?;
        if entry.queue.is_empty() {
            entry.tag.deactivate();
        }
        entry.record_dispatch(mode);

        self.clock.advance();
        entry.tag.advance_deadlines();
        let client_id = entry.tag.client_id();
        self.recompute_cache();

        self.total_pending -= 1;
        self.total_dequeued += 1;
        trace!(client = %client_id, ?mode, tick, "dispatched");

        Ok(Dispatch {
            client_id,
            mode,
            tick,
            token,
        })
    }

    /// Registers a new client and rebalances proportional spacing for all.
    fn register(&mut self, client_id: ClientId, slo: ServiceLevelObjective) -> usize {
        let now = self.clock.deadline();
        let tag = ClientTag::new(client_id, slo, self.system_throughput, now);
        self.total_weight += u64::from(tag.slo().weight);
        let index = self.registry.insert(tag);

        // Every join restarts every client's proportional series at now.
        let total_weight = self.total_weight;
        for tag in self.registry.tags_mut() {
            tag.rebalance(now, total_weight);
        }
        self.recompute_cache();

        debug!(
            client = %client_id,
            index,
            reserve = slo.reserve,
            weight = slo.weight,
            limit = slo.limit,
            total_weight,
            now = self.clock.now(),
            "registered client"
        );
        index
    }

    /// Reactivates a client whose queue had drained.
    fn reactivate(&mut self, index: usize) -> SchedResult<()> {
        let now = self.clock.deadline();
        // Best-effort clients sit at infinity and are no frontier to join.
        let frontier = self
            .cache
            .best_proportional()
            .map(|best| best.deadline)
            .filter(|deadline| deadline.is_finite());

        let tag = &mut self.registry.get_mut(index)?.tag;
        tag.reactivate(now, frontier);
        debug!(
            client = %tag.client_id(),
            reservation = tag.reservation().deadline(),
            proportional = tag.proportional().deadline(),
            limit = tag.limit().deadline(),
            now = self.clock.now(),
            "reactivated client"
        );

        self.recompute_cache();
        Ok(())
    }

    /// Picks the client to serve at the current tick, if any.
    ///
    /// A due reservation always wins over the proportional lane.
    fn select_next(&mut self) -> SchedResult<Option<(usize, SelectionMode)>> {
        let now = self.clock.deadline();

        if let Some(best) = self.cache.best_reservation() {
            let tag = &mut self.registry.get_mut(best.index)?.tag;
            if tag.reservation().is_due(now) {
                tag.select(SelectionMode::Reservation);
                return Ok(Some((best.index, SelectionMode::Reservation)));
            }
        }

        if let Some(best) = self.cache.best_proportional() {
            let tag = &mut self.registry.get_mut(best.index)?.tag;
            if tag.proportional().is_configured() && tag.limit_admits(now) {
                tag.select(SelectionMode::Proportional);
                return Ok(Some((best.index, SelectionMode::Proportional)));
            }
        }

        Ok(None)
    }

    fn recompute_cache(&mut self) {
        self.cache
            .recompute(self.registry.tags(), self.clock.deadline());
    }

    /// Returns the number of pending tokens across all clients.
    #[must_use]
    pub const fn pending(&self) -> usize {
        self.total_pending
    }

    /// Returns whether nothing is pending.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.total_pending == 0
    }

    /// Returns the number of pending tokens for one client.
    #[must_use]
    pub fn pending_for(&self, client_id: ClientId) -> usize {
        self.registry
            .by_id(client_id)
            .map_or(0, |entry| entry.queue.len())
    }

    /// Returns the number of registered clients.
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.registry.len()
    }

    /// Returns the current virtual clock tick.
    #[must_use]
    pub const fn now(&self) -> u64 {
        self.clock.now()
    }

    /// Returns the sum of weights of all registered clients.
    #[must_use]
    pub const fn total_weight(&self) -> u64 {
        self.total_weight
    }

    /// Returns the capacity baseline.
    #[must_use]
    pub const fn system_throughput(&self) -> u64 {
        self.system_throughput
    }

    /// Returns a client's tag state.
    #[must_use]
    pub fn client_tag(&self, client_id: ClientId) -> Option<&ClientTag> {
        self.registry.by_id(client_id).map(|entry| &entry.tag)
    }

    /// Returns counters for one client.
    #[must_use]
    pub fn client_stats(&self, client_id: ClientId) -> Option<ClientStats> {
        self.registry.by_id(client_id).map(|entry| ClientStats {
            client_id,
            slo: *entry.tag.slo(),
            active: entry.tag.is_active(),
            pending: entry.queue.len(),
            reservation_dispatches: entry.reservation_dispatches,
            proportional_dispatches: entry.proportional_dispatches,
        })
    }

    /// Returns scheduler-wide counters.
    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        let (reservation_dispatches, proportional_dispatches) = self
            .registry
            .iter()
            .fold((0, 0), |(r, p), entry| {
                (r + entry.reservation_dispatches, p + entry.proportional_dispatches)
            });

        SchedulerStats {
            system_throughput: self.system_throughput,
            virtual_clock: self.clock.now(),
            total_weight: self.total_weight,
            registered_clients: self.registry.len(),
            active_clients: self.registry.tags().filter(|tag| tag.is_active()).count(),
            pending: self.total_pending,
            total_enqueued: self.total_enqueued,
            total_dequeued: self.total_dequeued,
            reservation_dispatches,
            proportional_dispatches,
            idle_ticks: self.idle_ticks,
        }
    }
}
