//! History recording for workload verification.
//!
//! Tracks every registration, enqueue and dispatch of a run, indexed for the
//! verification queries.

use std::collections::BTreeMap;

use mclock_core::{ClientId, ServiceLevelObjective};
use mclock_sched::{Dispatch, SelectionMode};

/// A token as submitted by the workload: its client and a per-client
/// sequence number assigned in enqueue order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenTag {
    /// Client the token was enqueued for.
    pub client: ClientId,
    /// Per-client sequence number, starting at 0.
    pub seq: u64,
}

/// A client's first appearance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    /// Objective submitted with the first token, limit already clamped.
    pub slo: ServiceLevelObjective,
    /// Virtual tick at registration.
    pub tick: u64,
}

/// One recorded dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchRecord {
    /// Client the scheduler attributed the dispatch to.
    pub client: ClientId,
    /// The token that came out.
    pub token: TokenTag,
    /// Series that admitted the dispatch.
    pub mode: SelectionMode,
    /// Virtual tick at selection.
    pub tick: u64,
}

/// Aggregate counts over a history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryStats {
    /// Tokens enqueued.
    pub enqueued: u64,
    /// Tokens dispatched.
    pub dispatched: u64,
    /// Dispatches admitted by a reservation.
    pub reservation_dispatches: u64,
    /// Dispatches admitted by a proportional share.
    pub proportional_dispatches: u64,
}

/// Complete history of a workload run.
#[derive(Debug, Default)]
pub struct History {
    /// System throughput the run was scheduled against.
    system_throughput: u64,

    /// Client registrations.
    registrations: BTreeMap<ClientId, Registration>,

    /// Enqueue tick per token.
    enqueues: BTreeMap<TokenTag, u64>,

    /// Dispatches in order.
    dispatches: Vec<DispatchRecord>,

    /// Pending count the scheduler reported at the end of the run.
    reported_pending: Option<usize>,
}

impl History {
    /// Creates an empty history for a run at `system_throughput`.
    #[must_use]
    pub fn new(system_throughput: u64) -> Self {
        Self {
            system_throughput,
            ..Self::default()
        }
    }

    /// Records a client's first enqueue.
    pub fn record_registration(&mut self, client: ClientId, slo: ServiceLevelObjective, tick: u64) {
        self.registrations.entry(client).or_insert(Registration {
            slo: slo.normalized(),
            tick,
        });
    }

    /// Records an enqueue.
    pub fn record_enqueue(&mut self, token: TokenTag, tick: u64) {
        self.enqueues.insert(token, tick);
    }

    /// Records a dispatch.
    pub fn record_dispatch(&mut self, dispatch: &Dispatch<TokenTag>) {
        self.dispatches.push(DispatchRecord {
            client: dispatch.client_id,
            token: dispatch.token,
            mode: dispatch.mode,
            tick: dispatch.tick,
        });
    }

    /// Records the scheduler's own pending count at the end of the run.
    pub fn record_pending(&mut self, pending: usize) {
        self.reported_pending = Some(pending);
    }

    /// Returns the system throughput.
    #[must_use]
    pub const fn system_throughput(&self) -> u64 {
        self.system_throughput
    }

    /// Returns all registrations.
    #[must_use]
    pub const fn registrations(&self) -> &BTreeMap<ClientId, Registration> {
        &self.registrations
    }

    /// Returns a client's registration.
    #[must_use]
    pub fn registration(&self, client: ClientId) -> Option<&Registration> {
        self.registrations.get(&client)
    }

    /// Returns enqueue ticks by token.
    #[must_use]
    pub const fn enqueues(&self) -> &BTreeMap<TokenTag, u64> {
        &self.enqueues
    }

    /// Returns the tick at which a token was enqueued.
    #[must_use]
    pub fn enqueued_at(&self, token: &TokenTag) -> Option<u64> {
        self.enqueues.get(token).copied()
    }

    /// Returns all dispatches in order.
    #[must_use]
    pub fn dispatches(&self) -> &[DispatchRecord] {
        &self.dispatches
    }

    /// Returns the dispatches attributed to one client, in order.
    pub fn dispatches_for(&self, client: ClientId) -> impl Iterator<Item = &DispatchRecord> {
        self.dispatches.iter().filter(move |d| d.client == client)
    }

    /// Returns the number of tokens enqueued for one client.
    #[must_use]
    pub fn enqueued_for(&self, client: ClientId) -> u64 {
        let first = TokenTag { client, seq: 0 };
        self.enqueues
            .range(first..)
            .take_while(|(token, _)| token.client == client)
            .count() as u64
    }

    /// Returns the tick of the last dispatch.
    #[must_use]
    pub fn last_tick(&self) -> Option<u64> {
        self.dispatches.last().map(|d| d.tick)
    }

    /// Returns the pending count the scheduler reported, if recorded.
    #[must_use]
    pub const fn reported_pending(&self) -> Option<usize> {
        self.reported_pending
    }

    /// Returns aggregate counts.
    #[must_use]
    pub fn stats(&self) -> HistoryStats {
        let mut stats = HistoryStats {
            enqueued: self.enqueues.len() as u64,
            dispatched: self.dispatches.len() as u64,
            ..HistoryStats::default()
        };
        for dispatch in &self.dispatches {
            match dispatch.mode {
                SelectionMode::Reservation => stats.reservation_dispatches += 1,
                SelectionMode::Proportional => stats.proportional_dispatches += 1,
            }
        }
        stats
    }
}
