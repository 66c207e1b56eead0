//! Scheduler statistics.

use mclock_core::{ClientId, ServiceLevelObjective};

/// Scheduler-wide counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Capacity baseline the scheduler was built with.
    pub system_throughput: u64,
    /// Current virtual clock tick.
    pub virtual_clock: u64,
    /// Sum of weights over all registered clients.
    pub total_weight: u64,
    /// Clients registered so far.
    pub registered_clients: usize,
    /// Clients with pending work.
    pub active_clients: usize,
    /// Tokens waiting across all clients.
    pub pending: usize,
    /// Total tokens enqueued.
    pub total_enqueued: u64,
    /// Total tokens dequeued.
    pub total_dequeued: u64,
    /// Dispatches admitted by a reservation deadline.
    pub reservation_dispatches: u64,
    /// Dispatches admitted by a proportional deadline.
    pub proportional_dispatches: u64,
    /// Clock ticks spent with no eligible client.
    pub idle_ticks: u64,
}

/// Per-client counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientStats {
    /// The client.
    pub client_id: ClientId,
    /// SLO as captured at registration, limit clamped.
    pub slo: ServiceLevelObjective,
    /// Whether the client has pending work.
    pub active: bool,
    /// Tokens waiting for this client.
    pub pending: usize,
    /// Dispatches admitted by the reservation series.
    pub reservation_dispatches: u64,
    /// Dispatches admitted by the proportional series.
    pub proportional_dispatches: u64,
}

impl ClientStats {
    /// Total dispatches for this client.
    #[must_use]
    pub const fn dispatches(&self) -> u64 {
        self.reservation_dispatches + self.proportional_dispatches
    }
}
