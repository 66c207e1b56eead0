//! Per-client service level objectives.
//!
//! An SLO is three rates expressed in the same capacity units as the
//! scheduler's system throughput. A zero in any field disables that series.

/// Reservation, weight, and limit for one client.
///
/// Captured by the scheduler on a client's first enqueue and never changed
/// afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ServiceLevelObjective {
    /// Guaranteed minimum throughput (0 = no reservation).
    pub reserve: u64,

    /// Relative share of residual capacity (0 = no proportional share).
    pub weight: u32,

    /// Throughput ceiling (0 = unlimited).
    pub limit: u64,
}

impl ServiceLevelObjective {
    /// Creates an SLO from its three rates.
    #[must_use]
    pub const fn new(reserve: u64, weight: u32, limit: u64) -> Self {
        Self {
            reserve,
            weight,
            limit,
        }
    }

    /// Creates an SLO that only participates in proportional sharing.
    #[must_use]
    pub const fn weighted(weight: u32) -> Self {
        Self::new(0, weight, 0)
    }

    /// Creates an SLO that only holds a reservation.
    #[must_use]
    pub const fn reserved(reserve: u64) -> Self {
        Self::new(reserve, 0, 0)
    }

    /// Sets the reservation.
    #[must_use]
    pub const fn with_reserve(mut self, reserve: u64) -> Self {
        self.reserve = reserve;
        self
    }

    /// Sets the weight.
    #[must_use]
    pub const fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    /// Sets the limit.
    #[must_use]
    pub const fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    /// Returns the SLO with `limit` raised to at least `reserve`.
    #[must_use]
    pub const fn normalized(mut self) -> Self {
        if self.limit < self.reserve {
            self.limit = self.reserve;
        }
        self
    }

    /// Returns whether a reservation is configured.
    #[must_use]
    pub const fn has_reservation(&self) -> bool {
        self.reserve > 0
    }

    /// Returns whether a weight is configured.
    #[must_use]
    pub const fn has_weight(&self) -> bool {
        self.weight > 0
    }

    /// Returns whether a limit is configured.
    #[must_use]
    pub const fn has_limit(&self) -> bool {
        self.limit > 0
    }

    /// Returns whether the SLO has neither a reservation nor a weight.
    ///
    /// Such a client is still served, but only from capacity no weighted
    /// client claims.
    #[must_use]
    pub const fn is_best_effort(&self) -> bool {
        !self.has_reservation() && !self.has_weight()
    }
}
