//! Per-client deadline tags.
//!
//! Each client carries three deadline series on the virtual clock:
//!
//! | Series | Spacing | Role |
//! |--------|---------|------|
//! | Reservation | `throughput / reserve` | Minimum rate, always served first when due |
//! | Limit | `throughput / limit` | Ceiling; gates both other series |
//! | Proportional | `total_weight / weight` | Share of residual capacity |
//!
//! A deadline of zero means the series is not configured. The clock starts at
//! 1, so every configured deadline is positive. A client with neither a
//! reservation nor a weight has an infinite proportional spacing.

use mclock_core::{ClientId, ServiceLevelObjective};

/// Which series admitted a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionMode {
    /// The client's reservation deadline was due.
    Reservation,
    /// The client had the smallest proportional deadline among admitted clients.
    Proportional,
}

/// One deadline series: the next due tick and the increment applied each time
/// the series is charged.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DeadlineSeries {
    deadline: f64,
    spacing: f64,
}

impl DeadlineSeries {
    /// A series that never participates.
    pub const UNCONFIGURED: Self = Self {
        deadline: 0.0,
        spacing: 0.0,
    };

    const fn starting_at(now: f64, spacing: f64) -> Self {
        Self {
            deadline: now,
            spacing,
        }
    }

    /// Returns the next due tick (0 when unconfigured).
    #[must_use]
    pub const fn deadline(&self) -> f64 {
        self.deadline
    }

    /// Returns the per-charge increment (0 when unconfigured).
    #[must_use]
    pub const fn spacing(&self) -> f64 {
        self.spacing
    }

    /// Returns whether this series participates in scheduling.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.deadline > 0.0
    }

    /// Returns whether the deadline has been reached at `now`.
    #[must_use]
    pub fn is_due(&self, now: f64) -> bool {
        self.deadline <= now
    }

    fn charge(&mut self) {
        if self.spacing > 0.0 {
            self.deadline += self.spacing;
        }
    }

    /// Moves the deadline one spacing forward, but never behind `now`. Credit
    /// accrued while idle is forfeited.
    fn resume(&mut self, now: f64) {
        if self.is_configured() {
            self.deadline = (self.deadline + self.spacing).max(now);
        }
    }
}

/// Tag state for one registered client.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientTag {
    client_id: ClientId,
    slo: ServiceLevelObjective,
    reservation: DeadlineSeries,
    limit: DeadlineSeries,
    proportional: DeadlineSeries,
    active: bool,
    last_selection: Option<SelectionMode>,
}

impl ClientTag {
    /// Creates the tag for a newly registered client.
    ///
    /// The limit is clamped to the reservation. The proportional series stays
    /// unconfigured until [`Self::rebalance`] runs with the new total weight.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Rates are far below 2^53.
    pub fn new(
        client_id: ClientId,
        slo: ServiceLevelObjective,
        system_throughput: u64,
        now: f64,
    ) -> Self {
        let slo = slo.normalized();
        let throughput = system_throughput as f64;

        let reservation = if slo.has_reservation() {
            DeadlineSeries::starting_at(now, throughput / slo.reserve as f64)
        } else {
            DeadlineSeries::UNCONFIGURED
        };
        let limit = if slo.has_limit() {
            DeadlineSeries::starting_at(now, throughput / slo.limit as f64)
        } else {
            DeadlineSeries::UNCONFIGURED
        };

        Self {
            client_id,
            slo,
            reservation,
            limit,
            proportional: DeadlineSeries::UNCONFIGURED,
            active: true,
            last_selection: None,
        }
    }

    /// Returns the client ID.
    #[must_use]
    pub const fn client_id(&self) -> ClientId {
        self.client_id
    }

    /// Returns the SLO as captured at registration (limit already clamped).
    #[must_use]
    pub const fn slo(&self) -> &ServiceLevelObjective {
        &self.slo
    }

    /// Returns the reservation series.
    #[must_use]
    pub const fn reservation(&self) -> &DeadlineSeries {
        &self.reservation
    }

    /// Returns the limit series.
    #[must_use]
    pub const fn limit(&self) -> &DeadlineSeries {
        &self.limit
    }

    /// Returns the proportional series.
    #[must_use]
    pub const fn proportional(&self) -> &DeadlineSeries {
        &self.proportional
    }

    /// Returns whether the client has queued work.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Returns the path used by the most recent selection of this client.
    #[must_use]
    pub const fn last_selection(&self) -> Option<SelectionMode> {
        self.last_selection
    }

    /// Returns whether the limit gate is open at `now`. An unconfigured limit
    /// keeps its zero deadline and is always open.
    #[must_use]
    pub fn limit_admits(&self, now: f64) -> bool {
        self.limit.is_due(now)
    }

    /// Restarts the proportional series at `now` with spacing derived from the
    /// new total weight. Runs for every client whenever any client joins.
    ///
    /// A best-effort client gets infinite spacing: one dispatch at `now`, then
    /// it only wins when no finite proportional deadline is eligible.
    #[allow(clippy::cast_precision_loss)]
    pub fn rebalance(&mut self, now: f64, total_weight: u64) {
        if self.slo.has_weight() {
            let spacing = total_weight as f64 / f64::from(self.slo.weight);
            self.proportional = DeadlineSeries::starting_at(now, spacing);
        } else if self.slo.is_best_effort() {
            self.proportional = DeadlineSeries::starting_at(now, f64::INFINITY);
        }
    }

    /// Marks the client active again after its queue drained.
    ///
    /// Reservation and limit resume no earlier than `now`. The proportional
    /// deadline joins `frontier`, the smallest proportional deadline among the
    /// other eligible clients; without one it is clamped to `now`.
    pub fn reactivate(&mut self, now: f64, frontier: Option<f64>) {
        self.active = true;
        self.reservation.resume(now);
        if self.proportional.is_configured() {
            let current = self.proportional.deadline;
            self.proportional.deadline = frontier.unwrap_or_else(|| current.max(now));
        }
        self.limit.resume(now);
    }

    /// Marks the client idle. Deadlines are kept for reactivation.
    pub const fn deactivate(&mut self) {
        self.active = false;
    }

    /// Records the path that selected this client.
    pub const fn select(&mut self, mode: SelectionMode) {
        self.last_selection = Some(mode);
    }

    /// Charges the series consumed by one dispatch.
    ///
    /// Reservation credit is only consumed when the reservation path admitted
    /// the dispatch; proportional share and limit budget are always consumed.
    pub fn advance_deadlines(&mut self) {
        if self.last_selection == Some(SelectionMode::Reservation) {
            self.reservation.charge();
        }
        self.proportional.charge();
        self.limit.charge();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(reserve: u64, weight: u32, limit: u64, throughput: u64) -> ClientTag {
        ClientTag::new(
            ClientId::new(1),
            ServiceLevelObjective::new(reserve, weight, limit),
            throughput,
            1.0,
        )
    }

    #[test]
    fn test_new_tag_spacings() {
        let tag = tag(250, 100, 1000, 2000);

        assert!(tag.is_active());
        assert!((tag.reservation().deadline() - 1.0).abs() < f64::EPSILON);
        assert!((tag.reservation().spacing() - 8.0).abs() < f64::EPSILON);
        assert!((tag.limit().spacing() - 2.0).abs() < f64::EPSILON);
        assert!(!tag.proportional().is_configured());
    }

    #[test]
    fn test_unconfigured_series() {
        let tag = tag(0, 10, 0, 1000);
        assert!(!tag.reservation().is_configured());
        assert!(!tag.limit().is_configured());
        // Open limit gate regardless of the clock.
        assert!(tag.limit_admits(1.0));
    }

    #[test]
    fn test_limit_clamped_to_reserve() {
        let tag = tag(500, 1, 100, 1000);
        assert_eq!(tag.slo().limit, 500);
        assert!((tag.limit().spacing() - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rebalance_uses_total_weight() {
        let mut tag = tag(0, 100, 0, 1000);
        tag.rebalance(7.0, 400);

        assert!((tag.proportional().deadline() - 7.0).abs() < f64::EPSILON);
        assert!((tag.proportional().spacing() - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rebalance_skips_zero_weight() {
        let mut tag = tag(100, 0, 0, 1000);
        tag.rebalance(7.0, 400);
        assert!(!tag.proportional().is_configured());
    }

    #[test]
    fn test_best_effort_proportional_series() {
        let mut tag = tag(0, 0, 0, 1000);
        // No weighted client yet: the spacing stays infinite, never NaN.
        tag.rebalance(4.0, 0);
        assert!((tag.proportional().deadline() - 4.0).abs() < f64::EPSILON);
        assert!(tag.proportional().spacing().is_infinite());

        tag.select(SelectionMode::Proportional);
        tag.advance_deadlines();
        assert!(tag.proportional().is_configured());
        assert!(tag.proportional().deadline().is_infinite());

        tag.rebalance(9.0, 300);
        assert!((tag.proportional().deadline() - 9.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_advance_charges_reservation_only_on_reservation_path() {
        let mut tag = tag(250, 100, 500, 1000);
        tag.rebalance(1.0, 100);

        tag.select(SelectionMode::Proportional);
        tag.advance_deadlines();
        assert!((tag.reservation().deadline() - 1.0).abs() < f64::EPSILON);
        assert!((tag.proportional().deadline() - 2.0).abs() < f64::EPSILON);
        assert!((tag.limit().deadline() - 3.0).abs() < f64::EPSILON);

        tag.select(SelectionMode::Reservation);
        tag.advance_deadlines();
        assert!((tag.reservation().deadline() - 5.0).abs() < f64::EPSILON);
        assert!((tag.proportional().deadline() - 3.0).abs() < f64::EPSILON);
        assert!((tag.limit().deadline() - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_reactivate_clamps_to_now() {
        let mut tag = tag(100, 1, 200, 1000);
        tag.rebalance(1.0, 1);
        tag.deactivate();

        // Long idle period: deadlines resume at now, not at the stale value.
        tag.reactivate(50.0, Some(42.0));
        assert!(tag.is_active());
        assert!((tag.reservation().deadline() - 50.0).abs() < f64::EPSILON);
        assert!((tag.limit().deadline() - 50.0).abs() < f64::EPSILON);
        assert!((tag.proportional().deadline() - 42.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_reactivate_short_idle_adds_one_spacing() {
        let mut tag = tag(100, 1, 200, 1000);
        tag.deactivate();

        // Reservation spacing 10, limit spacing 5; now is still close.
        tag.reactivate(3.0, None);
        assert!((tag.reservation().deadline() - 11.0).abs() < f64::EPSILON);
        assert!((tag.limit().deadline() - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_reactivate_without_frontier_clamps_proportional() {
        let mut tag = tag(0, 1, 0, 1000);
        tag.rebalance(1.0, 1);
        tag.deactivate();

        tag.reactivate(9.0, None);
        assert!((tag.proportional().deadline() - 9.0).abs() < f64::EPSILON);
    }
}
