//! Verification logic for detecting scheduling violations.
//!
//! Checks a recorded [`History`] for:
//! - Lost or phantom tokens (pending accounting disagrees with the history)
//! - Duplicate dispatches of the same token
//! - Tokens attributed to the wrong client
//! - FIFO violations within a client
//! - Limit ceilings exceeded
//! - Reservation floors missed while a client stayed backlogged
//! - Dispatch counts that differ from a profile's expectations

use std::collections::{BTreeMap, BTreeSet};

use mclock_core::ClientId;

use crate::history::{History, TokenTag};

/// A violation of an expected property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// The scheduler's pending count differs from enqueued minus dispatched.
    PendingMismatch {
        /// Pending count derived from the history.
        expected: usize,
        /// Pending count the scheduler reported.
        reported: usize,
    },

    /// A dispatched token was never enqueued.
    PhantomToken {
        /// The token.
        token: TokenTag,
    },

    /// The same token was dispatched more than once.
    DuplicateDispatch {
        /// The token.
        token: TokenTag,
        /// Ticks of the dispatches after the first.
        tick: u64,
    },

    /// A token came out attributed to a different client.
    Misrouted {
        /// The token.
        token: TokenTag,
        /// Client the scheduler attributed it to.
        attributed_to: ClientId,
    },

    /// A client's tokens came out of order.
    FifoViolation {
        /// The client.
        client: ClientId,
        /// Sequence number that should have come next.
        expected_seq: u64,
        /// Sequence number that came out.
        actual_seq: u64,
    },

    /// A client was dispatched more often than its limit allows.
    LimitExceeded {
        /// The client.
        client: ClientId,
        /// Tick at which the ceiling was first crossed.
        tick: u64,
        /// Dispatches up to and including that tick.
        dispatches: u64,
        /// Dispatches the limit allows by that tick.
        allowed: u64,
    },

    /// A backlogged client received less than its reservation.
    ReservationShortfall {
        /// The client.
        client: ClientId,
        /// Dispatches received.
        dispatches: u64,
        /// Dispatches the reservation guarantees over the run.
        floor: u64,
    },

    /// A client's dispatch count differs from the expected count.
    UnexpectedCount {
        /// The client.
        client: ClientId,
        /// Expected dispatches.
        expected: u64,
        /// Actual dispatches.
        actual: u64,
    },
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PendingMismatch { expected, reported } => {
                write!(
                    f,
                    "Pending mismatch: history implies {expected} pending, scheduler reports {reported}"
                )
            }
            Self::PhantomToken { token } => {
                write!(f, "Phantom token: {}#{} dispatched but never enqueued", token.client, token.seq)
            }
            Self::DuplicateDispatch { token, tick } => {
                write!(f, "Duplicate dispatch: {}#{} dispatched again at tick {tick}", token.client, token.seq)
            }
            Self::Misrouted {
                token,
                attributed_to,
            } => {
                write!(
                    f,
                    "Misrouted: {}#{} attributed to {attributed_to}",
                    token.client, token.seq
                )
            }
            Self::FifoViolation {
                client,
                expected_seq,
                actual_seq,
            } => {
                write!(
                    f,
                    "FIFO violation: {client} expected #{expected_seq}, got #{actual_seq}"
                )
            }
            Self::LimitExceeded {
                client,
                tick,
                dispatches,
                allowed,
            } => {
                write!(
                    f,
                    "Limit exceeded: {client} had {dispatches} dispatches by tick {tick}, limit allows {allowed}"
                )
            }
            Self::ReservationShortfall {
                client,
                dispatches,
                floor,
            } => {
                write!(
                    f,
                    "Reservation shortfall: {client} got {dispatches} dispatches, reservation guarantees {floor}"
                )
            }
            Self::UnexpectedCount {
                client,
                expected,
                actual,
            } => {
                write!(f, "Unexpected count: {client} expected {expected} dispatches, got {actual}")
            }
        }
    }
}

/// Verification runner that checks all properties.
pub struct Verification;

impl Verification {
    /// Runs every check that holds for any arrival pattern.
    #[must_use]
    pub fn verify(history: &History) -> Vec<Violation> {
        let mut violations = Vec::new();

        violations.extend(Self::check_accounting(history));
        violations.extend(Self::check_tokens(history));
        violations.extend(Self::check_fifo(history));
        violations.extend(Self::check_limits(history));
        // Reservation floors and expected counts depend on the arrival
        // pattern; the workload runs them when they apply.

        violations
    }

    /// Checks the scheduler's reported pending count against the history.
    #[must_use]
    pub fn check_accounting(history: &History) -> Vec<Violation> {
        let Some(reported) = history.reported_pending() else {
            return Vec::new();
        };
        let expected = history
            .enqueues()
            .len()
            .saturating_sub(history.dispatches().len());

        if expected == reported {
            Vec::new()
        } else {
            vec![Violation::PendingMismatch { expected, reported }]
        }
    }

    /// Checks that every dispatched token was enqueued, is dispatched once,
    /// and is attributed to its own client.
    #[must_use]
    pub fn check_tokens(history: &History) -> Vec<Violation> {
        let mut violations = Vec::new();
        let mut seen = BTreeSet::new();

        for dispatch in history.dispatches() {
            let token = dispatch.token;
            if history.enqueued_at(&token).is_none() {
                violations.push(Violation::PhantomToken { token });
            }
            if !seen.insert(token) {
                violations.push(Violation::DuplicateDispatch {
                    token,
                    tick: dispatch.tick,
                });
            }
            if dispatch.client != token.client {
                violations.push(Violation::Misrouted {
                    token,
                    attributed_to: dispatch.client,
                });
            }
        }

        violations
    }

    /// Checks that each client's tokens come out in sequence order.
    #[must_use]
    pub fn check_fifo(history: &History) -> Vec<Violation> {
        let mut violations = Vec::new();
        let mut next: BTreeMap<ClientId, u64> = BTreeMap::new();

        for dispatch in history.dispatches() {
            let token = dispatch.token;
            let expected_seq = next.entry(token.client).or_insert(0);
            if token.seq != *expected_seq {
                violations.push(Violation::FifoViolation {
                    client: token.client,
                    expected_seq: *expected_seq,
                    actual_seq: token.seq,
                });
            }
            *expected_seq = token.seq + 1;
        }

        violations
    }

    /// Checks that no client exceeds its limit.
    ///
    /// The limit series starts at registration and advances one spacing per
    /// dispatch, so by tick `t` a client can have at most
    /// `floor((t - registered) * limit / throughput) + 1` dispatches.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn check_limits(history: &History) -> Vec<Violation> {
        let mut violations = Vec::new();
        let throughput = history.system_throughput() as f64;

        for (&client, registration) in history.registrations() {
            let limit = registration.slo.limit;
            if limit == 0 {
                continue;
            }
            for (dispatches, record) in (1_u64..).zip(history.dispatches_for(client)) {
                let elapsed = record.tick.saturating_sub(registration.tick) as f64;
                let spacings = elapsed * limit as f64 / throughput;
                let allowed = (spacings + 1e-6).floor() as u64 + 1;
                if dispatches > allowed {
                    violations.push(Violation::LimitExceeded {
                        client,
                        tick: record.tick,
                        dispatches,
                        allowed,
                    });
                    break;
                }
            }
        }

        violations
    }

    /// Checks that every reserved client that stayed backlogged until the
    /// last dispatch received its reservation over the run.
    ///
    /// Only meaningful when all tokens were enqueued up front and the
    /// reservations fit in the system throughput. One dispatch of slack
    /// absorbs ties among reserved clients.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn check_reservation_floor(history: &History) -> Vec<Violation> {
        let mut violations = Vec::new();
        let Some(last_tick) = history.last_tick() else {
            return violations;
        };
        let throughput = history.system_throughput() as f64;

        for (&client, registration) in history.registrations() {
            let reserve = registration.slo.reserve;
            if reserve == 0 {
                continue;
            }
            let dispatches = history.dispatches_for(client).count() as u64;
            if dispatches >= history.enqueued_for(client) {
                // Drained before the end; the floor no longer applies.
                continue;
            }

            let window = (last_tick.saturating_sub(registration.tick) + 1) as f64;
            let floor = (window * reserve as f64 / throughput).floor() as u64;
            if dispatches + 1 < floor {
                violations.push(Violation::ReservationShortfall {
                    client,
                    dispatches,
                    floor,
                });
            }
        }

        violations
    }

    /// Checks per-client dispatch counts against expectations.
    #[must_use]
    pub fn check_expected_counts(
        history: &History,
        expected: &BTreeMap<ClientId, u64>,
    ) -> Vec<Violation> {
        expected
            .iter()
            .filter_map(|(&client, &expected)| {
                let actual = history.dispatches_for(client).count() as u64;
                (actual != expected).then_some(Violation::UnexpectedCount {
                    client,
                    expected,
                    actual,
                })
            })
            .collect()
    }
}
