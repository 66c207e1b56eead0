//! Minimum-deadline cache.
//!
//! Holds the best reservation candidate and the best proportional candidate
//! among active clients whose limit gate is open. Rebuilt by a linear scan
//! after every tag mutation; client counts are small enough that a heap would
//! only add tie-break hazards.

use crate::tag::ClientTag;

/// A client index paired with the deadline that made it the best candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// Registry index of the client.
    pub index: usize,
    /// The winning deadline.
    pub deadline: f64,
}

/// The two cached minima.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DeadlineCache {
    reservation: Option<Candidate>,
    proportional: Option<Candidate>,
}

impl DeadlineCache {
    /// Creates an empty cache.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            reservation: None,
            proportional: None,
        }
    }

    /// Returns the active, limit-admitted client with the smallest
    /// reservation deadline.
    #[must_use]
    pub const fn best_reservation(&self) -> Option<Candidate> {
        self.reservation
    }

    /// Returns the active, limit-admitted client with the smallest
    /// proportional deadline.
    #[must_use]
    pub const fn best_proportional(&self) -> Option<Candidate> {
        self.proportional
    }

    /// Rebuilds both minima from `tags` in registry order.
    ///
    /// On equal deadlines the later client takes the slot.
    pub fn recompute<'a, I>(&mut self, tags: I, now: f64)
    where
        I: IntoIterator<Item = &'a ClientTag>,
    {
        self.reservation = None;
        self.proportional = None;

        for (index, tag) in tags.into_iter().enumerate() {
            if !tag.is_active() || !tag.limit_admits(now) {
                continue;
            }
            if tag.reservation().is_configured() {
                keep_min(&mut self.reservation, index, tag.reservation().deadline());
            }
            if tag.proportional().is_configured() {
                keep_min(&mut self.proportional, index, tag.proportional().deadline());
            }
        }
    }
}

fn keep_min(slot: &mut Option<Candidate>, index: usize, deadline: f64) {
    match slot {
        Some(best) if best.deadline < deadline => {}
        _ => *slot = Some(Candidate { index, deadline }),
    }
}
