//! Virtual clock.
//!
//! A logical tick counter with no relation to wall time. Deadlines are
//! absolute positions on this clock.

/// Monotonic logical clock. Starts at 1 so that a zero deadline can mean
/// "series not configured".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualClock {
    tick: u64,
}

impl VirtualClock {
    /// The first tick of every clock.
    pub const START: u64 = 1;

    /// Creates a clock at [`Self::START`].
    #[must_use]
    pub const fn new() -> Self {
        Self { tick: Self::START }
    }

    /// Returns the current tick.
    #[must_use]
    pub const fn now(&self) -> u64 {
        self.tick
    }

    /// Returns the current tick as a deadline value.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Exact below 2^53 ticks.
    pub const fn deadline(&self) -> f64 {
        self.tick as f64
    }

    /// Advances the clock by one tick.
    pub const fn advance(&mut self) {
        self.tick = self.tick.saturating_add(1);
    }
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new()
    }
}
