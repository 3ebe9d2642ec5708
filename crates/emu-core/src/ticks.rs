//! Monotonic T-state count.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A count of T-states since power-on or the last hard reset.
///
/// Never wraps within a machine's lifetime, unlike the per-frame tact
/// counter a CPU keeps alongside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ticks(pub u64);

impl Ticks {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn new(count: u64) -> Self {
        Self(count)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Count one more T-state.
    pub fn advance(&mut self) {
        self.0 += 1;
    }
}

impl core::ops::Sub for Ticks {
    type Output = Self;

    /// Elapsed ticks; an earlier minus a later count clamps to zero.
    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}
