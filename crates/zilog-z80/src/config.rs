//! CPU construction parameters.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use emu_core::MasterClock;
use thiserror::Error;

/// Highest supported overclock factor.
pub const MAX_CLOCK_MULTIPLIER: u32 = 16;

/// T-states per frame of a 48K Spectrum (3.5 MHz, 50.08 Hz).
pub const DEFAULT_TACTS_PER_FRAME: u64 = 69_888;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("frame length must be at least one T-state")]
    ZeroFrameLength,
    #[error("clock multiplier {0} is outside 1..={max}", max = MAX_CLOCK_MULTIPLIER)]
    ClockMultiplier(u32),
}

/// Timing setup for a [`Z80`](crate::Z80).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Z80Config {
    pub tacts_per_frame: u64,
    pub clock_multiplier: u32,
    /// Ask the bus for contention delays on address-only cycles and
    /// memory/port accesses.
    pub delayed_address_bus: bool,
}

impl Default for Z80Config {
    fn default() -> Self {
        Self {
            tacts_per_frame: DEFAULT_TACTS_PER_FRAME,
            clock_multiplier: 1,
            delayed_address_bus: false,
        }
    }
}

impl Z80Config {
    /// Frame length derived from a crystal frequency and a frame rate.
    #[must_use]
    pub fn from_master_clock(clock: MasterClock, frames_per_second: u64) -> Self {
        Self {
            tacts_per_frame: clock.ticks_per_frame(frames_per_second).get(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_clock_multiplier(mut self, multiplier: u32) -> Self {
        self.clock_multiplier = multiplier;
        self
    }

    #[must_use]
    pub fn with_contention(mut self, enabled: bool) -> Self {
        self.delayed_address_bus = enabled;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tacts_per_frame == 0 {
            return Err(ConfigError::ZeroFrameLength);
        }
        if !(1..=MAX_CLOCK_MULTIPLIER).contains(&self.clock_multiplier) {
            return Err(ConfigError::ClockMultiplier(self.clock_multiplier));
        }
        Ok(())
    }
}
