//! Master clock configuration.

use crate::Ticks;

/// Clock that drives a CPU.
///
/// Frame timing derives from the crystal frequency and the video refresh
/// rate. Machines with an exact per-frame T-state count (69,888 on the 48K
/// Spectrum) should use that figure directly instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasterClock {
    /// CPU clock frequency in Hz (e.g., `3_500_000` for a 48K Spectrum).
    pub frequency_hz: u64,
}

impl MasterClock {
    #[must_use]
    pub const fn new(frequency_hz: u64) -> Self {
        Self { frequency_hz }
    }

    /// Ticks per frame at the given frame rate (integer division).
    ///
    /// Returns zero ticks when `frames_per_second` is zero.
    #[must_use]
    pub const fn ticks_per_frame(&self, frames_per_second: u64) -> Ticks {
        if frames_per_second == 0 {
            return Ticks::ZERO;
        }
        Ticks::new(self.frequency_hz / frames_per_second)
    }

    /// The same clock running `multiplier` times faster.
    #[must_use]
    pub const fn scaled(&self, multiplier: u64) -> Self {
        Self::new(self.frequency_hz * multiplier)
    }
}
