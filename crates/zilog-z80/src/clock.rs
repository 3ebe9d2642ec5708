//! T-state bookkeeping and bus contention.
//!
//! The CPU advances time one T-state at a time. Every tick bumps the frame
//! counter and the monotonic total, wraps at the end of the frame, and calls
//! the bus hook so peripherals can run in lock-step.
//!
//! The `_with_address` primitives model cycles where an address sits on the
//! bus without a full memory access. When `delayed_address_bus` is enabled
//! they ask the bus for contention wait states before ticking.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use emu_core::{Bus, Ticks};

use crate::cpu::Z80;

/// Frame-relative T-state counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Clock {
    /// T-state within the current frame.
    pub tacts: u64,
    /// Completed frames.
    pub frames: u64,
    /// Raised when a frame wraps. The embedder clears it.
    pub frame_completed: bool,
    /// Frame length at normal speed.
    pub tacts_per_frame: u64,
    /// Overclock factor; a frame lasts `tacts_per_frame × clock_multiplier`.
    pub clock_multiplier: u32,
    /// T-states since the last hard reset. Never wraps.
    pub total: Ticks,
}

impl Clock {
    #[must_use]
    pub const fn new(tacts_per_frame: u64, clock_multiplier: u32) -> Self {
        Self {
            tacts: 0,
            frames: 0,
            frame_completed: false,
            tacts_per_frame,
            clock_multiplier,
            total: Ticks::ZERO,
        }
    }

    /// T-states in one frame at the current multiplier. Zero disables
    /// frame wrapping. Saturates for lengths past `u64::MAX`.
    #[must_use]
    pub fn frame_length(&self) -> u64 {
        self.tacts_per_frame
            .saturating_mul(u64::from(self.clock_multiplier.max(1)))
    }

    /// Advance one T-state.
    pub fn tick(&mut self) {
        self.total.advance();
        self.tacts += 1;
        let length = self.frame_length();
        if length != 0 && self.tacts >= length {
            self.tacts = 0;
            self.frames += 1;
            self.frame_completed = true;
        }
    }

    /// Acknowledge a completed frame.
    pub fn clear_frame_completed(&mut self) {
        self.frame_completed = false;
    }

    /// Zero all counters, keeping frame length and multiplier.
    pub fn restart(&mut self) {
        self.tacts = 0;
        self.frames = 0;
        self.frame_completed = false;
        self.total = Ticks::ZERO;
    }
}

impl Z80 {
    pub fn tact_plus1<B: Bus>(&mut self, bus: &mut B) {
        self.clock.tick();
        bus.tact_incremented();
    }

    pub fn tact_plus2<B: Bus>(&mut self, bus: &mut B) {
        self.tact_plus1(bus);
        self.tact_plus1(bus);
    }

    pub fn tact_plus3<B: Bus>(&mut self, bus: &mut B) {
        self.tact_plus2(bus);
        self.tact_plus1(bus);
    }

    pub fn tact_plus4<B: Bus>(&mut self, bus: &mut B) {
        self.tact_plus2(bus);
        self.tact_plus2(bus);
    }

    pub fn tact_plus5<B: Bus>(&mut self, bus: &mut B) {
        self.tact_plus4(bus);
        self.tact_plus1(bus);
    }

    pub fn tact_plus6<B: Bus>(&mut self, bus: &mut B) {
        self.tact_plus4(bus);
        self.tact_plus2(bus);
    }

    pub fn tact_plus7<B: Bus>(&mut self, bus: &mut B) {
        self.tact_plus4(bus);
        self.tact_plus3(bus);
    }

    pub fn tact_plus_n<B: Bus>(&mut self, bus: &mut B, count: u32) {
        for _ in 0..count {
            self.tact_plus1(bus);
        }
    }

    /// Insert read-side wait states for `address`, if contention is modelled.
    pub(crate) fn contend_read<B: Bus>(&mut self, bus: &mut B, address: u16) {
        if self.delayed_address_bus {
            let wait = bus.read_contention(address, self.clock.tacts);
            self.tact_plus_n(bus, u32::from(wait));
        }
    }

    /// Insert write-side wait states for `address`, if contention is modelled.
    pub(crate) fn contend_write<B: Bus>(&mut self, bus: &mut B, address: u16) {
        if self.delayed_address_bus {
            let wait = bus.write_contention(address, self.clock.tacts);
            self.tact_plus_n(bus, u32::from(wait));
        }
    }

    pub fn tact_plus1_with_address<B: Bus>(&mut self, bus: &mut B, address: u16) {
        self.contend_read(bus, address);
        self.tact_plus1(bus);
    }

    /// One contention probe, then two T-states.
    pub fn tact_plus2_with_address<B: Bus>(&mut self, bus: &mut B, address: u16) {
        self.contend_read(bus, address);
        self.tact_plus2(bus);
    }

    pub fn tact_plus4_with_address<B: Bus>(&mut self, bus: &mut B, address: u16) {
        self.tact_plus_n_with_address(bus, address, 4);
    }

    pub fn tact_plus5_with_address<B: Bus>(&mut self, bus: &mut B, address: u16) {
        self.tact_plus_n_with_address(bus, address, 5);
    }

    pub fn tact_plus7_with_address<B: Bus>(&mut self, bus: &mut B, address: u16) {
        self.tact_plus_n_with_address(bus, address, 7);
    }

    /// Probe before each of `count` T-states.
    pub fn tact_plus_n_with_address<B: Bus>(&mut self, bus: &mut B, address: u16, count: u32) {
        for _ in 0..count {
            self.tact_plus1_with_address(bus, address);
        }
    }
}


#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use super::*;

    #[test]
    fn clock_snapshot_round_trips_through_json() {
        let mut clock = Clock::new(100, 2);
        for _ in 0..250 {
            clock.tick();
        }
        let json = serde_json::to_string(&clock).expect("serialize clock");
        let restored: Clock = serde_json::from_str(&json).expect("deserialize clock");
        assert_eq!(restored, clock);
        assert_eq!(restored.total, Ticks::new(250));
        assert_eq!(restored.frames, 1);
    }
}
