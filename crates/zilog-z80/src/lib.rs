//! Cycle-accurate Z80 CPU emulator.
//!
//! Each call to [`Z80::execute_cpu_cycle`] runs one prefix byte, one
//! complete instruction, one halted slot or one interrupt acknowledge,
//! charging every T-state to the bus as it elapses.

mod alu;
mod clock;
mod config;
mod cpu;
mod flags;
mod registers;

pub use alu::AluTables;
pub use clock::Clock;
pub use config::{ConfigError, DEFAULT_TACTS_PER_FRAME, MAX_CLOCK_MULTIPLIER, Z80Config};
pub use cpu::{OpPrefix, SignalFlags, Z80};
pub use flags::{CF, HF, NF, PF, SF, XF, XYF, YF, ZF};
pub use registers::Registers;
