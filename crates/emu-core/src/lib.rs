//! Core traits and types for cycle-accurate emulation.
//!
//! Everything is counted in T-states of the master clock. CPU cores talk to
//! the rest of the machine only through the bus traits defined here.

mod bus;
mod clock;
mod cpu;
mod observable;
mod ticks;

pub use bus::{Bus, IoBus, SimpleBus};
pub use clock::MasterClock;
pub use cpu::Cpu;
pub use observable::{Observable, Value};
pub use ticks::Ticks;
