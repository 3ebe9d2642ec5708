//! CPU core trait.

use crate::IoBus;

/// A CPU core.
///
/// CPUs execute instructions and access memory through a bus. The bus is
/// passed in, not owned, so it can be shared with other components (e.g.,
/// video chip) that need to observe every T-state.
///
/// CPUs expose their internal state for observation and debugging.
pub trait Cpu<B: IoBus> {
    /// The type used for register inspection.
    type Registers;

    /// Execute one complete instruction (or interrupt acknowledge).
    ///
    /// Returns the number of T-states consumed.
    fn step(&mut self, bus: &mut B) -> u64;

    /// Returns the current program counter.
    fn pc(&self) -> u16;

    /// Returns a snapshot of all registers for inspection.
    fn registers(&self) -> Self::Registers;

    /// Returns true if the CPU is halted.
    fn is_halted(&self) -> bool;

    /// Raise the maskable interrupt line.
    fn interrupt(&mut self);

    /// Raise the non-maskable interrupt line.
    fn nmi(&mut self);

    /// Reset the CPU to its power-on state.
    fn reset(&mut self);
}
