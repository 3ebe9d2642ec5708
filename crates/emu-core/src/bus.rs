//! Memory and I/O bus interface.
//!
//! A CPU core never owns its bus. The embedder passes the bus into every
//! step, so the same memory map can be shared with video and audio chips
//! that also need to observe each T-state.
//!
//! # Contention
//!
//! Machines where another device shares the bus (the Spectrum ULA, for
//! example) slow the CPU down on certain addresses. The CPU asks the bus
//! how many wait states to insert before an access via
//! [`Bus::read_contention`] / [`Bus::write_contention`], then consumes them
//! as real T-states.

/// Memory bus interface.
pub trait Bus {
    /// Read a byte from the given address.
    fn read(&mut self, address: u16) -> u8;

    /// Write a byte to the given address.
    fn write(&mut self, address: u16, value: u8);

    /// Called once for every T-state the CPU consumes.
    ///
    /// Peripherals that must run in lock-step with the CPU advance here.
    fn tact_incremented(&mut self) {}

    /// Wait states to insert before a read (or an address-only bus cycle)
    /// on `address`, given the current T-state within the frame.
    fn read_contention(&mut self, _address: u16, _frame_tact: u64) -> u8 {
        0
    }

    /// Wait states to insert before a write to `address`, given the current
    /// T-state within the frame.
    fn write_contention(&mut self, _address: u16, _frame_tact: u64) -> u8 {
        0
    }
}

/// A bus that also supports separate I/O port operations.
///
/// The Z80 has a separate 16-bit I/O address space accessed via IN and OUT
/// instructions. Port accesses use the same contention hooks as memory.
pub trait IoBus: Bus {
    /// Read a byte from the given I/O port.
    fn read_io(&mut self, port: u16) -> u8;

    /// Write a byte to the given I/O port.
    fn write_io(&mut self, port: u16, value: u8);

    /// The byte a peripheral places on the data bus while an interrupt is
    /// acknowledged. Floating bus reads as `0xFF`.
    fn interrupt_data(&mut self) -> u8 {
        0xFF
    }
}

/// Flat 64 KiB RAM with a port map.
///
/// Useful for tests and for trivial machines that have no memory-mapped
/// peripherals. Port reads return preloaded values (or `0xFF`), port writes
/// are recorded in order.
pub struct SimpleBus {
    ram: Vec<u8>,
    /// Values returned by `read_io`, keyed by full 16-bit port.
    pub io_read_values: std::collections::HashMap<u16, u8>,
    /// Every port write, in order.
    pub io_writes: Vec<(u16, u8)>,
    /// Byte supplied during interrupt acknowledge.
    pub data_bus: u8,
    /// Number of `tact_incremented` calls seen.
    pub tacts_seen: u64,
}

impl SimpleBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            ram: vec![0; 0x1_0000],
            io_read_values: std::collections::HashMap::new(),
            io_writes: Vec::new(),
            data_bus: 0xFF,
            tacts_seen: 0,
        }
    }

    /// Copy `data` into RAM starting at `address`, wrapping at 64K.
    pub fn load(&mut self, address: u16, data: &[u8]) {
        let mut addr = address;
        for &byte in data {
            self.ram[addr as usize] = byte;
            addr = addr.wrapping_add(1);
        }
    }

    /// Read RAM without side effects.
    #[must_use]
    pub fn peek(&self, address: u16) -> u8 {
        self.ram[address as usize]
    }

    /// Write RAM without side effects.
    pub fn poke(&mut self, address: u16, value: u8) {
        self.ram[address as usize] = value;
    }
}

impl Default for SimpleBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for SimpleBus {
    fn read(&mut self, address: u16) -> u8 {
        self.ram[address as usize]
    }

    fn write(&mut self, address: u16, value: u8) {
        self.ram[address as usize] = value;
    }

    fn tact_incremented(&mut self) {
        self.tacts_seen += 1;
    }
}

impl IoBus for SimpleBus {
    fn read_io(&mut self, port: u16) -> u8 {
        self.io_read_values.get(&port).copied().unwrap_or(0xFF)
    }

    fn write_io(&mut self, port: u16, value: u8) {
        self.io_writes.push((port, value));
    }

    fn interrupt_data(&mut self) -> u8 {
        self.data_bus
    }
}
