//! Z80 CPU state and the helpers shared by every instruction table.

mod bit_ops;
mod cycle;
mod extended;
mod indexed;
mod indexed_bit;
mod standard;

use bitflags::bitflags;
use emu_core::{Bus, Cpu, IoBus, Observable, Value};

use crate::alu::AluTables;
use crate::clock::Clock;
use crate::config::{ConfigError, Z80Config};
use crate::flags::{CF, HF, NF, PF, SF, XF, YF, ZF};
use crate::registers::Registers;

bitflags! {
    /// Input signal latches. Peripherals raise these; the CPU samples them
    /// at the start of every cycle.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SignalFlags: u8 {
        /// Maskable interrupt. Level-triggered: the embedder clears it.
        const INT = 0x01;
        /// Non-maskable interrupt. Cleared on acceptance.
        const NMI = 0x02;
        const RESET = 0x04;
    }
}

/// Opcode prefix awaiting completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpPrefix {
    #[default]
    None,
    Cb,
    Ed,
    Dd,
    Fd,
    DdCb,
    FdCb,
}

impl OpPrefix {
    /// Prefix bytes as they appear in the instruction stream (0 for none).
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::None => 0,
            Self::Cb => 0xCB,
            Self::Ed => 0xED,
            Self::Dd => 0xDD,
            Self::Fd => 0xFD,
            Self::DdCb => 0xDDCB,
            Self::FdCb => 0xFDCB,
        }
    }
}

/// Index register selected by a DD or FD prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Index {
    Ix,
    Iy,
}

/// Zilog Z80 CPU.
///
/// The CPU does not own the bus. The embedder passes it to
/// [`Z80::execute_cpu_cycle`] so memory, ports and the per-T-state hook can
/// be shared with the rest of the machine.
pub struct Z80 {
    pub regs: Registers,
    pub signals: SignalFlags,
    /// 0, 1 or 2.
    pub interrupt_mode: u8,
    pub iff1: bool,
    pub iff2: bool,
    pub halted: bool,
    pub clock: Clock,
    /// Model bus contention through the `Bus` contention hooks.
    pub delayed_address_bus: bool,
    /// Last completed instruction was a RET of some kind.
    pub ret_executed: bool,

    /// Cycles left before INT may be accepted after EI.
    pub(crate) ei_backlog: u8,
    /// Current instruction computed F (bits 3/5 included).
    pub(crate) flags53_updated: bool,
    /// Previous instruction computed F. Read by SCF/CCF.
    pub(crate) prev_flags53_updated: bool,
    pub(crate) opcode: u8,
    pub(crate) prefix: OpPrefix,
    pub(crate) tables: &'static AluTables,
}

impl Default for Z80 {
    fn default() -> Self {
        Self::new()
    }
}

impl Z80 {
    /// Create a Z80 in its power-on state using the shared ALU tables.
    #[must_use]
    pub fn new() -> Self {
        Self::with_tables(AluTables::shared())
    }

    /// Create a Z80 that reads flags from `tables`.
    #[must_use]
    pub fn with_tables(tables: &'static AluTables) -> Self {
        let config = Z80Config::default();
        let mut cpu = Self {
            regs: Registers::default(),
            signals: SignalFlags::empty(),
            interrupt_mode: 0,
            iff1: false,
            iff2: false,
            halted: false,
            clock: Clock::new(config.tacts_per_frame, config.clock_multiplier),
            delayed_address_bus: config.delayed_address_bus,
            ret_executed: false,
            ei_backlog: 0,
            flags53_updated: false,
            prev_flags53_updated: false,
            opcode: 0,
            prefix: OpPrefix::None,
            tables,
        };
        cpu.hard_reset();
        cpu
    }

    /// Create a Z80 with the given timing. Fails with
    /// [`ConfigError::ZeroFrameLength`] or [`ConfigError::ClockMultiplier`].
    pub fn with_config(config: Z80Config) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut cpu = Self::new();
        cpu.clock.tacts_per_frame = config.tacts_per_frame;
        cpu.clock.clock_multiplier = config.clock_multiplier;
        cpu.delayed_address_bus = config.delayed_address_bus;
        log::debug!(
            "Z80 configured: {} tacts/frame, x{}, contention {}",
            config.tacts_per_frame,
            config.clock_multiplier,
            if config.delayed_address_bus { "on" } else { "off" }
        );
        Ok(cpu)
    }

    /// Change the overclock factor at runtime. Fails with
    /// [`ConfigError::ClockMultiplier`], or [`ConfigError::ZeroFrameLength`]
    /// if the frame length was zeroed, and leaves the clock untouched.
    pub fn set_clock_multiplier(&mut self, multiplier: u32) -> Result<(), ConfigError> {
        Z80Config {
            tacts_per_frame: self.clock.tacts_per_frame,
            clock_multiplier: multiplier,
            delayed_address_bus: self.delayed_address_bus,
        }
        .validate()?;
        log::debug!("Z80 clock multiplier x{multiplier}");
        self.clock.clock_multiplier = multiplier;
        Ok(())
    }

    /// Power-on state.
    pub fn hard_reset(&mut self) {
        self.regs = Registers {
            af: 0xFFFF,
            af_alt: 0xFFFF,
            sp: 0xFFFF,
            ..Registers::default()
        };
        self.signals = SignalFlags::empty();
        self.interrupt_mode = 0;
        self.iff1 = false;
        self.iff2 = false;
        self.halted = false;
        self.ret_executed = false;
        self.ei_backlog = 0;
        self.flags53_updated = false;
        self.prev_flags53_updated = false;
        self.opcode = 0;
        self.prefix = OpPrefix::None;
        self.clock.clock_multiplier = 1;
        self.clock.restart();
        log::debug!("Z80 hard reset");
    }

    /// RESET pin. General-purpose registers survive.
    pub fn reset(&mut self) {
        self.regs.pc = 0;
        self.regs.sp = 0xFFFF;
        self.regs.af = 0xFFFF;
        self.regs.ir = 0;
        self.regs.wz = 0;
        self.signals = SignalFlags::empty();
        self.interrupt_mode = 0;
        self.iff1 = false;
        self.iff2 = false;
        self.halted = false;
        self.ret_executed = false;
        self.ei_backlog = 0;
        self.opcode = 0;
        self.prefix = OpPrefix::None;
        log::debug!("Z80 reset");
    }

    /// Last byte fetched by an M1 cycle (or the DDCB/FDCB operation byte).
    #[must_use]
    pub const fn opcode(&self) -> u8 {
        self.opcode
    }

    #[must_use]
    pub const fn prefix(&self) -> OpPrefix {
        self.prefix
    }

    #[must_use]
    pub const fn ei_backlog(&self) -> u8 {
        self.ei_backlog
    }

    /// Whether the last instruction computed F, as SCF/CCF will see it.
    #[must_use]
    pub const fn flags53_updated(&self) -> bool {
        self.flags53_updated
    }

    /// Restore the flags-3/5 status from a snapshot.
    pub fn set_flags53_updated(&mut self, updated: bool) {
        self.flags53_updated = updated;
    }

    // Bus access.

    pub(crate) fn read_memory<B: Bus>(&mut self, bus: &mut B, address: u16) -> u8 {
        self.contend_read(bus, address);
        self.tact_plus3(bus);
        bus.read(address)
    }

    pub(crate) fn write_memory<B: Bus>(&mut self, bus: &mut B, address: u16, value: u8) {
        self.contend_write(bus, address);
        self.tact_plus3(bus);
        bus.write(address, value);
    }

    pub(crate) fn read_port<B: IoBus>(&mut self, bus: &mut B, port: u16) -> u8 {
        self.contend_read(bus, port);
        self.tact_plus4(bus);
        bus.read_io(port)
    }

    pub(crate) fn write_port<B: IoBus>(&mut self, bus: &mut B, port: u16, value: u8) {
        self.contend_write(bus, port);
        self.tact_plus4(bus);
        bus.write_io(port, value);
    }

    /// Read the byte at PC and advance PC.
    pub(crate) fn read_code<B: Bus>(&mut self, bus: &mut B) -> u8 {
        let pc = self.regs.pc;
        let value = self.read_memory(bus, pc);
        self.regs.pc = pc.wrapping_add(1);
        value
    }

    pub(crate) fn read_code_word<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let lo = self.read_code(bus);
        let hi = self.read_code(bus);
        u16::from_le_bytes([lo, hi])
    }

    pub(crate) fn read_word<B: Bus>(&mut self, bus: &mut B, address: u16) -> u16 {
        let lo = self.read_memory(bus, address);
        let hi = self.read_memory(bus, address.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    pub(crate) fn write_word<B: Bus>(&mut self, bus: &mut B, address: u16, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.write_memory(bus, address, lo);
        self.write_memory(bus, address.wrapping_add(1), hi);
    }

    /// Push high byte first. Callers charge the preceding internal T-state.
    pub(crate) fn push<B: Bus>(&mut self, bus: &mut B, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.write_memory(bus, self.regs.sp, hi);
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.write_memory(bus, self.regs.sp, lo);
    }

    pub(crate) fn pop<B: Bus>(&mut self, bus: &mut B) -> u16 {
        let lo = self.read_memory(bus, self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(1);
        let hi = self.read_memory(bus, self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(1);
        u16::from_le_bytes([lo, hi])
    }

    /// Read a signed displacement byte and return `index + d`.
    pub(crate) fn read_displaced<B: Bus>(&mut self, bus: &mut B, index: Index) -> u16 {
        let d = self.read_code(bus) as i8;
        self.index(index).wrapping_add_signed(i16::from(d))
    }

    // Register decoding.

    /// Register from a 3-bit opcode field: B, C, D, E, H, L, -, A.
    /// Field 6 is `(HL)`; callers go through memory for it.
    pub(crate) fn reg8(&self, r: u8) -> u8 {
        match r & 7 {
            0 => self.regs.b(),
            1 => self.regs.c(),
            2 => self.regs.d(),
            3 => self.regs.e(),
            4 => self.regs.h(),
            5 => self.regs.l(),
            _ => self.regs.a(),
        }
    }

    pub(crate) fn set_reg8(&mut self, r: u8, value: u8) {
        match r & 7 {
            0 => self.regs.set_b(value),
            1 => self.regs.set_c(value),
            2 => self.regs.set_d(value),
            3 => self.regs.set_e(value),
            4 => self.regs.set_h(value),
            5 => self.regs.set_l(value),
            _ => self.regs.set_a(value),
        }
    }

    /// Like [`Self::reg8`], with H and L replaced by the index halves.
    pub(crate) fn reg8_indexed(&self, r: u8, index: Index) -> u8 {
        match r & 7 {
            4 => (self.index(index) >> 8) as u8,
            5 => self.index(index) as u8,
            r => self.reg8(r),
        }
    }

    pub(crate) fn set_reg8_indexed(&mut self, r: u8, index: Index, value: u8) {
        match r & 7 {
            4 => {
                let v = self.index(index);
                self.set_index(index, (v & 0x00FF) | (u16::from(value) << 8));
            }
            5 => {
                let v = self.index(index);
                self.set_index(index, (v & 0xFF00) | u16::from(value));
            }
            r => self.set_reg8(r, value),
        }
    }

    /// Pair from a 2-bit opcode field: BC, DE, HL, SP.
    pub(crate) fn reg16(&self, rp: u8) -> u16 {
        match rp & 3 {
            0 => self.regs.bc,
            1 => self.regs.de,
            2 => self.regs.hl,
            _ => self.regs.sp,
        }
    }

    pub(crate) fn set_reg16(&mut self, rp: u8, value: u16) {
        match rp & 3 {
            0 => self.regs.bc = value,
            1 => self.regs.de = value,
            2 => self.regs.hl = value,
            _ => self.regs.sp = value,
        }
    }

    /// Pair for PUSH/POP: BC, DE, HL, AF.
    pub(crate) fn reg16_af(&self, rp: u8) -> u16 {
        if rp & 3 == 3 { self.regs.af } else { self.reg16(rp) }
    }

    pub(crate) fn set_reg16_af(&mut self, rp: u8, value: u16) {
        if rp & 3 == 3 {
            self.regs.af = value;
        } else {
            self.set_reg16(rp, value);
        }
    }

    pub(crate) const fn index(&self, index: Index) -> u16 {
        match index {
            Index::Ix => self.regs.ix,
            Index::Iy => self.regs.iy,
        }
    }

    pub(crate) fn set_index(&mut self, index: Index, value: u16) {
        match index {
            Index::Ix => self.regs.ix = value,
            Index::Iy => self.regs.iy = value,
        }
    }

    /// Condition from a 3-bit opcode field: NZ, Z, NC, C, PO, PE, P, M.
    pub(crate) const fn condition(&self, cc: u8) -> bool {
        let f = self.regs.f();
        match cc & 7 {
            0 => f & ZF == 0,
            1 => f & ZF != 0,
            2 => f & CF == 0,
            3 => f & CF != 0,
            4 => f & PF == 0,
            5 => f & PF != 0,
            6 => f & SF == 0,
            _ => f & SF != 0,
        }
    }
}

impl<B: IoBus> Cpu<B> for Z80 {
    type Registers = Registers;

    fn step(&mut self, bus: &mut B) -> u64 {
        self.execute_instruction(bus)
    }

    fn pc(&self) -> u16 {
        self.regs.pc
    }

    fn registers(&self) -> Self::Registers {
        self.regs
    }

    fn is_halted(&self) -> bool {
        self.halted
    }

    fn interrupt(&mut self) {
        self.signals.insert(SignalFlags::INT);
    }

    fn nmi(&mut self) {
        self.signals.insert(SignalFlags::NMI);
    }

    fn reset(&mut self) {
        self.hard_reset();
    }
}

/// All query paths supported by the Z80.
const Z80_QUERY_PATHS: &[&str] = &[
    // Main registers
    "a", "f", "b", "c", "d", "e", "h", "l",
    // Register pairs
    "af", "bc", "de", "hl",
    // Alternate pairs
    "af'", "bc'", "de'", "hl'",
    // Index registers
    "ix", "iy", "ixh", "ixl", "iyh", "iyl",
    // Other registers
    "sp", "pc", "i", "r", "wz",
    // Flags (individual)
    "flags.s", "flags.z", "flags.y", "flags.h",
    "flags.x", "flags.p", "flags.n", "flags.c",
    // Interrupt state
    "iff1", "iff2", "im", "ei_backlog",
    "signals.int", "signals.nmi", "signals.reset",
    // CPU state
    "halted", "ret_executed",
    // Clock
    "clock.tacts", "clock.frames", "clock.frame_completed", "clock.multiplier", "ticks",
    // Current instruction state
    "opcode", "prefix",
];

impl Observable for Z80 {
    fn query(&self, path: &str) -> Option<Value> {
        let f = self.regs.f();
        match path {
            // Main registers
            "a" => Some(self.regs.a().into()),
            "f" => Some(f.into()),
            "b" => Some(self.regs.b().into()),
            "c" => Some(self.regs.c().into()),
            "d" => Some(self.regs.d().into()),
            "e" => Some(self.regs.e().into()),
            "h" => Some(self.regs.h().into()),
            "l" => Some(self.regs.l().into()),

            // Register pairs
            "af" => Some(self.regs.af.into()),
            "bc" => Some(self.regs.bc.into()),
            "de" => Some(self.regs.de.into()),
            "hl" => Some(self.regs.hl.into()),

            // Alternate pairs
            "af'" => Some(self.regs.af_alt.into()),
            "bc'" => Some(self.regs.bc_alt.into()),
            "de'" => Some(self.regs.de_alt.into()),
            "hl'" => Some(self.regs.hl_alt.into()),

            // Index registers
            "ix" => Some(self.regs.ix.into()),
            "iy" => Some(self.regs.iy.into()),
            "ixh" => Some(self.regs.xh().into()),
            "ixl" => Some(self.regs.xl().into()),
            "iyh" => Some(self.regs.yh().into()),
            "iyl" => Some(self.regs.yl().into()),

            // Other registers
            "sp" => Some(self.regs.sp.into()),
            "pc" => Some(self.regs.pc.into()),
            "i" => Some(self.regs.i().into()),
            "r" => Some(self.regs.r().into()),
            "wz" => Some(self.regs.wz.into()),

            // Individual flags
            "flags.s" => Some((f & SF != 0).into()),
            "flags.z" => Some((f & ZF != 0).into()),
            "flags.y" => Some((f & YF != 0).into()),
            "flags.h" => Some((f & HF != 0).into()),
            "flags.x" => Some((f & XF != 0).into()),
            "flags.p" => Some((f & PF != 0).into()),
            "flags.n" => Some((f & NF != 0).into()),
            "flags.c" => Some((f & CF != 0).into()),

            // Interrupt state
            "iff1" => Some(self.iff1.into()),
            "iff2" => Some(self.iff2.into()),
            "im" => Some(self.interrupt_mode.into()),
            "ei_backlog" => Some(self.ei_backlog.into()),
            "signals.int" => Some(self.signals.contains(SignalFlags::INT).into()),
            "signals.nmi" => Some(self.signals.contains(SignalFlags::NMI).into()),
            "signals.reset" => Some(self.signals.contains(SignalFlags::RESET).into()),

            // CPU state
            "halted" => Some(self.halted.into()),
            "ret_executed" => Some(self.ret_executed.into()),

            // Clock
            "clock.tacts" => Some(self.clock.tacts.into()),
            "clock.frames" => Some(self.clock.frames.into()),
            "clock.frame_completed" => Some(self.clock.frame_completed.into()),
            "clock.multiplier" => Some(u64::from(self.clock.clock_multiplier).into()),
            "ticks" => Some(self.clock.total.get().into()),

            // Current instruction state
            "opcode" => Some(self.opcode.into()),
            "prefix" => Some(self.prefix.code().into()),

            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        Z80_QUERY_PATHS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_on_state() {
        let cpu = Z80::new();
        assert_eq!(cpu.regs.af, 0xFFFF);
        assert_eq!(cpu.regs.af_alt, 0xFFFF);
        assert_eq!(cpu.regs.sp, 0xFFFF);
        assert_eq!(cpu.regs.pc, 0);
        assert_eq!(cpu.interrupt_mode, 0);
        assert!(!cpu.iff1 && !cpu.iff2);
        assert_eq!(cpu.clock.clock_multiplier, 1);
        assert_eq!(cpu.prefix(), OpPrefix::None);
    }

    #[test]
    fn soft_reset_keeps_general_purpose_registers() {
        let mut cpu = Z80::new();
        cpu.regs.bc = 0x1234;
        cpu.regs.hl_alt = 0x5678;
        cpu.regs.ix = 0x9ABC;
        cpu.regs.pc = 0x8000;
        cpu.regs.ir = 0x3F55;
        cpu.iff1 = true;
        cpu.interrupt_mode = 2;
        cpu.prefix = OpPrefix::DdCb;
        cpu.signals = SignalFlags::all();

        cpu.reset();

        assert_eq!(cpu.regs.bc, 0x1234);
        assert_eq!(cpu.regs.hl_alt, 0x5678);
        assert_eq!(cpu.regs.ix, 0x9ABC);
        assert_eq!(cpu.regs.pc, 0);
        assert_eq!(cpu.regs.ir, 0);
        assert_eq!(cpu.regs.af, 0xFFFF);
        assert!(!cpu.iff1);
        assert_eq!(cpu.interrupt_mode, 0);
        assert_eq!(cpu.prefix(), OpPrefix::None);
        assert!(cpu.signals.is_empty());
    }

    #[test]
    fn with_config_validates() {
        let config = Z80Config::default().with_clock_multiplier(4).with_contention(true);
        let cpu = Z80::with_config(config).expect("valid config");
        assert_eq!(cpu.clock.frame_length(), 69_888 * 4);
        assert!(cpu.delayed_address_bus);

        assert!(Z80::with_config(Z80Config::default().with_clock_multiplier(0)).is_err());
    }

    #[test]
    fn config_errors_name_the_bad_field() {
        let zero_frame = Z80Config {
            tacts_per_frame: 0,
            ..Z80Config::default()
        };
        assert_eq!(Z80::with_config(zero_frame).err(), Some(ConfigError::ZeroFrameLength));
        assert_eq!(
            Z80::with_config(Z80Config::default().with_clock_multiplier(17)).err(),
            Some(ConfigError::ClockMultiplier(17))
        );

        let mut cpu = Z80::new();
        cpu.clock.tacts_per_frame = 0;
        assert_eq!(cpu.set_clock_multiplier(2), Err(ConfigError::ZeroFrameLength));
        assert_eq!(cpu.clock.clock_multiplier, 1);
    }

    #[test]
    fn runtime_multiplier_change_is_checked() {
        let mut cpu = Z80::new();
        assert_eq!(cpu.set_clock_multiplier(2), Ok(()));
        assert_eq!(cpu.clock.clock_multiplier, 2);
        assert_eq!(cpu.set_clock_multiplier(99), Err(ConfigError::ClockMultiplier(99)));
        assert_eq!(cpu.clock.clock_multiplier, 2);
    }

    #[test]
    fn register_fields_decode() {
        let mut cpu = Z80::new();
        cpu.regs.hl = 0x1122;
        cpu.regs.ix = 0x3344;
        assert_eq!(cpu.reg8(4), 0x11);
        assert_eq!(cpu.reg8_indexed(4, Index::Ix), 0x33);
        assert_eq!(cpu.reg8_indexed(5, Index::Ix), 0x44);
        cpu.set_reg8_indexed(4, Index::Iy, 0xAA);
        assert_eq!(cpu.regs.iy, 0xAA00);
        assert_eq!(cpu.reg16_af(3), cpu.regs.af);
        assert_eq!(cpu.reg16(3), cpu.regs.sp);
    }

    #[test]
    fn conditions_follow_flags() {
        let mut cpu = Z80::new();
        cpu.regs.set_f(ZF | CF);
        assert!(!cpu.condition(0));
        assert!(cpu.condition(1));
        assert!(!cpu.condition(2));
        assert!(cpu.condition(3));
        assert!(cpu.condition(4));
        assert!(cpu.condition(6));
    }

    #[test]
    fn observable_paths_resolve() {
        let mut cpu = Z80::new();
        cpu.regs.bc = 0x1234;
        assert_eq!(cpu.query("b"), Some(Value::U8(0x12)));
        assert_eq!(cpu.query("bc"), Some(Value::U16(0x1234)));
        assert_eq!(cpu.query("flags.z"), Some(Value::Bool(true)));
        assert_eq!(cpu.query("nope"), None);
        for path in cpu.query_paths() {
            assert!(cpu.query(path).is_some(), "{path} not handled");
        }
    }
}
