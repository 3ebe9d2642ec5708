//! Execution cycle: signal arbitration, opcode fetch and the prefix state
//! machine.
//!
//! One cycle fetches one opcode byte. Prefix bytes only move the state
//! machine; the byte that completes an instruction dispatches to one of the
//! five instruction tables and returns the machine to [`OpPrefix::None`].

use emu_core::IoBus;

use super::{Index, OpPrefix, SignalFlags, Z80};

impl Z80 {
    /// Run one CPU cycle: a signal, a halted slot, a prefix byte or a
    /// complete instruction.
    pub fn execute_cpu_cycle<B: IoBus>(&mut self, bus: &mut B) {
        if self.ei_backlog > 0 {
            self.ei_backlog -= 1;
        }

        if self.signals.contains(SignalFlags::RESET) {
            self.reset();
            return;
        }
        if self.prefix == OpPrefix::None {
            if self.signals.contains(SignalFlags::NMI) {
                self.accept_nmi(bus);
                return;
            }
            if self.signals.contains(SignalFlags::INT) && self.iff1 && self.ei_backlog == 0 {
                self.accept_int(bus);
                return;
            }
        }

        if self.halted {
            self.regs.refresh();
            self.tact_plus4(bus);
            return;
        }

        if self.prefix == OpPrefix::None {
            self.prev_flags53_updated = self.flags53_updated;
            self.flags53_updated = false;
            self.ret_executed = false;
        }

        match self.prefix {
            OpPrefix::DdCb => self.execute_indexed_bit_cycle(bus, Index::Ix),
            OpPrefix::FdCb => self.execute_indexed_bit_cycle(bus, Index::Iy),
            _ => {
                let opcode = self.fetch_opcode(bus);
                self.advance_prefix(bus, opcode);
            }
        }
    }

    /// Run cycles until the current instruction (or interrupt) completes.
    /// Returns the T-states consumed.
    pub fn execute_instruction<B: IoBus>(&mut self, bus: &mut B) -> u64 {
        let start = self.clock.total;
        loop {
            self.execute_cpu_cycle(bus);
            if self.prefix == OpPrefix::None {
                break;
            }
        }
        (self.clock.total - start).get()
    }

    /// M1: read at PC, refresh, one more T-state.
    fn fetch_opcode<B: IoBus>(&mut self, bus: &mut B) -> u8 {
        let opcode = self.read_code(bus);
        self.regs.refresh();
        self.tact_plus1(bus);
        self.opcode = opcode;
        opcode
    }

    fn advance_prefix<B: IoBus>(&mut self, bus: &mut B, opcode: u8) {
        match (self.prefix, opcode) {
            (OpPrefix::None | OpPrefix::Dd | OpPrefix::Fd, 0xDD) => self.prefix = OpPrefix::Dd,
            (OpPrefix::None | OpPrefix::Dd | OpPrefix::Fd, 0xFD) => self.prefix = OpPrefix::Fd,
            (OpPrefix::None | OpPrefix::Dd | OpPrefix::Fd, 0xED) => self.prefix = OpPrefix::Ed,
            (OpPrefix::None, 0xCB) => self.prefix = OpPrefix::Cb,
            (OpPrefix::Dd, 0xCB) => self.prefix = OpPrefix::DdCb,
            (OpPrefix::Fd, 0xCB) => self.prefix = OpPrefix::FdCb,
            (OpPrefix::None, _) => self.execute_standard(bus),
            (OpPrefix::Cb, _) => {
                self.prefix = OpPrefix::None;
                self.execute_bit(bus);
            }
            (OpPrefix::Ed, _) => {
                self.prefix = OpPrefix::None;
                self.execute_extended(bus);
            }
            (OpPrefix::Dd, _) => {
                self.prefix = OpPrefix::None;
                self.execute_indexed(bus, Index::Ix);
            }
            (OpPrefix::Fd, _) => {
                self.prefix = OpPrefix::None;
                self.execute_indexed(bus, Index::Iy);
            }
            (OpPrefix::DdCb | OpPrefix::FdCb, _) => {}
        }
    }

    /// DDCB/FDCB tail: displacement, two address-tagged T-states, then the
    /// operation byte. Neither byte is an M1 cycle, so R is left alone.
    fn execute_indexed_bit_cycle<B: IoBus>(&mut self, bus: &mut B, index: Index) {
        let address = self.read_displaced(bus, index);
        self.regs.wz = address;
        self.tact_plus2_with_address(bus, self.regs.pc);
        let opcode = self.read_code(bus);
        self.opcode = opcode;
        self.prefix = OpPrefix::None;
        self.execute_indexed_bit(bus, address);
    }

    fn accept_nmi<B: IoBus>(&mut self, bus: &mut B) {
        self.signals.remove(SignalFlags::NMI);
        self.leave_halt();
        let pc = self.regs.pc;
        self.iff2 = self.iff1;
        self.iff1 = false;
        self.regs.refresh();
        self.tact_plus4(bus);
        self.tact_plus1_with_address(bus, self.regs.ir);
        self.push(bus, pc);
        self.regs.pc = 0x0066;
        self.regs.wz = 0x0066;
        log::trace!("Z80 NMI accepted at {pc:#06X}");
    }

    fn accept_int<B: IoBus>(&mut self, bus: &mut B) {
        self.leave_halt();
        let pc = self.regs.pc;
        self.iff1 = false;
        self.iff2 = false;
        self.regs.refresh();
        self.tact_plus6(bus);
        self.tact_plus1_with_address(bus, self.regs.ir);
        self.push(bus, pc);
        let target = if self.interrupt_mode == 2 {
            let vector = (u16::from(self.regs.i()) << 8) | u16::from(bus.interrupt_data() & 0xFE);
            self.read_word(bus, vector)
        } else {
            0x0038
        };
        self.regs.pc = target;
        self.regs.wz = target;
        log::trace!(
            "Z80 INT accepted at {pc:#06X}, IM {} -> {target:#06X}",
            self.interrupt_mode
        );
    }

    /// Leaving HALT moves PC past the HALT opcode.
    fn leave_halt(&mut self) {
        if self.halted {
            self.halted = false;
            self.regs.pc = self.regs.pc.wrapping_add(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emu_core::SimpleBus;

    fn cpu_with(program: &[u8]) -> (Z80, SimpleBus) {
        let mut bus = SimpleBus::new();
        bus.load(0, program);
        (Z80::new(), bus)
    }

    #[test]
    fn prefix_bytes_only_advance_the_state_machine() {
        // LD IX,0x1234
        let (mut cpu, mut bus) = cpu_with(&[0xDD, 0x21, 0x34, 0x12]);
        cpu.execute_cpu_cycle(&mut bus);
        assert_eq!(cpu.prefix(), OpPrefix::Dd);
        assert_eq!(cpu.clock.tacts, 4);
        cpu.execute_cpu_cycle(&mut bus);
        assert_eq!(cpu.prefix(), OpPrefix::None);
        assert_eq!(cpu.regs.ix, 0x1234);
        assert_eq!(cpu.clock.tacts, 14);
    }

    #[test]
    fn later_index_prefix_wins() {
        // DD FD 21 nn: LD IY,nn
        let (mut cpu, mut bus) = cpu_with(&[0xDD, 0xFD, 0x21, 0x78, 0x56]);
        let tacts = cpu.execute_instruction(&mut bus);
        assert_eq!(cpu.regs.iy, 0x5678);
        assert_eq!(cpu.regs.ix, 0);
        assert_eq!(tacts, 18);
        assert_eq!(cpu.regs.r(), 3);
    }

    #[test]
    fn ed_after_index_prefix_drops_the_index() {
        // DD ED 44: NEG
        let (mut cpu, mut bus) = cpu_with(&[0xDD, 0xED, 0x44]);
        cpu.regs.set_a(1);
        cpu.execute_instruction(&mut bus);
        assert_eq!(cpu.regs.a(), 0xFF);
        assert_eq!(cpu.regs.pc, 3);
    }

    #[test]
    fn indexed_bit_refreshes_twice() {
        // RLC (IX+1)
        let (mut cpu, mut bus) = cpu_with(&[0xDD, 0xCB, 0x01, 0x06]);
        cpu.regs.ix = 0x1000;
        bus.poke(0x1001, 0x81);
        let tacts = cpu.execute_instruction(&mut bus);
        assert_eq!(tacts, 23);
        assert_eq!(cpu.regs.r(), 2);
        assert_eq!(bus.peek(0x1001), 0x03);
        assert_eq!(cpu.regs.wz, 0x1001);
        assert_eq!(cpu.opcode(), 0x06);
    }

    #[test]
    fn reset_interrupts_a_prefix_chain() {
        let (mut cpu, mut bus) = cpu_with(&[0xDD, 0xCB]);
        cpu.regs.bc = 0x4242;
        cpu.execute_cpu_cycle(&mut bus);
        cpu.execute_cpu_cycle(&mut bus);
        assert_eq!(cpu.prefix(), OpPrefix::DdCb);
        cpu.signals.insert(SignalFlags::RESET);
        let before = cpu.clock.total;
        cpu.execute_cpu_cycle(&mut bus);
        assert_eq!(cpu.prefix(), OpPrefix::None);
        assert_eq!(cpu.regs.pc, 0);
        assert_eq!(cpu.regs.bc, 0x4242);
        assert_eq!(cpu.clock.total, before);
        assert!(cpu.signals.is_empty());
    }

    #[test]
    fn interrupts_wait_for_the_prefix_to_complete() {
        // LD IX,nn with NMI raised after the prefix
        let (mut cpu, mut bus) = cpu_with(&[0xDD, 0x21, 0x34, 0x12]);
        cpu.execute_cpu_cycle(&mut bus);
        cpu.signals.insert(SignalFlags::NMI);
        cpu.execute_cpu_cycle(&mut bus);
        assert_eq!(cpu.regs.ix, 0x1234);
        cpu.execute_cpu_cycle(&mut bus);
        assert_eq!(cpu.regs.pc, 0x0066);
    }

    #[test]
    fn halted_cpu_burns_four_tacts_and_refreshes() {
        let (mut cpu, mut bus) = cpu_with(&[0x76]);
        cpu.execute_cpu_cycle(&mut bus);
        assert!(cpu.halted);
        assert_eq!(cpu.regs.pc, 0);
        let r = cpu.regs.r();
        cpu.execute_cpu_cycle(&mut bus);
        assert_eq!(cpu.regs.r(), r + 1);
        assert_eq!(cpu.clock.tacts, 8);
        assert_eq!(cpu.regs.pc, 0);
    }
}
