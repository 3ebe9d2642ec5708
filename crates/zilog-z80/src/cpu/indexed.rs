//! DD/FD-prefixed instructions.
//!
//! HL, H, L and (HL) become IX/IY, the index halves and (IX+d). Opcodes the
//! prefix doesn't affect run through the unprefixed table.

use emu_core::IoBus;

use super::{Index, Z80};

impl Z80 {
    pub(super) fn execute_indexed<B: IoBus>(&mut self, bus: &mut B, index: Index) {
        let op = self.opcode;

        match op {
            // ADD IX, rr
            0x09 | 0x19 | 0x29 | 0x39 => {
                self.tact_plus7_with_address(bus, self.regs.ir);
                let base = self.index(index);
                let value = if op == 0x29 { base } else { self.reg16(op >> 4) };
                let result = self.add16(base, value);
                self.set_index(index, result);
            }

            // LD IX, nn
            0x21 => {
                let value = self.read_code_word(bus);
                self.set_index(index, value);
            }

            // LD (nn), IX
            0x22 => {
                let address = self.read_code_word(bus);
                self.write_word(bus, address, self.index(index));
                self.regs.wz = address.wrapping_add(1);
            }

            // LD IX, (nn)
            0x2A => {
                let address = self.read_code_word(bus);
                let value = self.read_word(bus, address);
                self.set_index(index, value);
                self.regs.wz = address.wrapping_add(1);
            }

            // INC IX / DEC IX
            0x23 | 0x2B => {
                self.tact_plus2_with_address(bus, self.regs.ir);
                let value = self.index(index);
                let value = if op == 0x23 { value.wrapping_add(1) } else { value.wrapping_sub(1) };
                self.set_index(index, value);
            }

            // INC IXH / IXL
            0x24 | 0x2C => {
                let result = self.inc8(self.reg8_indexed(op >> 3, index));
                self.set_reg8_indexed(op >> 3, index, result);
            }

            // DEC IXH / IXL
            0x25 | 0x2D => {
                let result = self.dec8(self.reg8_indexed(op >> 3, index));
                self.set_reg8_indexed(op >> 3, index, result);
            }

            // LD IXH / IXL, n
            0x26 | 0x2E => {
                let value = self.read_code(bus);
                self.set_reg8_indexed(op >> 3, index, value);
            }

            // INC (IX+d) / DEC (IX+d)
            0x34 | 0x35 => {
                let address = self.displaced_address(bus, index);
                let value = self.read_memory(bus, address);
                self.tact_plus1_with_address(bus, address);
                let result = if op == 0x34 { self.inc8(value) } else { self.dec8(value) };
                self.write_memory(bus, address, result);
            }

            // LD (IX+d), n
            0x36 => {
                let address = self.read_displaced(bus, index);
                let value = self.read_code(bus);
                self.tact_plus2_with_address(bus, self.regs.pc.wrapping_sub(1));
                self.regs.wz = address;
                self.write_memory(bus, address, value);
            }

            // LD r, (IX+d)
            0x46 | 0x4E | 0x56 | 0x5E | 0x66 | 0x6E | 0x7E => {
                let address = self.displaced_address(bus, index);
                let value = self.read_memory(bus, address);
                self.set_reg8(op >> 3, value);
            }

            // LD (IX+d), r
            0x70..=0x75 | 0x77 => {
                let address = self.displaced_address(bus, index);
                self.write_memory(bus, address, self.reg8(op));
            }

            // LD r, r' with IXH/IXL standing in for H/L
            0x40..=0x7F if matches!(op & 7, 4 | 5) || matches!((op >> 3) & 7, 4 | 5) => {
                let value = self.reg8_indexed(op, index);
                self.set_reg8_indexed(op >> 3, index, value);
            }

            // ALU A, (IX+d)
            0x86 | 0x8E | 0x96 | 0x9E | 0xA6 | 0xAE | 0xB6 | 0xBE => {
                let address = self.displaced_address(bus, index);
                let value = self.read_memory(bus, address);
                self.alu8(op >> 3, value);
            }

            // ALU A, IXH / IXL
            0x84 | 0x85 | 0x8C | 0x8D | 0x94 | 0x95 | 0x9C | 0x9D | 0xA4 | 0xA5 | 0xAC | 0xAD
            | 0xB4 | 0xB5 | 0xBC | 0xBD => self.alu8(op >> 3, self.reg8_indexed(op, index)),

            // POP IX
            0xE1 => {
                let value = self.pop(bus);
                self.set_index(index, value);
            }

            // PUSH IX
            0xE5 => {
                self.tact_plus1_with_address(bus, self.regs.ir);
                self.push(bus, self.index(index));
            }

            // EX (SP), IX
            0xE3 => {
                let value = self.exchange_stack_top(bus, self.index(index));
                self.set_index(index, value);
            }

            // JP (IX)
            0xE9 => self.regs.pc = self.index(index),

            // LD SP, IX
            0xF9 => {
                self.tact_plus2_with_address(bus, self.regs.ir);
                self.regs.sp = self.index(index);
            }

            // Everything else ignores the prefix
            _ => self.execute_standard(bus),
        }
    }

    /// Displacement read plus the five internal T-states that compute
    /// `IX+d`. Latches the address into WZ.
    fn displaced_address<B: IoBus>(&mut self, bus: &mut B, index: Index) -> u16 {
        let address = self.read_displaced(bus, index);
        self.tact_plus5_with_address(bus, self.regs.pc.wrapping_sub(1));
        self.regs.wz = address;
        address
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emu_core::SimpleBus;

    fn step(program: &[u8], setup: impl FnOnce(&mut Z80, &mut SimpleBus)) -> (Z80, SimpleBus, u64) {
        let mut bus = SimpleBus::new();
        bus.load(0, program);
        let mut cpu = Z80::new();
        setup(&mut cpu, &mut bus);
        let tacts = cpu.execute_instruction(&mut bus);
        (cpu, bus, tacts)
    }

    #[test]
    fn negative_displacement_wraps() {
        // LD A, (IY-2)
        let (cpu, _, tacts) = step(&[0xFD, 0x7E, 0xFE], |cpu, bus| {
            cpu.regs.iy = 0x8001;
            bus.poke(0x7FFF, 0x5A);
        });
        assert_eq!(tacts, 19);
        assert_eq!(cpu.regs.a(), 0x5A);
        assert_eq!(cpu.regs.wz, 0x7FFF);
    }

    #[test]
    fn memory_operand_keeps_real_h_and_l() {
        // LD H, (IX+1)
        let (cpu, _, _) = step(&[0xDD, 0x66, 0x01], |cpu, bus| {
            cpu.regs.ix = 0x4000;
            bus.poke(0x4001, 0x77);
        });
        assert_eq!(cpu.regs.h(), 0x77);
        assert_eq!(cpu.regs.ix, 0x4000);
    }

    #[test]
    fn index_halves_replace_h_and_l() {
        // LD IXH, B ; ADD A, IXL
        let (cpu, _, tacts) = step(&[0xDD, 0x60], |cpu, _| {
            cpu.regs.set_b(0xAB);
            cpu.regs.hl = 0;
        });
        assert_eq!(tacts, 8);
        assert_eq!(cpu.regs.ix, 0xAB00);
        assert_eq!(cpu.regs.hl, 0);

        let (cpu, _, _) = step(&[0xFD, 0x85], |cpu, _| {
            cpu.regs.set_a(0x10);
            cpu.regs.iy = 0x0005;
        });
        assert_eq!(cpu.regs.a(), 0x15);
    }

    #[test]
    fn store_immediate_through_index() {
        // LD (IX+5), 0x42
        let (cpu, bus, tacts) = step(&[0xDD, 0x36, 0x05, 0x42], |cpu, _| cpu.regs.ix = 0x9000);
        assert_eq!(tacts, 19);
        assert_eq!(bus.peek(0x9005), 0x42);
        assert_eq!(cpu.regs.pc, 4);
    }

    #[test]
    fn increment_through_index() {
        let (_, bus, tacts) = step(&[0xDD, 0x34, 0x00], |cpu, bus| {
            cpu.regs.ix = 0x9000;
            bus.poke(0x9000, 0x7F);
        });
        assert_eq!(tacts, 23);
        assert_eq!(bus.peek(0x9000), 0x80);
    }

    #[test]
    fn unaffected_opcodes_run_unprefixed() {
        // DD 04: INC B
        let (cpu, _, tacts) = step(&[0xDD, 0x04], |cpu, _| cpu.regs.set_b(1));
        assert_eq!(tacts, 8);
        assert_eq!(cpu.regs.b(), 2);
        assert_eq!(cpu.regs.pc, 2);
    }

    #[test]
    fn ex_de_hl_ignores_the_prefix() {
        let (cpu, _, _) = step(&[0xDD, 0xEB], |cpu, _| {
            cpu.regs.de = 1;
            cpu.regs.hl = 2;
            cpu.regs.ix = 3;
        });
        assert_eq!(cpu.regs.de, 2);
        assert_eq!(cpu.regs.hl, 1);
        assert_eq!(cpu.regs.ix, 3);
    }

    #[test]
    fn push_pop_index() {
        let (cpu, bus, tacts) = step(&[0xFD, 0xE5], |cpu, _| {
            cpu.regs.iy = 0xBEEF;
            cpu.regs.sp = 0x8000;
        });
        assert_eq!(tacts, 15);
        assert_eq!(bus.peek(0x7FFF), 0xBE);
        assert_eq!(bus.peek(0x7FFE), 0xEF);
        assert_eq!(cpu.regs.sp, 0x7FFE);
    }
}
