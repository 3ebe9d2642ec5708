//! Unprefixed instructions.
//!
//! The M1 fetch (4 T-states) has already been charged; each arm charges
//! only what follows it.

use emu_core::IoBus;

use super::Z80;

impl Z80 {
    pub(super) fn execute_standard<B: IoBus>(&mut self, bus: &mut B) {
        let op = self.opcode;

        match op {
            // NOP
            0x00 => {}

            // LD rr, nn
            0x01 | 0x11 | 0x21 | 0x31 => {
                let value = self.read_code_word(bus);
                self.set_reg16(op >> 4, value);
            }

            // LD (BC), A / LD (DE), A
            0x02 | 0x12 => {
                let address = if op == 0x02 { self.regs.bc } else { self.regs.de };
                let a = self.regs.a();
                self.write_memory(bus, address, a);
                self.regs.wz = (u16::from(a) << 8) | (address.wrapping_add(1) & 0x00FF);
            }

            // INC rr
            0x03 | 0x13 | 0x23 | 0x33 => {
                self.tact_plus2_with_address(bus, self.regs.ir);
                let value = self.reg16(op >> 4).wrapping_add(1);
                self.set_reg16(op >> 4, value);
            }

            // DEC rr
            0x0B | 0x1B | 0x2B | 0x3B => {
                self.tact_plus2_with_address(bus, self.regs.ir);
                let value = self.reg16(op >> 4).wrapping_sub(1);
                self.set_reg16(op >> 4, value);
            }

            // INC (HL)
            0x34 => {
                let hl = self.regs.hl;
                let value = self.read_memory(bus, hl);
                self.tact_plus1_with_address(bus, hl);
                let result = self.inc8(value);
                self.write_memory(bus, hl, result);
            }

            // DEC (HL)
            0x35 => {
                let hl = self.regs.hl;
                let value = self.read_memory(bus, hl);
                self.tact_plus1_with_address(bus, hl);
                let result = self.dec8(value);
                self.write_memory(bus, hl, result);
            }

            // INC r
            0x04 | 0x0C | 0x14 | 0x1C | 0x24 | 0x2C | 0x3C => {
                let r = op >> 3;
                let result = self.inc8(self.reg8(r));
                self.set_reg8(r, result);
            }

            // DEC r
            0x05 | 0x0D | 0x15 | 0x1D | 0x25 | 0x2D | 0x3D => {
                let r = op >> 3;
                let result = self.dec8(self.reg8(r));
                self.set_reg8(r, result);
            }

            // LD (HL), n
            0x36 => {
                let value = self.read_code(bus);
                self.write_memory(bus, self.regs.hl, value);
            }

            // LD r, n
            0x06 | 0x0E | 0x16 | 0x1E | 0x26 | 0x2E | 0x3E => {
                let value = self.read_code(bus);
                self.set_reg8(op >> 3, value);
            }

            // RLCA / RRCA / RLA / RRA
            0x07 => self.rlca(),
            0x0F => self.rrca(),
            0x17 => self.rla(),
            0x1F => self.rra(),

            // EX AF, AF'
            0x08 => self.regs.exchange_af(),

            // ADD HL, rr
            0x09 | 0x19 | 0x29 | 0x39 => {
                self.tact_plus7_with_address(bus, self.regs.ir);
                let result = self.add16(self.regs.hl, self.reg16(op >> 4));
                self.regs.hl = result;
            }

            // LD A, (BC) / LD A, (DE)
            0x0A | 0x1A => {
                let address = if op == 0x0A { self.regs.bc } else { self.regs.de };
                let value = self.read_memory(bus, address);
                self.regs.set_a(value);
                self.regs.wz = address.wrapping_add(1);
            }

            // DJNZ e
            0x10 => {
                self.tact_plus1_with_address(bus, self.regs.ir);
                let offset = self.read_code(bus) as i8;
                let b = self.regs.b().wrapping_sub(1);
                self.regs.set_b(b);
                if b != 0 {
                    self.relative_jump(bus, offset);
                }
            }

            // JR e
            0x18 => {
                let offset = self.read_code(bus) as i8;
                self.relative_jump(bus, offset);
            }

            // JR NZ / Z / NC / C, e
            0x20 | 0x28 | 0x30 | 0x38 => {
                let offset = self.read_code(bus) as i8;
                if self.condition((op >> 3) & 3) {
                    self.relative_jump(bus, offset);
                }
            }

            // LD (nn), HL
            0x22 => {
                let address = self.read_code_word(bus);
                self.write_word(bus, address, self.regs.hl);
                self.regs.wz = address.wrapping_add(1);
            }

            // LD HL, (nn)
            0x2A => {
                let address = self.read_code_word(bus);
                self.regs.hl = self.read_word(bus, address);
                self.regs.wz = address.wrapping_add(1);
            }

            // LD (nn), A
            0x32 => {
                let address = self.read_code_word(bus);
                let a = self.regs.a();
                self.write_memory(bus, address, a);
                self.regs.wz = (u16::from(a) << 8) | (address.wrapping_add(1) & 0x00FF);
            }

            // LD A, (nn)
            0x3A => {
                let address = self.read_code_word(bus);
                let value = self.read_memory(bus, address);
                self.regs.set_a(value);
                self.regs.wz = address.wrapping_add(1);
            }

            // DAA / CPL / SCF / CCF
            0x27 => self.daa(),
            0x2F => self.cpl(),
            0x37 => self.scf(),
            0x3F => self.ccf(),

            // HALT: PC stays on the opcode until an interrupt
            0x76 => {
                self.halted = true;
                self.regs.pc = self.regs.pc.wrapping_sub(1);
            }

            // LD (HL), r
            0x70..=0x77 => {
                let value = self.reg8(op);
                self.write_memory(bus, self.regs.hl, value);
            }

            // LD r, (HL)
            0x46 | 0x4E | 0x56 | 0x5E | 0x66 | 0x6E | 0x7E => {
                let value = self.read_memory(bus, self.regs.hl);
                self.set_reg8(op >> 3, value);
            }

            // LD r, r'
            0x40..=0x7F => {
                let value = self.reg8(op);
                self.set_reg8(op >> 3, value);
            }

            // ALU A, (HL)
            0x86 | 0x8E | 0x96 | 0x9E | 0xA6 | 0xAE | 0xB6 | 0xBE => {
                let value = self.read_memory(bus, self.regs.hl);
                self.alu8(op >> 3, value);
            }

            // ALU A, r
            0x80..=0xBF => self.alu8(op >> 3, self.reg8(op)),

            // ALU A, n
            0xC6 | 0xCE | 0xD6 | 0xDE | 0xE6 | 0xEE | 0xF6 | 0xFE => {
                let value = self.read_code(bus);
                self.alu8(op >> 3, value);
            }

            // RET cc
            0xC0 | 0xC8 | 0xD0 | 0xD8 | 0xE0 | 0xE8 | 0xF0 | 0xF8 => {
                self.tact_plus1_with_address(bus, self.regs.ir);
                if self.condition(op >> 3) {
                    self.ret(bus);
                }
            }

            // RET
            0xC9 => self.ret(bus),

            // POP rr
            0xC1 | 0xD1 | 0xE1 | 0xF1 => {
                let value = self.pop(bus);
                self.set_reg16_af((op >> 4) & 3, value);
            }

            // PUSH rr
            0xC5 | 0xD5 | 0xE5 | 0xF5 => {
                self.tact_plus1_with_address(bus, self.regs.ir);
                let value = self.reg16_af((op >> 4) & 3);
                self.push(bus, value);
            }

            // JP cc, nn
            0xC2 | 0xCA | 0xD2 | 0xDA | 0xE2 | 0xEA | 0xF2 | 0xFA => {
                let address = self.read_code_word(bus);
                self.regs.wz = address;
                if self.condition(op >> 3) {
                    self.regs.pc = address;
                }
            }

            // JP nn
            0xC3 => {
                let address = self.read_code_word(bus);
                self.regs.wz = address;
                self.regs.pc = address;
            }

            // CALL cc, nn
            0xC4 | 0xCC | 0xD4 | 0xDC | 0xE4 | 0xEC | 0xF4 | 0xFC => {
                let address = self.read_code_word(bus);
                self.regs.wz = address;
                if self.condition(op >> 3) {
                    self.call(bus, address);
                }
            }

            // CALL nn
            0xCD => {
                let address = self.read_code_word(bus);
                self.regs.wz = address;
                self.call(bus, address);
            }

            // RST p
            0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => {
                self.tact_plus1_with_address(bus, self.regs.ir);
                self.push(bus, self.regs.pc);
                let target = u16::from(op & 0x38);
                self.regs.pc = target;
                self.regs.wz = target;
            }

            // OUT (n), A
            0xD3 => {
                let n = self.read_code(bus);
                let a = self.regs.a();
                let port = (u16::from(a) << 8) | u16::from(n);
                self.write_port(bus, port, a);
                self.regs.wz = (u16::from(a) << 8) | u16::from(n.wrapping_add(1));
            }

            // IN A, (n)
            0xDB => {
                let n = self.read_code(bus);
                let port = (u16::from(self.regs.a()) << 8) | u16::from(n);
                let value = self.read_port(bus, port);
                self.regs.set_a(value);
                self.regs.wz = port.wrapping_add(1);
            }

            // EXX
            0xD9 => self.regs.exchange_register_set(),

            // EX (SP), HL
            0xE3 => {
                let value = self.exchange_stack_top(bus, self.regs.hl);
                self.regs.hl = value;
            }

            // JP (HL)
            0xE9 => self.regs.pc = self.regs.hl,

            // EX DE, HL
            0xEB => core::mem::swap(&mut self.regs.de, &mut self.regs.hl),

            // LD SP, HL
            0xF9 => {
                self.tact_plus2_with_address(bus, self.regs.ir);
                self.regs.sp = self.regs.hl;
            }

            // DI
            0xF3 => {
                self.iff1 = false;
                self.iff2 = false;
            }

            // EI: INT is held off until after the next instruction
            0xFB => {
                self.iff1 = true;
                self.iff2 = true;
                self.ei_backlog = 2;
            }

            // Prefixes never reach this table.
            0xCB | 0xDD | 0xED | 0xFD => {}
        }
    }

    /// Taken JR/DJNZ: five T-states tagged with the displacement address.
    pub(super) fn relative_jump<B: IoBus>(&mut self, bus: &mut B, offset: i8) {
        self.tact_plus5_with_address(bus, self.regs.pc.wrapping_sub(1));
        let target = self.regs.pc.wrapping_add_signed(i16::from(offset));
        self.regs.pc = target;
        self.regs.wz = target;
    }

    pub(super) fn call<B: IoBus>(&mut self, bus: &mut B, address: u16) {
        self.tact_plus1_with_address(bus, self.regs.pc.wrapping_sub(1));
        self.push(bus, self.regs.pc);
        self.regs.pc = address;
    }

    pub(super) fn ret<B: IoBus>(&mut self, bus: &mut B) {
        let address = self.pop(bus);
        self.regs.pc = address;
        self.regs.wz = address;
        self.ret_executed = true;
    }

    /// EX (SP), rr. Returns the old stack top; WZ ends up holding it.
    pub(super) fn exchange_stack_top<B: IoBus>(&mut self, bus: &mut B, value: u16) -> u16 {
        let sp = self.regs.sp;
        let stack = self.read_word(bus, sp);
        self.tact_plus1_with_address(bus, sp.wrapping_add(1));
        let [lo, hi] = value.to_le_bytes();
        self.write_memory(bus, sp.wrapping_add(1), hi);
        self.write_memory(bus, sp, lo);
        self.tact_plus2_with_address(bus, sp);
        self.regs.wz = stack;
        stack
    }
}
