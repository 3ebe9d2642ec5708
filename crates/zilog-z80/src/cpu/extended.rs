//! ED-prefixed instructions.
//!
//! Opcodes with no defined behaviour act as an 8 T-state NOP.

use emu_core::IoBus;

use super::Z80;
use crate::flags::{CF, HF, NF, PF, SF, XF, YF, ZF};

/// Direction of a block instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Increment,
    Decrement,
}

impl Step {
    const fn from_opcode(op: u8) -> Self {
        if op & 0x08 == 0 { Self::Increment } else { Self::Decrement }
    }

    const fn apply(self, value: u16) -> u16 {
        match self {
            Self::Increment => value.wrapping_add(1),
            Self::Decrement => value.wrapping_sub(1),
        }
    }
}

impl Z80 {
    pub(super) fn execute_extended<B: IoBus>(&mut self, bus: &mut B) {
        let op = self.opcode;

        match op {
            // IN r, (C) / IN (C)
            0x40 | 0x48 | 0x50 | 0x58 | 0x60 | 0x68 | 0x70 | 0x78 => {
                let bc = self.regs.bc;
                let value = self.read_port(bus, bc);
                self.regs.wz = bc.wrapping_add(1);
                let flags = (self.regs.f() & CF) | self.tables.sz53p[value as usize];
                self.set_flags(flags);
                if op != 0x70 {
                    self.set_reg8(op >> 3, value);
                }
            }

            // OUT (C), r / OUT (C), 0
            0x41 | 0x49 | 0x51 | 0x59 | 0x61 | 0x69 | 0x71 | 0x79 => {
                let bc = self.regs.bc;
                let value = if op == 0x71 { 0 } else { self.reg8(op >> 3) };
                self.write_port(bus, bc, value);
                self.regs.wz = bc.wrapping_add(1);
            }

            // SBC HL, rr
            0x42 | 0x52 | 0x62 | 0x72 => {
                self.tact_plus7_with_address(bus, self.regs.ir);
                self.sbc_hl(self.reg16(op >> 4));
            }

            // ADC HL, rr
            0x4A | 0x5A | 0x6A | 0x7A => {
                self.tact_plus7_with_address(bus, self.regs.ir);
                self.adc_hl(self.reg16(op >> 4));
            }

            // LD (nn), rr
            0x43 | 0x53 | 0x63 | 0x73 => {
                let address = self.read_code_word(bus);
                self.write_word(bus, address, self.reg16(op >> 4));
                self.regs.wz = address.wrapping_add(1);
            }

            // LD rr, (nn)
            0x4B | 0x5B | 0x6B | 0x7B => {
                let address = self.read_code_word(bus);
                let value = self.read_word(bus, address);
                self.set_reg16(op >> 4, value);
                self.regs.wz = address.wrapping_add(1);
            }

            // NEG (and mirrors)
            0x44 | 0x4C | 0x54 | 0x5C | 0x64 | 0x6C | 0x74 | 0x7C => self.neg(),

            // RETN / RETI (and mirrors)
            0x45 | 0x4D | 0x55 | 0x5D | 0x65 | 0x6D | 0x75 | 0x7D => {
                self.iff1 = self.iff2;
                self.ret(bus);
            }

            // IM 0 / 1 / 2 (and mirrors)
            0x46 | 0x4E | 0x66 | 0x6E => self.interrupt_mode = 0,
            0x56 | 0x76 => self.interrupt_mode = 1,
            0x5E | 0x7E => self.interrupt_mode = 2,

            // LD I, A
            0x47 => {
                self.tact_plus1_with_address(bus, self.regs.ir);
                self.regs.set_i(self.regs.a());
            }

            // LD R, A
            0x4F => {
                self.tact_plus1_with_address(bus, self.regs.ir);
                self.regs.set_r(self.regs.a());
            }

            // LD A, I / LD A, R
            0x57 | 0x5F => {
                self.tact_plus1_with_address(bus, self.regs.ir);
                let value = if op == 0x57 { self.regs.i() } else { self.regs.r() };
                self.regs.set_a(value);
                let flags = (self.regs.f() & CF)
                    | self.tables.sz53[value as usize]
                    | if self.iff2 { PF } else { 0 };
                self.set_flags(flags);
            }

            // RRD
            0x67 => {
                let hl = self.regs.hl;
                let value = self.read_memory(bus, hl);
                self.tact_plus4_with_address(bus, hl);
                let a = self.regs.a();
                self.write_memory(bus, hl, (a << 4) | (value >> 4));
                self.decimal_rotate_flags((a & 0xF0) | (value & 0x0F));
            }

            // RLD
            0x6F => {
                let hl = self.regs.hl;
                let value = self.read_memory(bus, hl);
                self.tact_plus4_with_address(bus, hl);
                let a = self.regs.a();
                self.write_memory(bus, hl, (value << 4) | (a & 0x0F));
                self.decimal_rotate_flags((a & 0xF0) | (value >> 4));
            }

            // LDI / LDD / LDIR / LDDR
            0xA0 | 0xA8 | 0xB0 | 0xB8 => self.block_load(bus, Step::from_opcode(op), op & 0x10 != 0),

            // CPI / CPD / CPIR / CPDR
            0xA1 | 0xA9 | 0xB1 | 0xB9 => {
                self.block_compare(bus, Step::from_opcode(op), op & 0x10 != 0);
            }

            // INI / IND / INIR / INDR
            0xA2 | 0xAA | 0xB2 | 0xBA => self.block_in(bus, Step::from_opcode(op), op & 0x10 != 0),

            // OUTI / OUTD / OTIR / OTDR
            0xA3 | 0xAB | 0xB3 | 0xBB => {
                self.block_out(bus, Step::from_opcode(op), op & 0x10 != 0);
            }

            // NOP
            _ => {}
        }
    }

    /// Shared tail of RRD/RLD: store the new A and set flags from it.
    fn decimal_rotate_flags(&mut self, a: u8) {
        self.regs.set_a(a);
        self.regs.wz = self.regs.hl.wrapping_add(1);
        let flags = (self.regs.f() & CF) | self.tables.sz53p[a as usize];
        self.set_flags(flags);
    }

    /// Rewind PC onto the ED prefix so the instruction runs again.
    fn repeat_block(&mut self) {
        self.regs.pc = self.regs.pc.wrapping_sub(2);
        self.regs.wz = self.regs.pc.wrapping_add(1);
    }

    fn block_load<B: IoBus>(&mut self, bus: &mut B, step: Step, repeat: bool) {
        let value = self.read_memory(bus, self.regs.hl);
        let de = self.regs.de;
        self.write_memory(bus, de, value);
        self.tact_plus2_with_address(bus, de);

        self.regs.bc = self.regs.bc.wrapping_sub(1);
        self.regs.hl = step.apply(self.regs.hl);
        self.regs.de = step.apply(de);

        let n = value.wrapping_add(self.regs.a());
        let mut flags = (self.regs.f() & (CF | ZF | SF)) | (n & XF);
        if n & 0x02 != 0 {
            flags |= YF;
        }
        if self.regs.bc != 0 {
            flags |= PF;
        }
        self.set_flags(flags);

        if repeat && self.regs.bc != 0 {
            self.tact_plus5_with_address(bus, de);
            self.repeat_block();
        }
    }

    fn block_compare<B: IoBus>(&mut self, bus: &mut B, step: Step, repeat: bool) {
        let hl = self.regs.hl;
        let value = self.read_memory(bus, hl);
        self.tact_plus5_with_address(bus, hl);

        let a = self.regs.a();
        let mut result = a.wrapping_sub(value);
        let lookup = ((a & 0x08) >> 3) | ((value & 0x08) >> 2) | ((result & 0x08) >> 1);
        self.regs.bc = self.regs.bc.wrapping_sub(1);
        self.regs.hl = step.apply(hl);
        self.regs.wz = step.apply(self.regs.wz);

        let mut flags = (self.regs.f() & CF)
            | NF
            | self.tables.half_carry_sub[lookup as usize]
            | (result & SF);
        if self.regs.bc != 0 {
            flags |= PF;
        }
        if result == 0 {
            flags |= ZF;
        }
        if flags & HF != 0 {
            result = result.wrapping_sub(1);
        }
        flags |= result & XF;
        if result & 0x02 != 0 {
            flags |= YF;
        }
        self.set_flags(flags);

        if repeat && self.regs.bc != 0 && flags & ZF == 0 {
            self.tact_plus5_with_address(bus, hl);
            self.repeat_block();
        }
    }

    fn block_in<B: IoBus>(&mut self, bus: &mut B, step: Step, repeat: bool) {
        self.tact_plus1_with_address(bus, self.regs.ir);
        let bc = self.regs.bc;
        let value = self.read_port(bus, bc);
        let hl = self.regs.hl;
        self.write_memory(bus, hl, value);

        self.regs.wz = step.apply(bc);
        let b = self.regs.b().wrapping_sub(1);
        self.regs.set_b(b);
        self.regs.hl = step.apply(hl);

        let k = value.wrapping_add(step.apply(u16::from(self.regs.c())) as u8);
        self.block_io_flags(value, k);

        if repeat && b != 0 {
            self.tact_plus5_with_address(bus, hl);
            self.repeat_block();
        }
    }

    fn block_out<B: IoBus>(&mut self, bus: &mut B, step: Step, repeat: bool) {
        self.tact_plus1_with_address(bus, self.regs.ir);
        let hl = self.regs.hl;
        let value = self.read_memory(bus, hl);
        let b = self.regs.b().wrapping_sub(1);
        self.regs.set_b(b);
        self.regs.wz = step.apply(self.regs.bc);
        self.write_port(bus, self.regs.bc, value);
        self.regs.hl = step.apply(hl);

        let k = value.wrapping_add(self.regs.l());
        self.block_io_flags(value, k);

        if repeat && b != 0 {
            self.tact_plus5_with_address(bus, self.regs.bc);
            self.repeat_block();
        }
    }

    /// Flags of INI/IND/OUTI/OUTD, given the transferred byte and the
    /// internal sum `k`.
    fn block_io_flags(&mut self, value: u8, k: u8) {
        let b = self.regs.b();
        let mut flags = self.tables.sz53[b as usize] | self.tables.parity[((k & 0x07) ^ b) as usize];
        if value & 0x80 != 0 {
            flags |= NF;
        }
        if k < value {
            flags |= HF | CF;
        }
        self.set_flags(flags);
    }
}
