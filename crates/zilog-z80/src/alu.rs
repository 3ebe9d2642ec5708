//! ALU flag tables and operations for the Z80.
//!
//! Every 8-bit operation folds its flag computation into table lookups:
//! sign, zero and the undocumented bits come from `sz53`/`sz53p`, half carry
//! and overflow from a three-bit lookup built out of bit 3 (or bit 7) of
//! both operands and the result.

use std::sync::OnceLock;

use crate::cpu::Z80;
use crate::flags::{CF, HF, NF, PF, SF, XYF, ZF};

/// Precomputed flag tables, shared by every CPU instance in the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AluTables {
    /// Flags after `INC` of the indexed value (carry excluded).
    pub inc_flags: [u8; 256],
    /// Flags after `DEC` of the indexed value (carry excluded).
    pub dec_flags: [u8; 256],
    pub half_carry_add: [u8; 8],
    pub half_carry_sub: [u8; 8],
    pub overflow_add: [u8; 8],
    pub overflow_sub: [u8; 8],
    /// `PF` for values with even parity.
    pub parity: [u8; 256],
    pub sz53: [u8; 256],
    pub sz53p: [u8; 256],
}

static SHARED_TABLES: OnceLock<AluTables> = OnceLock::new();

impl AluTables {
    /// The process-wide tables, built on first use.
    pub fn shared() -> &'static Self {
        SHARED_TABLES.get_or_init(Self::build)
    }

    /// Build a fresh set of tables.
    #[must_use]
    pub fn build() -> Self {
        let mut tables = Self {
            inc_flags: [0; 256],
            dec_flags: [0; 256],
            half_carry_add: [0, HF, HF, HF, 0, 0, 0, HF],
            half_carry_sub: [0, 0, HF, 0, HF, 0, HF, HF],
            overflow_add: [0, 0, 0, PF, PF, 0, 0, 0],
            overflow_sub: [0, PF, 0, 0, 0, 0, PF, 0],
            parity: [0; 256],
            sz53: [0; 256],
            sz53p: [0; 256],
        };

        for value in 0..=255u8 {
            let i = value as usize;
            let mut f = value & (SF | XYF);
            if value == 0 {
                f |= ZF;
            }
            tables.sz53[i] = f;
            tables.parity[i] = if value.count_ones().is_multiple_of(2) { PF } else { 0 };
            tables.sz53p[i] = f | tables.parity[i];
        }

        for value in 0..=255u8 {
            let inc = value.wrapping_add(1);
            let mut f = tables.sz53[inc as usize];
            if inc & 0x0F == 0 {
                f |= HF;
            }
            if inc == 0x80 {
                f |= PF;
            }
            tables.inc_flags[value as usize] = f;

            let dec = value.wrapping_sub(1);
            let mut f = tables.sz53[dec as usize] | NF;
            if value & 0x0F == 0 {
                f |= HF;
            }
            if dec == 0x7F {
                f |= PF;
            }
            tables.dec_flags[value as usize] = f;
        }

        tables
    }
}

/// Three-bit half-carry/overflow lookup over bits 3 and 7 of both operands
/// and the result. Low three bits select half carry, bits 4..6 overflow.
const fn lookup8(a: u8, b: u8, result: u16) -> usize {
    (((a & 0x88) >> 3) | ((b & 0x88) >> 2) | ((result as u8 & 0x88) >> 1)) as usize
}

/// Same scheme over bits 11 and 15 of a 16-bit operation.
const fn lookup16(a: u16, b: u16, result: u32) -> usize {
    ((((a & 0x8800) >> 11) | ((b & 0x8800) >> 10) | ((result as u16 & 0x8800) >> 9)) & 0xFF)
        as usize
}

impl Z80 {
    /// Set F as the result of a flag-computing instruction.
    pub(crate) fn set_flags(&mut self, flags: u8) {
        self.regs.set_f(flags);
        self.flags53_updated = true;
    }

    pub(crate) fn add8(&mut self, value: u8) {
        let a = self.regs.a();
        let temp = u16::from(a) + u16::from(value);
        let lookup = lookup8(a, value, temp);
        let result = temp as u8;
        self.regs.set_a(result);
        self.set_flags(
            (if temp & 0x100 != 0 { CF } else { 0 })
                | self.tables.half_carry_add[lookup & 0x07]
                | self.tables.overflow_add[lookup >> 4]
                | self.tables.sz53[result as usize],
        );
    }

    pub(crate) fn adc8(&mut self, value: u8) {
        let a = self.regs.a();
        let temp = u16::from(a) + u16::from(value) + u16::from(self.regs.f() & CF);
        let lookup = lookup8(a, value, temp);
        let result = temp as u8;
        self.regs.set_a(result);
        self.set_flags(
            (if temp & 0x100 != 0 { CF } else { 0 })
                | self.tables.half_carry_add[lookup & 0x07]
                | self.tables.overflow_add[lookup >> 4]
                | self.tables.sz53[result as usize],
        );
    }

    pub(crate) fn sub8(&mut self, value: u8) {
        let a = self.regs.a();
        let temp = u16::from(a).wrapping_sub(u16::from(value));
        let lookup = lookup8(a, value, temp);
        let result = temp as u8;
        self.regs.set_a(result);
        self.set_flags(
            (if temp & 0x100 != 0 { CF } else { 0 })
                | NF
                | self.tables.half_carry_sub[lookup & 0x07]
                | self.tables.overflow_sub[lookup >> 4]
                | self.tables.sz53[result as usize],
        );
    }

    pub(crate) fn sbc8(&mut self, value: u8) {
        let a = self.regs.a();
        let temp = u16::from(a)
            .wrapping_sub(u16::from(value))
            .wrapping_sub(u16::from(self.regs.f() & CF));
        let lookup = lookup8(a, value, temp);
        let result = temp as u8;
        self.regs.set_a(result);
        self.set_flags(
            (if temp & 0x100 != 0 { CF } else { 0 })
                | NF
                | self.tables.half_carry_sub[lookup & 0x07]
                | self.tables.overflow_sub[lookup >> 4]
                | self.tables.sz53[result as usize],
        );
    }

    pub(crate) fn and8(&mut self, value: u8) {
        let result = self.regs.a() & value;
        self.regs.set_a(result);
        self.set_flags(HF | self.tables.sz53p[result as usize]);
    }

    pub(crate) fn xor8(&mut self, value: u8) {
        let result = self.regs.a() ^ value;
        self.regs.set_a(result);
        self.set_flags(self.tables.sz53p[result as usize]);
    }

    pub(crate) fn or8(&mut self, value: u8) {
        let result = self.regs.a() | value;
        self.regs.set_a(result);
        self.set_flags(self.tables.sz53p[result as usize]);
    }

    /// Compare: flags of `A - value`, undocumented bits from the operand.
    pub(crate) fn cp8(&mut self, value: u8) {
        let a = self.regs.a();
        let temp = u16::from(a).wrapping_sub(u16::from(value));
        let lookup = lookup8(a, value, temp);
        let result = temp as u8;
        let carry_or_zero = if temp & 0x100 != 0 {
            CF
        } else if result == 0 {
            ZF
        } else {
            0
        };
        self.set_flags(
            carry_or_zero
                | NF
                | self.tables.half_carry_sub[lookup & 0x07]
                | self.tables.overflow_sub[lookup >> 4]
                | (value & XYF)
                | (result & SF),
        );
    }

    /// ALU operation selected by bits 5..3 of an opcode
    /// (ADD, ADC, SUB, SBC, AND, XOR, OR, CP).
    pub(crate) fn alu8(&mut self, operation: u8, value: u8) {
        match operation & 7 {
            0 => self.add8(value),
            1 => self.adc8(value),
            2 => self.sub8(value),
            3 => self.sbc8(value),
            4 => self.and8(value),
            5 => self.xor8(value),
            6 => self.or8(value),
            _ => self.cp8(value),
        }
    }

    pub(crate) fn inc8(&mut self, value: u8) -> u8 {
        let flags = (self.regs.f() & CF) | self.tables.inc_flags[value as usize];
        self.set_flags(flags);
        value.wrapping_add(1)
    }

    pub(crate) fn dec8(&mut self, value: u8) -> u8 {
        let flags = (self.regs.f() & CF) | self.tables.dec_flags[value as usize];
        self.set_flags(flags);
        value.wrapping_sub(1)
    }

    pub(crate) fn rlc(&mut self, value: u8) -> u8 {
        let result = value.rotate_left(1);
        self.set_flags((result & CF) | self.tables.sz53p[result as usize]);
        result
    }

    pub(crate) fn rrc(&mut self, value: u8) -> u8 {
        let result = value.rotate_right(1);
        self.set_flags((value & CF) | self.tables.sz53p[result as usize]);
        result
    }

    pub(crate) fn rl(&mut self, value: u8) -> u8 {
        let result = (value << 1) | (self.regs.f() & CF);
        self.set_flags((value >> 7) | self.tables.sz53p[result as usize]);
        result
    }

    pub(crate) fn rr(&mut self, value: u8) -> u8 {
        let result = (value >> 1) | (self.regs.f() << 7);
        self.set_flags((value & CF) | self.tables.sz53p[result as usize]);
        result
    }

    pub(crate) fn sla(&mut self, value: u8) -> u8 {
        let result = value << 1;
        self.set_flags((value >> 7) | self.tables.sz53p[result as usize]);
        result
    }

    pub(crate) fn sra(&mut self, value: u8) -> u8 {
        let result = (value & 0x80) | (value >> 1);
        self.set_flags((value & CF) | self.tables.sz53p[result as usize]);
        result
    }

    /// Undocumented: shift left, bit 0 set.
    pub(crate) fn sll(&mut self, value: u8) -> u8 {
        let result = (value << 1) | 0x01;
        self.set_flags((value >> 7) | self.tables.sz53p[result as usize]);
        result
    }

    pub(crate) fn srl(&mut self, value: u8) -> u8 {
        let result = value >> 1;
        self.set_flags((value & CF) | self.tables.sz53p[result as usize]);
        result
    }

    /// Rotate/shift selected by bits 5..3 of a CB opcode.
    pub(crate) fn rotate_shift(&mut self, operation: u8, value: u8) -> u8 {
        match operation & 7 {
            0 => self.rlc(value),
            1 => self.rrc(value),
            2 => self.rl(value),
            3 => self.rr(value),
            4 => self.sla(value),
            5 => self.sra(value),
            6 => self.sll(value),
            _ => self.srl(value),
        }
    }

    /// BIT n, r - undocumented bits come from the tested register.
    pub(crate) fn bit(&mut self, bit: u8, value: u8) {
        self.bit_with_undocumented(bit, value, value);
    }

    /// BIT n, (HL) / BIT n, (IX+d) - undocumented bits come from the high
    /// byte of WZ.
    pub(crate) fn bit_memptr(&mut self, bit: u8, value: u8) {
        let source = self.regs.w();
        self.bit_with_undocumented(bit, value, source);
    }

    fn bit_with_undocumented(&mut self, bit: u8, value: u8, source: u8) {
        let mask = 1u8 << (bit & 7);
        let mut flags = (self.regs.f() & CF) | HF | (source & XYF);
        if value & mask == 0 {
            flags |= PF | ZF;
        }
        if mask == 0x80 && value & 0x80 != 0 {
            flags |= SF;
        }
        self.set_flags(flags);
    }

    /// ADD HL/IX/IY, rr. Latches `base + 1` into WZ.
    pub(crate) fn add16(&mut self, base: u16, value: u16) -> u16 {
        let temp = u32::from(base) + u32::from(value);
        let lookup = ((base & 0x0800) >> 11) | ((value & 0x0800) >> 10) | ((temp as u16 & 0x0800) >> 9);
        self.regs.wz = base.wrapping_add(1);
        let result = temp as u16;
        self.set_flags(
            (self.regs.f() & (PF | ZF | SF))
                | (if temp & 0x1_0000 != 0 { CF } else { 0 })
                | ((result >> 8) as u8 & XYF)
                | self.tables.half_carry_add[lookup as usize],
        );
        result
    }

    /// ADC HL, rr. Latches `HL + 1` into WZ.
    pub(crate) fn adc_hl(&mut self, value: u16) {
        let hl = self.regs.hl;
        let temp = u32::from(hl) + u32::from(value) + u32::from(self.regs.f() & CF);
        let lookup = lookup16(hl, value, temp);
        self.regs.wz = hl.wrapping_add(1);
        let result = temp as u16;
        self.regs.hl = result;
        self.set_flags(
            (if temp & 0x1_0000 != 0 { CF } else { 0 })
                | self.tables.overflow_add[lookup >> 4]
                | ((result >> 8) as u8 & (XYF | SF))
                | self.tables.half_carry_add[lookup & 0x07]
                | if result == 0 { ZF } else { 0 },
        );
    }

    /// SBC HL, rr. Latches `HL + 1` into WZ.
    pub(crate) fn sbc_hl(&mut self, value: u16) {
        let hl = self.regs.hl;
        let temp = u32::from(hl)
            .wrapping_sub(u32::from(value))
            .wrapping_sub(u32::from(self.regs.f() & CF));
        let lookup = lookup16(hl, value, temp);
        self.regs.wz = hl.wrapping_add(1);
        let result = temp as u16;
        self.regs.hl = result;
        self.set_flags(
            (if temp & 0x1_0000 != 0 { CF } else { 0 })
                | NF
                | self.tables.overflow_sub[lookup >> 4]
                | ((result >> 8) as u8 & (XYF | SF))
                | self.tables.half_carry_sub[lookup & 0x07]
                | if result == 0 { ZF } else { 0 },
        );
    }

    pub(crate) fn rlca(&mut self) {
        let a = self.regs.a().rotate_left(1);
        self.regs.set_a(a);
        self.set_flags((self.regs.f() & (PF | ZF | SF)) | (a & (XYF | CF)));
    }

    pub(crate) fn rrca(&mut self) {
        let old = self.regs.a();
        let a = old.rotate_right(1);
        self.regs.set_a(a);
        self.set_flags((self.regs.f() & (PF | ZF | SF)) | (old & CF) | (a & XYF));
    }

    pub(crate) fn rla(&mut self) {
        let old = self.regs.a();
        let a = (old << 1) | (self.regs.f() & CF);
        self.regs.set_a(a);
        self.set_flags((self.regs.f() & (PF | ZF | SF)) | (a & XYF) | (old >> 7));
    }

    pub(crate) fn rra(&mut self) {
        let old = self.regs.a();
        let a = (old >> 1) | (self.regs.f() << 7);
        self.regs.set_a(a);
        self.set_flags((self.regs.f() & (PF | ZF | SF)) | (a & XYF) | (old & CF));
    }

    pub(crate) fn daa(&mut self) {
        let a = self.regs.a();
        let f = self.regs.f();
        let mut correction = 0u8;
        let mut carry = f & CF;
        if f & HF != 0 || a & 0x0F > 9 {
            correction = 0x06;
        }
        if carry != 0 || a > 0x99 {
            correction |= 0x60;
        }
        if a > 0x99 {
            carry = CF;
        }
        if f & NF != 0 {
            self.sub8(correction);
        } else {
            self.add8(correction);
        }
        let result = self.regs.a();
        self.set_flags((self.regs.f() & !(CF | PF)) | carry | self.tables.parity[result as usize]);
    }

    pub(crate) fn cpl(&mut self) {
        let a = self.regs.a() ^ 0xFF;
        self.regs.set_a(a);
        self.set_flags((self.regs.f() & (CF | PF | ZF | SF)) | (a & XYF) | NF | HF);
    }

    pub(crate) fn neg(&mut self) {
        let value = self.regs.a();
        self.regs.set_a(0);
        self.sub8(value);
    }

    /// Source of the undocumented bits for SCF/CCF: `A` alone when the
    /// previous instruction computed flags, `A | F` otherwise.
    fn scf_ccf_undocumented(&self) -> u8 {
        let a = self.regs.a();
        let source = if self.prev_flags53_updated { a } else { a | self.regs.f() };
        source & XYF
    }

    pub(crate) fn scf(&mut self) {
        let undocumented = self.scf_ccf_undocumented();
        self.set_flags((self.regs.f() & (PF | ZF | SF)) | CF | undocumented);
    }

    pub(crate) fn ccf(&mut self) {
        let undocumented = self.scf_ccf_undocumented();
        let f = self.regs.f();
        let carry = if f & CF != 0 { HF } else { CF };
        self.set_flags((f & (PF | ZF | SF)) | carry | undocumented);
    }
}
