//! Z80 register file.
//!
//! Every register pair is stored once as a `u16`. The 8-bit registers are
//! views over the high or low half of their pair, so writing `F` can never
//! disturb `A` and writing `HL` is immediately visible through `H` and `L`.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::flags::{CF, HF, NF, PF, SF, XF, YF, ZF};

/// Generates a getter/setter pair for the high and low byte of a pair.
macro_rules! byte_views {
    ($pair:ident: $hi:ident, $set_hi:ident, $lo:ident, $set_lo:ident) => {
        #[must_use]
        pub const fn $hi(&self) -> u8 {
            (self.$pair >> 8) as u8
        }

        pub fn $set_hi(&mut self, value: u8) {
            self.$pair = (self.$pair & 0x00FF) | (u16::from(value) << 8);
        }

        #[must_use]
        pub const fn $lo(&self) -> u8 {
            self.$pair as u8
        }

        pub fn $set_lo(&mut self, value: u8) {
            self.$pair = (self.$pair & 0xFF00) | u16::from(value);
        }
    };
}

/// Complete Z80 register file, including the alternate set and the internal
/// WZ (MEMPTR) latch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Registers {
    // Main registers
    pub af: u16,
    pub bc: u16,
    pub de: u16,
    pub hl: u16,

    // Alternate registers
    pub af_alt: u16,
    pub bc_alt: u16,
    pub de_alt: u16,
    pub hl_alt: u16,

    // Index registers
    pub ix: u16,
    pub iy: u16,

    /// Interrupt page (high) and memory refresh (low).
    pub ir: u16,
    pub pc: u16,
    pub sp: u16,

    /// WZ/MEMPTR - internal address latch.
    /// Affects undocumented X/Y flags in BIT instructions and 16-bit arithmetic.
    pub wz: u16,
}

impl Registers {
    byte_views!(af: a, set_a, f, set_f);
    byte_views!(bc: b, set_b, c, set_c);
    byte_views!(de: d, set_d, e, set_e);
    byte_views!(hl: h, set_h, l, set_l);
    byte_views!(ix: xh, set_xh, xl, set_xl);
    byte_views!(iy: yh, set_yh, yl, set_yl);
    byte_views!(ir: i, set_i, r, set_r);
    byte_views!(wz: w, set_w, z, set_z);

    /// EX AF, AF'
    pub fn exchange_af(&mut self) {
        core::mem::swap(&mut self.af, &mut self.af_alt);
    }

    /// EXX - swap BC, DE and HL with their alternates.
    pub fn exchange_register_set(&mut self) {
        core::mem::swap(&mut self.bc, &mut self.bc_alt);
        core::mem::swap(&mut self.de, &mut self.de_alt);
        core::mem::swap(&mut self.hl, &mut self.hl_alt);
    }

    /// Advance the 7-bit refresh counter, keeping bit 7 of R.
    pub fn refresh(&mut self) {
        let r = self.r();
        self.set_r((r & 0x80) | (r.wrapping_add(1) & 0x7F));
    }

    #[must_use]
    pub const fn sign(&self) -> bool {
        self.f() & SF != 0
    }

    #[must_use]
    pub const fn zero(&self) -> bool {
        self.f() & ZF != 0
    }

    /// Undocumented bit 5.
    #[must_use]
    pub const fn flag5(&self) -> bool {
        self.f() & YF != 0
    }

    #[must_use]
    pub const fn half_carry(&self) -> bool {
        self.f() & HF != 0
    }

    /// Undocumented bit 3.
    #[must_use]
    pub const fn flag3(&self) -> bool {
        self.f() & XF != 0
    }

    #[must_use]
    pub const fn parity_overflow(&self) -> bool {
        self.f() & PF != 0
    }

    #[must_use]
    pub const fn subtract(&self) -> bool {
        self.f() & NF != 0
    }

    #[must_use]
    pub const fn carry(&self) -> bool {
        self.f() & CF != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn halves_alias_their_pair() {
        let mut regs = Registers::default();
        regs.af = 0x1234;
        assert_eq!(regs.a(), 0x12);
        assert_eq!(regs.f(), 0x34);

        regs.set_f(0xFF);
        assert_eq!(regs.af, 0x12FF);
        regs.set_a(0x00);
        assert_eq!(regs.af, 0x00FF);
    }

    #[test]
    fn index_halves_alias_index_registers() {
        let mut regs = Registers::default();
        regs.set_xh(0xAB);
        regs.set_yl(0xCD);
        assert_eq!(regs.ix, 0xAB00);
        assert_eq!(regs.iy, 0x00CD);
    }

    #[test]
    fn refresh_wraps_in_seven_bits() {
        let mut regs = Registers::default();
        regs.set_r(0xFF);
        regs.refresh();
        assert_eq!(regs.r(), 0x80);
        regs.set_r(0x7F);
        regs.refresh();
        assert_eq!(regs.r(), 0x00);
        regs.set_i(0x3F);
        regs.refresh();
        assert_eq!(regs.i(), 0x3F);
    }

    #[test]
    fn flag_accessors_read_individual_bits() {
        let mut regs = Registers::default();
        regs.set_f(SF | HF | CF);
        assert!(regs.sign());
        assert!(!regs.zero());
        assert!(regs.half_carry());
        assert!(!regs.parity_overflow());
        assert!(!regs.subtract());
        assert!(regs.carry());
        assert!(!regs.flag3());
        assert!(!regs.flag5());
    }

    #[test]
    fn exchanges_are_involutions() {
        let mut regs = Registers {
            af: 0x0102,
            bc: 0x0304,
            de: 0x0506,
            hl: 0x0708,
            af_alt: 0x1112,
            bc_alt: 0x1314,
            de_alt: 0x1516,
            hl_alt: 0x1718,
            ..Registers::default()
        };
        let before = regs;

        regs.exchange_register_set();
        assert_eq!(regs.bc, 0x1314);
        assert_eq!(regs.hl_alt, 0x0708);
        assert_eq!(regs.af, 0x0102);
        regs.exchange_register_set();
        assert_eq!(regs, before);

        regs.exchange_af();
        assert_eq!(regs.af, 0x1112);
        regs.exchange_af();
        assert_eq!(regs, before);
    }
}
