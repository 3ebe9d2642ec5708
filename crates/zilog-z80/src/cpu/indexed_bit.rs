//! DDCB/FDCB-prefixed instructions.
//!
//! The effective address is already in WZ. Except for BIT, the result is
//! also copied into the register named by the low three opcode bits
//! (undocumented).

use emu_core::IoBus;

use super::Z80;

impl Z80 {
    pub(super) fn execute_indexed_bit<B: IoBus>(&mut self, bus: &mut B, address: u16) {
        let op = self.opcode;
        let value = self.read_memory(bus, address);
        self.tact_plus1_with_address(bus, address);

        if let Some(result) = self.bit_operation(op, value, true) {
            self.write_memory(bus, address, result);
            if op & 7 != 6 {
                self.set_reg8(op, result);
            }
        }
    }
}
