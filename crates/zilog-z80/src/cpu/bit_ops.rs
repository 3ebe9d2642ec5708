//! CB-prefixed instructions: rotates, shifts, BIT, RES and SET.

use emu_core::IoBus;

use super::Z80;

impl Z80 {
    pub(super) fn execute_bit<B: IoBus>(&mut self, bus: &mut B) {
        let op = self.opcode;
        let r = op & 7;

        if r == 6 {
            let hl = self.regs.hl;
            let value = self.read_memory(bus, hl);
            self.tact_plus1_with_address(bus, hl);
            if let Some(result) = self.bit_operation(op, value, true) {
                self.write_memory(bus, hl, result);
            }
            return;
        }

        if let Some(result) = self.bit_operation(op, self.reg8(r), false) {
            self.set_reg8(r, result);
        }
    }

    /// Apply a CB operation to `value`. Returns the value to store back, or
    /// `None` for BIT. `from_memory` selects WZ as the source of the
    /// undocumented BIT flags.
    pub(super) fn bit_operation(&mut self, op: u8, value: u8, from_memory: bool) -> Option<u8> {
        let bit = (op >> 3) & 7;
        match op >> 6 {
            // RLC RRC RL RR SLA SRA SLL SRL
            0 => Some(self.rotate_shift(bit, value)),
            // BIT b
            1 => {
                if from_memory {
                    self.bit_memptr(bit, value);
                } else {
                    self.bit(bit, value);
                }
                None
            }
            // RES b
            2 => Some(value & !(1 << bit)),
            // SET b
            _ => Some(value | (1 << bit)),
        }
    }
}
