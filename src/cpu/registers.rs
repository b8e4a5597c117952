//! MU1 register file.
//!
//! The MU1 has:
//! - ACC: 16-bit accumulator (the only arithmetic register)
//! - IR: instruction register, holds the word fetched at PC
//! - DIN / DOUT: memory data-in and data-out latches
//! - PC: program counter
//! - SP: stack pointer (grows downward)
//! - four condition flags Z, N, V, C

use serde::{Serialize, Deserialize};

/// A 16-bit machine word.
pub type Word = u16;

/// Stack pointer value after reset.
pub const RESET_SP: Word = 0x00FF;

/// Program counter value after reset.
pub const RESET_PC: Word = 0x0000;

/// Condition flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Flags {
    /// Zero: the last result was 0.
    pub z: bool,
    /// Negative: bit 15 of the last result.
    pub n: bool,
    /// Signed overflow of the last addition.
    pub v: bool,
    /// Unsigned carry of the last addition.
    pub c: bool,
}

impl Flags {
    /// Render as `ZNVC` with `-` for clear flags.
    pub fn to_letters(self) -> String {
        [(self.z, 'Z'), (self.n, 'N'), (self.v, 'V'), (self.c, 'C')]
            .iter()
            .map(|&(set, letter)| if set { letter } else { '-' })
            .collect()
    }
}

/// The MU1 register file.
///
/// `pc` and `sp` are full 16-bit registers. Only the low 12 bits address
/// memory, but increments and decrements are never truncated to 12 bits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    pub acc: Word,
    pub ir: Word,
    pub din: Word,
    pub dout: Word,
    /// Operand latched by the decode phase (the whole instruction word).
    pub operand: Word,
    pub pc: Word,
    pub sp: Word,
    pub flags: Flags,
}

impl Registers {
    /// Create a register file holding the reset vector.
    pub fn new() -> Self {
        Self {
            acc: 0,
            ir: 0,
            din: 0,
            dout: 0,
            operand: 0,
            pc: RESET_PC,
            sp: RESET_SP,
            flags: Flags::default(),
        }
    }

    /// Return to the reset vector.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Increment the program counter by 1 (16-bit wrapping).
    /// Returns the old value.
    pub fn advance_pc(&mut self) -> Word {
        let old = self.pc;
        self.pc = self.pc.wrapping_add(1);
        old
    }

    /// Set the program counter to an absolute address.
    pub fn jump(&mut self, addr: Word) {
        self.pc = addr;
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_vector() {
        let regs = Registers::new();
        assert_eq!(regs.sp, 0x00FF);
        assert_eq!(regs.pc, 0x0000);
        assert_eq!(regs.acc, 0);
        assert_eq!(regs.flags, Flags::default());
    }

    #[test]
    fn test_advance_pc() {
        let mut regs = Registers::new();
        regs.pc = 10;

        let old = regs.advance_pc();
        assert_eq!(old, 10);
        assert_eq!(regs.pc, 11);
    }

    #[test]
    fn test_advance_pc_is_not_masked_to_12_bits() {
        let mut regs = Registers::new();
        regs.pc = 0x0FFF;
        regs.advance_pc();
        assert_eq!(regs.pc, 0x1000);

        regs.pc = 0xFFFF;
        regs.advance_pc();
        assert_eq!(regs.pc, 0x0000);
    }

    #[test]
    fn test_reset_restores_vector() {
        let mut regs = Registers::new();
        regs.acc = 0x1234;
        regs.sp = 0x0042;
        regs.flags.z = true;
        regs.reset();
        assert_eq!(regs, Registers::new());
    }

    #[test]
    fn test_flag_letters() {
        let flags = Flags { z: true, n: false, v: true, c: false };
        assert_eq!(flags.to_letters(), "Z-V-");
        assert_eq!(Flags::default().to_letters(), "----");
    }
}
