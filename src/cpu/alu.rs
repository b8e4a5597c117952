//! Arithmetic-logic unit.
//!
//! Pure accumulator/flag computations. The ALU knows nothing about phases
//! or memory; the execute phases feed it the word latched in DIN.

use crate::cpu::registers::{Registers, Word};

/// Bit 15, the sign of a two's-complement word.
pub const SIGN_BIT: Word = 0x8000;

/// Sign-bit test.
#[inline]
pub fn is_negative(word: Word) -> bool {
    word & SIGN_BIT != 0
}

/// Two's-complement negation.
#[inline]
pub fn negate(word: Word) -> Word {
    (!word).wrapping_add(1)
}

/// `ACC := ACC + value`, updating all four flags.
///
/// Carry is `result < value` on the wrapped result. This reports every sum
/// that reached 2^16, which is all the MU1 defines C to mean.
pub fn add(regs: &mut Registers, value: Word) {
    let value_negative = is_negative(value);
    let acc_negative = is_negative(regs.acc);

    let result = regs.acc.wrapping_add(value);
    let result_negative = is_negative(result);

    regs.acc = result;
    regs.flags.z = result == 0;
    regs.flags.n = result_negative;
    regs.flags.v = value_negative == acc_negative && result_negative != value_negative;
    regs.flags.c = result < value;
}

/// `ACC := ACC - value`, computed as an add of the negated value.
pub fn sub(regs: &mut Registers, value: Word) {
    add(regs, negate(value));
}

/// `ACC := value`. Only Z and N are recomputed; V and C keep their state.
pub fn load(regs: &mut Registers, value: Word) {
    regs.acc = value;
    regs.flags.z = value == 0;
    regs.flags.n = is_negative(value);
}
