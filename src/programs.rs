//! Built-in sample programs.

use crate::asm::image::MemoryImage;
use crate::cpu::{encode, encode_no_address, Opcode, Word};

/// Start of the summing loop.
pub const LOOP: Word = 0x000;
/// Cell holding the constant 1.
pub const ONE: Word = 0xFFC;
/// Cell receiving the running total.
pub const TOTAL: Word = 0xFFD;
/// Cell holding the number of values left to add.
pub const COUNT: Word = 0xFFE;
/// Cell holding the address of the next value.
pub const PTR: Word = 0xFFF;

/// First data cell summed by [`sum_loop`].
pub const SUM_DATA: Word = LOOP + 11;
/// Number of data cells summed by [`sum_loop`].
pub const SUM_COUNT: Word = 5;

/// Sum `SUM_COUNT` consecutive cells into `TOTAL`.
///
/// The data cells hold their own addresses (11..=15), so the program
/// leaves 65 in `TOTAL`.
pub fn sum_loop() -> MemoryImage {
    let code = [
        (encode(Opcode::Ldr, PTR), "LDR PTR"),
        (encode(Opcode::Add, TOTAL), "ADD TOTAL"),
        (encode(Opcode::Sto, TOTAL), "STO TOTAL"),
        (encode(Opcode::Lda, PTR), "LDA PTR"),
        (encode(Opcode::Add, ONE), "ADD ONE"),
        (encode(Opcode::Sto, PTR), "STO PTR"),
        (encode(Opcode::Lda, COUNT), "LDA COUNT"),
        (encode(Opcode::Sub, ONE), "SUB ONE"),
        (encode(Opcode::Sto, COUNT), "STO COUNT"),
        (encode(Opcode::Jne, LOOP), "JNE LOOP"),
        (encode_no_address(Opcode::Stp), "STP"),
    ];

    let mut image = MemoryImage::new();
    for (offset, (word, source)) in code.iter().enumerate() {
        image.push(LOOP + offset as Word, *word, source);
    }
    for addr in SUM_DATA..SUM_DATA + SUM_COUNT {
        image.push(addr, addr, "data");
    }
    image.push(ONE, 1, "ONE");
    image.push(TOTAL, 0, "TOTAL");
    image.push(COUNT, SUM_COUNT, "COUNT");
    image.push(PTR, SUM_DATA, "PTR");
    image
}
