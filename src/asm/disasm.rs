//! Disassembler for MU1 programs.
//!
//! Converts machine words back to readable assembly.

use crate::cpu::{Memory, Word};
use crate::cpu::decode::{decode, Instruction};
use crate::asm::image::MemoryImage;

/// Disassemble a single word to text.
///
/// Every 16-bit word decodes to some instruction, so data cells show up
/// as instructions too.
pub fn disassemble_word(word: Word) -> String {
    match decode(word) {
        Ok(instr) => format_instruction(&instr),
        Err(_) => format!("??? ; {:04X}", word),
    }
}

/// Disassemble every cell of an image.
pub fn disassemble(image: &MemoryImage) -> String {
    let mut output = String::new();
    output.push_str("; MU1 Disassembly\n");
    output.push_str("; ---------------\n\n");

    for &(addr, word) in &image.cells {
        let line = disassemble_word(word);
        output.push_str(&format!("{:03X}: {:<14} ; {:04X}\n", addr, line, word));
    }

    output
}

/// Disassemble `count` cells of memory starting at `start`.
pub fn disassemble_range(mem: &Memory, start: usize, count: usize) -> Vec<(usize, String)> {
    mem.dump(start, count)
        .into_iter()
        .map(|(addr, word)| (addr, disassemble_word(word)))
        .collect()
}

/// Format a decoded instruction as assembly text.
fn format_instruction(instr: &Instruction) -> String {
    if instr.opcode.takes_address() {
        format!("{} 0x{:03X}", instr.opcode, instr.address)
    } else if instr.address == 0 {
        instr.opcode.mnemonic().to_string()
    } else {
        // Address bits set on an instruction that ignores them.
        format!("{} ; addr {:03X}", instr.opcode, instr.address)
    }
}
