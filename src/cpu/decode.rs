//! Instruction encoding for the MU1.
//!
//! An instruction word is a 4-bit opcode (bits 15-12) followed by a
//! 12-bit operand address (bits 11-0).

use crate::cpu::memory::ADDRESS_MASK;
use crate::cpu::registers::Word;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// The sixteen MU1 opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    /// ACC := [addr]
    Lda = 0x0,
    /// [addr] := ACC
    Sto = 0x1,
    /// ACC := ACC + [addr]
    Add = 0x2,
    /// ACC := ACC - [addr]
    Sub = 0x3,
    /// PC := addr
    Jmp = 0x4,
    /// PC := addr if N is clear
    Jge = 0x5,
    /// PC := addr if Z is clear
    Jne = 0x6,
    /// Stop
    Stp = 0x7,
    /// Push PC, then PC := addr
    Cll = 0x8,
    /// PC := pop
    Ret = 0x9,
    /// Push ACC
    Psh = 0xA,
    /// ACC := pop
    Pop = 0xB,
    /// ACC := [[addr]]
    Ldr = 0xC,
    /// [[addr]] := ACC
    Str = 0xD,
    /// PC := ACC
    MovPc = 0xE,
    /// SP := ACC
    MovSp = 0xF,
}

impl Opcode {
    /// All opcodes in numeric order.
    pub const ALL: [Opcode; 16] = [
        Opcode::Lda, Opcode::Sto, Opcode::Add, Opcode::Sub,
        Opcode::Jmp, Opcode::Jge, Opcode::Jne, Opcode::Stp,
        Opcode::Cll, Opcode::Ret, Opcode::Psh, Opcode::Pop,
        Opcode::Ldr, Opcode::Str, Opcode::MovPc, Opcode::MovSp,
    ];

    /// Look up an opcode by its 4-bit code.
    pub fn from_nibble(code: u8) -> Result<Self, DecodeError> {
        Self::ALL
            .get(code as usize)
            .copied()
            .ok_or(DecodeError::InvalidOpcode(code))
    }

    /// The 4-bit code.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Assembly mnemonic.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Lda => "LDA",
            Opcode::Sto => "STO",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Jmp => "JMP",
            Opcode::Jge => "JGE",
            Opcode::Jne => "JNE",
            Opcode::Stp => "STP",
            Opcode::Cll => "CLL",
            Opcode::Ret => "RET",
            Opcode::Psh => "PSH",
            Opcode::Pop => "POP",
            Opcode::Ldr => "LDR",
            Opcode::Str => "STR",
            Opcode::MovPc => "MOV_PC",
            Opcode::MovSp => "MOV_SP",
        }
    }

    /// Parse a mnemonic (case-insensitive).
    pub fn from_mnemonic(text: &str) -> Option<Self> {
        let upper = text.to_uppercase();
        match upper.as_str() {
            "MOVPC" => return Some(Opcode::MovPc),
            "MOVSP" => return Some(Opcode::MovSp),
            _ => {}
        }
        Self::ALL.into_iter().find(|op| op.mnemonic() == upper)
    }

    /// Whether the instruction uses its address field.
    pub fn takes_address(self) -> bool {
        !matches!(
            self,
            Opcode::Stp | Opcode::Ret | Opcode::Psh | Opcode::Pop | Opcode::MovPc | Opcode::MovSp
        )
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// A decoded instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: Opcode,
    pub address: Word,
}

impl Instruction {
    pub fn new(opcode: Opcode, address: Word) -> Self {
        Self { opcode, address: address & ADDRESS_MASK }
    }

    /// Encode back to a machine word.
    pub fn encode(self) -> Word {
        encode(self.opcode, self.address)
    }
}

/// `(opcode << 12) | (address & 0x0FFF)`
pub fn encode(opcode: Opcode, address: Word) -> Word {
    encode_no_address(opcode) | (address & ADDRESS_MASK)
}

/// `opcode << 12`, address field zero.
pub fn encode_no_address(opcode: Opcode) -> Word {
    (opcode.code() as Word) << 12
}

/// The low 12 bits of an instruction word.
pub fn decode_address(word: Word) -> Word {
    word & ADDRESS_MASK
}

/// The opcode field (bits 15-12) of an instruction word.
pub fn decode_opcode(word: Word) -> Result<Opcode, DecodeError> {
    Opcode::from_nibble((word >> 12) as u8)
}

/// Decode a whole instruction word.
pub fn decode(word: Word) -> Result<Instruction, DecodeError> {
    Ok(Instruction::new(decode_opcode(word)?, decode_address(word)))
}

/// Errors that can occur during instruction decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid opcode: {0:X}")]
    InvalidOpcode(u8),
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_encode_layout() {
        assert_eq!(encode(Opcode::Ldr, 0xFFF), 0xCFFF);
        assert_eq!(encode(Opcode::Jne, 0x000), 0x6000);
        assert_eq!(encode(Opcode::Add, 0x1ABC), 0x2ABC);
        assert_eq!(encode_no_address(Opcode::Stp), 0x7000);
        assert_eq!(encode_no_address(Opcode::MovSp), 0xF000);
    }

    #[test]
    fn test_every_nibble_decodes() {
        for code in 0u8..16 {
            let op = Opcode::from_nibble(code).unwrap();
            assert_eq!(op.code(), code);
        }
        assert_eq!(Opcode::from_nibble(16), Err(DecodeError::InvalidOpcode(16)));
    }

    #[test]
    fn test_mnemonics() {
        for op in Opcode::ALL {
            assert_eq!(Opcode::from_mnemonic(op.mnemonic()), Some(op));
        }
        assert_eq!(Opcode::from_mnemonic("lda"), Some(Opcode::Lda));
        assert_eq!(Opcode::from_mnemonic("movpc"), Some(Opcode::MovPc));
        assert_eq!(Opcode::from_mnemonic("NOP"), None);
    }

    #[test]
    fn test_takes_address() {
        assert!(Opcode::Lda.takes_address());
        assert!(Opcode::Cll.takes_address());
        assert!(!Opcode::Stp.takes_address());
        assert!(!Opcode::MovSp.takes_address());
    }

    #[test]
    fn test_decode_word() {
        let instr = decode(0xD123).unwrap();
        assert_eq!(instr, Instruction::new(Opcode::Str, 0x123));
        assert_eq!(instr.encode(), 0xD123);
    }

    proptest! {
        #[test]
        fn prop_address_survives_encoding(op in 0u8..16, addr in 0u16..=0x0FFF) {
            let opcode = Opcode::from_nibble(op).unwrap();
            let word = encode(opcode, addr);
            prop_assert_eq!(decode_address(word), addr);
            prop_assert_eq!(decode_opcode(word).unwrap(), opcode);
        }
    }
}
