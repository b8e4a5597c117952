//! Simple assembler for MU1 programs.
//!
//! Syntax:
//! ```text
//! ; Comment
//! LOOP:           ; Define a label
//!     LDR PTR     ; Indirect load through the cell at PTR
//!     ADD TOTAL   ; Add the cell at TOTAL
//!     JNE LOOP    ; Jump to label
//!     STP         ; Stop
//!
//!     ORG 0xFFC   ; Set origin address
//! ONE: DAT 1      ; Define data value
//! PTR: DAT DATA   ; Data may name a label (stores its address)
//! ```

use crate::cpu::{Opcode, Word, encode};
use crate::cpu::memory::ADDRESS_MASK;
use crate::asm::image::MemoryImage;
use std::collections::HashMap;
use thiserror::Error;

/// Assemble source code to a memory image.
pub fn assemble(source: &str) -> Result<MemoryImage, AssemblerError> {
    let mut asm = Assembler::new();
    asm.assemble(source)
}

/// A label use waiting for pass 2.
struct Pending {
    /// Index of the cell in the output image.
    index: usize,
    label: String,
    line: usize,
    /// Instruction to re-encode, or `None` for a `DAT` cell.
    opcode: Option<Opcode>,
}

/// The assembler state.
struct Assembler {
    /// Current address (origin). Wider than a word so running off the end
    /// of memory is detectable.
    current_addr: u32,
    /// Symbol table (label -> address).
    symbols: HashMap<String, Word>,
    pending: Vec<Pending>,
    output: MemoryImage,
}

/// An operand before label resolution.
enum Operand {
    Value(i64),
    Label(String),
}

impl Assembler {
    fn new() -> Self {
        Self {
            current_addr: 0,
            symbols: HashMap::new(),
            pending: Vec::new(),
            output: MemoryImage::new(),
        }
    }

    fn assemble(&mut self, source: &str) -> Result<MemoryImage, AssemblerError> {
        // Pass 1: collect labels and generate code
        for (line_num, line) in source.lines().enumerate() {
            self.process_line(line, line_num + 1)?;
        }

        // Pass 2: resolve forward references
        self.resolve_references()?;

        Ok(std::mem::take(&mut self.output))
    }

    fn process_line(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        let line = match line.find(';') {
            Some(idx) => line[..idx].trim(),
            None => line.trim(),
        };
        if line.is_empty() {
            return Ok(());
        }

        if let Some(colon_idx) = line.find(':') {
            let label = line[..colon_idx].trim().to_uppercase();
            if label.is_empty() || label.contains(char::is_whitespace) {
                return Err(AssemblerError::SyntaxError {
                    line: line_num,
                    message: format!("invalid label `{}`", &line[..colon_idx]),
                });
            }
            if self.symbols.contains_key(&label) {
                return Err(AssemblerError::SyntaxError {
                    line: line_num,
                    message: format!("duplicate label {}", label),
                });
            }
            if self.current_addr > ADDRESS_MASK as u32 {
                return Err(AssemblerError::ValueOutOfRange {
                    line: line_num,
                    value: self.current_addr as i64,
                });
            }
            self.symbols.insert(label, self.current_addr as Word);

            let rest = line[colon_idx + 1..].trim();
            if !rest.is_empty() {
                return self.process_statement(rest, line_num);
            }
            return Ok(());
        }

        self.process_statement(line, line_num)
    }

    fn process_statement(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let mnemonic = parts[0].to_uppercase();
        if parts.len() > 2 {
            return Err(AssemblerError::SyntaxError {
                line: line_num,
                message: format!("unexpected `{}`", parts[2]),
            });
        }
        let operand = parts.get(1).copied();

        match mnemonic.as_str() {
            "ORG" => {
                let text = operand.ok_or_else(|| AssemblerError::SyntaxError {
                    line: line_num,
                    message: "ORG requires address".into(),
                })?;
                match parse_operand(text) {
                    Operand::Value(v) if (0..=ADDRESS_MASK as i64).contains(&v) => {
                        self.current_addr = v as u32;
                    }
                    Operand::Value(v) => {
                        return Err(AssemblerError::ValueOutOfRange { line: line_num, value: v });
                    }
                    Operand::Label(_) => {
                        return Err(AssemblerError::SyntaxError {
                            line: line_num,
                            message: "ORG requires a numeric address".into(),
                        });
                    }
                }
            }

            "DAT" | "DATA" => {
                let text = operand.ok_or_else(|| AssemblerError::SyntaxError {
                    line: line_num,
                    message: "DAT requires value".into(),
                })?;
                let word = match parse_operand(text) {
                    Operand::Value(v) if (i16::MIN as i64..=Word::MAX as i64).contains(&v) => v as Word,
                    Operand::Value(v) => {
                        return Err(AssemblerError::ValueOutOfRange { line: line_num, value: v });
                    }
                    Operand::Label(label) => {
                        self.defer(label, line_num, None);
                        0
                    }
                };
                self.emit(word, line, line_num)?;
            }

            _ => {
                let opcode = Opcode::from_mnemonic(&mnemonic).ok_or_else(|| {
                    AssemblerError::UnknownMnemonic { line: line_num, mnemonic: mnemonic.clone() }
                })?;
                let address = self.parse_address(opcode, operand, line_num)?;
                self.emit(encode(opcode, address), line, line_num)?;
            }
        }

        Ok(())
    }

    fn parse_address(&mut self, opcode: Opcode, operand: Option<&str>, line_num: usize)
        -> Result<Word, AssemblerError>
    {
        match (opcode.takes_address(), operand) {
            (false, None) => Ok(0),
            (false, Some(extra)) => Err(AssemblerError::SyntaxError {
                line: line_num,
                message: format!("{} takes no address, found `{}`", opcode, extra),
            }),
            (true, None) => Err(AssemblerError::SyntaxError {
                line: line_num,
                message: format!("{} requires an address", opcode),
            }),
            (true, Some(text)) => match parse_operand(text) {
                Operand::Value(v) if (0..=ADDRESS_MASK as i64).contains(&v) => Ok(v as Word),
                Operand::Value(v) => Err(AssemblerError::ValueOutOfRange { line: line_num, value: v }),
                Operand::Label(label) => {
                    self.defer(label, line_num, Some(opcode));
                    Ok(0)
                }
            },
        }
    }

    /// Record a label use for the cell about to be emitted.
    fn defer(&mut self, label: String, line: usize, opcode: Option<Opcode>) {
        self.pending.push(Pending { index: self.output.len(), label, line, opcode });
    }

    fn emit(&mut self, word: Word, source: &str, line_num: usize) -> Result<(), AssemblerError> {
        if self.current_addr > ADDRESS_MASK as u32 {
            return Err(AssemblerError::ValueOutOfRange {
                line: line_num,
                value: self.current_addr as i64,
            });
        }
        self.output.push(self.current_addr as Word, word, source);
        self.current_addr += 1;
        Ok(())
    }

    fn resolve_references(&mut self) -> Result<(), AssemblerError> {
        for pending in &self.pending {
            let addr = *self.symbols.get(&pending.label).ok_or_else(|| {
                AssemblerError::UndefinedLabel { line: pending.line, label: pending.label.clone() }
            })?;

            let word = match pending.opcode {
                Some(opcode) => encode(opcode, addr),
                None => addr,
            };
            self.output.cells[pending.index].1 = word;
        }
        Ok(())
    }
}

/// Parse a numeric literal (`42`, `-3`, `0x2A`) or a label name.
fn parse_operand(text: &str) -> Operand {
    let text = text.trim();

    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        if let Ok(value) = i64::from_str_radix(hex, 16) {
            return Operand::Value(value);
        }
    }

    if let Ok(value) = text.parse::<i64>() {
        return Operand::Value(value);
    }

    Operand::Label(text.to_uppercase())
}

/// Errors that can occur during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    #[error("syntax error on line {line}: {message}")]
    SyntaxError { line: usize, message: String },

    #[error("unknown mnemonic on line {line}: {mnemonic}")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("undefined label on line {line}: {label}")]
    UndefinedLabel { line: usize, label: String },

    #[error("value out of range on line {line}: {value}")]
    ValueOutOfRange { line: usize, value: i64 },
}
