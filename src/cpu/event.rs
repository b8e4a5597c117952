//! Observable side effects of a micro-step.
//!
//! The engine never prints. Each step reports what it did as a list of
//! events, and renderers such as [`crate::trace`] turn them into text.

use crate::cpu::decode::Opcode;
use crate::cpu::phase::Phase;
use crate::cpu::registers::Word;
use serde::{Serialize, Deserialize};

/// Direction of a rejected memory access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Access {
    Read,
    Write,
}

/// Register whose value was folded into the 12-bit address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddressSource {
    Pc,
    Sp,
}

/// Something the engine did during one micro-step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// PC placed on the address bus for an instruction read.
    AddressBus { addr: Word },
    /// Instruction word latched into IR.
    Fetched { addr: Word, word: Word, next_pc: Word },
    /// IR split into opcode and operand.
    Decoded { opcode: Opcode, operand: Word },
    MemoryRead { addr: Word, value: Word },
    MemoryWrite { addr: Word, value: Word },
    /// A bounds-checked access named an address above 0xFFF.
    /// Reads produced 0, writes were dropped.
    InvalidAddress { addr: Word, access: Access },
    /// PC or SP was outside 0x000-0xFFF and only its low 12 bits were used.
    AddressWrapped { source: AddressSource, value: Word },
    /// Conditional or unconditional jump.
    Branch { target: Word, taken: bool },
    Push { addr: Word, value: Word, sp: Word },
    Pop { addr: Word, value: Word, sp: Word },
    /// A register other than ACC was overwritten from ACC.
    RegisterMove { register: AddressSource, value: Word },
    /// The machine stopped.
    Halted,
}

/// The record of one micro-step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Phase that was executed.
    pub phase: Phase,
    /// Phase the machine moved to, `None` once halted.
    pub next: Option<Phase>,
    pub events: Vec<Event>,
}

impl Step {
    /// True if any access in this step was rejected or wrapped.
    pub fn has_diagnostics(&self) -> bool {
        self.events.iter().any(|e| {
            matches!(e, Event::InvalidAddress { .. } | Event::AddressWrapped { .. })
        })
    }
}
