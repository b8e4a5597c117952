//! # MU1 Simulator
//!
//! A micro-step simulator of the MU1, a minimal 16-bit accumulator machine
//! with a 12-bit address space.
//!
//! The core is [`Cpu::step`], which advances the machine by exactly one
//! phase of the fetch-decode-execute cycle. Everything else (assembler,
//! trace rendering, CLI, debugger) is built on top of that call.

pub mod cpu;
pub mod asm;
pub mod programs;
pub mod trace;

#[cfg(feature = "tui")]
pub mod tui;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use cpu::{Cpu, CpuState, CpuError, Memory, Registers, Flags, Opcode, Phase, Event, Step, Word};
pub use asm::{assemble, disassemble, AssemblerError, MemoryImage, load_image, save_image};
pub use trace::{TraceOptions, Tracer};

#[cfg(feature = "tui")]
pub use tui::run_debugger;
