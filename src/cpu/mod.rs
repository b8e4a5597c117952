//! CPU emulation for the MU1.
//!
//! This module implements the complete MU1 architecture:
//! - 4096 sixteen-bit memory words (12-bit addresses)
//! - ACC, IR, DIN, DOUT, PC, SP and the Z/N/V/C flags
//! - 16-instruction set, executed one micro-step at a time

pub mod alu;
pub mod memory;
pub mod registers;
pub mod decode;
pub mod phase;
pub mod event;
pub mod execute;

pub use memory::{Memory, MemoryError, MEMORY_SIZE};
pub use registers::{Flags, Registers, Word};
pub use decode::{Instruction, Opcode, DecodeError, encode, encode_no_address, decode_address};
pub use phase::Phase;
pub use event::{Event, Step};
pub use execute::{Cpu, CpuError, CpuState, Snapshot};
