//! Assembler and disassembler for MU1 programs.
//!
//! This module provides:
//! - A simple two-pass assembler (text → memory image)
//! - A disassembler (words → readable text)
//! - The memory image file format

pub mod assembler;
pub mod disasm;
pub mod image;

pub use assembler::{assemble, AssemblerError};
pub use disasm::{disassemble, disassemble_word};
pub use image::{MemoryImage, ImageError, load_image, save_image, parse_image, format_image};
