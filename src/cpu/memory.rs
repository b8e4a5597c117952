//! MU1 memory subsystem.
//!
//! 4096 sixteen-bit words, addressed 0x000-0xFFF.

use crate::cpu::registers::Word;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// The number of memory words (2^12).
pub const MEMORY_SIZE: usize = 4096;

/// Mask selecting the 12 architecturally valid address bits.
pub const ADDRESS_MASK: Word = 0x0FFF;

/// MU1 memory: 4096 sixteen-bit cells.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    cells: Vec<Word>,
}

impl Memory {
    /// Create a new memory with all cells zeroed.
    pub fn new() -> Self {
        Self {
            cells: vec![0; MEMORY_SIZE],
        }
    }

    /// Read a cell, rejecting addresses outside 0x000-0xFFF.
    #[inline]
    pub fn read(&self, addr: Word) -> Result<Word, MemoryError> {
        self.cells
            .get(addr as usize)
            .copied()
            .ok_or(MemoryError::AddressOutOfRange(addr))
    }

    /// Write a cell, rejecting addresses outside 0x000-0xFFF.
    /// Nothing is written on error.
    #[inline]
    pub fn write(&mut self, addr: Word, value: Word) -> Result<(), MemoryError> {
        let cell = self.cells
            .get_mut(addr as usize)
            .ok_or(MemoryError::AddressOutOfRange(addr))?;
        *cell = value;
        Ok(())
    }

    /// Read a cell, folding the address into 0x000-0xFFF.
    #[inline]
    pub fn read_wrapping(&self, addr: Word) -> Word {
        self.cells[(addr & ADDRESS_MASK) as usize]
    }

    /// Write a cell, folding the address into 0x000-0xFFF.
    #[inline]
    pub fn write_wrapping(&mut self, addr: Word, value: Word) {
        self.cells[(addr & ADDRESS_MASK) as usize] = value;
    }

    /// All cells, in address order.
    pub fn cells(&self) -> &[Word] {
        &self.cells
    }

    /// Clear all memory to zeros.
    pub fn clear(&mut self) {
        self.cells.iter_mut().for_each(|cell| *cell = 0);
    }

    /// Load consecutive words starting at the given address.
    pub fn load_program(&mut self, start_addr: Word, program: &[Word]) -> Result<(), MemoryError> {
        let start = start_addr as usize;
        if start > MEMORY_SIZE || program.len() > MEMORY_SIZE - start {
            return Err(MemoryError::ProgramTooLarge {
                size: program.len(),
                available: MEMORY_SIZE.saturating_sub(start),
            });
        }

        self.cells[start..start + program.len()].copy_from_slice(program);
        Ok(())
    }

    /// Dump memory contents (for debugging).
    pub fn dump(&self, start: usize, count: usize) -> Vec<(usize, Word)> {
        let end = start.saturating_add(count).min(MEMORY_SIZE);
        (start.min(end)..end)
            .map(|i| (i, self.cells[i]))
            .collect()
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let non_zero = self.cells.iter().filter(|&&cell| cell != 0).count();

        f.debug_struct("Memory")
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &MEMORY_SIZE)
            .finish()
    }
}

/// Errors that can occur during memory operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// Address is outside valid memory range.
    #[error("invalid memory address {0:04X} (valid: 000-FFF)")]
    AddressOutOfRange(Word),

    /// Program is too large to fit in memory.
    #[error("program size {size} exceeds available space {available}")]
    ProgramTooLarge { size: usize, available: usize },
}
