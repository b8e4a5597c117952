//! Memory image file format for MU1 programs.
//!
//! A memory image is a simple text format:
//! - One cell per line: `AAA: WWWW` (12-bit address, 16-bit word, hex)
//! - Anything after `;` is a comment
//! - Blank lines are ignored
//! - Cells not listed are zero

use crate::cpu::{Memory, MemoryError, Word};
use crate::cpu::memory::ADDRESS_MASK;
use std::path::Path;
use thiserror::Error;

/// A sparse memory image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryImage {
    /// `(address, word)` cells, in the order they were produced.
    pub cells: Vec<(Word, Word)>,
    /// Source text for each cell (for listings).
    pub source_lines: Vec<String>,
}

impl MemoryImage {
    /// Create a new empty image.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a cell.
    pub fn push(&mut self, addr: Word, word: Word, source: &str) {
        self.cells.push((addr, word));
        self.source_lines.push(source.to_string());
    }

    /// Get the number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The word stored at `addr`, if the image sets it. Later cells win.
    pub fn word_at(&self, addr: Word) -> Option<Word> {
        self.cells.iter().rev().find(|(a, _)| *a == addr).map(|&(_, w)| w)
    }

    /// Write every cell into memory.
    pub fn load_into(&self, mem: &mut Memory) -> Result<(), MemoryError> {
        for &(addr, word) in &self.cells {
            mem.write(addr, word)?;
        }
        Ok(())
    }
}

/// Parse image text.
pub fn parse_image(text: &str) -> Result<MemoryImage, ImageError> {
    let mut image = MemoryImage::new();

    for (line_num, line) in text.lines().enumerate() {
        let line_num = line_num + 1;
        let (content, comment) = match line.find(';') {
            Some(idx) => (line[..idx].trim(), line[idx + 1..].trim()),
            None => (line.trim(), ""),
        };
        if content.is_empty() {
            continue;
        }

        let (addr_text, word_text) = content.split_once(':').ok_or_else(|| ImageError::ParseError {
            line: line_num,
            message: "expected `ADDR: WORD`".into(),
        })?;

        let addr = parse_hex(addr_text.trim(), line_num)?;
        if addr > ADDRESS_MASK {
            return Err(ImageError::ParseError {
                line: line_num,
                message: format!("address {:X} outside 000-FFF", addr),
            });
        }
        let word = parse_hex(word_text.trim(), line_num)?;

        image.push(addr, word, comment);
    }

    Ok(image)
}

fn parse_hex(text: &str, line: usize) -> Result<Word, ImageError> {
    let digits = text.trim_start_matches("0x").trim_start_matches("0X");
    Word::from_str_radix(digits, 16).map_err(|e| ImageError::ParseError {
        line,
        message: format!("invalid hex value `{}`: {}", text, e),
    })
}

/// Render an image as text.
pub fn format_image(image: &MemoryImage) -> String {
    let mut output = String::new();
    output.push_str("; MU1 memory image\n");
    output.push_str(&format!("; {} cells\n\n", image.len()));

    for (i, &(addr, word)) in image.cells.iter().enumerate() {
        let source = image.source_lines.get(i).map(String::as_str).unwrap_or("");
        if source.is_empty() {
            output.push_str(&format!("{:03X}: {:04X}\n", addr, word));
        } else {
            output.push_str(&format!("{:03X}: {:04X} ; {}\n", addr, word, source));
        }
    }

    output
}

/// Load an image file from disk.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<MemoryImage, ImageError> {
    let text = std::fs::read_to_string(path.as_ref())
        .map_err(|e| ImageError::IoError(e.to_string()))?;
    parse_image(&text)
}

/// Save an image file to disk.
pub fn save_image<P: AsRef<Path>>(path: P, image: &MemoryImage) -> Result<(), ImageError> {
    std::fs::write(path.as_ref(), format_image(image))
        .map_err(|e| ImageError::IoError(e.to_string()))
}

/// Errors that can occur during image operations.
#[derive(Debug, Clone, Error)]
pub enum ImageError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("parse error on line {line}: {message}")]
    ParseError { line: usize, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_image() {
        let text = "\
; sample
000: C0FF ; LDR 0x0FF

0FF: 0010
0x010: 0x002A
";
        let image = parse_image(text).unwrap();
        assert_eq!(image.cells, vec![(0x000, 0xC0FF), (0x0FF, 0x0010), (0x010, 0x002A)]);
        assert_eq!(image.source_lines[0], "LDR 0x0FF");
    }

    #[test]
    fn test_parse_rejects_bad_lines() {
        assert!(matches!(parse_image("000 C0FF"), Err(ImageError::ParseError { line: 1, .. })));
        assert!(matches!(parse_image("\n1000: 0001"), Err(ImageError::ParseError { line: 2, .. })));
        assert!(matches!(parse_image("000: XYZ"), Err(ImageError::ParseError { .. })));
        assert!(matches!(parse_image("000: 10000"), Err(ImageError::ParseError { .. })));
    }

    #[test]
    fn test_format_then_parse() {
        let mut image = MemoryImage::new();
        image.push(0x000, 0x7000, "STP");
        image.push(0xFFF, 0x1234, "");

        let text = format_image(&image);
        assert!(text.contains("000: 7000 ; STP"));
        assert!(text.contains("FFF: 1234\n"));
        assert_eq!(parse_image(&text).unwrap().cells, image.cells);
    }

    #[test]
    fn test_load_into_memory() {
        let mut image = MemoryImage::new();
        image.push(0x010, 5, "");
        image.push(0x010, 6, "");
        let mut mem = Memory::new();
        image.load_into(&mut mem).unwrap();
        assert_eq!(mem.read(0x010).unwrap(), 6);
        assert_eq!(image.word_at(0x010), Some(6));
        assert_eq!(image.word_at(0x011), None);
    }
}
