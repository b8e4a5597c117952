//! WebAssembly bindings for the MU1 simulator.
//!
//! This module provides JavaScript-friendly wrappers around the core engine.

use wasm_bindgen::prelude::*;
use crate::{Cpu, MemoryImage};
use crate::asm::assembler::assemble;
use crate::asm::disasm::disassemble_word;
use crate::trace::format_step;

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// WebAssembly-friendly CPU wrapper.
#[wasm_bindgen]
pub struct WasmCpu {
    cpu: Cpu,
    image: MemoryImage,
}

#[wasm_bindgen]
impl WasmCpu {
    /// Create a new CPU instance.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            cpu: Cpu::new(),
            image: MemoryImage::new(),
        }
    }

    /// Load a program from assembly source code. Returns the cell count.
    #[wasm_bindgen]
    pub fn load_asm(&mut self, source: &str) -> Result<usize, JsError> {
        let image = assemble(source)
            .map_err(|e| JsError::new(&format!("{}", e)))?;

        let len = image.len();
        self.cpu = Cpu::new();
        image.load_into(&mut self.cpu.mem)
            .map_err(|e| JsError::new(&format!("{}", e)))?;
        self.image = image;

        Ok(len)
    }

    /// Execute one micro-step. Returns the rendered step.
    #[wasm_bindgen]
    pub fn step(&mut self) -> Result<String, JsError> {
        let step = self.cpu.step()
            .map_err(|e| JsError::new(&format!("{}", e)))?;

        Ok(format_step(&step))
    }

    /// Run to the end of the current instruction. Returns the rendered steps.
    #[wasm_bindgen]
    pub fn step_instruction(&mut self) -> Result<String, JsError> {
        let steps = self.cpu.step_instruction()
            .map_err(|e| JsError::new(&format!("{}", e)))?;

        Ok(steps.iter().map(format_step).collect::<Vec<_>>().join("\n"))
    }

    /// Run until halt or max micro-steps. Returns the total step count.
    #[wasm_bindgen]
    pub fn run(&mut self, max_steps: u32) -> u64 {
        let _ = self.cpu.run_limited(max_steps as u64);
        self.cpu.steps
    }

    /// Reset CPU to initial state with the loaded program.
    #[wasm_bindgen]
    pub fn reset(&mut self) {
        self.cpu = Cpu::new();
        let _ = self.image.load_into(&mut self.cpu.mem);
    }

    #[wasm_bindgen]
    pub fn is_running(&self) -> bool {
        self.cpu.is_running()
    }

    #[wasm_bindgen]
    pub fn is_halted(&self) -> bool {
        self.cpu.is_halted()
    }

    #[wasm_bindgen]
    pub fn steps(&self) -> u64 {
        self.cpu.steps
    }

    #[wasm_bindgen]
    pub fn pc(&self) -> u16 {
        self.cpu.regs.pc
    }

    #[wasm_bindgen]
    pub fn sp(&self) -> u16 {
        self.cpu.regs.sp
    }

    #[wasm_bindgen]
    pub fn accumulator(&self) -> u16 {
        self.cpu.regs.acc
    }

    /// Flags as `ZNVC` letters, `-` for clear.
    #[wasm_bindgen]
    pub fn flags(&self) -> String {
        self.cpu.regs.flags.to_letters()
    }

    #[wasm_bindgen]
    pub fn phase(&self) -> String {
        self.cpu.phase.name().to_string()
    }

    #[wasm_bindgen]
    pub fn state(&self) -> String {
        format!("{:?}", self.cpu.state)
    }

    /// Memory word at an address; 0 outside 000-FFF.
    #[wasm_bindgen]
    pub fn memory_at(&self, addr: u16) -> u16 {
        self.cpu.mem.read(addr).unwrap_or(0)
    }

    /// All 4096 memory words.
    #[wasm_bindgen]
    pub fn memory_all(&self) -> js_sys::Uint16Array {
        js_sys::Uint16Array::from(self.cpu.mem.cells())
    }

    /// Registers, phase and counters as a JSON string.
    #[wasm_bindgen]
    pub fn registers_json(&self) -> Result<String, JsError> {
        serde_json::to_string(&self.cpu.snapshot())
            .map_err(|e| JsError::new(&format!("{}", e)))
    }
}

impl Default for WasmCpu {
    fn default() -> Self {
        Self::new()
    }
}

/// Assemble source code and return the cell count.
#[wasm_bindgen]
pub fn wasm_assemble(source: &str) -> Result<usize, JsError> {
    let image = assemble(source)
        .map_err(|e| JsError::new(&format!("{}", e)))?;
    Ok(image.len())
}

/// Disassemble a single 16-bit word.
#[wasm_bindgen]
pub fn wasm_disassemble(word: u16) -> String {
    disassemble_word(word)
}
