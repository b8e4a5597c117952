//! TUI debugger for the MU1 simulator.
//!
//! Provides an interactive terminal-based debugger with:
//! - Register, flag and phase view
//! - Hex memory view with PC/SP markers
//! - Micro-step/instruction/run/breakpoint controls
//! - Disassembly view

mod app;
mod ui;

pub use app::{DebuggerApp, run_debugger};
