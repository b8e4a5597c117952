//! Text rendering of micro-steps and machine state.
//!
//! The engine only reports [`Event`]s; this module turns them into the
//! human-readable trace printed by the CLI.

use crate::cpu::{Cpu, CpuError, Phase, Word};
use crate::cpu::event::{Access, AddressSource, Event, Step};
use std::fmt::Write;

/// Which phases get printed. Execute phases are always shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TraceOptions {
    pub fetch: bool,
    pub decode: bool,
}

impl TraceOptions {
    /// Show every phase.
    pub fn all() -> Self {
        Self { fetch: true, decode: true }
    }

    pub fn shows(&self, phase: Phase) -> bool {
        match phase {
            Phase::Fetch0 | Phase::Fetch1 => self.fetch,
            Phase::Decode => self.decode,
            _ => true,
        }
    }
}

/// One-line register dump.
pub fn format_state(cpu: &Cpu) -> String {
    let regs = &cpu.regs;
    format!(
        "PC: {:04X}, IR: {:04X}, ACC: {:04X}, SP: {:04X}, Phase: {}, Z: {}, N: {}, V: {}, C: {}",
        regs.pc, regs.ir, regs.acc, regs.sp, cpu.phase,
        regs.flags.z as u8, regs.flags.n as u8, regs.flags.v as u8, regs.flags.c as u8,
    )
}

/// A word as unsigned and two's-complement signed.
pub fn format_word(word: Word) -> String {
    format!("{} (signed: {})", word, word as i16)
}

fn register_name(source: AddressSource) -> &'static str {
    match source {
        AddressSource::Pc => "PC",
        AddressSource::Sp => "SP",
    }
}

/// Describe a single event.
pub fn format_event(event: &Event) -> String {
    match event {
        Event::AddressBus { addr } => format!("PC={:04X} -> address bus, MemReq=1, RnW=1", addr),
        Event::Fetched { addr, word, next_pc } => {
            format!("IR := memory[{:04X}] = {:04X}, PC := {:04X}", addr, word, next_pc)
        }
        Event::Decoded { opcode, operand } => {
            format!("IR={:04X} -> opcode={:X} ({}), operand={:03X}", operand, opcode.code(), opcode, operand & 0x0FFF)
        }
        Event::MemoryRead { addr, value } => format!("DIN := memory[{:03X}] = {:04X}", addr, value),
        Event::MemoryWrite { addr, value } => format!("memory[{:03X}] := {:04X}", addr, value),
        Event::InvalidAddress { addr, access } => {
            let what = match access {
                Access::Read => "read",
                Access::Write => "write",
            };
            format!("invalid memory address {:04X} ({} ignored)", addr, what)
        }
        Event::AddressWrapped { source, value } => {
            format!("{}={:04X} outside 000-FFF, using {:03X}", register_name(*source), value, value & 0x0FFF)
        }
        Event::Branch { target, taken: true } => format!("PC := {:03X}", target),
        Event::Branch { target, taken: false } => format!("condition not met, no jump to {:03X}", target),
        Event::Push { addr, value, sp } => format!("memory[{:03X}] := {:04X}, SP := {:04X}", addr, value, sp),
        Event::Pop { addr, value, sp } => format!("SP := {:04X}, value = memory[{:03X}] = {:04X}", sp, addr, value),
        Event::RegisterMove { register, value } => format!("{} := ACC = {:04X}", register_name(*register), value),
        Event::Halted => "halted".to_string(),
    }
}

/// Render a step as `[PHASE] event` lines.
pub fn format_step(step: &Step) -> String {
    if step.events.is_empty() {
        return format!("[{}]", step.phase);
    }
    step.events
        .iter()
        .map(|event| format!("[{}] {}", step.phase, format_event(event)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Steps a CPU and renders the phases selected by [`TraceOptions`].
#[derive(Debug, Default)]
pub struct Tracer {
    pub options: TraceOptions,
    skipped: u64,
}

impl Tracer {
    pub fn new(options: TraceOptions) -> Self {
        Self { options, skipped: 0 }
    }

    /// Execute one micro-step. Returns the rendered block when the phase
    /// is shown, `None` when it was skipped.
    pub fn step(&mut self, cpu: &mut Cpu) -> Result<Option<String>, CpuError> {
        let index = cpu.steps;
        let shown = self.options.shows(cpu.phase);
        let before = if shown { format_state(cpu) } else { String::new() };

        let step = cpu.step()?;

        // Diagnostics are never hidden.
        if !shown && !step.has_diagnostics() {
            self.skipped += 1;
            return Ok(None);
        }

        let mut out = String::new();
        if self.skipped > 0 {
            let _ = writeln!(out, "({} micro-steps skipped)", self.skipped);
            self.skipped = 0;
        }
        let _ = writeln!(out, "=== micro-step {} ===", index);
        if shown {
            let _ = writeln!(out, "before: {}", before);
        }
        let _ = writeln!(out, "{}", format_step(&step));
        let _ = write!(out, "after:  {}", format_state(cpu));
        Ok(Some(out))
    }

    /// Micro-steps skipped since the last rendered block.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::{encode, encode_no_address, Opcode};

    #[test]
    fn test_format_state() {
        let cpu = Cpu::new();
        assert_eq!(
            format_state(&cpu),
            "PC: 0000, IR: 0000, ACC: 0000, SP: 00FF, Phase: FETCH_0, Z: 0, N: 0, V: 0, C: 0"
        );
    }

    #[test]
    fn test_format_word() {
        assert_eq!(format_word(65), "65 (signed: 65)");
        assert_eq!(format_word(0xFFFF), "65535 (signed: -1)");
    }

    #[test]
    fn test_options_filter_phases() {
        let quiet = TraceOptions::default();
        assert!(!quiet.shows(Phase::Fetch0));
        assert!(!quiet.shows(Phase::Decode));
        assert!(quiet.shows(Phase::Lda0));
        assert!(TraceOptions::all().shows(Phase::Fetch1));
    }

    #[test]
    fn test_format_step() {
        let step = Step {
            phase: Phase::Jne0,
            next: Some(Phase::Fetch0),
            events: vec![Event::Branch { target: 0, taken: false }],
        };
        assert_eq!(format_step(&step), "[JNE_0] condition not met, no jump to 000");
    }

    #[test]
    fn test_tracer_skips_fetch_and_decode() {
        let mut cpu = Cpu::new();
        cpu.load_program(0, &[encode(Opcode::Lda, 0x010), encode_no_address(Opcode::Stp)]).unwrap();
        let mut tracer = Tracer::new(TraceOptions::default());

        for _ in 0..3 {
            assert_eq!(tracer.step(&mut cpu).unwrap(), None);
        }
        assert_eq!(tracer.skipped(), 3);

        let block = tracer.step(&mut cpu).unwrap().unwrap();
        assert!(block.starts_with("(3 micro-steps skipped)"));
        assert!(block.contains("=== micro-step 3 ==="));
        assert!(block.contains("[LDA_0] DIN := memory[010] = 0000"));
        assert_eq!(tracer.skipped(), 0);
    }

    #[test]
    fn test_tracer_shows_diagnostics_from_hidden_phases() {
        let mut cpu = Cpu::new();
        cpu.regs.pc = 0x2000;
        let mut tracer = Tracer::new(TraceOptions::default());

        assert_eq!(tracer.step(&mut cpu).unwrap(), None);
        let block = tracer.step(&mut cpu).unwrap().unwrap();
        assert!(block.contains("PC=2000 outside 000-FFF"));
    }
}
