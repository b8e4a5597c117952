//! Debugger application state and logic.

use crate::{Cpu, MemoryImage, Phase, Word};
use crate::asm::disasm::disassemble_range;
use crate::cpu::MEMORY_SIZE;
use crate::trace::format_step;
use std::collections::HashSet;

/// Debugger application state.
pub struct DebuggerApp {
    /// The CPU being debugged.
    pub cpu: Cpu,
    /// Original image for reset.
    pub image: MemoryImage,
    /// Breakpoints (instruction addresses).
    pub breakpoints: HashSet<Word>,
    /// Is the debugger running continuously?
    pub running: bool,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    /// Memory view scroll offset.
    pub mem_scroll: usize,
    /// Step count when the current run started.
    run_started_at: u64,
}

impl DebuggerApp {
    /// Create a new debugger with a loaded image.
    pub fn new(image: MemoryImage) -> Self {
        let mut app = Self {
            cpu: Cpu::new(),
            image,
            breakpoints: HashSet::new(),
            running: false,
            should_quit: false,
            status: String::new(),
            mem_scroll: 0,
            run_started_at: 0,
        };
        app.load();
        app.status = "Ready. Press 's' to step, 'i' for one instruction, 'r' to run, 'q' to quit.".into();
        app
    }

    fn load(&mut self) {
        self.cpu = Cpu::new();
        if let Err(e) = self.image.load_into(&mut self.cpu.mem) {
            self.status = format!("Load error: {}", e);
        }
    }

    /// Step one micro-step.
    pub fn step(&mut self) {
        if !self.cpu.is_running() {
            self.status = format!("CPU halted: {:?}", self.cpu.state);
            self.running = false;
            return;
        }

        match self.cpu.step() {
            Ok(step) => {
                self.status = format_step(&step).replace('\n', "  ");
            }
            Err(e) => {
                self.status = format!("Error: {}", e);
                self.running = false;
            }
        }
    }

    /// Step until the current instruction's execute phase has run.
    pub fn step_instruction(&mut self) {
        if !self.cpu.is_running() {
            self.status = format!("CPU halted: {:?}", self.cpu.state);
            return;
        }

        match self.cpu.step_instruction() {
            Ok(steps) => {
                if let Some(last) = steps.last() {
                    self.status = format_step(last).replace('\n', "  ");
                }
            }
            Err(e) => self.status = format!("Error: {}", e),
        }
    }

    /// Run until halt, breakpoint, or error.
    pub fn run(&mut self) {
        self.running = true;
        self.run_started_at = self.cpu.steps;
        self.status = "Running...".into();
    }

    /// Run one iteration of continuous execution.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }

        if !self.cpu.is_running() {
            self.running = false;
            self.status = format!("Halted after {} micro-steps", self.cpu.steps);
            return;
        }

        // Breakpoints fire at instruction boundaries, but not on the step that resumed.
        let pc = self.cpu.regs.pc;
        if self.cpu.phase == Phase::Fetch0
            && self.cpu.steps != self.run_started_at
            && self.breakpoints.contains(&pc)
        {
            self.running = false;
            self.status = format!("Breakpoint at PC={:03X}", pc);
            return;
        }

        self.step();
    }

    /// Toggle breakpoint at current PC.
    pub fn toggle_breakpoint(&mut self) {
        let pc = self.cpu.regs.pc;
        if self.breakpoints.remove(&pc) {
            self.status = format!("Removed breakpoint at PC={:03X}", pc);
        } else {
            self.breakpoints.insert(pc);
            self.status = format!("Set breakpoint at PC={:03X}", pc);
        }
    }

    /// Reset CPU to initial state.
    pub fn reset(&mut self) {
        self.load();
        self.running = false;
        self.status = "Reset. Ready.".into();
    }

    /// Scroll the memory view.
    pub fn scroll_memory(&mut self, delta: isize) {
        let max = MEMORY_SIZE - 1;
        self.mem_scroll = self.mem_scroll.saturating_add_signed(delta).min(max);
    }

    /// Get disassembly around current PC.
    pub fn get_disassembly(&self, lines: usize) -> Vec<(Word, String, bool)> {
        let pc = (self.cpu.regs.pc as usize) % MEMORY_SIZE;
        let start = pc.saturating_sub(lines / 2);

        disassemble_range(&self.cpu.mem, start, lines)
            .into_iter()
            .map(|(addr, text)| (addr as Word, text, addr == pc))
            .collect()
    }
}

/// Run the debugger with an image.
pub fn run_debugger(image: MemoryImage) -> std::io::Result<()> {
    use crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::prelude::*;
    use std::io::stdout;
    use std::time::Duration;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut app = DebuggerApp::new(image);

    loop {
        terminal.draw(|frame| {
            super::ui::draw(frame, &app);
        })?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') => app.should_quit = true,
                        KeyCode::Char('s') => {
                            app.running = false;
                            app.step();
                        }
                        KeyCode::Char('i') => {
                            app.running = false;
                            app.step_instruction();
                        }
                        KeyCode::Char('r') => app.run(),
                        KeyCode::Char('p') => {
                            app.running = false;
                            app.status = "Paused.".into();
                        }
                        KeyCode::Char('b') => app.toggle_breakpoint(),
                        KeyCode::Char('x') => app.reset(),
                        KeyCode::Up => app.scroll_memory(-1),
                        KeyCode::Down => app.scroll_memory(1),
                        KeyCode::PageUp => app.scroll_memory(-16),
                        KeyCode::PageDown => app.scroll_memory(16),
                        _ => {}
                    }
                }
            }
        }

        if app.running {
            app.tick();
        }

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
}
