//! CPU execution engine for the MU1.
//!
//! Each call to [`Cpu::step`] performs exactly one micro-step: the work of
//! the current [`Phase`], followed by the transition to the next one.

use crate::cpu::{alu, Memory, Registers};
use crate::cpu::decode::{self, DecodeError};
use crate::cpu::event::{Access, AddressSource, Event, Step};
use crate::cpu::memory::{MemoryError, ADDRESS_MASK, MEMORY_SIZE};
use crate::cpu::phase::Phase;
use crate::cpu::registers::Word;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// CPU is running normally.
    Running,
    /// CPU has halted (executed STP).
    Halted,
    /// CPU stopped on a fatal decode error.
    Error,
}

/// The MU1 CPU: registers, memory and the micro-step state machine.
#[derive(Clone, Serialize, Deserialize)]
pub struct Cpu {
    /// CPU registers and flags.
    pub regs: Registers,
    /// Main memory.
    pub mem: Memory,
    /// Phase the next call to `step` will execute.
    pub phase: Phase,
    /// Current execution state.
    pub state: CpuState,
    /// Micro-steps executed.
    pub steps: u64,
    /// Execute phases completed (instructions retired).
    pub instructions: u64,
}

/// Register and phase state without memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub regs: Registers,
    pub phase: Phase,
    pub state: CpuState,
    pub steps: u64,
    pub instructions: u64,
}

impl Cpu {
    /// Create a CPU at the reset vector with zeroed memory.
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            mem: Memory::new(),
            phase: Phase::Fetch0,
            state: CpuState::Running,
            steps: 0,
            instructions: 0,
        }
    }

    /// Reset the CPU to initial state, clearing memory.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.mem.clear();
        self.phase = Phase::Fetch0;
        self.state = CpuState::Running;
        self.steps = 0;
        self.instructions = 0;
    }

    /// Load consecutive words into memory starting at `start_addr`.
    pub fn load_program(&mut self, start_addr: Word, program: &[Word]) -> Result<(), MemoryError> {
        self.mem.load_program(start_addr, program)
    }

    // ==================== State accessors ====================

    /// `DIN := [addr]`. Addresses above 0xFFF leave `DIN = 0`.
    pub fn address_lookup(&mut self, addr: Word) -> Result<Word, MemoryError> {
        match self.mem.read(addr) {
            Ok(value) => {
                self.regs.din = value;
                Ok(value)
            }
            Err(e) => {
                self.regs.din = 0;
                Err(e)
            }
        }
    }

    /// `[addr] := value`. Addresses above 0xFFF are not written.
    pub fn set_address(&mut self, addr: Word, value: Word) -> Result<(), MemoryError> {
        self.mem.write(addr, value)
    }

    /// `[SP] := value`, then `SP := SP - 1`.
    ///
    /// SP itself is never masked. The cell written is `SP & 0xFFF`.
    pub fn push(&mut self, value: Word) {
        self.mem.write_wrapping(self.regs.sp, value);
        self.regs.sp = self.regs.sp.wrapping_sub(1);
    }

    /// `SP := SP + 1`, then return `[SP]`.
    pub fn pop(&mut self) -> Word {
        self.regs.sp = self.regs.sp.wrapping_add(1);
        self.mem.read_wrapping(self.regs.sp)
    }

    // ==================== Execution ====================

    /// Execute a single micro-step.
    ///
    /// Returns the record of the phase that ran. A halted CPU is left
    /// untouched and reported as [`CpuError::NotRunning`].
    pub fn step(&mut self) -> Result<Step, CpuError> {
        if self.state != CpuState::Running {
            return Err(CpuError::NotRunning(self.state));
        }

        let phase = self.phase;
        tracing::trace!(
            step = self.steps,
            %phase,
            pc = format_args!("{:04X}", self.regs.pc),
            acc = format_args!("{:04X}", self.regs.acc),
            "micro-step"
        );

        let mut events = Vec::new();
        let next = match self.execute(phase, &mut events) {
            Ok(next) => next,
            Err(e) => {
                tracing::error!(%phase, ir = format_args!("{:04X}", self.regs.ir), "{}", e);
                self.state = CpuState::Error;
                return Err(e);
            }
        };

        self.steps += 1;
        if phase.is_execute() {
            self.instructions += 1;
        }

        match next {
            Some(next_phase) => self.phase = next_phase,
            None => {
                self.state = CpuState::Halted;
                events.push(Event::Halted);
            }
        }

        Ok(Step { phase, next, events })
    }

    /// Step until the current instruction has finished its execute phase.
    ///
    /// Starting mid-instruction finishes that instruction.
    pub fn step_instruction(&mut self) -> Result<Vec<Step>, CpuError> {
        let mut steps = Vec::new();
        loop {
            let step = self.step()?;
            let done = step.phase.is_execute();
            steps.push(step);
            if done || !self.is_running() {
                return Ok(steps);
            }
        }
    }

    /// Run until halt or error.
    ///
    /// Returns the number of micro-steps executed. A program that never
    /// stops makes this loop forever; use [`Cpu::run_limited`] for that.
    pub fn run(&mut self) -> Result<u64, CpuError> {
        let start_steps = self.steps;

        while self.state == CpuState::Running {
            self.step()?;
        }

        Ok(self.steps - start_steps)
    }

    /// Run for at most `max_steps` micro-steps.
    pub fn run_limited(&mut self, max_steps: u64) -> Result<u64, CpuError> {
        let start_steps = self.steps;
        let limit = self.steps.saturating_add(max_steps);

        while self.state == CpuState::Running && self.steps < limit {
            self.step()?;
        }

        Ok(self.steps - start_steps)
    }

    /// Perform one phase's work and return the phase that follows it.
    fn execute(&mut self, phase: Phase, events: &mut Vec<Event>) -> Result<Option<Phase>, CpuError> {
        let next = match phase {
            // ==================== Fetch / Decode ====================

            Phase::Fetch0 => {
                events.push(Event::AddressBus { addr: self.regs.pc });
                Phase::Fetch1
            }

            Phase::Fetch1 => {
                let addr = self.regs.pc;
                if addr as usize >= MEMORY_SIZE {
                    self.report_wrap(AddressSource::Pc, addr, events);
                }
                let word = self.mem.read_wrapping(addr);
                self.regs.ir = word;
                self.regs.advance_pc();
                events.push(Event::Fetched { addr, word, next_pc: self.regs.pc });
                Phase::Decode
            }

            Phase::Decode => {
                let word = self.regs.ir;
                let opcode = decode::decode_opcode(word)?;
                self.regs.operand = word;
                tracing::debug!(
                    ir = format_args!("{:04X}", word),
                    %opcode,
                    operand = format_args!("{:03X}", word & ADDRESS_MASK),
                    "decode"
                );
                events.push(Event::Decoded { opcode, operand: word });
                Phase::execute_for(opcode)
            }

            // ==================== Memory / ALU ====================

            Phase::Lda0 => {
                let value = self.read_checked(self.operand_address(), events);
                alu::load(&mut self.regs, value);
                Phase::Fetch0
            }

            Phase::Sto0 => {
                self.regs.dout = self.regs.acc;
                self.write_checked(self.operand_address(), self.regs.dout, events);
                Phase::Fetch0
            }

            Phase::Add0 => {
                let value = self.read_checked(self.operand_address(), events);
                alu::add(&mut self.regs, value);
                Phase::Fetch0
            }

            Phase::Sub0 => {
                let value = self.read_checked(self.operand_address(), events);
                alu::sub(&mut self.regs, value);
                Phase::Fetch0
            }

            Phase::Ldr0 => {
                let pointer = self.read_checked(self.operand_address(), events);
                let value = self.read_checked(pointer, events);
                alu::load(&mut self.regs, value);
                Phase::Fetch0
            }

            Phase::Str0 => {
                let pointer = self.read_checked(self.operand_address(), events);
                self.write_checked(pointer, self.regs.acc, events);
                Phase::Fetch0
            }

            // ==================== Control Flow ====================

            Phase::Jmp0 => {
                self.branch(true, events);
                Phase::Fetch0
            }

            Phase::Jge0 => {
                self.branch(!self.regs.flags.n, events);
                Phase::Fetch0
            }

            Phase::Jne0 => {
                self.branch(!self.regs.flags.z, events);
                Phase::Fetch0
            }

            Phase::Cll0 => {
                self.push_traced(self.regs.pc, events);
                self.branch(true, events);
                Phase::Fetch0
            }

            Phase::Ret0 => {
                self.regs.pc = self.pop_traced(events);
                Phase::Fetch0
            }

            Phase::Stp0 => return Ok(None),

            // ==================== Stack / Moves ====================

            Phase::Psh0 => {
                self.push_traced(self.regs.acc, events);
                Phase::Fetch0
            }

            Phase::Pop0 => {
                let value = self.pop_traced(events);
                alu::load(&mut self.regs, value);
                Phase::Fetch0
            }

            Phase::MovPc0 => {
                self.regs.pc = self.regs.acc;
                events.push(Event::RegisterMove { register: AddressSource::Pc, value: self.regs.acc });
                Phase::Fetch0
            }

            Phase::MovSp0 => {
                self.regs.sp = self.regs.acc;
                events.push(Event::RegisterMove { register: AddressSource::Sp, value: self.regs.acc });
                Phase::Fetch0
            }
        };

        Ok(Some(next))
    }

    /// The 12-bit address field of the latched operand.
    fn operand_address(&self) -> Word {
        decode::decode_address(self.regs.operand)
    }

    /// `address_lookup` that records its outcome. Returns DIN.
    fn read_checked(&mut self, addr: Word, events: &mut Vec<Event>) -> Word {
        match self.address_lookup(addr) {
            Ok(value) => events.push(Event::MemoryRead { addr, value }),
            Err(e) => {
                tracing::warn!(phase = %self.phase, "{}", e);
                events.push(Event::InvalidAddress { addr, access: Access::Read });
            }
        }
        self.regs.din
    }

    /// `set_address` that records its outcome.
    fn write_checked(&mut self, addr: Word, value: Word, events: &mut Vec<Event>) {
        match self.set_address(addr, value) {
            Ok(()) => events.push(Event::MemoryWrite { addr, value }),
            Err(e) => {
                tracing::warn!(phase = %self.phase, "{}", e);
                events.push(Event::InvalidAddress { addr, access: Access::Write });
            }
        }
    }

    fn branch(&mut self, taken: bool, events: &mut Vec<Event>) {
        let target = self.operand_address();
        if taken {
            self.regs.jump(target);
        }
        events.push(Event::Branch { target, taken });
    }

    fn push_traced(&mut self, value: Word, events: &mut Vec<Event>) {
        let addr = self.regs.sp;
        if addr as usize >= MEMORY_SIZE {
            self.report_wrap(AddressSource::Sp, addr, events);
        }
        self.push(value);
        events.push(Event::Push { addr: addr & ADDRESS_MASK, value, sp: self.regs.sp });
    }

    fn pop_traced(&mut self, events: &mut Vec<Event>) -> Word {
        let value = self.pop();
        let addr = self.regs.sp;
        if addr as usize >= MEMORY_SIZE {
            self.report_wrap(AddressSource::Sp, addr, events);
        }
        events.push(Event::Pop { addr: addr & ADDRESS_MASK, value, sp: addr });
        value
    }

    fn report_wrap(&self, source: AddressSource, value: Word, events: &mut Vec<Event>) {
        tracing::warn!(
            ?source,
            value = format_args!("{:04X}", value),
            "address outside 000-FFF, using low 12 bits"
        );
        events.push(Event::AddressWrapped { source, value });
    }

    // ==================== Inspection ====================

    /// Registers, phase and counters, without memory.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            regs: self.regs.clone(),
            phase: self.phase,
            state: self.state,
            steps: self.steps,
            instructions: self.instructions,
        }
    }

    /// Check if the CPU has stopped, by STP or by a fatal error.
    pub fn is_halted(&self) -> bool {
        self.state != CpuState::Running
    }

    /// Check if the CPU is running.
    pub fn is_running(&self) -> bool {
        self.state == CpuState::Running
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("phase", &self.phase)
            .field("steps", &self.steps)
            .field("regs", &self.regs)
            .finish()
    }
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("CPU not running: {0:?}")]
    NotRunning(CpuState),

    #[error("decode error: {0}")]
    DecodeError(#[from] DecodeError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use crate::cpu::decode::{encode, encode_no_address, Opcode};
    use crate::cpu::registers::Flags;

    fn cpu_with(program: &[Word]) -> Cpu {
        let mut cpu = Cpu::new();
        cpu.load_program(0, program).unwrap();
        cpu
    }

    /// Drive the CPU through one fetch/decode and stop before execute.
    fn step_to_execute(cpu: &mut Cpu) {
        for _ in 0..3 {
            cpu.step().unwrap();
        }
        assert!(cpu.phase.is_execute());
    }

    #[test]
    fn test_reset_vector() {
        let cpu = Cpu::new();
        assert_eq!(cpu.regs.sp, 0x00FF);
        assert_eq!(cpu.regs.pc, 0x0000);
        assert_eq!(cpu.phase, Phase::Fetch0);
        assert!(cpu.is_running());
    }

    #[test]
    fn test_cpu_halt() {
        let mut cpu = cpu_with(&[encode_no_address(Opcode::Stp)]);

        let executed = cpu.run().unwrap();

        assert_eq!(executed, 4);
        assert_eq!(cpu.instructions, 1);
        assert!(cpu.is_halted());
        assert_eq!(cpu.state, CpuState::Halted);
    }

    #[test]
    fn test_one_transition_per_step() {
        let mut cpu = cpu_with(&[encode(Opcode::Lda, 0x010), encode_no_address(Opcode::Stp)]);

        let fetch0 = cpu.step().unwrap();
        assert_eq!(fetch0.phase, Phase::Fetch0);
        assert_eq!(fetch0.next, Some(Phase::Fetch1));
        assert_eq!(cpu.regs.pc, 0);

        let fetch1 = cpu.step().unwrap();
        assert_eq!(fetch1.next, Some(Phase::Decode));
        assert_eq!(cpu.regs.ir, 0x0010);
        assert_eq!(cpu.regs.pc, 1);

        let decode = cpu.step().unwrap();
        assert_eq!(decode.next, Some(Phase::Lda0));
        assert_eq!(cpu.regs.operand, 0x0010);

        let execute = cpu.step().unwrap();
        assert_eq!(execute.next, Some(Phase::Fetch0));
    }

    #[test]
    fn test_decode_dispatch_is_total() {
        for op in Opcode::ALL {
            let mut cpu = cpu_with(&[encode(op, 0x123)]);
            cpu.step().unwrap();
            cpu.step().unwrap();
            let decode = cpu.step().unwrap();
            assert_eq!(decode.phase, Phase::Decode);
            assert_eq!(decode.next, Some(Phase::execute_for(op)));
            assert_ne!(cpu.phase, Phase::Decode);
        }
    }

    #[test]
    fn test_stepping_halted_cpu_is_refused() {
        let mut cpu = cpu_with(&[encode_no_address(Opcode::Stp)]);
        cpu.run().unwrap();
        let before = cpu.snapshot();

        assert_eq!(cpu.step(), Err(CpuError::NotRunning(CpuState::Halted)));
        assert_eq!(cpu.snapshot(), before);
    }

    #[test]
    fn test_load_add_store() {
        let mut cpu = cpu_with(&[
            encode(Opcode::Lda, 0x100),
            encode(Opcode::Add, 0x101),
            encode(Opcode::Sto, 0x102),
            encode_no_address(Opcode::Stp),
        ]);
        cpu.mem.write(0x100, 10).unwrap();
        cpu.mem.write(0x101, 5).unwrap();

        cpu.run().unwrap();

        assert_eq!(cpu.regs.acc, 15);
        assert_eq!(cpu.regs.dout, 15);
        assert_eq!(cpu.mem.read(0x102).unwrap(), 15);
    }

    #[test]
    fn test_sub_sets_zero() {
        let mut cpu = cpu_with(&[
            encode(Opcode::Lda, 0x100),
            encode(Opcode::Sub, 0x100),
            encode_no_address(Opcode::Stp),
        ]);
        cpu.mem.write(0x100, 7).unwrap();
        cpu.run().unwrap();

        assert_eq!(cpu.regs.acc, 0);
        assert!(cpu.regs.flags.z);
    }

    #[test]
    fn test_operand_address_is_masked() {
        let mut cpu = Cpu::new();
        cpu.mem.write(0x234, 99).unwrap();
        cpu.regs.operand = 0xF234;
        cpu.phase = Phase::Lda0;

        cpu.step().unwrap();

        assert_eq!(cpu.regs.acc, 99);
    }

    #[test]
    fn test_jge_follows_sign() {
        let mut cpu = cpu_with(&[encode(Opcode::Jge, 0x050)]);
        step_to_execute(&mut cpu);
        let step = cpu.step().unwrap();
        assert_eq!(cpu.regs.pc, 0x050);
        assert!(step.events.contains(&Event::Branch { target: 0x050, taken: true }));

        let mut cpu = cpu_with(&[encode(Opcode::Jge, 0x050)]);
        cpu.regs.flags.n = true;
        step_to_execute(&mut cpu);
        cpu.step().unwrap();
        assert_eq!(cpu.regs.pc, 0x001);
    }

    #[test]
    fn test_jne_follows_zero() {
        let mut cpu = cpu_with(&[encode(Opcode::Jne, 0x050)]);
        cpu.regs.flags.z = true;
        step_to_execute(&mut cpu);
        let step = cpu.step().unwrap();
        assert_eq!(cpu.regs.pc, 0x001);
        assert!(step.events.contains(&Event::Branch { target: 0x050, taken: false }));
    }

    #[test]
    fn test_call_and_return() {
        let mut cpu = cpu_with(&[
            encode(Opcode::Cll, 0x010),
            encode_no_address(Opcode::Stp),
        ]);
        cpu.mem.load_program(0x010, &[
            encode(Opcode::Lda, 0x100),
            encode_no_address(Opcode::Ret),
        ]).unwrap();
        cpu.mem.write(0x100, 0x0042).unwrap();

        cpu.step_instruction().unwrap();
        assert_eq!(cpu.regs.pc, 0x010);
        assert_eq!(cpu.regs.sp, 0x00FE);
        assert_eq!(cpu.mem.read(0x0FF).unwrap(), 0x0001);

        cpu.run().unwrap();
        assert_eq!(cpu.regs.acc, 0x0042);
        assert_eq!(cpu.regs.sp, 0x00FF);
        assert_eq!(cpu.regs.pc, 0x0002);
        assert!(cpu.is_halted());
    }

    #[test]
    fn test_push_pop_instructions() {
        let mut cpu = cpu_with(&[
            encode(Opcode::Lda, 0x100),
            encode_no_address(Opcode::Psh),
            encode(Opcode::Lda, 0x101),
            encode_no_address(Opcode::Pop),
            encode_no_address(Opcode::Stp),
        ]);
        cpu.mem.write(0x100, 0x8001).unwrap();
        cpu.mem.write(0x101, 0x0000).unwrap();

        cpu.run().unwrap();

        assert_eq!(cpu.regs.acc, 0x8001);
        assert!(cpu.regs.flags.n);
        assert!(!cpu.regs.flags.z);
        assert_eq!(cpu.regs.sp, 0x00FF);
    }

    proptest! {
        #[test]
        fn prop_push_pop_roundtrip(x: u16, sp: u16) {
            let mut cpu = Cpu::new();
            cpu.regs.sp = sp;
            cpu.push(x);
            prop_assert_eq!(cpu.regs.sp, sp.wrapping_sub(1));
            prop_assert_eq!(cpu.pop(), x);
            prop_assert_eq!(cpu.regs.sp, sp);
        }
    }

    #[test]
    fn test_stack_pointer_wraps_without_masking() {
        let mut cpu = Cpu::new();
        cpu.regs.sp = 0x0000;
        cpu.push(0xAAAA);
        assert_eq!(cpu.regs.sp, 0xFFFF);
        assert_eq!(cpu.mem.read(0x000).unwrap(), 0xAAAA);

        cpu.push(0xBBBB);
        assert_eq!(cpu.regs.sp, 0xFFFE);
        assert_eq!(cpu.mem.read(0xFFF).unwrap(), 0xBBBB);

        assert_eq!(cpu.pop(), 0xBBBB);
        assert_eq!(cpu.pop(), 0xAAAA);
        assert_eq!(cpu.regs.sp, 0x0000);
    }

    #[test]
    fn test_push_out_of_range_sp_reports_wrap() {
        let mut cpu = cpu_with(&[encode_no_address(Opcode::Psh)]);
        cpu.regs.sp = 0x1005;
        cpu.regs.acc = 0x1234;
        step_to_execute(&mut cpu);

        let step = cpu.step().unwrap();

        assert!(step.has_diagnostics());
        assert!(step.events.contains(&Event::AddressWrapped { source: AddressSource::Sp, value: 0x1005 }));
        assert_eq!(cpu.mem.read(0x005).unwrap(), 0x1234);
        assert_eq!(cpu.regs.sp, 0x1004);
    }

    #[test]
    fn test_indirect_load_and_store() {
        let mut cpu = cpu_with(&[
            encode(Opcode::Ldr, 0x100),
            encode(Opcode::Str, 0x101),
            encode_no_address(Opcode::Stp),
        ]);
        cpu.mem.write(0x100, 0x200).unwrap();
        cpu.mem.write(0x200, 0x0BEE).unwrap();
        cpu.mem.write(0x101, 0x300).unwrap();

        cpu.run().unwrap();

        assert_eq!(cpu.regs.acc, 0x0BEE);
        assert_eq!(cpu.mem.read(0x300).unwrap(), 0x0BEE);
    }

    #[test]
    fn test_indirect_load_through_invalid_pointer() {
        let mut cpu = cpu_with(&[encode(Opcode::Ldr, 0x100), encode_no_address(Opcode::Stp)]);
        cpu.mem.write(0x100, 0x1234).unwrap();
        cpu.regs.acc = 0x5555;
        step_to_execute(&mut cpu);

        let step = cpu.step().unwrap();

        assert!(step.events.contains(&Event::InvalidAddress { addr: 0x1234, access: Access::Read }));
        assert_eq!(cpu.regs.din, 0);
        assert_eq!(cpu.regs.acc, 0);
        assert!(cpu.regs.flags.z);
        assert!(cpu.is_running());
    }

    #[test]
    fn test_indirect_store_through_invalid_pointer() {
        let mut cpu = cpu_with(&[encode(Opcode::Str, 0x100), encode_no_address(Opcode::Stp)]);
        cpu.mem.write(0x100, 0xF000).unwrap();
        cpu.regs.acc = 0x5555;
        let before = cpu.mem.clone();
        step_to_execute(&mut cpu);

        let step = cpu.step().unwrap();

        assert!(step.events.contains(&Event::InvalidAddress { addr: 0xF000, access: Access::Write }));
        assert_eq!(cpu.mem, before);
        cpu.run().unwrap();
        assert_eq!(cpu.state, CpuState::Halted);
    }

    #[test]
    fn test_bounds_checked_accessors() {
        let mut cpu = Cpu::new();
        cpu.regs.din = 0x7777;
        assert!(cpu.address_lookup(0x1000).is_err());
        assert_eq!(cpu.regs.din, 0);

        assert!(cpu.set_address(0xFFFF, 1).is_err());
        assert_eq!(cpu.mem, Memory::new());

        cpu.set_address(0xFFF, 3).unwrap();
        assert_eq!(cpu.address_lookup(0xFFF).unwrap(), 3);
        assert_eq!(cpu.regs.din, 3);
    }

    #[test]
    fn test_mov_pc_and_mov_sp() {
        let mut cpu = cpu_with(&[
            encode(Opcode::Lda, 0x100),
            encode_no_address(Opcode::MovSp),
            encode(Opcode::Lda, 0x101),
            encode_no_address(Opcode::MovPc),
        ]);
        cpu.mem.write(0x100, 0x0080).unwrap();
        cpu.mem.write(0x101, 0x0200).unwrap();
        cpu.mem.write(0x200, encode_no_address(Opcode::Stp)).unwrap();

        cpu.run().unwrap();

        assert_eq!(cpu.regs.sp, 0x0080);
        assert_eq!(cpu.regs.pc, 0x0201);
        assert!(cpu.is_halted());
    }

    #[test]
    fn test_fetch_beyond_memory_wraps() {
        let mut cpu = Cpu::new();
        cpu.regs.pc = 0x1000;
        cpu.mem.write(0x000, encode_no_address(Opcode::Stp)).unwrap();

        cpu.step().unwrap();
        let fetch = cpu.step().unwrap();

        assert!(fetch.events.contains(&Event::AddressWrapped { source: AddressSource::Pc, value: 0x1000 }));
        assert_eq!(cpu.regs.ir, 0x7000);
        assert_eq!(cpu.regs.pc, 0x1001);
    }

    #[test]
    fn test_run_limited_stops_infinite_loop() {
        let mut cpu = cpu_with(&[encode(Opcode::Jmp, 0x000)]);
        let executed = cpu.run_limited(100).unwrap();
        assert_eq!(executed, 100);
        assert!(cpu.is_running());
        assert_eq!(cpu.instructions, 25);
    }

    #[test]
    fn test_signed_overflow_through_engine() {
        let mut cpu = cpu_with(&[
            encode(Opcode::Lda, 0x100),
            encode(Opcode::Add, 0x101),
            encode_no_address(Opcode::Stp),
        ]);
        cpu.mem.write(0x100, 0x7FFF).unwrap();
        cpu.mem.write(0x101, 0x0001).unwrap();

        cpu.run().unwrap();

        assert_eq!(cpu.regs.acc, 0x8000);
        assert_eq!(cpu.regs.flags, Flags { z: false, n: true, v: true, c: false });
    }

    #[test]
    fn test_halt_event() {
        let mut cpu = cpu_with(&[encode_no_address(Opcode::Stp)]);
        step_to_execute(&mut cpu);
        let step = cpu.step().unwrap();
        assert_eq!(step.phase, Phase::Stp0);
        assert_eq!(step.next, None);
        assert_eq!(step.events, vec![Event::Halted]);
    }

    #[test]
    fn test_snapshot_serializes() {
        let cpu = Cpu::new();
        let json = serde_json::to_string(&cpu.snapshot()).unwrap();
        assert!(json.contains("\"Fetch0\""));
        assert!(json.contains("\"sp\":255"));
    }
}
