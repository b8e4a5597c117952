//! Micro-step phases of the fetch-decode-execute cycle.

use crate::cpu::decode::Opcode;
use serde::{Serialize, Deserialize};

/// One micro-step state of the engine.
///
/// Every instruction runs `Fetch0 -> Fetch1 -> Decode -> <execute>` and the
/// execute phase returns to `Fetch0`, except `Stp0` which halts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    Fetch0,
    Fetch1,
    Decode,
    Lda0,
    Sto0,
    Add0,
    Sub0,
    Jmp0,
    Jge0,
    Jne0,
    Stp0,
    Cll0,
    Ret0,
    Psh0,
    Pop0,
    Ldr0,
    Str0,
    MovPc0,
    MovSp0,
}

impl Phase {
    /// The execute phase for an opcode. Total over all sixteen opcodes.
    pub fn execute_for(opcode: Opcode) -> Self {
        match opcode {
            Opcode::Lda => Phase::Lda0,
            Opcode::Sto => Phase::Sto0,
            Opcode::Add => Phase::Add0,
            Opcode::Sub => Phase::Sub0,
            Opcode::Jmp => Phase::Jmp0,
            Opcode::Jge => Phase::Jge0,
            Opcode::Jne => Phase::Jne0,
            Opcode::Stp => Phase::Stp0,
            Opcode::Cll => Phase::Cll0,
            Opcode::Ret => Phase::Ret0,
            Opcode::Psh => Phase::Psh0,
            Opcode::Pop => Phase::Pop0,
            Opcode::Ldr => Phase::Ldr0,
            Opcode::Str => Phase::Str0,
            Opcode::MovPc => Phase::MovPc0,
            Opcode::MovSp => Phase::MovSp0,
        }
    }

    /// True for the two fetch phases.
    pub fn is_fetch(self) -> bool {
        matches!(self, Phase::Fetch0 | Phase::Fetch1)
    }

    /// True for the per-opcode execute phases.
    pub fn is_execute(self) -> bool {
        !self.is_fetch() && self != Phase::Decode
    }

    /// Upper-case name, e.g. `FETCH_0` or `MOV_PC_0`.
    pub fn name(self) -> &'static str {
        match self {
            Phase::Fetch0 => "FETCH_0",
            Phase::Fetch1 => "FETCH_1",
            Phase::Decode => "DECODE",
            Phase::Lda0 => "LDA_0",
            Phase::Sto0 => "STO_0",
            Phase::Add0 => "ADD_0",
            Phase::Sub0 => "SUB_0",
            Phase::Jmp0 => "JMP_0",
            Phase::Jge0 => "JGE_0",
            Phase::Jne0 => "JNE_0",
            Phase::Stp0 => "STP_0",
            Phase::Cll0 => "CLL_0",
            Phase::Ret0 => "RET_0",
            Phase::Psh0 => "PSH_0",
            Phase::Pop0 => "POP_0",
            Phase::Ldr0 => "LDR_0",
            Phase::Str0 => "STR_0",
            Phase::MovPc0 => "MOV_PC_0",
            Phase::MovSp0 => "MOV_SP_0",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_execute_phases_are_distinct() {
        let phases: HashSet<Phase> = Opcode::ALL.iter().map(|&op| Phase::execute_for(op)).collect();
        assert_eq!(phases.len(), 16);
        assert!(phases.iter().all(|p| p.is_execute()));
    }

    #[test]
    fn test_phase_names_match_mnemonics() {
        for op in Opcode::ALL {
            let name = Phase::execute_for(op).name();
            assert_eq!(name, format!("{}_0", op.mnemonic()));
        }
    }

    #[test]
    fn test_phase_classes() {
        assert!(Phase::Fetch0.is_fetch());
        assert!(Phase::Fetch1.is_fetch());
        assert!(!Phase::Decode.is_fetch());
        assert!(!Phase::Decode.is_execute());
        assert_eq!(Phase::default(), Phase::Fetch0);
    }
}
