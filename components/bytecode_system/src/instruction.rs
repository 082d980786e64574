//! Bytecode instruction representation
//!
//! Contains instruction structure and source position tracking.

use core_types::SourcePosition;

use crate::opcode::Opcode;

/// A single bytecode instruction with optional source mapping
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// The opcode for this instruction
    pub opcode: Opcode,
    /// Source position of the construct that produced the instruction
    pub source_position: Option<SourcePosition>,
}

impl Instruction {
    /// Create a new instruction without source position
    pub fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            source_position: None,
        }
    }

    /// Create a new instruction with source position
    pub fn with_position(opcode: Opcode, position: SourcePosition) -> Self {
        Self {
            opcode,
            source_position: Some(position),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instruction_with_position() {
        let inst = Instruction::with_position(Opcode::Add, SourcePosition::new(2, 5, 14));
        assert_eq!(inst.source_position.map(|p| p.line), Some(2));
        assert!(Instruction::new(Opcode::Pop).source_position.is_none());
    }
}
