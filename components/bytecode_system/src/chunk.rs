//! Bytecode chunk - compiled bytecode container
//!
//! A chunk is the compiled form of one function (or of a whole script):
//! instructions, constants, nested function chunks and the metadata the VM
//! needs to build a call frame.

use std::fmt;
use std::rc::Rc;

use core_types::SourcePosition;

use crate::constant::Constant;
use crate::instruction::Instruction;
use crate::opcode::Opcode;

/// Completion codes stored in a finally block's kind register.
///
/// Codes at or above [`completion::FIRST_JUMP`] identify a pending
/// `break`/`continue` that crossed the finally block.
pub mod completion {
    /// The protected block finished normally
    pub const NORMAL: u32 = 0;
    /// A `return` is pending; the value register holds the return value
    pub const RETURN: u32 = 1;
    /// An exception is pending; the value register holds the thrown value
    pub const THROW: u32 = 2;
    /// First code used for pending jumps
    pub const FIRST_JUMP: u32 = 3;
}

/// What kind of callable a chunk was compiled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    /// Top-level script code
    Script,
    /// `function` declaration or expression
    Normal,
    /// Arrow function (lexical `this`, not constructible)
    Arrow,
    /// Object literal or class method (not constructible)
    Method,
    /// Class constructor (only callable with `new`)
    ClassConstructor {
        /// Whether the class has an `extends` clause
        derived: bool,
    },
}

/// A compiled bytecode chunk containing instructions and constants
#[derive(Debug, Clone, PartialEq)]
pub struct BytecodeChunk {
    /// Function name, if any
    pub name: Option<Rc<str>>,
    /// Kind of callable
    pub kind: FunctionKind,
    /// Whether this is a generator function
    pub is_generator: bool,
    /// Whether the code is strict mode code
    pub strict: bool,
    /// Number of leading registers filled from the call's arguments
    pub param_count: u32,
    /// Value of the function's `length` property
    pub length: u32,
    /// Sequence of bytecode instructions
    pub instructions: Vec<Instruction>,
    /// Constant pool for literal values
    pub constants: Vec<Constant>,
    /// Number of registers needed for execution
    pub register_count: u32,
    /// Number of cells (captured variables owned by this function)
    pub cell_count: u32,
    /// Nested function bytecode chunks (for closures)
    pub nested_functions: Vec<Rc<BytecodeChunk>>,
    /// Name of the source the code was compiled from
    pub source_name: Option<Rc<str>>,
    /// Position of the function in its source
    pub position: Option<SourcePosition>,
}

impl BytecodeChunk {
    /// Create a new empty bytecode chunk for script code
    pub fn new() -> Self {
        Self::with_kind(FunctionKind::Script)
    }

    /// Create a new empty bytecode chunk of the given kind
    pub fn with_kind(kind: FunctionKind) -> Self {
        Self {
            name: None,
            kind,
            is_generator: false,
            strict: false,
            param_count: 0,
            length: 0,
            instructions: Vec::new(),
            constants: Vec::new(),
            register_count: 0,
            cell_count: 0,
            nested_functions: Vec::new(),
            source_name: None,
            position: None,
        }
    }

    /// Get a reference to nested functions
    pub fn nested_functions(&self) -> &[Rc<BytecodeChunk>] {
        &self.nested_functions
    }

    /// Add a nested function and return its index
    pub fn add_nested_function(&mut self, chunk: Rc<BytecodeChunk>) -> usize {
        let idx = self.nested_functions.len();
        self.nested_functions.push(chunk);
        idx
    }

    /// Emit an instruction without source position, returning its index
    pub fn emit(&mut self, opcode: Opcode) -> usize {
        self.instructions.push(Instruction::new(opcode));
        self.instructions.len() - 1
    }

    /// Emit an instruction with source position, returning its index
    pub fn emit_with_position(&mut self, opcode: Opcode, position: SourcePosition) -> usize {
        self.instructions
            .push(Instruction::with_position(opcode, position));
        self.instructions.len() - 1
    }

    /// Point the branch at `index` to `target`.
    ///
    /// Returns false if the instruction does not branch.
    pub fn patch_jump(&mut self, index: usize, target: usize) -> bool {
        self.instructions
            .get_mut(index)
            .map(|inst| inst.opcode.set_jump_target(target))
            .unwrap_or(false)
    }

    /// Add a constant to the constant pool and return its index.
    ///
    /// Identical constants share one pool entry.
    pub fn add_constant(&mut self, value: Constant) -> usize {
        if let Some(idx) = self.constants.iter().position(|c| c.same_entry(&value)) {
            return idx;
        }
        let idx = self.constants.len();
        self.constants.push(value);
        idx
    }

    /// Get the number of instructions
    pub fn instruction_count(&self) -> usize {
        self.instructions.len()
    }

    /// Get the number of constants
    pub fn constant_count(&self) -> usize {
        self.constants.len()
    }

    /// Whether `new` may be applied to functions created from this chunk
    pub fn is_constructor(&self) -> bool {
        match self.kind {
            FunctionKind::Normal => !self.is_generator,
            FunctionKind::ClassConstructor { .. } => true,
            _ => false,
        }
    }

    /// Source position recorded for the instruction at `ip`
    pub fn position_at(&self, ip: usize) -> Option<SourcePosition> {
        self.instructions.get(ip).and_then(|i| i.source_position)
    }
}

impl Default for BytecodeChunk {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BytecodeChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "== {} ({:?}, {} registers, {} cells) ==",
            self.name.as_deref().unwrap_or("<anonymous>"),
            self.kind,
            self.register_count,
            self.cell_count
        )?;
        for (ip, inst) in self.instructions.iter().enumerate() {
            match &inst.opcode {
                Opcode::LoadConstant(idx) => match self.constants.get(*idx) {
                    Some(constant) => writeln!(f, "{:04} LoadConstant({})", ip, constant)?,
                    None => writeln!(f, "{:04} LoadConstant(?{})", ip, idx)?,
                },
                opcode => writeln!(f, "{:04} {:?}", ip, opcode)?,
            }
        }
        for nested in &self.nested_functions {
            write!(f, "{}", nested)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_jump() {
        let mut chunk = BytecodeChunk::new();
        let jump = chunk.emit(Opcode::JumpIfFalse(0));
        chunk.emit(Opcode::LoadTrue);
        assert!(chunk.patch_jump(jump, 2));
        assert_eq!(chunk.instructions[jump].opcode, Opcode::JumpIfFalse(2));
        assert!(!chunk.patch_jump(1, 2));
    }

    #[test]
    fn test_constants_are_deduplicated() {
        let mut chunk = BytecodeChunk::new();
        let a = chunk.add_constant(Constant::String("x".into()));
        let b = chunk.add_constant(Constant::Number(1.0));
        let c = chunk.add_constant(Constant::String("x".into()));
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(chunk.constant_count(), 2);
    }

    #[test]
    fn test_constructor_kinds() {
        let mut chunk = BytecodeChunk::with_kind(FunctionKind::Normal);
        assert!(chunk.is_constructor());
        chunk.is_generator = true;
        assert!(!chunk.is_constructor());
        assert!(!BytecodeChunk::with_kind(FunctionKind::Arrow).is_constructor());
    }
}
