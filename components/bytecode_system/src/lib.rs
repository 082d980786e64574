//! Bytecode system for JavaScript runtime
//!
//! This crate provides the bytecode instruction set shared by the compiler
//! (in the `parser` crate) and the interpreter.
//!
//! # Features
//!
//! - Stack-based expression evaluation with register-allocated locals
//! - Cells and upvalues for variables captured by closures
//! - Structured exception handling with completion registers for `finally`
//! - Generator suspension points
//!
//! # Example
//!
//! ```
//! use bytecode_system::{BytecodeChunk, Constant, Opcode};
//!
//! let mut chunk = BytecodeChunk::new();
//!
//! // Add constants
//! let idx = chunk.add_constant(Constant::Number(42.0));
//!
//! // Emit instructions
//! chunk.emit(Opcode::LoadConstant(idx));
//! chunk.emit(Opcode::Return);
//!
//! assert_eq!(chunk.instruction_count(), 2);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chunk;
pub mod constant;
pub mod instruction;
pub mod opcode;

// Re-export main types at crate root
pub use chunk::{completion, BytecodeChunk, FunctionKind};
pub use constant::Constant;
pub use instruction::Instruction;
pub use opcode::{Opcode, RegisterId, UpvalueDescriptor};
