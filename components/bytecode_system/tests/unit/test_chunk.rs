//! Tests for BytecodeChunk

use std::rc::Rc;

use bytecode_system::{BytecodeChunk, Constant, FunctionKind, Opcode, RegisterId};
use core_types::SourcePosition;

#[test]
fn test_chunk_creation() {
    let chunk = BytecodeChunk::new();
    assert_eq!(chunk.instructions.len(), 0);
    assert_eq!(chunk.constants.len(), 0);
    assert_eq!(chunk.register_count, 0);
    assert_eq!(chunk.kind, FunctionKind::Script);
}

#[test]
fn test_emit_returns_instruction_index() {
    let mut chunk = BytecodeChunk::new();
    assert_eq!(chunk.emit(Opcode::LoadNull), 0);
    assert_eq!(chunk.emit(Opcode::LoadTrue), 1);
    assert_eq!(chunk.instruction_count(), 2);
}

#[test]
fn test_position_at() {
    let mut chunk = BytecodeChunk::new();
    chunk.emit(Opcode::LoadUndefined);
    chunk.emit_with_position(Opcode::Throw, SourcePosition::new(4, 2, 30));
    assert_eq!(chunk.position_at(0), None);
    assert_eq!(chunk.position_at(1).map(|p| p.line), Some(4));
    assert_eq!(chunk.position_at(9), None);
}

#[test]
fn test_patch_iterator_step_exit() {
    let mut chunk = BytecodeChunk::new();
    let step = chunk.emit(Opcode::IteratorStep {
        iterator: RegisterId(0),
        exit: 0,
    });
    chunk.emit(Opcode::Pop);
    assert!(chunk.patch_jump(step, 5));
    assert_eq!(chunk.instructions[step].opcode.jump_target(), Some(5));
}

#[test]
fn test_nested_functions_are_shared() {
    let mut parent = BytecodeChunk::new();
    let child = Rc::new(BytecodeChunk::with_kind(FunctionKind::Arrow));
    let idx = parent.add_nested_function(child.clone());
    assert_eq!(idx, 0);
    assert!(Rc::ptr_eq(&parent.nested_functions()[0], &child));
}

#[test]
fn test_disassembly_shows_constants() {
    let mut chunk = BytecodeChunk::new();
    let idx = chunk.add_constant(Constant::String("hi".into()));
    chunk.emit(Opcode::LoadConstant(idx));
    let text = chunk.to_string();
    assert!(text.contains("LoadConstant(\"hi\")"));
}
