//! Contract tests: the public surface the compiler and interpreter rely on

use bytecode_system::{completion, BytecodeChunk, Constant, FunctionKind, Opcode};

#[test]
fn test_completion_codes_are_distinct() {
    let codes = [
        completion::NORMAL,
        completion::RETURN,
        completion::THROW,
        completion::FIRST_JUMP,
    ];
    for (i, a) in codes.iter().enumerate() {
        for b in &codes[i + 1..] {
            assert_ne!(a, b);
        }
    }
    assert!(completion::FIRST_JUMP > completion::THROW);
}

#[test]
fn test_class_constructor_is_constructible() {
    let chunk = BytecodeChunk::with_kind(FunctionKind::ClassConstructor { derived: true });
    assert!(chunk.is_constructor());
    assert!(!BytecodeChunk::with_kind(FunctionKind::Method).is_constructor());
}

#[test]
fn test_constant_accessors() {
    assert_eq!(Constant::Number(2.5).as_number(), Some(2.5));
    assert_eq!(Constant::String("a".into()).as_str(), Some("a"));
    assert_eq!(Constant::String("a".into()).as_number(), None);
}

#[test]
fn test_every_branch_is_patchable() {
    let mut branches = vec![
        Opcode::Jump(0),
        Opcode::JumpIfTrue(0),
        Opcode::JumpIfFalse(0),
        Opcode::JumpIfNullish(0),
        Opcode::JumpIfNotNullish(0),
        Opcode::PushTry(0),
        Opcode::OptionalChainExit {
            target: 0,
            depth: 1,
        },
    ];
    for op in &mut branches {
        assert!(op.set_jump_target(9));
        assert_eq!(op.jump_target(), Some(9));
    }
}
