//! Tests for Opcode helpers

use bytecode_system::{Opcode, RegisterId, UpvalueDescriptor};

#[test]
fn test_finally_handler_target() {
    let op = Opcode::PushFinally {
        target: 12,
        kind: RegisterId(1),
        value: RegisterId(2),
    };
    assert_eq!(op.jump_target(), Some(12));
}

#[test]
fn test_completion_jump_target() {
    let mut op = Opcode::JumpIfCompletion {
        kind: RegisterId(0),
        code: 3,
        target: 0,
    };
    op.set_jump_target(40);
    assert_eq!(
        op,
        Opcode::JumpIfCompletion {
            kind: RegisterId(0),
            code: 3,
            target: 40
        }
    );
}

#[test]
fn test_upvalue_descriptor() {
    let desc = UpvalueDescriptor::new(true, 3);
    assert!(desc.is_local);
    assert_eq!(desc.index, 3);
}
