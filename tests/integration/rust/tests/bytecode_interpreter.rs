//! Bytecode to Interpreter Integration Tests
//!
//! Tests the integration between bytecode_system and interpreter.
//! Chunks are built by hand or compiled from source and run through the
//! backend interface the engine uses.

use std::rc::Rc;

use bytecode_system::{BytecodeChunk, Constant, Opcode};
use core_types::ErrorKind;
use interpreter::{Backend, BytecodeBackend, Engine, Value};
use parser::{compile, parse, CompileOptions, ParseOptions};

fn compiled(source: &str) -> Rc<BytecodeChunk> {
    let output = parse(source, &ParseOptions::default()).expect("Failed to parse");
    compile(&output.program, &CompileOptions::default()).expect("Failed to compile")
}

fn invoke(engine: &mut Engine, chunk: Rc<BytecodeChunk>, this: Value) -> Value {
    BytecodeBackend
        .compile(chunk)
        .invoke(engine, this, &[])
        .expect("Execution failed")
}

/// Test: Hand-built global stores are visible to the host
#[test]
fn test_store_global_visible_to_host() {
    let mut chunk = BytecodeChunk::new();
    let value = chunk.add_constant(Constant::String("stored".into()));
    chunk.emit(Opcode::DeclareGlobal("slot".into()));
    chunk.emit(Opcode::LoadConstant(value));
    chunk.emit(Opcode::StoreGlobal("slot".into()));
    chunk.emit(Opcode::LoadUndefined);
    chunk.emit(Opcode::Return);

    let mut engine = Engine::default();
    invoke(&mut engine, Rc::new(chunk), Value::Undefined);
    assert_eq!(engine.get_global("slot").unwrap(), Value::from("stored"));
}

/// Test: A catch handler receives the thrown value on the stack
#[test]
fn test_hand_built_try_catch() {
    let mut chunk = BytecodeChunk::new();
    let thrown = chunk.add_constant(Constant::Number(7.0));
    let handler = chunk.emit(Opcode::PushTry(0));
    chunk.emit(Opcode::LoadConstant(thrown));
    chunk.emit(Opcode::Throw);
    let catch_start = chunk.emit(Opcode::Neg);
    chunk.emit(Opcode::Return);
    chunk.patch_jump(handler, catch_start);

    let mut engine = Engine::default();
    assert_eq!(invoke(&mut engine, Rc::new(chunk), Value::Undefined), Value::from(-7));
}

/// Test: Object and array opcodes build real objects
#[test]
fn test_hand_built_object_literal() {
    let mut chunk = BytecodeChunk::new();
    let one = chunk.add_constant(Constant::Number(1.0));
    let two = chunk.add_constant(Constant::Number(2.0));
    chunk.emit(Opcode::CreateObject);
    chunk.emit(Opcode::CreateArray(0));
    chunk.emit(Opcode::LoadConstant(one));
    chunk.emit(Opcode::ArrayPush);
    chunk.emit(Opcode::LoadConstant(two));
    chunk.emit(Opcode::ArrayPush);
    chunk.emit(Opcode::DefineField("items".into()));
    chunk.emit(Opcode::Return);

    let mut engine = Engine::default();
    let result = invoke(&mut engine, Rc::new(chunk), Value::Undefined);
    let object = result.as_object().expect("object result").clone();
    let items = engine.get(&object, "items").unwrap();
    let items = items.as_object().expect("array").clone();
    assert!(items.is_array());
    assert_eq!(engine.get(&items, "length").unwrap(), Value::from(2));
    assert_eq!(engine.get(&items, 1u32).unwrap(), Value::from(2));
}

/// Test: A compiled unit can be invoked repeatedly
#[test]
fn test_unit_reuse() {
    let mut engine = Engine::default();
    engine.set_global("hits", Value::from(0));
    let unit = BytecodeBackend.compile(compiled("hits = hits + 1; hits"));
    for expected in 1..=3 {
        let value = unit.invoke(&mut engine, Value::Undefined, &[]).unwrap();
        assert_eq!(value, Value::from(expected));
    }
}

/// Test: The receiver passed to invoke becomes `this`
#[test]
fn test_invoke_with_receiver() {
    let mut engine = Engine::default();
    let receiver = engine.context().create_object();
    engine.set(&receiver, "x", Value::from(5), true).unwrap();
    let value = invoke(&mut engine, compiled("this.x * 2"), Value::Object(receiver));
    assert_eq!(value, Value::from(10));
}

/// Test: Sloppy scripts see the global object for an undefined receiver,
/// strict scripts keep undefined
#[test]
fn test_this_binding_by_strictness() {
    let mut engine = Engine::default();
    let global = engine.global_object();
    let sloppy = invoke(&mut engine, compiled("this"), Value::Undefined);
    assert!(sloppy.as_object().map_or(false, |o| o.ptr_eq(&global)));
    let strict = invoke(&mut engine, compiled("'use strict'; this"), Value::Undefined);
    assert_eq!(strict, Value::Undefined);
}

/// Test: Functions defined by one unit are callable from the host
#[test]
fn test_function_defined_in_chunk_is_callable() {
    let mut engine = Engine::default();
    invoke(
        &mut engine,
        compiled("function scale(x) { return x * factor; } var factor = 3;"),
        Value::Undefined,
    );
    let scale = engine.get_global("scale").unwrap();
    let result = engine.call(&scale, Value::Undefined, &[Value::from(4)]).unwrap();
    assert_eq!(result, Value::from(12));
}

/// Test: Uncaught errors from a unit carry a stack with positions
#[test]
fn test_uncaught_error_position() {
    let mut engine = Engine::default();
    let output = parse("let a = 1;\nnull.prop;", &ParseOptions::default()).unwrap();
    let chunk = compile(&output.program, &CompileOptions::new().with_source_name("app.js")).unwrap();
    let error = BytecodeBackend
        .compile(chunk)
        .invoke(&mut engine, Value::Undefined, &[])
        .unwrap_err();
    assert_eq!(error.kind, ErrorKind::TypeError);
    let position = error.source_position.expect("position");
    assert_eq!(position.line, 2);
    assert!(error.stack.iter().any(|frame| frame.source_url.as_deref() == Some("app.js")));
}
