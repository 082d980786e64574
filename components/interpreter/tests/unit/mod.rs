//! Unit tests for interpreter components

use std::rc::Rc;

use bytecode_system::{BytecodeChunk, Constant, Opcode, RegisterId};
use core_types::ErrorKind;
use interpreter::array::ArrayStorage;
use interpreter::collections::MapStorage;
use interpreter::conversion::{number_to_string, string_to_number, to_boolean, to_int32, to_uint32};
use interpreter::{
    Attributes, Backend, BytecodeBackend, Engine, Object, ObjectRef, Property,
    PropertyKey, Symbol, Upvalue, Value,
};
use proptest::prelude::*;

fn run_chunk(chunk: BytecodeChunk) -> Result<Value, core_types::JsError> {
    let mut engine = Engine::default();
    let unit = BytecodeBackend.compile(Rc::new(chunk));
    unit.invoke(&mut engine, Value::Undefined, &[])
}

// ============================================================================
// Value Tests
// ============================================================================

#[test]
fn test_value_type_of() {
    assert_eq!(Value::Undefined.type_of(), "undefined");
    assert_eq!(Value::Null.type_of(), "object");
    assert_eq!(Value::from(true).type_of(), "boolean");
    assert_eq!(Value::from(1.5).type_of(), "number");
    assert_eq!(Value::from("s").type_of(), "string");
    assert_eq!(Value::from(Symbol::new(None)).type_of(), "symbol");
}

#[test]
fn test_value_strict_equals() {
    assert!(Value::from(1).strict_equals(&Value::from(1.0)));
    assert!(!Value::Number(f64::NAN).strict_equals(&Value::Number(f64::NAN)));
    assert!(Value::Number(0.0).strict_equals(&Value::Number(-0.0)));
    assert!(!Value::from("1").strict_equals(&Value::from(1)));
    assert!(!Value::Undefined.strict_equals(&Value::Null));
}

#[test]
fn test_value_same_value_zero() {
    assert!(Value::Number(f64::NAN).same_value_zero(&Value::Number(f64::NAN)));
    assert!(Value::from("abc").same_value_zero(&Value::from("abc")));
}

#[test]
fn test_symbols_compare_by_identity() {
    let a = Symbol::new(Some("tag"));
    let b = Symbol::new(Some("tag"));
    assert_eq!(Value::from(a.clone()), Value::from(a.clone()));
    assert_ne!(Value::from(a.clone()), Value::from(b));
    assert_eq!(a.description(), Some("tag"));
}

#[test]
fn test_value_nullish() {
    assert!(Value::Undefined.is_nullish());
    assert!(Value::Null.is_nullish());
    assert!(!Value::from(0).is_nullish());
    assert!(Value::default().is_undefined());
}

// ============================================================================
// Conversion Tests
// ============================================================================

#[test]
fn test_to_boolean() {
    assert!(!to_boolean(&Value::from("")));
    assert!(to_boolean(&Value::from("0")));
    assert!(!to_boolean(&Value::Number(f64::NAN)));
    assert!(!to_boolean(&Value::Number(-0.0)));
    assert!(to_boolean(&Value::from(Symbol::new(None))));
}

#[test]
fn test_string_to_number() {
    assert_eq!(string_to_number("  42  "), 42.0);
    assert_eq!(string_to_number(""), 0.0);
    assert_eq!(string_to_number("0x1F"), 31.0);
    assert_eq!(string_to_number("0b101"), 5.0);
    assert_eq!(string_to_number("-Infinity"), f64::NEG_INFINITY);
    assert!(string_to_number("12px").is_nan());
    assert!(string_to_number("0x").is_nan());
}

#[test]
fn test_number_to_string() {
    assert_eq!(number_to_string(0.1), "0.1");
    assert_eq!(number_to_string(-0.0), "0");
    assert_eq!(number_to_string(1e21), "1e+21");
    assert_eq!(number_to_string(123456789012.0), "123456789012");
    assert_eq!(number_to_string(1.5e-7), "1.5e-7");
    assert_eq!(number_to_string(0.000001), "0.000001");
    assert_eq!(number_to_string(f64::NAN), "NaN");
    assert_eq!(number_to_string(f64::NEG_INFINITY), "-Infinity");
}

#[test]
fn test_int32_wrapping() {
    assert_eq!(to_int32(4294967295.0), -1);
    assert_eq!(to_int32(2147483648.0), -2147483648);
    assert_eq!(to_uint32(-1.0), 4294967295);
    assert_eq!(to_uint32(f64::NAN), 0);
}

proptest! {
    #[test]
    fn prop_number_to_string_round_trips(n in any::<f64>().prop_filter("finite", |n| n.is_finite())) {
        prop_assert_eq!(string_to_number(&number_to_string(n)), n);
    }

    #[test]
    fn prop_int32_is_identity_on_i32(n in any::<i32>()) {
        prop_assert_eq!(to_int32(n as f64), n);
        prop_assert_eq!(to_uint32(n as f64), n as u32);
    }

    #[test]
    fn prop_int32_wraps_modulo_2_32(n in -(1i64 << 52)..(1i64 << 52)) {
        prop_assert_eq!(to_int32(n as f64), n as i32);
    }

    #[test]
    fn prop_strict_equality_agrees_with_same_value_zero(a in any::<f64>(), b in any::<f64>()) {
        let (x, y) = (Value::Number(a), Value::Number(b));
        let both_nan = a.is_nan() && b.is_nan();
        prop_assert_eq!(x.strict_equals(&y), a == b);
        prop_assert_eq!(x.same_value_zero(&y), both_nan || (a == b && a.is_sign_negative() == b.is_sign_negative()));
    }
}

// ============================================================================
// Object Model Tests
// ============================================================================

#[test]
fn test_property_order_integer_keys_first() {
    let object = ObjectRef::new(Object::ordinary(None));
    object.insert("b", Value::from(1), Attributes::ALL);
    object.insert(2u32, Value::from(2), Attributes::ALL);
    object.insert("a", Value::from(3), Attributes::ALL);
    object.insert(0u32, Value::from(4), Attributes::ALL);
    let keys: Vec<String> = object.own_keys().iter().map(|k| k.to_string()).collect();
    assert_eq!(keys, vec!["0", "2", "b", "a"]);
}

#[test]
fn test_define_on_frozen_object_is_refused() {
    let object = ObjectRef::new(Object::ordinary(None));
    object.insert("x", Value::from(1), Attributes::ALL);
    object.borrow_mut().freeze();
    assert!(object.borrow().is_frozen());
    let accepted = object.define_own_property(
        PropertyKey::from("x"),
        Property::data(Value::from(2), Attributes::ALL),
    );
    assert!(!accepted);
    assert_eq!(object.get_own_value(&PropertyKey::from("x")), Some(Value::from(1)));
    assert!(!object.borrow_mut().delete_own(&PropertyKey::from("x")));
}

#[test]
fn test_prototype_cycle_is_refused() {
    let a = ObjectRef::new(Object::ordinary(None));
    let b = ObjectRef::new(Object::ordinary(Some(a.clone())));
    assert!(!a.set_prototype(Some(b.clone())));
    assert!(a.prototype().is_none());
    assert!(b.set_prototype(None));
}

#[test]
fn test_object_ids_are_distinct() {
    let a = ObjectRef::new(Object::ordinary(None));
    let b = ObjectRef::new(Object::ordinary(None));
    assert_ne!(a.id(), b.id());
    assert!(a.ptr_eq(&a.clone()));
}

// ============================================================================
// Array Storage Tests
// ============================================================================

#[test]
fn test_array_storage_holes() {
    let mut storage = ArrayStorage::new();
    storage.push(Value::from(1));
    storage.set(3, Value::from(4));
    assert_eq!(storage.len(), 4);
    assert!(storage.has(0));
    assert!(!storage.has(1));
    assert_eq!(storage.indices(), vec![0, 3]);
}

#[test]
fn test_array_storage_truncate() {
    let mut storage = ArrayStorage::from_values(vec![Value::from(1), Value::from(2), Value::from(3)]);
    storage.set_len(1);
    assert_eq!(storage.len(), 1);
    assert_eq!(storage.to_vec(), vec![Value::from(1)]);
}

// ============================================================================
// Collection Storage Tests
// ============================================================================

#[test]
fn test_map_storage_insertion_order() {
    let mut map = MapStorage::new();
    map.set(Value::from("b"), Value::from(1));
    map.set(Value::from("a"), Value::from(2));
    map.set(Value::from("b"), Value::from(3));
    let keys: Vec<Value> = map.entries().into_iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec![Value::from("b"), Value::from("a")]);
    assert_eq!(map.get(&Value::from("b")), Some(&Value::from(3)));
}

#[test]
fn test_map_storage_nan_key() {
    let mut map = MapStorage::new();
    map.set(Value::Number(f64::NAN), Value::from(1));
    assert!(map.has(&Value::Number(f64::NAN)));
    assert!(map.delete(&Value::Number(f64::NAN)));
    assert!(map.is_empty());
}

// ============================================================================
// Upvalue Tests
// ============================================================================

#[test]
fn test_upvalue_shared_between_clones() {
    let cell = Upvalue::new(Value::from(1));
    let captured = cell.clone();
    captured.set(Value::from("changed"));
    assert_eq!(cell.get(), Value::from("changed"));
}

// ============================================================================
// Hand-Built Chunk Tests
// ============================================================================

#[test]
fn test_chunk_arithmetic() {
    let mut chunk = BytecodeChunk::new();
    let c10 = chunk.add_constant(Constant::Number(10.0));
    let c5 = chunk.add_constant(Constant::Number(5.0));
    let c3 = chunk.add_constant(Constant::Number(3.0));
    chunk.emit(Opcode::LoadConstant(c10));
    chunk.emit(Opcode::LoadConstant(c5));
    chunk.emit(Opcode::Add);
    chunk.emit(Opcode::LoadConstant(c3));
    chunk.emit(Opcode::Mul);
    chunk.emit(Opcode::Return);
    assert_eq!(run_chunk(chunk).unwrap(), Value::from(45));
}

#[test]
fn test_chunk_locals_and_jumps() {
    // r0 = 0; while (r0 < 5) r0 = r0 + 1; return r0
    let mut chunk = BytecodeChunk::new();
    chunk.register_count = 1;
    let zero = chunk.add_constant(Constant::Number(0.0));
    let one = chunk.add_constant(Constant::Number(1.0));
    let five = chunk.add_constant(Constant::Number(5.0));
    chunk.emit(Opcode::LoadConstant(zero));
    chunk.emit(Opcode::StoreLocal(RegisterId(0)));
    let loop_start = chunk.emit(Opcode::LoadLocal(RegisterId(0)));
    chunk.emit(Opcode::LoadConstant(five));
    chunk.emit(Opcode::LessThan);
    let exit = chunk.emit(Opcode::JumpIfFalse(0));
    chunk.emit(Opcode::LoadLocal(RegisterId(0)));
    chunk.emit(Opcode::LoadConstant(one));
    chunk.emit(Opcode::Add);
    chunk.emit(Opcode::StoreLocal(RegisterId(0)));
    chunk.emit(Opcode::Jump(loop_start));
    let end = chunk.emit(Opcode::LoadLocal(RegisterId(0)));
    chunk.patch_jump(exit, end);
    chunk.emit(Opcode::Return);
    assert_eq!(run_chunk(chunk).unwrap(), Value::from(5));
}

#[test]
fn test_chunk_uncaught_throw() {
    let mut chunk = BytecodeChunk::new();
    let message = chunk.add_constant(Constant::String("boom".into()));
    chunk.emit(Opcode::LoadConstant(message));
    chunk.emit(Opcode::Throw);
    let error = run_chunk(chunk).unwrap_err();
    assert_eq!(error.kind, ErrorKind::Thrown);
    assert!(error.message.contains("boom"));
}

#[test]
fn test_chunk_global_lookup_failure() {
    let mut chunk = BytecodeChunk::new();
    chunk.emit(Opcode::LoadGlobal("missingBinding".into()));
    chunk.emit(Opcode::Return);
    let error = run_chunk(chunk).unwrap_err();
    assert_eq!(error.kind, ErrorKind::ReferenceError);
}
