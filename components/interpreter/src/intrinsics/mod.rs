//! Built-in constructors, prototype methods and global functions
//!
//! Each submodule has an `install` function called once while the realm is
//! created. Native methods receive the execution context, the receiver and
//! the arguments, and report exceptions as [`Throw`] values.

pub mod array;
pub mod collections;
pub mod error;
pub mod function;
pub mod iterator;
pub mod number;
pub mod object;
pub mod regexp;
pub mod string;
pub mod symbol;

use std::rc::Rc;

use crate::completion::Throw;
use crate::context::ExecutionContext;
use crate::function::{create_native_function, NativeConstructor};
use crate::object::{Attributes, ObjectRef};
use crate::realm::Realm;
use crate::value::{PropertyKey, Value};

/// The argument at `index`, or undefined
pub(crate) fn argument(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or_default()
}

/// Define a non-enumerable native method on `target`
pub(crate) fn define_method(
    realm: &Realm,
    target: &ObjectRef,
    name: &str,
    length: u32,
    f: impl Fn(&mut ExecutionContext, &Value, &[Value]) -> Result<Value, Throw> + 'static,
) -> ObjectRef {
    let function = create_native_function(&realm.function_prototype, name, length, Rc::new(f), None);
    target.insert(name, Value::Object(function.clone()), Attributes::HIDDEN);
    function
}

/// Define a non-enumerable native method under a symbol key
pub(crate) fn define_symbol_method(
    realm: &Realm,
    target: &ObjectRef,
    key: PropertyKey,
    name: &str,
    length: u32,
    f: impl Fn(&mut ExecutionContext, &Value, &[Value]) -> Result<Value, Throw> + 'static,
) -> ObjectRef {
    let function = create_native_function(&realm.function_prototype, name, length, Rc::new(f), None);
    target.insert(key, Value::Object(function.clone()), Attributes::HIDDEN);
    function
}

/// Define a getter-only accessor on `target`
pub(crate) fn define_getter(
    realm: &Realm,
    target: &ObjectRef,
    name: &str,
    f: impl Fn(&mut ExecutionContext, &Value, &[Value]) -> Result<Value, Throw> + 'static,
) {
    let getter = create_native_function(
        &realm.function_prototype,
        &format!("get {}", name),
        0,
        Rc::new(f),
        None,
    );
    target.define_own_property(
        PropertyKey::from(name),
        crate::object::Property::Accessor {
            get: Some(getter),
            set: None,
            enumerable: false,
            configurable: true,
        },
    );
}

/// Create a global constructor linked to `prototype`
pub(crate) fn define_constructor(
    realm: &Realm,
    name: &str,
    length: u32,
    prototype: &ObjectRef,
    call: impl Fn(&mut ExecutionContext, &Value, &[Value]) -> Result<Value, Throw> + 'static,
    construct: impl Fn(&mut ExecutionContext, &[Value], &ObjectRef) -> Result<Value, Throw> + 'static,
) -> ObjectRef {
    let construct: NativeConstructor = Rc::new(construct);
    let constructor = create_native_function(
        &realm.function_prototype,
        name,
        length,
        Rc::new(call),
        Some(construct),
    );
    constructor.insert("prototype", Value::Object(prototype.clone()), Attributes::FROZEN);
    prototype.insert("constructor", Value::Object(constructor.clone()), Attributes::HIDDEN);
    realm
        .global
        .insert(name, Value::Object(constructor.clone()), Attributes::HIDDEN);
    constructor
}

/// The receiver as an object, or a TypeError naming the method
pub(crate) fn this_object(
    cx: &mut ExecutionContext,
    this: &Value,
    method: &str,
) -> Result<ObjectRef, Throw> {
    match this {
        Value::Object(object) => Ok(object.clone()),
        _ => Err(cx.type_error(format!("{} called on non-object", method))),
    }
}

/// Relative index argument of `slice` and friends, clamped to `0..=len`
pub(crate) fn relative_index(
    cx: &mut ExecutionContext,
    value: &Value,
    len: f64,
    default: f64,
) -> Result<f64, Throw> {
    if value.is_undefined() {
        return Ok(default);
    }
    let n = cx.to_number(value)?;
    let n = if n.is_nan() { 0.0 } else { n.trunc() };
    Ok(if n < 0.0 { (len + n).max(0.0) } else { n.min(len) })
}
