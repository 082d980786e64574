//! `Function` constructor and `Function.prototype`

use crate::completion::Throw;
use crate::context::ExecutionContext;
use crate::function::{BoundFunction, FunctionObject};
use crate::object::{Attributes, Object, ObjectKind, ObjectRef};
use crate::realm::Realm;
use crate::value::{PropertyKey, Value};

use super::{argument, define_constructor, define_method};

pub(crate) fn install(realm: &Realm) {
    let prototype = &realm.function_prototype;
    prototype.insert("length", Value::from(0), Attributes::READ_ONLY);
    prototype.insert("name", Value::from(""), Attributes::READ_ONLY);

    // Source text is never kept around, so dynamic functions cannot exist.
    define_constructor(
        realm,
        "Function",
        1,
        prototype,
        |cx, _this, _args| Err(cx.internal_error("Function constructor is not supported")),
        |cx, _args, _new_target| Err(cx.internal_error("Function constructor is not supported")),
    );

    define_method(realm, prototype, "call", 1, |cx, this, args| {
        let receiver = argument(args, 0);
        let rest = args.get(1..).unwrap_or_default();
        cx.call(this, receiver, rest)
    });

    define_method(realm, prototype, "apply", 2, |cx, this, args| {
        let receiver = argument(args, 0);
        let list = match argument(args, 1) {
            Value::Undefined | Value::Null => Vec::new(),
            Value::Object(list) => array_like_to_vec(cx, &list)?,
            _ => return Err(cx.type_error("CreateListFromArrayLike called on non-object")),
        };
        cx.call(this, receiver, &list)
    });

    define_method(realm, prototype, "bind", 1, |cx, this, args| {
        let target = match this {
            Value::Object(target) if target.is_callable() => target.clone(),
            _ => return Err(cx.type_error("Bind must be called on a function")),
        };
        let bound_args: Vec<Value> = args.get(1..).unwrap_or_default().to_vec();
        let length = match cx.get(&target, &PropertyKey::from("length"))? {
            Value::Number(n) if n.is_finite() => (n - bound_args.len() as f64).max(0.0),
            _ => 0.0,
        };
        let name = match cx.get(&target, &PropertyKey::from("name"))? {
            Value::String(name) => name,
            _ => "".into(),
        };
        let bound = Object::new(
            ObjectKind::Function(FunctionObject::Bound(BoundFunction {
                target: target.clone(),
                this: argument(args, 0),
                args: bound_args,
            })),
            target.prototype(),
        );
        let bound = ObjectRef::new(bound);
        bound.insert("length", Value::Number(length), Attributes::READ_ONLY);
        bound.insert("name", Value::from(format!("bound {}", name)), Attributes::READ_ONLY);
        Ok(Value::Object(bound))
    });

    define_method(realm, prototype, "toString", 0, |cx, this, _args| {
        let name = match this {
            Value::Object(object) => object.borrow().as_function().map(FunctionObject::debug_name),
            _ => None,
        };
        match name {
            Some(name) => Ok(Value::from(format!("function {}() {{ [native code] }}", name))),
            None => Err(cx.type_error("Function.prototype.toString requires that 'this' be a Function")),
        }
    });
}

/// Elements `0..length` of an array-like object
pub(crate) fn array_like_to_vec(
    cx: &mut ExecutionContext,
    object: &ObjectRef,
) -> Result<Vec<Value>, Throw> {
    if let Some(array) = object.borrow().as_array() {
        return Ok(array.to_vec());
    }
    let length = cx.get(object, &PropertyKey::from("length"))?;
    let length = cx.to_number(&length)?;
    let length = if length.is_finite() && length > 0.0 { length as u32 } else { 0 };
    let mut values = Vec::with_capacity(length as usize);
    for index in 0..length {
        values.push(cx.get(object, &PropertyKey::from(index))?);
    }
    Ok(values)
}
