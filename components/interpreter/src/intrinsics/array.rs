//! `Array` constructor and `Array.prototype`
//!
//! Methods are generic over array-likes: they read `length` and indices
//! through the property protocol, so they work on `arguments` objects and
//! plain objects with a `length` as well as real arrays.

use std::rc::Rc;

use crate::array::ArrayStorage;
use crate::completion::Throw;
use crate::context::ExecutionContext;
use crate::function::{create_native_function, native_fn};
use crate::iteration::{IterationKind, NativeIterator};
use crate::object::{Attributes, Object, ObjectKind, ObjectRef};
use crate::realm::Realm;
use crate::value::{PropertyKey, Value};

use super::{argument, define_constructor, define_method, relative_index};

/// `Array.prototype.values`, shared with `Array.prototype[Symbol.iterator]`
/// and the `arguments` object
pub(crate) fn values_function(function_prototype: &ObjectRef) -> ObjectRef {
    create_native_function(
        function_prototype,
        "values",
        0,
        native_fn(|cx, this, _args| array_iterator(cx, this, IterationKind::Values)),
        None,
    )
}

fn array_iterator(
    cx: &mut ExecutionContext,
    this: &Value,
    kind: IterationKind,
) -> Result<Value, Throw> {
    let target = cx.to_object(this)?;
    Ok(Value::Object(cx.create_native_iterator(NativeIterator::Array {
        target,
        position: 0,
        kind,
    })))
}

pub(crate) fn install(realm: &Realm) {
    let prototype = &realm.array_prototype;
    let constructor = define_constructor(
        realm,
        "Array",
        1,
        prototype,
        |cx, _this, args| {
            let fallback = cx.realm().array_prototype.clone();
            construct_array(cx, args, fallback)
        },
        |cx, args, new_target| {
            let fallback = cx.realm().array_prototype.clone();
            let prototype = cx.prototype_from_constructor(new_target, fallback)?;
            construct_array(cx, args, prototype)
        },
    );

    define_method(realm, &constructor, "isArray", 1, |_cx, _this, args| {
        Ok(Value::Boolean(
            argument(args, 0).as_object().is_some_and(ObjectRef::is_array),
        ))
    });

    define_method(realm, &constructor, "of", 0, |cx, _this, args| {
        Ok(Value::Object(cx.create_array(args.to_vec())))
    });

    define_method(realm, &constructor, "from", 1, |cx, _this, args| {
        let source = argument(args, 0);
        let mut values = match &source {
            Value::Undefined | Value::Null => {
                return Err(cx.type_error(format!("{} is not iterable", source)))
            }
            Value::Object(object) if !is_iterable(cx, &source)? => {
                super::function::array_like_to_vec(cx, object)?
            }
            _ => cx.iterate_to_vec(&source)?,
        };
        let mapper = argument(args, 1);
        if !mapper.is_undefined() {
            for (index, value) in values.iter_mut().enumerate() {
                let mapped = [value.clone(), Value::from(index)];
                *value = cx.call(&mapper, Value::Undefined, &mapped)?;
            }
        }
        Ok(Value::Object(cx.create_array(values)))
    });

    define_method(realm, prototype, "push", 1, |cx, this, args| {
        let object = cx.to_object(this)?;
        let mut length = length_of(cx, &object)?;
        for value in args {
            cx.set(&object, PropertyKey::from(length), value.clone(), true)?;
            length += 1;
        }
        cx.set(&object, PropertyKey::from("length"), Value::from(length), true)?;
        Ok(Value::from(length))
    });

    define_method(realm, prototype, "pop", 0, |cx, this, _args| {
        let object = cx.to_object(this)?;
        let length = length_of(cx, &object)?;
        if length == 0 {
            cx.set(&object, PropertyKey::from("length"), Value::from(0), true)?;
            return Ok(Value::Undefined);
        }
        let key = PropertyKey::from(length - 1);
        let value = cx.get(&object, &key)?;
        cx.delete_property(&Value::Object(object.clone()), &key, true)?;
        cx.set(&object, PropertyKey::from("length"), Value::from(length - 1), true)?;
        Ok(value)
    });

    define_method(realm, prototype, "join", 1, |cx, this, args| {
        let object = cx.to_object(this)?;
        let separator = match argument(args, 0) {
            Value::Undefined => Rc::from(","),
            separator => cx.to_string(&separator)?,
        };
        let length = length_of(cx, &object)?;
        let mut joined = String::new();
        for index in 0..length {
            if index > 0 {
                joined.push_str(&separator);
            }
            let element = cx.get(&object, &PropertyKey::from(index))?;
            if !element.is_nullish() {
                joined.push_str(&cx.to_string(&element)?);
            }
        }
        Ok(Value::from(joined))
    });

    define_method(realm, prototype, "toString", 0, |cx, this, _args| {
        let object = cx.to_object(this)?;
        let join = cx.get(&object, &PropertyKey::from("join"))?;
        if join.is_callable() {
            return cx.call(&join, Value::Object(object), &[]);
        }
        Ok(Value::from("[object Array]"))
    });

    define_method(realm, prototype, "indexOf", 1, |cx, this, args| {
        let object = cx.to_object(this)?;
        let length = length_of(cx, &object)?;
        let start = relative_index(cx, &argument(args, 1), length as f64, 0.0)? as u32;
        let needle = argument(args, 0);
        for index in start..length {
            let key = PropertyKey::from(index);
            if !cx.has_property(&object, &key) {
                continue;
            }
            if cx.get(&object, &key)?.strict_equals(&needle) {
                return Ok(Value::from(index));
            }
        }
        Ok(Value::from(-1))
    });

    define_method(realm, prototype, "includes", 1, |cx, this, args| {
        let object = cx.to_object(this)?;
        let length = length_of(cx, &object)?;
        let start = relative_index(cx, &argument(args, 1), length as f64, 0.0)? as u32;
        let needle = argument(args, 0);
        for index in start..length {
            if cx.get(&object, &PropertyKey::from(index))?.same_value_zero(&needle) {
                return Ok(Value::Boolean(true));
            }
        }
        Ok(Value::Boolean(false))
    });

    define_method(realm, prototype, "slice", 2, |cx, this, args| {
        let object = cx.to_object(this)?;
        let length = length_of(cx, &object)? as f64;
        let start = relative_index(cx, &argument(args, 0), length, 0.0)? as u32;
        let end = relative_index(cx, &argument(args, 1), length, length)? as u32;
        let mut storage = ArrayStorage::new();
        for index in start..end.max(start) {
            let key = PropertyKey::from(index);
            if cx.has_property(&object, &key) {
                storage.push(cx.get(&object, &key)?);
            } else {
                storage.push_hole();
            }
        }
        let prototype = cx.realm().array_prototype.clone();
        Ok(Value::Object(ObjectRef::new(Object::new(
            ObjectKind::Array(storage),
            Some(prototype),
        ))))
    });

    define_method(realm, prototype, "forEach", 1, |cx, this, args| {
        let object = cx.to_object(this)?;
        let callback = callable_argument(cx, args, "Array.prototype.forEach")?;
        let receiver = argument(args, 1);
        let length = length_of(cx, &object)?;
        for index in 0..length {
            let key = PropertyKey::from(index);
            if !cx.has_property(&object, &key) {
                continue;
            }
            let value = cx.get(&object, &key)?;
            let call_args = [value, Value::from(index), Value::Object(object.clone())];
            cx.call(&callback, receiver.clone(), &call_args)?;
        }
        Ok(Value::Undefined)
    });

    define_method(realm, prototype, "map", 1, |cx, this, args| {
        let object = cx.to_object(this)?;
        let callback = callable_argument(cx, args, "Array.prototype.map")?;
        let receiver = argument(args, 1);
        let length = length_of(cx, &object)?;
        let mut values = Vec::with_capacity(length as usize);
        for index in 0..length {
            let value = cx.get(&object, &PropertyKey::from(index))?;
            let call_args = [value, Value::from(index), Value::Object(object.clone())];
            values.push(cx.call(&callback, receiver.clone(), &call_args)?);
        }
        Ok(Value::Object(cx.create_array(values)))
    });

    define_method(realm, prototype, "keys", 0, |cx, this, _args| {
        array_iterator(cx, this, IterationKind::Keys)
    });
    define_method(realm, prototype, "entries", 0, |cx, this, _args| {
        array_iterator(cx, this, IterationKind::Entries)
    });

    let values = Value::Object(realm.array_values.clone());
    prototype.insert("values", values.clone(), Attributes::HIDDEN);
    prototype.insert(realm.symbol_iterator.clone(), values, Attributes::HIDDEN);
}

fn construct_array(
    cx: &mut ExecutionContext,
    args: &[Value],
    prototype: ObjectRef,
) -> Result<Value, Throw> {
    let storage = match args {
        [Value::Number(n)] => {
            let length = *n as u32;
            if length as f64 != *n {
                return Err(cx.range_error("Invalid array length"));
            }
            let mut storage = ArrayStorage::new();
            storage.set_len(length);
            storage
        }
        _ => ArrayStorage::from_values(args.to_vec()),
    };
    Ok(Value::Object(ObjectRef::new(Object::new(
        ObjectKind::Array(storage),
        Some(prototype),
    ))))
}

fn length_of(cx: &mut ExecutionContext, object: &ObjectRef) -> Result<u32, Throw> {
    if let Some(array) = object.borrow().as_array() {
        return Ok(array.len());
    }
    let length = cx.get(object, &PropertyKey::from("length"))?;
    let length = cx.to_number(&length)?;
    Ok(if length.is_finite() && length > 0.0 {
        length.min(u32::MAX as f64) as u32
    } else {
        0
    })
}

fn callable_argument(
    cx: &mut ExecutionContext,
    args: &[Value],
    method: &str,
) -> Result<Value, Throw> {
    let callback = argument(args, 0);
    if callback.is_callable() {
        Ok(callback)
    } else {
        Err(cx.type_error(format!("{}: {} is not a function", method, callback)))
    }
}

fn is_iterable(cx: &mut ExecutionContext, value: &Value) -> Result<bool, Throw> {
    let key = PropertyKey::Symbol(cx.realm().symbol_iterator.clone());
    Ok(cx.get_method(value, &key)?.is_some())
}
