//! `Object` constructor and `Object.prototype`

use crate::completion::Throw;
use crate::context::ExecutionContext;
use crate::conversion::to_boolean;
use crate::object::{Attributes, Object, ObjectRef, Property};
use crate::realm::Realm;
use crate::value::{PropertyKey, Value};

use super::{argument, define_constructor, define_method};

pub(crate) fn install(realm: &Realm) {
    let prototype = &realm.object_prototype;
    let constructor = define_constructor(
        realm,
        "Object",
        1,
        prototype,
        |cx, _this, args| object_from(cx, &argument(args, 0)),
        |cx, args, _new_target| object_from(cx, &argument(args, 0)),
    );

    define_method(realm, &constructor, "getPrototypeOf", 1, |cx, _this, args| {
        let object = cx.to_object(&argument(args, 0))?;
        Ok(object.prototype().map(Value::Object).unwrap_or(Value::Null))
    });

    define_method(realm, &constructor, "setPrototypeOf", 2, |cx, _this, args| {
        let target = argument(args, 0);
        let prototype = match argument(args, 1) {
            Value::Object(prototype) => Some(prototype),
            Value::Null => None,
            other => {
                return Err(cx.type_error(format!(
                    "Object prototype may only be an Object or null: {}",
                    other
                )))
            }
        };
        if let Value::Object(object) = &target {
            if !object.set_prototype(prototype) {
                let message = if object.borrow().is_extensible() {
                    "Cyclic __proto__ value".to_string()
                } else {
                    format!("{} is not extensible", object)
                };
                return Err(cx.type_error(message));
            }
        }
        Ok(target)
    });

    define_method(realm, &constructor, "create", 2, |cx, _this, args| {
        let prototype = match argument(args, 0) {
            Value::Object(prototype) => Some(prototype),
            Value::Null => None,
            other => {
                return Err(cx.type_error(format!(
                    "Object prototype may only be an Object or null: {}",
                    other
                )))
            }
        };
        let object = ObjectRef::new(Object::ordinary(prototype));
        if let Value::Object(descriptors) = argument(args, 1) {
            for key in descriptors.borrow().enumerable_own_keys() {
                let descriptor = descriptors.get_own_value(&key).unwrap_or_default();
                define_from_descriptor(cx, &object, key, &descriptor)?;
            }
        }
        Ok(Value::Object(object))
    });

    define_method(realm, &constructor, "keys", 1, |cx, _this, args| {
        let object = cx.to_object(&argument(args, 0))?;
        let keys = object
            .borrow()
            .enumerable_own_keys()
            .iter()
            .map(PropertyKey::to_value)
            .collect();
        Ok(Value::Object(cx.create_array(keys)))
    });

    define_method(realm, &constructor, "freeze", 1, |_cx, _this, args| {
        let target = argument(args, 0);
        if let Value::Object(object) = &target {
            object.borrow_mut().freeze();
        }
        Ok(target)
    });

    define_method(realm, &constructor, "isFrozen", 1, |_cx, _this, args| {
        Ok(Value::Boolean(match argument(args, 0) {
            Value::Object(object) => object.borrow().is_frozen(),
            _ => true,
        }))
    });

    define_method(realm, &constructor, "defineProperty", 3, |cx, _this, args| {
        let target = argument(args, 0);
        let Value::Object(object) = &target else {
            return Err(cx.type_error("Object.defineProperty called on non-object"));
        };
        let key = cx.to_property_key(&argument(args, 1))?;
        define_from_descriptor(cx, object, key, &argument(args, 2))?;
        Ok(target)
    });

    define_method(realm, prototype, "hasOwnProperty", 1, |cx, this, args| {
        let key = cx.to_property_key(&argument(args, 0))?;
        let object = cx.to_object(this)?;
        Ok(Value::Boolean(object.has_own_property(&key)))
    });

    define_method(realm, prototype, "isPrototypeOf", 1, |cx, this, args| {
        let Value::Object(value) = argument(args, 0) else {
            return Ok(Value::Boolean(false));
        };
        let object = cx.to_object(this)?;
        let mut cursor = value.prototype();
        while let Some(current) = cursor {
            if current.ptr_eq(&object) {
                return Ok(Value::Boolean(true));
            }
            cursor = current.prototype();
        }
        Ok(Value::Boolean(false))
    });

    define_method(realm, prototype, "toString", 0, |_cx, this, _args| {
        let tag = match this {
            Value::Undefined => "Undefined",
            Value::Null => "Null",
            Value::Boolean(_) => "Boolean",
            Value::Number(_) => "Number",
            Value::String(_) => "String",
            Value::Symbol(_) => "Symbol",
            Value::Object(object) => object.borrow().class_name(),
        };
        Ok(Value::from(format!("[object {}]", tag)))
    });

    define_method(realm, prototype, "valueOf", 0, |cx, this, _args| {
        Ok(Value::Object(cx.to_object(this)?))
    });
}

fn object_from(cx: &mut ExecutionContext, value: &Value) -> Result<Value, Throw> {
    match value {
        Value::Undefined | Value::Null => Ok(Value::Object(cx.create_object())),
        other => Ok(Value::Object(cx.to_object(other)?)),
    }
}

/// Apply a property descriptor object (`value`/`writable` or `get`/`set`
/// plus `enumerable`/`configurable`). Missing flags default to false.
fn define_from_descriptor(
    cx: &mut ExecutionContext,
    object: &ObjectRef,
    key: PropertyKey,
    descriptor: &Value,
) -> Result<(), Throw> {
    let Value::Object(descriptor) = descriptor else {
        return Err(cx.type_error(format!("Property description must be an object: {}", descriptor)));
    };
    let flag = |cx: &mut ExecutionContext, name: &str| -> Result<bool, Throw> {
        let value = cx.get(descriptor, &PropertyKey::from(name))?;
        Ok(to_boolean(&value))
    };
    let enumerable = flag(cx, "enumerable")?;
    let configurable = flag(cx, "configurable")?;
    let getter = cx.get(descriptor, &PropertyKey::from("get"))?;
    let setter = cx.get(descriptor, &PropertyKey::from("set"))?;

    let property = if getter.is_undefined() && setter.is_undefined() {
        let value = cx.get(descriptor, &PropertyKey::from("value"))?;
        let writable = flag(cx, "writable")?;
        Property::data(
            value,
            Attributes {
                writable,
                enumerable,
                configurable,
            },
        )
    } else {
        let accessor = |cx: &mut ExecutionContext, f: Value| -> Result<Option<ObjectRef>, Throw> {
            match f {
                Value::Undefined => Ok(None),
                Value::Object(f) if f.is_callable() => Ok(Some(f)),
                other => Err(cx.type_error(format!("Getter must be a function: {}", other))),
            }
        };
        Property::Accessor {
            get: accessor(cx, getter)?,
            set: accessor(cx, setter)?,
            enumerable,
            configurable,
        }
    };
    if !object.define_own_property(key.clone(), property) {
        return Err(cx.type_error(format!("Cannot redefine property: {}", key)));
    }
    Ok(())
}
