//! `String` constructor and `String.prototype`
//!
//! Strings are indexed by character, consistent with `length` and the
//! string iterator.

use std::rc::Rc;

use crate::completion::Throw;
use crate::context::ExecutionContext;
use crate::iteration::NativeIterator;
use crate::object::{Object, ObjectKind, ObjectRef};
use crate::realm::Realm;
use crate::value::{PropertyKey, Value};

use super::{argument, define_constructor, define_method, define_symbol_method, relative_index};

pub(crate) fn install(realm: &Realm) {
    let prototype = &realm.string_prototype;
    define_constructor(
        realm,
        "String",
        1,
        prototype,
        |cx, _this, args| match args.first() {
            None => Ok(Value::from("")),
            Some(Value::Symbol(symbol)) => Ok(Value::from(symbol.to_string())),
            Some(value) => Ok(Value::String(cx.to_string(value)?)),
        },
        |cx, args, new_target| {
            let string = match args.first() {
                None => Rc::from(""),
                Some(value) => cx.to_string(value)?,
            };
            let fallback = cx.realm().string_prototype.clone();
            let prototype = cx.prototype_from_constructor(new_target, fallback)?;
            Ok(Value::Object(ObjectRef::new(Object::new(
                ObjectKind::Primitive(Value::String(string)),
                Some(prototype),
            ))))
        },
    );

    define_method(realm, prototype, "toString", 0, |cx, this, _args| {
        this_string_value(cx, this, "String.prototype.toString").map(Value::String)
    });
    define_method(realm, prototype, "valueOf", 0, |cx, this, _args| {
        this_string_value(cx, this, "String.prototype.valueOf").map(Value::String)
    });

    define_method(realm, prototype, "charAt", 1, |cx, this, args| {
        let string = coerce_this(cx, this, "String.prototype.charAt")?;
        let position = cx.to_number(&argument(args, 0))?;
        let position = if position.is_nan() { 0.0 } else { position.trunc() };
        if position < 0.0 {
            return Ok(Value::from(""));
        }
        let c = string.chars().nth(position as usize);
        Ok(Value::from(c.map(String::from).unwrap_or_default()))
    });

    define_method(realm, prototype, "indexOf", 1, |cx, this, args| {
        let string = coerce_this(cx, this, "String.prototype.indexOf")?;
        let needle = cx.to_string(&argument(args, 0))?;
        let length = string.chars().count();
        let start = match argument(args, 1) {
            Value::Undefined => 0,
            position => {
                let position = cx.to_number(&position)?;
                if position.is_nan() {
                    0
                } else {
                    position.trunc().clamp(0.0, length as f64) as usize
                }
            }
        };
        let offset = byte_offset(&string, start);
        let found = string[offset..]
            .find(&*needle)
            .map(|at| string[..offset + at].chars().count());
        Ok(match found {
            Some(index) => Value::from(index),
            None => Value::from(-1),
        })
    });

    define_method(realm, prototype, "slice", 2, |cx, this, args| {
        let string = coerce_this(cx, this, "String.prototype.slice")?;
        let length = string.chars().count() as f64;
        let start = relative_index(cx, &argument(args, 0), length, 0.0)? as usize;
        let end = relative_index(cx, &argument(args, 1), length, length)? as usize;
        if start >= end {
            return Ok(Value::from(""));
        }
        let sliced: String = string.chars().skip(start).take(end - start).collect();
        Ok(Value::from(sliced))
    });

    define_method(realm, prototype, "includes", 1, |cx, this, args| {
        let string = coerce_this(cx, this, "String.prototype.includes")?;
        let needle = cx.to_string(&argument(args, 0))?;
        Ok(Value::Boolean(string.contains(&*needle)))
    });

    define_method(realm, prototype, "toUpperCase", 0, |cx, this, _args| {
        let string = coerce_this(cx, this, "String.prototype.toUpperCase")?;
        Ok(Value::from(string.to_uppercase()))
    });

    define_method(realm, prototype, "toLowerCase", 0, |cx, this, _args| {
        let string = coerce_this(cx, this, "String.prototype.toLowerCase")?;
        Ok(Value::from(string.to_lowercase()))
    });

    define_symbol_method(
        realm,
        prototype,
        PropertyKey::Symbol(realm.symbol_iterator.clone()),
        "[Symbol.iterator]",
        0,
        |cx, this, _args| {
            let string = coerce_this(cx, this, "String.prototype[Symbol.iterator]")?;
            Ok(Value::Object(cx.create_native_iterator(NativeIterator::String {
                string,
                offset: 0,
            })))
        },
    );
}

/// RequireObjectCoercible followed by ToString
fn coerce_this(cx: &mut ExecutionContext, this: &Value, method: &str) -> Result<Rc<str>, Throw> {
    if this.is_nullish() {
        return Err(cx.type_error(format!("{} called on null or undefined", method)));
    }
    cx.to_string(this)
}

fn this_string_value(cx: &mut ExecutionContext, this: &Value, method: &str) -> Result<Rc<str>, Throw> {
    match this {
        Value::String(s) => Ok(s.clone()),
        Value::Object(object) => match &object.borrow().kind {
            ObjectKind::Primitive(Value::String(s)) => Ok(s.clone()),
            _ => Err(cx.type_error(format!("{} requires that 'this' be a String", method))),
        },
        _ => Err(cx.type_error(format!("{} requires that 'this' be a String", method))),
    }
}

fn byte_offset(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map_or(s.len(), |(offset, _)| offset)
}
