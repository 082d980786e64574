//! Error constructors
//!
//! `Error` and its native subclasses share one construction routine. The
//! instance records the call stack at the point of construction, minus the
//! constructor's own frame.

use core_types::ErrorKind;

use crate::completion::Throw;
use crate::context::ExecutionContext;
use crate::object::{Attributes, ObjectRef};
use crate::realm::Realm;
use crate::value::{PropertyKey, Value};

use super::{argument, define_constructor, define_method, this_object};

pub(crate) fn install(realm: &Realm) {
    let base = install_kind(realm, ErrorKind::Thrown);
    for kind in [
        ErrorKind::TypeError,
        ErrorKind::RangeError,
        ErrorKind::ReferenceError,
        ErrorKind::SyntaxError,
    ] {
        let constructor = install_kind(realm, kind);
        constructor.set_prototype(Some(base.clone()));
    }

    define_method(realm, &realm.error_prototype, "toString", 0, |cx, this, _args| {
        let object = this_object(cx, this, "Error.prototype.toString")?;
        let name = match cx.get(&object, &PropertyKey::from("name"))? {
            Value::Undefined => "Error".into(),
            name => cx.to_string(&name)?,
        };
        let message = match cx.get(&object, &PropertyKey::from("message"))? {
            Value::Undefined => "".into(),
            message => cx.to_string(&message)?,
        };
        Ok(Value::from(match (name.is_empty(), message.is_empty()) {
            (_, true) => name.to_string(),
            (true, false) => message.to_string(),
            (false, false) => format!("{}: {}", name, message),
        }))
    });
}

fn install_kind(realm: &Realm, kind: ErrorKind) -> ObjectRef {
    let prototype = realm.error_prototype(kind);
    prototype.insert("name", Value::from(kind.name()), Attributes::HIDDEN);
    prototype.insert("message", Value::from(""), Attributes::HIDDEN);
    define_constructor(
        realm,
        kind.name(),
        1,
        prototype,
        move |cx, _this, args| {
            let fallback = cx.realm().error_prototype(kind).clone();
            construct_error(cx, kind, args, fallback)
        },
        move |cx, args, new_target| {
            let fallback = cx.realm().error_prototype(kind).clone();
            let prototype = cx.prototype_from_constructor(new_target, fallback)?;
            construct_error(cx, kind, args, prototype)
        },
    )
}

fn construct_error(
    cx: &mut ExecutionContext,
    kind: ErrorKind,
    args: &[Value],
    prototype: ObjectRef,
) -> Result<Value, Throw> {
    let message = match argument(args, 0) {
        Value::Undefined => None,
        message => Some(cx.to_string(&message)?),
    };
    let frames = cx.capture_stack().into_iter().skip(1).collect();
    let error = ExecutionContext::build_error(
        kind,
        message.as_deref().unwrap_or(""),
        prototype,
        frames,
    );
    if let Some(message) = message.filter(|m| m.is_empty()) {
        error.insert("message", Value::String(message), Attributes::HIDDEN);
    }
    if let Value::Object(options) = argument(args, 1) {
        let key = PropertyKey::from("cause");
        if cx.has_property(&options, &key) {
            let cause = cx.get(&options, &key)?;
            error.insert(key, cause, Attributes::HIDDEN);
        }
    }
    Ok(Value::Object(error))
}
