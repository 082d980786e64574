//! Iterator prototypes and the generator prototype

use crate::call_frame::Resumption;
use crate::completion::IterResult;
use crate::context::ExecutionContext;
use crate::function::{create_native_function, native_fn};
use crate::object::{Attributes, ObjectKind, ObjectRef};
use crate::realm::Realm;
use crate::value::{PropertyKey, Value};

use super::{argument, define_method, define_symbol_method};

/// `next` of built-in iterators; also the marker for the native fast path
pub(crate) fn native_next(function_prototype: &ObjectRef) -> ObjectRef {
    create_native_function(
        function_prototype,
        "next",
        0,
        native_fn(|cx, this, _args| {
            let iterator = match this {
                Value::Object(object) if matches!(object.borrow().kind, ObjectKind::Iterator(_)) => {
                    object.clone()
                }
                _ => {
                    return Err(cx.type_error(format!(
                        "next method called on incompatible receiver {}",
                        this
                    )))
                }
            };
            Ok(match cx.native_step(&iterator)? {
                Some(value) => cx.create_iter_result_object(value, false),
                None => cx.create_iter_result_object(Value::Undefined, true),
            })
        }),
        None,
    )
}

pub(crate) fn install(realm: &Realm) {
    define_symbol_method(
        realm,
        &realm.iterator_prototype,
        PropertyKey::Symbol(realm.symbol_iterator.clone()),
        "[Symbol.iterator]",
        0,
        |_cx, this, _args| Ok(this.clone()),
    );

    realm.native_iterator_prototype.insert(
        "next",
        Value::Object(realm.native_iterator_next.clone()),
        Attributes::HIDDEN,
    );

    let generator = &realm.generator_prototype;
    define_method(realm, generator, "next", 1, |cx, this, args| {
        let result = cx.generator_resume(this, Resumption::Next(argument(args, 0)))?;
        Ok(iter_result_object(cx, result))
    });
    define_method(realm, generator, "return", 1, |cx, this, args| {
        let result = cx.generator_resume(this, Resumption::Return(argument(args, 0)))?;
        Ok(iter_result_object(cx, result))
    });
    define_method(realm, generator, "throw", 1, |cx, this, args| {
        let result = cx.generator_resume(this, Resumption::Throw(argument(args, 0)))?;
        Ok(iter_result_object(cx, result))
    });
}

fn iter_result_object(cx: &mut ExecutionContext, result: IterResult) -> Value {
    cx.create_iter_result_object(result.value, result.done)
}
