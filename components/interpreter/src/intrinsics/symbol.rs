//! `Symbol` function and `Symbol.prototype`

use crate::completion::Throw;
use crate::context::ExecutionContext;
use crate::function::{create_native_function, native_fn};
use crate::object::{Attributes, ObjectKind};
use crate::realm::Realm;
use crate::value::{Symbol, Value};

use super::{define_getter, define_method};

pub(crate) fn install(realm: &Realm) {
    let prototype = &realm.symbol_prototype;
    let constructor = create_native_function(
        &realm.function_prototype,
        "Symbol",
        0,
        native_fn(|cx, _this, args| {
            let description = match args.first() {
                None | Some(Value::Undefined) => None,
                Some(value) => Some(cx.to_string(value)?),
            };
            Ok(Value::Symbol(Symbol::new(description.as_deref())))
        }),
        None,
    );
    constructor.insert("prototype", Value::Object(prototype.clone()), Attributes::FROZEN);
    constructor.insert(
        "iterator",
        Value::Symbol(realm.symbol_iterator.clone()),
        Attributes::FROZEN,
    );
    prototype.insert("constructor", Value::Object(constructor.clone()), Attributes::HIDDEN);
    realm
        .global
        .insert("Symbol", Value::Object(constructor), Attributes::HIDDEN);

    define_method(realm, prototype, "toString", 0, |cx, this, _args| {
        let symbol = this_symbol_value(cx, this)?;
        Ok(Value::from(symbol.to_string()))
    });
    define_method(realm, prototype, "valueOf", 0, |cx, this, _args| {
        this_symbol_value(cx, this).map(Value::Symbol)
    });
    define_getter(realm, prototype, "description", |cx, this, _args| {
        let symbol = this_symbol_value(cx, this)?;
        Ok(symbol.description().map(Value::from).unwrap_or_default())
    });
}

fn this_symbol_value(cx: &mut ExecutionContext, this: &Value) -> Result<Symbol, Throw> {
    let symbol = match this {
        Value::Symbol(symbol) => Some(symbol.clone()),
        Value::Object(object) => match &object.borrow().kind {
            ObjectKind::Primitive(Value::Symbol(symbol)) => Some(symbol.clone()),
            _ => None,
        },
        _ => None,
    };
    symbol.ok_or_else(|| cx.type_error("Symbol.prototype method called on incompatible receiver"))
}
