//! `Map`, `Set` and `WeakMap`

use std::cell::RefCell;
use std::rc::Rc;

use crate::collections::{MapStorage, WeakTable};
use crate::completion::Throw;
use crate::context::ExecutionContext;
use crate::iteration::{IterationKind, NativeIterator};
use crate::object::{Attributes, Object, ObjectKind, ObjectRef};
use crate::realm::Realm;
use crate::value::{PropertyKey, Value};

use super::{argument, define_constructor, define_getter, define_method};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Collection {
    Map,
    Set,
}

impl Collection {
    fn name(self) -> &'static str {
        match self {
            Collection::Map => "Map",
            Collection::Set => "Set",
        }
    }
}

/// Run `f` on the storage of a Map or Set receiver
fn with_storage<R>(
    cx: &mut ExecutionContext,
    this: &Value,
    collection: Collection,
    method: &str,
    f: impl FnOnce(&mut MapStorage) -> R,
) -> Result<R, Throw> {
    if let Value::Object(object) = this {
        match (&mut object.borrow_mut().kind, collection) {
            (ObjectKind::Map(storage), Collection::Map) | (ObjectKind::Set(storage), Collection::Set) => {
                return Ok(f(storage))
            }
            _ => {}
        }
    }
    Err(cx.type_error(format!(
        "{}.prototype.{} requires a {}",
        collection.name(),
        method,
        collection.name()
    )))
}

fn collection_iterator(
    cx: &mut ExecutionContext,
    this: &Value,
    collection: Collection,
    method: &str,
    kind: IterationKind,
) -> Result<Value, Throw> {
    with_storage(cx, this, collection, method, |_| ())?;
    let Value::Object(target) = this else {
        return Ok(Value::Undefined);
    };
    Ok(Value::Object(cx.create_native_iterator(NativeIterator::Collection {
        target: target.clone(),
        position: 0,
        kind,
    })))
}

/// Visit live entries in order, observing entries added during the walk
fn for_each_entry(
    cx: &mut ExecutionContext,
    this: &Value,
    collection: Collection,
    args: &[Value],
) -> Result<Value, Throw> {
    let callback = argument(args, 0);
    if !callback.is_callable() {
        return Err(cx.type_error(format!("{} is not a function", callback)));
    }
    let receiver = argument(args, 1);
    let mut position = 0;
    while let Some((slot, key, value)) =
        with_storage(cx, this, collection, "forEach", |storage| storage.entry_from(position))?
    {
        position = slot + 1;
        cx.call(&callback, receiver.clone(), &[value, key, this.clone()])?;
    }
    Ok(Value::Undefined)
}

fn require_new(cx: &mut ExecutionContext, name: &str) -> Throw {
    cx.type_error(format!("Constructor {} requires 'new'", name))
}

pub(crate) fn install(realm: &Realm) {
    install_map(realm);
    install_set(realm);
    install_weakmap(realm);
}

fn install_map(realm: &Realm) {
    let prototype = &realm.map_prototype;
    define_constructor(
        realm,
        "Map",
        0,
        prototype,
        |cx, _this, _args| Err(require_new(cx, "Map")),
        |cx, args, new_target| {
            let fallback = cx.realm().map_prototype.clone();
            let prototype = cx.prototype_from_constructor(new_target, fallback)?;
            let mut storage = MapStorage::new();
            let iterable = argument(args, 0);
            if !iterable.is_nullish() {
                for entry in cx.iterate_to_vec(&iterable)? {
                    let Value::Object(entry) = entry else {
                        return Err(cx.type_error(format!(
                            "Iterator value {} is not an entry object",
                            entry
                        )));
                    };
                    let key = cx.get(&entry, &PropertyKey::from(0u32))?;
                    let value = cx.get(&entry, &PropertyKey::from(1u32))?;
                    storage.set(key, value);
                }
            }
            Ok(Value::Object(ObjectRef::new(Object::new(
                ObjectKind::Map(storage),
                Some(prototype),
            ))))
        },
    );

    let map = Collection::Map;
    define_method(realm, prototype, "get", 1, move |cx, this, args| {
        let key = argument(args, 0);
        with_storage(cx, this, map, "get", |s| s.get(&key).cloned().unwrap_or_default())
    });
    define_method(realm, prototype, "set", 2, move |cx, this, args| {
        let (key, value) = (argument(args, 0), argument(args, 1));
        with_storage(cx, this, map, "set", |s| s.set(key, value))?;
        Ok(this.clone())
    });
    define_method(realm, prototype, "has", 1, move |cx, this, args| {
        let key = argument(args, 0);
        with_storage(cx, this, map, "has", |s| Value::Boolean(s.has(&key)))
    });
    define_method(realm, prototype, "delete", 1, move |cx, this, args| {
        let key = argument(args, 0);
        with_storage(cx, this, map, "delete", |s| Value::Boolean(s.delete(&key)))
    });
    define_method(realm, prototype, "clear", 0, move |cx, this, _args| {
        with_storage(cx, this, map, "clear", MapStorage::clear)?;
        Ok(Value::Undefined)
    });
    define_method(realm, prototype, "forEach", 1, move |cx, this, args| {
        for_each_entry(cx, this, map, args)
    });
    define_getter(realm, prototype, "size", move |cx, this, _args| {
        with_storage(cx, this, map, "size", |s| Value::from(s.len()))
    });
    define_method(realm, prototype, "keys", 0, move |cx, this, _args| {
        collection_iterator(cx, this, map, "keys", IterationKind::Keys)
    });
    define_method(realm, prototype, "values", 0, move |cx, this, _args| {
        collection_iterator(cx, this, map, "values", IterationKind::Values)
    });
    let entries = define_method(realm, prototype, "entries", 0, move |cx, this, _args| {
        collection_iterator(cx, this, map, "entries", IterationKind::Entries)
    });
    prototype.insert(realm.symbol_iterator.clone(), Value::Object(entries), Attributes::HIDDEN);
}

fn install_set(realm: &Realm) {
    let prototype = &realm.set_prototype;
    define_constructor(
        realm,
        "Set",
        0,
        prototype,
        |cx, _this, _args| Err(require_new(cx, "Set")),
        |cx, args, new_target| {
            let fallback = cx.realm().set_prototype.clone();
            let prototype = cx.prototype_from_constructor(new_target, fallback)?;
            let mut storage = MapStorage::new();
            let iterable = argument(args, 0);
            if !iterable.is_nullish() {
                for value in cx.iterate_to_vec(&iterable)? {
                    storage.set(value.clone(), value);
                }
            }
            Ok(Value::Object(ObjectRef::new(Object::new(
                ObjectKind::Set(storage),
                Some(prototype),
            ))))
        },
    );

    let set = Collection::Set;
    define_method(realm, prototype, "add", 1, move |cx, this, args| {
        let value = argument(args, 0);
        with_storage(cx, this, set, "add", |s| s.set(value.clone(), value))?;
        Ok(this.clone())
    });
    define_method(realm, prototype, "has", 1, move |cx, this, args| {
        let value = argument(args, 0);
        with_storage(cx, this, set, "has", |s| Value::Boolean(s.has(&value)))
    });
    define_method(realm, prototype, "delete", 1, move |cx, this, args| {
        let value = argument(args, 0);
        with_storage(cx, this, set, "delete", |s| Value::Boolean(s.delete(&value)))
    });
    define_method(realm, prototype, "clear", 0, move |cx, this, _args| {
        with_storage(cx, this, set, "clear", MapStorage::clear)?;
        Ok(Value::Undefined)
    });
    define_method(realm, prototype, "forEach", 1, move |cx, this, args| {
        for_each_entry(cx, this, set, args)
    });
    define_getter(realm, prototype, "size", move |cx, this, _args| {
        with_storage(cx, this, set, "size", |s| Value::from(s.len()))
    });
    define_method(realm, prototype, "entries", 0, move |cx, this, _args| {
        collection_iterator(cx, this, set, "entries", IterationKind::Entries)
    });
    let values = define_method(realm, prototype, "values", 0, move |cx, this, _args| {
        collection_iterator(cx, this, set, "values", IterationKind::Values)
    });
    prototype.insert("keys", Value::Object(values.clone()), Attributes::HIDDEN);
    prototype.insert(realm.symbol_iterator.clone(), Value::Object(values), Attributes::HIDDEN);
}

fn weak_table(
    cx: &mut ExecutionContext,
    this: &Value,
    method: &str,
) -> Result<Rc<RefCell<WeakTable>>, Throw> {
    let table = match this {
        Value::Object(object) => match &object.borrow().kind {
            ObjectKind::WeakMap(table) => Some(table.clone()),
            _ => None,
        },
        _ => None,
    };
    table.ok_or_else(|| cx.type_error(format!("WeakMap.prototype.{} requires a WeakMap", method)))
}

fn install_weakmap(realm: &Realm) {
    let prototype = &realm.weakmap_prototype;
    define_constructor(
        realm,
        "WeakMap",
        0,
        prototype,
        |cx, _this, _args| Err(require_new(cx, "WeakMap")),
        |cx, args, new_target| {
            let fallback = cx.realm().weakmap_prototype.clone();
            let prototype = cx.prototype_from_constructor(new_target, fallback)?;
            let table = Rc::new(RefCell::new(WeakTable::new()));
            let iterable = argument(args, 0);
            if !iterable.is_nullish() {
                for entry in cx.iterate_to_vec(&iterable)? {
                    let Value::Object(entry) = entry else {
                        return Err(cx.type_error(format!(
                            "Iterator value {} is not an entry object",
                            entry
                        )));
                    };
                    let key = cx.get(&entry, &PropertyKey::from(0u32))?;
                    let value = cx.get(&entry, &PropertyKey::from(1u32))?;
                    weak_set(cx, &table, &key, value)?;
                }
            }
            Ok(Value::Object(ObjectRef::new(Object::new(
                ObjectKind::WeakMap(table),
                Some(prototype),
            ))))
        },
    );

    define_method(realm, prototype, "get", 1, |cx, this, args| {
        let table = weak_table(cx, this, "get")?;
        Ok(match argument(args, 0) {
            Value::Object(key) => table.borrow().get(&key).unwrap_or_default(),
            _ => Value::Undefined,
        })
    });
    define_method(realm, prototype, "set", 2, |cx, this, args| {
        let table = weak_table(cx, this, "set")?;
        weak_set(cx, &table, &argument(args, 0), argument(args, 1))?;
        Ok(this.clone())
    });
    define_method(realm, prototype, "has", 1, |cx, this, args| {
        let table = weak_table(cx, this, "has")?;
        Ok(Value::Boolean(match argument(args, 0) {
            Value::Object(key) => table.borrow().has(&key),
            _ => false,
        }))
    });
    define_method(realm, prototype, "delete", 1, |cx, this, args| {
        let table = weak_table(cx, this, "delete")?;
        let Value::Object(key) = argument(args, 0) else {
            return Ok(Value::Boolean(false));
        };
        let removed = table.borrow_mut().delete(&key);
        Ok(Value::Boolean(removed.is_some()))
    });
}

fn weak_set(
    cx: &mut ExecutionContext,
    table: &Rc<RefCell<WeakTable>>,
    key: &Value,
    value: Value,
) -> Result<(), Throw> {
    let Value::Object(key) = key else {
        return Err(cx.type_error(format!("Invalid value used as weak map key: {}", key)));
    };
    key.borrow_mut().watch(table);
    let replaced = table.borrow_mut().set(key, value);
    drop(replaced);
    Ok(())
}
