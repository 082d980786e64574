//! Property access protocol
//!
//! `get` walks the prototype chain and runs getters; `set` finds the
//! first slot along the chain to decide between running a setter, failing
//! on a read-only slot, and creating or updating an own data property on
//! the receiver. Failures return `false` and become a TypeError only in
//! strict mode code.

use std::collections::HashSet;

use crate::completion::Throw;
use crate::context::ExecutionContext;
use crate::object::{Attributes, ObjectRef, Property};
use crate::value::{PropertyKey, Value};

impl ExecutionContext {
    /// `object[key]`
    pub fn get(&mut self, object: &ObjectRef, key: &PropertyKey) -> Result<Value, Throw> {
        self.get_with_receiver(object, key, &Value::Object(object.clone()))
    }

    /// Property lookup starting at `object` with getters receiving
    /// `receiver` as `this`
    pub fn get_with_receiver(
        &mut self,
        object: &ObjectRef,
        key: &PropertyKey,
        receiver: &Value,
    ) -> Result<Value, Throw> {
        let mut cursor = Some(object.clone());
        while let Some(current) = cursor {
            match current.get_own_property(key) {
                Some(Property::Data { value, .. }) => return Ok(value),
                Some(Property::Accessor { get: Some(getter), .. }) => {
                    return self.call(&Value::Object(getter), receiver.clone(), &[]);
                }
                Some(Property::Accessor { get: None, .. }) => return Ok(Value::Undefined),
                None => cursor = current.prototype(),
            }
        }
        Ok(Value::Undefined)
    }

    /// Property read on any value; primitives read through their
    /// prototype
    pub fn get_value(&mut self, base: &Value, key: &PropertyKey) -> Result<Value, Throw> {
        let prototype = match base {
            Value::Object(object) => return self.get(object, key),
            Value::Undefined | Value::Null => {
                return Err(self.type_error(format!(
                    "Cannot read properties of {} (reading '{}')",
                    base, key
                )))
            }
            Value::String(s) => {
                if key.is("length") {
                    return Ok(Value::from(s.chars().count()));
                }
                if let Some(index) = key.array_index() {
                    return Ok(s
                        .chars()
                        .nth(index as usize)
                        .map(|c| Value::from(c.to_string()))
                        .unwrap_or_default());
                }
                self.realm().string_prototype.clone()
            }
            Value::Number(_) => self.realm().number_prototype.clone(),
            Value::Boolean(_) => self.realm().boolean_prototype.clone(),
            Value::Symbol(_) => self.realm().symbol_prototype.clone(),
        };
        self.get_with_receiver(&prototype, key, base)
    }

    /// `object[key] = value`; in strict mode a refused assignment throws
    pub fn set(
        &mut self,
        object: &ObjectRef,
        key: PropertyKey,
        value: Value,
        strict: bool,
    ) -> Result<(), Throw> {
        let receiver = Value::Object(object.clone());
        let done = self.ordinary_set(object, key.clone(), value, &receiver)?;
        if !done && strict {
            return Err(self.type_error(format!(
                "Cannot assign to read only property '{}' of object",
                key
            )));
        }
        Ok(())
    }

    /// Assignment on any value
    pub fn put_value(
        &mut self,
        base: &Value,
        key: PropertyKey,
        value: Value,
        strict: bool,
    ) -> Result<(), Throw> {
        let prototype = match base {
            Value::Object(object) => return self.set(object, key, value, strict),
            Value::Undefined | Value::Null => {
                return Err(self.type_error(format!(
                    "Cannot set properties of {} (setting '{}')",
                    base, key
                )))
            }
            Value::String(_) => self.realm().string_prototype.clone(),
            Value::Number(_) => self.realm().number_prototype.clone(),
            Value::Boolean(_) => self.realm().boolean_prototype.clone(),
            Value::Symbol(_) => self.realm().symbol_prototype.clone(),
        };
        let done = self.ordinary_set(&prototype, key.clone(), value, base)?;
        if !done && strict {
            return Err(self.type_error(format!(
                "Cannot create property '{}' on {} '{}'",
                key,
                base.type_of(),
                base
            )));
        }
        Ok(())
    }

    fn ordinary_set(
        &mut self,
        object: &ObjectRef,
        key: PropertyKey,
        value: Value,
        receiver: &Value,
    ) -> Result<bool, Throw> {
        let mut cursor = Some(object.clone());
        while let Some(current) = cursor {
            match current.get_own_property(&key) {
                Some(Property::Data { attributes, .. }) => {
                    if !attributes.writable {
                        return Ok(false);
                    }
                    break;
                }
                Some(Property::Accessor { set: Some(setter), .. }) => {
                    self.call(&Value::Object(setter), receiver.clone(), &[value])?;
                    return Ok(true);
                }
                Some(Property::Accessor { set: None, .. }) => return Ok(false),
                None => cursor = current.prototype(),
            }
        }

        let Value::Object(receiver) = receiver else {
            return Ok(false);
        };
        if key.is("length") && receiver.is_array() {
            return self.set_array_length(receiver, &value);
        }
        match receiver.get_own_property(&key) {
            Some(Property::Data { attributes, .. }) => {
                if !attributes.writable {
                    return Ok(false);
                }
                Ok(receiver.define_own_property(key, Property::data(value, attributes)))
            }
            Some(Property::Accessor { .. }) => Ok(false),
            None => Ok(receiver.define_own_property(key, Property::data(value, Attributes::ALL))),
        }
    }

    fn set_array_length(&mut self, array: &ObjectRef, value: &Value) -> Result<bool, Throw> {
        let n = self.to_number(value)?;
        if n < 0.0 || n.fract() != 0.0 || n >= u32::MAX as f64 + 1.0 {
            return Err(self.range_error("Invalid array length"));
        }
        Ok(array.define_own_property(
            PropertyKey::from("length"),
            Property::data(Value::Number(n), Attributes::HIDDEN),
        ))
    }

    /// `delete base[key]`
    pub fn delete_property(
        &mut self,
        base: &Value,
        key: &PropertyKey,
        strict: bool,
    ) -> Result<bool, Throw> {
        match base {
            Value::Object(object) => {
                let deleted = object.borrow_mut().delete_own(key);
                if !deleted && strict {
                    return Err(self.type_error(format!(
                        "Cannot delete property '{}' of {}",
                        key, object
                    )));
                }
                Ok(deleted)
            }
            Value::Undefined | Value::Null => {
                Err(self.type_error("Cannot convert undefined or null to object"))
            }
            Value::String(s) => {
                let exotic = key.is("length")
                    || key
                        .array_index()
                        .is_some_and(|i| (i as usize) < s.chars().count());
                if exotic && strict {
                    return Err(self.type_error(format!(
                        "Cannot delete property '{}' of [object String]",
                        key
                    )));
                }
                Ok(!exotic)
            }
            _ => Ok(true),
        }
    }

    /// Whether `key` is found on `object` or its prototype chain
    pub fn has_property(&self, object: &ObjectRef, key: &PropertyKey) -> bool {
        let mut cursor = Some(object.clone());
        while let Some(current) = cursor {
            if current.has_own_property(key) {
                return true;
            }
            cursor = current.prototype();
        }
        false
    }

    /// Define a data property, throwing when the object refuses it
    pub fn define_data_property(
        &mut self,
        object: &ObjectRef,
        key: PropertyKey,
        value: Value,
        attributes: Attributes,
    ) -> Result<(), Throw> {
        if object.define_own_property(key.clone(), Property::data(value, attributes)) {
            Ok(())
        } else {
            Err(self.type_error(format!("Cannot redefine property: {}", key)))
        }
    }

    /// Define one half of an accessor pair, keeping the other half
    pub fn define_accessor(
        &mut self,
        object: &ObjectRef,
        key: PropertyKey,
        getter: Option<ObjectRef>,
        setter: Option<ObjectRef>,
        enumerable: bool,
    ) -> Result<(), Throw> {
        let (get, set) = match object.get_own_property(&key) {
            Some(Property::Accessor { get, set, .. }) => {
                (getter.or(get), setter.or(set))
            }
            _ => (getter, setter),
        };
        let property = Property::Accessor {
            get,
            set,
            enumerable,
            configurable: true,
        };
        if object.define_own_property(key.clone(), property) {
            Ok(())
        } else {
            Err(self.type_error(format!("Cannot redefine property: {}", key)))
        }
    }

    /// The callable at `value[key]`, `None` when undefined or null
    pub fn get_method(&mut self, value: &Value, key: &PropertyKey) -> Result<Option<Value>, Throw> {
        let method = self.get_value(value, key)?;
        if method.is_nullish() {
            return Ok(None);
        }
        if !method.is_callable() {
            return Err(self.type_error(format!("{} is not a function", method)));
        }
        Ok(Some(method))
    }

    /// String keys visited by `for-in`: own enumerable keys first, then
    /// inherited ones not shadowed by a key already seen
    pub fn for_in_keys(&self, object: &ObjectRef) -> Vec<PropertyKey> {
        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        let mut cursor = Some(object.clone());
        while let Some(current) = cursor {
            let borrowed = current.borrow();
            for key in borrowed.own_keys() {
                if !matches!(key, PropertyKey::String(_)) || !seen.insert(key.clone()) {
                    continue;
                }
                if borrowed
                    .get_own_property(&key)
                    .is_some_and(|p| p.enumerable())
                {
                    keys.push(key);
                }
            }
            cursor = borrowed.prototype().cloned();
        }
        keys
    }

    /// Copy own enumerable properties of `source` onto `target`, skipping
    /// `excluded` keys; string sources contribute their characters
    pub fn copy_data_properties(
        &mut self,
        target: &ObjectRef,
        source: &Value,
        excluded: &[PropertyKey],
    ) -> Result<(), Throw> {
        let source = match source {
            Value::Undefined | Value::Null => return Ok(()),
            Value::Object(object) => object.clone(),
            Value::String(_) => self.to_object(source)?,
            _ => return Ok(()),
        };
        for key in source.own_keys() {
            if excluded.contains(&key) {
                continue;
            }
            let enumerable = source
                .get_own_property(&key)
                .is_some_and(|p| p.enumerable());
            if enumerable {
                let value = self.get(&source, &key)?;
                target.define_own_property(key, Property::data(value, Attributes::ALL));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DEFAULT_MAX_CALL_DEPTH;
    use crate::object::Object;

    fn context() -> ExecutionContext {
        ExecutionContext::new(DEFAULT_MAX_CALL_DEPTH)
    }

    #[test]
    fn test_inherited_properties_are_visible_but_not_own() {
        let mut cx = context();
        let proto = ObjectRef::new(Object::ordinary(None));
        proto.insert("greeting", Value::from("hi"), Attributes::ALL);
        let instance = ObjectRef::new(Object::ordinary(Some(proto)));
        let key = PropertyKey::from("greeting");
        assert_eq!(cx.get(&instance, &key).unwrap(), Value::from("hi"));
        assert!(!instance.has_own_property(&key));
        assert!(instance.own_keys().is_empty());
        assert!(cx.has_property(&instance, &key));
    }

    #[test]
    fn test_assignment_shadows_prototype() {
        let mut cx = context();
        let proto = ObjectRef::new(Object::ordinary(None));
        proto.insert("x", Value::from(1), Attributes::ALL);
        let instance = ObjectRef::new(Object::ordinary(Some(proto.clone())));
        cx.set(&instance, "x".into(), Value::from(2), true).unwrap();
        assert_eq!(instance.get_own_value(&"x".into()), Some(Value::from(2)));
        assert_eq!(proto.get_own_value(&"x".into()), Some(Value::from(1)));
    }

    #[test]
    fn test_read_only_assignment() {
        let mut cx = context();
        let object = ObjectRef::new(Object::ordinary(None));
        object.insert("fixed", Value::from(1), Attributes::FROZEN);
        cx.set(&object, "fixed".into(), Value::from(2), false).unwrap();
        assert_eq!(object.get_own_value(&"fixed".into()), Some(Value::from(1)));
        assert!(cx.set(&object, "fixed".into(), Value::from(2), true).is_err());
    }

    #[test]
    fn test_inherited_read_only_blocks_assignment() {
        let mut cx = context();
        let proto = ObjectRef::new(Object::ordinary(None));
        proto.insert("fixed", Value::from(1), Attributes::FROZEN);
        let instance = ObjectRef::new(Object::ordinary(Some(proto)));
        assert!(cx.set(&instance, "fixed".into(), Value::from(2), true).is_err());
        assert!(!instance.has_own_property(&"fixed".into()));
    }

    #[test]
    fn test_primitive_reads() {
        let mut cx = context();
        let s = Value::from("héllo");
        assert_eq!(cx.get_value(&s, &"length".into()).unwrap(), Value::from(5));
        assert_eq!(cx.get_value(&s, &"1".into()).unwrap(), Value::from("é"));
        assert!(cx.get_value(&Value::Undefined, &"x".into()).is_err());
    }

    #[test]
    fn test_for_in_keys_skip_shadowed() {
        let cx = context();
        let proto = ObjectRef::new(Object::ordinary(None));
        proto.insert("a", Value::from(1), Attributes::ALL);
        proto.insert("b", Value::from(2), Attributes::ALL);
        let instance = ObjectRef::new(Object::ordinary(Some(proto)));
        instance.insert("b", Value::from(3), Attributes::HIDDEN);
        instance.insert("c", Value::from(4), Attributes::ALL);
        let keys: Vec<String> = cx.for_in_keys(&instance).iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["c", "a"]);
    }
}
