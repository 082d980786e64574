//! Iteration protocol
//!
//! Compiled `for-of`, `for-in`, spread and array destructuring keep an
//! [`IteratorRecord`] in a register. Built-in iterators (arrays, strings,
//! `Map`, `Set`, `for-in` key lists) step natively when their `next` method
//! has not been replaced; anything else goes through the script-visible
//! `next()` protocol.

use std::rc::Rc;

use crate::completion::Throw;
use crate::context::ExecutionContext;
use crate::conversion::to_boolean;
use crate::object::{Attributes, Object, ObjectKind, ObjectRef};
use crate::value::{PropertyKey, Value};

/// Which part of a collection entry an iterator produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationKind {
    /// Keys (indices for arrays)
    Keys,
    /// Values
    Values,
    /// `[key, value]` pairs
    Entries,
}

/// State of a built-in iterator
#[derive(Debug, Clone)]
pub enum NativeIterator {
    /// Array or array-like, read through `length` and indices
    Array {
        /// Iterated object
        target: ObjectRef,
        /// Next index
        position: u32,
        /// What to produce
        kind: IterationKind,
    },
    /// Characters of a string
    String {
        /// Iterated string
        string: Rc<str>,
        /// Byte offset of the next character
        offset: usize,
    },
    /// Entries of a `Map` or `Set`
    Collection {
        /// Iterated collection
        target: ObjectRef,
        /// Next entry slot
        position: usize,
        /// What to produce
        kind: IterationKind,
    },
    /// Keys visited by `for-in`, captured when the loop starts
    ForIn {
        /// Iterated object
        object: ObjectRef,
        /// Keys snapshot
        keys: Vec<PropertyKey>,
        /// Next key
        position: usize,
    },
    /// Exhausted
    Done,
}

#[derive(Debug, Clone)]
enum IteratorSource {
    Native(ObjectRef),
    Script { iterator: ObjectRef, next: Value },
}

/// An open iterator held by compiled code
#[derive(Debug, Clone)]
pub struct IteratorRecord {
    source: IteratorSource,
    done: bool,
}

impl IteratorRecord {
    /// The iterator object
    pub fn iterator(&self) -> &ObjectRef {
        match &self.source {
            IteratorSource::Native(iterator) => iterator,
            IteratorSource::Script { iterator, .. } => iterator,
        }
    }

    /// Whether the iterator reported completion
    pub fn is_done(&self) -> bool {
        self.done
    }
}

enum Pending {
    Value(Value),
    Index(ObjectRef, u32, IterationKind),
    Entry(Value, Value, IterationKind),
    Key(ObjectRef, PropertyKey),
    Finished,
}

impl ExecutionContext {
    /// Allocate a built-in iterator object
    pub fn create_native_iterator(&self, state: NativeIterator) -> ObjectRef {
        ObjectRef::new(Object::new(
            ObjectKind::Iterator(state),
            Some(self.realm().native_iterator_prototype.clone()),
        ))
    }

    /// `{ value, done }` result object
    pub fn create_iter_result_object(&self, value: Value, done: bool) -> Value {
        let result = ObjectRef::new(Object::ordinary(Some(self.realm().object_prototype.clone())));
        result.insert("value", value, Attributes::ALL);
        result.insert("done", Value::Boolean(done), Attributes::ALL);
        Value::Object(result)
    }

    /// Open an iterator over `iterable` via its `Symbol.iterator` method
    pub fn get_iterator(&mut self, iterable: &Value) -> Result<ObjectRef, Throw> {
        let key = PropertyKey::Symbol(self.realm().symbol_iterator.clone());
        let method = match self.get_value(iterable, &key) {
            Ok(method) if method.is_callable() => method,
            Ok(_) | Err(_) => {
                return Err(self.type_error(format!("{} is not iterable", iterable)));
            }
        };
        let iterator = match self.call(&method, iterable.clone(), &[])? {
            Value::Object(iterator) => iterator,
            other => {
                return Err(self.type_error(format!(
                    "Result of the Symbol.iterator method is not an object: {}",
                    other
                )))
            }
        };
        let next = self.get(&iterator, &PropertyKey::from("next"))?;
        let native = matches!(iterator.borrow().kind, ObjectKind::Iterator(_))
            && next
                .as_object()
                .is_some_and(|f| f.ptr_eq(&self.realm().native_iterator_next));
        let source = if native {
            IteratorSource::Native(iterator)
        } else {
            IteratorSource::Script { iterator, next }
        };
        Ok(self.create_record(source))
    }

    /// Open the key iterator of a `for-in` loop; null and undefined
    /// produce no keys
    pub fn for_in_iterator(&mut self, value: &Value) -> Result<ObjectRef, Throw> {
        let state = match value {
            Value::Undefined | Value::Null => NativeIterator::Done,
            _ => {
                let object = self.to_object(value)?;
                let keys = self.for_in_keys(&object);
                NativeIterator::ForIn {
                    object,
                    keys,
                    position: 0,
                }
            }
        };
        let iterator = ObjectRef::new(Object::new(ObjectKind::Iterator(state), None));
        Ok(self.create_record(IteratorSource::Native(iterator)))
    }

    fn create_record(&self, source: IteratorSource) -> ObjectRef {
        let record = IteratorRecord {
            source,
            done: false,
        };
        ObjectRef::new(Object::new(ObjectKind::IteratorRecord(record), None))
    }

    /// The record stored in a register
    pub(crate) fn iterator_record(&mut self, value: &Value) -> Result<IteratorRecord, Throw> {
        let record = value.as_object().and_then(|object| match &object.borrow().kind {
            ObjectKind::IteratorRecord(record) => Some(record.clone()),
            _ => None,
        });
        record.ok_or_else(|| self.internal_error("iterator record expected"))
    }

    fn mark_done(&self, record: &Value) {
        if let Some(object) = record.as_object() {
            if let ObjectKind::IteratorRecord(record) = &mut object.borrow_mut().kind {
                record.done = true;
            }
        }
    }

    /// Advance the iterator; `None` once it is exhausted
    pub fn iterator_step(&mut self, record_value: &Value) -> Result<Option<Value>, Throw> {
        let record = self.iterator_record(record_value)?;
        if record.done {
            return Ok(None);
        }
        let step = match &record.source {
            IteratorSource::Native(iterator) => self.native_step(iterator),
            IteratorSource::Script { iterator, next } => {
                self.script_step(iterator, next)
            }
        };
        match step {
            Ok(Some(value)) => Ok(Some(value)),
            Ok(None) => {
                self.mark_done(record_value);
                Ok(None)
            }
            Err(throw) => {
                self.mark_done(record_value);
                Err(throw)
            }
        }
    }

    fn script_step(&mut self, iterator: &ObjectRef, next: &Value) -> Result<Option<Value>, Throw> {
        let result = self.call(next, Value::Object(iterator.clone()), &[])?;
        let Value::Object(result) = result else {
            return Err(self.type_error(format!("Iterator result {} is not an object", result)));
        };
        let done = self.get(&result, &PropertyKey::from("done"))?;
        if to_boolean(&done) {
            return Ok(None);
        }
        Ok(Some(self.get(&result, &PropertyKey::from("value"))?))
    }

    /// Step a built-in iterator without going through `next()`
    pub(crate) fn native_step(&mut self, iterator: &ObjectRef) -> Result<Option<Value>, Throw> {
        let pending = {
            let mut object = iterator.borrow_mut();
            let ObjectKind::Iterator(state) = &mut object.kind else {
                return Ok(None);
            };
            match state {
                NativeIterator::Array {
                    target,
                    position,
                    kind,
                } => {
                    let pending = Pending::Index(target.clone(), *position, *kind);
                    *position += 1;
                    pending
                }
                NativeIterator::String { string, offset } => {
                    match string[*offset..].chars().next() {
                        Some(c) => {
                            *offset += c.len_utf8();
                            Pending::Value(Value::from(c.to_string()))
                        }
                        None => Pending::Finished,
                    }
                }
                NativeIterator::Collection {
                    target,
                    position,
                    kind,
                } => {
                    let entry = match &target.borrow().kind {
                        ObjectKind::Map(map) | ObjectKind::Set(map) => map.entry_from(*position),
                        _ => None,
                    };
                    match entry {
                        Some((slot, key, value)) => {
                            *position = slot + 1;
                            Pending::Entry(key, value, *kind)
                        }
                        None => Pending::Finished,
                    }
                }
                NativeIterator::ForIn {
                    object,
                    keys,
                    position,
                } => match keys.get(*position) {
                    Some(key) => {
                        *position += 1;
                        Pending::Key(object.clone(), key.clone())
                    }
                    None => Pending::Finished,
                },
                NativeIterator::Done => Pending::Finished,
            }
        };

        let value = match pending {
            Pending::Value(value) => value,
            Pending::Index(target, index, kind) => {
                let length = self.get(&target, &PropertyKey::from("length"))?;
                let length = self.to_number(&length)?;
                if (index as f64) >= length {
                    return self.finish_native(iterator);
                }
                match kind {
                    IterationKind::Keys => Value::from(index),
                    IterationKind::Values => self.get(&target, &PropertyKey::from(index))?,
                    IterationKind::Entries => {
                        let value = self.get(&target, &PropertyKey::from(index))?;
                        Value::Object(self.create_array(vec![Value::from(index), value]))
                    }
                }
            }
            Pending::Entry(key, value, kind) => match kind {
                IterationKind::Keys => key,
                IterationKind::Values => value,
                IterationKind::Entries => Value::Object(self.create_array(vec![key, value])),
            },
            Pending::Key(object, key) => {
                // Keys deleted during the loop are skipped
                if !self.has_property(&object, &key) {
                    return self.native_step(iterator);
                }
                key.to_value()
            }
            Pending::Finished => return self.finish_native(iterator),
        };
        Ok(Some(value))
    }

    fn finish_native(&mut self, iterator: &ObjectRef) -> Result<Option<Value>, Throw> {
        if let ObjectKind::Iterator(state) = &mut iterator.borrow_mut().kind {
            *state = NativeIterator::Done;
        }
        Ok(None)
    }

    /// Close the iterator early by calling its `return` method, unless it
    /// already finished
    pub fn iterator_close(&mut self, record_value: &Value) -> Result<(), Throw> {
        let record = self.iterator_record(record_value)?;
        if record.done {
            return Ok(());
        }
        self.mark_done(record_value);
        let IteratorSource::Script { iterator, .. } = record.source else {
            return Ok(());
        };
        let iterator = Value::Object(iterator);
        if let Some(method) = self.get_method(&iterator, &PropertyKey::from("return"))? {
            let result = self.call(&method, iterator, &[])?;
            if !matches!(result, Value::Object(_)) {
                return Err(self.type_error(format!(
                    "Iterator result {} is not an object",
                    result
                )));
            }
        }
        Ok(())
    }

    /// Drain an iterable into a vector
    pub fn iterate_to_vec(&mut self, iterable: &Value) -> Result<Vec<Value>, Throw> {
        if let Value::Object(object) = iterable {
            if let Some(values) = self.plain_array_values(object) {
                return Ok(values);
            }
        }
        let record = Value::Object(self.get_iterator(iterable)?);
        let mut values = Vec::new();
        while let Some(value) = self.iterator_step(&record)? {
            values.push(value);
        }
        Ok(values)
    }

    /// Elements of an array whose iteration behavior is the built-in one
    fn plain_array_values(&mut self, object: &ObjectRef) -> Option<Vec<Value>> {
        let values = object.borrow().as_array().map(|array| array.to_vec())?;
        let key = PropertyKey::Symbol(self.realm().symbol_iterator.clone());
        let method = self.get(object, &key).ok()?;
        let builtin = method
            .as_object()
            .is_some_and(|f| f.ptr_eq(&self.realm().array_values));
        let prototype_intact = object
            .prototype()
            .is_some_and(|p| p.ptr_eq(&self.realm().array_prototype));
        (builtin && prototype_intact && !values.iter().any(Value::is_undefined)).then_some(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DEFAULT_MAX_CALL_DEPTH;

    #[test]
    fn test_array_iteration() {
        let mut cx = ExecutionContext::new(DEFAULT_MAX_CALL_DEPTH);
        let array = Value::Object(cx.create_array(vec![Value::from(1), Value::from(2)]));
        let record = Value::Object(cx.get_iterator(&array).unwrap());
        assert_eq!(cx.iterator_step(&record).unwrap(), Some(Value::from(1)));
        assert_eq!(cx.iterator_step(&record).unwrap(), Some(Value::from(2)));
        assert_eq!(cx.iterator_step(&record).unwrap(), None);
        assert_eq!(cx.iterator_step(&record).unwrap(), None);
    }

    #[test]
    fn test_string_iteration_by_character() {
        let mut cx = ExecutionContext::new(DEFAULT_MAX_CALL_DEPTH);
        let values = cx.iterate_to_vec(&Value::from("aé😀")).unwrap();
        assert_eq!(values, vec![Value::from("a"), Value::from("é"), Value::from("😀")]);
    }

    #[test]
    fn test_non_iterable_is_a_type_error() {
        let mut cx = ExecutionContext::new(DEFAULT_MAX_CALL_DEPTH);
        let error = cx.get_iterator(&Value::from(5)).unwrap_err();
        assert_eq!(cx.to_js_error(&error).message, "5 is not iterable");
    }

    #[test]
    fn test_for_in_skips_deleted_keys() {
        let mut cx = ExecutionContext::new(DEFAULT_MAX_CALL_DEPTH);
        let object = cx.create_object();
        object.insert("a", Value::from(1), Attributes::ALL);
        object.insert("b", Value::from(2), Attributes::ALL);
        let record = Value::Object(cx.for_in_iterator(&Value::Object(object.clone())).unwrap());
        assert_eq!(cx.iterator_step(&record).unwrap(), Some(Value::from("a")));
        object.borrow_mut().delete_own(&"b".into());
        assert_eq!(cx.iterator_step(&record).unwrap(), None);
    }

    #[test]
    fn test_for_in_over_null_is_empty() {
        let mut cx = ExecutionContext::new(DEFAULT_MAX_CALL_DEPTH);
        let record = Value::Object(cx.for_in_iterator(&Value::Null).unwrap());
        assert_eq!(cx.iterator_step(&record).unwrap(), None);
    }
}
