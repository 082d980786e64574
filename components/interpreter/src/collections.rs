//! Storage behind `Map`, `Set` and `WeakMap`
//!
//! Keys are compared with SameValueZero after normalizing `-0` to `+0`,
//! which is what key membership in the built-in collections observes.
//! Entries are kept in insertion order with tombstones for deleted slots,
//! so iterators that hold a position stay valid while the collection is
//! mutated.
//!
//! A [`WeakTable`] indexes entries by the key object's identity without
//! holding the key. Every key object records the tables it belongs to and
//! evicts itself from them when it is dropped, so entries disappear exactly
//! when their key is no longer strongly reachable. A value that refers back
//! to its own key keeps that key alive.

use std::collections::HashMap;
use std::rc::Rc;

use crate::object::{ObjectRef, WeakObjectRef};
use crate::value::{Symbol, Value};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum MapKey {
    Undefined,
    Null,
    Boolean(bool),
    Number(u64),
    String(Rc<str>),
    Symbol(Symbol),
    Object(usize),
}

impl MapKey {
    fn of(value: &Value) -> Self {
        match value {
            Value::Undefined => MapKey::Undefined,
            Value::Null => MapKey::Null,
            Value::Boolean(b) => MapKey::Boolean(*b),
            Value::Number(n) if n.is_nan() => MapKey::Number(f64::NAN.to_bits()),
            Value::Number(n) => MapKey::Number((*n + 0.0).to_bits()),
            Value::String(s) => MapKey::String(s.clone()),
            Value::Symbol(symbol) => MapKey::Symbol(symbol.clone()),
            Value::Object(object) => MapKey::Object(object.id()),
        }
    }
}

/// `-0` becomes `+0`; everything else is unchanged
fn normalize(value: Value) -> Value {
    match value {
        Value::Number(n) if n == 0.0 => Value::Number(0.0),
        other => other,
    }
}

/// Ordered key/value storage for `Map` (and `Set`, with undefined values)
#[derive(Debug, Clone, Default)]
pub struct MapStorage {
    entries: Vec<Option<(Value, Value)>>,
    index: HashMap<MapKey, usize>,
}

impl MapStorage {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether there are no live entries
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Value stored for `key`
    pub fn get(&self, key: &Value) -> Option<&Value> {
        let slot = *self.index.get(&MapKey::of(key))?;
        self.entries[slot].as_ref().map(|(_, v)| v)
    }

    /// Whether `key` is present
    pub fn has(&self, key: &Value) -> bool {
        self.index.contains_key(&MapKey::of(key))
    }

    /// Insert or update; an updated key keeps its position
    pub fn set(&mut self, key: Value, value: Value) {
        let map_key = MapKey::of(&key);
        match self.index.get(&map_key) {
            Some(&slot) => {
                if let Some(entry) = self.entries[slot].as_mut() {
                    entry.1 = value;
                }
            }
            None => {
                self.index.insert(map_key, self.entries.len());
                self.entries.push(Some((normalize(key), value)));
            }
        }
    }

    /// Remove `key`; false when it was absent
    pub fn delete(&mut self, key: &Value) -> bool {
        match self.index.remove(&MapKey::of(key)) {
            Some(slot) => {
                self.entries[slot] = None;
                true
            }
            None => false,
        }
    }

    /// Remove every entry
    pub fn clear(&mut self) {
        for entry in &mut self.entries {
            *entry = None;
        }
        self.index.clear();
    }

    /// The first live entry at or after `position`, with its slot
    pub fn entry_from(&self, position: usize) -> Option<(usize, Value, Value)> {
        self.entries
            .iter()
            .enumerate()
            .skip(position)
            .find_map(|(slot, entry)| {
                entry
                    .as_ref()
                    .map(|(k, v)| (slot, k.clone(), v.clone()))
            })
    }

    /// Live entries in insertion order
    pub fn entries(&self) -> Vec<(Value, Value)> {
        self.entries.iter().flatten().cloned().collect()
    }
}

/// Identity-keyed table behind `WeakMap`
#[derive(Debug, Default)]
pub struct WeakTable {
    entries: HashMap<usize, (WeakObjectRef, Value)>,
}

impl WeakTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Value stored for `key`
    pub fn get(&self, key: &ObjectRef) -> Option<Value> {
        self.entries.get(&key.id()).map(|(_, v)| v.clone())
    }

    /// Whether `key` has an entry
    pub fn has(&self, key: &ObjectRef) -> bool {
        self.entries.contains_key(&key.id())
    }

    /// Insert or update the entry for `key`, returning the replaced value.
    /// The caller registers the table with the key object so the entry is
    /// evicted on drop.
    ///
    /// Values handed back by `set`, `delete` and `evict` must be dropped
    /// after the table's borrow is released: dropping one may drop another
    /// key of this same table.
    pub fn set(&mut self, key: &ObjectRef, value: Value) -> Option<Value> {
        self.entries
            .insert(key.id(), (key.downgrade(), value))
            .map(|(_, previous)| previous)
    }

    /// Remove the entry for `key`, returning its value
    pub fn delete(&mut self, key: &ObjectRef) -> Option<Value> {
        self.entries.remove(&key.id()).map(|(_, value)| value)
    }

    /// Number of entries whose key is still alive
    pub fn len(&self) -> usize {
        self.entries
            .values()
            .filter(|(key, _)| key.upgrade().is_some())
            .count()
    }

    /// Whether the table has no live entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove the entry of a key object that is being destroyed
    pub(crate) fn evict(&mut self, id: usize) -> Option<Value> {
        let (_, value) = self.entries.remove(&id)?;
        log::trace!("weak table evicted entry for object #{}", id);
        Some(value)
    }
}
