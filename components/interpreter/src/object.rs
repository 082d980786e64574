//! Object model
//!
//! Objects are shared through [`ObjectRef`] handles (`Rc<RefCell<..>>`).
//! Each object owns an insertion-ordered property map and an optional
//! prototype link. Prototype links are checked for cycles before they are
//! changed, so every prototype chain terminates.
//!
//! Exotic behavior (array indices and `length`, string wrapper indices) is
//! handled in [`Object::get_own_property`], [`Object::define_own_property`]
//! and [`Object::delete_own`] so the property protocol above them stays
//! uniform.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicUsize, Ordering};

use core_types::{ErrorKind, StackFrame};

use crate::array::ArrayStorage;
use crate::collections::{MapStorage, WeakTable};
use crate::function::FunctionObject;
use crate::generator::GeneratorState;
use crate::intrinsics::regexp::RegExpData;
use crate::iteration::{IteratorRecord, NativeIterator};
use crate::value::{PropertyKey, Value};

static NEXT_OBJECT_ID: AtomicUsize = AtomicUsize::new(1);

/// Property attribute flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attributes {
    /// Value may be changed by assignment (data properties only)
    pub writable: bool,
    /// Listed by key enumeration
    pub enumerable: bool,
    /// May be deleted or redefined
    pub configurable: bool,
}

impl Attributes {
    /// Writable, enumerable and configurable: plain assignment
    pub const ALL: Attributes = Attributes {
        writable: true,
        enumerable: true,
        configurable: true,
    };

    /// Writable and configurable but hidden from enumeration (methods)
    pub const HIDDEN: Attributes = Attributes {
        writable: true,
        enumerable: false,
        configurable: true,
    };

    /// Read-only, hidden, configurable (function `name` and `length`)
    pub const READ_ONLY: Attributes = Attributes {
        writable: false,
        enumerable: false,
        configurable: true,
    };

    /// Nothing allowed
    pub const FROZEN: Attributes = Attributes {
        writable: false,
        enumerable: false,
        configurable: false,
    };
}

/// An own property slot
#[derive(Debug, Clone)]
pub enum Property {
    /// Value slot
    Data {
        /// Stored value
        value: Value,
        /// Flags
        attributes: Attributes,
    },
    /// Getter/setter pair
    Accessor {
        /// Getter function
        get: Option<ObjectRef>,
        /// Setter function
        set: Option<ObjectRef>,
        /// Listed by key enumeration
        enumerable: bool,
        /// May be deleted or redefined
        configurable: bool,
    },
}

impl Property {
    /// A data property with the given attributes
    pub fn data(value: Value, attributes: Attributes) -> Self {
        Property::Data { value, attributes }
    }

    /// Whether the property is listed by key enumeration
    pub fn enumerable(&self) -> bool {
        match self {
            Property::Data { attributes, .. } => attributes.enumerable,
            Property::Accessor { enumerable, .. } => *enumerable,
        }
    }

    /// Whether the property may be deleted or redefined
    pub fn configurable(&self) -> bool {
        match self {
            Property::Data { attributes, .. } => attributes.configurable,
            Property::Accessor { configurable, .. } => *configurable,
        }
    }

    fn freeze(&mut self) {
        match self {
            Property::Data { attributes, .. } => {
                attributes.writable = false;
                attributes.configurable = false;
            }
            Property::Accessor { configurable, .. } => *configurable = false,
        }
    }

    fn is_frozen(&self) -> bool {
        match self {
            Property::Data { attributes, .. } => !attributes.writable && !attributes.configurable,
            Property::Accessor { configurable, .. } => !configurable,
        }
    }
}

/// Insertion-ordered property storage
#[derive(Debug, Clone, Default)]
pub struct PropertyMap {
    slots: HashMap<PropertyKey, Property>,
    order: Vec<PropertyKey>,
}

impl PropertyMap {
    /// Look up a property
    pub fn get(&self, key: &PropertyKey) -> Option<&Property> {
        self.slots.get(key)
    }

    /// Look up a property for update
    pub fn get_mut(&mut self, key: &PropertyKey) -> Option<&mut Property> {
        self.slots.get_mut(key)
    }

    /// Insert or replace; a replaced key keeps its original position
    pub fn insert(&mut self, key: PropertyKey, property: Property) {
        if self.slots.insert(key.clone(), property).is_none() {
            self.order.push(key);
        }
    }

    /// Remove a property
    pub fn remove(&mut self, key: &PropertyKey) -> Option<Property> {
        let removed = self.slots.remove(key)?;
        self.order.retain(|k| k != key);
        Some(removed)
    }

    /// Whether the key is present
    pub fn contains(&self, key: &PropertyKey) -> bool {
        self.slots.contains_key(key)
    }

    /// Number of properties
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether there are no properties
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Keys in enumeration order: integer-like keys ascending, then other
    /// strings in insertion order, then symbols in insertion order
    pub fn keys(&self) -> Vec<PropertyKey> {
        let mut indices: Vec<(u32, &PropertyKey)> = self
            .order
            .iter()
            .filter_map(|k| k.array_index().map(|i| (i, k)))
            .collect();
        indices.sort_by_key(|(i, _)| *i);
        let strings = self
            .order
            .iter()
            .filter(|k| matches!(k, PropertyKey::String(_)) && k.array_index().is_none());
        let symbols = self
            .order
            .iter()
            .filter(|k| matches!(k, PropertyKey::Symbol(_)));
        indices
            .into_iter()
            .map(|(_, k)| k)
            .chain(strings)
            .chain(symbols)
            .cloned()
            .collect()
    }

    fn values_mut(&mut self) -> impl Iterator<Item = &mut Property> {
        self.slots.values_mut()
    }

    fn values(&self) -> impl Iterator<Item = &Property> {
        self.slots.values()
    }
}

/// Internal data of an Error object
#[derive(Debug, Clone)]
pub struct ErrorData {
    /// Which constructor created the error
    pub kind: ErrorKind,
    /// Call stack captured at construction, most recent first
    pub frames: Vec<StackFrame>,
}

/// What an object is, beyond its properties
#[derive(Debug)]
pub enum ObjectKind {
    /// Plain object
    Ordinary,
    /// Array with indexed element storage
    Array(ArrayStorage),
    /// Callable object
    Function(FunctionObject),
    /// Error instance
    Error(ErrorData),
    /// Boolean, Number, String or Symbol wrapper
    Primitive(Value),
    /// Function `arguments` object
    Arguments,
    /// `Map` instance
    Map(MapStorage),
    /// `Set` instance
    Set(MapStorage),
    /// `WeakMap` instance
    WeakMap(Rc<RefCell<WeakTable>>),
    /// Generator object
    Generator(GeneratorState),
    /// Built-in iterator (array, string, map and set iteration)
    Iterator(NativeIterator),
    /// Iterator record held by compiled loops and destructuring
    IteratorRecord(IteratorRecord),
    /// Regular expression
    RegExp(RegExpData),
}

/// A JavaScript object
#[derive(Debug)]
pub struct Object {
    /// Exotic or internal state
    pub kind: ObjectKind,
    prototype: Option<ObjectRef>,
    properties: PropertyMap,
    extensible: bool,
    /// Weak tables holding this object as a key
    weak_tables: Vec<Weak<RefCell<WeakTable>>>,
}

impl Object {
    /// Create an object of the given kind
    pub fn new(kind: ObjectKind, prototype: Option<ObjectRef>) -> Self {
        Self {
            kind,
            prototype,
            properties: PropertyMap::default(),
            extensible: true,
            weak_tables: Vec::new(),
        }
    }

    /// Create a plain object
    pub fn ordinary(prototype: Option<ObjectRef>) -> Self {
        Self::new(ObjectKind::Ordinary, prototype)
    }

    /// The prototype link
    pub fn prototype(&self) -> Option<&ObjectRef> {
        self.prototype.as_ref()
    }

    /// Whether new properties may be added
    pub fn is_extensible(&self) -> bool {
        self.extensible
    }

    /// The ordered property map (ordinary properties only)
    pub fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    /// Array storage, if this is an array
    pub fn as_array(&self) -> Option<&ArrayStorage> {
        match &self.kind {
            ObjectKind::Array(array) => Some(array),
            _ => None,
        }
    }

    /// Mutable array storage, if this is an array
    pub fn as_array_mut(&mut self) -> Option<&mut ArrayStorage> {
        match &mut self.kind {
            ObjectKind::Array(array) => Some(array),
            _ => None,
        }
    }

    /// Function data, if this is callable
    pub fn as_function(&self) -> Option<&FunctionObject> {
        match &self.kind {
            ObjectKind::Function(function) => Some(function),
            _ => None,
        }
    }

    /// Mutable function data, if this is callable
    pub fn as_function_mut(&mut self) -> Option<&mut FunctionObject> {
        match &mut self.kind {
            ObjectKind::Function(function) => Some(function),
            _ => None,
        }
    }

    /// Own property lookup including exotic index and length slots
    pub fn get_own_property(&self, key: &PropertyKey) -> Option<Property> {
        match &self.kind {
            ObjectKind::Array(array) => {
                let element = Attributes {
                    writable: !array.frozen,
                    enumerable: true,
                    configurable: !array.frozen,
                };
                if let Some(index) = key.array_index() {
                    return array.get(index).map(|v| Property::data(v.clone(), element));
                }
                if key.is("length") {
                    let attributes = Attributes {
                        writable: !array.frozen,
                        enumerable: false,
                        configurable: false,
                    };
                    return Some(Property::data(Value::from(array.len()), attributes));
                }
            }
            ObjectKind::Primitive(Value::String(s)) => {
                if let Some(index) = key.array_index() {
                    if let Some(c) = s.chars().nth(index as usize) {
                        let attributes = Attributes {
                            writable: false,
                            enumerable: true,
                            configurable: false,
                        };
                        return Some(Property::data(Value::from(c.to_string()), attributes));
                    }
                }
                if key.is("length") {
                    let length = s.chars().count();
                    return Some(Property::data(Value::from(length), Attributes::FROZEN));
                }
            }
            _ => {}
        }
        self.properties.get(key).cloned()
    }

    /// Whether the own property exists
    pub fn has_own_property(&self, key: &PropertyKey) -> bool {
        self.get_own_property(key).is_some()
    }

    /// Create or replace an own property. Fails (returns false) when the
    /// existing property is non-configurable, or when the object is not
    /// extensible and the property is new.
    pub fn define_own_property(&mut self, key: PropertyKey, property: Property) -> bool {
        if let ObjectKind::Array(array) = &mut self.kind {
            if let Some(index) = key.array_index() {
                let Property::Data { value, .. } = property else {
                    return false;
                };
                if array.frozen || (!self.extensible && !array.has(index)) {
                    return false;
                }
                array.set(index, value);
                return true;
            }
            if key.is("length") {
                let Property::Data {
                    value: Value::Number(n),
                    ..
                } = property
                else {
                    return false;
                };
                if array.frozen {
                    return false;
                }
                array.set_len(n as u32);
                return true;
            }
        }
        if let ObjectKind::Primitive(Value::String(_)) = &self.kind {
            if key.array_index().is_some() || key.is("length") {
                if self.get_own_property(&key).is_some() {
                    return false;
                }
            }
        }
        match self.properties.get(&key).cloned() {
            Some(Property::Data {
                attributes: current,
                ..
            }) if !current.configurable => {
                // Only the value of a writable data property may change
                match property {
                    Property::Data { value, attributes }
                        if current.writable && attributes == current =>
                    {
                        self.properties.insert(key, Property::data(value, current));
                        true
                    }
                    _ => false,
                }
            }
            Some(existing) if !existing.configurable() => false,
            Some(_) => {
                self.properties.insert(key, property);
                true
            }
            None if !self.extensible => false,
            None => {
                self.properties.insert(key, property);
                true
            }
        }
    }

    /// Define a data property, ignoring failure; used while building
    /// fresh objects
    pub fn insert(&mut self, key: impl Into<PropertyKey>, value: Value, attributes: Attributes) {
        self.properties.insert(key.into(), Property::data(value, attributes));
    }

    /// Delete an own property; false when it is non-configurable
    pub fn delete_own(&mut self, key: &PropertyKey) -> bool {
        if let ObjectKind::Array(array) = &mut self.kind {
            if let Some(index) = key.array_index() {
                if array.frozen && array.has(index) {
                    return false;
                }
                array.remove(index);
                return true;
            }
            if key.is("length") {
                return false;
            }
        }
        if let ObjectKind::Primitive(Value::String(_)) = &self.kind {
            let exotic = key.array_index().is_some() || key.is("length");
            if exotic && self.get_own_property(key).is_some() {
                return false;
            }
        }
        match self.properties.get(key) {
            Some(property) if !property.configurable() => false,
            Some(_) => {
                self.properties.remove(key);
                true
            }
            None => true,
        }
    }

    /// Own keys in enumeration order, including non-enumerable ones
    pub fn own_keys(&self) -> Vec<PropertyKey> {
        let mut keys = Vec::new();
        match &self.kind {
            ObjectKind::Array(array) => {
                keys.extend(array.indices().into_iter().map(PropertyKey::from));
                keys.push(PropertyKey::from("length"));
            }
            ObjectKind::Primitive(Value::String(s)) => {
                keys.extend((0..s.chars().count() as u32).map(PropertyKey::from));
                keys.push(PropertyKey::from("length"));
            }
            _ => {}
        }
        let mut ordinary = self.properties.keys();
        if !keys.is_empty() {
            // Integer keys of the ordinary map still sort among the indices
            let (indices, rest): (Vec<_>, Vec<_>) =
                ordinary.into_iter().partition(|k| k.array_index().is_some());
            let length = keys.pop();
            keys.extend(indices);
            keys.sort_by_key(|k| k.array_index().unwrap_or(u32::MAX));
            keys.extend(length);
            ordinary = rest;
        }
        keys.extend(ordinary);
        keys
    }

    /// Own enumerable string keys in enumeration order
    pub fn enumerable_own_keys(&self) -> Vec<PropertyKey> {
        self.own_keys()
            .into_iter()
            .filter(|key| matches!(key, PropertyKey::String(_)))
            .filter(|key| self.get_own_property(key).is_some_and(|p| p.enumerable()))
            .collect()
    }

    /// Make the object non-extensible and every own property read-only
    pub fn freeze(&mut self) {
        self.extensible = false;
        if let ObjectKind::Array(array) = &mut self.kind {
            array.frozen = true;
        }
        for property in self.properties.values_mut() {
            property.freeze();
        }
    }

    /// Whether [`Object::freeze`] (or equivalent) has been applied
    pub fn is_frozen(&self) -> bool {
        if self.extensible {
            return false;
        }
        if let ObjectKind::Array(array) = &self.kind {
            if !array.frozen && !array.is_empty() {
                return false;
            }
        }
        self.properties.values().all(Property::is_frozen)
    }

    /// Stop new properties from being added
    pub fn prevent_extensions(&mut self) {
        self.extensible = false;
    }

    /// Record that `table` holds this object as a key
    pub(crate) fn watch(&mut self, table: &Rc<RefCell<WeakTable>>) {
        let already = self
            .weak_tables
            .iter()
            .any(|w| std::ptr::eq(w.as_ptr(), Rc::as_ptr(table)));
        if !already {
            self.weak_tables.push(Rc::downgrade(table));
        }
    }

    /// Name used by `Object.prototype.toString`
    pub fn class_name(&self) -> &'static str {
        match &self.kind {
            ObjectKind::Array(_) => "Array",
            ObjectKind::Function(_) => "Function",
            ObjectKind::Error(_) => "Error",
            ObjectKind::Primitive(Value::Boolean(_)) => "Boolean",
            ObjectKind::Primitive(Value::Number(_)) => "Number",
            ObjectKind::Primitive(Value::String(_)) => "String",
            ObjectKind::Primitive(_) => "Symbol",
            ObjectKind::Arguments => "Arguments",
            ObjectKind::Map(_) => "Map",
            ObjectKind::Set(_) => "Set",
            ObjectKind::WeakMap(_) => "WeakMap",
            ObjectKind::Generator(_) => "Generator",
            ObjectKind::RegExp(_) => "RegExp",
            ObjectKind::Ordinary | ObjectKind::Iterator(_) | ObjectKind::IteratorRecord(_) => {
                "Object"
            }
        }
    }
}

struct HeapObject {
    id: usize,
    object: RefCell<Object>,
}

impl Drop for HeapObject {
    fn drop(&mut self) {
        let tables = std::mem::take(&mut self.object.get_mut().weak_tables);
        for table in tables.iter().filter_map(Weak::upgrade) {
            let evicted = match table.try_borrow_mut() {
                Ok(mut table) => table.evict(self.id),
                Err(_) => {
                    log::warn!("weak table busy while object #{} was dropped", self.id);
                    None
                }
            };
            drop(evicted);
        }
    }
}

/// Shared handle to an object
#[derive(Clone)]
pub struct ObjectRef(Rc<HeapObject>);

impl ObjectRef {
    /// Allocate an object
    pub fn new(object: Object) -> Self {
        ObjectRef(Rc::new(HeapObject {
            id: NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed),
            object: RefCell::new(object),
        }))
    }

    /// Stable identity, unique for the life of the process
    pub fn id(&self) -> usize {
        self.0.id
    }

    /// Immutable access
    pub fn borrow(&self) -> Ref<'_, Object> {
        self.0.object.borrow()
    }

    /// Mutable access
    pub fn borrow_mut(&self) -> RefMut<'_, Object> {
        self.0.object.borrow_mut()
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Non-owning handle
    pub fn downgrade(&self) -> WeakObjectRef {
        WeakObjectRef(Rc::downgrade(&self.0))
    }

    /// The prototype link
    pub fn prototype(&self) -> Option<ObjectRef> {
        self.borrow().prototype.clone()
    }

    /// Change the prototype link. Fails when the object is not extensible
    /// or when `prototype` has this object on its own chain.
    pub fn set_prototype(&self, prototype: Option<ObjectRef>) -> bool {
        let current = self.prototype();
        let unchanged = match (&current, &prototype) {
            (Some(a), Some(b)) => a.ptr_eq(b),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return true;
        }
        if !self.borrow().extensible {
            return false;
        }
        let mut cursor = prototype.clone();
        while let Some(ancestor) = cursor {
            if ancestor.ptr_eq(self) {
                return false;
            }
            cursor = ancestor.prototype();
        }
        self.borrow_mut().prototype = prototype;
        true
    }

    /// Whether the object has a `[[Call]]` behavior
    pub fn is_callable(&self) -> bool {
        matches!(self.borrow().kind, ObjectKind::Function(_))
    }

    /// Whether the object has a `[[Construct]]` behavior
    pub fn is_constructor(&self) -> bool {
        match &self.borrow().kind {
            ObjectKind::Function(function) => function.is_constructor(),
            _ => false,
        }
    }

    /// Whether this is an Array
    pub fn is_array(&self) -> bool {
        matches!(self.borrow().kind, ObjectKind::Array(_))
    }

    /// Own property lookup
    pub fn get_own_property(&self, key: &PropertyKey) -> Option<Property> {
        self.borrow().get_own_property(key)
    }

    /// Own data property value, ignoring accessors
    pub fn get_own_value(&self, key: &PropertyKey) -> Option<Value> {
        match self.get_own_property(key)? {
            Property::Data { value, .. } => Some(value),
            Property::Accessor { .. } => None,
        }
    }

    /// Whether the own property exists
    pub fn has_own_property(&self, key: &PropertyKey) -> bool {
        self.borrow().has_own_property(key)
    }

    /// Define an own property; see [`Object::define_own_property`]
    pub fn define_own_property(&self, key: PropertyKey, property: Property) -> bool {
        self.borrow_mut().define_own_property(key, property)
    }

    /// Define a data property on a fresh object
    pub fn insert(&self, key: impl Into<PropertyKey>, value: Value, attributes: Attributes) {
        self.borrow_mut().insert(key, value, attributes);
    }

    /// Own keys in enumeration order
    pub fn own_keys(&self) -> Vec<PropertyKey> {
        self.borrow().own_keys()
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &ObjectRef) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ObjectRef {}

impl std::hash::Hash for ObjectRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

/// Shallow: the object graph may be cyclic
impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.object.try_borrow() {
            Ok(object) => write!(f, "ObjectRef(#{} {})", self.id(), object.class_name()),
            Err(_) => write!(f, "ObjectRef(#{})", self.id()),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Ok(object) = self.0.object.try_borrow() else {
            return f.write_str("[object Object]");
        };
        match &object.kind {
            ObjectKind::Function(function) => write!(f, "function {}", function.debug_name()),
            ObjectKind::Array(array) => {
                let items: Vec<String> = array
                    .to_vec()
                    .iter()
                    .map(|v| match v {
                        Value::Object(_) => "[object]".to_string(),
                        Value::Undefined | Value::Null => String::new(),
                        other => other.to_string(),
                    })
                    .collect();
                f.write_str(&items.join(","))
            }
            ObjectKind::Primitive(value) => write!(f, "{}", value),
            ObjectKind::Error(data) => {
                let message = match object.properties.get(&PropertyKey::from("message")) {
                    Some(Property::Data {
                        value: Value::String(s),
                        ..
                    }) => s.to_string(),
                    _ => String::new(),
                };
                if message.is_empty() {
                    write!(f, "{}", data.kind.name())
                } else {
                    write!(f, "{}: {}", data.kind.name(), message)
                }
            }
            _ => write!(f, "[object {}]", object.class_name()),
        }
    }
}

/// Non-owning object handle
#[derive(Clone, Debug)]
pub struct WeakObjectRef(Weak<HeapObject>);

impl WeakObjectRef {
    /// The object, if still alive
    pub fn upgrade(&self) -> Option<ObjectRef> {
        self.0.upgrade().map(ObjectRef)
    }
}

impl fmt::Debug for HeapObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HeapObject(#{})", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(prototype: Option<ObjectRef>) -> ObjectRef {
        ObjectRef::new(Object::ordinary(prototype))
    }

    #[test]
    fn test_prototype_cycles_are_rejected() {
        let a = plain(None);
        let b = plain(Some(a.clone()));
        let c = plain(Some(b.clone()));
        assert!(!a.set_prototype(Some(c.clone())));
        assert!(!a.set_prototype(Some(a.clone())));
        assert!(a.prototype().is_none());
        assert!(c.set_prototype(Some(a.clone())));
    }

    #[test]
    fn test_non_extensible_prototype_is_fixed() {
        let a = plain(None);
        a.borrow_mut().prevent_extensions();
        assert!(!a.set_prototype(Some(plain(None))));
        assert!(a.set_prototype(None));
    }

    #[test]
    fn test_key_order() {
        let o = plain(None);
        o.insert("b", Value::from(1), Attributes::ALL);
        o.insert("10", Value::from(2), Attributes::ALL);
        o.insert("a", Value::from(3), Attributes::ALL);
        o.insert("2", Value::from(4), Attributes::ALL);
        let keys: Vec<String> = o.own_keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["2", "10", "b", "a"]);
    }

    #[test]
    fn test_redefinition_keeps_position() {
        let o = plain(None);
        o.insert("x", Value::from(1), Attributes::ALL);
        o.insert("y", Value::from(2), Attributes::ALL);
        o.insert("x", Value::from(3), Attributes::ALL);
        let keys: Vec<String> = o.own_keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["x", "y"]);
        assert_eq!(o.get_own_value(&"x".into()), Some(Value::from(3)));
    }

    #[test]
    fn test_non_configurable_cannot_be_deleted() {
        let o = plain(None);
        o.insert("fixed", Value::Null, Attributes::FROZEN);
        assert!(!o.borrow_mut().delete_own(&"fixed".into()));
        assert!(o.borrow_mut().delete_own(&"missing".into()));
    }

    #[test]
    fn test_array_length_slot() {
        let array = ObjectRef::new(Object::new(
            ObjectKind::Array(ArrayStorage::from_values(vec![Value::from(1), Value::from(2)])),
            None,
        ));
        let keys: Vec<String> = array.own_keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["0", "1", "length"]);
        assert!(array.define_own_property("length".into(), Property::data(Value::from(0), Attributes::ALL)));
        assert_eq!(array.get_own_value(&"length".into()), Some(Value::from(0)));
        assert!(!array.has_own_property(&"0".into()));
    }

    #[test]
    fn test_frozen_object() {
        let o = plain(None);
        o.insert("x", Value::from(1), Attributes::ALL);
        o.borrow_mut().freeze();
        assert!(o.borrow().is_frozen());
        assert!(!o.define_own_property("y".into(), Property::data(Value::Null, Attributes::ALL)));
        assert!(!o.define_own_property("x".into(), Property::data(Value::from(2), Attributes::ALL)));
    }
}
