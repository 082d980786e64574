//! Realm: the global object and the intrinsic objects
//!
//! Prototypes are allocated first so that every intrinsic can link to them;
//! the `intrinsics` installers then populate methods and constructors.

use std::rc::Rc;

use core_types::ErrorKind;

use crate::array::ArrayStorage;
use crate::context::ExecutionContext;
use crate::function::{native_fn, FunctionObject, NativeFunction};
use crate::intrinsics;
use crate::object::{Attributes, Object, ObjectKind, ObjectRef};
use crate::value::{Symbol, Value};

/// Intrinsic objects shared by all code of one engine
#[derive(Debug)]
pub struct Realm {
    /// The global object
    pub global: ObjectRef,
    /// `Object.prototype`
    pub object_prototype: ObjectRef,
    /// `Function.prototype`
    pub function_prototype: ObjectRef,
    /// `Array.prototype`
    pub array_prototype: ObjectRef,
    /// `String.prototype`
    pub string_prototype: ObjectRef,
    /// `Number.prototype`
    pub number_prototype: ObjectRef,
    /// `Boolean.prototype`
    pub boolean_prototype: ObjectRef,
    /// `Symbol.prototype`
    pub symbol_prototype: ObjectRef,
    /// `Error.prototype`
    pub error_prototype: ObjectRef,
    /// `TypeError.prototype`
    pub type_error_prototype: ObjectRef,
    /// `RangeError.prototype`
    pub range_error_prototype: ObjectRef,
    /// `ReferenceError.prototype`
    pub reference_error_prototype: ObjectRef,
    /// `SyntaxError.prototype`
    pub syntax_error_prototype: ObjectRef,
    /// Shared prototype of all iterators (`[Symbol.iterator]() { return this }`)
    pub iterator_prototype: ObjectRef,
    /// Prototype of built-in array, string and collection iterators
    pub native_iterator_prototype: ObjectRef,
    /// The `next` method of built-in iterators
    pub native_iterator_next: ObjectRef,
    /// Prototype of generator objects
    pub generator_prototype: ObjectRef,
    /// `Map.prototype`
    pub map_prototype: ObjectRef,
    /// `Set.prototype`
    pub set_prototype: ObjectRef,
    /// `WeakMap.prototype`
    pub weakmap_prototype: ObjectRef,
    /// `RegExp.prototype`
    pub regexp_prototype: ObjectRef,
    /// `Array.prototype.values`, also `Array.prototype[Symbol.iterator]`
    pub array_values: ObjectRef,
    /// `Symbol.iterator`
    pub symbol_iterator: Symbol,
}

fn plain(prototype: &ObjectRef) -> ObjectRef {
    ObjectRef::new(Object::ordinary(Some(prototype.clone())))
}

impl Realm {
    /// Create the global object and every intrinsic
    pub fn new() -> Self {
        let object_prototype = ObjectRef::new(Object::ordinary(None));
        let function_prototype = ObjectRef::new(Object::new(
            ObjectKind::Function(FunctionObject::Native(NativeFunction {
                name: Rc::from(""),
                call: native_fn(|_, _, _| Ok(Value::Undefined)),
                construct: None,
            })),
            Some(object_prototype.clone()),
        ));
        let array_prototype = ObjectRef::new(Object::new(
            ObjectKind::Array(ArrayStorage::new()),
            Some(object_prototype.clone()),
        ));
        let error_prototype = plain(&object_prototype);
        let iterator_prototype = plain(&object_prototype);

        let realm = Realm {
            global: plain(&object_prototype),
            string_prototype: ObjectRef::new(Object::new(
                ObjectKind::Primitive(Value::from("")),
                Some(object_prototype.clone()),
            )),
            number_prototype: ObjectRef::new(Object::new(
                ObjectKind::Primitive(Value::Number(0.0)),
                Some(object_prototype.clone()),
            )),
            boolean_prototype: ObjectRef::new(Object::new(
                ObjectKind::Primitive(Value::Boolean(false)),
                Some(object_prototype.clone()),
            )),
            symbol_prototype: plain(&object_prototype),
            type_error_prototype: plain(&error_prototype),
            range_error_prototype: plain(&error_prototype),
            reference_error_prototype: plain(&error_prototype),
            syntax_error_prototype: plain(&error_prototype),
            native_iterator_prototype: plain(&iterator_prototype),
            native_iterator_next: intrinsics::iterator::native_next(&function_prototype),
            generator_prototype: plain(&iterator_prototype),
            map_prototype: plain(&object_prototype),
            set_prototype: plain(&object_prototype),
            weakmap_prototype: plain(&object_prototype),
            regexp_prototype: plain(&object_prototype),
            array_values: intrinsics::array::values_function(&function_prototype),
            symbol_iterator: Symbol::new(Some("Symbol.iterator")),
            error_prototype,
            iterator_prototype,
            array_prototype,
            function_prototype,
            object_prototype,
        };

        let global = &realm.global;
        global.insert("globalThis", Value::Object(global.clone()), Attributes::HIDDEN);
        global.insert("NaN", Value::Number(f64::NAN), Attributes::FROZEN);
        global.insert("Infinity", Value::Number(f64::INFINITY), Attributes::FROZEN);
        global.insert("undefined", Value::Undefined, Attributes::FROZEN);

        intrinsics::object::install(&realm);
        intrinsics::function::install(&realm);
        intrinsics::array::install(&realm);
        intrinsics::string::install(&realm);
        intrinsics::number::install(&realm);
        intrinsics::symbol::install(&realm);
        intrinsics::error::install(&realm);
        intrinsics::iterator::install(&realm);
        intrinsics::collections::install(&realm);
        intrinsics::regexp::install(&realm);
        log::debug!("realm initialized with {} globals", global.own_keys().len());
        realm
    }

    /// Prototype of errors of the given kind
    pub fn error_prototype(&self, kind: ErrorKind) -> &ObjectRef {
        match kind {
            ErrorKind::TypeError => &self.type_error_prototype,
            ErrorKind::RangeError => &self.range_error_prototype,
            ErrorKind::ReferenceError => &self.reference_error_prototype,
            ErrorKind::SyntaxError => &self.syntax_error_prototype,
            ErrorKind::InternalError | ErrorKind::Thrown => &self.error_prototype,
        }
    }
}

impl Default for Realm {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionContext {
    /// A new plain object inheriting from `Object.prototype`
    pub fn create_object(&self) -> ObjectRef {
        plain(&self.realm().object_prototype)
    }

    /// A new array holding `values`
    pub fn create_array(&self, values: Vec<Value>) -> ObjectRef {
        ObjectRef::new(Object::new(
            ObjectKind::Array(ArrayStorage::from_values(values)),
            Some(self.realm().array_prototype.clone()),
        ))
    }
}
