//! Function objects and the call/construct protocol
//!
//! A callable object carries a [`FunctionObject`]: a script closure over a
//! compiled chunk, a native Rust function, or a bound function. Calls and
//! constructions go through [`ExecutionContext::call`] and
//! [`ExecutionContext::construct`], which build a [`CallFrame`] and hand it
//! to the dispatch loop.

use std::fmt;
use std::rc::Rc;

use bytecode_system::{BytecodeChunk, FunctionKind, UpvalueDescriptor};

use crate::call_frame::CallFrame;
use crate::completion::{Completion, Throw};
use crate::context::ExecutionContext;
use crate::generator::GeneratorState;
use crate::object::{Attributes, Object, ObjectKind, ObjectRef};
use crate::upvalue::Upvalue;
use crate::value::{PropertyKey, Value};

/// Native function body: `(context, this, arguments)`
pub type NativeFn = Rc<dyn Fn(&mut ExecutionContext, &Value, &[Value]) -> Result<Value, Throw>>;

/// Native constructor body: `(context, arguments, new_target)`
pub type NativeConstructor =
    Rc<dyn Fn(&mut ExecutionContext, &[Value], &ObjectRef) -> Result<Value, Throw>>;

/// `this` and `new.target` captured by an arrow function
#[derive(Debug, Clone)]
pub struct LexicalThis {
    /// `None` when captured before `super()` ran in a derived constructor
    pub this: Option<Value>,
    /// `new.target` of the enclosing function
    pub new_target: Value,
}

/// A script function: compiled chunk plus captured variables
#[derive(Debug, Clone)]
pub struct Closure {
    /// Compiled body
    pub chunk: Rc<BytecodeChunk>,
    /// Captured variables, indexed by upvalue number
    pub upvalues: Rc<[Upvalue]>,
    /// Object whose prototype `super` property lookups start from
    pub home_object: Option<ObjectRef>,
    /// Set for arrow functions only
    pub lexical: Option<LexicalThis>,
    /// Instance field initializer of a class constructor
    pub fields: Option<ObjectRef>,
}

/// A function implemented in Rust
#[derive(Clone)]
pub struct NativeFunction {
    /// Value of the `name` property
    pub name: Rc<str>,
    /// `[[Call]]` behavior
    pub call: NativeFn,
    /// `[[Construct]]` behavior, if the function is a constructor
    pub construct: Option<NativeConstructor>,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("constructor", &self.construct.is_some())
            .finish()
    }
}

/// Result of `Function.prototype.bind`
#[derive(Debug, Clone)]
pub struct BoundFunction {
    /// Wrapped function
    pub target: ObjectRef,
    /// Fixed receiver
    pub this: Value,
    /// Arguments prepended to every call
    pub args: Vec<Value>,
}

/// Callable behavior of a function object
#[derive(Debug, Clone)]
pub enum FunctionObject {
    /// Compiled script function
    Closure(Closure),
    /// Rust function
    Native(NativeFunction),
    /// Bound function
    Bound(BoundFunction),
}

impl FunctionObject {
    /// Whether `new` may be applied
    pub fn is_constructor(&self) -> bool {
        match self {
            FunctionObject::Closure(closure) => closure.chunk.is_constructor(),
            FunctionObject::Native(native) => native.construct.is_some(),
            FunctionObject::Bound(bound) => bound.target.is_constructor(),
        }
    }

    /// Name used in diagnostics
    pub fn debug_name(&self) -> String {
        match self {
            FunctionObject::Closure(closure) => closure
                .chunk
                .name
                .as_deref()
                .filter(|name| !name.is_empty())
                .unwrap_or("anonymous")
                .to_string(),
            FunctionObject::Native(native) => native.name.to_string(),
            FunctionObject::Bound(bound) => {
                let target = bound
                    .target
                    .borrow()
                    .as_function()
                    .map(FunctionObject::debug_name)
                    .unwrap_or_default();
                format!("bound {}", target)
            }
        }
    }
}

/// Box a Rust closure as a [`NativeFn`]
pub fn native_fn(
    f: impl Fn(&mut ExecutionContext, &Value, &[Value]) -> Result<Value, Throw> + 'static,
) -> NativeFn {
    Rc::new(f)
}

/// Allocate a native function object with `name` and `length` properties
pub fn create_native_function(
    function_prototype: &ObjectRef,
    name: &str,
    length: u32,
    call: NativeFn,
    construct: Option<NativeConstructor>,
) -> ObjectRef {
    let native = NativeFunction {
        name: Rc::from(name),
        call,
        construct,
    };
    let function = ObjectRef::new(Object::new(
        ObjectKind::Function(FunctionObject::Native(native)),
        Some(function_prototype.clone()),
    ));
    function.insert("length", Value::from(length), Attributes::READ_ONLY);
    function.insert("name", Value::from(name), Attributes::READ_ONLY);
    function
}

/// Diagnostic name of a function object used as `new.target`
pub(crate) fn constructor_name(target: &ObjectRef) -> Option<Rc<str>> {
    target
        .borrow()
        .as_function()
        .map(|function| Rc::from(function.debug_name()))
}

impl ExecutionContext {
    /// Call `callee` with the given receiver and arguments
    pub fn call(&mut self, callee: &Value, this: Value, args: &[Value]) -> Result<Value, Throw> {
        let function = match callee {
            Value::Object(object) => object.borrow().as_function().cloned(),
            _ => None,
        };
        let (Some(function), Value::Object(object)) = (function, callee) else {
            return Err(self.type_error(format!("{} is not a function", callee)));
        };
        match function {
            FunctionObject::Closure(closure) => self.call_closure(object, closure, this, args),
            FunctionObject::Native(native) => {
                self.with_call(Some(native.name.clone()), None, None, |cx| {
                    (native.call)(cx, &this, args)
                })
            }
            FunctionObject::Bound(bound) => {
                let mut full = bound.args.clone();
                full.extend_from_slice(args);
                self.call(&Value::Object(bound.target), bound.this, &full)
            }
        }
    }

    fn call_closure(
        &mut self,
        function: &ObjectRef,
        closure: Closure,
        this: Value,
        args: &[Value],
    ) -> Result<Value, Throw> {
        let chunk = closure.chunk.clone();
        if let FunctionKind::ClassConstructor { .. } = chunk.kind {
            let name = chunk.name.as_deref().unwrap_or("anonymous");
            return Err(self.type_error(format!(
                "Class constructor {} cannot be invoked without 'new'",
                name
            )));
        }

        let mut frame = CallFrame::new(chunk.clone(), closure.upvalues.clone(), args);
        frame.callee = Some(function.clone());
        frame.home_object = closure.home_object.clone();
        match &closure.lexical {
            Some(lexical) => {
                frame.this = lexical.this.clone();
                frame.new_target = lexical.new_target.clone();
            }
            None => frame.this = Some(self.bind_this(this, chunk.strict)?),
        }

        if chunk.is_generator {
            return self.start_generator(function, frame);
        }
        match self.run_frame(&mut frame)? {
            Completion::Return(value) => Ok(value),
            Completion::Yield(_) | Completion::GeneratorStart => Ok(Value::Undefined),
        }
    }

    /// Receiver seen by non-arrow code: sloppy code boxes primitives and
    /// replaces a missing receiver with the global object
    fn bind_this(&mut self, this: Value, strict: bool) -> Result<Value, Throw> {
        if strict {
            return Ok(this);
        }
        match this {
            Value::Undefined | Value::Null => Ok(Value::Object(self.global_object())),
            Value::Object(_) => Ok(this),
            primitive => Ok(Value::Object(self.to_object(&primitive)?)),
        }
    }

    /// Run a generator's prologue and wrap the suspended frame in a new
    /// generator object
    fn start_generator(&mut self, function: &ObjectRef, mut frame: CallFrame) -> Result<Value, Throw> {
        if let Completion::Return(value) = self.run_frame(&mut frame)? {
            return Ok(value);
        }
        let prototype = match self.get(function, &PropertyKey::from("prototype"))? {
            Value::Object(prototype) => prototype,
            _ => self.realm().generator_prototype.clone(),
        };
        let state = GeneratorState::SuspendedStart(Box::new(frame));
        let generator = Object::new(ObjectKind::Generator(state), Some(prototype));
        log::trace!("generator created in state suspended-start");
        Ok(Value::Object(ObjectRef::new(generator)))
    }

    /// `new callee(...args)`; `new_target` defaults to the callee
    pub fn construct(
        &mut self,
        callee: &Value,
        args: &[Value],
        new_target: Option<&ObjectRef>,
    ) -> Result<Value, Throw> {
        let function = match callee {
            Value::Object(object) if object.is_constructor() => {
                object.borrow().as_function().cloned().map(|f| (object.clone(), f))
            }
            _ => None,
        };
        let Some((object, function)) = function else {
            return Err(self.type_error(format!("{} is not a constructor", callee)));
        };
        let new_target = new_target.cloned().unwrap_or_else(|| object.clone());
        match function {
            FunctionObject::Closure(closure) => {
                self.construct_closure(&object, closure, args, &new_target)
            }
            FunctionObject::Native(native) => {
                let Some(construct) = native.construct else {
                    return Err(self.type_error(format!("{} is not a constructor", native.name)));
                };
                let target_name = constructor_name(&new_target);
                self.with_call(Some(native.name.clone()), None, target_name, |cx| {
                    construct(cx, args, &new_target)
                })
            }
            FunctionObject::Bound(bound) => {
                let new_target = if new_target.ptr_eq(&object) {
                    bound.target.clone()
                } else {
                    new_target
                };
                let mut full = bound.args.clone();
                full.extend_from_slice(args);
                self.construct(&Value::Object(bound.target), &full, Some(&new_target))
            }
        }
    }

    fn construct_closure(
        &mut self,
        function: &ObjectRef,
        closure: Closure,
        args: &[Value],
        new_target: &ObjectRef,
    ) -> Result<Value, Throw> {
        let chunk = closure.chunk.clone();
        let derived = matches!(chunk.kind, FunctionKind::ClassConstructor { derived: true });
        let mut frame = CallFrame::new(chunk, closure.upvalues.clone(), args);
        frame.callee = Some(function.clone());
        frame.home_object = closure.home_object.clone();
        frame.new_target = Value::Object(new_target.clone());

        if derived {
            frame.this = None;
        } else {
            let fallback = self.realm().object_prototype.clone();
            let prototype = self.prototype_from_constructor(new_target, fallback)?;
            let this = ObjectRef::new(Object::ordinary(Some(prototype)));
            frame.this = Some(Value::Object(this.clone()));
            self.initialize_fields(function, &this)?;
        }

        let result = match self.run_frame(&mut frame)? {
            Completion::Return(value) => value,
            Completion::Yield(_) | Completion::GeneratorStart => Value::Undefined,
        };
        if let Value::Object(_) = result {
            return Ok(result);
        }
        if derived && !result.is_undefined() {
            return Err(self.type_error("Derived constructors may only return object or undefined"));
        }
        match frame.this.take() {
            Some(this) => Ok(this),
            None => Err(self.reference_error(
                "Must call super constructor in derived class before accessing 'this' or returning from derived constructor",
            )),
        }
    }

    /// `new_target.prototype` if it is an object, otherwise `fallback`
    pub fn prototype_from_constructor(
        &mut self,
        new_target: &ObjectRef,
        fallback: ObjectRef,
    ) -> Result<ObjectRef, Throw> {
        match self.get(new_target, &PropertyKey::from("prototype"))? {
            Value::Object(prototype) => Ok(prototype),
            _ => Ok(fallback),
        }
    }

    /// Run the class field initializer attached to `constructor` against a
    /// freshly created instance
    pub(crate) fn initialize_fields(
        &mut self,
        constructor: &ObjectRef,
        instance: &ObjectRef,
    ) -> Result<(), Throw> {
        let fields = match constructor.borrow().as_function() {
            Some(FunctionObject::Closure(closure)) => closure.fields.clone(),
            _ => None,
        };
        if let Some(fields) = fields {
            self.call(&Value::Object(fields), Value::Object(instance.clone()), &[])?;
        }
        Ok(())
    }

    /// Instantiate nested function `index` of the frame's chunk, capturing
    /// the cells and upvalues named by `descriptors`
    pub(crate) fn create_closure(
        &mut self,
        frame: &CallFrame,
        index: usize,
        descriptors: &[UpvalueDescriptor],
    ) -> Result<ObjectRef, Throw> {
        let Some(chunk) = frame.chunk.nested_functions.get(index).cloned() else {
            return Err(self.internal_error(format!("no nested function at index {}", index)));
        };
        let upvalues: Rc<[Upvalue]> = descriptors
            .iter()
            .map(|descriptor| {
                let captured = if descriptor.is_local {
                    frame.cell(descriptor.index)
                } else {
                    frame.upvalue(descriptor.index)
                };
                captured.cloned().unwrap_or_default()
            })
            .collect();

        let arrow = chunk.kind == FunctionKind::Arrow;
        let closure = Closure {
            chunk,
            upvalues,
            home_object: if arrow { frame.home_object.clone() } else { None },
            lexical: arrow.then(|| LexicalThis {
                this: frame.this.clone(),
                new_target: frame.new_target.clone(),
            }),
            fields: None,
        };
        Ok(self.create_function(closure))
    }

    /// Allocate the function object for a closure with its `length`,
    /// `name` and (for plain functions and generators) `prototype`
    pub(crate) fn create_function(&mut self, closure: Closure) -> ObjectRef {
        let chunk = closure.chunk.clone();
        let function = ObjectRef::new(Object::new(
            ObjectKind::Function(FunctionObject::Closure(closure)),
            Some(self.realm().function_prototype.clone()),
        ));
        function.insert("length", Value::from(chunk.length), Attributes::READ_ONLY);
        let name = chunk.name.clone().unwrap_or_else(|| Rc::from(""));
        function.insert("name", Value::String(name), Attributes::READ_ONLY);

        let prototype_slot = Attributes {
            writable: true,
            enumerable: false,
            configurable: false,
        };
        if chunk.is_generator {
            let prototype = Object::ordinary(Some(self.realm().generator_prototype.clone()));
            function.insert("prototype", Value::Object(ObjectRef::new(prototype)), prototype_slot);
        } else if chunk.kind == FunctionKind::Normal {
            let prototype = ObjectRef::new(Object::ordinary(Some(
                self.realm().object_prototype.clone(),
            )));
            prototype.insert("constructor", Value::Object(function.clone()), Attributes::HIDDEN);
            function.insert("prototype", Value::Object(prototype), prototype_slot);
        }
        log::trace!(
            "created function {} ({} instructions)",
            chunk.name.as_deref().unwrap_or("anonymous"),
            chunk.instructions.len()
        );
        function
    }

    /// Allocate a native function in this realm
    pub fn create_native_function(
        &self,
        name: &str,
        length: u32,
        call: impl Fn(&mut ExecutionContext, &Value, &[Value]) -> Result<Value, Throw> + 'static,
    ) -> ObjectRef {
        create_native_function(
            &self.realm().function_prototype,
            name,
            length,
            Rc::new(call),
            None,
        )
    }

    /// Set the home object of a script function
    pub(crate) fn set_home_object(&mut self, function: &ObjectRef, home: ObjectRef) {
        if let Some(FunctionObject::Closure(closure)) = function.borrow_mut().as_function_mut() {
            closure.home_object = Some(home);
        }
    }

    /// Attach an instance field initializer to a class constructor
    pub(crate) fn set_class_fields(&mut self, constructor: &ObjectRef, fields: ObjectRef) {
        if let Some(FunctionObject::Closure(closure)) = constructor.borrow_mut().as_function_mut() {
            closure.fields = Some(fields);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DEFAULT_MAX_CALL_DEPTH;

    #[test]
    fn test_native_call_receives_receiver_and_arguments() {
        let mut cx = ExecutionContext::new(DEFAULT_MAX_CALL_DEPTH);
        let sum = cx.create_native_function("sum", 2, |cx, _this, args| {
            let mut total = 0.0;
            for arg in args {
                total += cx.to_number(arg)?;
            }
            Ok(Value::from(total))
        });
        let result = cx
            .call(&Value::Object(sum), Value::Undefined, &[Value::from(2), Value::from(3)])
            .unwrap();
        assert_eq!(result, Value::from(5));
    }

    #[test]
    fn test_calling_a_non_function_is_a_type_error() {
        let mut cx = ExecutionContext::new(DEFAULT_MAX_CALL_DEPTH);
        let error = cx.call(&Value::from(1), Value::Undefined, &[]).unwrap_err();
        let error = cx.to_js_error(&error);
        assert_eq!(error.kind, core_types::ErrorKind::TypeError);
        assert_eq!(error.message, "1 is not a function");
    }

    #[test]
    fn test_plain_native_functions_are_not_constructors() {
        let mut cx = ExecutionContext::new(DEFAULT_MAX_CALL_DEPTH);
        let f = cx.create_native_function("f", 0, |_, _, _| Ok(Value::Undefined));
        assert!(!f.is_constructor());
        assert!(cx.construct(&Value::Object(f), &[], None).is_err());
    }

    #[test]
    fn test_native_function_properties() {
        let cx = ExecutionContext::new(DEFAULT_MAX_CALL_DEPTH);
        let f = cx.create_native_function("answer", 1, |_, _, _| Ok(Value::from(42)));
        assert_eq!(f.get_own_value(&"name".into()), Some(Value::from("answer")));
        assert_eq!(f.get_own_value(&"length".into()), Some(Value::from(1)));
        assert_eq!(f.to_string(), "function answer");
    }
}
