//! Host-facing engine
//!
//! An [`Engine`] owns one execution context (realm plus call stack) and a
//! backend. Hosts compile source into [`Script`]s, run them, and work with
//! the resulting values through the property and generator protocols
//! exposed here.
//!
//! # Example
//!
//! ```
//! use interpreter::{Engine, EngineConfig, Value};
//!
//! let mut engine = Engine::new(EngineConfig::default());
//! let value = engine.eval("function add(a, b) { return a + b; } add(2, 3)").unwrap();
//! assert_eq!(value, Value::from(5));
//! ```

use core_types::JsError;
use parser::{compile, parse, CompileOptions, ParseOptions};

use crate::backend::{Backend, BytecodeBackend, ExecutableUnit, Script};
use crate::call_frame::Resumption;
use crate::completion::{IterResult, Throw};
use crate::context::{ExecutionContext, DEFAULT_MAX_CALL_DEPTH};
use crate::object::{Attributes, ObjectRef};
use crate::value::{PropertyKey, Value};

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum number of nested calls before a RangeError
    pub max_call_depth: usize,
    /// Source name used in positions and stack traces
    pub source_name: String,
    /// Parse all code as strict mode code
    pub strict: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            source_name: "<script>".to_string(),
            strict: false,
        }
    }
}

impl EngineConfig {
    /// Default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the call depth budget
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Set the source name
    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = name.into();
        self
    }

    /// Treat scripts as strict mode code
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// One independent script context
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    context: ExecutionContext,
    backend: Box<dyn Backend>,
}

impl Engine {
    /// Create an engine running on the bytecode backend
    pub fn new(config: EngineConfig) -> Self {
        Self::with_backend(config, Box::new(BytecodeBackend))
    }

    /// Create an engine running on `backend`
    pub fn with_backend(config: EngineConfig, backend: Box<dyn Backend>) -> Self {
        log::debug!(
            "creating engine (backend: {}, max call depth: {})",
            backend.name(),
            config.max_call_depth
        );
        Self {
            context: ExecutionContext::new(config.max_call_depth),
            config,
            backend,
        }
    }

    /// The configuration this engine was created with
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Parse and compile `source`
    pub fn compile(&mut self, source: &str) -> Result<Script, JsError> {
        let parse_options = ParseOptions::new()
            .with_strict(self.config.strict)
            .with_source_name(self.config.source_name.clone());
        let output = parse(source, &parse_options)?;
        let compile_options = CompileOptions::new().with_source_name(self.config.source_name.clone());
        let chunk = compile(&output.program, &compile_options)?;
        log::debug!(
            "compiled {} ({} instructions, {} nested functions)",
            self.config.source_name,
            chunk.instructions.len(),
            chunk.nested_functions.len()
        );
        Ok(Script::new(self.backend.compile(chunk)))
    }

    /// Run a compiled script with the global object as `this`
    pub fn run(&mut self, script: &Script) -> Result<Value, JsError> {
        let this = Value::Object(self.global_object());
        script.invoke(self, this, &[])
    }

    /// Compile and run `source`, returning its completion value
    pub fn eval(&mut self, source: &str) -> Result<Value, JsError> {
        let script = self.compile(source)?;
        self.run(&script)
    }

    /// Call a function value
    pub fn call(&mut self, function: &Value, this: Value, args: &[Value]) -> Result<Value, JsError> {
        self.context
            .call(function, this, args)
            .map_err(|throw| self.context.to_js_error(&throw))
    }

    /// Apply `new` to a constructor value
    pub fn construct(&mut self, constructor: &Value, args: &[Value]) -> Result<Value, JsError> {
        self.context
            .construct(constructor, args, None)
            .map_err(|throw| self.context.to_js_error(&throw))
    }

    /// The global object
    pub fn global_object(&self) -> ObjectRef {
        self.context.global_object()
    }

    /// Read a global variable; getters on the global object are run
    pub fn get_global(&mut self, name: &str) -> Result<Value, JsError> {
        let global = self.global_object();
        self.get(&global, name)
    }

    /// Create or overwrite a global variable
    pub fn set_global(&mut self, name: &str, value: Value) {
        self.global_object().insert(name, value, Attributes::ALL);
    }

    /// Install a host function as a global
    pub fn define_global_function(
        &mut self,
        name: &str,
        arity: u32,
        f: impl Fn(&mut ExecutionContext, &Value, &[Value]) -> Result<Value, Throw> + 'static,
    ) -> ObjectRef {
        let function = self.context.create_native_function(name, arity, f);
        self.global_object()
            .insert(name, Value::Object(function.clone()), Attributes::HIDDEN);
        function
    }

    /// `object[key]`
    pub fn get(&mut self, object: &ObjectRef, key: impl Into<PropertyKey>) -> Result<Value, JsError> {
        let key = key.into();
        self.context
            .get(object, &key)
            .map_err(|throw| self.context.to_js_error(&throw))
    }

    /// `object[key] = value`; refused writes throw only when `strict`
    pub fn set(
        &mut self,
        object: &ObjectRef,
        key: impl Into<PropertyKey>,
        value: Value,
        strict: bool,
    ) -> Result<(), JsError> {
        self.context
            .set(object, key.into(), value, strict)
            .map_err(|throw| self.context.to_js_error(&throw))
    }

    /// `delete object[key]`; refused deletes throw only when `strict`
    pub fn delete(
        &mut self,
        object: &ObjectRef,
        key: impl Into<PropertyKey>,
        strict: bool,
    ) -> Result<bool, JsError> {
        let key = key.into();
        self.context
            .delete_property(&Value::Object(object.clone()), &key, strict)
            .map_err(|throw| self.context.to_js_error(&throw))
    }

    /// Whether `object` has an own property `key`
    pub fn has_own(&self, object: &ObjectRef, key: impl Into<PropertyKey>) -> bool {
        object.has_own_property(&key.into())
    }

    /// Own property keys in property order
    pub fn own_keys(&self, object: &ObjectRef) -> Vec<PropertyKey> {
        object.own_keys()
    }

    /// Resume a generator with `next(value)`
    pub fn generator_next(&mut self, generator: &Value, value: Value) -> Result<IterResult, Throw> {
        self.context.generator_resume(generator, Resumption::Next(value))
    }

    /// Resume a generator with `return(value)`
    pub fn generator_return(&mut self, generator: &Value, value: Value) -> Result<IterResult, Throw> {
        self.context.generator_resume(generator, Resumption::Return(value))
    }

    /// Resume a generator with `throw(value)`
    pub fn generator_throw(&mut self, generator: &Value, value: Value) -> Result<IterResult, Throw> {
        self.context.generator_resume(generator, Resumption::Throw(value))
    }

    /// Convert a script exception into a host error
    pub fn to_js_error(&self, throw: &Throw) -> JsError {
        self.context.to_js_error(throw)
    }

    /// The execution context
    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// The execution context, for calling into the object model directly
    pub fn context_mut(&mut self) -> &mut ExecutionContext {
        &mut self.context
    }

    /// Replace the backend used by later [`Engine::compile`] calls
    pub fn set_backend(&mut self, backend: Box<dyn Backend>) {
        self.backend = backend;
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
