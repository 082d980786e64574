//! Execution backends
//!
//! A [`Backend`] turns a compiled [`BytecodeChunk`] into an
//! [`ExecutableUnit`] the engine can invoke any number of times. The
//! in-tree [`BytecodeBackend`] runs chunks on the dispatch loop; other
//! backends only have to honor the same contract.

use std::fmt;
use std::rc::Rc;

use bytecode_system::BytecodeChunk;
use core_types::JsError;

use crate::call_frame::CallFrame;
use crate::completion::Completion;
use crate::engine::Engine;
use crate::upvalue::Upvalue;
use crate::value::Value;

/// Something the engine can run: `invoke(this, args) -> value | error`
pub trait ExecutableUnit: fmt::Debug {
    /// Run the unit with the given receiver and arguments. Uncaught
    /// exceptions surface as a [`JsError`].
    fn invoke(&self, engine: &mut Engine, this: Value, args: &[Value]) -> Result<Value, JsError>;

    /// The chunk this unit was produced from
    fn chunk(&self) -> &Rc<BytecodeChunk>;
}

/// Produces executable units from compiled chunks
pub trait Backend: fmt::Debug {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Prepare `chunk` for execution
    fn compile(&self, chunk: Rc<BytecodeChunk>) -> Rc<dyn ExecutableUnit>;
}

/// Runs chunks directly on the bytecode dispatch loop
#[derive(Debug, Default, Clone, Copy)]
pub struct BytecodeBackend;

impl Backend for BytecodeBackend {
    fn name(&self) -> &'static str {
        "bytecode"
    }

    fn compile(&self, chunk: Rc<BytecodeChunk>) -> Rc<dyn ExecutableUnit> {
        Rc::new(BytecodeUnit { chunk })
    }
}

/// A top-level chunk executed by the dispatch loop
#[derive(Debug, Clone)]
pub struct BytecodeUnit {
    chunk: Rc<BytecodeChunk>,
}

impl ExecutableUnit for BytecodeUnit {
    fn invoke(&self, engine: &mut Engine, this: Value, args: &[Value]) -> Result<Value, JsError> {
        let context = engine.context_mut();
        let mut frame = CallFrame::new(self.chunk.clone(), Rc::from(Vec::<Upvalue>::new()), args);
        frame.this = Some(match this {
            Value::Undefined if !self.chunk.strict => Value::Object(context.global_object()),
            this => this,
        });
        match context.run_frame(&mut frame) {
            Ok(Completion::Return(value)) => Ok(value),
            Ok(Completion::Yield(_) | Completion::GeneratorStart) => Ok(Value::Undefined),
            Err(throw) => Err(context.to_js_error(&throw)),
        }
    }

    fn chunk(&self) -> &Rc<BytecodeChunk> {
        &self.chunk
    }
}

/// A compiled script, ready to run in the engine that compiled it
#[derive(Debug, Clone)]
pub struct Script {
    unit: Rc<dyn ExecutableUnit>,
}

impl Script {
    pub(crate) fn new(unit: Rc<dyn ExecutableUnit>) -> Self {
        Self { unit }
    }

    /// The compiled top-level chunk
    pub fn chunk(&self) -> &Rc<BytecodeChunk> {
        self.unit.chunk()
    }
}

impl ExecutableUnit for Script {
    fn invoke(&self, engine: &mut Engine, this: Value, args: &[Value]) -> Result<Value, JsError> {
        self.unit.invoke(engine, this, args)
    }

    fn chunk(&self) -> &Rc<BytecodeChunk> {
        self.unit.chunk()
    }
}
