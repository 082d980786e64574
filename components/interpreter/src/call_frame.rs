//! Call frame for one activation of a bytecode chunk
//!
//! A frame owns everything a running function needs: its registers,
//! operand stack, cell table, the exception handlers installed by `try`
//! statements, and the finally blocks currently executing. Generators keep
//! their frame boxed inside the generator object between resumptions, so
//! nothing in a frame refers to the native stack.

use std::rc::Rc;

use bytecode_system::{BytecodeChunk, RegisterId};

use crate::object::ObjectRef;
use crate::upvalue::Upvalue;
use crate::value::Value;

/// What an exception handler does when an exception reaches it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HandlerKind {
    /// Push the exception and jump to the catch block
    Catch,
    /// Record a throw completion in the two registers and jump to the
    /// finally block
    Finally {
        kind: RegisterId,
        value: RegisterId,
    },
}

/// An installed exception handler
#[derive(Debug, Clone, Copy)]
pub(crate) struct Handler {
    pub kind: HandlerKind,
    pub target: usize,
    /// Operand stack height when the handler was installed
    pub stack_depth: usize,
    /// Number of finally blocks executing when the handler was installed
    pub finally_depth: usize,
}

/// A finally block that is executing, with the registers holding the
/// completion it will resume once it ends
#[derive(Debug, Clone, Copy)]
pub(crate) struct FinallyRecord {
    pub kind: RegisterId,
    pub value: RegisterId,
}

/// How a suspended generator is being resumed
#[derive(Debug, Clone)]
pub enum Resumption {
    /// `next(value)`: the suspended `yield` evaluates to the value
    Next(Value),
    /// `throw(value)`: the suspended `yield` throws the value
    Throw(Value),
    /// `return(value)`: finish early, running active finally blocks
    Return(Value),
}

/// Call frame representing a function invocation
#[derive(Debug)]
pub struct CallFrame {
    pub(crate) chunk: Rc<BytecodeChunk>,
    /// The function object being run; `None` for script code
    pub(crate) callee: Option<ObjectRef>,
    pub(crate) upvalues: Rc<[Upvalue]>,
    pub(crate) registers: Vec<Value>,
    pub(crate) cells: Vec<Upvalue>,
    pub(crate) stack: Vec<Value>,
    pub(crate) ip: usize,
    /// `None` in a derived constructor until `super()` returns
    pub(crate) this: Option<Value>,
    pub(crate) new_target: Value,
    pub(crate) home_object: Option<ObjectRef>,
    pub(crate) arguments: Vec<Value>,
    pub(crate) handlers: Vec<Handler>,
    pub(crate) finally_records: Vec<FinallyRecord>,
    /// Pending generator resumption, consumed when the frame runs again
    pub(crate) resume: Option<Resumption>,
}

impl CallFrame {
    /// Create a frame for `chunk`, filling parameter registers from `args`
    pub fn new(chunk: Rc<BytecodeChunk>, upvalues: Rc<[Upvalue]>, args: &[Value]) -> Self {
        let mut registers = vec![Value::Undefined; chunk.register_count as usize];
        for (register, arg) in registers
            .iter_mut()
            .zip(args.iter())
            .take(chunk.param_count as usize)
        {
            *register = arg.clone();
        }
        let cells = (0..chunk.cell_count).map(|_| Upvalue::default()).collect();
        Self {
            chunk,
            callee: None,
            upvalues,
            registers,
            cells,
            stack: Vec::with_capacity(16),
            ip: 0,
            this: Some(Value::Undefined),
            new_target: Value::Undefined,
            home_object: None,
            arguments: args.to_vec(),
            handlers: Vec::new(),
            finally_records: Vec::new(),
            resume: None,
        }
    }

    /// The chunk being executed
    pub fn chunk(&self) -> &Rc<BytecodeChunk> {
        &self.chunk
    }

    /// Current instruction index
    pub fn ip(&self) -> usize {
        self.ip
    }

    pub(crate) fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    pub(crate) fn pop(&mut self) -> Value {
        self.stack.pop().unwrap_or_default()
    }

    /// Pop the top `n` values, oldest first
    pub(crate) fn pop_n(&mut self, n: usize) -> Vec<Value> {
        let start = self.stack.len().saturating_sub(n);
        self.stack.split_off(start)
    }

    /// The value `depth` slots below the top
    pub(crate) fn peek(&self, depth: usize) -> Value {
        self.stack
            .len()
            .checked_sub(depth + 1)
            .and_then(|i| self.stack.get(i))
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn register(&self, register: RegisterId) -> Value {
        self.registers
            .get(register.0 as usize)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn set_register(&mut self, register: RegisterId, value: Value) {
        let index = register.0 as usize;
        if index >= self.registers.len() {
            self.registers.resize(index + 1, Value::Undefined);
        }
        self.registers[index] = value;
    }

    pub(crate) fn cell(&self, index: u32) -> Option<&Upvalue> {
        self.cells.get(index as usize)
    }

    pub(crate) fn upvalue(&self, index: u32) -> Option<&Upvalue> {
        self.upvalues.get(index as usize)
    }

    /// Install a handler at the current stack and finally depth
    pub(crate) fn push_handler(&mut self, kind: HandlerKind, target: usize) {
        self.handlers.push(Handler {
            kind,
            target,
            stack_depth: self.stack.len(),
            finally_depth: self.finally_records.len(),
        });
    }
}
