//! Execution context
//!
//! One [`ExecutionContext`] exists per engine. It owns the realm (global
//! object and intrinsics) and the diagnostic call stack, and it is passed
//! explicitly as `&mut` into every operation that can run script code.
//! Nothing is stored in globals or thread-locals, so independent engines
//! can live side by side.

use std::rc::Rc;

use bytecode_system::BytecodeChunk;
use core_types::{ErrorKind, JsError, SourcePosition, StackFrame};

use crate::completion::Throw;
use crate::object::{Attributes, ErrorData, Object, ObjectKind, ObjectRef, Property};
use crate::realm::Realm;
use crate::value::{PropertyKey, Value};

/// Default limit on nested calls
pub const DEFAULT_MAX_CALL_DEPTH: usize = 256;

/// Remaining native stack below which a call continues on a new segment
const STACK_RED_ZONE: usize = 256 * 1024;
const STACK_SEGMENT: usize = 4 * 1024 * 1024;

/// Diagnostic record of one active call
#[derive(Debug, Clone)]
struct ActiveCall {
    name: Option<Rc<str>>,
    chunk: Option<Rc<BytecodeChunk>>,
    /// Name of `new.target` for calls made through `new`
    new_target: Option<Rc<str>>,
    ip: usize,
}

/// Execution context shared by every frame of one engine
#[derive(Debug)]
pub struct ExecutionContext {
    realm: Realm,
    max_call_depth: usize,
    calls: Vec<ActiveCall>,
}

impl ExecutionContext {
    /// Create a context with a fresh realm
    pub fn new(max_call_depth: usize) -> Self {
        Self {
            realm: Realm::new(),
            max_call_depth,
            calls: Vec::with_capacity(64),
        }
    }

    /// The realm's intrinsics
    pub fn realm(&self) -> &Realm {
        &self.realm
    }

    /// The global object
    pub fn global_object(&self) -> ObjectRef {
        self.realm.global.clone()
    }

    /// Number of calls currently active
    pub fn call_depth(&self) -> usize {
        self.calls.len()
    }

    /// Enter a call, failing with a RangeError once the budget is spent
    pub(crate) fn push_call(
        &mut self,
        name: Option<Rc<str>>,
        chunk: Option<Rc<BytecodeChunk>>,
        new_target: Option<Rc<str>>,
    ) -> Result<(), Throw> {
        if self.calls.len() >= self.max_call_depth {
            log::warn!(
                "call stack budget of {} frames exhausted",
                self.max_call_depth
            );
            return Err(self.range_error("Maximum call stack size exceeded"));
        }
        self.calls.push(ActiveCall {
            name,
            chunk,
            new_target,
            ip: 0,
        });
        Ok(())
    }

    pub(crate) fn pop_call(&mut self) {
        self.calls.pop();
    }

    /// Run `body` as one active call. The native stack is extended on
    /// demand, so the call budget rather than the host thread's stack size
    /// bounds recursion.
    pub(crate) fn with_call<T>(
        &mut self,
        name: Option<Rc<str>>,
        chunk: Option<Rc<BytecodeChunk>>,
        new_target: Option<Rc<str>>,
        body: impl FnOnce(&mut Self) -> Result<T, Throw>,
    ) -> Result<T, Throw> {
        self.push_call(name, chunk, new_target)?;
        let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, || body(self));
        self.pop_call();
        result
    }

    /// Record the instruction the innermost call is executing
    pub(crate) fn set_ip(&mut self, ip: usize) {
        if let Some(call) = self.calls.last_mut() {
            call.ip = ip;
        }
    }

    /// The active calls, most recent first
    pub fn capture_stack(&self) -> Vec<StackFrame> {
        self.calls
            .iter()
            .rev()
            .map(|call| {
                let position = call.chunk.as_ref().and_then(|chunk| {
                    chunk
                        .position_at(call.ip)
                        .or(chunk.position)
                });
                let (line, column) = position.map_or((0, 0), |p| (p.line, p.column));
                StackFrame {
                    function_name: call.name.as_deref().map(str::to_string),
                    source_url: call
                        .chunk
                        .as_ref()
                        .and_then(|chunk| chunk.source_name.as_deref())
                        .map(str::to_string),
                    line,
                    column,
                    new_target: call.new_target.as_deref().map(str::to_string),
                }
            })
            .collect()
    }

    /// Source position of the innermost instruction being executed
    pub fn current_position(&self) -> Option<SourcePosition> {
        self.calls
            .iter()
            .rev()
            .find_map(|call| call.chunk.as_ref().and_then(|c| c.position_at(call.ip)))
    }

    /// Create an Error object of the given kind with the current stack
    pub fn create_error(&mut self, kind: ErrorKind, message: &str) -> ObjectRef {
        let prototype = self.realm.error_prototype(kind).clone();
        let frames = self.capture_stack();
        Self::build_error(kind, message, prototype, frames)
    }

    /// Assemble an Error object from its parts; `stack` is rendered from
    /// `frames`
    pub(crate) fn build_error(
        kind: ErrorKind,
        message: &str,
        prototype: ObjectRef,
        frames: Vec<StackFrame>,
    ) -> ObjectRef {
        let mut stack = if message.is_empty() {
            kind.name().to_string()
        } else {
            format!("{}: {}", kind.name(), message)
        };
        for frame in &frames {
            stack.push_str("\n    ");
            stack.push_str(&frame.to_string());
        }
        let error = Object::new(ObjectKind::Error(ErrorData { kind, frames }), Some(prototype));
        let error = ObjectRef::new(error);
        if !message.is_empty() {
            error.insert("message", Value::from(message), Attributes::HIDDEN);
        }
        error.insert("stack", Value::from(stack), Attributes::HIDDEN);
        error
    }

    /// A throw completion carrying a new Error object
    pub fn throw_error(&mut self, kind: ErrorKind, message: impl AsRef<str>) -> Throw {
        Throw::new(Value::Object(self.create_error(kind, message.as_ref())))
    }

    /// Throw a TypeError
    pub fn type_error(&mut self, message: impl AsRef<str>) -> Throw {
        self.throw_error(ErrorKind::TypeError, message)
    }

    /// Throw a RangeError
    pub fn range_error(&mut self, message: impl AsRef<str>) -> Throw {
        self.throw_error(ErrorKind::RangeError, message)
    }

    /// Throw a ReferenceError
    pub fn reference_error(&mut self, message: impl AsRef<str>) -> Throw {
        self.throw_error(ErrorKind::ReferenceError, message)
    }

    /// Throw an InternalError
    pub fn internal_error(&mut self, message: impl AsRef<str>) -> Throw {
        self.throw_error(ErrorKind::InternalError, message)
    }

    /// Convert an uncaught exception into the host-facing error. Error
    /// objects keep their kind, message, stack and suppressed chain; any
    /// other value is reported as [`ErrorKind::Thrown`].
    pub fn to_js_error(&self, throw: &Throw) -> JsError {
        let mut error = self.value_to_js_error(&throw.value, 0);
        if let Some(suppressed) = &throw.suppressed {
            error.suppressed = Some(Box::new(self.to_js_error(suppressed)));
        }
        error
    }

    fn value_to_js_error(&self, value: &Value, depth: usize) -> JsError {
        let Value::Object(object) = value else {
            return JsError::new(ErrorKind::Thrown, value.to_string());
        };
        let data = match &object.borrow().kind {
            ObjectKind::Error(data) => Some(data.clone()),
            _ => None,
        };
        let Some(data) = data else {
            return JsError::new(ErrorKind::Thrown, value.to_string());
        };
        let message = match object.get_own_property(&PropertyKey::from("message")) {
            Some(Property::Data { value, .. }) => value.to_string(),
            _ => String::new(),
        };
        let position = data
            .frames
            .first()
            .filter(|frame| frame.line > 0)
            .map(|frame| SourcePosition::new(frame.line, frame.column, 0));
        let mut error = JsError::new(data.kind, message).with_stack(data.frames);
        error.source_position = position;
        // Bounded: a suppressed chain may loop back through script mutation
        if depth < 16 {
            if let Some(Property::Data { value, .. }) =
                object.get_own_property(&PropertyKey::from("suppressed"))
            {
                error.suppressed = Some(Box::new(self.value_to_js_error(&value, depth + 1)));
            }
        }
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_budget() {
        let mut cx = ExecutionContext::new(2);
        assert!(cx.push_call(Some("a".into()), None, None).is_ok());
        assert!(cx.push_call(Some("b".into()), None, None).is_ok());
        let error = cx.push_call(Some("c".into()), None, None).unwrap_err();
        assert_eq!(cx.to_js_error(&error).kind, ErrorKind::RangeError);
        cx.pop_call();
        assert_eq!(cx.call_depth(), 1);
    }

    #[test]
    fn test_stack_is_most_recent_first() {
        let mut cx = ExecutionContext::new(DEFAULT_MAX_CALL_DEPTH);
        cx.push_call(Some("outer".into()), None, None).unwrap();
        cx.push_call(Some("Inner".into()), None, Some("Derived".into())).unwrap();
        let stack = cx.capture_stack();
        assert_eq!(stack[0].function_name.as_deref(), Some("Inner"));
        assert_eq!(stack[0].new_target.as_deref(), Some("Derived"));
        assert_eq!(stack[1].function_name.as_deref(), Some("outer"));
        assert_eq!(stack[1].new_target, None);
    }

    #[test]
    fn test_error_objects_convert_to_js_errors() {
        let mut cx = ExecutionContext::new(DEFAULT_MAX_CALL_DEPTH);
        let throw = cx.type_error("x is not a function");
        let error = cx.to_js_error(&throw);
        assert_eq!(error.kind, ErrorKind::TypeError);
        assert_eq!(error.message, "x is not a function");
    }

    #[test]
    fn test_thrown_primitives_convert_to_thrown_kind() {
        let cx = ExecutionContext::new(DEFAULT_MAX_CALL_DEPTH);
        let error = cx.to_js_error(&Throw::new(Value::from(42)));
        assert_eq!(error.kind, ErrorKind::Thrown);
        assert_eq!(error.message, "42");
    }

    #[test]
    fn test_suppressed_chain_is_preserved() {
        let mut cx = ExecutionContext::new(DEFAULT_MAX_CALL_DEPTH);
        let first = cx.range_error("first");
        let second = cx.type_error("second").with_suppressed(first);
        let error = cx.to_js_error(&second);
        assert_eq!(error.suppressed.as_ref().map(|e| e.kind), Some(ErrorKind::RangeError));
    }
}
