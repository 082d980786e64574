//! Abrupt completions
//!
//! Script-visible exceptions travel through the interpreter as [`Throw`]
//! values. They become [`core_types::JsError`]s only when they leave the
//! engine (see [`crate::ExecutionContext::to_js_error`]).

use crate::value::Value;

/// An exception propagating through script code
#[derive(Debug, Clone, thiserror::Error)]
#[error("uncaught exception: {value}")]
pub struct Throw {
    /// The thrown value
    pub value: Value,
    /// An exception that was pending in a `finally` block when this one
    /// replaced it
    pub suppressed: Option<Box<Throw>>,
}

impl Throw {
    /// Wrap a thrown value
    pub fn new(value: Value) -> Self {
        Self {
            value,
            suppressed: None,
        }
    }

    /// Chain the exception this one displaced
    pub fn with_suppressed(mut self, suppressed: Throw) -> Self {
        self.suppressed = Some(Box::new(suppressed));
        self
    }
}

/// Why a frame stopped running
#[derive(Debug, Clone)]
pub(crate) enum Completion {
    /// The function returned
    Return(Value),
    /// A generator yielded
    Yield(Value),
    /// A generator finished its prologue and waits for the first `next()`
    GeneratorStart,
}

/// Result of one generator step, as seen by the host
#[derive(Debug, Clone, PartialEq)]
pub struct IterResult {
    /// Produced value
    pub value: Value,
    /// Whether the generator has completed
    pub done: bool,
}

impl IterResult {
    /// A `{ value, done }` pair
    pub fn new(value: Value, done: bool) -> Self {
        Self { value, done }
    }
}
