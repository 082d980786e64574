//! JavaScript error types and error handling.
//!
//! This module provides the error type shared by every stage of the engine:
//! the lexer and parser report [`ErrorKind::SyntaxError`], the compiler
//! reports early errors, and the runtime converts uncaught exceptions into a
//! [`JsError`] at the embedding boundary.

use std::fmt;

use thiserror::Error;

use crate::{SourcePosition, StackFrame};

/// The kind of JavaScript error.
///
/// These correspond to JavaScript's built-in error constructors, plus
/// [`ErrorKind::Thrown`] for arbitrary values thrown by script code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Syntax error in JavaScript code
    SyntaxError,
    /// Type error (e.g., calling a non-function)
    TypeError,
    /// Reference to an undefined variable
    ReferenceError,
    /// Value out of allowed range, including call stack exhaustion
    RangeError,
    /// Internal engine error
    InternalError,
    /// A plain `Error` or a non-error value thrown by script
    Thrown,
}

impl ErrorKind {
    /// The constructor name for this kind, as seen by script code.
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::SyntaxError => "SyntaxError",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::ReferenceError => "ReferenceError",
            ErrorKind::RangeError => "RangeError",
            ErrorKind::InternalError => "InternalError",
            ErrorKind::Thrown => "Error",
        }
    }

    /// Maps a constructor name back to an error kind.
    ///
    /// Unknown names (including plain `Error`) map to [`ErrorKind::Thrown`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "SyntaxError" => ErrorKind::SyntaxError,
            "TypeError" => ErrorKind::TypeError,
            "ReferenceError" => ErrorKind::ReferenceError,
            "RangeError" => ErrorKind::RangeError,
            "InternalError" => ErrorKind::InternalError,
            _ => ErrorKind::Thrown,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A JavaScript error with message and stack trace.
///
/// # Examples
///
/// ```
/// use core_types::{JsError, ErrorKind, SourcePosition};
///
/// let error = JsError::new(ErrorKind::TypeError, "undefined is not a function")
///     .with_position(SourcePosition::new(3, 7, 40));
///
/// assert_eq!(error.message, "undefined is not a function");
/// assert_eq!(error.to_string(), "TypeError: undefined is not a function");
/// ```
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct JsError {
    /// The type of error
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Stack trace (call stack at the time of the error)
    pub stack: Vec<StackFrame>,
    /// Source position where the error occurred
    pub source_position: Option<SourcePosition>,
    /// An earlier error that was discarded because this one was raised
    /// while it was still propagating (for example, from a `finally` block)
    pub suppressed: Option<Box<JsError>>,
}

impl JsError {
    /// Creates an error with no stack or position information.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            stack: Vec::new(),
            source_position: None,
            suppressed: None,
        }
    }

    /// Creates a syntax error at the given position.
    pub fn syntax(message: impl Into<String>, position: SourcePosition) -> Self {
        Self::new(ErrorKind::SyntaxError, message).with_position(position)
    }

    /// Creates a type error.
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeError, message)
    }

    /// Creates a range error.
    pub fn range_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RangeError, message)
    }

    /// Creates an internal engine error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalError, message)
    }

    /// Attaches a source position.
    pub fn with_position(mut self, position: SourcePosition) -> Self {
        self.source_position = Some(position);
        self
    }

    /// Attaches a captured stack trace.
    pub fn with_stack(mut self, stack: Vec<StackFrame>) -> Self {
        self.stack = stack;
        self
    }

    /// Attaches the error this one displaced.
    pub fn with_suppressed(mut self, suppressed: JsError) -> Self {
        self.suppressed = Some(Box::new(suppressed));
        self
    }

    /// Formats the error followed by one `at ...` line per stack frame.
    pub fn render_stack(&self) -> String {
        let mut out = self.to_string();
        for frame in &self.stack {
            out.push_str("\n    ");
            out.push_str(&frame.to_string());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_names_round_trip() {
        for kind in [
            ErrorKind::SyntaxError,
            ErrorKind::TypeError,
            ErrorKind::ReferenceError,
            ErrorKind::RangeError,
            ErrorKind::InternalError,
        ] {
            assert_eq!(ErrorKind::from_name(kind.name()), kind);
        }
        assert_eq!(ErrorKind::from_name("Error"), ErrorKind::Thrown);
    }

    #[test]
    fn test_render_stack() {
        let error = JsError::type_error("x is not a function").with_stack(vec![StackFrame {
            function_name: Some("f".to_string()),
            source_url: Some("a.js".to_string()),
            line: 2,
            column: 3,
            new_target: None,
        }]);
        assert_eq!(
            error.render_stack(),
            "TypeError: x is not a function\n    at f (a.js:2:3)"
        );
    }

    #[test]
    fn test_suppressed_chain() {
        let error = JsError::type_error("second").with_suppressed(JsError::range_error("first"));
        let inner = error.suppressed.as_ref().unwrap();
        assert_eq!(inner.kind, ErrorKind::RangeError);
    }
}
