//! Core error and source-location types shared by the engine crates.
//!
//! This crate provides the foundational types every stage of the pipeline
//! reports through: errors, source positions and spans, and diagnostics.
//!
//! # Overview
//!
//! - [`JsError`] - JavaScript errors with stack traces
//! - [`ErrorKind`] - Types of JavaScript errors
//! - [`SourcePosition`] - Line/column/offset location
//! - [`Span`] - Byte range of a syntax node
//! - [`LineIndex`] - Offset to line/column mapping
//! - [`StackFrame`] - Call stack frame information
//! - [`Diagnostic`] - Problems recorded by tolerant parsing
//!
//! # Examples
//!
//! ```
//! use core_types::{ErrorKind, JsError, LineIndex};
//!
//! let source = "let a;\nlet b = ;";
//! let position = LineIndex::new(source).position(15);
//! let error = JsError::syntax("Unexpected token ';'", position);
//!
//! assert_eq!(error.kind, ErrorKind::SyntaxError);
//! assert_eq!(position.line, 2);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod diagnostic;
mod error;
mod source;

pub use diagnostic::{Diagnostic, Severity};
pub use error::{ErrorKind, JsError};
pub use source::{LineIndex, SourcePosition, Span, StackFrame};
