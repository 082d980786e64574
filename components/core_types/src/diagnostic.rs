//! Diagnostics collected during tolerant parsing.

use std::fmt;

use crate::{JsError, SourcePosition, Span};

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The input is invalid; the affected statement was skipped
    Error,
    /// The input is valid but suspicious
    Warning,
}

/// A message about a location in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity of the problem
    pub severity: Severity,
    /// Human-readable description
    pub message: String,
    /// Byte range the diagnostic applies to
    pub span: Span,
    /// Line/column of the start of the span
    pub position: SourcePosition,
}

impl Diagnostic {
    /// Creates an error diagnostic.
    pub fn error(message: impl Into<String>, span: Span, position: SourcePosition) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            span,
            position,
        }
    }

    /// Converts a syntax error into a diagnostic anchored at its position.
    pub fn from_error(error: &JsError) -> Self {
        let position = error.source_position.unwrap_or_default();
        Self::error(error.message.clone(), Span::empty(position.offset), position)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {} at {}", label, self.message, self.position)
    }
}
