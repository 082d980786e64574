//! Unit tests for JsError and ErrorKind

use core_types::{Diagnostic, ErrorKind, JsError, Severity, SourcePosition};

#[test]
fn test_error_display_includes_kind() {
    let error = JsError::range_error("call stack exceeded");
    assert_eq!(error.to_string(), "RangeError: call stack exceeded");
}

#[test]
fn test_thrown_kind_displays_as_error() {
    let error = JsError::new(ErrorKind::Thrown, "boom");
    assert_eq!(error.to_string(), "Error: boom");
}

#[test]
fn test_syntax_error_carries_position() {
    let error = JsError::syntax("Unexpected end of input", SourcePosition::new(1, 8, 7));
    assert_eq!(error.kind, ErrorKind::SyntaxError);
    assert_eq!(error.source_position.map(|p| p.column), Some(8));
}

#[test]
fn test_error_is_std_error() {
    fn takes_error(_: &dyn std::error::Error) {}
    takes_error(&JsError::internal("bad state"));
}

#[test]
fn test_diagnostic_from_error() {
    let error = JsError::syntax("Unexpected token", SourcePosition::new(3, 1, 20));
    let diagnostic = Diagnostic::from_error(&error);
    assert_eq!(diagnostic.severity, Severity::Error);
    assert_eq!(diagnostic.position.line, 3);
    assert_eq!(diagnostic.message, "Unexpected token");
}
