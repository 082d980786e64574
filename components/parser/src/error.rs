//! Parser error types and helpers

use core_types::{ErrorKind, JsError, SourcePosition};

/// Create a syntax error at a given position
pub fn syntax_error(message: impl Into<String>, position: Option<SourcePosition>) -> JsError {
    JsError {
        source_position: position,
        ..JsError::new(ErrorKind::SyntaxError, message)
    }
}

/// Create an unexpected token error
pub fn unexpected_token(expected: &str, got: &str, position: Option<SourcePosition>) -> JsError {
    syntax_error(format!("Expected {}, got {}", expected, got), position)
}

/// Create an unexpected end of input error
pub fn unexpected_eof(position: Option<SourcePosition>) -> JsError {
    syntax_error("Unexpected end of input", position)
}

/// Create an error for a construct the engine parses but cannot run
pub fn unsupported(feature: &str, position: Option<SourcePosition>) -> JsError {
    JsError {
        source_position: position,
        ..JsError::new(
            ErrorKind::InternalError,
            format!("{} is not supported", feature),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error() {
        let err = syntax_error("test", None);
        assert!(matches!(err.kind, ErrorKind::SyntaxError));
    }

    #[test]
    fn test_unexpected_token() {
        let err = unexpected_token("identifier", "number", None);
        assert!(err.message.contains("Expected"));
    }

    #[test]
    fn test_unsupported_is_internal() {
        let err = unsupported("async functions", Some(SourcePosition::new(1, 1, 0)));
        assert_eq!(err.kind, ErrorKind::InternalError);
        assert_eq!(err.message, "async functions is not supported");
    }
}
