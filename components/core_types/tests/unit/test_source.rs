//! Unit tests for SourcePosition, Span, LineIndex and StackFrame

use core_types::{LineIndex, SourcePosition, Span, StackFrame};

#[test]
fn test_source_position_default_is_start_of_file() {
    let pos = SourcePosition::default();
    assert_eq!((pos.line, pos.column, pos.offset), (1, 1, 0));
}

#[test]
fn test_span_merge_is_order_independent() {
    let a = Span::new(4, 9);
    let b = Span::new(1, 5);
    assert_eq!(a.to(b), Span::new(1, 9));
    assert_eq!(b.to(a), Span::new(1, 9));
}

#[test]
fn test_span_slice_selects_exact_text() {
    let source = "function f() { return 1; }";
    let start = source.find("return").unwrap();
    let span = Span::new(start, start + "return 1;".len());
    assert_eq!(span.slice(source), "return 1;");
    assert_eq!(span.len(), 9);
}

#[test]
fn test_line_index_positions_past_end_clamp() {
    let index = LineIndex::new("ab\ncd");
    let pos = index.position(100);
    assert_eq!(pos.line, 2);
    assert_eq!(pos.column, 3);
    assert_eq!(pos.offset, 5);
}

#[test]
fn test_line_index_crlf_is_single_terminator() {
    let index = LineIndex::new("a\r\nb");
    assert_eq!(index.line_count(), 2);
    assert_eq!(index.position(3), SourcePosition::new(2, 1, 3));
}

#[test]
fn test_stack_frame_display() {
    let frame = StackFrame {
        function_name: Some("outer".to_string()),
        source_url: Some("lib.js".to_string()),
        line: 7,
        column: 12,
        new_target: None,
    };
    assert_eq!(frame.to_string(), "at outer (lib.js:7:12)");
}
