//! Contract tests: the public surface the interpreter relies on

use core_types::ErrorKind;
use parser::{compile, parse, CompileOptions, ParseOptions, ScopeAnalyzer};

#[test]
fn test_parse_then_compile() {
    let output = parse("let x = 1; x + 1", &ParseOptions::new()).unwrap();
    assert!(!output.has_errors());
    let chunk = compile(&output.program, &CompileOptions::new()).unwrap();
    assert_eq!(chunk.kind, bytecode_system::FunctionKind::Script);
    assert!(chunk.register_count >= 2);
}

#[test]
fn test_errors_are_syntax_errors_with_positions() {
    let err = parse("function (", &ParseOptions::default()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::SyntaxError);
    assert!(err.source_position.is_some());
}

#[test]
fn test_strict_option_applies_to_whole_source() {
    let output = parse("x", &ParseOptions::new().with_strict(true)).unwrap();
    assert!(output.program.strict);
    let chunk = compile(&output.program, &CompileOptions::new()).unwrap();
    assert!(chunk.strict);
}

#[test]
fn test_scope_analysis_of_program() {
    let program = parse("let a; function f() { return a + b; }", &ParseOptions::default())
        .unwrap()
        .program;
    let info = ScopeAnalyzer::analyze_program(&program);
    assert!(info.captured.contains("a"));
    assert!(info.free.contains("b"));
    assert!(!info.free.contains("a"));
}

#[test]
fn test_unsupported_features_are_internal_errors() {
    let program = parse("async function f() { await g(); }", &ParseOptions::default())
        .unwrap()
        .program;
    let err = compile(&program, &CompileOptions::new()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InternalError);
    assert!(err.message.contains("not supported"));
}
