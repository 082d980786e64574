//! Parser to Bytecode Integration Tests
//!
//! Tests the integration between the parser and bytecode_system components.
//! Verifies that source parsed into an AST compiles into chunks with the
//! metadata the interpreter relies on.

use std::rc::Rc;

use bytecode_system::{BytecodeChunk, FunctionKind, Opcode};
use core_types::ErrorKind;
use parser::{compile, parse, CompileOptions, ParseOptions};

/// Helper: parse and compile with default options
fn compile_source(source: &str) -> Rc<BytecodeChunk> {
    let output = parse(source, &ParseOptions::default()).expect("Failed to parse");
    assert!(!output.has_errors());
    compile(&output.program, &CompileOptions::default()).expect("Failed to compile")
}

fn contains(chunk: &BytecodeChunk, predicate: impl Fn(&Opcode) -> bool) -> bool {
    chunk.instructions.iter().any(|i| predicate(&i.opcode))
}

/// Test: A script chunk ends by returning its completion value
#[test]
fn test_script_chunk_returns() {
    let chunk = compile_source("42;");
    assert_eq!(chunk.kind, FunctionKind::Script);
    assert!(contains(&chunk, |op| matches!(op, Opcode::LoadConstant(_))));
    assert!(matches!(
        chunk.instructions.last().map(|i| &i.opcode),
        Some(Opcode::Return)
    ));
}

/// Test: Function declarations become nested chunks created by closures
#[test]
fn test_function_declaration_nested_chunk() {
    let chunk = compile_source("function outer(a, b) { return a + b; }");
    assert_eq!(chunk.nested_functions.len(), 1);
    let outer = &chunk.nested_functions[0];
    assert_eq!(outer.name.as_deref(), Some("outer"));
    assert_eq!(outer.kind, FunctionKind::Normal);
    assert_eq!(outer.param_count, 2);
    assert_eq!(outer.length, 2);
    assert!(outer.is_constructor());
    assert!(contains(&chunk, |op| matches!(op, Opcode::CreateClosure(0, _))));
}

/// Test: Captured variables are described as upvalues
#[test]
fn test_closure_capture_descriptors() {
    let chunk = compile_source(
        "function counter() { let n = 0; return () => ++n; }",
    );
    let counter = &chunk.nested_functions[0];
    assert!(counter.cell_count >= 1);
    let arrow = &counter.nested_functions[0];
    assert_eq!(arrow.kind, FunctionKind::Arrow);
    assert!(!arrow.is_constructor());
    assert!(contains(counter, |op| matches!(
        op,
        Opcode::CreateClosure(_, upvalues) if upvalues.len() == 1 && upvalues[0].is_local
    )));
    assert!(contains(arrow, |op| matches!(op, Opcode::LoadUpvalue(0))));
}

/// Test: Generator functions are flagged and start with GeneratorStart
#[test]
fn test_generator_chunk() {
    let chunk = compile_source("function* g() { yield 1; }");
    let g = &chunk.nested_functions[0];
    assert!(g.is_generator);
    assert!(!g.is_constructor());
    assert!(contains(g, |op| matches!(op, Opcode::GeneratorStart)));
    assert!(contains(g, |op| matches!(op, Opcode::Yield)));
}

/// Test: Derived classes compile to CreateClass with a parent
#[test]
fn test_class_chunk() {
    let chunk = compile_source(
        "class A {} class B extends A { constructor() { super(); } }",
    );
    assert!(contains(&chunk, |op| matches!(op, Opcode::CreateClass { has_parent: true })));
    let derived = chunk
        .nested_functions
        .iter()
        .find(|f| f.kind == FunctionKind::ClassConstructor { derived: true })
        .expect("derived constructor chunk");
    assert!(contains(derived, |op| matches!(op, Opcode::SuperCall(0))));
}

/// Test: try/finally compiles to a finally handler
#[test]
fn test_try_finally_chunk() {
    let chunk = compile_source("try { f(); } finally { g(); }");
    assert!(contains(&chunk, |op| matches!(op, Opcode::PushFinally { .. })));
    assert!(contains(&chunk, |op| matches!(op, Opcode::EndFinally)));
}

/// Test: Regular expression literals keep pattern and flags as constants
#[test]
fn test_regexp_literal_chunk() {
    let chunk = compile_source("/a+b/gi;");
    assert!(contains(&chunk, |op| matches!(op, Opcode::CreateRegExp(_, _))));
    let strings: Vec<String> = chunk
        .constants
        .iter()
        .filter_map(|c| match c {
            bytecode_system::Constant::String(s) => Some(s.to_string()),
            _ => None,
        })
        .collect();
    assert!(strings.contains(&"a+b".to_string()));
    assert!(strings.contains(&"gi".to_string()));
}

/// Test: Strict directives propagate to the chunk
#[test]
fn test_strict_flag() {
    assert!(compile_source("'use strict'; 1;").strict);
    assert!(!compile_source("1;").strict);
    let output = parse("1;", &ParseOptions::new().with_strict(true)).unwrap();
    let chunk = compile(&output.program, &CompileOptions::default()).unwrap();
    assert!(chunk.strict);
}

/// Test: Instructions carry source positions
#[test]
fn test_instruction_positions() {
    let chunk = compile_source("1;\n\n  foo();");
    let positions: Vec<u32> = (0..chunk.instruction_count())
        .filter_map(|ip| chunk.position_at(ip))
        .map(|p| p.line)
        .collect();
    assert!(positions.contains(&1));
    assert!(positions.contains(&3));
}

/// Test: The source name reaches every chunk
#[test]
fn test_source_name_propagates() {
    let output = parse("function f() {}", &ParseOptions::default()).unwrap();
    let chunk = compile(&output.program, &CompileOptions::new().with_source_name("lib.js")).unwrap();
    assert_eq!(chunk.source_name.as_deref(), Some("lib.js"));
    assert_eq!(chunk.nested_functions[0].source_name.as_deref(), Some("lib.js"));
}

/// Test: Syntax errors stop a strict parse
#[test]
fn test_syntax_error() {
    let error = parse("let x = ;", &ParseOptions::default()).unwrap_err();
    assert_eq!(error.kind, ErrorKind::SyntaxError);
    assert!(error.source_position.is_some());
}

/// Test: Tolerant parsing recovers at statement boundaries and still compiles
#[test]
fn test_tolerant_parse_compiles_recovered_program() {
    let options = ParseOptions::new().with_tolerant(true);
    let output = parse("let a = 1;\nlet = ;\nlet b = 2;", &options).unwrap();
    assert_eq!(output.diagnostics.len(), 1);
    assert_eq!(output.diagnostics[0].position.line, 2);
    assert_eq!(output.program.body.len(), 2);
    assert!(compile(&output.program, &CompileOptions::default()).is_ok());
}

/// Test: Async functions parse but are rejected by the compiler
#[test]
fn test_async_rejected_at_compile() {
    let output = parse("async function f() {}", &ParseOptions::default()).unwrap();
    let error = compile(&output.program, &CompileOptions::default()).unwrap_err();
    assert_eq!(error.kind, ErrorKind::InternalError);
}
