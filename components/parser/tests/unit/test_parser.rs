use core_types::ErrorKind;
use parser::ast::{Expression, Statement};
use parser::{parse, ParseOptions};

fn parse_ok(source: &str) -> parser::Program {
    parse(source, &ParseOptions::default()).unwrap().program
}

#[test]
fn test_syntax_error_carries_position() {
    let err = parse("let a = 1;\nlet b = ;", &ParseOptions::default()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::SyntaxError);
    let position = err.source_position.unwrap();
    assert_eq!(position.line, 2);
    assert_eq!(position.column, 9);
}

#[test]
fn test_tolerant_mode_collects_diagnostics() {
    let output = parse(
        "let = ;\nf();\nlet = ;\ng();",
        &ParseOptions::new().with_tolerant(true),
    )
    .unwrap();
    assert_eq!(output.diagnostics.len(), 2);
    assert_eq!(output.program.body.len(), 2);
    assert_eq!(output.diagnostics[1].position.line, 3);
}

#[test]
fn test_var_hoisting_reaches_function_scope() {
    let program = parse_ok("function f() { if (x) { var a; let b; } for (var i of xs) {} }");
    let Statement::FunctionDeclaration { function, .. } = &program.body[0] else {
        panic!("expected function declaration");
    };
    assert_eq!(function.hoisting.var_names, vec!["a", "i"]);
    assert!(function.hoisting.lexical.is_empty());
}

#[test]
fn test_duplicate_lexical_declaration_is_rejected() {
    let err = parse("let a; const a = 1;", &ParseOptions::default()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::SyntaxError);
    assert!(parse("var a; var a;", &ParseOptions::default()).is_ok());
}

#[test]
fn test_strict_directive() {
    assert!(parse_ok("'use strict'; x").strict);
    assert!(!parse_ok("x; 'use strict'").strict);
    let err = parse("'use strict'; with (o) {}", &ParseOptions::default()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::SyntaxError);
}

#[test]
fn test_arrow_functions_and_destructuring_params() {
    let program = parse_ok("const f = ({ a, b: [c] }, ...rest) => a + c;");
    let Statement::VariableDeclaration { declarations, .. } = &program.body[0] else {
        panic!("expected declaration");
    };
    let Some(Expression::ArrowFunctionExpression { function, .. }) = &declarations[0].init else {
        panic!("expected arrow function");
    };
    assert_eq!(function.params.len(), 2);
    assert_eq!(function.length(), 1);
}

#[test]
fn test_break_outside_loop_is_rejected() {
    assert!(parse("break;", &ParseOptions::default()).is_err());
    assert!(parse("a: { break a; }", &ParseOptions::default()).is_ok());
    assert!(parse("a: { continue a; }", &ParseOptions::default()).is_err());
}

#[test]
fn test_statement_spans_reproduce_source() {
    let forms = [
        "if (a) b(); else c();",
        "for (let i = 0; i < 3; i++) { sum += i; }",
        "while (x) x--;",
        "try { a(); } catch (e) { b(e); } finally { c(); }",
        "function f(a, b = 1) { return a + b; }",
        "class K extends B { m() { return super.m(); } }",
        "switch (x) { case 1: y(); break; default: z(); }",
        "outer: for (;;) break outer;",
        "throw new Error('x');",
        "const { a, b: [c] } = o;",
    ];
    for source in forms {
        let program = parse_ok(source);
        assert_eq!(program.body.len(), 1, "{}", source);
        assert_eq!(program.body[0].span().slice(source), source);
    }
}

#[test]
fn test_expression_spans_reproduce_source() {
    let forms = [
        "a + b * c",
        "f(x, ...rest)",
        "obj.prop[0].call()",
        "x => x * 2",
        "new Foo(1, 2)",
        "cond ? yes : no",
        "[1, , ...more]",
        "a = b ||= c",
        "typeof value === 'string'",
        "i++",
        "`t${x}u`",
        "a?.b?.(c)",
    ];
    for text in forms {
        let source = format!("{};", text);
        let program = parse_ok(&source);
        let Statement::ExpressionStatement { expression, .. } = &program.body[0] else {
            panic!("expected expression statement for {}", text);
        };
        assert_eq!(expression.span().slice(&source), text);
    }
}

#[test]
fn test_pattern_spans_reproduce_source() {
    let cases = [
        ("var { a, b: [c, d = 1], ...rest } = o;", "{ a, b: [c, d = 1], ...rest }", "o"),
        ("let [x, , y = f()] = arr;", "[x, , y = f()]", "arr"),
        ("const name = 'n' + 1;", "name", "'n' + 1"),
    ];
    for (source, pattern, init) in cases {
        let program = parse_ok(source);
        let Statement::VariableDeclaration { declarations, .. } = &program.body[0] else {
            panic!("expected declaration for {}", source);
        };
        assert_eq!(declarations[0].id.span().slice(source), pattern);
        let value = declarations[0].init.as_ref().expect("initializer");
        assert_eq!(value.span().slice(source), init);
    }
}
