//! Comprehensive End-to-End JavaScript Execution Tests
//!
//! Runs complete programs through the engine and checks the behavior a host
//! observes:
//! - Complete programs mixing closures, classes, generators and collections
//! - Error reporting: kinds, messages, stacks, suppressed chains
//! - Call depth limits
//! - Tolerant parsing for tooling
//! - Property-based agreement with Rust arithmetic

use std::thread;

use core_types::{ErrorKind, JsError};
use interpreter::{Backend, BytecodeBackend, Engine, EngineConfig, Value};
use parser::{compile, parse, CompileOptions, ParseOptions};
use proptest::prelude::*;

/// Helper function to execute JavaScript source code through the full pipeline
fn execute_js(source: &str) -> Result<Value, JsError> {
    Engine::default().eval(source)
}

fn run(source: &str) -> String {
    match execute_js(source) {
        Ok(value) => value.to_string(),
        Err(error) => panic!("Execution failed: {}\n{}", error, source),
    }
}

// ============================================================================
// Complete Programs
// ============================================================================

#[test]
fn test_event_queue_program() {
    let source = r#"
        class Emitter {
            name = 'emitter';
            constructor() { this.listeners = new Map(); }
            on(name, fn) {
                if (!this.listeners.has(name)) this.listeners.set(name, []);
                this.listeners.get(name).push(fn);
                return this;
            }
            emit(name, ...args) {
                for (const fn of this.listeners.get(name) ?? []) fn(...args);
            }
        }
        const seen = [];
        const e = new Emitter();
        e.on('data', x => seen.push('a' + x)).on('data', x => seen.push('b' + x));
        e.emit('data', 1);
        e.emit('none');
        seen.join()
    "#;
    assert_eq!(run(source), "a1,b1");
}

#[test]
fn test_tree_walk_program() {
    let source = r#"
        class Node {
            constructor(value, children = []) { this.value = value; this.children = children; }
            *walk() {
                yield this.value;
                for (const child of this.children) yield* child.walk();
            }
        }
        const tree = new Node(1, [new Node(2, [new Node(4)]), new Node(3)]);
        const values = [...tree.walk()];
        let total = 0;
        for (const v of tree.walk()) total += v;
        values.join('-') + '=' + total
    "#;
    assert_eq!(run(source), "1-2-4-3=10");
}

#[test]
fn test_memoized_fibonacci() {
    let source = r#"
        const memo = new Map();
        function fib(n) {
            if (n < 2) return n;
            if (memo.has(n)) return memo.get(n);
            const value = fib(n - 1) + fib(n - 2);
            memo.set(n, value);
            return value;
        }
        fib(70)
    "#;
    assert_eq!(execute_js(source).unwrap(), Value::from(190392490709135.0));
}

#[test]
fn test_word_frequency_program() {
    let source = r#"
        const text = 'the cat and the hat and the bat';
        const counts = new Map();
        let start = 0;
        const words = [];
        for (let i = 0; i <= text.length; i++) {
            if (i === text.length || text.charAt(i) === ' ') {
                words.push(text.slice(start, i));
                start = i + 1;
            }
        }
        for (const w of words) counts.set(w, (counts.get(w) ?? 0) + 1);
        const out = [];
        counts.forEach((n, w) => { if (n > 1) out.push(w + ':' + n); });
        out.join(' ')
    "#;
    assert_eq!(run(source), "the:3 and:2");
}

#[test]
fn test_regexp_driven_parser_program() {
    let source = r#"
        const line = /^(?<key>\w+)\s*=\s*(?<value>\d+)$/;
        const config = {};
        for (const entry of ['width = 80', 'height=24', 'bad line']) {
            const m = line.exec(entry);
            if (m) config[m.groups.key] = Number(m.groups.value);
        }
        Object.keys(config).join() + ':' + (config.width * config.height)
    "#;
    assert_eq!(run(source), "width,height:1920");
}

#[test]
fn test_weak_map_private_state() {
    let source = r#"
        const secrets = new WeakMap();
        class Account {
            constructor(balance) { secrets.set(this, balance); }
            deposit(n) { secrets.set(this, secrets.get(this) + n); return this; }
            get balance() { return secrets.get(this); }
        }
        const a = new Account(10).deposit(5);
        const b = new Account(1);
        [a.balance, b.balance, Object.keys(a).length].join()
    "#;
    assert_eq!(run(source), "15,1,0");
}

// ============================================================================
// Error Reporting
// ============================================================================

#[test]
fn test_uncaught_error_kinds_and_messages() {
    let cases = [
        ("let o = null; o.field", ErrorKind::TypeError),
        ("notDefinedAnywhere + 1", ErrorKind::ReferenceError),
        ("(1).toFixed(500)", ErrorKind::RangeError),
        ("new RegExp('(')", ErrorKind::SyntaxError),
        ("throw 'text'", ErrorKind::Thrown),
    ];
    for (source, kind) in cases {
        let error = execute_js(source).unwrap_err();
        assert_eq!(error.kind, kind, "{}", source);
        assert!(!error.message.is_empty(), "{}", source);
    }
}

#[test]
fn test_uncaught_error_stack_frames() {
    let mut engine = Engine::new(EngineConfig::new().with_source_name("stack.js"));
    let source = "function a() { b(); }\nfunction b() { throw new TypeError('deep'); }\na();";
    let error = engine.eval(source).unwrap_err();
    assert_eq!(error.kind, ErrorKind::TypeError);
    assert_eq!(error.message, "deep");
    let names: Vec<Option<&str>> = error
        .stack
        .iter()
        .map(|frame| frame.function_name.as_deref())
        .collect();
    assert_eq!(names.first(), Some(&Some("b")));
    assert_eq!(names.get(1), Some(&Some("a")));
    assert_eq!(error.stack[0].line, 2);
    assert!(error.stack.iter().all(|f| f.source_url.as_deref() == Some("stack.js")));
}

#[test]
fn test_suppressed_error_chain() {
    let source = r#"
        try {
            try { throw new Error('first'); }
            finally { throw new TypeError('second'); }
        } catch (e) {
            e.message + '<' + e.suppressed.message
        }
    "#;
    assert_eq!(run(source), "second<first");
}

#[test]
fn test_suppressed_error_reaches_host() {
    let error = execute_js("try { throw new RangeError('first'); } finally { throw new TypeError('second'); }")
        .unwrap_err();
    assert_eq!(error.kind, ErrorKind::TypeError);
    let suppressed = error.suppressed.expect("suppressed error");
    assert_eq!(suppressed.kind, ErrorKind::RangeError);
    assert_eq!(suppressed.message, "first");
}

#[test]
fn test_generator_finally_error_is_chained() {
    let source = r#"
        function* g() {
            try { yield 1; }
            finally { throw new Error('cleanup failed'); }
        }
        const it = g();
        it.next();
        try { it.throw(new Error('original')); } catch (e) { e.message + '<' + e.suppressed.message }
    "#;
    assert_eq!(run(source), "cleanup failed<original");
}

#[test]
fn test_stack_frames_record_new_target() {
    let source = r#"
        class Base { constructor() { throw new Error('in base'); } }
        class Derived extends Base { constructor() { super(); } }
        new Derived();
    "#;
    let error = execute_js(source).unwrap_err();
    assert_eq!(error.stack[0].function_name.as_deref(), Some("Base"));
    assert_eq!(error.stack[0].new_target.as_deref(), Some("Derived"));
    assert_eq!(error.stack[1].function_name.as_deref(), Some("Derived"));
    assert_eq!(error.stack[1].new_target.as_deref(), Some("Derived"));
    assert!(error.stack.last().map_or(false, |frame| frame.new_target.is_none()));

    let rendered = run("try { new (class Thing { constructor() { null.x; } })() } catch (e) { e.stack }");
    assert!(rendered.contains("at new Thing"), "{}", rendered);
}

#[test]
fn test_caught_errors_leave_engine_usable() {
    let mut engine = Engine::default();
    assert!(engine.eval("throw new Error('x')").is_err());
    assert_eq!(engine.eval("'still running'").unwrap(), Value::from("still running"));
}

// ============================================================================
// Call Depth
// ============================================================================

#[test]
fn test_default_call_depth_overflow() {
    let mut engine = Engine::default();
    let error = engine
        .eval("function recurse(n) { return recurse(n + 1) + 1; } recurse(0)")
        .unwrap_err();
    assert_eq!(error.kind, ErrorKind::RangeError);
    assert_eq!(error.message, "Maximum call stack size exceeded");
    let caught = engine
        .eval("function again() { again(); } try { again(); 'no' } catch (e) { e instanceof RangeError }")
        .unwrap();
    assert_eq!(caught, Value::from(true));
}

#[test]
fn test_default_call_depth_on_small_thread() {
    // Deep script recursion must not depend on the host thread's stack size
    let handle = thread::Builder::new()
        .stack_size(512 * 1024)
        .spawn(|| {
            let mut engine = Engine::default();
            let caught = engine
                .eval("function r(n) { return r(n + 1); } try { r(0) } catch (e) { e instanceof RangeError }")
                .map(|value| value == Value::from(true));
            let depth = engine
                .eval("function d(n) { return n === 0 ? 0 : 1 + d(n - 1); } d(200)")
                .map(|value| value == Value::from(200));
            (caught.unwrap_or(false), depth.unwrap_or(false))
        })
        .expect("spawn");
    assert_eq!(handle.join().expect("thread panicked"), (true, true));
}

#[test]
fn test_small_call_depth_budget() {
    let mut engine = Engine::new(EngineConfig::new().with_max_call_depth(10));
    assert_eq!(
        engine.eval("function d(n) { return n === 0 ? 0 : d(n - 1); } d(5)").unwrap(),
        Value::from(0)
    );
    let error = engine.eval("d(20)").unwrap_err();
    assert_eq!(error.kind, ErrorKind::RangeError);
}

#[test]
fn test_deeply_nested_source() {
    let nested = |depth: usize| format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
    assert_eq!(execute_js(&nested(150)).unwrap(), Value::from(1));

    let error = execute_js(&nested(5000)).unwrap_err();
    assert_eq!(error.kind, ErrorKind::SyntaxError);

    let arrays = format!("{}{}.length", "[".repeat(150), "]".repeat(150));
    assert_eq!(execute_js(&arrays).unwrap(), Value::from(1));
}

// ============================================================================
// Tolerant Parsing
// ============================================================================

#[test]
fn test_tolerant_parse_runs_recovered_statements() {
    let source = "var a = 1;\nvar = ;\nvar b = a + 1;\nb";
    let output = parse(source, &ParseOptions::new().with_tolerant(true)).unwrap();
    assert!(output.has_errors());
    assert_eq!(output.diagnostics.len(), 1);

    let chunk = compile(&output.program, &CompileOptions::default()).unwrap();
    let mut engine = Engine::default();
    let unit = BytecodeBackend.compile(chunk);
    let value = unit.invoke(&mut engine, Value::Undefined, &[]).unwrap();
    assert_eq!(value, Value::from(2));
}

#[test]
fn test_strict_parse_rejects_same_source() {
    let error = Engine::default().eval("var a = 1;\nvar = ;").unwrap_err();
    assert_eq!(error.kind, ErrorKind::SyntaxError);
    assert_eq!(error.source_position.map(|p| p.line), Some(2));
}

// ============================================================================
// Property-Based Tests
// ============================================================================

proptest! {
    #[test]
    fn prop_integer_arithmetic_matches(a in -10_000i32..10_000, b in -10_000i32..10_000) {
        let source = format!("({a}) * 3 + ({b}) - ({a}) % 7");
        let expected = (a as f64) * 3.0 + (b as f64) - ((a % 7) as f64);
        prop_assert_eq!(execute_js(&source).unwrap(), Value::Number(expected));
    }

    #[test]
    fn prop_string_length_matches(s in "[a-z ]{0,16}") {
        let source = format!("'{}'.length", s);
        prop_assert_eq!(execute_js(&source).unwrap(), Value::from(s.chars().count()));
    }

    #[test]
    fn prop_array_sum_matches(values in proptest::collection::vec(-1000i32..1000, 0..20)) {
        let literal = values.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ");
        let source = format!("let t = 0; for (const v of [{}]) t += v; t", literal);
        let expected: i32 = values.iter().sum();
        prop_assert_eq!(execute_js(&source).unwrap(), Value::from(expected));
    }
}
