//! Contract tests for interpreter API
//!
//! These tests pin down the host-facing surface: engine construction,
//! compile/run, the property protocol, generator resumption and backends.

use std::rc::Rc;

use bytecode_system::BytecodeChunk;
use core_types::{ErrorKind, JsError};
use interpreter::{
    Backend, BytecodeBackend, Engine, EngineConfig, ExecutableUnit, IterResult, PropertyKey,
    Value, DEFAULT_MAX_CALL_DEPTH,
};

/// Test EngineConfig::default() carries the documented defaults
#[test]
fn test_engine_config_default_contract() {
    let config = EngineConfig::default();
    assert_eq!(config.max_call_depth, DEFAULT_MAX_CALL_DEPTH);
    assert_eq!(config.source_name, "<script>");
    assert!(!config.strict);
}

/// Test EngineConfig builders set each field
#[test]
fn test_engine_config_builders_contract() {
    let config = EngineConfig::new()
        .with_max_call_depth(32)
        .with_source_name("main.js")
        .with_strict(true);
    let engine = Engine::new(config.clone());
    assert_eq!(engine.config(), &config);
}

/// Test Engine::compile() returns a reusable script
#[test]
fn test_engine_compile_contract() {
    let mut engine = Engine::default();
    let script = engine.compile("40 + 2").unwrap();
    assert!(!script.chunk().instructions.is_empty());
    assert_eq!(engine.run(&script).unwrap(), Value::from(42));
    assert_eq!(engine.run(&script).unwrap(), Value::from(42));
}

/// Test Engine::compile() reports syntax errors as JsError
#[test]
fn test_engine_compile_syntax_error_contract() {
    let mut engine = Engine::default();
    let error = engine.compile("function (").unwrap_err();
    assert_eq!(error.kind, ErrorKind::SyntaxError);
}

/// Test Engine::eval() returns the script's completion value
#[test]
fn test_engine_eval_contract() {
    let mut engine = Engine::default();
    assert_eq!(engine.eval("var x = 3; x * x").unwrap(), Value::from(9));
    assert_eq!(engine.eval("").unwrap(), Value::Undefined);
}

/// Test Engine::eval() surfaces uncaught errors with their kind
#[test]
fn test_engine_eval_error_kinds_contract() {
    let mut engine = Engine::default();
    let cases = [
        ("undefinedName", ErrorKind::ReferenceError),
        ("undefined()", ErrorKind::TypeError),
        ("new Array(-1)", ErrorKind::RangeError),
        ("throw new SyntaxError('bad')", ErrorKind::SyntaxError),
        ("throw 'plain'", ErrorKind::Thrown),
    ];
    for (source, kind) in cases {
        let error = engine.eval(source).unwrap_err();
        assert_eq!(error.kind, kind, "source: {}", source);
    }
}

/// Test globals persist between evaluations in one engine
#[test]
fn test_engine_globals_persist_contract() {
    let mut engine = Engine::default();
    engine.eval("var total = 10; function bump() { total += 1; }").unwrap();
    engine.eval("bump(); bump();").unwrap();
    assert_eq!(engine.get_global("total").unwrap(), Value::from(12));
}

/// Test separate engines do not share state
#[test]
fn test_engines_are_isolated_contract() {
    let mut first = Engine::default();
    let mut second = Engine::default();
    first.eval("var shared = 1").unwrap();
    let error = second.eval("shared").unwrap_err();
    assert_eq!(error.kind, ErrorKind::ReferenceError);
}

/// Test Engine::set_global() exposes host values to scripts
#[test]
fn test_engine_set_global_contract() {
    let mut engine = Engine::default();
    engine.set_global("limit", Value::from(7));
    assert_eq!(engine.eval("limit + 1").unwrap(), Value::from(8));
}

/// Test Engine::call() invokes script functions with a receiver
#[test]
fn test_engine_call_contract() {
    let mut engine = Engine::default();
    let function = engine
        .eval("(function (a, b) { return this.base + a + b; })")
        .unwrap();
    let receiver = engine.context().create_object();
    engine.set(&receiver, "base", Value::from(100), true).unwrap();
    let result = engine
        .call(&function, Value::Object(receiver), &[Value::from(1), Value::from(2)])
        .unwrap();
    assert_eq!(result, Value::from(103));
}

/// Test Engine::call() on a non-callable value throws TypeError
#[test]
fn test_engine_call_non_callable_contract() {
    let mut engine = Engine::default();
    let error = engine
        .call(&Value::from(1), Value::Undefined, &[])
        .unwrap_err();
    assert_eq!(error.kind, ErrorKind::TypeError);
}

/// Test Engine::construct() runs `new`
#[test]
fn test_engine_construct_contract() {
    let mut engine = Engine::default();
    let class = engine
        .eval("class Point { constructor(x) { this.x = x; } } Point")
        .unwrap();
    let point = engine.construct(&class, &[Value::from(4)]).unwrap();
    let object = point.as_object().unwrap().clone();
    assert_eq!(engine.get(&object, "x").unwrap(), Value::from(4));
}

/// Test Engine::define_global_function() registers a callable host function
#[test]
fn test_engine_define_global_function_contract() {
    let mut engine = Engine::default();
    let function = engine.define_global_function("sum", 2, |cx, _this, args| {
        let mut total = 0.0;
        for arg in args {
            total += cx.to_number(arg)?;
        }
        Ok(Value::Number(total))
    });
    assert!(function.is_callable());
    assert_eq!(engine.eval("sum(1, 2, 3)").unwrap(), Value::from(6));
    assert_eq!(engine.eval("sum.length").unwrap(), Value::from(2));
}

/// Test host functions can throw script exceptions
#[test]
fn test_host_function_throw_contract() {
    let mut engine = Engine::default();
    engine.define_global_function("fail", 0, |cx, _this, _args| {
        Err(cx.type_error("host refused"))
    });
    let caught = engine
        .eval("try { fail(); } catch (e) { e instanceof TypeError && e.message }")
        .unwrap();
    assert_eq!(caught, Value::from("host refused"));
}

/// Test strict Engine::set() throws on a frozen object while sloppy does not
#[test]
fn test_engine_set_strictness_contract() {
    let mut engine = Engine::default();
    let frozen = engine.eval("Object.freeze({ a: 1 })").unwrap();
    let object = frozen.as_object().unwrap().clone();
    assert!(engine.set(&object, "a", Value::from(2), false).is_ok());
    let error = engine.set(&object, "a", Value::from(2), true).unwrap_err();
    assert_eq!(error.kind, ErrorKind::TypeError);
    assert_eq!(engine.get(&object, "a").unwrap(), Value::from(1));
}

/// Test Engine::own_keys() follows property order
#[test]
fn test_engine_own_keys_contract() {
    let mut engine = Engine::default();
    let value = engine.eval("({ b: 1, 1: 2, a: 3, 0: 4 })").unwrap();
    let object = value.as_object().unwrap().clone();
    let keys = engine.own_keys(&object);
    let expected: Vec<PropertyKey> = ["0", "1", "b", "a"].into_iter().map(PropertyKey::from).collect();
    assert_eq!(keys, expected);
    assert!(engine.has_own(&object, "a"));
    assert!(!engine.has_own(&object, "toString"));
}

/// Test generator_next() steps a generator to completion
#[test]
fn test_generator_next_contract() {
    let mut engine = Engine::default();
    let generator = engine
        .eval("function* g() { const x = yield 1; yield x * 2; } g()")
        .unwrap();
    let first = engine.generator_next(&generator, Value::Undefined).unwrap();
    assert_eq!(first, IterResult::new(Value::from(1), false));
    let second = engine.generator_next(&generator, Value::from(21)).unwrap();
    assert_eq!(second, IterResult::new(Value::from(42), false));
    let done = engine.generator_next(&generator, Value::Undefined).unwrap();
    assert_eq!(done, IterResult::new(Value::Undefined, true));
}

/// Test generator_return() runs pending finally blocks exactly once
#[test]
fn test_generator_return_contract() {
    let mut engine = Engine::default();
    let generator = engine
        .eval("var cleanups = 0; function* g() { try { yield 1; yield 2; } finally { cleanups++; } } g()")
        .unwrap();
    engine.generator_next(&generator, Value::Undefined).unwrap();
    let result = engine.generator_return(&generator, Value::from(5)).unwrap();
    assert_eq!(result, IterResult::new(Value::from(5), true));
    let after = engine.generator_next(&generator, Value::Undefined).unwrap();
    assert_eq!(after, IterResult::new(Value::Undefined, true));
    assert_eq!(engine.get_global("cleanups").unwrap(), Value::from(1));
}

/// Test generator_throw() delivers the exception at the yield point
#[test]
fn test_generator_throw_contract() {
    let mut engine = Engine::default();
    let generator = engine
        .eval("function* g() { try { yield 1; } catch (e) { yield 'caught ' + e; } } g()")
        .unwrap();
    engine.generator_next(&generator, Value::Undefined).unwrap();
    let result = engine.generator_throw(&generator, Value::from("x")).unwrap();
    assert_eq!(result, IterResult::new(Value::from("caught x"), false));
}

/// Test generator_throw() on a fresh generator completes it and rethrows
#[test]
fn test_generator_throw_before_start_contract() {
    let mut engine = Engine::default();
    let generator = engine.eval("function* g() { yield 1; } g()").unwrap();
    let throw = engine.generator_throw(&generator, Value::from(9)).unwrap_err();
    assert_eq!(throw.value, Value::from(9));
    let after = engine.generator_next(&generator, Value::Undefined).unwrap();
    assert!(after.done);
}

/// Test Engine::to_js_error() converts a script exception
#[test]
fn test_engine_to_js_error_contract() {
    let mut engine = Engine::default();
    let generator = engine
        .eval("function* g() { throw new TypeError('inside'); } g()")
        .unwrap();
    let throw = engine.generator_next(&generator, Value::Undefined).unwrap_err();
    let error: JsError = engine.to_js_error(&throw);
    assert_eq!(error.kind, ErrorKind::TypeError);
    assert_eq!(error.message, "inside");
}

/// Test the bytecode backend produces units the engine can invoke
#[test]
fn test_bytecode_backend_contract() {
    let backend = BytecodeBackend;
    assert_eq!(backend.name(), "bytecode");
    let chunk = Rc::new(BytecodeChunk::new());
    let unit = backend.compile(chunk.clone());
    assert!(Rc::ptr_eq(unit.chunk(), &chunk));
}

/// Test a custom backend is used for compiled scripts
#[test]
fn test_custom_backend_contract() {
    #[derive(Debug)]
    struct Tagging;

    impl Backend for Tagging {
        fn name(&self) -> &'static str {
            "tagging"
        }

        fn compile(&self, chunk: Rc<BytecodeChunk>) -> Rc<dyn ExecutableUnit> {
            BytecodeBackend.compile(chunk)
        }
    }

    let mut engine = Engine::with_backend(EngineConfig::default(), Box::new(Tagging));
    assert_eq!(engine.eval("'via ' + 'backend'").unwrap(), Value::from("via backend"));
}

/// Test the call depth budget turns runaway recursion into RangeError
#[test]
fn test_call_depth_contract() {
    let mut engine = Engine::new(EngineConfig::new().with_max_call_depth(64));
    let error = engine
        .eval("function down(n) { return down(n + 1); } down(0)")
        .unwrap_err();
    assert_eq!(error.kind, ErrorKind::RangeError);
    // The engine stays usable afterwards
    assert_eq!(engine.eval("1").unwrap(), Value::from(1));
    assert_eq!(engine.context().call_depth(), 0);
}
