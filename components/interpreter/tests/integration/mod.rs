//! Integration tests for interpreter
//!
//! Runs scripts through the engine and checks how the dispatch loop, the
//! object model and the built-in library work together.

use core_types::ErrorKind;
use interpreter::{Engine, Value};

fn eval(source: &str) -> Value {
    let mut engine = Engine::default();
    match engine.eval(source) {
        Ok(value) => value,
        Err(error) => panic!("script failed: {}\n{}", error, source),
    }
}

fn eval_str(source: &str) -> String {
    eval(source).to_string()
}

// ============================================================================
// Object Built-ins
// ============================================================================

#[test]
fn test_object_keys_and_define_property() {
    let source = r#"
        const o = { a: 1 };
        Object.defineProperty(o, 'hidden', { value: 2, enumerable: false });
        Object.defineProperty(o, 'twice', { get() { return this.a * 2; }, enumerable: true });
        Object.keys(o).join(',') + ':' + o.hidden + ':' + o.twice
    "#;
    assert_eq!(eval_str(source), "a,twice:2:2");
}

#[test]
fn test_object_create_and_prototypes() {
    let source = r#"
        const base = { greet() { return 'hi ' + this.name; } };
        const child = Object.create(base);
        child.name = 'x';
        [child.greet(), Object.getPrototypeOf(child) === base, base.isPrototypeOf(child)].join()
    "#;
    assert_eq!(eval_str(source), "hi x,true,true");
}

#[test]
fn test_set_prototype_of_cycle_is_type_error() {
    let source = r#"
        const a = {}; const b = Object.create(a);
        try { Object.setPrototypeOf(a, b); 'no error' } catch (e) { e instanceof TypeError }
    "#;
    assert_eq!(eval(source), Value::from(true));
}

#[test]
fn test_freeze() {
    let source = r#"
        const o = Object.freeze({ a: 1 });
        o.a = 2;
        o.b = 3;
        [o.a, o.b, Object.isFrozen(o)].join()
    "#;
    assert_eq!(eval_str(source), "1,,true");
}

#[test]
fn test_frozen_write_throws_in_strict_code() {
    let source = r#"
        'use strict';
        const o = Object.freeze({ a: 1 });
        try { o.a = 2; 'no error' } catch (e) { e.name }
    "#;
    assert_eq!(eval_str(source), "TypeError");
}

#[test]
fn test_object_to_string_tags() {
    assert_eq!(
        eval_str("[Object.prototype.toString.call([]), Object.prototype.toString.call({})].join()"),
        "[object Array],[object Object]"
    );
}

// ============================================================================
// Function Built-ins
// ============================================================================

#[test]
fn test_call_apply_bind() {
    let source = r#"
        function f(a, b) { return this.v + a + b; }
        const o = { v: 1 };
        const bound = f.bind(o, 10);
        [f.call(o, 2, 3), f.apply(o, [4, 5]), bound(100), bound.name, bound.length].join()
    "#;
    assert_eq!(eval_str(source), "6,10,111,bound f,1");
}

#[test]
fn test_function_constructor_unsupported() {
    let mut engine = Engine::default();
    let error = engine.eval("new Function('return 1')").unwrap_err();
    assert_eq!(error.kind, ErrorKind::InternalError);
}

// ============================================================================
// Array Built-ins
// ============================================================================

#[test]
fn test_array_methods() {
    let source = r#"
        const a = [1, 2, 3];
        a.push(4);
        const last = a.pop();
        const doubled = a.map(x => x * 2);
        let sum = 0;
        a.forEach(x => { sum += x; });
        [last, doubled.join('-'), sum, a.indexOf(2), a.includes(5), a.slice(1).join('')].join('|')
    "#;
    assert_eq!(eval_str(source), "4|2-4-6|6|1|false|23");
}

#[test]
fn test_array_constructor_and_statics() {
    let source = r#"
        [new Array(3).length, Array.of(7, 8).join(), Array.from('abc').join('+'),
         Array.from([1, 2], x => x + 1).join(), Array.isArray([]), Array.isArray('x')].join('|')
    "#;
    assert_eq!(eval_str(source), "3|7,8|a+b+c|2,3|true|false");
}

#[test]
fn test_array_length_truncates() {
    assert_eq!(eval_str("const a = [1, 2, 3, 4]; a.length = 2; a.join()"), "1,2");
}

#[test]
fn test_array_holes_join_as_empty() {
    assert_eq!(eval_str("[1, , 3].join()"), "1,,3");
}

#[test]
fn test_array_keys_entries() {
    let source = r#"
        const out = [];
        for (const [i, v] of ['a', 'b'].entries()) out.push(i + v);
        [...['x', 'y'].keys()].join() + ';' + out.join()
    "#;
    assert_eq!(eval_str(source), "0,1;0a,1b");
}

// ============================================================================
// String, Number and Boolean Built-ins
// ============================================================================

#[test]
fn test_string_methods() {
    let source = r#"
        const s = 'Hello';
        [s.charAt(1), s.indexOf('l'), s.slice(1, -1), s.includes('ell'),
         s.toUpperCase(), s.toLowerCase(), s.length].join()
    "#;
    assert_eq!(eval_str(source), "e,2,ell,true,HELLO,hello,5");
}

#[test]
fn test_string_iteration_by_code_point() {
    assert_eq!(eval_str("[...'ab'].join('|')"), "a|b");
}

#[test]
fn test_number_formatting() {
    let source = r#"
        [(255).toString(16), (5).toString(2), (2.5).toFixed(2), 0.1 + 0.2,
         Number.isInteger(5), Number.isNaN('x'), isNaN('x'), parseFloat('3.5px')].join()
    "#;
    assert_eq!(eval_str(source), "ff,101,2.50,0.30000000000000004,true,false,true,3.5");
}

#[test]
fn test_boolean_and_number_wrappers() {
    assert_eq!(eval_str("[Boolean(''), Number('12'), String(12), typeof new String('a')].join()"), "false,12,12,object");
}

// ============================================================================
// Error Built-ins
// ============================================================================

#[test]
fn test_error_objects() {
    let source = r#"
        const e = new RangeError('bad');
        [e.name, e.message, e instanceof RangeError, e instanceof Error, String(e)].join('|')
    "#;
    assert_eq!(eval_str(source), "RangeError|bad|true|true|RangeError: bad");
}

#[test]
fn test_error_cause() {
    assert_eq!(eval_str("new Error('outer', { cause: 'inner' }).cause"), "inner");
}

#[test]
fn test_runtime_errors_are_catchable_instances() {
    let source = r#"
        const caught = [];
        try { null.x; } catch (e) { caught.push(e instanceof TypeError); }
        try { missing; } catch (e) { caught.push(e instanceof ReferenceError); }
        caught.join()
    "#;
    assert_eq!(eval_str(source), "true,true");
}

#[test]
fn test_error_stack_names_functions() {
    let source = r#"
        function inner() { return new Error('x').stack; }
        function outer() { return inner(); }
        outer()
    "#;
    let stack = eval_str(source);
    let inner = stack.find("inner").expect("inner frame");
    let outer = stack.find("outer").expect("outer frame");
    assert!(inner < outer, "{}", stack);
}

// ============================================================================
// Symbol Built-ins
// ============================================================================

#[test]
fn test_symbols() {
    let source = r#"
        const s = Symbol('tag');
        const o = { [s]: 1, plain: 2 };
        [typeof s, s.description, s.toString(), o[s], Object.keys(o).length, s === Symbol('tag')].join()
    "#;
    assert_eq!(eval_str(source), "symbol,tag,Symbol(tag),1,1,false");
}

#[test]
fn test_custom_iterable() {
    let source = r#"
        const range = {
            [Symbol.iterator]() {
                let i = 0;
                return { next: () => i < 3 ? { value: i++, done: false } : { value: undefined, done: true } };
            }
        };
        [...range].join()
    "#;
    assert_eq!(eval_str(source), "0,1,2");
}

// ============================================================================
// Collection Built-ins
// ============================================================================

#[test]
fn test_map_preserves_insertion_order() {
    let source = r#"
        const m = new Map([['b', 1], ['a', 2]]);
        m.set('c', 3).set('b', 4);
        m.delete('a');
        const out = [];
        for (const [k, v] of m) out.push(k + v);
        out.join() + ':' + m.size + ':' + m.get('b') + ':' + m.has('a')
    "#;
    assert_eq!(eval_str(source), "b4,c3:2:4:false");
}

#[test]
fn test_map_nan_and_object_keys() {
    let source = r#"
        const key = {};
        const m = new Map();
        m.set(NaN, 'nan');
        m.set(key, 'obj');
        [m.get(NaN), m.get(key), m.get({})].join()
    "#;
    assert_eq!(eval_str(source), "nan,obj,");
}

#[test]
fn test_set_deduplicates() {
    let source = r#"
        const s = new Set([1, 2, 2, 3, 1]);
        s.add(4);
        [s.size, [...s].join(''), s.has(2)].join()
    "#;
    assert_eq!(eval_str(source), "4,1234,true");
}

#[test]
fn test_map_for_each_sees_added_entries() {
    let source = r#"
        const m = new Map([[1, 'a']]);
        const seen = [];
        m.forEach((v, k) => { seen.push(k); if (k < 3) m.set(k + 1, 'x'); });
        seen.join()
    "#;
    assert_eq!(eval_str(source), "1,2,3");
}

#[test]
fn test_weak_map() {
    let source = r#"
        const wm = new WeakMap();
        const k = {};
        wm.set(k, 42);
        const before = wm.get(k);
        wm.delete(k);
        [before, wm.has(k)].join()
    "#;
    assert_eq!(eval_str(source), "42,false");
}

#[test]
fn test_weak_map_rejects_primitive_keys() {
    let mut engine = Engine::default();
    let error = engine.eval("new WeakMap().set('k', 1)").unwrap_err();
    assert_eq!(error.kind, ErrorKind::TypeError);
}

#[test]
fn test_collection_requires_new() {
    let mut engine = Engine::default();
    let error = engine.eval("Map()").unwrap_err();
    assert_eq!(error.kind, ErrorKind::TypeError);
}

// ============================================================================
// RegExp Built-ins
// ============================================================================

#[test]
fn test_regexp_test_and_exec() {
    let source = r#"
        const re = /(\d+)-(?<word>[a-z]+)/;
        const m = re.exec('id 42-abc');
        [re.test('7-x'), re.test('nope'), m[0], m[1], m.index, m.groups.word].join()
    "#;
    assert_eq!(eval_str(source), "true,false,42-abc,42,3,abc");
}

#[test]
fn test_regexp_global_last_index() {
    let source = r#"
        const re = /a/g;
        const found = [];
        let m;
        while ((m = re.exec('banana')) !== null) found.push(m.index);
        found.join() + ':' + re.lastIndex
    "#;
    assert_eq!(eval_str(source), "1,3,5:0");
}

#[test]
fn test_regexp_flags_and_source() {
    let source = r#"
        const re = new RegExp('a.c', 'gi');
        [re.source, re.flags, re.global, re.ignoreCase, re.multiline, re.test('AXC'), String(re)].join()
    "#;
    assert_eq!(eval_str(source), "a.c,gi,true,true,false,true,/a.c/gi");
}

#[test]
fn test_regexp_invalid_flags() {
    let mut engine = Engine::default();
    let error = engine.eval("new RegExp('a', 'gg')").unwrap_err();
    assert_eq!(error.kind, ErrorKind::SyntaxError);
}

// ============================================================================
// Generator Built-ins
// ============================================================================

#[test]
fn test_generator_protocol_from_script() {
    let source = r#"
        function* g() { let received = yield 1; yield received + 1; return 'end'; }
        const it = g();
        const a = it.next();
        const b = it.next(10);
        const c = it.next();
        const d = it.next();
        [a.value, a.done, b.value, c.value, c.done, d.value, d.done].join()
    "#;
    assert_eq!(eval_str(source), "1,false,11,end,true,,true");
}

#[test]
fn test_generator_is_its_own_iterator() {
    assert_eq!(
        eval("function* g() {} const it = g(); it[Symbol.iterator]() === it"),
        Value::from(true)
    );
}
