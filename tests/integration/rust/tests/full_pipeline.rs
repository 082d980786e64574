//! Full Pipeline Integration Tests
//!
//! Tests the complete flow: Source -> Parser -> AST -> Compiler -> Bytecode
//! -> Interpreter -> Result, one language feature at a time.

use core_types::ErrorKind;
use interpreter::{Engine, Value};

/// Helper function to execute JavaScript source code
fn execute_js(source: &str) -> Result<Value, String> {
    let mut engine = Engine::default();
    engine.eval(source).map_err(|e| format!("{}", e))
}

fn run(source: &str) -> String {
    execute_js(source)
        .unwrap_or_else(|e| panic!("Execution failed: {}\n{}", e, source))
        .to_string()
}

// ============================================================================
// Expressions
// ============================================================================

/// Test: Arithmetic precedence and numeric results
#[test]
fn test_arithmetic() {
    assert_eq!(execute_js("(10 + 5) * 3 - 2").unwrap(), Value::from(43));
    assert_eq!(execute_js("2 ** 3 ** 2").unwrap(), Value::from(512));
    assert_eq!(execute_js("7 % 3 + -7 % 3").unwrap(), Value::from(0));
    assert_eq!(run("1 / 0"), "Infinity");
}

/// Test: String concatenation and coercion
#[test]
fn test_string_coercion() {
    assert_eq!(run("'a' + 1 + 2"), "a12");
    assert_eq!(run("1 + 2 + 'a'"), "3a");
    assert_eq!(run("[1, [2, 3]] + ''"), "1,2,3");
    assert_eq!(run("({}) + ''"), "[object Object]");
}

/// Test: Equality operators
#[test]
fn test_equality() {
    assert_eq!(
        run("[1 == '1', 1 === '1', null == undefined, null === undefined, NaN == NaN, 0 === -0].join()"),
        "true,false,true,false,false,true"
    );
}

/// Test: Bitwise operators use 32-bit integers
#[test]
fn test_bitwise() {
    assert_eq!(run("[5 & 3, 5 | 3, 5 ^ 3, ~5, 1 << 31, -1 >>> 28, -16 >> 2].join()"), "1,7,6,-6,-2147483648,15,-4");
}

/// Test: Logical and nullish operators short-circuit
#[test]
fn test_short_circuit() {
    let source = r#"
        let calls = 0;
        function hit() { calls++; return true; }
        const a = false && hit();
        const b = true || hit();
        const c = null ?? 'fallback';
        const d = 0 ?? 'unused';
        [a, b, c, d, calls].join()
    "#;
    assert_eq!(run(source), "false,true,fallback,0,0");
}

/// Test: Optional chaining
#[test]
fn test_optional_chaining() {
    let source = r#"
        const o = { inner: { value: 1 }, f() { return 'called'; } };
        [o?.inner?.value, o.missing?.value, o.f?.(), o.g?.()].join()
    "#;
    assert_eq!(run(source), "1,,called,");
}

/// Test: typeof, including undeclared names
#[test]
fn test_typeof() {
    assert_eq!(
        run("[typeof 1, typeof 'x', typeof undefined, typeof null, typeof {}, typeof function () {}, typeof undeclared].join()"),
        "number,string,undefined,object,object,function,undefined"
    );
}

/// Test: Template literals
#[test]
fn test_template_literal() {
    assert_eq!(run("const n = 3; `n=${n}, twice=${n * 2}`"), "n=3, twice=6");
}

/// Test: Compound assignment and update operators
#[test]
fn test_update_operators() {
    assert_eq!(run("let x = 5; const a = x++; const b = ++x; x += 10; x -= 2; [a, b, x].join()"), "5,7,15");
}

// ============================================================================
// Control Flow
// ============================================================================

/// Test: Loops with break and continue
#[test]
fn test_loops() {
    let source = r#"
        let out = [];
        for (let i = 0; i < 10; i++) {
            if (i % 2) continue;
            if (i > 6) break;
            out.push(i);
        }
        let j = 0;
        while (j < 3) j++;
        do { j += 10; } while (j < 20);
        out.join() + ':' + j
    "#;
    assert_eq!(run(source), "0,2,4,6:23");
}

/// Test: Labeled break leaves the outer loop
#[test]
fn test_labeled_break() {
    let source = r#"
        const pairs = [];
        outer: for (let i = 0; i < 3; i++) {
            for (let j = 0; j < 3; j++) {
                if (j === 2) continue outer;
                if (i === 2) break outer;
                pairs.push(i + '' + j);
            }
        }
        pairs.join()
    "#;
    assert_eq!(run(source), "00,01,10,11");
}

/// Test: switch with fallthrough and default
#[test]
fn test_switch() {
    let source = r#"
        function classify(x) {
            let out = '';
            switch (x) {
                case 1: out += 'one';
                case 2: out += 'two'; break;
                default: out += 'other';
            }
            return out;
        }
        [classify(1), classify(2), classify(9)].join()
    "#;
    assert_eq!(run(source), "onetwo,two,other");
}

/// Test: for-in over own and inherited enumerable keys
#[test]
fn test_for_in() {
    let source = r#"
        const proto = { inherited: 1 };
        const o = Object.create(proto);
        o.b = 2; o[0] = 3; o.a = 4;
        const keys = [];
        for (const k in o) keys.push(k);
        keys.join()
    "#;
    assert_eq!(run(source), "0,b,a,inherited");
}

/// Test: for-of over arrays, strings and Map
#[test]
fn test_for_of() {
    let source = r#"
        let out = '';
        for (const x of [1, 2]) out += x;
        for (const ch of 'ab') out += ch;
        for (const [k, v] of new Map([['k', 'v']])) out += k + v;
        out
    "#;
    assert_eq!(run(source), "12abkv");
}

/// Test: Per-iteration let bindings in closures
#[test]
fn test_per_iteration_bindings() {
    let source = r#"
        const fns = [];
        for (let i = 0; i < 3; i++) fns.push(() => i);
        fns.map(f => f()).join()
    "#;
    assert_eq!(run(source), "0,1,2");
}

// ============================================================================
// Functions and Closures
// ============================================================================

/// Test: Closures share captured variables
#[test]
fn test_closure_counter() {
    let source = r#"
        function makeCounter() {
            let count = 0;
            return { inc: () => ++count, get: () => count };
        }
        const c = makeCounter();
        c.inc(); c.inc();
        const other = makeCounter();
        other.inc();
        c.get() + ':' + other.get()
    "#;
    assert_eq!(run(source), "2:1");
}

/// Test: Function hoisting
#[test]
fn test_function_hoisting() {
    assert_eq!(run("const r = early(); function early() { return 'hoisted'; } r"), "hoisted");
    assert_eq!(run("typeof laterVar + ':' + (function () { return v; var v = 1; })(); var laterVar = 1;"), "undefined:undefined");
}

/// Test: Default, rest and spread parameters
#[test]
fn test_parameters() {
    let source = r#"
        function f(a, b = a * 2, ...rest) { return [a, b, rest.length].join(); }
        const args = [1, undefined, 3, 4];
        f(1) + '|' + f(...args) + '|' + f.length
    "#;
    assert_eq!(run(source), "1,2,0|1,2,2|1");
}

/// Test: The arguments object
#[test]
fn test_arguments_object() {
    assert_eq!(run("function f() { return arguments.length + ':' + arguments[1]; } f('a', 'b', 'c')"), "3:b");
}

/// Test: Arrow functions capture this lexically
#[test]
fn test_arrow_this() {
    let source = r#"
        const o = {
            value: 42,
            later() { return [1].map(() => this.value)[0]; }
        };
        o.later()
    "#;
    assert_eq!(execute_js(source).unwrap(), Value::from(42));
}

/// Test: Recursion
#[test]
fn test_recursion() {
    assert_eq!(
        execute_js("function fib(n) { return n < 2 ? n : fib(n - 1) + fib(n - 2); } fib(15)").unwrap(),
        Value::from(610)
    );
}

// ============================================================================
// Objects, Classes and Destructuring
// ============================================================================

/// Test: Object literal features
#[test]
fn test_object_literals() {
    let source = r#"
        const key = 'dyn';
        const x = 1;
        const o = {
            x,
            [key + 'amic']: 2,
            method() { return this.x; },
            get double() { return this.x * 2; },
            set double(v) { this.x = v / 2; },
            ...{ spread: 3 },
        };
        o.double = 10;
        [o.x, o.dynamic, o.method(), o.double, o.spread].join()
    "#;
    assert_eq!(run(source), "5,2,5,10,3");
}

/// Test: Classes with inheritance, super calls, fields and statics
#[test]
fn test_classes() {
    let source = r#"
        class Animal {
            legs = 4;
            constructor(name) { this.name = name; }
            speak() { return this.name + ' makes a sound'; }
            static create(name) { return new this(name); }
        }
        class Bird extends Animal {
            legs = 2;
            speak() { return super.speak() + ' (tweet)'; }
        }
        const b = Bird.create('Robin');
        [b.speak(), b.legs, b instanceof Bird, b instanceof Animal,
         Object.getPrototypeOf(Bird) === Animal].join('|')
    "#;
    assert_eq!(run(source), "Robin makes a sound (tweet)|2|true|true|true");
}

/// Test: Derived constructors must call super before using this
#[test]
fn test_derived_constructor_requires_super() {
    let error = Engine::default()
        .eval("class A {} class B extends A { constructor() { this.x = 1; } } new B()")
        .unwrap_err();
    assert_eq!(error.kind, ErrorKind::ReferenceError);
}

/// Test: Class constructors cannot be called without new
#[test]
fn test_class_call_without_new() {
    let error = Engine::default().eval("class A {} A()").unwrap_err();
    assert_eq!(error.kind, ErrorKind::TypeError);
}

/// Test: Getters and setters in classes
#[test]
fn test_class_accessors() {
    let source = r#"
        class Temp {
            constructor() { this.c = 0; }
            get f() { return this.c * 9 / 5 + 32; }
            set f(v) { this.c = (v - 32) * 5 / 9; }
        }
        const t = new Temp();
        t.f = 212;
        t.c + ':' + t.f
    "#;
    assert_eq!(run(source), "100:212");
}

/// Test: Array and object destructuring with defaults and rest
#[test]
fn test_destructuring() {
    let source = r#"
        const [a, , b = 5, ...rest] = [1, 2, undefined, 4, 5];
        const { x, y: { z }, w = 'dflt', ...others } = { x: 1, y: { z: 2 }, p: 3, q: 4 };
        let m = 1, n = 2;
        [m, n] = [n, m];
        [a, b, rest.join('+'), x, z, w, Object.keys(others).join('+'), m, n].join()
    "#;
    assert_eq!(run(source), "1,5,4+5,1,2,dflt,p+q,2,1");
}

/// Test: Destructuring null is a TypeError
#[test]
fn test_destructuring_null() {
    let error = Engine::default().eval("const { a } = null;").unwrap_err();
    assert_eq!(error.kind, ErrorKind::TypeError);
}

/// Test: Spread in arrays and calls
#[test]
fn test_spread() {
    let source = r#"
        function sum(...xs) { let s = 0; for (const x of xs) s += x; return s; }
        const parts = [2, 3];
        [[1, ...parts, 4].join(), sum(...parts, 10), [...new Set([1, 1, 2])].length].join('|')
    "#;
    assert_eq!(run(source), "1,2,3,4|15|2");
}

// ============================================================================
// Exceptions
// ============================================================================

/// Test: try/catch/finally ordering
#[test]
fn test_try_catch_finally() {
    let source = r#"
        const log = [];
        try {
            log.push('try');
            throw new Error('boom');
        } catch (e) {
            log.push('catch ' + e.message);
        } finally {
            log.push('finally');
        }
        log.join()
    "#;
    assert_eq!(run(source), "try,catch boom,finally");
}

/// Test: finally runs once on return, break and continue
#[test]
fn test_finally_on_abrupt_exits() {
    let source = r#"
        let count = 0;
        function f() { try { return 'r'; } finally { count++; } }
        const r = f();
        for (let i = 0; i < 3; i++) {
            try { if (i === 0) continue; if (i === 1) break; } finally { count++; }
        }
        r + count
    "#;
    assert_eq!(run(source), "r3");
}

/// Test: An abrupt finally overrides the pending completion
#[test]
fn test_finally_overrides() {
    let source = r#"
        function f() { try { return 'try'; } finally { return 'finally'; } }
        function g() { try { throw new Error('lost'); } finally { return 'recovered'; } }
        f() + ',' + g()
    "#;
    assert_eq!(run(source), "finally,recovered");
}

/// Test: Catch without a binding
#[test]
fn test_optional_catch_binding() {
    assert_eq!(run("let ok = 'no'; try { null.x; } catch { ok = 'yes'; } ok"), "yes");
}

/// Test: Thrown primitives surface as uncaught script exceptions
#[test]
fn test_uncaught_primitive() {
    let error = Engine::default().eval("throw { code: 7 }").unwrap_err();
    assert_eq!(error.kind, ErrorKind::Thrown);
}

/// Test: Assignment to a const binding is a TypeError
#[test]
fn test_const_assignment() {
    let error = Engine::default().eval("const c = 1; c = 2;").unwrap_err();
    assert_eq!(error.kind, ErrorKind::TypeError);
}

// ============================================================================
// Generators
// ============================================================================

/// Test: Generators drive for-of and spread
#[test]
fn test_generator_iteration() {
    let source = r#"
        function* range(start, end) { for (let i = start; i < end; i++) yield i; }
        const out = [];
        for (const x of range(0, 3)) out.push(x);
        out.join() + '|' + [...range(5, 7)].join()
    "#;
    assert_eq!(run(source), "0,1,2|5,6");
}

/// Test: yield* delegates to an inner iterable and returns its result
#[test]
fn test_yield_delegate() {
    let source = r#"
        function* inner() { yield 'a'; yield 'b'; return 'inner done'; }
        function* outer() { const r = yield* inner(); yield r; yield* [1, 2]; }
        [...outer()].join()
    "#;
    assert_eq!(run(source), "a,b,inner done,1,2");
}

/// Test: Generator methods in classes and objects
#[test]
fn test_generator_methods() {
    let source = r#"
        class Bag {
            constructor() { this.items = ['x', 'y']; }
            *[Symbol.iterator]() { yield* this.items; }
        }
        [...new Bag()].join()
    "#;
    assert_eq!(run(source), "x,y");
}

/// Test: Breaking out of for-of closes the generator and runs its finally
#[test]
fn test_generator_closed_by_break() {
    let source = r#"
        let cleaned = false;
        function* naturals() { try { let n = 0; while (true) yield n++; } finally { cleaned = true; } }
        const it = naturals();
        for (const n of it) { if (n === 2) break; }
        cleaned + ':' + it.next().done
    "#;
    assert_eq!(run(source), "true:true");
}
