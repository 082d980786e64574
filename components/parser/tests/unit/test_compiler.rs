use std::rc::Rc;

use bytecode_system::{BytecodeChunk, FunctionKind, Opcode};
use parser::{compile, parse, CompileOptions, ParseOptions};

fn chunk(source: &str) -> Rc<BytecodeChunk> {
    let program = parse(source, &ParseOptions::default()).unwrap().program;
    compile(&program, &CompileOptions::default()).unwrap()
}

fn count(chunk: &BytecodeChunk, predicate: impl Fn(&Opcode) -> bool) -> usize {
    chunk
        .instructions
        .iter()
        .filter(|i| predicate(&i.opcode))
        .count()
}

#[test]
fn test_jump_targets_stay_in_bounds() {
    let script = chunk(
        "outer: for (let i = 0; i < 3; i++) {
            for (const x of xs) {
                try { if (x) continue outer; else break; }
                catch (e) { throw e; }
                finally { log(x); }
            }
            switch (i) { case 1: break; default: continue; }
        }
        a?.b?.(c ?? d);",
    );
    fn check(chunk: &BytecodeChunk) {
        for instruction in &chunk.instructions {
            if let Some(target) = instruction.opcode.jump_target() {
                assert!(target <= chunk.instructions.len(), "{:?}", instruction);
            }
        }
        for nested in &chunk.nested_functions {
            check(nested);
        }
    }
    check(&script);
}

#[test]
fn test_function_kinds() {
    let script = chunk(
        "function f() {} const a = () => 1; const o = { m() {} }; class C { constructor() {} }",
    );
    let kinds: Vec<_> = script.nested_functions.iter().map(|f| f.kind).collect();
    assert_eq!(
        kinds,
        vec![
            FunctionKind::Normal,
            FunctionKind::Arrow,
            FunctionKind::Method,
            FunctionKind::ClassConstructor { derived: false },
        ]
    );
    assert!(script.nested_functions[3].strict);
}

#[test]
fn test_block_functions_are_instantiated_at_block_entry() {
    let script = chunk("{ f(); function f() {} }");
    let closure = script
        .instructions
        .iter()
        .position(|i| matches!(i.opcode, Opcode::CreateClosure(..)))
        .unwrap();
    let call = script
        .instructions
        .iter()
        .position(|i| matches!(i.opcode, Opcode::Call(_)))
        .unwrap();
    assert!(closure < call);
}

#[test]
fn test_closures_in_loop_body_get_fresh_cells() {
    let script = chunk("for (const x of xs) { fs.push(() => x); }");
    assert!(count(&script, |op| matches!(op, Opcode::FreshCell(_))) >= 1);
    let script = chunk("for (const x of xs) { f(x); }");
    assert_eq!(count(&script, |op| matches!(op, Opcode::FreshCell(_))), 0);
}

#[test]
fn test_nested_function_positions() {
    let script = chunk("\n\n  function f() {}");
    let f = &script.nested_functions[0];
    assert_eq!(f.position.map(|p| (p.line, p.column)), Some((3, 3)));
}
