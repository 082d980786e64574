//! Bytecode generation from AST
//!
//! Each function (and the script itself) compiles into its own
//! [`BytecodeChunk`]. Expressions are evaluated on an operand stack; bindings
//! live either in registers or, when an inner function may reach them, in
//! cells that closures share through upvalues (see [`crate::scope`]).
//!
//! Name resolution walks the block scopes of the function being compiled,
//! then the scopes of the enclosing functions (recording upvalues on the
//! way), and finally falls back to a dynamic global lookup at run time.
//!
//! Non-local exits (`break`, `continue`, `return`) walk the control stack
//! outward, unwinding handlers, closing `for-of` iterators and detouring
//! through pending `finally` blocks.

mod expressions;
mod functions;
mod patterns;
mod statements;

use std::collections::HashMap;
use std::rc::Rc;

use bytecode_system::{
    BytecodeChunk, Constant, FunctionKind as ChunkKind, Opcode, RegisterId, UpvalueDescriptor,
};
use core_types::{JsError, LineIndex, SourcePosition, Span};

use crate::ast::Program;
use crate::error::{syntax_error, unsupported};
use crate::scope::{ScopeAnalyzer, ScopeInfo};

use statements::Control;

/// Options controlling compilation
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Source name recorded in every chunk; defaults to the program's own
    pub source_name: Option<String>,
}

impl CompileOptions {
    /// Create default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `name` as the source of the compiled code
    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = Some(name.into());
        self
    }
}

/// Compile a parsed program into the chunk of its top-level script code
///
/// # Examples
///
/// ```
/// use parser::{compile, parse, CompileOptions, ParseOptions};
///
/// let program = parse("1 + 2", &ParseOptions::default()).unwrap().program;
/// let chunk = compile(&program, &CompileOptions::default()).unwrap();
/// assert!(chunk.instruction_count() > 0);
/// ```
pub fn compile(program: &Program, options: &CompileOptions) -> Result<Rc<BytecodeChunk>, JsError> {
    BytecodeGenerator::new(options).generate(program).map(Rc::new)
}

/// Where a binding's value lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Storage {
    Register(RegisterId),
    Cell(u32),
}

#[derive(Debug, Clone, Copy)]
struct Binding {
    storage: Storage,
    is_const: bool,
}

/// Resolved location of a name
#[derive(Debug, Clone)]
enum Variable {
    Local(Binding),
    Upvalue { index: u32, is_const: bool },
    Global(Rc<str>),
}

#[derive(Debug, Default)]
struct Scope {
    bindings: HashMap<String, Binding>,
}

/// Compilation state of one function
struct FunctionState {
    chunk: BytecodeChunk,
    info: ScopeInfo,
    scopes: Vec<Scope>,
    upvalue_names: Vec<(String, bool)>,
    upvalues: Vec<UpvalueDescriptor>,
    control: Vec<Control>,
    /// Exit jumps of the optional chains being compiled, innermost last
    chain_exits: Vec<Vec<usize>>,
    /// Register holding the script's completion value
    completion: Option<RegisterId>,
    position: Option<SourcePosition>,
}

impl FunctionState {
    fn new(kind: ChunkKind, info: ScopeInfo, strict: bool) -> Self {
        let mut chunk = BytecodeChunk::with_kind(kind);
        chunk.strict = strict;
        Self {
            chunk,
            info,
            scopes: Vec::new(),
            upvalue_names: Vec::new(),
            upvalues: Vec::new(),
            control: Vec::new(),
            chain_exits: Vec::new(),
            completion: None,
            position: None,
        }
    }

    fn lookup(&self, name: &str) -> Option<Binding> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.bindings.get(name).copied())
    }

    fn upvalue(&self, name: &str) -> Option<(u32, bool)> {
        self.upvalue_names
            .iter()
            .position(|(n, _)| n == name)
            .map(|i| (i as u32, self.upvalue_names[i].1))
    }

    fn add_upvalue(&mut self, name: &str, descriptor: UpvalueDescriptor, is_const: bool) -> u32 {
        self.upvalue_names.push((name.to_string(), is_const));
        self.upvalues.push(descriptor);
        (self.upvalues.len() - 1) as u32
    }

    fn register(&mut self) -> RegisterId {
        let register = RegisterId(self.chunk.register_count);
        self.chunk.register_count += 1;
        register
    }

    fn cell(&mut self) -> u32 {
        self.chunk.cell_count += 1;
        self.chunk.cell_count - 1
    }
}

/// Bytecode generator that converts a [`Program`] to bytecode
pub struct BytecodeGenerator {
    source_name: Option<Rc<str>>,
    lines: LineIndex,
    current: FunctionState,
    enclosing: Vec<FunctionState>,
}

impl BytecodeGenerator {
    /// Create a new bytecode generator
    pub fn new(options: &CompileOptions) -> Self {
        Self {
            source_name: options.source_name.as_deref().map(Rc::from),
            lines: LineIndex::new(""),
            current: FunctionState::new(ChunkKind::Script, ScopeInfo::default(), false),
            enclosing: Vec::new(),
        }
    }

    /// Generate the script chunk for `program`
    pub fn generate(mut self, program: &Program) -> Result<BytecodeChunk, JsError> {
        self.lines = program.lines.clone();
        if self.source_name.is_none() {
            self.source_name = program.source_name.as_deref().map(Rc::from);
        }

        let info = ScopeAnalyzer::analyze_program(program);
        self.current = FunctionState::new(ChunkKind::Script, info, program.strict);
        self.current.chunk.source_name = self.source_name.clone();
        self.current.chunk.position = Some(self.lines.position(program.span.start));

        self.push_scope();
        let completion = self.register();
        self.current.completion = Some(completion);

        for name in program
            .hoisting
            .var_names
            .iter()
            .chain(program.hoisting.functions.iter())
        {
            self.emit(Opcode::DeclareGlobal(Rc::from(name.as_str())));
        }
        for binding in &program.hoisting.lexical {
            self.declare(&binding.name, binding.is_const);
        }
        self.instantiate_functions(&program.body)?;
        self.compile_statements(&program.body)?;

        self.emit(Opcode::LoadLocal(completion));
        self.emit(Opcode::Return);
        self.pop_scope();

        let chunk = self.current.chunk;
        log::debug!(
            "compiled script {} ({} instructions, {} functions)",
            chunk.source_name.as_deref().unwrap_or("<anonymous>"),
            chunk.instruction_count(),
            chunk.nested_functions.len()
        );
        Ok(chunk)
    }

    // ---- emission -------------------------------------------------------

    fn emit(&mut self, opcode: Opcode) -> usize {
        match self.current.position {
            Some(position) => self.current.chunk.emit_with_position(opcode, position),
            None => self.current.chunk.emit(opcode),
        }
    }

    /// Index of the next instruction
    fn here(&self) -> usize {
        self.current.chunk.instructions.len()
    }

    /// Point the jump at `index` to the next instruction
    fn patch(&mut self, index: usize) {
        let target = self.here();
        self.current.chunk.patch_jump(index, target);
    }

    fn patch_to(&mut self, index: usize, target: usize) {
        self.current.chunk.patch_jump(index, target);
    }

    fn set_position(&mut self, span: Span) {
        self.current.position = Some(self.lines.position(span.start));
    }

    fn position_of(&self, span: Span) -> SourcePosition {
        self.lines.position(span.start)
    }

    fn register(&mut self) -> RegisterId {
        self.current.register()
    }

    fn string_constant(&mut self, value: &str) -> usize {
        self.current
            .chunk
            .add_constant(Constant::String(Rc::from(value)))
    }

    fn load_string(&mut self, value: &str) {
        let index = self.string_constant(value);
        self.emit(Opcode::LoadConstant(index));
    }

    fn load_number(&mut self, value: f64) {
        let index = self.current.chunk.add_constant(Constant::Number(value));
        self.emit(Opcode::LoadConstant(index));
    }

    fn syntax_error(&self, span: Span, message: impl Into<String>) -> JsError {
        syntax_error(message, Some(self.position_of(span)))
    }

    fn unsupported(&self, span: Span, feature: &str) -> JsError {
        unsupported(feature, Some(self.position_of(span)))
    }

    // ---- scopes and bindings -------------------------------------------

    fn push_scope(&mut self) {
        self.current.scopes.push(Scope::default());
    }

    fn pop_scope(&mut self) {
        self.current.scopes.pop();
    }

    /// Declare `name` in the innermost scope, reusing an existing binding of
    /// the same scope. Captured names get a cell, all others a register.
    fn declare(&mut self, name: &str, is_const: bool) -> Binding {
        if let Some(existing) = self
            .current
            .scopes
            .last()
            .and_then(|scope| scope.bindings.get(name))
        {
            return *existing;
        }
        let storage = if self.current.info.captured.contains(name) {
            Storage::Cell(self.current.cell())
        } else {
            Storage::Register(self.current.register())
        };
        self.bind(name, storage, is_const)
    }

    fn bind(&mut self, name: &str, storage: Storage, is_const: bool) -> Binding {
        let binding = Binding { storage, is_const };
        if let Some(scope) = self.current.scopes.last_mut() {
            scope.bindings.insert(name.to_string(), binding);
        }
        binding
    }

    fn resolve(&mut self, name: &str) -> Result<Variable, JsError> {
        if let Some(binding) = self.current.lookup(name) {
            return Ok(Variable::Local(binding));
        }
        let level = self.enclosing.len();
        Ok(match self.capture(level, name)? {
            Some((index, is_const)) => Variable::Upvalue { index, is_const },
            None => Variable::Global(Rc::from(name)),
        })
    }

    fn state(&self, level: usize) -> &FunctionState {
        if level == self.enclosing.len() {
            &self.current
        } else {
            &self.enclosing[level]
        }
    }

    fn state_mut(&mut self, level: usize) -> &mut FunctionState {
        if level == self.enclosing.len() {
            &mut self.current
        } else {
            &mut self.enclosing[level]
        }
    }

    /// Find `name` in the functions enclosing the one at `level`, threading
    /// an upvalue through every function in between
    fn capture(&mut self, level: usize, name: &str) -> Result<Option<(u32, bool)>, JsError> {
        if level == 0 {
            return Ok(None);
        }
        if let Some(found) = self.state(level).upvalue(name) {
            return Ok(Some(found));
        }
        let parent = level - 1;
        let (descriptor, is_const) = match self.state(parent).lookup(name) {
            Some(Binding {
                storage: Storage::Cell(cell),
                is_const,
            }) => (UpvalueDescriptor::new(true, cell), is_const),
            Some(_) => {
                return Err(JsError::internal(format!(
                    "variable '{}' is captured but not stored in a cell",
                    name
                )))
            }
            None => match self.capture(parent, name)? {
                Some((index, is_const)) => (UpvalueDescriptor::new(false, index), is_const),
                None => return Ok(None),
            },
        };
        let index = self
            .state_mut(level)
            .add_upvalue(name, descriptor, is_const);
        Ok(Some((index, is_const)))
    }

    fn load_binding(&mut self, binding: Binding) {
        match binding.storage {
            Storage::Register(register) => self.emit(Opcode::LoadLocal(register)),
            Storage::Cell(cell) => self.emit(Opcode::LoadCell(cell)),
        };
    }

    fn store_binding(&mut self, binding: Binding) {
        match binding.storage {
            Storage::Register(register) => self.emit(Opcode::StoreLocal(register)),
            Storage::Cell(cell) => self.emit(Opcode::StoreCell(cell)),
        };
    }

    /// Give every cell binding of the innermost scope a fresh cell, so that
    /// closures created by an earlier execution of the scope keep their own
    fn refresh_scope_cells(&mut self) {
        let mut cells: Vec<u32> = self
            .current
            .scopes
            .last()
            .map(|scope| {
                scope
                    .bindings
                    .values()
                    .filter_map(|binding| match binding.storage {
                        Storage::Cell(cell) => Some(cell),
                        Storage::Register(_) => None,
                    })
                    .collect()
            })
            .unwrap_or_default();
        cells.sort_unstable();
        for cell in cells {
            self.emit(Opcode::FreshCell(cell));
        }
    }

    // ---- nested functions ----------------------------------------------

    fn enter_function(&mut self, state: FunctionState) {
        let outer = std::mem::replace(&mut self.current, state);
        self.enclosing.push(outer);
    }

    /// Finish the current function and add it to the enclosing one,
    /// returning its nested-function index and upvalue descriptors
    fn leave_function(&mut self) -> Result<(usize, Vec<UpvalueDescriptor>), JsError> {
        let outer = self
            .enclosing
            .pop()
            .ok_or_else(|| JsError::internal("no enclosing function to return to"))?;
        let finished = std::mem::replace(&mut self.current, outer);
        let chunk = finished.chunk;
        log::debug!(
            "compiled function {} ({} instructions, {} registers, {} cells, {} upvalues)",
            chunk.name.as_deref().unwrap_or("<anonymous>"),
            chunk.instruction_count(),
            chunk.register_count,
            chunk.cell_count,
            finished.upvalues.len()
        );
        let index = self.current.chunk.add_nested_function(Rc::new(chunk));
        Ok((index, finished.upvalues))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse, ParseOptions};
    use bytecode_system::completion;
    use core_types::ErrorKind;

    fn compile_source(source: &str) -> Result<Rc<BytecodeChunk>, JsError> {
        let program = parse(source, &ParseOptions::default())?.program;
        compile(&program, &CompileOptions::default())
    }

    fn chunk(source: &str) -> Rc<BytecodeChunk> {
        compile_source(source).unwrap()
    }

    fn opcodes(chunk: &BytecodeChunk) -> Vec<Opcode> {
        chunk.instructions.iter().map(|i| i.opcode.clone()).collect()
    }

    fn has(chunk: &BytecodeChunk, predicate: impl Fn(&Opcode) -> bool) -> bool {
        chunk.instructions.iter().any(|i| predicate(&i.opcode))
    }

    #[test]
    fn test_expression_statement_sets_completion() {
        let script = chunk("1 + 2");
        let ops = opcodes(&script);
        assert!(ops.contains(&Opcode::Add));
        assert_eq!(ops.last(), Some(&Opcode::Return));
        assert!(matches!(ops[ops.len() - 2], Opcode::LoadLocal(RegisterId(0))));
    }

    #[test]
    fn test_top_level_var_and_function_are_globals() {
        let script = chunk("var a = 1; function f() {} let b = 2;");
        assert!(has(&script, |op| matches!(op, Opcode::DeclareGlobal(n) if &**n == "a")));
        assert!(has(&script, |op| matches!(op, Opcode::DeclareGlobal(n) if &**n == "f")));
        assert!(has(&script, |op| matches!(op, Opcode::StoreGlobal(n) if &**n == "f")));
        assert!(!has(&script, |op| matches!(op, Opcode::StoreGlobal(n) if &**n == "b")));
    }

    #[test]
    fn test_captured_variable_lives_in_cell() {
        let script = chunk("function outer() { let x = 1; let y = 2; return () => x + y; }");
        let outer = &script.nested_functions[0];
        assert_eq!(outer.cell_count, 2);
        let arrow = &outer.nested_functions[0];
        assert!(has(arrow, |op| matches!(op, Opcode::LoadUpvalue(0))));
        assert!(has(arrow, |op| matches!(op, Opcode::LoadUpvalue(1))));
        assert!(has(outer, |op| matches!(
            op,
            Opcode::CreateClosure(0, upvalues) if upvalues.iter().all(|u| u.is_local)
        )));
    }

    #[test]
    fn test_upvalues_thread_through_intermediate_functions() {
        let script = chunk("function a() { let v = 1; return function b() { return () => v; }; }");
        let b = &script.nested_functions[0].nested_functions[0];
        assert!(has(b, |op| matches!(
            op,
            Opcode::CreateClosure(_, upvalues) if upvalues == &vec![UpvalueDescriptor::new(false, 0)]
        )));
    }

    #[test]
    fn test_unreferenced_outer_variables_are_not_captured() {
        let script = chunk("function f() { let big = []; let small = 1; return () => small; }");
        let f = &script.nested_functions[0];
        assert_eq!(f.cell_count, 1);
        let arrow = &f.nested_functions[0];
        assert!(has(f, |op| matches!(op, Opcode::CreateClosure(0, u) if u.len() == 1)));
        assert!(!has(arrow, |op| matches!(op, Opcode::LoadGlobal(_))));
    }

    #[test]
    fn test_unresolved_names_are_global_lookups() {
        let script = chunk("function f() { return missing; }");
        assert!(has(&script.nested_functions[0], |op| matches!(
            op,
            Opcode::LoadGlobal(n) if &**n == "missing"
        )));
        let script = chunk("typeof missing");
        assert!(has(&script, |op| matches!(op, Opcode::LoadGlobalOrUndefined(_))));
    }

    #[test]
    fn test_function_metadata() {
        let script = chunk("function f(a, b = 1, ...c) {} function g(a) { 'use strict'; }");
        let f = &script.nested_functions[0];
        assert_eq!(f.name.as_deref(), Some("f"));
        assert_eq!(f.param_count, 2);
        assert_eq!(f.length, 1);
        assert!(!f.strict);
        assert!(has(f, |op| matches!(op, Opcode::CreateRestArray(2))));
        assert!(script.nested_functions[1].strict);
    }

    #[test]
    fn test_anonymous_functions_take_binding_names() {
        let script = chunk("let f = function () {}; const g = () => {}; let o = { m: () => 1 };");
        let names: Vec<_> = script
            .nested_functions
            .iter()
            .map(|f| f.name.as_deref().map(str::to_string))
            .collect();
        assert_eq!(
            names,
            vec![Some("f".to_string()), Some("g".to_string()), Some("m".to_string())]
        );
    }

    #[test]
    fn test_generator_prologue() {
        let script = chunk("function* g(x) { yield x; }");
        let g = &script.nested_functions[0];
        assert!(g.is_generator);
        assert!(has(g, |op| matches!(op, Opcode::GeneratorStart)));
        assert!(has(g, |op| matches!(op, Opcode::Yield)));
    }

    #[test]
    fn test_try_finally_lowering() {
        let script = chunk("function f() { try { return 1; } finally { g(); } }");
        let f = &script.nested_functions[0];
        assert!(has(f, |op| matches!(op, Opcode::PushFinally { .. })));
        assert!(has(f, |op| matches!(op, Opcode::EnterFinally { .. })));
        assert!(has(f, |op| matches!(
            op,
            Opcode::SetCompletion { code, .. } if *code == completion::RETURN
        )));
        assert!(has(f, |op| matches!(
            op,
            Opcode::JumpIfCompletion { code, .. } if *code == completion::THROW
        )));
    }

    #[test]
    fn test_break_through_finally_registers_jump_code() {
        let script = chunk("for (;;) { try { break; } finally { f(); } }");
        assert!(has(&script, |op| matches!(
            op,
            Opcode::SetCompletion { code, .. } if *code == completion::FIRST_JUMP
        )));
    }

    #[test]
    fn test_for_of_break_closes_iterator() {
        let script = chunk("for (const x of xs) { if (x) break; }");
        assert!(has(&script, |op| matches!(op, Opcode::GetIterator)));
        assert!(has(&script, |op| matches!(op, Opcode::IteratorClose(_))));
        let script = chunk("for (const k in o) { if (k) break; }");
        assert!(has(&script, |op| matches!(op, Opcode::ForInKeys)));
        assert!(!has(&script, |op| matches!(op, Opcode::IteratorClose(_))));
    }

    #[test]
    fn test_per_iteration_cells_for_captured_loop_bindings() {
        let script = chunk("for (let i = 0; i < 3; i++) { fs.push(() => i); }");
        assert!(has(&script, |op| matches!(op, Opcode::FreshCell(_))));
    }

    #[test]
    fn test_const_assignment_throws_at_run_time() {
        let script = chunk("const c = 1; c = 2;");
        assert!(has(&script, |op| matches!(op, Opcode::ThrowConstAssignment(n) if &**n == "c")));
    }

    #[test]
    fn test_class_lowering() {
        let script = chunk(
            "class A extends B { x = 1; static y = 2; m() { return super.m(); } static s() {} }",
        );
        assert!(has(&script, |op| matches!(op, Opcode::CreateClass { has_parent: true })));
        assert!(has(&script, |op| matches!(op, Opcode::SetClassFields)));
        assert!(has(&script, |op| matches!(op, Opcode::DefineMethod(n) if &**n == "m")));
        assert!(has(&script, |op| matches!(op, Opcode::DefineMethod(n) if &**n == "s")));
        let ctor = &script.nested_functions[0];
        assert_eq!(ctor.kind, ChunkKind::ClassConstructor { derived: true });
        assert!(has(ctor, |op| matches!(op, Opcode::SuperCallSpread)));
    }

    #[test]
    fn test_instructions_carry_positions() {
        let script = chunk("let a = 1;\nfoo();");
        let call = script
            .instructions
            .iter()
            .find(|i| matches!(i.opcode, Opcode::Call(_)))
            .unwrap();
        assert_eq!(call.source_position.map(|p| p.line), Some(2));
    }

    #[test]
    fn test_source_name_override() {
        let program = parse("f()", &ParseOptions::new().with_source_name("a.js"))
            .unwrap()
            .program;
        let script = compile(&program, &CompileOptions::new()).unwrap();
        assert_eq!(script.source_name.as_deref(), Some("a.js"));
        let script = compile(&program, &CompileOptions::new().with_source_name("b.js")).unwrap();
        assert_eq!(script.source_name.as_deref(), Some("b.js"));
    }

    #[test]
    fn test_unsupported_constructs() {
        let err = compile_source("async function f() {}").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InternalError);
        let err = compile_source("import x from 'm';").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InternalError);
    }
}
