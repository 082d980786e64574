//! Functions, methods and classes

use std::rc::Rc;

use bytecode_system::{FunctionKind as ChunkKind, Opcode, RegisterId};
use core_types::JsError;

use super::patterns::BindMode;
use super::{BytecodeGenerator, FunctionState, Storage};
use crate::ast::*;
use crate::scope::ScopeAnalyzer;

impl BytecodeGenerator {
    /// Compile `function` into a nested chunk and push a closure over it
    ///
    /// `is_expression` marks function expressions, whose own name is bound
    /// inside their body.
    pub(super) fn compile_function(
        &mut self,
        function: &Function,
        name: Option<&str>,
        is_expression: bool,
    ) -> Result<(), JsError> {
        if function.is_async {
            return Err(self.unsupported(function.span, "async function"));
        }

        let info = ScopeAnalyzer::analyze_function(function, is_expression);
        let kind = match function.kind {
            FunctionKind::Normal => ChunkKind::Normal,
            FunctionKind::Arrow => ChunkKind::Arrow,
            FunctionKind::Method => ChunkKind::Method,
            FunctionKind::ClassConstructor { derived } => ChunkKind::ClassConstructor { derived },
        };
        let mut state = FunctionState::new(kind, info, function.strict);
        state.chunk.name = name.map(Rc::from);
        state.chunk.is_generator = function.is_generator;
        state.chunk.length = function.length();
        state.chunk.source_name = self.source_name.clone();
        state.chunk.position = Some(self.position_of(function.span));

        self.enter_function(state);
        self.push_scope();
        let result = self.compile_function_body(function);
        self.pop_scope();
        let (index, upvalues) = self.leave_function()?;
        result?;
        self.emit(Opcode::CreateClosure(index, upvalues));
        Ok(())
    }

    fn compile_function_body(&mut self, function: &Function) -> Result<(), JsError> {
        // Registers below param_count receive the arguments
        let (params, rest) = match function.params.split_last() {
            Some((Pattern::RestElement { argument, .. }, params)) => (params, Some(argument)),
            _ => (function.params.as_slice(), None),
        };
        let param_count = params.len() as u32;
        self.current.chunk.param_count = param_count;
        self.current.chunk.register_count = param_count;

        if self.current.info.uses_own_name {
            if let Some(name) = function.name.as_deref() {
                let binding = self.declare(name, false);
                self.emit(Opcode::LoadCallee);
                self.store_binding(binding);
            }
        }
        if self.current.info.uses_arguments {
            let binding = self.declare("arguments", false);
            self.emit(Opcode::CreateArguments);
            self.store_binding(binding);
        }

        for (i, param) in params.iter().enumerate() {
            let register = RegisterId(i as u32);
            match param {
                Pattern::Identifier { name, .. } if !self.current.info.captured.contains(name) => {
                    self.bind(name, Storage::Register(register), false);
                }
                Pattern::Identifier { name, .. } => {
                    let binding = self.declare(name, false);
                    self.emit(Opcode::LoadLocal(register));
                    self.store_binding(binding);
                }
                pattern => {
                    self.declare_pattern(pattern);
                    self.emit(Opcode::LoadLocal(register));
                    self.bind_pattern(pattern, BindMode::Initialize)?;
                }
            }
        }
        if let Some(rest) = rest {
            self.declare_pattern(rest);
            self.emit(Opcode::CreateRestArray(param_count));
            self.bind_pattern(rest, BindMode::Initialize)?;
        }

        for name in function
            .hoisting
            .var_names
            .iter()
            .chain(function.hoisting.functions.iter())
        {
            self.declare(name, false);
        }
        for binding in &function.hoisting.lexical {
            self.declare(&binding.name, binding.is_const);
        }

        match &function.body {
            FunctionBody::Block(body) => {
                self.instantiate_functions(body)?;
                if function.is_generator {
                    self.emit(Opcode::GeneratorStart);
                }
                self.compile_statements(body)?;
                self.emit(Opcode::LoadUndefined);
                self.emit(Opcode::Return);
            }
            FunctionBody::Expression(expression) => {
                self.compile_expression(expression)?;
                self.emit(Opcode::Return);
            }
        }
        Ok(())
    }

    fn declare_pattern(&mut self, pattern: &Pattern) {
        let mut names = Vec::new();
        pattern.bound_names(&mut names);
        for name in names {
            self.declare(&name, false);
        }
    }

    /// Compile a class definition, leaving its constructor on the stack
    pub(super) fn compile_class(&mut self, class: &Class, name: Option<&str>) -> Result<(), JsError> {
        let class_name = class.name.as_deref().or(name);

        // The class body sees its own name as an immutable binding
        self.push_scope();
        if let Some(own) = class.name.as_deref() {
            self.declare(own, true);
            self.refresh_scope_cells();
        }

        let has_parent = match &class.super_class {
            Some(parent) => {
                self.compile_expression(parent)?;
                true
            }
            None => false,
        };
        self.compile_function(&class.constructor, class_name, false)?;
        self.set_position(class.span);
        self.emit(Opcode::CreateClass { has_parent });

        for element in &class.elements {
            if let ClassElement::MethodDefinition {
                key,
                kind,
                function,
                is_static,
                ..
            } = element
            {
                if *is_static {
                    self.emit(Opcode::Swap);
                }
                self.compile_method(key, *kind, function, false)?;
                if *is_static {
                    self.emit(Opcode::Swap);
                }
            }
        }

        let (statics, instance): (Vec<&ClassElement>, Vec<&ClassElement>) = class
            .elements
            .iter()
            .filter(|e| matches!(e, ClassElement::PropertyDefinition { .. }))
            .partition(|e| matches!(e, ClassElement::PropertyDefinition { is_static: true, .. }));

        // [constructor, prototype]
        if !instance.is_empty() {
            self.emit(Opcode::Dup);
            self.compile_field_initializer(&instance)?;
            self.emit(Opcode::MakeMethod);
            self.emit(Opcode::Swap);
            self.emit(Opcode::Pop);
            self.emit(Opcode::SetClassFields);
        }
        if !statics.is_empty() {
            self.emit(Opcode::Swap);
            self.emit(Opcode::Dup);
            self.compile_field_initializer(&statics)?;
            self.emit(Opcode::MakeMethod);
            self.emit(Opcode::Swap);
            self.emit(Opcode::Call(0));
            self.emit(Opcode::Pop);
            self.emit(Opcode::Swap);
        }
        self.emit(Opcode::Pop);

        if let Some(own) = class.name.as_deref() {
            self.emit(Opcode::Dup);
            self.store_name(own, BindMode::Initialize)?;
        }
        self.pop_scope();
        Ok(())
    }

    /// Compile a method that defines `fields` on its receiver, in order
    fn compile_field_initializer(&mut self, fields: &[&ClassElement]) -> Result<(), JsError> {
        let info = ScopeAnalyzer::analyze_fields(fields.iter().copied());
        let mut state = FunctionState::new(ChunkKind::Method, info, true);
        state.chunk.source_name = self.source_name.clone();
        state.chunk.position = self.current.position;

        self.enter_function(state);
        self.push_scope();
        let result = self.compile_field_definitions(fields);
        self.pop_scope();
        let (index, upvalues) = self.leave_function()?;
        result?;
        self.emit(Opcode::CreateClosure(index, upvalues));
        Ok(())
    }

    fn compile_field_definitions(&mut self, fields: &[&ClassElement]) -> Result<(), JsError> {
        for field in fields {
            let ClassElement::PropertyDefinition {
                key, value, span, ..
            } = field
            else {
                continue;
            };
            self.set_position(*span);
            self.emit(Opcode::LoadThis);
            match key {
                PropertyKey::Computed(key) => {
                    self.compile_expression(key)?;
                    self.emit(Opcode::ToPropertyKey);
                    self.compile_field_value(value.as_ref(), None)?;
                    self.emit(Opcode::DefineIndexField);
                }
                key => {
                    let name = key.static_name().unwrap_or_default();
                    self.compile_field_value(value.as_ref(), Some(&name))?;
                    self.emit(Opcode::DefineField(name.as_str().into()));
                }
            }
            self.emit(Opcode::Pop);
        }
        self.emit(Opcode::LoadUndefined);
        self.emit(Opcode::Return);
        Ok(())
    }

    fn compile_field_value(
        &mut self,
        value: Option<&Expression>,
        name: Option<&str>,
    ) -> Result<(), JsError> {
        match (value, name) {
            (Some(value), Some(name)) => self.compile_named_expression(value, name),
            (Some(value), None) => self.compile_expression(value),
            (None, _) => {
                self.emit(Opcode::LoadUndefined);
                Ok(())
            }
        }
    }

    /// Define a method, getter or setter on the home object on top of the
    /// stack: `[home] -> [home]`
    pub(super) fn compile_method(
        &mut self,
        key: &PropertyKey,
        kind: MethodKind,
        function: &Function,
        enumerable: bool,
    ) -> Result<(), JsError> {
        let static_name = key.static_name();
        let function_name = static_name.as_deref().map(|name| match kind {
            MethodKind::Method => name.to_string(),
            MethodKind::Get => format!("get {}", name),
            MethodKind::Set => format!("set {}", name),
        });

        self.emit(Opcode::Dup);
        self.compile_function(function, function_name.as_deref(), false)?;
        self.emit(Opcode::MakeMethod);
        self.emit(Opcode::Swap);
        self.emit(Opcode::Pop);
        // [home, function]

        if kind == MethodKind::Method {
            match static_name {
                Some(name) if enumerable => {
                    self.emit(Opcode::DefineField(name.as_str().into()));
                }
                Some(name) => {
                    self.emit(Opcode::DefineMethod(name.as_str().into()));
                }
                None => {
                    self.compile_method_key(key)?;
                    self.emit(Opcode::Swap);
                    self.emit(if enumerable {
                        Opcode::DefineIndexField
                    } else {
                        Opcode::DefineIndexMethod
                    });
                }
            }
            return Ok(());
        }

        self.compile_method_key(key)?;
        self.emit(Opcode::Swap);
        self.emit(match kind {
            MethodKind::Get => Opcode::DefineGetter { enumerable },
            _ => Opcode::DefineSetter { enumerable },
        });
        Ok(())
    }

    fn compile_method_key(&mut self, key: &PropertyKey) -> Result<(), JsError> {
        match key {
            PropertyKey::Computed(key) => {
                self.compile_expression(key)?;
                self.emit(Opcode::ToPropertyKey);
            }
            key => self.load_string(&key.static_name().unwrap_or_default()),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{compile, parse, CompileOptions, ParseOptions};
    use bytecode_system::{BytecodeChunk, Opcode, RegisterId};
    use std::rc::Rc;

    fn chunk(source: &str) -> Rc<BytecodeChunk> {
        let program = parse(source, &ParseOptions::default()).unwrap().program;
        compile(&program, &CompileOptions::default()).unwrap()
    }

    fn ops(chunk: &BytecodeChunk) -> Vec<Opcode> {
        chunk.instructions.iter().map(|i| i.opcode.clone()).collect()
    }

    #[test]
    fn test_simple_params_use_argument_registers() {
        let script = chunk("function f(a, b) { return a + b; }");
        let f = &script.nested_functions[0];
        assert_eq!(f.register_count, 2);
        assert_eq!(
            ops(f),
            vec![
                Opcode::LoadLocal(RegisterId(0)),
                Opcode::LoadLocal(RegisterId(1)),
                Opcode::Add,
                Opcode::Return,
                Opcode::LoadUndefined,
                Opcode::Return,
            ]
        );
    }

    #[test]
    fn test_captured_param_moves_into_cell() {
        let script = chunk("function f(a) { return () => a; }");
        let f = &script.nested_functions[0];
        assert_eq!(f.cell_count, 1);
        assert_eq!(&ops(f)[..2], &[Opcode::LoadLocal(RegisterId(0)), Opcode::StoreCell(0)]);
    }

    #[test]
    fn test_arguments_and_own_name() {
        let script = chunk("(function fact(n) { return arguments.length && fact; })");
        let f = ops(&script.nested_functions[0]);
        assert!(f.contains(&Opcode::LoadCallee));
        assert!(f.contains(&Opcode::CreateArguments));
        let arrow = chunk("() => 1");
        assert!(!ops(&arrow.nested_functions[0]).contains(&Opcode::CreateArguments));
    }

    #[test]
    fn test_accessor_names() {
        let script = chunk("({ get x() { return 1; }, set x(v) {} })");
        let names: Vec<_> = script
            .nested_functions
            .iter()
            .map(|f| f.name.as_deref().unwrap_or_default().to_string())
            .collect();
        assert_eq!(names, vec!["get x", "set x"]);
    }

    #[test]
    fn test_static_fields_run_once_against_constructor() {
        let script = chunk("class A { static n = 1; }");
        let ops = ops(&script);
        let window = [Opcode::MakeMethod, Opcode::Swap, Opcode::Call(0)];
        assert!(ops.windows(3).any(|w| w == window));
        assert!(!ops.contains(&Opcode::SetClassFields));
    }

    #[test]
    fn test_named_class_expression_binds_own_name() {
        let script = chunk("let C = class D { m() { return D; } };");
        let ctor = &script.nested_functions[0];
        assert_eq!(ctor.name.as_deref(), Some("D"));
        let method = &script.nested_functions[1];
        assert!(ops(method).contains(&Opcode::LoadUpvalue(0)));
    }

    #[test]
    fn test_computed_method_key() {
        let script = chunk("class A { [k]() {} }");
        assert!(ops(&script).contains(&Opcode::DefineIndexMethod));
    }
}
