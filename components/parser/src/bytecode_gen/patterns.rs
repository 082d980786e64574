//! Stores into bindings, member targets and destructuring patterns

use bytecode_system::{Opcode, RegisterId};
use core_types::JsError;

use super::{BytecodeGenerator, Variable};
use crate::ast::*;

/// How a store treats `const` bindings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum BindMode {
    /// Ordinary assignment; storing into a constant throws
    Assign,
    /// Declaration initializer, parameter or loop head binding
    Initialize,
}

/// A property key consumed by an object pattern
enum TakenKey {
    Name(String),
    /// Computed key saved in a register
    Register(RegisterId),
}

impl BytecodeGenerator {
    /// Push the value of `name`
    pub(super) fn load_name(&mut self, name: &str) -> Result<(), JsError> {
        match self.resolve(name)? {
            Variable::Local(binding) => self.load_binding(binding),
            Variable::Upvalue { index, .. } => {
                self.emit(Opcode::LoadUpvalue(index));
            }
            Variable::Global(_) if name == "undefined" => {
                self.emit(Opcode::LoadUndefined);
            }
            Variable::Global(name) => {
                self.emit(Opcode::LoadGlobal(name));
            }
        }
        Ok(())
    }

    /// Pop the top value into `name`
    pub(super) fn store_name(&mut self, name: &str, mode: BindMode) -> Result<(), JsError> {
        match self.resolve(name)? {
            Variable::Local(binding) => {
                if binding.is_const && mode == BindMode::Assign {
                    self.emit(Opcode::ThrowConstAssignment(name.into()));
                } else {
                    self.store_binding(binding);
                }
            }
            Variable::Upvalue { index, is_const } => {
                if is_const && mode == BindMode::Assign {
                    self.emit(Opcode::ThrowConstAssignment(name.into()));
                } else {
                    self.emit(Opcode::StoreUpvalue(index));
                }
            }
            Variable::Global(name) => {
                self.emit(Opcode::StoreGlobal(name));
            }
        }
        Ok(())
    }

    /// Pop the top value and destructure it into `pattern`
    pub(super) fn bind_pattern(&mut self, pattern: &Pattern, mode: BindMode) -> Result<(), JsError> {
        match pattern {
            Pattern::Identifier { name, .. } => self.store_name(name, mode),
            Pattern::MemberExpression(target) => self.store_member_target(target),
            Pattern::AssignmentPattern { left, right, .. } => {
                self.emit(Opcode::Dup);
                self.emit(Opcode::LoadUndefined);
                self.emit(Opcode::StrictEqual);
                let skip = self.emit(Opcode::JumpIfFalse(0));
                self.emit(Opcode::Pop);
                match left.as_identifier() {
                    Some(name) => self.compile_named_expression(right, name)?,
                    None => self.compile_expression(right)?,
                }
                self.patch(skip);
                self.bind_pattern(left, mode)
            }
            Pattern::ArrayPattern { elements, rest, .. } => {
                self.emit(Opcode::GetIterator);
                let iterator = self.register();
                self.emit(Opcode::StoreLocal(iterator));
                for element in elements {
                    self.emit(Opcode::IteratorValue(iterator));
                    match element {
                        Some(element) => self.bind_pattern(element, mode)?,
                        None => {
                            self.emit(Opcode::Pop);
                        }
                    }
                }
                match rest {
                    Some(rest) => {
                        self.emit(Opcode::IteratorRest(iterator));
                        self.bind_pattern(rest, mode)
                    }
                    None => {
                        self.emit(Opcode::IteratorClose(iterator));
                        Ok(())
                    }
                }
            }
            Pattern::ObjectPattern {
                properties, rest, ..
            } => self.bind_object_pattern(properties, rest.as_deref(), mode),
            Pattern::RestElement { argument, .. } => self.bind_pattern(argument, mode),
        }
    }

    fn bind_object_pattern(
        &mut self,
        properties: &[ObjectPatternProperty],
        rest: Option<&Pattern>,
        mode: BindMode,
    ) -> Result<(), JsError> {
        self.emit(Opcode::RequireObjectCoercible);
        let source = self.register();
        self.emit(Opcode::StoreLocal(source));

        // Keys already taken, replayed for the rest object
        let mut taken = Vec::new();
        for property in properties {
            self.emit(Opcode::LoadLocal(source));
            match &property.key {
                PropertyKey::Computed(key) => {
                    self.compile_expression(key)?;
                    self.emit(Opcode::ToPropertyKey);
                    if rest.is_some() {
                        let register = self.register();
                        self.emit(Opcode::Dup);
                        self.emit(Opcode::StoreLocal(register));
                        taken.push(TakenKey::Register(register));
                    }
                    self.emit(Opcode::GetIndex);
                }
                key => {
                    let name = key.static_name().unwrap_or_default();
                    self.emit(Opcode::LoadProperty(name.as_str().into()));
                    taken.push(TakenKey::Name(name));
                }
            }
            self.bind_pattern(&property.value, mode)?;
        }

        if let Some(rest) = rest {
            self.emit(Opcode::LoadLocal(source));
            for key in &taken {
                match key {
                    TakenKey::Name(name) => self.load_string(name),
                    TakenKey::Register(register) => {
                        self.emit(Opcode::LoadLocal(*register));
                    }
                }
            }
            self.emit(Opcode::CopyRest(taken.len() as u32));
            self.bind_pattern(rest, mode)?;
        }
        Ok(())
    }

    /// Pop the top value into a member expression target
    fn store_member_target(&mut self, target: &Expression) -> Result<(), JsError> {
        let Expression::MemberExpression {
            object, property, ..
        } = target
        else {
            return Err(self.syntax_error(target.span(), "Invalid assignment target"));
        };
        let value = self.register();
        self.emit(Opcode::StoreLocal(value));
        self.compile_member_object(object)?;
        match property {
            MemberProperty::Identifier(name) => {
                self.emit(Opcode::LoadLocal(value));
                self.emit(Opcode::StoreProperty(name.as_str().into()));
            }
            MemberProperty::Computed(key) => {
                self.compile_expression(key)?;
                self.emit(Opcode::LoadLocal(value));
                self.emit(Opcode::SetIndex);
            }
        }
        self.emit(Opcode::Pop);
        Ok(())
    }

    /// Push the object a member expression reads from or writes to; writes
    /// through `super` land on `this`
    pub(super) fn compile_member_object(&mut self, object: &Expression) -> Result<(), JsError> {
        match object {
            Expression::SuperExpression { .. } => {
                self.emit(Opcode::LoadThis);
                Ok(())
            }
            _ => self.compile_expression(object),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{compile, parse, CompileOptions, ParseOptions};
    use bytecode_system::Opcode;

    fn ops(source: &str) -> Vec<Opcode> {
        let program = parse(source, &ParseOptions::default()).unwrap().program;
        let chunk = compile(&program, &CompileOptions::default()).unwrap();
        chunk.instructions.iter().map(|i| i.opcode.clone()).collect()
    }

    #[test]
    fn test_array_pattern_closes_iterator_without_rest() {
        let with_rest = ops("let [a, ...b] = c;");
        assert!(with_rest.iter().any(|op| matches!(op, Opcode::IteratorRest(_))));
        assert!(!with_rest.iter().any(|op| matches!(op, Opcode::IteratorClose(_))));
        let without = ops("let [a, , b] = c;");
        assert_eq!(
            without
                .iter()
                .filter(|op| matches!(op, Opcode::IteratorValue(_)))
                .count(),
            3
        );
        assert!(without.iter().any(|op| matches!(op, Opcode::IteratorClose(_))));
    }

    #[test]
    fn test_object_rest_excludes_taken_keys() {
        let ops = ops("let { a, [k]: b, ...rest } = o;");
        assert!(ops.contains(&Opcode::RequireObjectCoercible));
        assert!(ops.contains(&Opcode::CopyRest(2)));
    }

    #[test]
    fn test_defaults_test_for_undefined() {
        let ops = ops("let { a = 1 } = o;");
        let window = [Opcode::Dup, Opcode::LoadUndefined, Opcode::StrictEqual];
        assert!(ops.windows(3).any(|w| w == window));
    }

    #[test]
    fn test_member_targets_in_destructuring_assignment() {
        let ops = ops("[o.a, o['b']] = xs;");
        assert!(ops.iter().any(|op| matches!(op, Opcode::StoreProperty(n) if &**n == "a")));
        assert!(ops.contains(&Opcode::SetIndex));
    }
}
