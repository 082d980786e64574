//! Expression lowering

use bytecode_system::Opcode;
use core_types::JsError;

use super::patterns::BindMode;
use super::{BytecodeGenerator, Variable};
use crate::ast::*;
use crate::parser::{STACK_RED_ZONE, STACK_SEGMENT};

impl BytecodeGenerator {
    /// Compile `expression`, leaving its value on the stack
    pub(super) fn compile_expression(&mut self, expression: &Expression) -> Result<(), JsError> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, || {
            self.compile_expression_kind(expression)
        })
    }

    fn compile_expression_kind(&mut self, expression: &Expression) -> Result<(), JsError> {
        match expression {
            Expression::Identifier { name, .. } => self.load_name(name)?,
            Expression::Literal { value, .. } => match value {
                Literal::Number(n) => self.load_number(*n),
                Literal::String(s) => self.load_string(s),
                Literal::Boolean(true) => {
                    self.emit(Opcode::LoadTrue);
                }
                Literal::Boolean(false) => {
                    self.emit(Opcode::LoadFalse);
                }
                Literal::Null => {
                    self.emit(Opcode::LoadNull);
                }
            },
            Expression::TemplateLiteral {
                quasis,
                expressions,
                ..
            } => self.compile_template(quasis, expressions)?,
            Expression::TaggedTemplate {
                tag,
                quasis,
                expressions,
                span,
            } => {
                self.set_position(*span);
                self.compile_callee(tag)?;
                self.compile_template_strings(quasis);
                for expression in expressions {
                    self.compile_expression(expression)?;
                }
                self.set_position(*span);
                self.emit(Opcode::Call(1 + expressions.len() as u32));
            }
            Expression::RegExpLiteral { pattern, flags, .. } => {
                let pattern = self.string_constant(pattern);
                let flags = self.string_constant(flags);
                self.emit(Opcode::CreateRegExp(pattern, flags));
            }
            Expression::ArrayExpression { elements, .. } => self.compile_array(elements)?,
            Expression::ObjectExpression { properties, .. } => self.compile_object(properties)?,
            Expression::FunctionExpression { function, .. } => {
                self.compile_function(function, function.name.as_deref(), true)?
            }
            Expression::ArrowFunctionExpression { function, .. } => {
                self.compile_function(function, None, false)?
            }
            Expression::ClassExpression { class, .. } => self.compile_class(class, None)?,
            Expression::UnaryExpression {
                operator, argument, ..
            } => self.compile_unary(*operator, argument)?,
            Expression::UpdateExpression {
                operator,
                prefix,
                argument,
                ..
            } => self.compile_update(*operator, *prefix, argument)?,
            Expression::BinaryExpression {
                left,
                operator,
                right,
                ..
            } => {
                self.compile_expression(left)?;
                self.compile_expression(right)?;
                self.emit(binary_opcode(*operator));
            }
            Expression::LogicalExpression {
                left,
                operator,
                right,
                ..
            } => {
                self.compile_expression(left)?;
                self.emit(Opcode::Dup);
                let short = self.emit(short_circuit_jump(*operator));
                self.emit(Opcode::Pop);
                self.compile_expression(right)?;
                self.patch(short);
            }
            Expression::AssignmentExpression {
                left,
                operator,
                right,
                ..
            } => self.compile_assignment(left, *operator, right)?,
            Expression::ConditionalExpression {
                test,
                consequent,
                alternate,
                ..
            } => {
                self.compile_expression(test)?;
                let else_jump = self.emit(Opcode::JumpIfFalse(0));
                self.compile_expression(consequent)?;
                let end_jump = self.emit(Opcode::Jump(0));
                self.patch(else_jump);
                self.compile_expression(alternate)?;
                self.patch(end_jump);
            }
            Expression::CallExpression {
                callee,
                arguments,
                optional,
                span,
            } => self.compile_call(callee, arguments, *optional, *span)?,
            Expression::NewExpression {
                callee,
                arguments,
                span,
            } => {
                self.set_position(*span);
                self.compile_expression(callee)?;
                let count = self.compile_arguments(arguments)?;
                self.set_position(*span);
                match count {
                    Some(count) => self.emit(Opcode::CallNew(count)),
                    None => self.emit(Opcode::CallNewSpread),
                };
            }
            Expression::MemberExpression {
                object,
                property,
                optional,
                span,
            } => {
                if let Expression::SuperExpression { .. } = object.as_ref() {
                    self.compile_super_property(property)?;
                } else {
                    self.compile_expression(object)?;
                    if *optional {
                        self.emit_chain_exit(0, *span)?;
                    }
                    self.set_position(*span);
                    self.compile_property_load(property)?;
                }
            }
            Expression::OptionalChain { expression, .. } => {
                self.current.chain_exits.push(Vec::new());
                let result = self.compile_expression(expression);
                let exits = self.current.chain_exits.pop().unwrap_or_default();
                result?;
                for exit in exits {
                    self.patch(exit);
                }
            }
            Expression::SequenceExpression { expressions, .. } => {
                for (i, expression) in expressions.iter().enumerate() {
                    if i > 0 {
                        self.emit(Opcode::Pop);
                    }
                    self.compile_expression(expression)?;
                }
            }
            Expression::SpreadElement { span, .. } => {
                return Err(self.syntax_error(*span, "Unexpected token '...'"))
            }
            Expression::ThisExpression { .. } => {
                self.emit(Opcode::LoadThis);
            }
            Expression::SuperExpression { span } => {
                return Err(self.syntax_error(*span, "'super' keyword unexpected here"))
            }
            Expression::NewTarget { .. } => {
                self.emit(Opcode::LoadNewTarget);
            }
            Expression::YieldExpression {
                argument, delegate, ..
            } => {
                match argument {
                    Some(argument) => self.compile_expression(argument)?,
                    None => {
                        self.emit(Opcode::LoadUndefined);
                    }
                }
                if *delegate {
                    self.emit(Opcode::GetIterator);
                    let iterator = self.register();
                    self.emit(Opcode::StoreLocal(iterator));
                    self.emit(Opcode::YieldDelegate(iterator));
                } else {
                    self.emit(Opcode::Yield);
                }
            }
            Expression::AwaitExpression { span, .. } => {
                return Err(self.unsupported(*span, "await"))
            }
        }
        Ok(())
    }

    /// Compile `expression`, naming it `name` if it is an anonymous function
    /// or class
    pub(super) fn compile_named_expression(
        &mut self,
        expression: &Expression,
        name: &str,
    ) -> Result<(), JsError> {
        match expression {
            Expression::FunctionExpression { function, .. } if function.name.is_none() => {
                self.compile_function(function, Some(name), true)
            }
            Expression::ArrowFunctionExpression { function, .. } => {
                self.compile_function(function, Some(name), false)
            }
            Expression::ClassExpression { class, .. } if class.name.is_none() => {
                self.compile_class(class, Some(name))
            }
            _ => self.compile_expression(expression),
        }
    }

    /// `[object] -> [value]`
    fn compile_property_load(&mut self, property: &MemberProperty) -> Result<(), JsError> {
        match property {
            MemberProperty::Identifier(name) => {
                self.emit(Opcode::LoadProperty(name.as_str().into()));
            }
            MemberProperty::Computed(key) => {
                self.compile_expression(key)?;
                self.emit(Opcode::GetIndex);
            }
        }
        Ok(())
    }

    fn compile_super_property(&mut self, property: &MemberProperty) -> Result<(), JsError> {
        match property {
            MemberProperty::Identifier(name) => {
                self.emit(Opcode::LoadSuperProperty(name.as_str().into()));
            }
            MemberProperty::Computed(key) => {
                self.compile_expression(key)?;
                self.emit(Opcode::GetSuperIndex);
            }
        }
        Ok(())
    }

    /// Leave the enclosing optional chain if the value `depth` slots below
    /// the top is nullish
    fn emit_chain_exit(&mut self, depth: u32, span: core_types::Span) -> Result<(), JsError> {
        let exit = self.emit(Opcode::OptionalChainExit { target: 0, depth });
        match self.current.chain_exits.last_mut() {
            Some(exits) => {
                exits.push(exit);
                Ok(())
            }
            None => Err(self.syntax_error(span, "Optional chain outside of chain expression")),
        }
    }

    /// Push `[function, this]` for a call of `callee`
    fn compile_callee(&mut self, callee: &Expression) -> Result<(), JsError> {
        match callee {
            Expression::MemberExpression {
                object, property, ..
            } if matches!(object.as_ref(), Expression::SuperExpression { .. }) => {
                self.compile_super_property(property)?;
                self.emit(Opcode::LoadThis);
            }
            Expression::MemberExpression {
                object,
                property,
                optional,
                span,
            } => {
                self.compile_expression(object)?;
                if *optional {
                    self.emit_chain_exit(0, *span)?;
                }
                self.emit(Opcode::Dup);
                self.set_position(*span);
                self.compile_property_load(property)?;
                self.emit(Opcode::Swap);
            }
            _ => {
                self.compile_expression(callee)?;
                self.emit(Opcode::LoadUndefined);
            }
        }
        Ok(())
    }

    /// Push the arguments of a call. Returns the argument count, or None
    /// when spread arguments were collected into a single array.
    fn compile_arguments(&mut self, arguments: &[Expression]) -> Result<Option<u32>, JsError> {
        if !arguments
            .iter()
            .any(|a| matches!(a, Expression::SpreadElement { .. }))
        {
            for argument in arguments {
                self.compile_expression(argument)?;
            }
            return Ok(Some(arguments.len() as u32));
        }
        self.emit(Opcode::CreateArray(0));
        for argument in arguments {
            match argument {
                Expression::SpreadElement { argument, .. } => {
                    self.compile_expression(argument)?;
                    self.emit(Opcode::ArraySpread);
                }
                _ => {
                    self.compile_expression(argument)?;
                    self.emit(Opcode::ArrayPush);
                }
            }
        }
        Ok(None)
    }

    fn compile_call(
        &mut self,
        callee: &Expression,
        arguments: &[Expression],
        optional: bool,
        span: core_types::Span,
    ) -> Result<(), JsError> {
        self.set_position(span);
        if let Expression::SuperExpression { .. } = callee {
            let count = self.compile_arguments(arguments)?;
            self.set_position(span);
            match count {
                Some(count) => self.emit(Opcode::SuperCall(count)),
                None => self.emit(Opcode::SuperCallSpread),
            };
            return Ok(());
        }

        self.compile_callee(callee)?;
        if optional {
            self.emit_chain_exit(1, span)?;
        }
        let count = self.compile_arguments(arguments)?;
        self.set_position(span);
        match count {
            Some(count) => self.emit(Opcode::Call(count)),
            None => self.emit(Opcode::CallSpread),
        };
        Ok(())
    }

    fn compile_template(
        &mut self,
        quasis: &[TemplateElement],
        expressions: &[Expression],
    ) -> Result<(), JsError> {
        let cooked = |element: &TemplateElement| element.cooked.clone().unwrap_or_default();
        match quasis.first() {
            Some(first) => self.load_string(&cooked(first)),
            None => self.load_string(""),
        }
        for (expression, quasi) in expressions.iter().zip(quasis.iter().skip(1)) {
            self.compile_expression(expression)?;
            self.emit(Opcode::Stringify);
            self.emit(Opcode::Add);
            if !quasi.raw.is_empty() {
                self.load_string(&cooked(quasi));
                self.emit(Opcode::Add);
            }
        }
        Ok(())
    }

    /// Push the strings array passed to a template tag, with its `raw`
    /// property
    fn compile_template_strings(&mut self, quasis: &[TemplateElement]) {
        for quasi in quasis {
            match &quasi.cooked {
                Some(cooked) => self.load_string(cooked),
                None => {
                    self.emit(Opcode::LoadUndefined);
                }
            }
        }
        self.emit(Opcode::CreateArray(quasis.len() as u32));
        self.emit(Opcode::Dup);
        for quasi in quasis {
            self.load_string(&quasi.raw);
        }
        self.emit(Opcode::CreateArray(quasis.len() as u32));
        self.emit(Opcode::StoreProperty("raw".into()));
        self.emit(Opcode::Pop);
    }

    fn compile_array(&mut self, elements: &[Option<Expression>]) -> Result<(), JsError> {
        let dense = elements
            .iter()
            .all(|e| matches!(e, Some(e) if !matches!(e, Expression::SpreadElement { .. })));
        if dense {
            for element in elements.iter().flatten() {
                self.compile_expression(element)?;
            }
            self.emit(Opcode::CreateArray(elements.len() as u32));
            return Ok(());
        }
        self.emit(Opcode::CreateArray(0));
        for element in elements {
            match element {
                None => {
                    self.emit(Opcode::ArrayPushHole);
                }
                Some(Expression::SpreadElement { argument, .. }) => {
                    self.compile_expression(argument)?;
                    self.emit(Opcode::ArraySpread);
                }
                Some(element) => {
                    self.compile_expression(element)?;
                    self.emit(Opcode::ArrayPush);
                }
            }
        }
        Ok(())
    }

    fn compile_object(&mut self, properties: &[ObjectProperty]) -> Result<(), JsError> {
        self.emit(Opcode::CreateObject);
        for property in properties {
            match property {
                ObjectProperty::Property { key, value, .. } => match key {
                    PropertyKey::Computed(key) => {
                        self.compile_expression(key)?;
                        self.emit(Opcode::ToPropertyKey);
                        self.compile_expression(value)?;
                        self.emit(Opcode::DefineIndexField);
                    }
                    key => {
                        let name = key.static_name().unwrap_or_default();
                        self.compile_named_expression(value, &name)?;
                        self.emit(Opcode::DefineField(name.as_str().into()));
                    }
                },
                ObjectProperty::Method {
                    key,
                    kind,
                    function,
                    ..
                } => self.compile_method(key, *kind, function, true)?,
                ObjectProperty::SpreadElement(source) => {
                    self.compile_expression(source)?;
                    self.emit(Opcode::CopyDataProperties);
                }
            }
        }
        Ok(())
    }

    fn compile_unary(
        &mut self,
        operator: UnaryOperator,
        argument: &Expression,
    ) -> Result<(), JsError> {
        match operator {
            UnaryOperator::Typeof => {
                match argument {
                    Expression::Identifier { name, .. } => match self.resolve(name)? {
                        Variable::Global(name) => {
                            self.emit(Opcode::LoadGlobalOrUndefined(name));
                        }
                        _ => self.load_name(name)?,
                    },
                    _ => self.compile_expression(argument)?,
                }
                self.emit(Opcode::Typeof);
            }
            UnaryOperator::Delete => match argument {
                Expression::MemberExpression {
                    object, property, ..
                } if !matches!(object.as_ref(), Expression::SuperExpression { .. }) => {
                    self.compile_expression(object)?;
                    match property {
                        MemberProperty::Identifier(name) => {
                            self.emit(Opcode::DeleteProperty(name.as_str().into()));
                        }
                        MemberProperty::Computed(key) => {
                            self.compile_expression(key)?;
                            self.emit(Opcode::DeleteIndex);
                        }
                    }
                }
                Expression::Identifier { name, .. } => match self.resolve(name)? {
                    Variable::Global(name) => {
                        self.emit(Opcode::DeleteGlobal(name));
                    }
                    _ => {
                        self.emit(Opcode::LoadFalse);
                    }
                },
                _ => {
                    self.compile_expression(argument)?;
                    self.emit(Opcode::Pop);
                    self.emit(Opcode::LoadTrue);
                }
            },
            UnaryOperator::Void => {
                self.compile_expression(argument)?;
                self.emit(Opcode::Pop);
                self.emit(Opcode::LoadUndefined);
            }
            UnaryOperator::Minus => {
                self.compile_expression(argument)?;
                self.emit(Opcode::Neg);
            }
            UnaryOperator::Plus => {
                self.compile_expression(argument)?;
                self.emit(Opcode::Plus);
            }
            UnaryOperator::Not => {
                self.compile_expression(argument)?;
                self.emit(Opcode::Not);
            }
            UnaryOperator::BitwiseNot => {
                self.compile_expression(argument)?;
                self.emit(Opcode::BitNot);
            }
        }
        Ok(())
    }

    fn compile_update(
        &mut self,
        operator: UpdateOperator,
        prefix: bool,
        argument: &Expression,
    ) -> Result<(), JsError> {
        let step = match operator {
            UpdateOperator::Increment => Opcode::Inc,
            UpdateOperator::Decrement => Opcode::Dec,
        };
        match argument {
            Expression::Identifier { name, .. } => {
                self.load_name(name)?;
                if prefix {
                    self.emit(step);
                    self.emit(Opcode::Dup);
                } else {
                    self.emit(Opcode::ToNumeric);
                    self.emit(Opcode::Dup);
                    self.emit(step);
                }
                self.store_name(name, BindMode::Assign)
            }
            Expression::MemberExpression {
                object, property, ..
            } => {
                self.compile_member_object(object)?;
                let old = (!prefix).then(|| self.register());
                match property {
                    MemberProperty::Identifier(name) => {
                        self.emit(Opcode::Dup);
                        self.emit(Opcode::LoadProperty(name.as_str().into()));
                        self.emit_update_step(step, old);
                        self.emit(Opcode::StoreProperty(name.as_str().into()));
                    }
                    MemberProperty::Computed(key) => {
                        self.compile_expression(key)?;
                        self.emit(Opcode::ToPropertyKey);
                        self.emit(Opcode::Dup2);
                        self.emit(Opcode::GetIndex);
                        self.emit_update_step(step, old);
                        self.emit(Opcode::SetIndex);
                    }
                }
                if let Some(old) = old {
                    self.emit(Opcode::Pop);
                    self.emit(Opcode::LoadLocal(old));
                }
                Ok(())
            }
            _ => Err(self.syntax_error(
                argument.span(),
                "Invalid left-hand side expression in update operation",
            )),
        }
    }

    /// Turn the old value on top of the stack into the new one, saving the
    /// numeric old value in `old` for postfix updates
    fn emit_update_step(&mut self, step: Opcode, old: Option<bytecode_system::RegisterId>) {
        if let Some(old) = old {
            self.emit(Opcode::ToNumeric);
            self.emit(Opcode::Dup);
            self.emit(Opcode::StoreLocal(old));
        }
        self.emit(step);
    }

    fn compile_assignment(
        &mut self,
        target: &Pattern,
        operator: AssignmentOperator,
        value: &Expression,
    ) -> Result<(), JsError> {
        if let Some(logical) = operator.logical_operator() {
            return self.compile_logical_assignment(target, logical, value);
        }
        let binary = operator.binary_operator();

        match target {
            Pattern::Identifier { name, .. } => {
                match binary {
                    Some(op) => {
                        self.load_name(name)?;
                        self.compile_expression(value)?;
                        self.emit(binary_opcode(op));
                    }
                    None => self.compile_named_expression(value, name)?,
                }
                self.emit(Opcode::Dup);
                self.store_name(name, BindMode::Assign)
            }
            Pattern::MemberExpression(member) => {
                let Expression::MemberExpression {
                    object, property, ..
                } = member.as_ref()
                else {
                    return Err(self.syntax_error(member.span(), "Invalid assignment target"));
                };
                self.compile_member_object(object)?;
                match property {
                    MemberProperty::Identifier(name) => {
                        if let Some(op) = binary {
                            self.emit(Opcode::Dup);
                            self.emit(Opcode::LoadProperty(name.as_str().into()));
                            self.compile_expression(value)?;
                            self.emit(binary_opcode(op));
                        } else {
                            self.compile_expression(value)?;
                        }
                        self.emit(Opcode::StoreProperty(name.as_str().into()));
                    }
                    MemberProperty::Computed(key) => {
                        self.compile_expression(key)?;
                        if let Some(op) = binary {
                            self.emit(Opcode::ToPropertyKey);
                            self.emit(Opcode::Dup2);
                            self.emit(Opcode::GetIndex);
                            self.compile_expression(value)?;
                            self.emit(binary_opcode(op));
                        } else {
                            self.compile_expression(value)?;
                        }
                        self.emit(Opcode::SetIndex);
                    }
                }
                Ok(())
            }
            pattern => {
                self.compile_expression(value)?;
                self.emit(Opcode::Dup);
                self.bind_pattern(pattern, BindMode::Assign)
            }
        }
    }

    /// `a &&= b`, `a ||= b` and `a ??= b` only evaluate and store `b` when
    /// the short circuit does not apply
    fn compile_logical_assignment(
        &mut self,
        target: &Pattern,
        operator: LogicalOperator,
        value: &Expression,
    ) -> Result<(), JsError> {
        match target {
            Pattern::Identifier { name, .. } => {
                self.load_name(name)?;
                self.emit(Opcode::Dup);
                let short = self.emit(short_circuit_jump(operator));
                self.emit(Opcode::Pop);
                self.compile_named_expression(value, name)?;
                self.emit(Opcode::Dup);
                self.store_name(name, BindMode::Assign)?;
                self.patch(short);
                Ok(())
            }
            Pattern::MemberExpression(member) => {
                let Expression::MemberExpression {
                    object, property, ..
                } = member.as_ref()
                else {
                    return Err(self.syntax_error(member.span(), "Invalid assignment target"));
                };
                self.compile_member_object(object)?;
                // Values below the current one: the object, and the key
                let below = match property {
                    MemberProperty::Identifier(name) => {
                        self.emit(Opcode::Dup);
                        self.emit(Opcode::LoadProperty(name.as_str().into()));
                        1
                    }
                    MemberProperty::Computed(key) => {
                        self.compile_expression(key)?;
                        self.emit(Opcode::ToPropertyKey);
                        self.emit(Opcode::Dup2);
                        self.emit(Opcode::GetIndex);
                        2
                    }
                };
                self.emit(Opcode::Dup);
                let short = self.emit(short_circuit_jump(operator));
                self.emit(Opcode::Pop);
                self.compile_expression(value)?;
                match property {
                    MemberProperty::Identifier(name) => {
                        self.emit(Opcode::StoreProperty(name.as_str().into()));
                    }
                    MemberProperty::Computed(_) => {
                        self.emit(Opcode::SetIndex);
                    }
                }
                let done = self.emit(Opcode::Jump(0));
                self.patch(short);
                for _ in 0..below {
                    self.emit(Opcode::Swap);
                    self.emit(Opcode::Pop);
                }
                self.patch(done);
                Ok(())
            }
            _ => Err(self.syntax_error(target.span(), "Invalid left-hand side in assignment")),
        }
    }
}

/// Jump taken when a logical operator short-circuits on the value on top
/// of the stack
fn short_circuit_jump(operator: LogicalOperator) -> Opcode {
    match operator {
        LogicalOperator::And => Opcode::JumpIfFalse(0),
        LogicalOperator::Or => Opcode::JumpIfTrue(0),
        LogicalOperator::NullishCoalesce => Opcode::JumpIfNotNullish(0),
    }
}

fn binary_opcode(operator: BinaryOperator) -> Opcode {
    match operator {
        BinaryOperator::Add => Opcode::Add,
        BinaryOperator::Sub => Opcode::Sub,
        BinaryOperator::Mul => Opcode::Mul,
        BinaryOperator::Div => Opcode::Div,
        BinaryOperator::Mod => Opcode::Mod,
        BinaryOperator::Exp => Opcode::Exp,
        BinaryOperator::Eq => Opcode::Equal,
        BinaryOperator::NotEq => Opcode::NotEqual,
        BinaryOperator::StrictEq => Opcode::StrictEqual,
        BinaryOperator::StrictNotEq => Opcode::StrictNotEqual,
        BinaryOperator::Lt => Opcode::LessThan,
        BinaryOperator::LtEq => Opcode::LessThanEqual,
        BinaryOperator::Gt => Opcode::GreaterThan,
        BinaryOperator::GtEq => Opcode::GreaterThanEqual,
        BinaryOperator::BitwiseAnd => Opcode::BitAnd,
        BinaryOperator::BitwiseOr => Opcode::BitOr,
        BinaryOperator::BitwiseXor => Opcode::BitXor,
        BinaryOperator::LeftShift => Opcode::Shl,
        BinaryOperator::RightShift => Opcode::Shr,
        BinaryOperator::UnsignedRightShift => Opcode::UShr,
        BinaryOperator::Instanceof => Opcode::Instanceof,
        BinaryOperator::In => Opcode::In,
    }
}
