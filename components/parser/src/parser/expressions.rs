//! Expression parsing
//!
//! Binary operators use precedence climbing; everything from assignment
//! down to the left-hand side expression is one method per grammar level.

use core_types::JsError;

use super::Parser;
use crate::ast::*;
use crate::error::unsupported;
use crate::lexer::{Keyword, Punctuator, TemplatePart, TokenKind, TokenValue};

impl<'a> Parser<'a> {
    /// Parse a comma-separated expression
    pub(super) fn parse_expression(&mut self) -> Result<Expression, JsError> {
        let start = self.start();
        let first = self.parse_assignment_expression()?;
        if !self.at(Punctuator::Comma) {
            return Ok(first);
        }
        let mut expressions = vec![first];
        while self.eat(Punctuator::Comma)? {
            expressions.push(self.parse_assignment_expression()?);
        }
        Ok(Expression::SequenceExpression {
            expressions,
            span: self.span_from(start),
        })
    }

    /// Parse an assignment expression, including arrows, `yield` and
    /// destructuring assignment
    pub(super) fn parse_assignment_expression(&mut self) -> Result<Expression, JsError> {
        self.nested(Self::parse_assignment_level)
    }

    fn parse_assignment_level(&mut self) -> Result<Expression, JsError> {
        let start = self.start();
        if self.ctx.in_generator && self.current.is_contextual("yield") {
            return self.parse_yield_expression();
        }
        if let Some(arrow) = self.try_parse_arrow_function()? {
            return Ok(arrow);
        }
        if self.at(Punctuator::LBracket) || self.at(Punctuator::LBrace) {
            if let Some(assignment) = self.try_parse_destructuring_assignment()? {
                return Ok(assignment);
            }
        }

        let left = self.parse_conditional_expression()?;
        let Some(operator) = self.assignment_operator() else {
            return Ok(left);
        };
        let target = self.expression_to_simple_target(left)?;
        self.advance()?;
        let right = self.parse_assignment_expression()?;
        Ok(Expression::AssignmentExpression {
            left: Box::new(target),
            operator,
            right: Box::new(right),
            span: self.span_from(start),
        })
    }

    fn assignment_operator(&self) -> Option<AssignmentOperator> {
        let TokenKind::Punctuator(punctuator) = self.current.kind else {
            return None;
        };
        let operator = match punctuator {
            Punctuator::Assign => AssignmentOperator::Assign,
            Punctuator::PlusEq => AssignmentOperator::AddAssign,
            Punctuator::MinusEq => AssignmentOperator::SubAssign,
            Punctuator::StarEq => AssignmentOperator::MulAssign,
            Punctuator::SlashEq => AssignmentOperator::DivAssign,
            Punctuator::PercentEq => AssignmentOperator::ModAssign,
            Punctuator::StarStarEq => AssignmentOperator::ExpAssign,
            Punctuator::AndEq => AssignmentOperator::BitAndAssign,
            Punctuator::OrEq => AssignmentOperator::BitOrAssign,
            Punctuator::XorEq => AssignmentOperator::BitXorAssign,
            Punctuator::LtLtEq => AssignmentOperator::LeftShiftAssign,
            Punctuator::GtGtEq => AssignmentOperator::RightShiftAssign,
            Punctuator::GtGtGtEq => AssignmentOperator::UnsignedRightShiftAssign,
            Punctuator::AndAndEq => AssignmentOperator::LogicalAndAssign,
            Punctuator::OrOrEq => AssignmentOperator::LogicalOrAssign,
            Punctuator::NullishCoalesceEq => AssignmentOperator::NullishCoalesceAssign,
            _ => return None,
        };
        Some(operator)
    }

    /// `[a, b] = ...` or `({ a } = ...)`: try the pattern first, rewind to
    /// an array or object literal when no `=` follows
    fn try_parse_destructuring_assignment(&mut self) -> Result<Option<Expression>, JsError> {
        let start = self.start();
        let checkpoint = self.checkpoint();
        match self.parse_assignment_pattern() {
            Ok(pattern) if self.at(Punctuator::Assign) => {
                self.advance()?;
                let right = self.parse_assignment_expression()?;
                Ok(Some(Expression::AssignmentExpression {
                    left: Box::new(pattern),
                    operator: AssignmentOperator::Assign,
                    right: Box::new(right),
                    span: self.span_from(start),
                }))
            }
            _ => {
                self.rewind(checkpoint);
                Ok(None)
            }
        }
    }

    fn parse_yield_expression(&mut self) -> Result<Expression, JsError> {
        let start = self.start();
        self.advance()?;
        let delegate = !self.current.newline_before && self.eat(Punctuator::Star)?;
        let argument = if delegate || self.starts_yield_argument() {
            Some(Box::new(self.parse_assignment_expression()?))
        } else {
            None
        };
        Ok(Expression::YieldExpression {
            argument,
            delegate,
            span: self.span_from(start),
        })
    }

    fn starts_yield_argument(&self) -> bool {
        if self.current.newline_before || self.current.is_eof() {
            return false;
        }
        !matches!(
            self.current.kind,
            TokenKind::Punctuator(
                Punctuator::RParen
                    | Punctuator::RBracket
                    | Punctuator::RBrace
                    | Punctuator::Comma
                    | Punctuator::Semicolon
                    | Punctuator::Colon
                    | Punctuator::Question
            ) | TokenKind::Keyword(Keyword::In)
        )
    }

    fn parse_conditional_expression(&mut self) -> Result<Expression, JsError> {
        let start = self.start();
        let test = self.parse_short_circuit_expression()?;
        if !self.eat(Punctuator::Question)? {
            return Ok(test);
        }
        let consequent = self.allow_in(|p| p.parse_assignment_expression())?;
        self.expect(Punctuator::Colon)?;
        let alternate = self.parse_assignment_expression()?;
        Ok(Expression::ConditionalExpression {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
            span: self.span_from(start),
        })
    }

    /// `||` and `??` chains; the two may not be mixed without parentheses
    fn parse_short_circuit_expression(&mut self) -> Result<Expression, JsError> {
        let start = self.start();
        let mut left = self.parse_logical_and_expression()?;

        if self.at(Punctuator::NullishCoalesce) {
            if is_unparenthesized_logical(&left, start) {
                return Err(self.error_here("Cannot mix ?? with && or || without parentheses"));
            }
            while self.eat(Punctuator::NullishCoalesce)? {
                let right = self.parse_binary_expression(0)?;
                left = Expression::LogicalExpression {
                    left: Box::new(left),
                    operator: LogicalOperator::NullishCoalesce,
                    right: Box::new(right),
                    span: self.span_from(start),
                };
            }
            if self.at(Punctuator::OrOr) || self.at(Punctuator::AndAnd) {
                return Err(self.error_here("Cannot mix ?? with && or || without parentheses"));
            }
            return Ok(left);
        }

        while self.eat(Punctuator::OrOr)? {
            let right = self.parse_logical_and_expression()?;
            left = Expression::LogicalExpression {
                left: Box::new(left),
                operator: LogicalOperator::Or,
                right: Box::new(right),
                span: self.span_from(start),
            };
        }
        if self.at(Punctuator::NullishCoalesce) {
            return Err(self.error_here("Cannot mix ?? with && or || without parentheses"));
        }
        Ok(left)
    }

    fn parse_logical_and_expression(&mut self) -> Result<Expression, JsError> {
        let start = self.start();
        let mut left = self.parse_binary_expression(0)?;
        while self.eat(Punctuator::AndAnd)? {
            let right = self.parse_binary_expression(0)?;
            left = Expression::LogicalExpression {
                left: Box::new(left),
                operator: LogicalOperator::And,
                right: Box::new(right),
                span: self.span_from(start),
            };
        }
        Ok(left)
    }

    /// Binary operator at the current token with its precedence
    fn binary_operator(&self) -> Option<(BinaryOperator, u8)> {
        let operator = match self.current.kind {
            TokenKind::Punctuator(punctuator) => match punctuator {
                Punctuator::Or => (BinaryOperator::BitwiseOr, 1),
                Punctuator::Xor => (BinaryOperator::BitwiseXor, 2),
                Punctuator::And => (BinaryOperator::BitwiseAnd, 3),
                Punctuator::EqEq => (BinaryOperator::Eq, 4),
                Punctuator::NotEq => (BinaryOperator::NotEq, 4),
                Punctuator::EqEqEq => (BinaryOperator::StrictEq, 4),
                Punctuator::NotEqEq => (BinaryOperator::StrictNotEq, 4),
                Punctuator::Lt => (BinaryOperator::Lt, 5),
                Punctuator::LtEq => (BinaryOperator::LtEq, 5),
                Punctuator::Gt => (BinaryOperator::Gt, 5),
                Punctuator::GtEq => (BinaryOperator::GtEq, 5),
                Punctuator::LtLt => (BinaryOperator::LeftShift, 6),
                Punctuator::GtGt => (BinaryOperator::RightShift, 6),
                Punctuator::GtGtGt => (BinaryOperator::UnsignedRightShift, 6),
                Punctuator::Plus => (BinaryOperator::Add, 7),
                Punctuator::Minus => (BinaryOperator::Sub, 7),
                Punctuator::Star => (BinaryOperator::Mul, 8),
                Punctuator::Slash => (BinaryOperator::Div, 8),
                Punctuator::Percent => (BinaryOperator::Mod, 8),
                _ => return None,
            },
            TokenKind::Keyword(Keyword::Instanceof) => (BinaryOperator::Instanceof, 5),
            TokenKind::Keyword(Keyword::In) if !self.ctx.no_in => (BinaryOperator::In, 5),
            _ => return None,
        };
        Some(operator)
    }

    fn parse_binary_expression(&mut self, min_precedence: u8) -> Result<Expression, JsError> {
        let start = self.start();
        let mut left = self.parse_exponentiation_expression()?;
        while let Some((operator, precedence)) = self.binary_operator() {
            if precedence <= min_precedence {
                break;
            }
            self.advance()?;
            let right = self.parse_binary_expression(precedence)?;
            left = Expression::BinaryExpression {
                left: Box::new(left),
                operator,
                right: Box::new(right),
                span: self.span_from(start),
            };
        }
        Ok(left)
    }

    /// `**` is right-associative and may not follow a bare unary operator
    fn parse_exponentiation_expression(&mut self) -> Result<Expression, JsError> {
        let start = self.start();
        let unary = self.unary_operator().is_some() || self.at_await();
        let left = self.parse_unary_expression()?;
        if !self.at(Punctuator::StarStar) {
            return Ok(left);
        }
        if unary {
            return Err(self.error_here(
                "Unary operator used immediately before exponentiation expression. \
                 Parenthesis must be used to disambiguate operator precedence",
            ));
        }
        self.advance()?;
        let right = self.parse_exponentiation_expression()?;
        Ok(Expression::BinaryExpression {
            left: Box::new(left),
            operator: BinaryOperator::Exp,
            right: Box::new(right),
            span: self.span_from(start),
        })
    }

    fn unary_operator(&self) -> Option<UnaryOperator> {
        let operator = match self.current.kind {
            TokenKind::Punctuator(Punctuator::Minus) => UnaryOperator::Minus,
            TokenKind::Punctuator(Punctuator::Plus) => UnaryOperator::Plus,
            TokenKind::Punctuator(Punctuator::Bang) => UnaryOperator::Not,
            TokenKind::Punctuator(Punctuator::Tilde) => UnaryOperator::BitwiseNot,
            TokenKind::Keyword(Keyword::Typeof) => UnaryOperator::Typeof,
            TokenKind::Keyword(Keyword::Void) => UnaryOperator::Void,
            TokenKind::Keyword(Keyword::Delete) => UnaryOperator::Delete,
            _ => return None,
        };
        Some(operator)
    }

    fn at_await(&self) -> bool {
        self.ctx.in_async && self.current.is_contextual("await")
    }

    fn parse_unary_expression(&mut self) -> Result<Expression, JsError> {
        let start = self.start();
        if let Some(operator) = self.unary_operator() {
            self.advance()?;
            let argument = self.nested(Self::parse_unary_expression)?;
            if operator == UnaryOperator::Delete
                && self.ctx.strict
                && matches!(argument, Expression::Identifier { .. })
            {
                return Err(
                    self.error_at(start, "Delete of an unqualified identifier in strict mode.")
                );
            }
            return Ok(Expression::UnaryExpression {
                operator,
                argument: Box::new(argument),
                span: self.span_from(start),
            });
        }
        if self.at_await() {
            self.advance()?;
            let argument = self.parse_unary_expression()?;
            return Ok(Expression::AwaitExpression {
                argument: Box::new(argument),
                span: self.span_from(start),
            });
        }
        self.parse_update_expression()
    }

    fn parse_update_expression(&mut self) -> Result<Expression, JsError> {
        let start = self.start();
        let prefix = if self.at(Punctuator::PlusPlus) {
            Some(UpdateOperator::Increment)
        } else if self.at(Punctuator::MinusMinus) {
            Some(UpdateOperator::Decrement)
        } else {
            None
        };
        if let Some(operator) = prefix {
            self.advance()?;
            let argument = self.parse_unary_expression()?;
            self.check_update_target(&argument, "prefix")?;
            return Ok(Expression::UpdateExpression {
                operator,
                prefix: true,
                argument: Box::new(argument),
                span: self.span_from(start),
            });
        }

        let expression = self.parse_left_hand_side_expression()?;
        self.continue_postfix(start, expression)
    }

    fn continue_postfix(&mut self, start: usize, expression: Expression) -> Result<Expression, JsError> {
        if self.current.newline_before {
            return Ok(expression);
        }
        let operator = if self.at(Punctuator::PlusPlus) {
            UpdateOperator::Increment
        } else if self.at(Punctuator::MinusMinus) {
            UpdateOperator::Decrement
        } else {
            return Ok(expression);
        };
        self.check_update_target(&expression, "postfix")?;
        self.advance()?;
        Ok(Expression::UpdateExpression {
            operator,
            prefix: false,
            argument: Box::new(expression),
            span: self.span_from(start),
        })
    }

    fn check_update_target(&self, target: &Expression, kind: &str) -> Result<(), JsError> {
        match target {
            Expression::Identifier { name, span } => {
                if self.ctx.strict && (name == "eval" || name == "arguments") {
                    return Err(self.error_at(span.start, "Unexpected eval or arguments in strict mode"));
                }
                Ok(())
            }
            Expression::MemberExpression { .. } => Ok(()),
            _ => Err(self.error_at(
                target.span().start,
                format!("Invalid left-hand side expression in {} operation", kind),
            )),
        }
    }

    /// Member accesses, calls, `new` and tagged templates
    pub(super) fn parse_left_hand_side_expression(&mut self) -> Result<Expression, JsError> {
        let start = self.start();
        let expression = match self.current.kind {
            TokenKind::Keyword(Keyword::New) => self.parse_new_expression()?,
            TokenKind::Keyword(Keyword::Super) => self.parse_super_expression()?,
            TokenKind::Keyword(Keyword::Import) => {
                return Err(unsupported(
                    "dynamic import and import.meta",
                    Some(self.current.position()),
                ))
            }
            _ => self.parse_primary_expression()?,
        };
        self.parse_call_tail(start, expression, true)
    }

    /// Member, call and tagged-template suffixes. With `allow_call` unset
    /// (the callee of `new`) calls and optional chains end the tail.
    fn parse_call_tail(
        &mut self,
        start: usize,
        mut expression: Expression,
        allow_call: bool,
    ) -> Result<Expression, JsError> {
        let mut in_chain = false;
        loop {
            match self.current.kind {
                TokenKind::Punctuator(Punctuator::Dot) => {
                    self.advance()?;
                    let name = self.parse_property_name()?;
                    expression = Expression::MemberExpression {
                        object: Box::new(expression),
                        property: MemberProperty::Identifier(name),
                        optional: false,
                        span: self.span_from(start),
                    };
                }
                TokenKind::Punctuator(Punctuator::LBracket) => {
                    self.advance()?;
                    let property = self.allow_in(|p| p.parse_expression())?;
                    self.expect(Punctuator::RBracket)?;
                    expression = Expression::MemberExpression {
                        object: Box::new(expression),
                        property: MemberProperty::Computed(Box::new(property)),
                        optional: false,
                        span: self.span_from(start),
                    };
                }
                TokenKind::Punctuator(Punctuator::LParen) if allow_call => {
                    let arguments = self.parse_arguments()?;
                    expression = Expression::CallExpression {
                        callee: Box::new(expression),
                        arguments,
                        optional: false,
                        span: self.span_from(start),
                    };
                }
                TokenKind::Punctuator(Punctuator::OptionalChain) if allow_call => {
                    self.advance()?;
                    in_chain = true;
                    expression = match self.current.kind {
                        TokenKind::Punctuator(Punctuator::LParen) => {
                            let arguments = self.parse_arguments()?;
                            Expression::CallExpression {
                                callee: Box::new(expression),
                                arguments,
                                optional: true,
                                span: self.span_from(start),
                            }
                        }
                        TokenKind::Punctuator(Punctuator::LBracket) => {
                            self.advance()?;
                            let property = self.allow_in(|p| p.parse_expression())?;
                            self.expect(Punctuator::RBracket)?;
                            Expression::MemberExpression {
                                object: Box::new(expression),
                                property: MemberProperty::Computed(Box::new(property)),
                                optional: true,
                                span: self.span_from(start),
                            }
                        }
                        TokenKind::Template(_) => {
                            return Err(self.error_here("Invalid tagged template on optional chain"))
                        }
                        _ => {
                            let name = self.parse_property_name()?;
                            Expression::MemberExpression {
                                object: Box::new(expression),
                                property: MemberProperty::Identifier(name),
                                optional: true,
                                span: self.span_from(start),
                            }
                        }
                    };
                }
                TokenKind::Template(TemplatePart::NoSubstitution | TemplatePart::Head) => {
                    if in_chain {
                        return Err(self.error_here("Invalid tagged template on optional chain"));
                    }
                    let (quasis, expressions) = self.parse_template_parts(true)?;
                    expression = Expression::TaggedTemplate {
                        tag: Box::new(expression),
                        quasis,
                        expressions,
                        span: self.span_from(start),
                    };
                }
                _ => break,
            }
        }
        if in_chain {
            expression = Expression::OptionalChain {
                expression: Box::new(expression),
                span: self.span_from(start),
            };
        }
        Ok(expression)
    }

    fn parse_new_expression(&mut self) -> Result<Expression, JsError> {
        let start = self.start();
        self.advance()?;
        if self.eat(Punctuator::Dot)? {
            if !self.current.is_contextual("target") {
                return Err(self.expected("'target'"));
            }
            if !self.ctx.allow_new_target {
                return Err(self.error_at(start, "new.target expression is not allowed here"));
            }
            self.advance()?;
            return Ok(Expression::NewTarget {
                span: self.span_from(start),
            });
        }

        let callee_start = self.start();
        let callee = match self.current.kind {
            TokenKind::Keyword(Keyword::New) => self.parse_new_expression()?,
            TokenKind::Keyword(Keyword::Super) => {
                return Err(self.error_here("'super' keyword unexpected here"))
            }
            TokenKind::Keyword(Keyword::Import) => {
                return Err(self.error_here("Cannot use new with import"))
            }
            _ => self.parse_primary_expression()?,
        };
        let callee = self.parse_call_tail(callee_start, callee, false)?;
        let arguments = if self.at(Punctuator::LParen) {
            self.parse_arguments()?
        } else {
            Vec::new()
        };
        Ok(Expression::NewExpression {
            callee: Box::new(callee),
            arguments,
            span: self.span_from(start),
        })
    }

    fn parse_super_expression(&mut self) -> Result<Expression, JsError> {
        let start = self.start();
        self.advance()?;
        let allowed = if self.at(Punctuator::LParen) {
            self.ctx.allow_super_call
        } else if self.at(Punctuator::Dot) || self.at(Punctuator::LBracket) {
            self.ctx.allow_super_property
        } else {
            false
        };
        if !allowed {
            return Err(self.error_at(start, "'super' keyword unexpected here"));
        }
        Ok(Expression::SuperExpression {
            span: self.span_from(start),
        })
    }

    /// Parse `( args )`, including spread arguments
    pub(super) fn parse_arguments(&mut self) -> Result<Vec<Expression>, JsError> {
        self.expect(Punctuator::LParen)?;
        let arguments = self.allow_in(|p| {
            let mut arguments = Vec::new();
            while !p.at(Punctuator::RParen) {
                arguments.push(p.parse_spread_or_assignment()?);
                if !p.at(Punctuator::RParen) {
                    p.expect(Punctuator::Comma)?;
                }
            }
            Ok(arguments)
        })?;
        self.expect(Punctuator::RParen)?;
        Ok(arguments)
    }

    fn parse_spread_or_assignment(&mut self) -> Result<Expression, JsError> {
        if !self.at(Punctuator::Spread) {
            return self.parse_assignment_expression();
        }
        let start = self.start();
        self.advance()?;
        let argument = self.parse_assignment_expression()?;
        Ok(Expression::SpreadElement {
            argument: Box::new(argument),
            span: self.span_from(start),
        })
    }

    fn parse_primary_expression(&mut self) -> Result<Expression, JsError> {
        let start = self.start();
        let literal = match self.current.kind {
            TokenKind::Keyword(Keyword::This) => {
                self.advance()?;
                return Ok(Expression::ThisExpression {
                    span: self.span_from(start),
                });
            }
            TokenKind::Keyword(Keyword::Null) => Literal::Null,
            TokenKind::Keyword(Keyword::True) => Literal::Boolean(true),
            TokenKind::Keyword(Keyword::False) => Literal::Boolean(false),
            TokenKind::Number => match self.current.value {
                TokenValue::Number(value) => Literal::Number(value),
                _ => Literal::Number(f64::NAN),
            },
            TokenKind::String => Literal::String(self.string_value()),
            TokenKind::Template(TemplatePart::NoSubstitution | TemplatePart::Head) => {
                let (quasis, expressions) = self.parse_template_parts(false)?;
                return Ok(Expression::TemplateLiteral {
                    quasis,
                    expressions,
                    span: self.span_from(start),
                });
            }
            TokenKind::Punctuator(Punctuator::Slash | Punctuator::SlashEq) => {
                return self.parse_regexp_literal();
            }
            TokenKind::Punctuator(Punctuator::LParen) => {
                return self.parse_parenthesized_expression();
            }
            TokenKind::Punctuator(Punctuator::LBracket) => return self.parse_array_literal(),
            TokenKind::Punctuator(Punctuator::LBrace) => return self.parse_object_literal(),
            TokenKind::Keyword(Keyword::Function) => {
                let function = self.parse_function(start, false, false)?;
                return Ok(Expression::FunctionExpression {
                    function: Box::new(function),
                    span: self.span_from(start),
                });
            }
            TokenKind::Keyword(Keyword::Class) => {
                let class = self.parse_class(start, false)?;
                return Ok(Expression::ClassExpression {
                    class: Box::new(class),
                    span: self.span_from(start),
                });
            }
            TokenKind::Identifier => {
                if self.is_async_function()? {
                    let function = self.parse_function(start, true, false)?;
                    return Ok(Expression::FunctionExpression {
                        function: Box::new(function),
                        span: self.span_from(start),
                    });
                }
                let name = self.current.identifier().unwrap_or_default().to_string();
                self.validate_reference_name(&name)?;
                self.advance()?;
                return Ok(Expression::Identifier {
                    name,
                    span: self.span_from(start),
                });
            }
            TokenKind::PrivateIdentifier => {
                return Err(unsupported(
                    "private class members",
                    Some(self.current.position()),
                ))
            }
            _ => return Err(self.unexpected()),
        };
        self.advance()?;
        Ok(Expression::Literal {
            value: literal,
            span: self.span_from(start),
        })
    }

    fn parse_parenthesized_expression(&mut self) -> Result<Expression, JsError> {
        self.expect(Punctuator::LParen)?;
        let expression = self.allow_in(|p| p.parse_expression())?;
        self.expect(Punctuator::RParen)?;
        Ok(expression)
    }

    fn parse_regexp_literal(&mut self) -> Result<Expression, JsError> {
        let start = self.start();
        let (token, next) = self
            .lexer
            .regexp_at(self.current.start(), self.current.newline_before)?;
        self.current = token;
        self.next_pos = next;
        let TokenValue::RegExp { pattern, flags } = self.current.value.clone() else {
            return Err(self.unexpected());
        };
        let mut seen = String::new();
        for flag in flags.chars() {
            if !"dgimsuy".contains(flag) || seen.contains(flag) {
                return Err(self.error_here(format!(
                    "Invalid regular expression flags '{}'",
                    flags
                )));
            }
            seen.push(flag);
        }
        self.advance()?;
        Ok(Expression::RegExpLiteral {
            pattern,
            flags,
            span: self.span_from(start),
        })
    }

    /// Parse the pieces of a template literal starting at its first token
    pub(super) fn parse_template_parts(
        &mut self,
        tagged: bool,
    ) -> Result<(Vec<TemplateElement>, Vec<Expression>), JsError> {
        let mut quasis = Vec::new();
        let mut expressions = Vec::new();
        loop {
            let TokenValue::Template { cooked, raw } = self.current.value.clone() else {
                return Err(self.unexpected());
            };
            if !tagged && cooked.is_none() {
                return Err(self.error_here("Invalid escape sequence in template"));
            }
            quasis.push(TemplateElement {
                raw,
                cooked,
                span: self.current.span,
            });
            match self.current.kind {
                TokenKind::Template(TemplatePart::NoSubstitution | TemplatePart::Tail) => {
                    self.advance()?;
                    return Ok((quasis, expressions));
                }
                TokenKind::Template(TemplatePart::Head | TemplatePart::Middle) => {
                    self.advance()?;
                    expressions.push(self.allow_in(|p| p.parse_expression())?);
                    if !self.at(Punctuator::RBrace) {
                        return Err(self.expected("'}'"));
                    }
                    let (token, next) = self.lexer.template_continuation_at(self.current.start())?;
                    self.current = token;
                    self.next_pos = next;
                }
                _ => return Err(self.unexpected()),
            }
        }
    }

    fn parse_array_literal(&mut self) -> Result<Expression, JsError> {
        let start = self.start();
        self.expect(Punctuator::LBracket)?;
        let elements = self.allow_in(|p| {
            let mut elements = Vec::new();
            while !p.at(Punctuator::RBracket) {
                if p.eat(Punctuator::Comma)? {
                    elements.push(None);
                    continue;
                }
                elements.push(Some(p.parse_spread_or_assignment()?));
                if !p.at(Punctuator::RBracket) {
                    p.expect(Punctuator::Comma)?;
                }
            }
            Ok(elements)
        })?;
        self.expect(Punctuator::RBracket)?;
        Ok(Expression::ArrayExpression {
            elements,
            span: self.span_from(start),
        })
    }

    fn parse_object_literal(&mut self) -> Result<Expression, JsError> {
        let start = self.start();
        self.expect(Punctuator::LBrace)?;
        let properties = self.allow_in(|p| {
            let mut properties = Vec::new();
            while !p.at(Punctuator::RBrace) {
                properties.push(p.parse_object_property()?);
                if !p.at(Punctuator::RBrace) {
                    p.expect(Punctuator::Comma)?;
                }
            }
            Ok(properties)
        })?;
        self.expect(Punctuator::RBrace)?;
        Ok(Expression::ObjectExpression {
            properties,
            span: self.span_from(start),
        })
    }

    fn parse_object_property(&mut self) -> Result<ObjectProperty, JsError> {
        let start = self.start();
        if self.eat(Punctuator::Spread)? {
            return Ok(ObjectProperty::SpreadElement(
                self.parse_assignment_expression()?,
            ));
        }

        let modifiers = self.parse_method_modifiers()?;
        let key_token = self.current.clone();
        let key = self.parse_property_key()?;

        if modifiers.is_method() || self.at(Punctuator::LParen) {
            let function = self.parse_method(start, &key, modifiers)?;
            return Ok(ObjectProperty::Method {
                key,
                kind: modifiers.kind,
                function: Box::new(function),
                span: self.span_from(start),
            });
        }

        if self.eat(Punctuator::Colon)? {
            let value = self.parse_assignment_expression()?;
            return Ok(ObjectProperty::Property {
                key,
                value,
                shorthand: false,
                span: self.span_from(start),
            });
        }

        match key_token.identifier() {
            Some(name) if key_token.kind == TokenKind::Identifier => {
                if self.at(Punctuator::Assign) {
                    return Err(self.error_here("Invalid shorthand property initializer"));
                }
                let name = name.to_string();
                self.validate_reference_name(&name)?;
                Ok(ObjectProperty::Property {
                    key,
                    value: Expression::Identifier {
                        name,
                        span: key_token.span,
                    },
                    shorthand: true,
                    span: self.span_from(start),
                })
            }
            _ => Err(self.unexpected()),
        }
    }

    /// Parse a property key: identifier name, string, number or `[expr]`
    pub(super) fn parse_property_key(&mut self) -> Result<PropertyKey, JsError> {
        let key = match self.current.kind {
            TokenKind::String => PropertyKey::String(self.string_value()),
            TokenKind::Number => match self.current.value {
                TokenValue::Number(value) => PropertyKey::Number(value),
                _ => PropertyKey::Number(f64::NAN),
            },
            TokenKind::Punctuator(Punctuator::LBracket) => {
                self.advance()?;
                let expression = self.allow_in(|p| p.parse_assignment_expression())?;
                self.expect(Punctuator::RBracket)?;
                return Ok(PropertyKey::Computed(Box::new(expression)));
            }
            _ => return self.parse_property_name().map(PropertyKey::Identifier),
        };
        self.advance()?;
        Ok(key)
    }

    /// Convert an already parsed expression into a simple assignment
    /// target (identifier or non-optional member access)
    pub(super) fn expression_to_simple_target(
        &self,
        expression: Expression,
    ) -> Result<Pattern, JsError> {
        match expression {
            Expression::Identifier { name, span } => {
                if self.ctx.strict && (name == "eval" || name == "arguments") {
                    return Err(self.error_at(span.start, "Unexpected eval or arguments in strict mode"));
                }
                Ok(Pattern::Identifier { name, span })
            }
            Expression::MemberExpression {
                optional: false, ..
            } => Ok(Pattern::MemberExpression(Box::new(expression))),
            other => Err(self.error_at(other.span().start, "Invalid left-hand side in assignment")),
        }
    }
}

/// A logical `&&`/`||` expression that starts where its enclosing operand
/// starts was not wrapped in parentheses
fn is_unparenthesized_logical(expression: &Expression, start: usize) -> bool {
    matches!(
        expression,
        Expression::LogicalExpression {
            operator: LogicalOperator::And | LogicalOperator::Or,
            span,
            ..
        } if span.start == start
    )
}

#[cfg(test)]
mod tests {
    use crate::ast::*;
    use crate::parser::{parse, ParseOptions};

    fn expr(source: &str) -> Expression {
        let program = parse(source, &ParseOptions::default())
            .unwrap_or_else(|e| panic!("failed to parse {:?}: {}", source, e))
            .program;
        match program.body.into_iter().next() {
            Some(Statement::ExpressionStatement { expression, .. }) => expression,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    fn fails(source: &str) -> bool {
        parse(source, &ParseOptions::default()).is_err()
    }

    fn ok(source: &str) {
        if let Err(e) = parse(source, &ParseOptions::default()) {
            panic!("failed to parse {:?}: {}", source, e);
        }
    }

    #[test]
    fn test_parse_binary_expression_precedence() {
        let Expression::BinaryExpression { operator, right, .. } = expr("1 + 2 * 3") else {
            panic!("expected binary");
        };
        assert_eq!(operator, BinaryOperator::Add);
        assert!(matches!(
            *right,
            Expression::BinaryExpression {
                operator: BinaryOperator::Mul,
                ..
            }
        ));
    }

    #[test]
    fn test_subtraction_is_left_associative() {
        let Expression::BinaryExpression { left, .. } = expr("a - b - c") else {
            panic!("expected binary");
        };
        assert!(matches!(
            *left,
            Expression::BinaryExpression {
                operator: BinaryOperator::Sub,
                ..
            }
        ));
    }

    #[test]
    fn test_exponent_is_right_associative() {
        let Expression::BinaryExpression { right, .. } = expr("2 ** 3 ** 2") else {
            panic!("expected binary");
        };
        assert!(matches!(
            *right,
            Expression::BinaryExpression {
                operator: BinaryOperator::Exp,
                ..
            }
        ));
        assert!(fails("-2 ** 2"));
        expr("(-2) ** 2");
    }

    #[test]
    fn test_parse_arrow_function() {
        assert!(matches!(
            expr("(a, b = 1, ...rest) => a + b"),
            Expression::ArrowFunctionExpression { .. }
        ));
        assert!(matches!(
            expr("x => { return x; }"),
            Expression::ArrowFunctionExpression { .. }
        ));
        assert!(matches!(
            expr("({ a, b: [c] }) => a"),
            Expression::ArrowFunctionExpression { .. }
        ));
        assert!(matches!(expr("(a, b)"), Expression::SequenceExpression { .. }));
    }

    #[test]
    fn test_destructuring_assignment() {
        let Expression::AssignmentExpression { left, .. } = expr("[a, b.c, ...d] = list") else {
            panic!("expected assignment");
        };
        assert!(matches!(*left, Pattern::ArrayPattern { .. }));
        let Expression::AssignmentExpression { left, .. } = expr("({ a, b: { c = 1 } } = obj)")
        else {
            panic!("expected assignment");
        };
        assert!(matches!(*left, Pattern::ObjectPattern { .. }));
        assert!(matches!(expr("[a, b].map(f)"), Expression::CallExpression { .. }));
    }

    #[test]
    fn test_invalid_assignment_targets() {
        assert!(fails("a + b = c"));
        assert!(fails("a?.b = c"));
        assert!(fails("f() = 1"));
        assert!(fails("++f()"));
        assert!(fails("({ a = 1 })"));
    }

    #[test]
    fn test_optional_chain() {
        let Expression::OptionalChain { expression, .. } = expr("a?.b.c(1)?.[d]") else {
            panic!("expected optional chain");
        };
        assert!(matches!(
            *expression,
            Expression::MemberExpression { optional: true, .. }
        ));
        assert!(fails("a?.`x`"));
    }

    #[test]
    fn test_nullish_mixing_requires_parentheses() {
        assert!(fails("a || b ?? c"));
        assert!(fails("a ?? b && c"));
        expr("(a || b) ?? c");
        expr("a ?? (b && c)");
    }

    #[test]
    fn test_template_literals() {
        let Expression::TemplateLiteral {
            quasis,
            expressions,
            ..
        } = expr("`a${1}b${`inner${2}`}c`")
        else {
            panic!("expected template");
        };
        assert_eq!(quasis.len(), 3);
        assert_eq!(expressions.len(), 2);
        assert_eq!(quasis[2].cooked.as_deref(), Some("c"));
        assert!(matches!(expr("tag`x\\u{`"), Expression::TaggedTemplate { .. }));
        assert!(fails("`x\\u{`"));
    }

    #[test]
    fn test_regexp_literal_after_operator() {
        let Expression::BinaryExpression { left, right, .. } = expr("a / 2 + /re+/gi.source.length")
        else {
            panic!("expected binary");
        };
        assert!(matches!(
            *left,
            Expression::BinaryExpression {
                operator: BinaryOperator::Div,
                ..
            }
        ));
        assert!(matches!(*right, Expression::MemberExpression { .. }));
        assert!(matches!(expr("/=/"), Expression::RegExpLiteral { .. }));
        assert!(fails("/a/gg"));
    }

    #[test]
    fn test_new_expressions() {
        assert!(matches!(expr("new Foo"), Expression::NewExpression { .. }));
        let Expression::CallExpression { callee, .. } = expr("new a.b.C(1)(2)") else {
            panic!("expected call of new");
        };
        assert!(matches!(*callee, Expression::NewExpression { .. }));
        assert!(fails("new.target"));
        ok("function f() { return new.target; }");
    }

    #[test]
    fn test_object_literal_forms() {
        let Expression::ObjectExpression { properties, .. } =
            expr("({ a, 'b': 1, 2: 3, [k]: 4, m() {}, get g() { return 1; }, set s(v) {}, *gen() {}, ...rest })")
        else {
            panic!("expected object");
        };
        assert_eq!(properties.len(), 9);
        assert!(matches!(
            properties[5],
            ObjectProperty::Method {
                kind: MethodKind::Get,
                ..
            }
        ));
        assert!(matches!(properties[8], ObjectProperty::SpreadElement(_)));
    }

    #[test]
    fn test_super_outside_method_fails() {
        assert!(fails("super.x"));
        assert!(fails("function f() { super(); }"));
        ok("class A extends B { constructor() { super(); } }");
        expr("({ m() { return super.m(); } })");
    }

    #[test]
    fn test_yield_only_in_generators() {
        ok("function* g() { yield; yield 1; yield* other(); }");
        assert!(fails("function* g() { var yield; }"));
        ok("var yield = 1");
    }
}
