//! Binding and assignment patterns

use core_types::JsError;

use super::Parser;
use crate::ast::*;
use crate::lexer::{Punctuator, TokenKind};

/// Binding patterns only bind identifiers; assignment patterns may also
/// target member expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PatternMode {
    Binding,
    Assignment,
}

impl<'a> Parser<'a> {
    /// Parse the target of a declaration, parameter or catch clause
    pub(super) fn parse_binding_target(&mut self) -> Result<Pattern, JsError> {
        self.parse_target(PatternMode::Binding)
    }

    /// Parse a binding target with an optional `= default`
    pub(super) fn parse_binding_element(&mut self) -> Result<Pattern, JsError> {
        self.parse_element(PatternMode::Binding)
    }

    /// Parse `( params )`. A rest parameter must come last.
    pub(super) fn parse_formal_parameters(&mut self) -> Result<Vec<Pattern>, JsError> {
        self.expect(Punctuator::LParen)?;
        let mut params = Vec::new();
        while !self.at(Punctuator::RParen) {
            if self.at(Punctuator::Spread) {
                params.push(self.parse_rest_element(PatternMode::Binding)?);
                if !self.at(Punctuator::RParen) {
                    return Err(self.error_here("Rest parameter must be last formal parameter"));
                }
                break;
            }
            params.push(self.parse_binding_element()?);
            if !self.at(Punctuator::RParen) {
                self.expect(Punctuator::Comma)?;
            }
        }
        self.expect(Punctuator::RParen)?;
        Ok(params)
    }

    /// Parse an array or object destructuring assignment target
    pub(super) fn parse_assignment_pattern(&mut self) -> Result<Pattern, JsError> {
        match self.current.kind {
            TokenKind::Punctuator(Punctuator::LBracket) => {
                self.parse_array_pattern(PatternMode::Assignment)
            }
            TokenKind::Punctuator(Punctuator::LBrace) => {
                self.parse_object_pattern(PatternMode::Assignment)
            }
            _ => Err(self.unexpected()),
        }
    }

    fn parse_target(&mut self, mode: PatternMode) -> Result<Pattern, JsError> {
        match self.current.kind {
            TokenKind::Punctuator(Punctuator::LBracket) => {
                self.nested(|p| p.parse_array_pattern(mode))
            }
            TokenKind::Punctuator(Punctuator::LBrace) => {
                self.nested(|p| p.parse_object_pattern(mode))
            }
            _ if mode == PatternMode::Binding => {
                let start = self.start();
                let name = self.parse_binding_identifier()?;
                Ok(Pattern::Identifier {
                    name,
                    span: self.span_from(start),
                })
            }
            _ => {
                let expression = self.parse_left_hand_side_expression()?;
                self.expression_to_simple_target(expression)
            }
        }
    }

    fn parse_element(&mut self, mode: PatternMode) -> Result<Pattern, JsError> {
        let start = self.start();
        let target = self.parse_target(mode)?;
        if !self.eat(Punctuator::Assign)? {
            return Ok(target);
        }
        let default = self.allow_in(|p| p.parse_assignment_expression())?;
        Ok(Pattern::AssignmentPattern {
            left: Box::new(target),
            right: Box::new(default),
            span: self.span_from(start),
        })
    }

    fn parse_rest_element(&mut self, mode: PatternMode) -> Result<Pattern, JsError> {
        let start = self.start();
        self.expect(Punctuator::Spread)?;
        let argument = self.parse_target(mode)?;
        if self.at(Punctuator::Assign) {
            return Err(self.error_here("Rest element may not have a default initializer"));
        }
        Ok(Pattern::RestElement {
            argument: Box::new(argument),
            span: self.span_from(start),
        })
    }

    fn parse_array_pattern(&mut self, mode: PatternMode) -> Result<Pattern, JsError> {
        let start = self.start();
        self.expect(Punctuator::LBracket)?;
        let mut elements = Vec::new();
        let mut rest = None;
        while !self.at(Punctuator::RBracket) {
            if self.eat(Punctuator::Comma)? {
                elements.push(None);
                continue;
            }
            if self.at(Punctuator::Spread) {
                let Pattern::RestElement { argument, .. } = self.parse_rest_element(mode)? else {
                    return Err(self.unexpected());
                };
                rest = Some(argument);
                if !self.at(Punctuator::RBracket) {
                    return Err(self.error_here("Rest element must be last element"));
                }
                break;
            }
            elements.push(Some(self.parse_element(mode)?));
            if !self.at(Punctuator::RBracket) {
                self.expect(Punctuator::Comma)?;
            }
        }
        self.expect(Punctuator::RBracket)?;
        Ok(Pattern::ArrayPattern {
            elements,
            rest,
            span: self.span_from(start),
        })
    }

    fn parse_object_pattern(&mut self, mode: PatternMode) -> Result<Pattern, JsError> {
        let start = self.start();
        self.expect(Punctuator::LBrace)?;
        let mut properties = Vec::new();
        let mut rest = None;
        while !self.at(Punctuator::RBrace) {
            if self.eat(Punctuator::Spread)? {
                let target = match mode {
                    PatternMode::Binding => self.parse_target(mode)?,
                    PatternMode::Assignment => {
                        let expression = self.parse_left_hand_side_expression()?;
                        self.expression_to_simple_target(expression)?
                    }
                };
                if matches!(
                    target,
                    Pattern::ArrayPattern { .. } | Pattern::ObjectPattern { .. }
                ) {
                    return Err(self.error_at(
                        target.span().start,
                        "`...` must be followed by an assignable reference in assignment contexts",
                    ));
                }
                rest = Some(Box::new(target));
                if !self.at(Punctuator::RBrace) {
                    return Err(self.error_here("Rest element must be last element"));
                }
                break;
            }
            properties.push(self.parse_object_pattern_property(mode)?);
            if !self.at(Punctuator::RBrace) {
                self.expect(Punctuator::Comma)?;
            }
        }
        self.expect(Punctuator::RBrace)?;
        Ok(Pattern::ObjectPattern {
            properties,
            rest,
            span: self.span_from(start),
        })
    }

    fn parse_object_pattern_property(
        &mut self,
        mode: PatternMode,
    ) -> Result<ObjectPatternProperty, JsError> {
        let start = self.start();
        let key_token = self.current.clone();
        let key = self.parse_property_key()?;

        if self.eat(Punctuator::Colon)? {
            let value = self.parse_element(mode)?;
            return Ok(ObjectPatternProperty {
                key,
                value,
                shorthand: false,
            });
        }

        // `{ name }` and `{ name = default }`
        let name = match key_token.identifier() {
            Some(name) if key_token.kind == TokenKind::Identifier => name.to_string(),
            _ => return Err(self.expected("':'")),
        };
        match mode {
            PatternMode::Binding => self.validate_binding_name(&name)?,
            PatternMode::Assignment => {
                self.validate_reference_name(&name)?;
                if self.ctx.strict && (name == "eval" || name == "arguments") {
                    return Err(self.error_at(start, "Unexpected eval or arguments in strict mode"));
                }
            }
        }
        let target = Pattern::Identifier {
            name,
            span: key_token.span,
        };
        let value = if self.eat(Punctuator::Assign)? {
            let default = self.allow_in(|p| p.parse_assignment_expression())?;
            Pattern::AssignmentPattern {
                left: Box::new(target),
                right: Box::new(default),
                span: self.span_from(start),
            }
        } else {
            target
        };
        Ok(ObjectPatternProperty {
            key,
            value,
            shorthand: true,
        })
    }
}
