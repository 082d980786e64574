//! Functions, arrow functions, methods and classes

use core_types::{JsError, Span};

use super::{Context, Parser};
use crate::ast::*;
use crate::error::unsupported;
use crate::hoisting;
use crate::lexer::{Keyword, Punctuator, Token, TokenKind};

/// Prefix modifiers of an object or class method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct MethodModifiers {
    pub(super) is_async: bool,
    pub(super) is_generator: bool,
    pub(super) kind: MethodKind,
}

impl MethodModifiers {
    /// Whether the modifiers alone make the property a method
    pub(super) fn is_method(&self) -> bool {
        self.is_async || self.is_generator || self.kind != MethodKind::Method
    }
}

impl<'a> Parser<'a> {
    /// Parse `function name(...) {...}` (or its async form) as a statement
    pub(super) fn parse_function_declaration(
        &mut self,
        is_async: bool,
    ) -> Result<Statement, JsError> {
        let start = self.start();
        let function = self.parse_function(start, is_async, true)?;
        Ok(Statement::FunctionDeclaration {
            function: Box::new(function),
            span: self.span_from(start),
        })
    }

    /// Parse a `function` declaration or expression starting at `async` or
    /// `function`
    pub(super) fn parse_function(
        &mut self,
        start: usize,
        is_async: bool,
        name_required: bool,
    ) -> Result<Function, JsError> {
        if is_async {
            self.advance()?;
        }
        self.expect_keyword(Keyword::Function)?;
        let is_generator = self.eat(Punctuator::Star)?;

        let name = if self.current.kind == TokenKind::Identifier {
            // The name of a generator or async function expression is bound
            // inside it, where `yield`/`await` are reserved.
            let outer = self.ctx;
            if !name_required {
                self.ctx.in_generator = is_generator;
                self.ctx.in_async = is_async;
            }
            let name = self.parse_binding_identifier();
            self.ctx = outer;
            Some(name?)
        } else if name_required {
            return Err(self.expected("function name"));
        } else {
            None
        };

        self.parse_function_rest(start, name, FunctionKind::Normal, is_generator, is_async)
    }

    /// Parse parameters and body of any non-arrow function
    fn parse_function_rest(
        &mut self,
        start: usize,
        name: Option<String>,
        kind: FunctionKind,
        is_generator: bool,
        is_async: bool,
    ) -> Result<Function, JsError> {
        let outer = self.ctx;
        let labels = std::mem::take(&mut self.labels);
        let pending = std::mem::take(&mut self.pending_labels);
        self.ctx = Context {
            strict: outer.strict,
            in_function: true,
            in_generator: is_generator,
            in_async: is_async,
            allow_super_property: matches!(
                kind,
                FunctionKind::Method | FunctionKind::ClassConstructor { .. }
            ),
            allow_super_call: matches!(kind, FunctionKind::ClassConstructor { derived: true }),
            allow_new_target: true,
            ..Context::default()
        };

        let result = self.parse_params_and_body();
        self.ctx = outer;
        self.labels = labels;
        self.pending_labels = pending;
        let (params, body, strict) = result?;

        let function = Function {
            name,
            params,
            body: FunctionBody::Block(body),
            kind,
            is_generator,
            is_async,
            strict,
            hoisting: HoistingSet::default(),
            span: self.span_from(start),
        };
        self.finish_function(function, outer.strict)
    }

    fn parse_params_and_body(&mut self) -> Result<(Vec<Pattern>, Vec<Statement>, bool), JsError> {
        let params = self.parse_formal_parameters()?;
        let (body, strict) = self.parse_function_body()?;
        Ok((params, body, strict))
    }

    /// Parse `{ body }` under the current function context; returns the
    /// statements and whether the body is strict mode code
    fn parse_function_body(&mut self) -> Result<(Vec<Statement>, bool), JsError> {
        self.expect(Punctuator::LBrace)?;
        let body = self.parse_body(false)?;
        self.expect(Punctuator::RBrace)?;
        Ok((body, self.ctx.strict))
    }

    /// Validate parameters against the finished body and compute the
    /// function's hoisting set
    fn finish_function(&self, mut function: Function, outer_strict: bool) -> Result<Function, JsError> {
        let simple = function.has_simple_params();
        if function.strict && !outer_strict && !simple {
            return Err(self.error_at(
                function.span.start,
                "Illegal 'use strict' directive in function with non-simple parameter list",
            ));
        }

        let mut names = Vec::new();
        for param in &function.params {
            param.bound_names(&mut names);
        }
        let unique_required = function.strict
            || !simple
            || !matches!(function.kind, FunctionKind::Normal);
        for (i, name) in names.iter().enumerate() {
            if function.strict && (name == "eval" || name == "arguments") {
                return Err(self.error_at(
                    function.span.start,
                    "Unexpected eval or arguments in strict mode",
                ));
            }
            if unique_required && names[..i].contains(name) {
                return Err(self.error_at(
                    function.span.start,
                    "Duplicate parameter name not allowed in this context",
                ));
            }
        }
        if function.strict {
            if let Some(name) = function.name.as_deref() {
                if !outer_strict && (name == "eval" || name == "arguments") {
                    return Err(self.error_at(
                        function.span.start,
                        "Unexpected eval or arguments in strict mode",
                    ));
                }
            }
        }

        if let FunctionBody::Block(body) = &function.body {
            function.hoisting = hoisting::function_scope(body);
        }
        self.check_scope(&function.hoisting, function.span.start)?;
        if let Some(binding) = function
            .hoisting
            .lexical
            .iter()
            .find(|b| names.contains(&b.name))
        {
            return Err(self.error_at(
                function.span.start,
                format!("Identifier '{}' has already been declared", binding.name),
            ));
        }
        Ok(function)
    }

    // ---------------------------------------------------------------------
    // Arrow functions
    // ---------------------------------------------------------------------

    /// Parse an arrow function if one starts here. Parenthesized
    /// parameters are parsed speculatively and rewound when no `=>`
    /// follows.
    pub(super) fn try_parse_arrow_function(&mut self) -> Result<Option<Expression>, JsError> {
        let start = self.start();
        match self.current.kind {
            TokenKind::Identifier => {
                let next = self.peek()?;
                if self.current.is_contextual("async") && !next.newline_before {
                    if next.kind == TokenKind::Identifier {
                        return self.try_parse_async_identifier_arrow(start);
                    }
                    if next.is_punctuator(Punctuator::LParen) {
                        let checkpoint = self.checkpoint();
                        self.advance()?;
                        return self.try_parse_parenthesized_arrow(start, true, checkpoint);
                    }
                }
                if !is_arrow(&next) {
                    return Ok(None);
                }
                let param = self.parse_arrow_identifier(false)?;
                self.parse_arrow_function_rest(start, vec![param], false)
                    .map(Some)
            }
            TokenKind::Punctuator(Punctuator::LParen) => {
                let checkpoint = self.checkpoint();
                self.try_parse_parenthesized_arrow(start, false, checkpoint)
            }
            _ => Ok(None),
        }
    }

    fn try_parse_async_identifier_arrow(&mut self, start: usize) -> Result<Option<Expression>, JsError> {
        let checkpoint = self.checkpoint();
        self.advance()?;
        if !is_arrow(&self.peek()?) {
            self.rewind(checkpoint);
            return Ok(None);
        }
        let param = self.parse_arrow_identifier(true)?;
        self.parse_arrow_function_rest(start, vec![param], true)
            .map(Some)
    }

    fn try_parse_parenthesized_arrow(
        &mut self,
        start: usize,
        is_async: bool,
        checkpoint: super::Checkpoint<'a>,
    ) -> Result<Option<Expression>, JsError> {
        let outer = self.ctx;
        if is_async {
            self.ctx.in_async = true;
        }
        let params = self.allow_in(|p| p.parse_formal_parameters());
        self.ctx = outer;
        match params {
            Ok(params) if is_arrow(&self.current) => self
                .parse_arrow_function_rest(start, params, is_async)
                .map(Some),
            _ => {
                self.rewind(checkpoint);
                Ok(None)
            }
        }
    }

    fn parse_arrow_identifier(&mut self, is_async: bool) -> Result<Pattern, JsError> {
        let start = self.start();
        let outer = self.ctx;
        if is_async {
            self.ctx.in_async = true;
        }
        let name = self.parse_binding_identifier();
        self.ctx = outer;
        Ok(Pattern::Identifier {
            name: name?,
            span: self.span_from(start),
        })
    }

    /// Parse `=> body` after the parameters
    fn parse_arrow_function_rest(
        &mut self,
        start: usize,
        params: Vec<Pattern>,
        is_async: bool,
    ) -> Result<Expression, JsError> {
        self.expect(Punctuator::Arrow)?;
        let outer = self.ctx;
        let labels = std::mem::take(&mut self.labels);
        let pending = std::mem::take(&mut self.pending_labels);
        self.ctx = Context {
            in_function: true,
            in_generator: false,
            in_async: is_async,
            at_top_level: false,
            loop_depth: 0,
            breakable_depth: 0,
            ..outer
        };

        let body = if self.at(Punctuator::LBrace) {
            self.ctx.no_in = false;
            self.parse_function_body()
                .map(|(body, strict)| (FunctionBody::Block(body), strict))
        } else {
            self.parse_assignment_expression()
                .map(|expression| (FunctionBody::Expression(Box::new(expression)), outer.strict))
        };
        self.ctx = outer;
        self.labels = labels;
        self.pending_labels = pending;
        let (body, strict) = body?;

        let function = Function {
            name: None,
            params,
            body,
            kind: FunctionKind::Arrow,
            is_generator: false,
            is_async,
            strict,
            hoisting: HoistingSet::default(),
            span: self.span_from(start),
        };
        let function = self.finish_function(function, outer.strict)?;
        Ok(Expression::ArrowFunctionExpression {
            span: function.span,
            function: Box::new(function),
        })
    }

    // ---------------------------------------------------------------------
    // Methods
    // ---------------------------------------------------------------------

    /// Parse `async`, `*`, `get` and `set` in front of a property key
    pub(super) fn parse_method_modifiers(&mut self) -> Result<MethodModifiers, JsError> {
        let mut modifiers = MethodModifiers {
            is_async: false,
            is_generator: false,
            kind: MethodKind::Method,
        };
        if self.current.is_contextual("async") {
            let next = self.peek()?;
            if !next.newline_before && starts_property_key(&next) {
                self.advance()?;
                modifiers.is_async = true;
            }
        }
        if self.eat(Punctuator::Star)? {
            modifiers.is_generator = true;
            return Ok(modifiers);
        }
        if !modifiers.is_async
            && (self.current.is_contextual("get") || self.current.is_contextual("set"))
            && starts_property_key(&self.peek()?)
        {
            modifiers.kind = if self.current.is_contextual("get") {
                MethodKind::Get
            } else {
                MethodKind::Set
            };
            self.advance()?;
        }
        Ok(modifiers)
    }

    /// Parse the parameters and body of an object or class method
    pub(super) fn parse_method(
        &mut self,
        start: usize,
        key: &PropertyKey,
        modifiers: MethodModifiers,
    ) -> Result<Function, JsError> {
        let params_at = self.start();
        let function = self.parse_function_rest(
            start,
            key.static_name(),
            FunctionKind::Method,
            modifiers.is_generator,
            modifiers.is_async,
        )?;
        match modifiers.kind {
            MethodKind::Get if !function.params.is_empty() => Err(self.error_at(
                params_at,
                "Getter must not have any formal parameters.",
            )),
            MethodKind::Set
                if function.params.len() != 1
                    || matches!(function.params[0], Pattern::RestElement { .. }) =>
            {
                Err(self.error_at(params_at, "Setter must have exactly one formal parameter."))
            }
            _ => Ok(function),
        }
    }

    // ---------------------------------------------------------------------
    // Classes
    // ---------------------------------------------------------------------

    /// Parse a class declaration statement
    pub(super) fn parse_class_declaration(&mut self) -> Result<Statement, JsError> {
        let start = self.start();
        let class = self.parse_class(start, true)?;
        Ok(Statement::ClassDeclaration {
            class: Box::new(class),
            span: self.span_from(start),
        })
    }

    /// Parse a class declaration or expression starting at `class`. Class
    /// bodies are always strict mode code.
    pub(super) fn parse_class(&mut self, start: usize, name_required: bool) -> Result<Class, JsError> {
        self.expect_keyword(Keyword::Class)?;
        let outer = self.ctx;
        self.ctx.strict = true;
        let class = self.parse_class_rest(start, name_required);
        self.ctx = outer;
        class
    }

    fn parse_class_rest(&mut self, start: usize, name_required: bool) -> Result<Class, JsError> {
        let name = if self.current.kind == TokenKind::Identifier {
            Some(self.parse_binding_identifier()?)
        } else if name_required {
            return Err(self.expected("class name"));
        } else {
            None
        };

        let super_class = if self.eat_keyword(Keyword::Extends)? {
            Some(Box::new(self.parse_left_hand_side_expression()?))
        } else {
            None
        };
        let derived = super_class.is_some();

        self.expect(Punctuator::LBrace)?;
        let mut constructor = None;
        let mut elements = Vec::new();
        while !self.at(Punctuator::RBrace) {
            if self.eat(Punctuator::Semicolon)? {
                continue;
            }
            let element_start = self.start();
            match self.parse_class_element(derived)? {
                ClassMember::Constructor(function) => {
                    if constructor.is_some() {
                        return Err(
                            self.error_at(element_start, "A class may only have one constructor")
                        );
                    }
                    constructor = Some(Box::new(function));
                }
                ClassMember::Element(element) => elements.push(element),
            }
        }
        self.expect(Punctuator::RBrace)?;
        let span = self.span_from(start);

        let constructor = match constructor {
            Some(mut constructor) => {
                constructor.name = name.clone();
                constructor
            }
            None => Box::new(default_constructor(name.clone(), derived, span)),
        };
        Ok(Class {
            name,
            super_class,
            constructor,
            elements,
            span,
        })
    }

    fn parse_class_element(&mut self, derived: bool) -> Result<ClassMember, JsError> {
        let start = self.start();
        let mut is_static = false;
        if self.current.is_contextual("static") {
            let next = self.peek()?;
            if next.is_punctuator(Punctuator::LBrace) {
                return Err(unsupported(
                    "class static initialization blocks",
                    Some(self.current.position()),
                ));
            }
            if starts_property_key(&next) {
                self.advance()?;
                is_static = true;
            }
        }

        let modifiers = self.parse_method_modifiers()?;
        let key = self.parse_property_key()?;
        let name = key.static_name();

        if modifiers.is_method() || self.at(Punctuator::LParen) {
            if !is_static && name.as_deref() == Some("constructor") {
                if modifiers.is_method() {
                    return Err(self.error_at(
                        start,
                        "Class constructor may not be an accessor, generator or async method",
                    ));
                }
                let function = self.parse_function_rest(
                    start,
                    None,
                    FunctionKind::ClassConstructor { derived },
                    false,
                    false,
                )?;
                return Ok(ClassMember::Constructor(function));
            }
            if is_static && name.as_deref() == Some("prototype") {
                return Err(
                    self.error_at(start, "Classes may not have a static property named 'prototype'")
                );
            }
            let function = self.parse_method(start, &key, modifiers)?;
            return Ok(ClassMember::Element(ClassElement::MethodDefinition {
                key,
                kind: modifiers.kind,
                function: Box::new(function),
                is_static,
                span: self.span_from(start),
            }));
        }

        match name.as_deref() {
            Some("constructor") => {
                return Err(self.error_at(start, "Classes may not have a field named 'constructor'"))
            }
            Some("prototype") if is_static => {
                return Err(
                    self.error_at(start, "Classes may not have a static property named 'prototype'")
                )
            }
            _ => {}
        }
        let value = if self.eat(Punctuator::Assign)? {
            Some(self.parse_field_initializer()?)
        } else {
            None
        };
        self.consume_semicolon()?;
        Ok(ClassMember::Element(ClassElement::PropertyDefinition {
            key,
            value,
            is_static,
            span: self.span_from(start),
        }))
    }

    /// Field initializers behave like method bodies: `this` and `super.x`
    /// refer to the instance (or class), `await` and `yield` are reserved
    fn parse_field_initializer(&mut self) -> Result<Expression, JsError> {
        let outer = self.ctx;
        self.ctx = Context {
            strict: true,
            in_function: true,
            allow_super_property: true,
            allow_new_target: true,
            ..Context::default()
        };
        let value = self.parse_assignment_expression();
        self.ctx = outer;
        value
    }
}

enum ClassMember {
    Constructor(Function),
    Element(ClassElement),
}

/// `=>` on the same line as the parameters
fn is_arrow(token: &Token<'_>) -> bool {
    token.is_punctuator(Punctuator::Arrow) && !token.newline_before
}

/// Whether `token` can begin a property key (so a preceding `get`, `set`,
/// `async` or `static` is a modifier rather than the key itself)
fn starts_property_key(token: &Token<'_>) -> bool {
    match token.kind {
        TokenKind::Identifier
        | TokenKind::Keyword(_)
        | TokenKind::String
        | TokenKind::Number
        | TokenKind::PrivateIdentifier => true,
        TokenKind::Punctuator(punctuator) => {
            matches!(punctuator, Punctuator::LBracket | Punctuator::Star)
        }
        _ => false,
    }
}

/// `constructor() {}`, or `constructor(...args) { super(...args); }` for a
/// derived class
fn default_constructor(name: Option<String>, derived: bool, span: Span) -> Function {
    let (params, body) = if derived {
        let args = || Expression::Identifier {
            name: "args".to_string(),
            span,
        };
        let call = Expression::CallExpression {
            callee: Box::new(Expression::SuperExpression { span }),
            arguments: vec![Expression::SpreadElement {
                argument: Box::new(args()),
                span,
            }],
            optional: false,
            span,
        };
        let params = vec![Pattern::RestElement {
            argument: Box::new(Pattern::Identifier {
                name: "args".to_string(),
                span,
            }),
            span,
        }];
        let body = vec![Statement::ExpressionStatement {
            expression: call,
            span,
        }];
        (params, body)
    } else {
        (Vec::new(), Vec::new())
    };
    let mut hoisting = HoistingSet::default();
    if derived {
        hoisting = hoisting::function_scope(&body);
    }
    Function {
        name,
        params,
        body: FunctionBody::Block(body),
        kind: FunctionKind::ClassConstructor { derived },
        is_generator: false,
        is_async: false,
        strict: true,
        hoisting,
        span,
    }
}
