//! Statement parsing

use core_types::JsError;

use super::{Label, Parser};
use crate::ast::*;
use crate::error::unsupported;
use crate::hoisting;
use crate::lexer::{Keyword, Punctuator, TokenKind};

impl<'a> Parser<'a> {
    /// Parse a statement or declaration
    pub(super) fn parse_statement_list_item(&mut self) -> Result<Statement, JsError> {
        match self.current.kind {
            TokenKind::Keyword(Keyword::Function) => self.parse_function_declaration(false),
            TokenKind::Keyword(Keyword::Class) => self.parse_class_declaration(),
            TokenKind::Keyword(Keyword::Const) => self.parse_variable_statement(VariableKind::Const),
            TokenKind::Keyword(Keyword::Import) => {
                let next = self.peek()?;
                if next.is_punctuator(Punctuator::LParen) || next.is_punctuator(Punctuator::Dot) {
                    self.parse_statement()
                } else {
                    self.parse_import_declaration()
                }
            }
            TokenKind::Keyword(Keyword::Export) => self.parse_export_declaration(),
            TokenKind::Identifier if self.is_let_declaration()? => {
                self.parse_variable_statement(VariableKind::Let)
            }
            TokenKind::Identifier if self.is_async_function()? => {
                self.parse_function_declaration(true)
            }
            _ => self.parse_statement(),
        }
    }

    /// `let` starts a declaration when followed by a binding
    fn is_let_declaration(&self) -> Result<bool, JsError> {
        if !self.current.is_contextual("let") {
            return Ok(false);
        }
        let next = self.peek()?;
        Ok(next.is_punctuator(Punctuator::LBracket)
            || next.is_punctuator(Punctuator::LBrace)
            || (next.kind == TokenKind::Identifier
                && !(next.newline_before && (next.is_contextual("in") || next.is_contextual("of")))))
    }

    /// `async function` with no line break in between
    pub(super) fn is_async_function(&self) -> Result<bool, JsError> {
        if !self.current.is_contextual("async") {
            return Ok(false);
        }
        let next = self.peek()?;
        Ok(next.is_keyword(Keyword::Function) && !next.newline_before)
    }

    /// Parse a statement (declarations other than `var` are rejected)
    pub(super) fn parse_statement(&mut self) -> Result<Statement, JsError> {
        self.nested(Self::parse_statement_level)
    }

    fn parse_statement_level(&mut self) -> Result<Statement, JsError> {
        let labels = std::mem::take(&mut self.pending_labels);
        match self.current.kind {
            TokenKind::Punctuator(Punctuator::LBrace) => {
                Ok(Statement::BlockStatement(self.parse_block()?))
            }
            TokenKind::Punctuator(Punctuator::Semicolon) => {
                let start = self.start();
                self.advance()?;
                Ok(Statement::EmptyStatement {
                    span: self.span_from(start),
                })
            }
            TokenKind::Keyword(Keyword::Var) => self.parse_variable_statement(VariableKind::Var),
            TokenKind::Keyword(Keyword::If) => self.parse_if_statement(),
            TokenKind::Keyword(Keyword::For) => self.parse_for_statement(labels),
            TokenKind::Keyword(Keyword::While) => self.parse_while_statement(labels),
            TokenKind::Keyword(Keyword::Do) => self.parse_do_while_statement(labels),
            TokenKind::Keyword(Keyword::Continue) => self.parse_continue_statement(),
            TokenKind::Keyword(Keyword::Break) => self.parse_break_statement(),
            TokenKind::Keyword(Keyword::Return) => self.parse_return_statement(),
            TokenKind::Keyword(Keyword::Throw) => self.parse_throw_statement(),
            TokenKind::Keyword(Keyword::Try) => self.parse_try_statement(),
            TokenKind::Keyword(Keyword::Switch) => self.parse_switch_statement(),
            TokenKind::Keyword(Keyword::Debugger) => {
                let start = self.start();
                self.advance()?;
                self.consume_semicolon()?;
                Ok(Statement::DebuggerStatement {
                    span: self.span_from(start),
                })
            }
            TokenKind::Keyword(Keyword::With) => {
                if self.ctx.strict {
                    Err(self.error_here("Strict mode code may not include a with statement"))
                } else {
                    Err(unsupported("with statements", Some(self.current.position())))
                }
            }
            TokenKind::Keyword(Keyword::Function) => Err(self.error_here(
                "Function declarations are only allowed at the top level or inside a block",
            )),
            TokenKind::Keyword(Keyword::Class) | TokenKind::Keyword(Keyword::Const) => Err(self
                .error_here("Lexical declaration cannot appear in a single-statement context")),
            TokenKind::Identifier
                if self.current.is_contextual("let")
                    && self.peek()?.is_punctuator(Punctuator::LBracket) =>
            {
                Err(self.error_here("Lexical declaration cannot appear in a single-statement context"))
            }
            TokenKind::Identifier if self.peek()?.is_punctuator(Punctuator::Colon) => {
                self.parse_labeled_statement(labels)
            }
            _ => self.parse_expression_statement(),
        }
    }

    /// Parse a `{ ... }` block with its own lexical scope
    pub(super) fn parse_block(&mut self) -> Result<Block, JsError> {
        let start = self.start();
        self.expect(Punctuator::LBrace)?;
        let at_top_level = std::mem::replace(&mut self.ctx.at_top_level, false);
        let body = self.parse_statement_list();
        self.ctx.at_top_level = at_top_level;
        let body = body?;
        self.expect(Punctuator::RBrace)?;
        let scope = hoisting::block_scope(&body);
        self.check_scope(&scope, start)?;
        Ok(Block {
            body,
            scope,
            span: self.span_from(start),
        })
    }

    fn parse_variable_statement(&mut self, kind: VariableKind) -> Result<Statement, JsError> {
        let start = self.start();
        self.advance()?;
        let declarations = self.parse_variable_declarations(kind, false)?;
        self.consume_semicolon()?;
        Ok(Statement::VariableDeclaration {
            kind,
            declarations,
            span: self.span_from(start),
        })
    }

    /// Parse a comma-separated declarator list. Initializers may be omitted
    /// in a for-statement head; the caller checks what the loop needs.
    pub(super) fn parse_variable_declarations(
        &mut self,
        kind: VariableKind,
        in_for_head: bool,
    ) -> Result<Vec<VariableDeclarator>, JsError> {
        let mut declarations = Vec::new();
        loop {
            let start = self.start();
            if kind != VariableKind::Var && self.current.is_contextual("let") {
                return Err(self.error_here("let is disallowed as a lexically bound name"));
            }
            let id = self.parse_binding_target()?;
            let init = if self.eat(Punctuator::Assign)? {
                Some(self.parse_assignment_expression()?)
            } else {
                None
            };
            if init.is_none() && !in_for_head {
                if kind == VariableKind::Const {
                    return Err(self.error_at(start, "Missing initializer in const declaration"));
                }
                if id.as_identifier().is_none() {
                    return Err(
                        self.error_at(start, "Missing initializer in destructuring declaration")
                    );
                }
            }
            declarations.push(VariableDeclarator {
                id,
                init,
                span: self.span_from(start),
            });
            if !self.eat(Punctuator::Comma)? {
                return Ok(declarations);
            }
        }
    }

    fn parse_expression_statement(&mut self) -> Result<Statement, JsError> {
        let start = self.start();
        let expression = self.parse_expression()?;
        self.consume_semicolon()?;
        Ok(Statement::ExpressionStatement {
            expression,
            span: self.span_from(start),
        })
    }

    fn parse_if_statement(&mut self) -> Result<Statement, JsError> {
        let start = self.start();
        self.advance()?;
        self.expect(Punctuator::LParen)?;
        let test = self.allow_in(|p| p.parse_expression())?;
        self.expect(Punctuator::RParen)?;
        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.eat_keyword(Keyword::Else)? {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Statement::IfStatement {
            test,
            consequent,
            alternate,
            span: self.span_from(start),
        })
    }

    /// Marks the labels attached to a loop as continue targets
    fn mark_loop_labels(&mut self, count: usize) {
        let len = self.labels.len();
        for label in &mut self.labels[len.saturating_sub(count)..] {
            label.is_loop = true;
        }
    }

    fn parse_loop_body(&mut self) -> Result<Box<Statement>, JsError> {
        self.ctx.loop_depth += 1;
        self.ctx.breakable_depth += 1;
        let body = self.parse_statement();
        self.ctx.loop_depth -= 1;
        self.ctx.breakable_depth -= 1;
        body.map(Box::new)
    }

    fn parse_while_statement(&mut self, labels: usize) -> Result<Statement, JsError> {
        let start = self.start();
        self.mark_loop_labels(labels);
        self.advance()?;
        self.expect(Punctuator::LParen)?;
        let test = self.allow_in(|p| p.parse_expression())?;
        self.expect(Punctuator::RParen)?;
        let body = self.parse_loop_body()?;
        Ok(Statement::WhileStatement {
            test,
            body,
            span: self.span_from(start),
        })
    }

    fn parse_do_while_statement(&mut self, labels: usize) -> Result<Statement, JsError> {
        let start = self.start();
        self.mark_loop_labels(labels);
        self.advance()?;
        let body = self.parse_loop_body()?;
        self.expect_keyword(Keyword::While)?;
        self.expect(Punctuator::LParen)?;
        let test = self.allow_in(|p| p.parse_expression())?;
        self.expect(Punctuator::RParen)?;
        // A semicolon after do-while is always optional.
        self.eat(Punctuator::Semicolon)?;
        Ok(Statement::DoWhileStatement {
            body,
            test,
            span: self.span_from(start),
        })
    }

    fn parse_for_statement(&mut self, labels: usize) -> Result<Statement, JsError> {
        let start = self.start();
        self.mark_loop_labels(labels);
        self.advance()?;
        if self.current.is_contextual("await") {
            return Err(unsupported("for await loops", Some(self.current.position())));
        }
        self.expect(Punctuator::LParen)?;

        if self.at(Punctuator::Semicolon) {
            return self.parse_for_rest(start, None);
        }

        let declaration_kind = if self.at_keyword(Keyword::Var) {
            Some(VariableKind::Var)
        } else if self.at_keyword(Keyword::Const) {
            Some(VariableKind::Const)
        } else if self.is_let_declaration()? {
            Some(VariableKind::Let)
        } else {
            None
        };

        if let Some(kind) = declaration_kind {
            let declarations_start = self.start();
            self.advance()?;
            let no_in = std::mem::replace(&mut self.ctx.no_in, true);
            let declarations = self.parse_variable_declarations(kind, true);
            self.ctx.no_in = no_in;
            let mut declarations = declarations?;

            let is_in = self.at_keyword(Keyword::In);
            if is_in || self.current.is_contextual("of") {
                if declarations.len() != 1 {
                    return Err(self.error_at(
                        declarations_start,
                        "Invalid left-hand side in for-loop: must have a single binding",
                    ));
                }
                let declarator = declarations.remove(0);
                if declarator.init.is_some() {
                    return Err(self.error_at(
                        declarator.span.start,
                        "for-in/of loop variable declaration may not have an initializer",
                    ));
                }
                let left = ForInOfLeft::VariableDeclaration {
                    kind,
                    id: declarator.id,
                };
                return self.parse_for_in_of_rest(start, left, is_in);
            }

            for declarator in &declarations {
                if declarator.init.is_none()
                    && (kind == VariableKind::Const || declarator.id.as_identifier().is_none())
                {
                    return Err(self.error_at(
                        declarator.span.start,
                        "Missing initializer in declaration",
                    ));
                }
            }
            let init = ForInit::VariableDeclaration { kind, declarations };
            return self.parse_for_rest(start, Some(init));
        }

        if self.at(Punctuator::LBracket) || self.at(Punctuator::LBrace) {
            let checkpoint = self.checkpoint();
            if let Ok(pattern) = self.parse_assignment_pattern() {
                let is_in = self.at_keyword(Keyword::In);
                if is_in || self.current.is_contextual("of") {
                    return self.parse_for_in_of_rest(start, ForInOfLeft::Pattern(pattern), is_in);
                }
            }
            self.rewind(checkpoint);
        }

        let no_in = std::mem::replace(&mut self.ctx.no_in, true);
        let init = self.parse_expression();
        self.ctx.no_in = no_in;
        let init = init?;

        let is_in = self.at_keyword(Keyword::In);
        if is_in || self.current.is_contextual("of") {
            let pattern = self.expression_to_simple_target(init)?;
            return self.parse_for_in_of_rest(start, ForInOfLeft::Pattern(pattern), is_in);
        }
        self.parse_for_rest(start, Some(ForInit::Expression(init)))
    }

    fn parse_for_rest(&mut self, start: usize, init: Option<ForInit>) -> Result<Statement, JsError> {
        self.expect(Punctuator::Semicolon)?;
        let test = if self.at(Punctuator::Semicolon) {
            None
        } else {
            Some(self.allow_in(|p| p.parse_expression())?)
        };
        self.expect(Punctuator::Semicolon)?;
        let update = if self.at(Punctuator::RParen) {
            None
        } else {
            Some(self.allow_in(|p| p.parse_expression())?)
        };
        self.expect(Punctuator::RParen)?;
        let body = self.parse_loop_body()?;
        Ok(Statement::ForStatement {
            init,
            test,
            update,
            body,
            span: self.span_from(start),
        })
    }

    fn parse_for_in_of_rest(
        &mut self,
        start: usize,
        left: ForInOfLeft,
        is_in: bool,
    ) -> Result<Statement, JsError> {
        self.advance()?;
        let right = if is_in {
            self.allow_in(|p| p.parse_expression())?
        } else {
            self.allow_in(|p| p.parse_assignment_expression())?
        };
        self.expect(Punctuator::RParen)?;
        let body = self.parse_loop_body()?;
        let span = self.span_from(start);
        Ok(if is_in {
            Statement::ForInStatement {
                left,
                right,
                body,
                span,
            }
        } else {
            Statement::ForOfStatement {
                left,
                right,
                body,
                span,
            }
        })
    }

    /// Optional label after `break`/`continue` on the same line
    fn parse_jump_label(&mut self) -> Result<Option<String>, JsError> {
        if self.current.kind == TokenKind::Identifier && !self.current.newline_before {
            let name = self.current.identifier().unwrap_or_default().to_string();
            self.advance()?;
            Ok(Some(name))
        } else {
            Ok(None)
        }
    }

    fn parse_break_statement(&mut self) -> Result<Statement, JsError> {
        let start = self.start();
        self.advance()?;
        let label = self.parse_jump_label()?;
        match &label {
            Some(name) if !self.labels.iter().any(|l| &l.name == name) => {
                return Err(self.error_at(start, format!("Undefined label '{}'", name)));
            }
            None if self.ctx.breakable_depth == 0 => {
                return Err(self.error_at(start, "Illegal break statement"));
            }
            _ => {}
        }
        self.consume_semicolon()?;
        Ok(Statement::BreakStatement {
            label,
            span: self.span_from(start),
        })
    }

    fn parse_continue_statement(&mut self) -> Result<Statement, JsError> {
        let start = self.start();
        self.advance()?;
        let label = self.parse_jump_label()?;
        match &label {
            Some(name) => match self.labels.iter().rev().find(|l| &l.name == name) {
                None => {
                    return Err(self.error_at(start, format!("Undefined label '{}'", name)));
                }
                Some(l) if !l.is_loop => {
                    return Err(self.error_at(
                        start,
                        format!(
                            "Illegal continue statement: '{}' does not denote an iteration statement",
                            name
                        ),
                    ));
                }
                Some(_) => {}
            },
            None if self.ctx.loop_depth == 0 => {
                return Err(self.error_at(
                    start,
                    "Illegal continue statement: no surrounding iteration statement",
                ));
            }
            None => {}
        }
        self.consume_semicolon()?;
        Ok(Statement::ContinueStatement {
            label,
            span: self.span_from(start),
        })
    }

    fn parse_return_statement(&mut self) -> Result<Statement, JsError> {
        let start = self.start();
        if !self.ctx.in_function {
            return Err(self.error_here("Illegal return statement"));
        }
        self.advance()?;
        let argument = if self.at(Punctuator::Semicolon)
            || self.at(Punctuator::RBrace)
            || self.current.is_eof()
            || self.current.newline_before
        {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume_semicolon()?;
        Ok(Statement::ReturnStatement {
            argument,
            span: self.span_from(start),
        })
    }

    fn parse_throw_statement(&mut self) -> Result<Statement, JsError> {
        let start = self.start();
        self.advance()?;
        if self.current.newline_before {
            return Err(self.error_here("Illegal newline after throw"));
        }
        let argument = self.parse_expression()?;
        self.consume_semicolon()?;
        Ok(Statement::ThrowStatement {
            argument,
            span: self.span_from(start),
        })
    }

    fn parse_try_statement(&mut self) -> Result<Statement, JsError> {
        let start = self.start();
        self.advance()?;
        let block = self.parse_block()?;

        let handler = if self.at_keyword(Keyword::Catch) {
            let catch_start = self.start();
            self.advance()?;
            let param = if self.eat(Punctuator::LParen)? {
                let param = self.parse_binding_target()?;
                self.expect(Punctuator::RParen)?;
                Some(param)
            } else {
                None
            };
            let body = self.parse_block()?;
            if let Some(param) = &param {
                let mut names = Vec::new();
                param.bound_names(&mut names);
                if let Some(name) = names
                    .iter()
                    .find(|n| body.scope.lexical.iter().any(|b| &b.name == *n))
                {
                    return Err(self.error_at(
                        body.span.start,
                        format!("Identifier '{}' has already been declared", name),
                    ));
                }
            }
            Some(CatchClause {
                param,
                body,
                span: self.span_from(catch_start),
            })
        } else {
            None
        };

        let finalizer = if self.eat_keyword(Keyword::Finally)? {
            Some(self.parse_block()?)
        } else {
            None
        };

        if handler.is_none() && finalizer.is_none() {
            return Err(self.error_here("Missing catch or finally after try"));
        }
        Ok(Statement::TryStatement {
            block,
            handler,
            finalizer,
            span: self.span_from(start),
        })
    }

    fn parse_switch_statement(&mut self) -> Result<Statement, JsError> {
        let start = self.start();
        self.advance()?;
        self.expect(Punctuator::LParen)?;
        let discriminant = self.allow_in(|p| p.parse_expression())?;
        self.expect(Punctuator::RParen)?;
        self.expect(Punctuator::LBrace)?;

        self.ctx.breakable_depth += 1;
        let at_top_level = std::mem::replace(&mut self.ctx.at_top_level, false);
        let cases = self.parse_switch_cases();
        self.ctx.breakable_depth -= 1;
        self.ctx.at_top_level = at_top_level;
        let cases = cases?;

        self.expect(Punctuator::RBrace)?;
        let scope = hoisting::block_scope(cases.iter().flat_map(|c| c.consequent.iter()));
        self.check_scope(&scope, start)?;
        Ok(Statement::SwitchStatement {
            discriminant,
            cases,
            scope,
            span: self.span_from(start),
        })
    }

    fn parse_switch_cases(&mut self) -> Result<Vec<SwitchCase>, JsError> {
        let mut cases = Vec::new();
        let mut has_default = false;
        while !self.at(Punctuator::RBrace) {
            let case_start = self.start();
            let test = if self.eat_keyword(Keyword::Case)? {
                Some(self.allow_in(|p| p.parse_expression())?)
            } else if self.at_keyword(Keyword::Default) {
                if has_default {
                    return Err(self.error_here("More than one default clause in switch statement"));
                }
                has_default = true;
                self.advance()?;
                None
            } else {
                return Err(self.expected("'case' or 'default'"));
            };
            self.expect(Punctuator::Colon)?;

            let mut consequent = Vec::new();
            while !self.at(Punctuator::RBrace)
                && !self.at_keyword(Keyword::Case)
                && !self.at_keyword(Keyword::Default)
                && !self.current.is_eof()
            {
                if let Some(statement) = self.parse_list_item() {
                    consequent.push(statement?);
                }
            }
            cases.push(SwitchCase {
                test,
                consequent,
                span: self.span_from(case_start),
            });
        }
        Ok(cases)
    }

    fn parse_labeled_statement(&mut self, enclosing: usize) -> Result<Statement, JsError> {
        let start = self.start();
        let name = self.current.identifier().unwrap_or_default().to_string();
        self.validate_reference_name(&name)?;
        if self.labels.iter().any(|l| l.name == name) {
            return Err(self.error_here(format!("Label '{}' has already been declared", name)));
        }
        self.advance()?;
        self.expect(Punctuator::Colon)?;

        if self.at_keyword(Keyword::Function) {
            return Err(self.error_here("Labelled function declarations are not allowed"));
        }
        self.labels.push(Label {
            name: name.clone(),
            is_loop: false,
        });
        self.pending_labels = enclosing + 1;
        let body = self.parse_statement();
        self.labels.pop();
        Ok(Statement::LabeledStatement {
            label: name,
            body: Box::new(body?),
            span: self.span_from(start),
        })
    }

    fn parse_module_specifier(&mut self) -> Result<String, JsError> {
        if self.current.kind != TokenKind::String {
            return Err(self.expected("module specifier"));
        }
        let source = self.string_value();
        self.advance()?;
        Ok(source)
    }

    /// A name in an import/export list: an identifier name or a string
    fn parse_module_export_name(&mut self) -> Result<String, JsError> {
        if self.current.kind == TokenKind::String {
            let name = self.string_value();
            self.advance()?;
            return Ok(name);
        }
        self.parse_property_name()
    }

    fn check_module_item(&self) -> Result<(), JsError> {
        if self.ctx.at_top_level && !self.ctx.in_function {
            Ok(())
        } else {
            Err(self.error_here("Import and export declarations may only appear at top level"))
        }
    }

    fn parse_import_declaration(&mut self) -> Result<Statement, JsError> {
        let start = self.start();
        self.check_module_item()?;
        self.advance()?;

        let mut specifiers = Vec::new();
        if self.current.kind != TokenKind::String {
            if self.current.kind == TokenKind::Identifier {
                let local = self.parse_binding_identifier()?;
                specifiers.push(ImportSpecifier {
                    imported: "default".to_string(),
                    local,
                });
                if !self.eat(Punctuator::Comma)? {
                    return self.finish_import(start, specifiers);
                }
            }
            if self.eat(Punctuator::Star)? {
                if !self.current.is_contextual("as") {
                    return Err(self.expected("'as'"));
                }
                self.advance()?;
                let local = self.parse_binding_identifier()?;
                specifiers.push(ImportSpecifier {
                    imported: "*".to_string(),
                    local,
                });
            } else {
                self.expect(Punctuator::LBrace)?;
                while !self.at(Punctuator::RBrace) {
                    let imported_is_identifier = self.current.kind == TokenKind::Identifier;
                    let imported = self.parse_module_export_name()?;
                    let local = if self.current.is_contextual("as") {
                        self.advance()?;
                        self.parse_binding_identifier()?
                    } else if imported_is_identifier {
                        self.validate_binding_name(&imported)?;
                        imported.clone()
                    } else {
                        return Err(self.expected("'as'"));
                    };
                    specifiers.push(ImportSpecifier { imported, local });
                    if !self.at(Punctuator::RBrace) {
                        self.expect(Punctuator::Comma)?;
                    }
                }
                self.advance()?;
            }
        }
        self.finish_import(start, specifiers)
    }

    fn finish_import(
        &mut self,
        start: usize,
        specifiers: Vec<ImportSpecifier>,
    ) -> Result<Statement, JsError> {
        if !specifiers.is_empty() {
            if !self.current.is_contextual("from") {
                return Err(self.expected("'from'"));
            }
            self.advance()?;
        }
        let source = self.parse_module_specifier()?;
        self.consume_semicolon()?;
        Ok(Statement::ImportDeclaration {
            specifiers,
            source,
            span: self.span_from(start),
        })
    }

    fn parse_export_declaration(&mut self) -> Result<Statement, JsError> {
        let start = self.start();
        self.check_module_item()?;
        self.advance()?;

        let export = match self.current.kind {
            TokenKind::Keyword(Keyword::Default) => {
                self.advance()?;
                self.parse_export_default()?
            }
            TokenKind::Punctuator(Punctuator::Star) => {
                self.advance()?;
                let alias = if self.current.is_contextual("as") {
                    self.advance()?;
                    Some(self.parse_module_export_name()?)
                } else {
                    None
                };
                if !self.current.is_contextual("from") {
                    return Err(self.expected("'from'"));
                }
                self.advance()?;
                let source = self.parse_module_specifier()?;
                self.consume_semicolon()?;
                match alias {
                    Some(alias) => Export::Named {
                        specifiers: vec![("*".to_string(), alias)],
                        source: Some(source),
                    },
                    None => Export::All { source },
                }
            }
            TokenKind::Punctuator(Punctuator::LBrace) => {
                self.advance()?;
                let mut specifiers = Vec::new();
                while !self.at(Punctuator::RBrace) {
                    let local = self.parse_module_export_name()?;
                    let exported = if self.current.is_contextual("as") {
                        self.advance()?;
                        self.parse_module_export_name()?
                    } else {
                        local.clone()
                    };
                    specifiers.push((local, exported));
                    if !self.at(Punctuator::RBrace) {
                        self.expect(Punctuator::Comma)?;
                    }
                }
                self.advance()?;
                let source = if self.current.is_contextual("from") {
                    self.advance()?;
                    Some(self.parse_module_specifier()?)
                } else {
                    None
                };
                self.consume_semicolon()?;
                Export::Named { specifiers, source }
            }
            TokenKind::Keyword(Keyword::Var)
            | TokenKind::Keyword(Keyword::Const)
            | TokenKind::Keyword(Keyword::Function)
            | TokenKind::Keyword(Keyword::Class) => {
                Export::Declaration(Box::new(self.parse_statement_list_item()?))
            }
            TokenKind::Identifier
                if self.is_let_declaration()? || self.is_async_function()? =>
            {
                Export::Declaration(Box::new(self.parse_statement_list_item()?))
            }
            _ => return Err(self.unexpected()),
        };
        Ok(Statement::ExportDeclaration {
            export,
            span: self.span_from(start),
        })
    }

    fn parse_export_default(&mut self) -> Result<Export, JsError> {
        let start = self.start();
        let is_async = self.is_async_function()?;
        if is_async || self.at_keyword(Keyword::Function) {
            let function = self.parse_function(start, is_async, false)?;
            return Ok(if function.name.is_some() {
                Export::Declaration(Box::new(Statement::FunctionDeclaration {
                    function: Box::new(function),
                    span: self.span_from(start),
                }))
            } else {
                Export::Default(Expression::FunctionExpression {
                    function: Box::new(function),
                    span: self.span_from(start),
                })
            });
        }
        if self.at_keyword(Keyword::Class) {
            let class = self.parse_class(start, false)?;
            return Ok(if class.name.is_some() {
                Export::Declaration(Box::new(Statement::ClassDeclaration {
                    class: Box::new(class),
                    span: self.span_from(start),
                }))
            } else {
                Export::Default(Expression::ClassExpression {
                    class: Box::new(class),
                    span: self.span_from(start),
                })
            });
        }
        let expression = self.allow_in(|p| p.parse_assignment_expression())?;
        self.consume_semicolon()?;
        Ok(Export::Default(expression))
    }
}
