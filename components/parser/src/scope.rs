//! Scope analysis for closures
//!
//! The compiler keeps uncaptured variables in registers and moves every
//! variable an inner function might reach into a heap cell. The analysis is
//! name based and conservative: a name counts as captured in a function when
//! any function nested inside it references that name without declaring it
//! at its own top level. Block-level shadowing inside the nested function is
//! ignored, which may put a few extra variables into cells but never misses
//! one.

use crate::ast::*;
use crate::parser::{STACK_RED_ZONE, STACK_SEGMENT};
use std::collections::HashSet;

/// Result of analyzing one function, script or class field initializer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScopeInfo {
    /// Names referenced by nested functions; bindings of this function with
    /// these names must live in cells
    pub captured: HashSet<String>,
    /// Names this unit references but does not declare at its top level
    pub free: HashSet<String>,
    /// Whether `arguments` (the implicit object, not a declared binding) is
    /// used by this function or an arrow nested inside it
    pub uses_arguments: bool,
    /// Whether a named function expression refers to its own name
    pub uses_own_name: bool,
}

/// Collects identifier references of one function body. Nested functions
/// are analyzed separately and contribute only their free names.
#[derive(Debug, Default)]
pub struct ScopeAnalyzer {
    references: HashSet<String>,
    nested_free: HashSet<String>,
}

impl ScopeAnalyzer {
    /// Create an empty analyzer
    pub fn new() -> Self {
        Self::default()
    }

    /// Analyze the top level of a script
    pub fn analyze_program(program: &Program) -> ScopeInfo {
        let mut analyzer = ScopeAnalyzer::new();
        analyzer.visit_statements(&program.body);
        let mut declared: HashSet<String> =
            program.hoisting.lexical.iter().map(|b| b.name.clone()).collect();
        declared.extend(program.hoisting.var_names.iter().cloned());
        declared.extend(program.hoisting.functions.iter().cloned());
        analyzer.finish(&declared, false, None)
    }

    /// Analyze a function. `is_expression` marks a function expression,
    /// whose name is bound inside its own body.
    pub fn analyze_function(function: &Function, is_expression: bool) -> ScopeInfo {
        let mut analyzer = ScopeAnalyzer::new();
        for param in &function.params {
            analyzer.visit_pattern(param);
        }
        match &function.body {
            FunctionBody::Block(body) => analyzer.visit_statements(body),
            FunctionBody::Expression(expr) => analyzer.visit_expression(expr),
        }

        let mut declared = HashSet::new();
        let mut names = Vec::new();
        for param in &function.params {
            param.bound_names(&mut names);
        }
        declared.extend(names);
        declared.extend(function.hoisting.var_names.iter().cloned());
        declared.extend(function.hoisting.functions.iter().cloned());
        declared.extend(function.hoisting.lexical.iter().map(|b| b.name.clone()));

        let is_arrow = function.kind == FunctionKind::Arrow;
        let own_name = if is_expression {
            function.name.as_deref().filter(|n| !declared.contains(*n))
        } else {
            None
        };
        analyzer.finish(&declared, !is_arrow, own_name)
    }

    /// Analyze the synthetic initializer that evaluates a class's field
    /// keys and values
    pub fn analyze_fields<'e>(elements: impl IntoIterator<Item = &'e ClassElement>) -> ScopeInfo {
        let mut analyzer = ScopeAnalyzer::new();
        for element in elements {
            analyzer.visit_field(element);
        }
        analyzer.finish(&HashSet::new(), false, None)
    }

    fn finish(
        self,
        declared: &HashSet<String>,
        binds_arguments: bool,
        own_name: Option<&str>,
    ) -> ScopeInfo {
        let mut all = self.references;
        all.extend(self.nested_free.iter().cloned());

        let uses_arguments =
            binds_arguments && !declared.contains("arguments") && all.contains("arguments");
        let uses_own_name = own_name.is_some_and(|name| all.contains(name));

        let free = all
            .into_iter()
            .filter(|name| {
                !declared.contains(name)
                    && !(binds_arguments && name == "arguments")
                    && own_name != Some(name.as_str())
            })
            .collect();

        ScopeInfo {
            captured: self.nested_free,
            free,
            uses_arguments,
            uses_own_name,
        }
    }

    fn reference(&mut self, name: &str) {
        if !self.references.contains(name) {
            self.references.insert(name.to_string());
        }
    }

    fn nested_function(&mut self, function: &Function, is_expression: bool) {
        let info = ScopeAnalyzer::analyze_function(function, is_expression);
        self.nested_free.extend(info.free);
    }

    fn visit_statements(&mut self, statements: &[Statement]) {
        for statement in statements {
            self.visit_statement(statement);
        }
    }

    fn visit_statement(&mut self, statement: &Statement) {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, || self.visit_statement_kind(statement))
    }

    fn visit_statement_kind(&mut self, statement: &Statement) {
        match statement {
            Statement::VariableDeclaration { declarations, .. } => {
                self.visit_declarators(declarations)
            }
            Statement::FunctionDeclaration { function, .. } => {
                self.nested_function(function, false)
            }
            Statement::ClassDeclaration { class, .. } => self.visit_class(class),
            Statement::ExpressionStatement { expression, .. }
            | Statement::ThrowStatement {
                argument: expression,
                ..
            } => self.visit_expression(expression),
            Statement::ReturnStatement { argument, .. } => {
                if let Some(argument) = argument {
                    self.visit_expression(argument);
                }
            }
            Statement::IfStatement {
                test,
                consequent,
                alternate,
                ..
            } => {
                self.visit_expression(test);
                self.visit_statement(consequent);
                if let Some(alternate) = alternate {
                    self.visit_statement(alternate);
                }
            }
            Statement::WhileStatement { test, body, .. }
            | Statement::DoWhileStatement { body, test, .. } => {
                self.visit_expression(test);
                self.visit_statement(body);
            }
            Statement::ForStatement {
                init,
                test,
                update,
                body,
                ..
            } => {
                match init {
                    Some(ForInit::VariableDeclaration { declarations, .. }) => {
                        self.visit_declarators(declarations)
                    }
                    Some(ForInit::Expression(expr)) => self.visit_expression(expr),
                    None => {}
                }
                for expr in test.iter().chain(update.iter()) {
                    self.visit_expression(expr);
                }
                self.visit_statement(body);
            }
            Statement::ForInStatement {
                left, right, body, ..
            }
            | Statement::ForOfStatement {
                left, right, body, ..
            } => {
                match left {
                    ForInOfLeft::VariableDeclaration { id, .. } => self.visit_pattern(id),
                    ForInOfLeft::Pattern(pattern) => self.visit_pattern(pattern),
                }
                self.visit_expression(right);
                self.visit_statement(body);
            }
            Statement::BlockStatement(block) => self.visit_statements(&block.body),
            Statement::TryStatement {
                block,
                handler,
                finalizer,
                ..
            } => {
                self.visit_statements(&block.body);
                if let Some(handler) = handler {
                    if let Some(param) = &handler.param {
                        self.visit_pattern(param);
                    }
                    self.visit_statements(&handler.body.body);
                }
                if let Some(finalizer) = finalizer {
                    self.visit_statements(&finalizer.body);
                }
            }
            Statement::SwitchStatement {
                discriminant,
                cases,
                ..
            } => {
                self.visit_expression(discriminant);
                for case in cases {
                    if let Some(test) = &case.test {
                        self.visit_expression(test);
                    }
                    self.visit_statements(&case.consequent);
                }
            }
            Statement::LabeledStatement { body, .. } => self.visit_statement(body),
            Statement::ExportDeclaration { export, .. } => match export {
                Export::Declaration(inner) => self.visit_statement(inner),
                Export::Default(expr) => self.visit_expression(expr),
                Export::Named {
                    specifiers,
                    source: None,
                } => {
                    for (local, _) in specifiers {
                        self.reference(local);
                    }
                }
                Export::Named { .. } | Export::All { .. } => {}
            },
            Statement::EmptyStatement { .. }
            | Statement::BreakStatement { .. }
            | Statement::ContinueStatement { .. }
            | Statement::DebuggerStatement { .. }
            | Statement::ImportDeclaration { .. } => {}
        }
    }

    fn visit_declarators(&mut self, declarations: &[VariableDeclarator]) {
        for declarator in declarations {
            self.visit_pattern(&declarator.id);
            if let Some(init) = &declarator.init {
                self.visit_expression(init);
            }
        }
    }

    fn visit_pattern(&mut self, pattern: &Pattern) {
        match pattern {
            Pattern::Identifier { name, .. } => self.reference(name),
            Pattern::ObjectPattern {
                properties, rest, ..
            } => {
                for property in properties {
                    self.visit_property_key(&property.key);
                    self.visit_pattern(&property.value);
                }
                if let Some(rest) = rest {
                    self.visit_pattern(rest);
                }
            }
            Pattern::ArrayPattern { elements, rest, .. } => {
                for element in elements.iter().flatten() {
                    self.visit_pattern(element);
                }
                if let Some(rest) = rest {
                    self.visit_pattern(rest);
                }
            }
            Pattern::AssignmentPattern { left, right, .. } => {
                self.visit_pattern(left);
                self.visit_expression(right);
            }
            Pattern::RestElement { argument, .. } => self.visit_pattern(argument),
            Pattern::MemberExpression(expr) => self.visit_expression(expr),
        }
    }

    fn visit_property_key(&mut self, key: &PropertyKey) {
        if let PropertyKey::Computed(expr) = key {
            self.visit_expression(expr);
        }
    }

    fn visit_class(&mut self, class: &Class) {
        if let Some(super_class) = &class.super_class {
            self.visit_expression(super_class);
        }
        self.nested_function(&class.constructor, false);
        for element in &class.elements {
            if let ClassElement::MethodDefinition { key, function, .. } = element {
                self.visit_property_key(key);
                self.nested_function(function, false);
            }
        }
        let fields = ScopeAnalyzer::analyze_fields(&class.elements);
        self.nested_free.extend(fields.free);
    }

    fn visit_field(&mut self, element: &ClassElement) {
        if let ClassElement::PropertyDefinition { key, value, .. } = element {
            self.visit_property_key(key);
            if let Some(value) = value {
                self.visit_expression(value);
            }
        }
    }

    fn visit_expression(&mut self, expression: &Expression) {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, || self.visit_expression_kind(expression))
    }

    fn visit_expression_kind(&mut self, expression: &Expression) {
        match expression {
            Expression::Identifier { name, .. } => self.reference(name),
            Expression::Literal { .. }
            | Expression::RegExpLiteral { .. }
            | Expression::ThisExpression { .. }
            | Expression::SuperExpression { .. }
            | Expression::NewTarget { .. } => {}
            Expression::TemplateLiteral { expressions, .. } => {
                for expr in expressions {
                    self.visit_expression(expr);
                }
            }
            Expression::TaggedTemplate {
                tag, expressions, ..
            } => {
                self.visit_expression(tag);
                for expr in expressions {
                    self.visit_expression(expr);
                }
            }
            Expression::ArrayExpression { elements, .. } => {
                for element in elements.iter().flatten() {
                    self.visit_expression(element);
                }
            }
            Expression::ObjectExpression { properties, .. } => {
                for property in properties {
                    match property {
                        ObjectProperty::Property { key, value, .. } => {
                            self.visit_property_key(key);
                            self.visit_expression(value);
                        }
                        ObjectProperty::Method { key, function, .. } => {
                            self.visit_property_key(key);
                            self.nested_function(function, false);
                        }
                        ObjectProperty::SpreadElement(expr) => self.visit_expression(expr),
                    }
                }
            }
            Expression::FunctionExpression { function, .. } => {
                self.nested_function(function, true)
            }
            Expression::ArrowFunctionExpression { function, .. } => {
                self.nested_function(function, false)
            }
            Expression::ClassExpression { class, .. } => self.visit_class(class),
            Expression::UnaryExpression { argument, .. }
            | Expression::UpdateExpression { argument, .. }
            | Expression::SpreadElement { argument, .. }
            | Expression::AwaitExpression { argument, .. }
            | Expression::OptionalChain {
                expression: argument,
                ..
            } => self.visit_expression(argument),
            Expression::BinaryExpression { left, right, .. }
            | Expression::LogicalExpression { left, right, .. } => {
                self.visit_expression(left);
                self.visit_expression(right);
            }
            Expression::AssignmentExpression { left, right, .. } => {
                self.visit_pattern(left);
                self.visit_expression(right);
            }
            Expression::ConditionalExpression {
                test,
                consequent,
                alternate,
                ..
            } => {
                self.visit_expression(test);
                self.visit_expression(consequent);
                self.visit_expression(alternate);
            }
            Expression::CallExpression {
                callee, arguments, ..
            }
            | Expression::NewExpression {
                callee, arguments, ..
            } => {
                self.visit_expression(callee);
                for argument in arguments {
                    self.visit_expression(argument);
                }
            }
            Expression::MemberExpression {
                object, property, ..
            } => {
                self.visit_expression(object);
                if let MemberProperty::Computed(expr) = property {
                    self.visit_expression(expr);
                }
            }
            Expression::SequenceExpression { expressions, .. } => {
                for expr in expressions {
                    self.visit_expression(expr);
                }
            }
            Expression::YieldExpression { argument, .. } => {
                if let Some(argument) = argument {
                    self.visit_expression(argument);
                }
            }
        }
    }
}
