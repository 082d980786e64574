//! Hoisting set computation
//!
//! A function body (or script) declares every `var` found anywhere inside
//! it, skipping nested functions and classes, plus the functions and
//! lexical bindings that appear directly in its statement list. A block
//! only declares its direct lexical bindings and function declarations.

use crate::ast::{
    Export, ForInOfLeft, ForInit, HoistingSet, LexicalBinding, Statement, VariableKind,
};

/// Hoisting set of a function body or script
pub fn function_scope<'s>(body: impl IntoIterator<Item = &'s Statement> + Clone) -> HoistingSet {
    let mut set = HoistingSet::default();
    for statement in body.clone() {
        collect_vars(statement, &mut set);
    }
    collect_direct(body, &mut set);
    set
}

/// Hoisting set of a block or switch body
pub fn block_scope<'s>(body: impl IntoIterator<Item = &'s Statement>) -> HoistingSet {
    let mut set = HoistingSet::default();
    collect_direct(body, &mut set);
    set
}

impl HoistingSet {
    /// First name declared twice in a way the language forbids: two
    /// lexical declarations, or a lexical declaration clashing with a
    /// `var` or function of the same scope
    pub fn conflicting_name(&self) -> Option<&str> {
        for (i, binding) in self.lexical.iter().enumerate() {
            let name = binding.name.as_str();
            if self.lexical[..i].iter().any(|b| b.name == name)
                || self.var_names.iter().any(|n| n == name)
                || self.functions.iter().any(|n| n == name)
            {
                return Some(name);
            }
        }
        None
    }
}

fn collect_direct<'s>(body: impl IntoIterator<Item = &'s Statement>, set: &mut HoistingSet) {
    for statement in body {
        match statement {
            Statement::FunctionDeclaration { function, .. } => {
                if let Some(name) = &function.name {
                    if !set.functions.contains(name) {
                        set.functions.push(name.clone());
                    }
                }
            }
            Statement::ClassDeclaration { class, .. } => {
                if let Some(name) = &class.name {
                    set.lexical.push(LexicalBinding {
                        name: name.clone(),
                        is_const: false,
                    });
                }
            }
            Statement::VariableDeclaration {
                kind: kind @ (VariableKind::Let | VariableKind::Const),
                declarations,
                ..
            } => {
                let mut names = Vec::new();
                for declarator in declarations {
                    declarator.id.bound_names(&mut names);
                }
                set.lexical.extend(names.into_iter().map(|name| LexicalBinding {
                    name,
                    is_const: *kind == VariableKind::Const,
                }));
            }
            Statement::ExportDeclaration {
                export: Export::Declaration(inner),
                ..
            } => collect_direct(std::iter::once(inner.as_ref()), set),
            _ => {}
        }
    }
}

fn collect_vars(statement: &Statement, set: &mut HoistingSet) {
    let mut names = Vec::new();
    match statement {
        Statement::VariableDeclaration {
            kind: VariableKind::Var,
            declarations,
            ..
        } => {
            for declarator in declarations {
                declarator.id.bound_names(&mut names);
            }
        }
        Statement::IfStatement {
            consequent,
            alternate,
            ..
        } => {
            collect_vars(consequent, set);
            if let Some(alternate) = alternate {
                collect_vars(alternate, set);
            }
        }
        Statement::WhileStatement { body, .. }
        | Statement::DoWhileStatement { body, .. }
        | Statement::LabeledStatement { body, .. } => collect_vars(body, set),
        Statement::ForStatement { init, body, .. } => {
            if let Some(ForInit::VariableDeclaration {
                kind: VariableKind::Var,
                declarations,
            }) = init
            {
                for declarator in declarations {
                    declarator.id.bound_names(&mut names);
                }
            }
            // Head bindings precede the body's
            for name in names.drain(..) {
                set.add_var(&name);
            }
            collect_vars(body, set);
        }
        Statement::ForInStatement { left, body, .. }
        | Statement::ForOfStatement { left, body, .. } => {
            if let ForInOfLeft::VariableDeclaration {
                kind: VariableKind::Var,
                id,
            } = left
            {
                id.bound_names(&mut names);
            }
            for name in names.drain(..) {
                set.add_var(&name);
            }
            collect_vars(body, set);
        }
        Statement::BlockStatement(block) => {
            for statement in &block.body {
                collect_vars(statement, set);
            }
        }
        Statement::TryStatement {
            block,
            handler,
            finalizer,
            ..
        } => {
            let blocks = std::iter::once(block)
                .chain(handler.as_ref().map(|h| &h.body))
                .chain(finalizer.as_ref());
            for block in blocks {
                for statement in &block.body {
                    collect_vars(statement, set);
                }
            }
        }
        Statement::SwitchStatement { cases, .. } => {
            for statement in cases.iter().flat_map(|c| c.consequent.iter()) {
                collect_vars(statement, set);
            }
        }
        Statement::ExportDeclaration {
            export: Export::Declaration(inner),
            ..
        } => collect_vars(inner, set),
        _ => {}
    }
    for name in names {
        set.add_var(&name);
    }
}
