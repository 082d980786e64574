//! Statement lowering and the control stack

use bytecode_system::{completion, Opcode, RegisterId};
use core_types::{JsError, Span};

use super::patterns::BindMode;
use super::{BytecodeGenerator, Storage};
use crate::ast::*;
use crate::parser::{STACK_RED_ZONE, STACK_SEGMENT};

/// Constructs that `break`, `continue` and `return` must pass through
pub(super) enum Control {
    Loop {
        labels: Vec<String>,
        breaks: Vec<usize>,
        continues: Vec<usize>,
        /// Iterator record of a `for-of` loop, closed on early exit
        iterator: Option<RegisterId>,
    },
    Switch {
        labels: Vec<String>,
        breaks: Vec<usize>,
    },
    /// A labeled statement that is not a loop
    Label {
        labels: Vec<String>,
        breaks: Vec<usize>,
    },
    /// Inside a `try` block with a catch handler installed
    Handler,
    /// Inside a region protected by a `finally` block
    Finally(FinallyControl),
    /// Inside a `finally` block itself
    FinallyBody,
}

pub(super) struct FinallyControl {
    kind: RegisterId,
    value: RegisterId,
    /// Jumps into the finally block, patched once its start is known
    entries: Vec<usize>,
    /// Jumps that crossed the block and continue after it
    pending: Vec<PendingJump>,
}

#[derive(Clone, Copy)]
struct PendingJump {
    code: u32,
    /// Control stack index of the jump's target
    target: usize,
    is_continue: bool,
}

impl FinallyControl {
    fn code_for(&mut self, target: usize, is_continue: bool) -> u32 {
        if let Some(jump) = self
            .pending
            .iter()
            .find(|j| j.target == target && j.is_continue == is_continue)
        {
            return jump.code;
        }
        let code = completion::FIRST_JUMP + self.pending.len() as u32;
        self.pending.push(PendingJump {
            code,
            target,
            is_continue,
        });
        code
    }
}

/// What unwinding a control entry requires
enum Unwind {
    Nothing,
    PopTry,
    LeaveFinally,
    CloseIterator(RegisterId),
    Finally { kind: RegisterId, value: RegisterId },
}

impl Control {
    fn unwind(&self) -> Unwind {
        match self {
            Control::Handler => Unwind::PopTry,
            Control::FinallyBody => Unwind::LeaveFinally,
            Control::Loop {
                iterator: Some(iterator),
                ..
            } => Unwind::CloseIterator(*iterator),
            Control::Finally(finally) => Unwind::Finally {
                kind: finally.kind,
                value: finally.value,
            },
            _ => Unwind::Nothing,
        }
    }

    fn has_label(&self, label: &str) -> bool {
        match self {
            Control::Loop { labels, .. }
            | Control::Switch { labels, .. }
            | Control::Label { labels, .. } => labels.iter().any(|l| l == label),
            _ => false,
        }
    }
}

impl BytecodeGenerator {
    pub(super) fn compile_statements(&mut self, statements: &[Statement]) -> Result<(), JsError> {
        for statement in statements {
            self.compile_statement(statement)?;
        }
        Ok(())
    }

    /// Create the closures of the function declarations directly in `body`
    /// and store them into their (already declared) bindings
    pub(super) fn instantiate_functions(&mut self, body: &[Statement]) -> Result<(), JsError> {
        for statement in body {
            let function = match statement {
                Statement::FunctionDeclaration { function, .. } => function,
                Statement::ExportDeclaration {
                    export: Export::Declaration(inner),
                    ..
                } => match inner.as_ref() {
                    Statement::FunctionDeclaration { function, .. } => function,
                    _ => continue,
                },
                _ => continue,
            };
            let Some(name) = function.name.as_deref() else {
                continue;
            };
            self.set_position(function.span);
            self.compile_function(function, Some(name), false)?;
            self.store_name(name, BindMode::Initialize)?;
        }
        Ok(())
    }

    fn compile_statement(&mut self, statement: &Statement) -> Result<(), JsError> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, || {
            self.compile_statement_kind(statement)
        })
    }

    fn compile_statement_kind(&mut self, statement: &Statement) -> Result<(), JsError> {
        self.set_position(statement.span());
        match statement {
            Statement::VariableDeclaration {
                kind, declarations, ..
            } => self.compile_variable_declaration(*kind, declarations),
            // Instantiated on entry to the enclosing scope
            Statement::FunctionDeclaration { .. } => Ok(()),
            Statement::ClassDeclaration { class, .. } => {
                self.compile_class(class, None)?;
                match class.name.as_deref() {
                    Some(name) => self.store_name(name, BindMode::Initialize),
                    None => {
                        self.emit(Opcode::Pop);
                        Ok(())
                    }
                }
            }
            Statement::ExpressionStatement { expression, .. } => {
                self.compile_expression(expression)?;
                match self.current.completion {
                    Some(register) => self.emit(Opcode::StoreLocal(register)),
                    None => self.emit(Opcode::Pop),
                };
                Ok(())
            }
            Statement::ReturnStatement { argument, .. } => {
                match argument {
                    Some(argument) => self.compile_expression(argument)?,
                    None => {
                        self.emit(Opcode::LoadUndefined);
                    }
                }
                self.emit_return();
                Ok(())
            }
            Statement::IfStatement {
                test,
                consequent,
                alternate,
                ..
            } => {
                self.compile_expression(test)?;
                let else_jump = self.emit(Opcode::JumpIfFalse(0));
                self.compile_statement(consequent)?;
                match alternate {
                    Some(alternate) => {
                        let end_jump = self.emit(Opcode::Jump(0));
                        self.patch(else_jump);
                        self.compile_statement(alternate)?;
                        self.patch(end_jump);
                    }
                    None => self.patch(else_jump),
                }
                Ok(())
            }
            Statement::WhileStatement { .. }
            | Statement::DoWhileStatement { .. }
            | Statement::ForStatement { .. }
            | Statement::ForInStatement { .. }
            | Statement::ForOfStatement { .. } => self.compile_loop(statement, Vec::new()),
            Statement::BlockStatement(block) => self.compile_block(block),
            Statement::EmptyStatement { .. } => Ok(()),
            Statement::DebuggerStatement { .. } => {
                self.emit(Opcode::Nop);
                Ok(())
            }
            Statement::BreakStatement { label, span } => {
                let target = self.jump_target(label.as_deref(), false, *span)?;
                self.emit_jump(target, false);
                Ok(())
            }
            Statement::ContinueStatement { label, span } => {
                let target = self.jump_target(label.as_deref(), true, *span)?;
                self.emit_jump(target, true);
                Ok(())
            }
            Statement::ThrowStatement { argument, .. } => {
                self.compile_expression(argument)?;
                self.set_position(statement.span());
                self.emit(Opcode::Throw);
                Ok(())
            }
            Statement::TryStatement {
                block,
                handler,
                finalizer,
                ..
            } => self.compile_try(block, handler.as_ref(), finalizer.as_ref()),
            Statement::SwitchStatement {
                discriminant,
                cases,
                scope,
                ..
            } => self.compile_switch(discriminant, cases, scope, Vec::new()),
            Statement::LabeledStatement { .. } => self.compile_labeled(statement, Vec::new()),
            Statement::ImportDeclaration { span, .. } => {
                Err(self.unsupported(*span, "import declarations"))
            }
            Statement::ExportDeclaration { export, span } => match export {
                Export::Declaration(inner) => self.compile_statement(inner),
                Export::Default(expression) => {
                    self.compile_named_expression(expression, "default")?;
                    self.emit(Opcode::Pop);
                    Ok(())
                }
                Export::Named { source: None, .. } => Ok(()),
                Export::Named { .. } | Export::All { .. } => {
                    Err(self.unsupported(*span, "re-exports"))
                }
            },
        }
    }

    fn compile_variable_declaration(
        &mut self,
        kind: VariableKind,
        declarations: &[VariableDeclarator],
    ) -> Result<(), JsError> {
        let mode = match kind {
            VariableKind::Var => BindMode::Assign,
            VariableKind::Let | VariableKind::Const => BindMode::Initialize,
        };
        for declarator in declarations {
            self.set_position(declarator.span);
            match &declarator.init {
                Some(init) => match declarator.id.as_identifier() {
                    Some(name) => self.compile_named_expression(init, name)?,
                    None => self.compile_expression(init)?,
                },
                None if kind == VariableKind::Var => continue,
                None => {
                    self.emit(Opcode::LoadUndefined);
                }
            }
            self.bind_pattern(&declarator.id, mode)?;
        }
        Ok(())
    }

    /// Declare the lexical names and block-level functions of `scope` in a
    /// new innermost scope
    fn enter_block_scope(&mut self, scope: &HoistingSet) {
        self.push_scope();
        for binding in &scope.lexical {
            self.declare(&binding.name, binding.is_const);
        }
        for name in &scope.functions {
            self.declare(name, false);
        }
        self.refresh_scope_cells();
    }

    pub(super) fn compile_block(&mut self, block: &Block) -> Result<(), JsError> {
        self.enter_block_scope(&block.scope);
        self.instantiate_functions(&block.body)?;
        self.compile_statements(&block.body)?;
        self.pop_scope();
        Ok(())
    }

    fn compile_labeled(
        &mut self,
        statement: &Statement,
        mut labels: Vec<String>,
    ) -> Result<(), JsError> {
        match statement {
            Statement::LabeledStatement { label, body, .. } => {
                labels.push(label.clone());
                self.compile_labeled(body, labels)
            }
            Statement::WhileStatement { .. }
            | Statement::DoWhileStatement { .. }
            | Statement::ForStatement { .. }
            | Statement::ForInStatement { .. }
            | Statement::ForOfStatement { .. } => {
                self.set_position(statement.span());
                self.compile_loop(statement, labels)
            }
            Statement::SwitchStatement {
                discriminant,
                cases,
                scope,
                ..
            } => {
                self.set_position(statement.span());
                self.compile_switch(discriminant, cases, scope, labels)
            }
            _ => {
                self.current.control.push(Control::Label {
                    labels,
                    breaks: Vec::new(),
                });
                self.compile_statement(statement)?;
                if let Some(Control::Label { breaks, .. }) = self.current.control.pop() {
                    for jump in breaks {
                        self.patch(jump);
                    }
                }
                Ok(())
            }
        }
    }

    fn push_loop(&mut self, labels: Vec<String>, iterator: Option<RegisterId>) {
        self.current.control.push(Control::Loop {
            labels,
            breaks: Vec::new(),
            continues: Vec::new(),
            iterator,
        });
    }

    /// Pop the innermost loop, returning its break and continue jumps
    fn pop_loop(&mut self) -> (Vec<usize>, Vec<usize>) {
        match self.current.control.pop() {
            Some(Control::Loop {
                breaks, continues, ..
            }) => (breaks, continues),
            _ => (Vec::new(), Vec::new()),
        }
    }

    fn compile_loop(&mut self, statement: &Statement, labels: Vec<String>) -> Result<(), JsError> {
        match statement {
            Statement::WhileStatement { test, body, .. } => {
                let top = self.here();
                self.compile_expression(test)?;
                let exit = self.emit(Opcode::JumpIfFalse(0));
                self.push_loop(labels, None);
                self.compile_statement(body)?;
                let (breaks, continues) = self.pop_loop();
                for jump in continues {
                    self.patch_to(jump, top);
                }
                self.emit(Opcode::Jump(top));
                self.patch(exit);
                for jump in breaks {
                    self.patch(jump);
                }
                Ok(())
            }
            Statement::DoWhileStatement { body, test, .. } => {
                let top = self.here();
                self.push_loop(labels, None);
                self.compile_statement(body)?;
                let (breaks, continues) = self.pop_loop();
                for jump in continues {
                    self.patch(jump);
                }
                self.compile_expression(test)?;
                self.emit(Opcode::JumpIfTrue(top));
                for jump in breaks {
                    self.patch(jump);
                }
                Ok(())
            }
            Statement::ForStatement {
                init,
                test,
                update,
                body,
                ..
            } => self.compile_for(init.as_ref(), test.as_ref(), update.as_ref(), body, labels),
            Statement::ForInStatement {
                left, right, body, ..
            } => self.compile_for_in_of(left, right, body, labels, false),
            Statement::ForOfStatement {
                left, right, body, ..
            } => self.compile_for_in_of(left, right, body, labels, true),
            _ => self.compile_statement(statement),
        }
    }

    fn compile_for(
        &mut self,
        init: Option<&ForInit>,
        test: Option<&Expression>,
        update: Option<&Expression>,
        body: &Statement,
        labels: Vec<String>,
    ) -> Result<(), JsError> {
        self.push_scope();
        let mut per_iteration = Vec::new();
        match init {
            Some(ForInit::VariableDeclaration { kind, declarations }) => {
                if *kind != VariableKind::Var {
                    let mut names = Vec::new();
                    for declarator in declarations {
                        declarator.id.bound_names(&mut names);
                    }
                    for name in &names {
                        let binding = self.declare(name, *kind == VariableKind::Const);
                        if let Storage::Cell(cell) = binding.storage {
                            self.emit(Opcode::FreshCell(cell));
                            if *kind == VariableKind::Let {
                                per_iteration.push(cell);
                            }
                        }
                    }
                }
                self.compile_variable_declaration(*kind, declarations)?;
            }
            Some(ForInit::Expression(expression)) => {
                self.compile_expression(expression)?;
                self.emit(Opcode::Pop);
            }
            None => {}
        }

        self.copy_cells(&per_iteration);
        let top = self.here();
        let exit = match test {
            Some(test) => {
                self.compile_expression(test)?;
                Some(self.emit(Opcode::JumpIfFalse(0)))
            }
            None => None,
        };
        self.push_loop(labels, None);
        self.compile_statement(body)?;
        let (breaks, continues) = self.pop_loop();
        for jump in continues {
            self.patch(jump);
        }
        self.copy_cells(&per_iteration);
        if let Some(update) = update {
            self.compile_expression(update)?;
            self.emit(Opcode::Pop);
        }
        self.emit(Opcode::Jump(top));
        if let Some(exit) = exit {
            self.patch(exit);
        }
        for jump in breaks {
            self.patch(jump);
        }
        self.pop_scope();
        Ok(())
    }

    /// Move each cell's value into a fresh cell so closures of the previous
    /// iteration keep the old one
    fn copy_cells(&mut self, cells: &[u32]) {
        for &cell in cells {
            self.emit(Opcode::LoadCell(cell));
            self.emit(Opcode::FreshCell(cell));
            self.emit(Opcode::StoreCell(cell));
        }
    }

    fn compile_for_in_of(
        &mut self,
        left: &ForInOfLeft,
        right: &Expression,
        body: &Statement,
        labels: Vec<String>,
        is_for_of: bool,
    ) -> Result<(), JsError> {
        self.compile_expression(right)?;
        self.emit(if is_for_of {
            Opcode::GetIterator
        } else {
            Opcode::ForInKeys
        });
        let iterator = self.register();
        self.emit(Opcode::StoreLocal(iterator));

        let top = self.here();
        let exit = self.emit(Opcode::IteratorStep { iterator, exit: 0 });
        self.push_scope();
        match left {
            ForInOfLeft::VariableDeclaration { kind, id } => {
                if *kind != VariableKind::Var {
                    let mut names = Vec::new();
                    id.bound_names(&mut names);
                    for name in &names {
                        self.declare(name, *kind == VariableKind::Const);
                    }
                    self.refresh_scope_cells();
                    self.bind_pattern(id, BindMode::Initialize)?;
                } else {
                    self.bind_pattern(id, BindMode::Assign)?;
                }
            }
            ForInOfLeft::Pattern(pattern) => self.bind_pattern(pattern, BindMode::Assign)?,
        }
        self.push_loop(labels, is_for_of.then_some(iterator));
        self.compile_statement(body)?;
        let (breaks, continues) = self.pop_loop();
        self.pop_scope();
        for jump in continues {
            self.patch_to(jump, top);
        }
        self.emit(Opcode::Jump(top));
        self.patch(exit);
        for jump in breaks {
            self.patch(jump);
        }
        Ok(())
    }

    fn compile_switch(
        &mut self,
        discriminant: &Expression,
        cases: &[SwitchCase],
        scope: &HoistingSet,
        labels: Vec<String>,
    ) -> Result<(), JsError> {
        self.compile_expression(discriminant)?;
        let value = self.register();
        self.emit(Opcode::StoreLocal(value));

        self.enter_block_scope(scope);
        for case in cases {
            self.instantiate_functions(&case.consequent)?;
        }

        let mut case_jumps = Vec::with_capacity(cases.len());
        for case in cases {
            match &case.test {
                Some(test) => {
                    self.emit(Opcode::LoadLocal(value));
                    self.compile_expression(test)?;
                    self.emit(Opcode::StrictEqual);
                    case_jumps.push(Some(self.emit(Opcode::JumpIfTrue(0))));
                }
                None => case_jumps.push(None),
            }
        }
        let default_jump = self.emit(Opcode::Jump(0));
        let mut default_patched = false;

        self.current.control.push(Control::Switch {
            labels,
            breaks: Vec::new(),
        });
        for (case, jump) in cases.iter().zip(case_jumps) {
            match jump {
                Some(jump) => self.patch(jump),
                None => {
                    self.patch(default_jump);
                    default_patched = true;
                }
            }
            self.compile_statements(&case.consequent)?;
        }
        let breaks = match self.current.control.pop() {
            Some(Control::Switch { breaks, .. }) => breaks,
            _ => Vec::new(),
        };
        if !default_patched {
            self.patch(default_jump);
        }
        for jump in breaks {
            self.patch(jump);
        }
        self.pop_scope();
        Ok(())
    }

    fn compile_try(
        &mut self,
        block: &Block,
        handler: Option<&CatchClause>,
        finalizer: Option<&Block>,
    ) -> Result<(), JsError> {
        let finally = match finalizer {
            Some(_) => {
                let kind = self.register();
                let value = self.register();
                let push = self.emit(Opcode::PushFinally {
                    target: 0,
                    kind,
                    value,
                });
                self.current.control.push(Control::Finally(FinallyControl {
                    kind,
                    value,
                    entries: vec![push],
                    pending: Vec::new(),
                }));
                Some((kind, value))
            }
            None => None,
        };

        match handler {
            Some(handler) => {
                let push = self.emit(Opcode::PushTry(0));
                self.current.control.push(Control::Handler);
                self.compile_block(block)?;
                self.current.control.pop();
                self.emit(Opcode::PopTry);
                let skip = self.emit(Opcode::Jump(0));

                // The thrown value is on the stack
                self.patch(push);
                self.set_position(handler.span);
                self.push_scope();
                match &handler.param {
                    Some(param) => {
                        let mut names = Vec::new();
                        param.bound_names(&mut names);
                        for name in &names {
                            self.declare(name, false);
                        }
                        self.refresh_scope_cells();
                        self.bind_pattern(param, BindMode::Initialize)?;
                    }
                    None => {
                        self.emit(Opcode::Pop);
                    }
                }
                self.compile_block(&handler.body)?;
                self.pop_scope();
                self.patch(skip);
            }
            None => self.compile_block(block)?,
        }

        let (Some((kind, value)), Some(finalizer)) = (finally, finalizer) else {
            return Ok(());
        };
        let control = match self.current.control.pop() {
            Some(Control::Finally(control)) => control,
            _ => return Err(JsError::internal("unbalanced finally control")),
        };
        self.emit(Opcode::PopTry);
        self.emit(Opcode::SetCompletion {
            kind,
            code: completion::NORMAL,
        });

        let start = self.here();
        for entry in &control.entries {
            self.patch_to(*entry, start);
        }
        self.emit(Opcode::EnterFinally { kind, value });
        self.current.control.push(Control::FinallyBody);
        self.compile_block(finalizer)?;
        self.current.control.pop();
        self.emit(Opcode::EndFinally);

        let on_return = self.emit(Opcode::JumpIfCompletion {
            kind,
            code: completion::RETURN,
            target: 0,
        });
        let on_throw = self.emit(Opcode::JumpIfCompletion {
            kind,
            code: completion::THROW,
            target: 0,
        });
        let on_jump: Vec<(usize, PendingJump)> = control
            .pending
            .iter()
            .map(|jump| {
                let branch = self.emit(Opcode::JumpIfCompletion {
                    kind,
                    code: jump.code,
                    target: 0,
                });
                (branch, *jump)
            })
            .collect();
        let done = self.emit(Opcode::Jump(0));

        self.patch(on_return);
        self.emit(Opcode::LoadLocal(value));
        self.emit_return();
        self.patch(on_throw);
        self.emit(Opcode::LoadLocal(value));
        self.emit(Opcode::Throw);
        for (branch, jump) in on_jump {
            self.patch(branch);
            self.emit_jump(jump.target, jump.is_continue);
        }
        self.patch(done);
        Ok(())
    }

    /// Control stack index targeted by a `break` or `continue`
    fn jump_target(
        &self,
        label: Option<&str>,
        is_continue: bool,
        span: Span,
    ) -> Result<usize, JsError> {
        let control = &self.current.control;
        let found = control.iter().rposition(|entry| match (label, entry) {
            (Some(label), Control::Loop { .. }) => entry.has_label(label),
            (Some(label), _) if !is_continue => entry.has_label(label),
            (None, Control::Loop { .. }) => true,
            (None, Control::Switch { .. }) => !is_continue,
            _ => false,
        });
        found.ok_or_else(|| {
            let message = match (label, is_continue) {
                (Some(label), _) => format!("Undefined label '{}'", label),
                (None, true) => "Illegal continue statement".to_string(),
                (None, false) => "Illegal break statement".to_string(),
            };
            self.syntax_error(span, message)
        })
    }

    /// Jump to the break or continue point of the control entry at `target`,
    /// unwinding everything in between
    pub(super) fn emit_jump(&mut self, target: usize, is_continue: bool) {
        let mut index = self.current.control.len();
        while index > target + 1 {
            index -= 1;
            match self.current.control[index].unwind() {
                Unwind::Nothing => {}
                Unwind::PopTry => {
                    self.emit(Opcode::PopTry);
                }
                Unwind::LeaveFinally => {
                    self.emit(Opcode::LeaveFinally);
                }
                Unwind::CloseIterator(iterator) => {
                    self.emit(Opcode::IteratorClose(iterator));
                }
                Unwind::Finally { kind, .. } => {
                    let code = match &mut self.current.control[index] {
                        Control::Finally(finally) => finally.code_for(target, is_continue),
                        _ => completion::NORMAL,
                    };
                    self.emit(Opcode::SetCompletion { kind, code });
                    self.emit(Opcode::PopTry);
                    let entry = self.emit(Opcode::Jump(0));
                    if let Control::Finally(finally) = &mut self.current.control[index] {
                        finally.entries.push(entry);
                    }
                    return;
                }
            }
        }

        if !is_continue {
            if let Some(Control::Loop {
                iterator: Some(iterator),
                ..
            }) = self.current.control.get(target)
            {
                let iterator = *iterator;
                self.emit(Opcode::IteratorClose(iterator));
            }
        }
        let jump = self.emit(Opcode::Jump(0));
        match self.current.control.get_mut(target) {
            Some(Control::Loop {
                breaks, continues, ..
            }) => {
                if is_continue {
                    continues.push(jump)
                } else {
                    breaks.push(jump)
                }
            }
            Some(Control::Switch { breaks, .. }) | Some(Control::Label { breaks, .. }) => {
                breaks.push(jump)
            }
            _ => {}
        }
    }

    /// Return the value on top of the stack, running pending finally blocks
    pub(super) fn emit_return(&mut self) {
        let mut index = self.current.control.len();
        while index > 0 {
            index -= 1;
            match self.current.control[index].unwind() {
                Unwind::Nothing => {}
                Unwind::PopTry => {
                    self.emit(Opcode::PopTry);
                }
                Unwind::LeaveFinally => {
                    self.emit(Opcode::LeaveFinally);
                }
                Unwind::CloseIterator(iterator) => {
                    self.emit(Opcode::IteratorClose(iterator));
                }
                Unwind::Finally { kind, value } => {
                    self.emit(Opcode::StoreLocal(value));
                    self.emit(Opcode::SetCompletion {
                        kind,
                        code: completion::RETURN,
                    });
                    self.emit(Opcode::PopTry);
                    let entry = self.emit(Opcode::Jump(0));
                    if let Control::Finally(finally) = &mut self.current.control[index] {
                        finally.entries.push(entry);
                    }
                    return;
                }
            }
        }
        self.emit(Opcode::Return);
    }
}
