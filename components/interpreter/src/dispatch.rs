//! Dispatch loop for bytecode execution
//!
//! Handles individual opcode execution. [`ExecutionContext::run_frame`]
//! executes one frame until it returns, yields or throws past its last
//! handler. Script-to-script calls recurse through the native stack; the
//! call depth budget in [`ExecutionContext`] bounds that recursion.
//!
//! Exceptions unwind to the innermost handler of the frame. A finally
//! handler receives the exception as a pending completion in its two
//! registers; finally blocks that were executing when an exception
//! replaced their own pending exception chain it as suppressed.

use bytecode_system::{completion, Constant, Opcode};
use core_types::ErrorKind;

use crate::call_frame::{CallFrame, FinallyRecord, HandlerKind, Resumption};
use crate::completion::{Completion, Throw};
use crate::context::ExecutionContext;
use crate::function::constructor_name;
use crate::conversion::{to_boolean, to_int32, to_uint32};
use crate::object::{Attributes, Object, ObjectKind, ObjectRef};
use crate::value::{PropertyKey, Value};

impl ExecutionContext {
    /// Run `frame` until it completes. A pending generator resumption is
    /// applied first.
    pub(crate) fn run_frame(&mut self, frame: &mut CallFrame) -> Result<Completion, Throw> {
        let new_target = frame.new_target.as_object().and_then(constructor_name);
        self.with_call(
            frame.chunk.name.clone(),
            Some(frame.chunk.clone()),
            new_target,
            |cx| cx.execute(frame),
        )
    }

    fn execute(&mut self, frame: &mut CallFrame) -> Result<Completion, Throw> {
        if let Some(resumption) = frame.resume.take() {
            let at_delegate = matches!(
                frame.chunk.instructions.get(frame.ip).map(|i| &i.opcode),
                Some(Opcode::YieldDelegate(_))
            );
            if at_delegate {
                // yield* forwards the resumption to the inner iterator
                frame.resume = Some(resumption);
            } else {
                match resumption {
                    Resumption::Next(value) => frame.push(value),
                    Resumption::Throw(value) => self.unwind(frame, Throw::new(value))?,
                    Resumption::Return(value) => {
                        if let Some(completion) = self.begin_return(frame, value) {
                            return Ok(completion);
                        }
                    }
                }
            }
        }

        let chunk = frame.chunk.clone();
        while let Some(instruction) = chunk.instructions.get(frame.ip) {
            self.set_ip(frame.ip);
            frame.ip += 1;
            match self.step(frame, &instruction.opcode) {
                Ok(None) => {}
                Ok(Some(completion)) => return Ok(completion),
                Err(throw) => self.unwind(frame, throw)?,
            }
        }
        Ok(Completion::Return(Value::Undefined))
    }

    /// Transfer control to the innermost handler, or give the exception
    /// back when the frame has none
    fn unwind(&mut self, frame: &mut CallFrame, throw: Throw) -> Result<(), Throw> {
        let Some(handler) = frame.handlers.pop() else {
            let discarded = std::mem::take(&mut frame.finally_records);
            return Err(self.chain_suppressed(frame, &discarded, throw));
        };
        let depth = handler.finally_depth.min(frame.finally_records.len());
        let discarded = frame.finally_records.split_off(depth);
        let throw = self.chain_suppressed(frame, &discarded, throw);
        frame.stack.truncate(handler.stack_depth);
        match handler.kind {
            HandlerKind::Catch => frame.push(throw.value),
            HandlerKind::Finally { kind, value } => {
                frame.set_register(kind, Value::from(completion::THROW));
                frame.set_register(value, throw.value);
            }
        }
        frame.ip = handler.target;
        Ok(())
    }

    /// Chain exceptions that were pending in abandoned finally blocks
    fn chain_suppressed(
        &mut self,
        frame: &CallFrame,
        records: &[FinallyRecord],
        mut throw: Throw,
    ) -> Throw {
        for record in records.iter().rev() {
            if frame.register(record.kind) != Value::from(completion::THROW) {
                continue;
            }
            let earlier = frame.register(record.value);
            log::debug!("exception {} suppressed by {}", earlier, throw.value);
            if let Value::Object(error) = &throw.value {
                let key = PropertyKey::from("suppressed");
                if matches!(error.borrow().kind, ObjectKind::Error(_)) && !error.has_own_property(&key) {
                    error.insert(key, earlier.clone(), Attributes::HIDDEN);
                }
            }
            throw = throw.with_suppressed(Throw::new(earlier));
        }
        throw
    }

    /// Start returning `value`, running the innermost enclosing finally
    /// block first. Returns the completion when no finally block is active.
    fn begin_return(&mut self, frame: &mut CallFrame, value: Value) -> Option<Completion> {
        while let Some(handler) = frame.handlers.pop() {
            if let HandlerKind::Finally { kind, value: slot } = handler.kind {
                frame.finally_records.truncate(handler.finally_depth);
                frame.stack.truncate(handler.stack_depth);
                frame.set_register(kind, Value::from(completion::RETURN));
                frame.set_register(slot, value);
                frame.ip = handler.target;
                return None;
            }
        }
        frame.finally_records.clear();
        Some(Completion::Return(value))
    }

    fn step(&mut self, frame: &mut CallFrame, opcode: &Opcode) -> Result<Option<Completion>, Throw> {
        let strict = frame.chunk.strict;
        match opcode {
            // Literals
            Opcode::LoadConstant(index) => {
                let value = match frame.chunk.constants.get(*index) {
                    Some(Constant::Number(n)) => Value::Number(*n),
                    Some(Constant::String(s)) => Value::String(s.clone()),
                    None => return Err(self.internal_error("constant index out of range")),
                };
                frame.push(value);
            }
            Opcode::LoadUndefined => frame.push(Value::Undefined),
            Opcode::LoadNull => frame.push(Value::Null),
            Opcode::LoadTrue => frame.push(Value::Boolean(true)),
            Opcode::LoadFalse => frame.push(Value::Boolean(false)),
            Opcode::LoadThis => {
                let Some(this) = frame.this.clone() else {
                    return Err(self.reference_error(
                        "Must call super constructor in derived class before accessing 'this' or returning from derived constructor",
                    ));
                };
                frame.push(this);
            }
            Opcode::LoadNewTarget => frame.push(frame.new_target.clone()),
            Opcode::LoadCallee => {
                let callee = frame.callee.clone().map(Value::Object).unwrap_or_default();
                frame.push(callee);
            }
            Opcode::CreateArguments => {
                let arguments = self.create_arguments_object(&frame.arguments);
                frame.push(Value::Object(arguments));
            }
            Opcode::CreateRestArray(start) => {
                let rest = frame
                    .arguments
                    .get(*start as usize..)
                    .map(<[Value]>::to_vec)
                    .unwrap_or_default();
                frame.push(Value::Object(self.create_array(rest)));
            }

            // Variables
            Opcode::LoadGlobal(name) => {
                let global = self.global_object();
                let key = PropertyKey::from(name.clone());
                if !self.has_property(&global, &key) {
                    return Err(self.reference_error(format!("{} is not defined", name)));
                }
                let value = self.get(&global, &key)?;
                frame.push(value);
            }
            Opcode::LoadGlobalOrUndefined(name) => {
                let global = self.global_object();
                let value = self.get(&global, &PropertyKey::from(name.clone()))?;
                frame.push(value);
            }
            Opcode::StoreGlobal(name) => {
                let value = frame.pop();
                let global = self.global_object();
                let key = PropertyKey::from(name.clone());
                if strict && !self.has_property(&global, &key) {
                    return Err(self.reference_error(format!("{} is not defined", name)));
                }
                self.set(&global, key, value, strict)?;
            }
            Opcode::DeclareGlobal(name) => {
                let global = self.global_object();
                let key = PropertyKey::from(name.clone());
                if !global.has_own_property(&key) {
                    let attributes = Attributes {
                        writable: true,
                        enumerable: true,
                        configurable: false,
                    };
                    self.define_data_property(&global, key, Value::Undefined, attributes)?;
                }
            }
            Opcode::DeleteGlobal(name) => {
                let global = self.global_object();
                let deleted = global.borrow_mut().delete_own(&PropertyKey::from(name.clone()));
                frame.push(Value::Boolean(deleted));
            }
            Opcode::LoadLocal(register) => frame.push(frame.register(*register)),
            Opcode::StoreLocal(register) => {
                let value = frame.pop();
                frame.set_register(*register, value);
            }
            Opcode::LoadCell(index) => {
                let value = frame.cell(*index).map(|cell| cell.get()).unwrap_or_default();
                frame.push(value);
            }
            Opcode::StoreCell(index) => {
                let value = frame.pop();
                if let Some(cell) = frame.cell(*index) {
                    cell.set(value);
                }
            }
            Opcode::FreshCell(index) => {
                if let Some(cell) = frame.cells.get_mut(*index as usize) {
                    *cell = crate::upvalue::Upvalue::new(cell.get());
                }
            }
            Opcode::LoadUpvalue(index) => {
                let value = frame.upvalue(*index).map(|cell| cell.get()).unwrap_or_default();
                frame.push(value);
            }
            Opcode::StoreUpvalue(index) => {
                let value = frame.pop();
                if let Some(cell) = frame.upvalue(*index) {
                    cell.set(value);
                }
            }
            Opcode::ThrowConstAssignment(_) => {
                return Err(self.type_error("Assignment to constant variable."));
            }

            // Arithmetic
            Opcode::Add => {
                let b = frame.pop();
                let a = frame.pop();
                let result = self.add(&a, &b)?;
                frame.push(result);
            }
            Opcode::Sub | Opcode::Mul | Opcode::Div | Opcode::Mod | Opcode::Exp => {
                let b = frame.pop();
                let a = frame.pop();
                let a = self.to_number(&a)?;
                let b = self.to_number(&b)?;
                let result = match opcode {
                    Opcode::Sub => a - b,
                    Opcode::Mul => a * b,
                    Opcode::Div => a / b,
                    Opcode::Mod => a % b,
                    _ => exponentiate(a, b),
                };
                frame.push(Value::Number(result));
            }
            Opcode::Neg => {
                let value = frame.pop();
                let n = self.to_number(&value)?;
                frame.push(Value::Number(-n));
            }
            Opcode::Plus | Opcode::ToNumeric => {
                let value = frame.pop();
                let n = self.to_number(&value)?;
                frame.push(Value::Number(n));
            }
            Opcode::Inc | Opcode::Dec => {
                let value = frame.pop();
                let n = self.to_number(&value)?;
                let delta = if matches!(opcode, Opcode::Inc) { 1.0 } else { -1.0 };
                frame.push(Value::Number(n + delta));
            }
            Opcode::Not => {
                let value = frame.pop();
                frame.push(Value::Boolean(!to_boolean(&value)));
            }
            Opcode::BitNot => {
                let value = frame.pop();
                let n = self.to_number(&value)?;
                frame.push(Value::from(!to_int32(n)));
            }
            Opcode::BitAnd
            | Opcode::BitOr
            | Opcode::BitXor
            | Opcode::Shl
            | Opcode::Shr
            | Opcode::UShr => {
                let b = frame.pop();
                let a = frame.pop();
                let a = self.to_number(&a)?;
                let b = self.to_number(&b)?;
                let shift = to_uint32(b) & 31;
                let result = match opcode {
                    Opcode::BitAnd => (to_int32(a) & to_int32(b)) as f64,
                    Opcode::BitOr => (to_int32(a) | to_int32(b)) as f64,
                    Opcode::BitXor => (to_int32(a) ^ to_int32(b)) as f64,
                    Opcode::Shl => to_int32(a).wrapping_shl(shift) as f64,
                    Opcode::Shr => (to_int32(a) >> shift) as f64,
                    _ => (to_uint32(a) >> shift) as f64,
                };
                frame.push(Value::Number(result));
            }
            Opcode::ToPropertyKey => {
                let value = frame.pop();
                let key = self.to_property_key(&value)?;
                frame.push(key.to_value());
            }
            Opcode::Stringify => {
                let value = frame.pop();
                let s = self.to_string(&value)?;
                frame.push(Value::String(s));
            }
            Opcode::Typeof => {
                let value = frame.pop();
                frame.push(Value::from(value.type_of()));
            }

            // Comparison
            Opcode::Equal | Opcode::NotEqual => {
                let b = frame.pop();
                let a = frame.pop();
                let equal = self.loose_equals(&a, &b)?;
                frame.push(Value::Boolean(equal == matches!(opcode, Opcode::Equal)));
            }
            Opcode::StrictEqual => {
                let b = frame.pop();
                let a = frame.pop();
                frame.push(Value::Boolean(a.strict_equals(&b)));
            }
            Opcode::StrictNotEqual => {
                let b = frame.pop();
                let a = frame.pop();
                frame.push(Value::Boolean(!a.strict_equals(&b)));
            }
            Opcode::LessThan => {
                let b = frame.pop();
                let a = frame.pop();
                let result = self.less_than(&a, &b, true)? == Some(true);
                frame.push(Value::Boolean(result));
            }
            Opcode::GreaterThan => {
                let b = frame.pop();
                let a = frame.pop();
                let result = self.less_than(&b, &a, false)? == Some(true);
                frame.push(Value::Boolean(result));
            }
            Opcode::LessThanEqual => {
                let b = frame.pop();
                let a = frame.pop();
                let result = self.less_than(&b, &a, false)? == Some(false);
                frame.push(Value::Boolean(result));
            }
            Opcode::GreaterThanEqual => {
                let b = frame.pop();
                let a = frame.pop();
                let result = self.less_than(&a, &b, true)? == Some(false);
                frame.push(Value::Boolean(result));
            }
            Opcode::Instanceof => {
                let constructor = frame.pop();
                let value = frame.pop();
                let result = self.instance_of(&value, &constructor)?;
                frame.push(Value::Boolean(result));
            }
            Opcode::In => {
                let object = frame.pop();
                let key = frame.pop();
                let Value::Object(target) = &object else {
                    return Err(self.type_error(format!(
                        "Cannot use 'in' operator to search for '{}' in {}",
                        key, object
                    )));
                };
                let key = self.to_property_key(&key)?;
                frame.push(Value::Boolean(self.has_property(target, &key)));
            }

            // Control flow
            Opcode::Jump(target) => frame.ip = *target,
            Opcode::JumpIfTrue(target) => {
                if to_boolean(&frame.pop()) {
                    frame.ip = *target;
                }
            }
            Opcode::JumpIfFalse(target) => {
                if !to_boolean(&frame.pop()) {
                    frame.ip = *target;
                }
            }
            Opcode::JumpIfNullish(target) => {
                if frame.pop().is_nullish() {
                    frame.ip = *target;
                }
            }
            Opcode::JumpIfNotNullish(target) => {
                if !frame.pop().is_nullish() {
                    frame.ip = *target;
                }
            }
            Opcode::OptionalChainExit { target, depth } => {
                if frame.peek(*depth as usize).is_nullish() {
                    frame.pop_n(*depth as usize + 1);
                    frame.push(Value::Undefined);
                    frame.ip = *target;
                }
            }
            Opcode::Return => return Ok(Some(Completion::Return(frame.pop()))),

            // Exception handling
            Opcode::Throw => return Err(Throw::new(frame.pop())),
            Opcode::PushTry(target) => frame.push_handler(HandlerKind::Catch, *target),
            Opcode::PushFinally {
                target,
                kind,
                value,
            } => frame.push_handler(
                HandlerKind::Finally {
                    kind: *kind,
                    value: *value,
                },
                *target,
            ),
            Opcode::PopTry => {
                frame.handlers.pop();
            }
            Opcode::EnterFinally { kind, value } => {
                frame.finally_records.push(FinallyRecord {
                    kind: *kind,
                    value: *value,
                });
            }
            Opcode::EndFinally | Opcode::LeaveFinally => {
                frame.finally_records.pop();
            }
            Opcode::SetCompletion { kind, code } => {
                frame.set_register(*kind, Value::from(*code));
            }
            Opcode::JumpIfCompletion { kind, code, target } => {
                if frame.register(*kind).strict_equals(&Value::from(*code)) {
                    frame.ip = *target;
                }
            }
            Opcode::RequireObjectCoercible => {
                let value = frame.peek(0);
                if value.is_nullish() {
                    return Err(self.type_error(format!("Cannot destructure '{}' as it is {}.", value, value)));
                }
            }

            // Objects and arrays
            Opcode::CreateObject => {
                let object = self.create_object();
                frame.push(Value::Object(object));
            }
            Opcode::CreateArray(count) => {
                let values = frame.pop_n(*count as usize);
                frame.push(Value::Object(self.create_array(values)));
            }
            Opcode::ArrayPush => {
                let value = frame.pop();
                if let Value::Object(array) = frame.peek(0) {
                    if let Some(storage) = array.borrow_mut().as_array_mut() {
                        storage.push(value);
                    }
                }
            }
            Opcode::ArrayPushHole => {
                if let Value::Object(array) = frame.peek(0) {
                    if let Some(storage) = array.borrow_mut().as_array_mut() {
                        storage.push_hole();
                    }
                }
            }
            Opcode::ArraySpread => {
                let iterable = frame.pop();
                let values = self.iterate_to_vec(&iterable)?;
                if let Value::Object(array) = frame.peek(0) {
                    if let Some(storage) = array.borrow_mut().as_array_mut() {
                        for value in values {
                            storage.push(value);
                        }
                    }
                }
            }
            Opcode::LoadProperty(name) => {
                let object = frame.pop();
                let value = self.get_value(&object, &PropertyKey::from(name.clone()))?;
                frame.push(value);
            }
            Opcode::StoreProperty(name) => {
                let value = frame.pop();
                let object = frame.pop();
                self.put_value(&object, PropertyKey::from(name.clone()), value.clone(), strict)?;
                frame.push(value);
            }
            Opcode::GetIndex => {
                let key = frame.pop();
                let object = frame.pop();
                if object.is_nullish() {
                    return Err(self.type_error(format!(
                        "Cannot read properties of {} (reading '{}')",
                        object, key
                    )));
                }
                let key = self.to_property_key(&key)?;
                let value = self.get_value(&object, &key)?;
                frame.push(value);
            }
            Opcode::SetIndex => {
                let value = frame.pop();
                let key = frame.pop();
                let object = frame.pop();
                if object.is_nullish() {
                    return Err(self.type_error(format!(
                        "Cannot set properties of {} (setting '{}')",
                        object, key
                    )));
                }
                let key = self.to_property_key(&key)?;
                self.put_value(&object, key, value.clone(), strict)?;
                frame.push(value);
            }
            Opcode::DeleteProperty(name) => {
                let object = frame.pop();
                let deleted = self.delete_property(&object, &PropertyKey::from(name.clone()), strict)?;
                frame.push(Value::Boolean(deleted));
            }
            Opcode::DeleteIndex => {
                let key = frame.pop();
                let object = frame.pop();
                let key = self.to_property_key(&key)?;
                let deleted = self.delete_property(&object, &key, strict)?;
                frame.push(Value::Boolean(deleted));
            }
            Opcode::DefineField(name) | Opcode::DefineMethod(name) => {
                let value = frame.pop();
                let attributes = if matches!(opcode, Opcode::DefineField(_)) {
                    Attributes::ALL
                } else {
                    Attributes::HIDDEN
                };
                let object = self.expect_object(frame.peek(0))?;
                self.define_data_property(&object, PropertyKey::from(name.clone()), value, attributes)?;
            }
            Opcode::DefineIndexField | Opcode::DefineIndexMethod => {
                let value = frame.pop();
                let key = frame.pop();
                let key = self.to_property_key(&key)?;
                let attributes = if matches!(opcode, Opcode::DefineIndexField) {
                    Attributes::ALL
                } else {
                    Attributes::HIDDEN
                };
                let object = self.expect_object(frame.peek(0))?;
                self.define_data_property(&object, key, value, attributes)?;
            }
            Opcode::DefineGetter { enumerable } | Opcode::DefineSetter { enumerable } => {
                let function = frame.pop();
                let key = frame.pop();
                let key = self.to_property_key(&key)?;
                let function = self.expect_object(function)?;
                let object = self.expect_object(frame.peek(0))?;
                if matches!(opcode, Opcode::DefineGetter { .. }) {
                    self.define_accessor(&object, key, Some(function), None, *enumerable)?;
                } else {
                    self.define_accessor(&object, key, None, Some(function), *enumerable)?;
                }
            }
            Opcode::CopyDataProperties => {
                let source = frame.pop();
                let target = self.expect_object(frame.peek(0))?;
                self.copy_data_properties(&target, &source, &[])?;
            }
            Opcode::CopyRest(count) => {
                let keys = frame.pop_n(*count as usize);
                let source = frame.pop();
                if source.is_nullish() {
                    return Err(self.type_error(format!("Cannot destructure '{}' as it is {}.", source, source)));
                }
                let mut excluded = Vec::with_capacity(keys.len());
                for key in &keys {
                    excluded.push(self.to_property_key(key)?);
                }
                let rest = self.create_object();
                self.copy_data_properties(&rest, &source, &excluded)?;
                frame.push(Value::Object(rest));
            }

            // Functions
            Opcode::CreateClosure(index, descriptors) => {
                let function = self.create_closure(frame, *index, descriptors)?;
                frame.push(Value::Object(function));
            }
            Opcode::MakeMethod => {
                let function = self.expect_object(frame.peek(0))?;
                let home = self.expect_object(frame.peek(1))?;
                self.set_home_object(&function, home);
            }
            Opcode::CreateClass { has_parent } => {
                let constructor = self.expect_object(frame.pop())?;
                let parent = if *has_parent { Some(frame.pop()) } else { None };
                let prototype = self.create_class(&constructor, parent)?;
                frame.push(Value::Object(constructor));
                frame.push(Value::Object(prototype));
            }
            Opcode::SetClassFields => {
                let fields = self.expect_object(frame.pop())?;
                let constructor = self.expect_object(frame.peek(1))?;
                self.set_class_fields(&constructor, fields);
            }
            Opcode::Call(argc) => {
                let args = frame.pop_n(*argc as usize);
                let this = frame.pop();
                let callee = frame.pop();
                let result = self.call(&callee, this, &args)?;
                frame.push(result);
            }
            Opcode::CallSpread => {
                let args = frame.pop();
                let args = self.spread_arguments(&args);
                let this = frame.pop();
                let callee = frame.pop();
                let result = self.call(&callee, this, &args)?;
                frame.push(result);
            }
            Opcode::CallNew(argc) => {
                let args = frame.pop_n(*argc as usize);
                let callee = frame.pop();
                let result = self.construct(&callee, &args, None)?;
                frame.push(result);
            }
            Opcode::CallNewSpread => {
                let args = frame.pop();
                let args = self.spread_arguments(&args);
                let callee = frame.pop();
                let result = self.construct(&callee, &args, None)?;
                frame.push(result);
            }
            Opcode::SuperCall(argc) => {
                let args = frame.pop_n(*argc as usize);
                let this = self.super_call(frame, &args)?;
                frame.push(this);
            }
            Opcode::SuperCallSpread => {
                let args = frame.pop();
                let args = self.spread_arguments(&args);
                let this = self.super_call(frame, &args)?;
                frame.push(this);
            }
            Opcode::LoadSuperProperty(name) => {
                let value = self.super_get(frame, &PropertyKey::from(name.clone()))?;
                frame.push(value);
            }
            Opcode::GetSuperIndex => {
                let key = frame.pop();
                let key = self.to_property_key(&key)?;
                let value = self.super_get(frame, &key)?;
                frame.push(value);
            }

            // Iteration
            Opcode::GetIterator => {
                let iterable = frame.pop();
                let record = self.get_iterator(&iterable)?;
                frame.push(Value::Object(record));
            }
            Opcode::ForInKeys => {
                let object = frame.pop();
                let record = self.for_in_iterator(&object)?;
                frame.push(Value::Object(record));
            }
            Opcode::IteratorStep { iterator, exit } => {
                let record = frame.register(*iterator);
                match self.iterator_step(&record)? {
                    Some(value) => frame.push(value),
                    None => frame.ip = *exit,
                }
            }
            Opcode::IteratorValue(iterator) => {
                let record = frame.register(*iterator);
                let value = self.iterator_step(&record)?.unwrap_or_default();
                frame.push(value);
            }
            Opcode::IteratorRest(iterator) => {
                let record = frame.register(*iterator);
                let mut values = Vec::new();
                while let Some(value) = self.iterator_step(&record)? {
                    values.push(value);
                }
                frame.push(Value::Object(self.create_array(values)));
            }
            Opcode::IteratorClose(iterator) => {
                let record = frame.register(*iterator);
                self.iterator_close(&record)?;
            }

            // Generators
            Opcode::GeneratorStart => return Ok(Some(Completion::GeneratorStart)),
            Opcode::Yield => return Ok(Some(Completion::Yield(frame.pop()))),
            Opcode::YieldDelegate(iterator) => return self.yield_delegate(frame, *iterator),

            // Miscellaneous
            Opcode::CreateRegExp(pattern, flags) => {
                let pattern = constant_str(frame, *pattern);
                let flags = constant_str(frame, *flags);
                let regexp = self.create_regexp(&pattern, &flags)?;
                frame.push(Value::Object(regexp));
            }
            Opcode::Pop => {
                frame.pop();
            }
            Opcode::Dup => frame.push(frame.peek(0)),
            Opcode::Dup2 => {
                let below = frame.peek(1);
                let top = frame.peek(0);
                frame.push(below);
                frame.push(top);
            }
            Opcode::Swap => {
                let top = frame.pop();
                let below = frame.pop();
                frame.push(top);
                frame.push(below);
            }
            Opcode::Nop => {}
        }
        Ok(None)
    }

    fn expect_object(&mut self, value: Value) -> Result<ObjectRef, Throw> {
        match value {
            Value::Object(object) => Ok(object),
            other => Err(self.type_error(format!("{} is not an object", other))),
        }
    }

    /// Arguments collected into an array by a spread call
    fn spread_arguments(&self, args: &Value) -> Vec<Value> {
        args.as_object()
            .and_then(|array| array.borrow().as_array().map(|a| a.to_vec()))
            .unwrap_or_default()
    }

    fn create_arguments_object(&self, args: &[Value]) -> ObjectRef {
        let arguments = ObjectRef::new(Object::new(
            ObjectKind::Arguments,
            Some(self.realm().object_prototype.clone()),
        ));
        for (index, arg) in args.iter().enumerate() {
            arguments.insert(PropertyKey::from(index as u32), arg.clone(), Attributes::ALL);
        }
        arguments.insert("length", Value::from(args.len()), Attributes::HIDDEN);
        arguments.insert(
            PropertyKey::Symbol(self.realm().symbol_iterator.clone()),
            Value::Object(self.realm().array_values.clone()),
            Attributes::HIDDEN,
        );
        arguments
    }

    /// `value instanceof constructor`
    pub fn instance_of(&mut self, value: &Value, constructor: &Value) -> Result<bool, Throw> {
        let Value::Object(function) = constructor else {
            return Err(self.type_error("Right-hand side of 'instanceof' is not callable"));
        };
        if !function.is_callable() {
            return Err(self.type_error("Right-hand side of 'instanceof' is not callable"));
        }
        let bound_target = match function.borrow().as_function() {
            Some(crate::function::FunctionObject::Bound(bound)) => Some(bound.target.clone()),
            _ => None,
        };
        if let Some(target) = bound_target {
            return self.instance_of(value, &Value::Object(target));
        }
        let Value::Object(object) = value else {
            return Ok(false);
        };
        let prototype = self.get(function, &PropertyKey::from("prototype"))?;
        let Value::Object(prototype) = prototype else {
            return Err(self.type_error(format!(
                "Function has non-object prototype '{}' in instanceof check",
                prototype
            )));
        };
        let mut cursor = object.prototype();
        while let Some(current) = cursor {
            if current.ptr_eq(&prototype) {
                return Ok(true);
            }
            cursor = current.prototype();
        }
        Ok(false)
    }

    /// Wire a class constructor to its parent and create its prototype
    fn create_class(
        &mut self,
        constructor: &ObjectRef,
        parent: Option<Value>,
    ) -> Result<ObjectRef, Throw> {
        let (prototype_parent, constructor_parent) = match parent {
            None => (
                Some(self.realm().object_prototype.clone()),
                self.realm().function_prototype.clone(),
            ),
            Some(Value::Null) => (None, self.realm().function_prototype.clone()),
            Some(Value::Object(parent)) if parent.is_constructor() => {
                let prototype = match self.get(&parent, &PropertyKey::from("prototype"))? {
                    Value::Object(prototype) => Some(prototype),
                    Value::Null => None,
                    other => {
                        return Err(self.type_error(format!(
                            "Class extends value does not have valid prototype property {}",
                            other
                        )))
                    }
                };
                (prototype, parent)
            }
            Some(other) => {
                return Err(self.type_error(format!(
                    "Class extends value {} is not a constructor or null",
                    other
                )))
            }
        };
        constructor.set_prototype(Some(constructor_parent));
        let prototype = ObjectRef::new(Object::ordinary(prototype_parent));
        constructor.insert("prototype", Value::Object(prototype.clone()), Attributes::FROZEN);
        prototype.insert("constructor", Value::Object(constructor.clone()), Attributes::HIDDEN);
        self.set_home_object(constructor, prototype.clone());
        Ok(prototype)
    }

    /// `super(...args)` inside a derived constructor
    fn super_call(&mut self, frame: &mut CallFrame, args: &[Value]) -> Result<Value, Throw> {
        let Some(callee) = frame.callee.clone() else {
            return Err(self.throw_error(ErrorKind::SyntaxError, "'super' keyword unexpected here"));
        };
        let parent = match callee.prototype() {
            Some(parent) if parent.is_constructor() => parent,
            _ => return Err(self.type_error("Super constructor is not a constructor")),
        };
        let new_target = frame.new_target.as_object().cloned().unwrap_or_else(|| callee.clone());
        let this = self.construct(&Value::Object(parent), args, Some(&new_target))?;
        if frame.this.is_some() {
            return Err(self.reference_error("Super constructor may only be called once"));
        }
        frame.this = Some(this.clone());
        if let Value::Object(instance) = &this {
            self.initialize_fields(&callee, instance)?;
        }
        Ok(this)
    }

    /// `super[key]` read with the current `this` as receiver
    fn super_get(&mut self, frame: &CallFrame, key: &PropertyKey) -> Result<Value, Throw> {
        let Some(this) = frame.this.clone() else {
            return Err(self.reference_error(
                "Must call super constructor in derived class before accessing 'this' or returning from derived constructor",
            ));
        };
        let base = frame.home_object.as_ref().and_then(ObjectRef::prototype);
        let Some(base) = base else {
            return Err(self.type_error(format!(
                "Cannot read properties of null (reading '{}')",
                key
            )));
        };
        self.get_with_receiver(&base, key, &this)
    }

    /// One round of `yield*`: forward the pending resumption to the inner
    /// iterator and either yield its result or finish with its value
    fn yield_delegate(
        &mut self,
        frame: &mut CallFrame,
        register: bytecode_system::RegisterId,
    ) -> Result<Option<Completion>, Throw> {
        let input = frame
            .resume
            .take()
            .unwrap_or(Resumption::Next(Value::Undefined));
        let record_value = frame.register(register);
        let record = self.iterator_record(&record_value)?;
        let iterator = Value::Object(record.iterator().clone());

        let returning = matches!(input, Resumption::Return(_));
        let result = match input {
            Resumption::Next(value) => {
                let next = self.get_value(&iterator, &PropertyKey::from("next"))?;
                self.call(&next, iterator.clone(), &[value])?
            }
            Resumption::Throw(value) => {
                match self.get_method(&iterator, &PropertyKey::from("throw"))? {
                    Some(method) => self.call(&method, iterator.clone(), &[value])?,
                    None => {
                        self.iterator_close(&record_value)?;
                        return Err(self.type_error("The iterator does not provide a 'throw' method"));
                    }
                }
            }
            Resumption::Return(value) => {
                match self.get_method(&iterator, &PropertyKey::from("return"))? {
                    Some(method) => self.call(&method, iterator.clone(), &[value])?,
                    None => return Ok(self.begin_return(frame, value)),
                }
            }
        };

        let Value::Object(result) = result else {
            return Err(self.type_error(format!("Iterator result {} is not an object", result)));
        };
        let done = self.get(&result, &PropertyKey::from("done"))?;
        let value = self.get(&result, &PropertyKey::from("value"))?;
        if to_boolean(&done) {
            if returning {
                return Ok(self.begin_return(frame, value));
            }
            frame.push(value);
            return Ok(None);
        }
        // Run this instruction again on the next resumption
        frame.ip -= 1;
        Ok(Some(Completion::Yield(value)))
    }
}

fn constant_str(frame: &CallFrame, index: usize) -> String {
    frame
        .chunk
        .constants
        .get(index)
        .and_then(Constant::as_str)
        .unwrap_or_default()
        .to_string()
}

/// `a ** b`; unlike `powf`, a NaN exponent or a unit base with an
/// infinite exponent gives NaN
fn exponentiate(a: f64, b: f64) -> f64 {
    if b.is_nan() || (a.abs() == 1.0 && b.is_infinite()) {
        return f64::NAN;
    }
    a.powf(b)
}
