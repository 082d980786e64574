//! Generator state machine
//!
//! A generator object owns its suspended [`CallFrame`]. Resuming moves the
//! frame out of the object and marks the generator executing, so a
//! re-entrant `next()` from inside the body is detected instead of
//! aliasing the frame. The frame goes back in when the body yields.

use crate::call_frame::{CallFrame, Resumption};
use crate::completion::{Completion, IterResult, Throw};
use crate::context::ExecutionContext;
use crate::object::ObjectKind;
use crate::value::Value;

/// Lifecycle of a generator object
#[derive(Debug)]
pub enum GeneratorState {
    /// Created; the body has not started
    SuspendedStart(Box<CallFrame>),
    /// Paused at a `yield`
    SuspendedYield(Box<CallFrame>),
    /// Running on the native stack
    Executing,
    /// Returned or threw; every further `next()` reports done
    Completed,
}

impl GeneratorState {
    fn name(&self) -> &'static str {
        match self {
            GeneratorState::SuspendedStart(_) => "suspended-start",
            GeneratorState::SuspendedYield(_) => "suspended-yield",
            GeneratorState::Executing => "executing",
            GeneratorState::Completed => "completed",
        }
    }
}

impl ExecutionContext {
    /// Resume a generator object with `next`, `throw` or `return`
    pub fn generator_resume(
        &mut self,
        generator: &Value,
        resumption: Resumption,
    ) -> Result<IterResult, Throw> {
        let object = match generator {
            Value::Object(object) if matches!(object.borrow().kind, ObjectKind::Generator(_)) => {
                object.clone()
            }
            _ => {
                return Err(self.type_error(format!(
                    "next method called on incompatible receiver {}",
                    generator
                )))
            }
        };
        let state = match &mut object.borrow_mut().kind {
            ObjectKind::Generator(state) => std::mem::replace(state, GeneratorState::Executing),
            _ => GeneratorState::Completed,
        };
        log::trace!("generator resumed from {}", state.name());

        let mut frame = match state {
            GeneratorState::Executing => {
                return Err(self.type_error("Generator is already running"));
            }
            GeneratorState::Completed => {
                self.store_generator_state(generator, GeneratorState::Completed);
                return match resumption {
                    Resumption::Next(_) => Ok(IterResult::new(Value::Undefined, true)),
                    Resumption::Return(value) => Ok(IterResult::new(value, true)),
                    Resumption::Throw(value) => Err(Throw::new(value)),
                };
            }
            GeneratorState::SuspendedStart(frame) => match resumption {
                Resumption::Next(_) => frame,
                Resumption::Return(value) => {
                    self.store_generator_state(generator, GeneratorState::Completed);
                    return Ok(IterResult::new(value, true));
                }
                Resumption::Throw(value) => {
                    self.store_generator_state(generator, GeneratorState::Completed);
                    return Err(Throw::new(value));
                }
            },
            GeneratorState::SuspendedYield(mut frame) => {
                frame.resume = Some(resumption);
                frame
            }
        };

        let outcome = self.run_frame(&mut frame);
        let (state, result) = match outcome {
            Ok(Completion::Yield(value)) => (
                GeneratorState::SuspendedYield(frame),
                Ok(IterResult::new(value, false)),
            ),
            Ok(Completion::Return(value)) => {
                (GeneratorState::Completed, Ok(IterResult::new(value, true)))
            }
            Ok(Completion::GeneratorStart) => (
                GeneratorState::Completed,
                Err(self.internal_error("generator restarted its prologue")),
            ),
            Err(throw) => (GeneratorState::Completed, Err(throw)),
        };
        log::trace!("generator suspended in {}", state.name());
        self.store_generator_state(generator, state);
        result
    }

    fn store_generator_state(&mut self, generator: &Value, state: GeneratorState) {
        if let Some(object) = generator.as_object() {
            if let ObjectKind::Generator(slot) = &mut object.borrow_mut().kind {
                *slot = state;
            }
        }
    }
}
