//! Bytecode interpreter and runtime for the JavaScript engine
//!
//! This crate provides:
//! - The value and object model: tagged [`Value`]s, objects with ordered
//!   property maps and prototype links, arrays, functions, collections
//! - Type coercion, equality and the property protocol compiled code calls
//! - A dispatch loop executing [`bytecode_system`] chunks, with try/finally
//!   unwinding and a bounded call depth
//! - Generators as suspended call frames resumed by `next`/`throw`/`return`
//! - The realm: global object and built-in constructors
//! - [`Engine`], the host-facing entry point
//!
//! # Example
//!
//! ```
//! use interpreter::{Engine, Value};
//!
//! let mut engine = Engine::default();
//! let result = engine
//!     .eval("function* count() { yield 1; yield 2; } [...count()].join('-')")
//!     .unwrap();
//! assert_eq!(result, Value::from("1-2"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod array;
pub mod backend;
pub mod call_frame;
pub mod collections;
pub mod completion;
pub mod context;
pub mod conversion;
pub mod dispatch;
pub mod engine;
pub mod function;
pub mod generator;
pub mod intrinsics;
pub mod iteration;
pub mod object;
pub mod property;
pub mod realm;
pub mod upvalue;
pub mod value;

// Re-export main types at crate root
pub use backend::{Backend, BytecodeBackend, ExecutableUnit, Script};
pub use call_frame::{CallFrame, Resumption};
pub use completion::{IterResult, Throw};
pub use context::{ExecutionContext, DEFAULT_MAX_CALL_DEPTH};
pub use engine::{Engine, EngineConfig};
pub use function::{FunctionObject, NativeFn};
pub use generator::GeneratorState;
pub use object::{Attributes, Object, ObjectKind, ObjectRef, Property};
pub use realm::Realm;
pub use upvalue::Upvalue;
pub use value::{PropertyKey, Symbol, Value};
