//! Captured variable cells
//!
//! A variable that an inner function references lives in a heap cell
//! instead of a register. The declaring frame holds the cell in its cell
//! table; closures created in that frame hold clones of the same handle as
//! upvalues, so reads and writes on either side see one value. Loop bodies
//! replace a cell with a fresh one per iteration (`FreshCell`), which gives
//! each iteration's closures their own binding.

use std::cell::RefCell;
use std::rc::Rc;

use crate::value::Value;

/// Shared handle to a captured variable
#[derive(Debug, Clone, Default)]
pub struct Upvalue(Rc<RefCell<Value>>);

impl Upvalue {
    /// Create a cell holding `value`
    pub fn new(value: Value) -> Self {
        Upvalue(Rc::new(RefCell::new(value)))
    }

    /// Current value
    pub fn get(&self) -> Value {
        self.0.borrow().clone()
    }

    /// Replace the value
    pub fn set(&self, value: Value) {
        *self.0.borrow_mut() = value;
    }

    /// Whether both handles refer to the same cell
    pub fn ptr_eq(&self, other: &Upvalue) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
