//! Bytecode opcodes for JavaScript runtime
//!
//! Defines all bytecode instructions for the VM. Expression evaluation uses
//! an operand stack; locals live in registers, captured variables live in
//! cells shared with closures through upvalues.
//!
//! Unless stated otherwise, an opcode pops its operands and pushes its
//! result. Stack effects are written `[before] -> [after]` with the top of
//! the stack on the right.

use std::rc::Rc;

/// Register identifier for local variable slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisterId(pub u32);

/// Descriptor for a captured variable (upvalue)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UpvalueDescriptor {
    /// true if the variable is a cell of the enclosing function, false if it
    /// is one of the enclosing function's own upvalues
    pub is_local: bool,
    /// Cell index (if local) or upvalue index (if not)
    pub index: u32,
}

impl UpvalueDescriptor {
    /// Create a new upvalue descriptor
    pub fn new(is_local: bool, index: u32) -> Self {
        Self { is_local, index }
    }
}

/// Bytecode opcodes for JavaScript execution
#[derive(Debug, Clone, PartialEq)]
pub enum Opcode {
    // Literals
    /// Load constant from constant pool at given index
    LoadConstant(usize),
    /// Load undefined value
    LoadUndefined,
    /// Load null value
    LoadNull,
    /// Load boolean true
    LoadTrue,
    /// Load boolean false
    LoadFalse,
    /// Load the receiver of the current call
    LoadThis,
    /// Load `new.target` of the current call
    LoadNewTarget,
    /// Load the function object being executed
    LoadCallee,
    /// Create an `arguments` object from the actual arguments
    CreateArguments,
    /// Create an array from the actual arguments starting at the given index
    CreateRestArray(u32),

    // Variables
    /// Load global variable by name; ReferenceError if it does not exist
    LoadGlobal(Rc<str>),
    /// Load global variable by name, or undefined if it does not exist
    LoadGlobalOrUndefined(Rc<str>),
    /// Store to global variable by name (pops the value)
    StoreGlobal(Rc<str>),
    /// Create a global variable initialized to undefined unless it exists
    DeclareGlobal(Rc<str>),
    /// Delete a global variable, pushing whether it succeeded
    DeleteGlobal(Rc<str>),
    /// Load local variable from register
    LoadLocal(RegisterId),
    /// Store to local variable in register (pops the value)
    StoreLocal(RegisterId),
    /// Load a captured variable owned by this function
    LoadCell(u32),
    /// Store to a captured variable owned by this function (pops the value)
    StoreCell(u32),
    /// Replace a cell with a fresh undefined cell, detaching closures that
    /// captured the previous one
    FreshCell(u32),
    /// Load captured variable by upvalue index
    LoadUpvalue(u32),
    /// Store to captured variable (pops the value)
    StoreUpvalue(u32),
    /// Throw a TypeError for assignment to the named constant
    ThrowConstAssignment(Rc<str>),

    // Arithmetic operations
    /// Add top two stack values
    Add,
    /// Subtract top from second-top
    Sub,
    /// Multiply top two stack values
    Mul,
    /// Divide second-top by top
    Div,
    /// Modulo second-top by top
    Mod,
    /// Exponentiation (second-top ** top)
    Exp,
    /// Negate top value
    Neg,
    /// Unary plus (convert to number)
    Plus,
    /// Logical NOT (invert truthiness)
    Not,
    /// Bitwise NOT
    BitNot,
    /// Bitwise AND
    BitAnd,
    /// Bitwise OR
    BitOr,
    /// Bitwise XOR
    BitXor,
    /// Left shift
    Shl,
    /// Signed right shift
    Shr,
    /// Unsigned right shift
    UShr,
    /// Convert to number, then add one
    Inc,
    /// Convert to number, then subtract one
    Dec,
    /// Convert top value to a number
    ToNumeric,
    /// Convert top value to a property key (string or symbol)
    ToPropertyKey,
    /// Convert top value to a string
    Stringify,
    /// typeof operator - push type string
    Typeof,

    // Comparison operations
    /// Loose equality (==)
    Equal,
    /// Strict equality (===)
    StrictEqual,
    /// Loose inequality (!=)
    NotEqual,
    /// Strict inequality (!==)
    StrictNotEqual,
    /// Less than (<)
    LessThan,
    /// Less than or equal (<=)
    LessThanEqual,
    /// Greater than (>)
    GreaterThan,
    /// Greater than or equal (>=)
    GreaterThanEqual,
    /// instanceof operator
    Instanceof,
    /// in operator: `[key, object] -> [bool]`
    In,

    // Control flow
    /// Unconditional jump to instruction index
    Jump(usize),
    /// Pop and jump if truthy
    JumpIfTrue(usize),
    /// Pop and jump if falsy
    JumpIfFalse(usize),
    /// Pop and jump if null or undefined
    JumpIfNullish(usize),
    /// Pop and jump if neither null nor undefined
    JumpIfNotNullish(usize),
    /// Optional chaining exit: if the value `depth` slots below the top is
    /// null or undefined, pop `depth + 1` values, push undefined and jump
    OptionalChainExit {
        /// Instruction index after the chain
        target: usize,
        /// Stack depth of the tested value
        depth: u32,
    },
    /// Return from function with the top value
    Return,

    // Exception handling
    /// Throw the top value
    Throw,
    /// Install a catch handler starting at the given instruction
    PushTry(usize),
    /// Install a finally handler. An exception reaching it stores the throw
    /// completion in the two registers and jumps to `target`.
    PushFinally {
        /// First instruction of the finally block
        target: usize,
        /// Register receiving the completion code
        kind: RegisterId,
        /// Register receiving the completion value
        value: RegisterId,
    },
    /// Remove the innermost handler
    PopTry,
    /// Mark entry into a finally block whose pending completion is held in
    /// the two registers
    EnterFinally {
        /// Completion code register
        kind: RegisterId,
        /// Completion value register
        value: RegisterId,
    },
    /// Mark the normal end of the innermost finally block
    EndFinally,
    /// Leave the innermost finally block through a jump or return
    LeaveFinally,
    /// Set a completion code register
    SetCompletion {
        /// Completion code register
        kind: RegisterId,
        /// Code to store
        code: u32,
    },
    /// Jump if a completion code register holds the given code
    JumpIfCompletion {
        /// Completion code register
        kind: RegisterId,
        /// Code to compare against
        code: u32,
        /// Jump target
        target: usize,
    },
    /// Throw a TypeError if the top value is null or undefined (not popped)
    RequireObjectCoercible,

    // Objects and arrays
    /// Create empty object
    CreateObject,
    /// Create array from the top N stack values
    CreateArray(u32),
    /// `[array, value] -> [array]`
    ArrayPush,
    /// `[array] -> [array]` with length increased by one
    ArrayPushHole,
    /// `[array, iterable] -> [array]` appending every iterated value
    ArraySpread,
    /// Load property: `[object] -> [value]`
    LoadProperty(Rc<str>),
    /// Store property: `[object, value] -> [value]`
    StoreProperty(Rc<str>),
    /// Load computed property: `[object, key] -> [value]`
    GetIndex,
    /// Store computed property: `[object, key, value] -> [value]`
    SetIndex,
    /// Delete property: `[object] -> [bool]`
    DeleteProperty(Rc<str>),
    /// Delete computed property: `[object, key] -> [bool]`
    DeleteIndex,
    /// Define an enumerable data property: `[object, value] -> [object]`
    DefineField(Rc<str>),
    /// Define an enumerable computed data property:
    /// `[object, key, value] -> [object]`
    DefineIndexField,
    /// Define a non-enumerable method: `[object, function] -> [object]`
    DefineMethod(Rc<str>),
    /// Define a non-enumerable computed method:
    /// `[object, key, function] -> [object]`
    DefineIndexMethod,
    /// Define a getter: `[object, key, function] -> [object]`
    DefineGetter {
        /// Whether the accessor is enumerable
        enumerable: bool,
    },
    /// Define a setter: `[object, key, function] -> [object]`
    DefineSetter {
        /// Whether the accessor is enumerable
        enumerable: bool,
    },
    /// Copy own enumerable properties: `[object, source] -> [object]`
    CopyDataProperties,
    /// Object rest: `[source, key_1 .. key_n] -> [object]` with every own
    /// enumerable property of source except the listed keys
    CopyRest(u32),

    // Functions
    /// Create closure from nested function with captured upvalues
    CreateClosure(usize, Vec<UpvalueDescriptor>),
    /// Set the home object used by `super`: `[home, function] -> [home, function]`
    MakeMethod,
    /// Wire up a class: `[parent?, constructor] -> [constructor, prototype]`
    CreateClass {
        /// Whether a parent constructor is on the stack
        has_parent: bool,
    },
    /// Attach an instance field initializer to a class:
    /// `[constructor, prototype, initializer] -> [constructor, prototype]`.
    /// The initializer runs against every new instance once `this` exists.
    SetClassFields,
    /// Call: `[callee, this, arg_1 .. arg_n] -> [result]`
    Call(u32),
    /// Call with spread arguments: `[callee, this, args_array] -> [result]`
    CallSpread,
    /// Construct: `[callee, arg_1 .. arg_n] -> [object]`
    CallNew(u32),
    /// Construct with spread arguments: `[callee, args_array] -> [object]`
    CallNewSpread,
    /// Call the parent constructor: `[arg_1 .. arg_n] -> [this]`
    SuperCall(u32),
    /// Call the parent constructor with spread: `[args_array] -> [this]`
    SuperCallSpread,
    /// Load a property from the home object's prototype: `[] -> [value]`
    LoadSuperProperty(Rc<str>),
    /// Load a computed property from the home object's prototype:
    /// `[key] -> [value]`
    GetSuperIndex,

    // Iteration
    /// Open an iterator record: `[iterable] -> [record]`
    GetIterator,
    /// Open a for-in key iterator: `[object] -> [record]`
    ForInKeys,
    /// Advance the iterator record held in the register; jump to `exit`
    /// when done, otherwise push the next value
    IteratorStep {
        /// Register holding the iterator record
        iterator: RegisterId,
        /// Jump target once the iterator is exhausted
        exit: usize,
    },
    /// Push the next value of the iterator record, or undefined once done
    IteratorValue(RegisterId),
    /// Push an array of all remaining values of the iterator record
    IteratorRest(RegisterId),
    /// Call `return` on the iterator record unless it is already done
    IteratorClose(RegisterId),

    // Generators
    /// End of generator prologue: suspend until the first `next()`
    GeneratorStart,
    /// Suspend with the top value; on resumption push the sent value
    Yield,
    /// Delegate to the iterator record held in the register until it
    /// completes, then push its return value
    YieldDelegate(RegisterId),

    // Miscellaneous
    /// Create a RegExp object from pattern and flags constants
    CreateRegExp(usize, usize),
    /// Remove top of stack
    Pop,
    /// Duplicate top of stack
    Dup,
    /// Duplicate the top two stack values
    Dup2,
    /// Swap the top two stack values
    Swap,
    /// No operation (debugger statement)
    Nop,
}

impl Opcode {
    /// Returns the jump target of a branching opcode.
    pub fn jump_target(&self) -> Option<usize> {
        match self {
            Opcode::Jump(target)
            | Opcode::JumpIfTrue(target)
            | Opcode::JumpIfFalse(target)
            | Opcode::JumpIfNullish(target)
            | Opcode::JumpIfNotNullish(target)
            | Opcode::PushTry(target) => Some(*target),
            Opcode::OptionalChainExit { target, .. }
            | Opcode::PushFinally { target, .. }
            | Opcode::JumpIfCompletion { target, .. } => Some(*target),
            Opcode::IteratorStep { exit, .. } => Some(*exit),
            _ => None,
        }
    }

    /// Rewrites the jump target of a branching opcode.
    ///
    /// Returns false if the opcode does not branch.
    pub fn set_jump_target(&mut self, new_target: usize) -> bool {
        match self {
            Opcode::Jump(target)
            | Opcode::JumpIfTrue(target)
            | Opcode::JumpIfFalse(target)
            | Opcode::JumpIfNullish(target)
            | Opcode::JumpIfNotNullish(target)
            | Opcode::PushTry(target) => *target = new_target,
            Opcode::OptionalChainExit { target, .. }
            | Opcode::PushFinally { target, .. }
            | Opcode::JumpIfCompletion { target, .. } => *target = new_target,
            Opcode::IteratorStep { exit, .. } => *exit = new_target,
            _ => return false,
        }
        true
    }
}
