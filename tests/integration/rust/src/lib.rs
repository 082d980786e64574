//! Integration test suite for the JavaScript engine
//!
//! This crate verifies that the parser, the bytecode compiler and the
//! interpreter work together across component boundaries.

/// Re-export components for test convenience
pub mod components {
    pub use bytecode_system;
    pub use core_types;
    pub use interpreter;
    pub use parser;
}
