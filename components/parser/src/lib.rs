//! JavaScript Parser Component
//!
//! Provides the lexer, parser, AST, scope analysis and bytecode generation
//! for the supported JavaScript subset.
//!
//! # Overview
//!
//! - [`Lexer`] - Tokenizes JavaScript source code
//! - [`Token`] - Token types including identifiers, literals, keywords
//! - [`parse`] / [`Parser`] - Recursive descent parser producing a [`Program`]
//! - [`ScopeAnalyzer`] - Finds the variables closures capture
//! - [`compile`] / [`BytecodeGenerator`] - Converts the AST to bytecode
//!
//! # Example
//!
//! ```
//! use parser::{compile, parse, CompileOptions, ParseOptions};
//!
//! let output = parse("let x = 42; x + 1", &ParseOptions::default()).unwrap();
//! assert!(!output.has_errors());
//!
//! let chunk = compile(&output.program, &CompileOptions::default()).unwrap();
//! assert!(chunk.instruction_count() > 0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ast;
pub mod bytecode_gen;
pub mod error;
pub mod hoisting;
pub mod lexer;
pub mod parser;
pub mod scope;

pub use ast::{Class, Expression, Function, Pattern, Program, Statement};
pub use bytecode_gen::{compile, BytecodeGenerator, CompileOptions};
pub use lexer::{Keyword, Lexer, Punctuator, Token, TokenKind};
pub use parser::{parse, ParseOptions, ParseOutput, Parser};
pub use scope::{ScopeAnalyzer, ScopeInfo};
