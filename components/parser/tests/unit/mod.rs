//! Unit tests for the parser crate

mod test_compiler;
mod test_lexer;
mod test_parser;
