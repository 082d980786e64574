//! Unit tests for the bytecode system

mod test_chunk;
mod test_opcode;
