//! Bytecode compiler and virtual machine for Lox.
//!
//! # Architecture
//!
//! - `instruction`: OpCode definitions for the bytecode instruction set
//! - `chunk`: bytecode chunks with line metadata and constant pools
//! - `compiler`: single-pass Pratt-parsing compiler from tokens to a chunk
//! - `vm`: stack-based virtual machine executing chunks
//! - `disassembler`: debug output for bytecode inspection

pub mod chunk;
pub mod compiler;
pub mod disassembler;
pub mod instruction;
pub mod vm;

pub use chunk::Chunk;
pub use compiler::compile;
pub use disassembler::disassemble_chunk;
pub use instruction::OpCode;
pub use vm::Vm;
