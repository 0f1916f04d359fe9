//! Lox: a small dynamically typed scripting language on a bytecode VM.
//!
//! This is the library root that exports all modules.
//!
//! # Architecture
//!
//! Source text flows through a scanner into a single-pass Pratt-parsing
//! compiler that emits a bytecode chunk, which a stack-based VM executes:
//!
//! ```text
//! source -> lexer -> compiler -> chunk -> vm -> stdout / errors
//! ```
//!
//! Strings are interned in a hash table owned by the VM's heap, so string
//! equality at runtime is reference identity. Global variables live in a
//! second table keyed by the same interned strings.

pub mod bytecode;
pub mod error;
pub mod lexer;
pub mod repl;
pub mod table;
pub mod value;

use std::path::Path;

pub use bytecode::vm::Vm;
pub use error::LoxError;

/// Compile and run a source string in a fresh VM.
pub fn run(source: &str) -> Result<(), LoxError> {
    Vm::new().interpret(source)
}

/// Read a script file and run it in a fresh VM.
pub fn run_file(path: &Path) -> Result<(), LoxError> {
    let source = std::fs::read_to_string(path)?;
    Vm::new().interpret(&source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_ok() {
        assert!(run("print 1 + 2;").is_ok());
    }

    #[test]
    fn test_run_compile_error() {
        assert!(matches!(run("print ;"), Err(LoxError::Compile(_))));
    }

    #[test]
    fn test_run_runtime_error() {
        assert!(matches!(run("print -nil;"), Err(LoxError::Runtime(_))));
    }

    #[test]
    fn test_run_file_missing() {
        let result = run_file(Path::new("definitely/not/here.lox"));
        assert!(matches!(result, Err(LoxError::Io(_))));
    }
}
