//! Error types for all execution phases.

use std::fmt;

use thiserror::Error;

/// Lexical errors. These carry a line but no lexeme location: by the time
/// the scanner rejects the input there is no well-formed token to point at.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexerError {
    #[error("Unexpected character '{0}'.")]
    UnexpectedChar(char, u32),

    #[error("Unterminated string.")]
    UnterminatedString(u32),
}

impl LexerError {
    pub fn line(&self) -> u32 {
        match self {
            Self::UnexpectedChar(_, line) => *line,
            Self::UnterminatedString(line) => *line,
        }
    }
}

/// Where a compile error points in the source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorLocation {
    /// At a concrete token.
    At(String),
    /// At end of input.
    AtEnd,
    /// No token location (scanner-originated errors).
    None,
}

impl fmt::Display for ErrorLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::At(lexeme) => write!(f, " at '{}'", lexeme),
            Self::AtEnd => write!(f, " at end"),
            Self::None => Ok(()),
        }
    }
}

/// Compilation errors, one per reported diagnostic.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("[line {line}] Error{location}: {message}")]
pub struct CompileError {
    pub line: u32,
    pub location: ErrorLocation,
    pub message: String,
}

impl CompileError {
    pub fn new(line: u32, location: ErrorLocation, message: impl Into<String>) -> Self {
        Self {
            line,
            location,
            message: message.into(),
        }
    }
}

/// Runtime errors raised by the VM.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}\n[line {line}] in script")]
pub struct RuntimeError {
    pub line: u32,
    pub message: String,
}

impl RuntimeError {
    pub fn new(message: impl Into<String>, line: u32) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }

    pub fn line(&self) -> u32 {
        self.line
    }
}

/// A unified error type for all phases.
#[derive(Debug, Error)]
pub enum LoxError {
    /// Every diagnostic raised during a failed compilation.
    #[error("compilation failed")]
    Compile(Vec<CompileError>),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_error_format() {
        let error = CompileError::new(1, ErrorLocation::At(";".to_string()), "Expect expression.");
        assert_eq!(error.to_string(), "[line 1] Error at ';': Expect expression.");
    }

    #[test]
    fn test_compile_error_at_end() {
        let error = CompileError::new(3, ErrorLocation::AtEnd, "Expect ';' after value.");
        assert_eq!(
            error.to_string(),
            "[line 3] Error at end: Expect ';' after value."
        );
    }

    #[test]
    fn test_compile_error_without_location() {
        let error = CompileError::new(2, ErrorLocation::None, "Unterminated string.");
        assert_eq!(error.to_string(), "[line 2] Error: Unterminated string.");
    }

    #[test]
    fn test_runtime_error_format() {
        let error = RuntimeError::new("Operands must be numbers.", 4);
        assert_eq!(
            error.to_string(),
            "Operands must be numbers.\n[line 4] in script"
        );
    }

    #[test]
    fn test_lexer_error_line() {
        assert_eq!(LexerError::UnexpectedChar('@', 7).line(), 7);
        assert_eq!(LexerError::UnterminatedString(2).line(), 2);
    }
}
