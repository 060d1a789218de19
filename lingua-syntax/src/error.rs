//! Error types for lexing, parsing and lowering.

use thiserror::Error;

use crate::span::TokenRange;

/// Result type alias for syntax operations.
pub type Result<T> = std::result::Result<T, SyntaxError>;

/// Errors raised while turning source text into an AST.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SyntaxError {
    /// The lexer or parser rejected the input.
    #[error("parse error at {range}: {message}")]
    Parser { message: String, range: TokenRange },

    /// A term or term attribute referenced during expansion does not exist.
    #[error("unresolved term reference at {range}: {name}")]
    UnresolvedTerm { name: String, range: TokenRange },

    /// A term or attribute appeared twice on the expansion path.
    #[error("term expansion cycle: {path}")]
    Cycle { path: String },
}

impl SyntaxError {
    pub(crate) fn parser(message: impl Into<String>, range: TokenRange) -> Self {
        SyntaxError::Parser { message: message.into(), range }
    }
}
