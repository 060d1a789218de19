//! Error types for evaluation and formatting.

use thiserror::Error;

use lingua_syntax::{SyntaxError, TokenRange, ValueType};

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, EvalError>;

/// Errors raised while formatting a message.
///
/// Missing variables and missing messages are not errors: the former yield a
/// `<missing:name>` placeholder in the output, the latter `None` from the
/// nullable format shapes.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EvalError {
    /// Parsing failed before any evaluation could start.
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    /// A message, attribute or term lookup failed at evaluation time.
    #[error("unresolved reference: {name}")]
    UnresolvedReference { name: String, range: TokenRange },

    /// A function name is unknown, a parameter name is unknown, or a
    /// positional argument fell outside the parameter list.
    #[error("unresolved function: {message}")]
    UnresolvedFunction { message: String, range: TokenRange },

    /// An argument's static type disagrees with the declared parameter type.
    #[error("type mismatch for parameter {parameter}: expected {expected}, found {found}")]
    TypeMismatch {
        parameter: String,
        expected: ValueType,
        found: ValueType,
        range: TokenRange,
    },

    /// A named element appeared twice on the parent stack.
    #[error("reference cycle: {path}")]
    Cycle { path: String },

    /// A violation of the evaluator's own invariants, such as evaluating a
    /// term directly or asking an unlowered term reference for its type.
    #[error("internal error: {0}")]
    Internal(String),
}
