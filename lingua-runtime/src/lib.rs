//! Evaluation context, formatter and file façade for Fluent resources.
//!
//! A [`LocalizationFile`] is parsed once and is immutable afterwards, so it
//! can be shared across threads. Each format call builds its own
//! [`EvaluationContext`] layered over the file's captured global context;
//! contexts are confined to the calling thread.

pub mod context;
pub mod error;
pub mod eval;
pub mod file;
pub mod functions;

pub use context::{ContextBuilder, ContextInit, EvaluationContext, Parent};
pub use error::{EvalError, Result};
pub use file::LocalizationFile;
pub use functions::{
    FunctionArgs, FunctionBuilder, FunctionDecl, FunctionRegistry, FunctionRegistryBuilder,
};
