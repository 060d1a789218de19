//! Lexer, parser and AST for the Fluent localization syntax.
//!
//! This crate turns Fluent source text into an abstract syntax tree in two
//! passes: the parser produces raw entries, then the lowering pass collects
//! terms and builds messages with term references inlined and argument
//! substitution applied. Evaluation of the resulting tree lives in
//! `lingua-runtime`.

pub mod ast;
pub mod error;
pub mod lexer;
pub mod lower;
pub mod parser;
pub mod span;
pub mod token;

pub use ast::{
    Attribute, ElementKind, Entry, ExprKind, Expression, Message, PatternElement, ReferenceKind,
    Term, ValueType, Variant,
};
pub use error::{Result, SyntaxError};
pub use lexer::Lexer;
pub use lower::{build_messages, collect_terms};
pub use parser::Parser;
pub use span::{SourcePosition, SourceRange, TokenRange};
pub use token::{Token, TokenKind};
