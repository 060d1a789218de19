//! Abstract syntax tree for parsed Fluent resources.

mod entry;
mod expression;
mod pattern;

pub use entry::{Attribute, Entry, Message, Term};
pub use expression::{ExprKind, Expression, ReferenceKind, ValueType, Variant};
pub use pattern::{ElementKind, PatternElement};
