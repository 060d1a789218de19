//! Pattern element variants.

use crate::ast::expression::Expression;
use crate::span::TokenRange;

/// One element of a pattern with its provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternElement {
    pub kind: ElementKind,
    pub range: TokenRange,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    /// Literal text. Leading blanks of each source line are trimmed by the
    /// pattern builder before storage.
    Text(String),
    /// A newline-prefixed element: renders as `"\n"` followed by the inner
    /// element. One is produced for the first element of every pattern
    /// continuation line.
    Block(Box<PatternElement>),
    /// An expression embedded in the pattern inside `{ … }`.
    Placeable(Expression),
}

impl PatternElement {
    pub fn new(kind: ElementKind, range: TokenRange) -> Self {
        Self { kind, range }
    }

    /// Synthetic literal text.
    pub fn text(value: impl Into<String>) -> Self {
        Self::new(ElementKind::Text(value.into()), TokenRange::SYNTHETIC)
    }

    /// Synthetic placeable.
    pub fn placeable(expression: Expression) -> Self {
        Self::new(ElementKind::Placeable(expression), TokenRange::SYNTHETIC)
    }
}
