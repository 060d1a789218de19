//! Typed expression variants used inside placeables.

use indexmap::IndexMap;

use crate::ast::pattern::PatternElement;
use crate::span::TokenRange;

/// The static type of an expression, used when matching function arguments
/// against declared parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    String,
    Number,
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueType::String => write!(f, "STRING"),
            ValueType::Number => write!(f, "NUMBER"),
        }
    }
}

/// What a plain reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Message,
    Attribute,
    Variable,
}

/// One branch of a select expression. Exactly one variant per select carries
/// `default = true`.
#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    pub key: Expression,
    pub elements: Vec<PatternElement>,
    pub default: bool,
    pub range: TokenRange,
}

/// An expression node with its provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub kind: ExprKind,
    pub range: TokenRange,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// A quoted string literal, already unescaped.
    StringLiteral(String),
    /// An integer literal. Numbers without a decimal point parse as integers.
    IntLiteral(i64),
    /// A floating point literal. Numbers with a decimal point parse as
    /// IEEE-754 doubles.
    FloatLiteral(f64),
    /// `name`, `name.attr` or `$name`.
    Reference {
        kind: ReferenceKind,
        name: String,
        attribute: Option<String>,
    },
    /// `-name`, `-name.attr` or `-name(arg: value, …)`. Inlined away by the
    /// pattern builder unless term expansion is disabled.
    TermReference {
        name: String,
        attribute: Option<String>,
        arguments: IndexMap<String, Expression>,
    },
    /// `NAME(expr, name: expr, …)`. Arguments keep source order; named ones
    /// carry their parameter name.
    FunctionReference {
        name: String,
        arguments: Vec<(Option<String>, Expression)>,
    },
    /// `selector -> [key] value … *[key] value`.
    Select {
        selector: Box<Expression>,
        variants: Vec<Variant>,
    },
    /// A sequence of pattern elements standing in for an inlined term.
    /// Produced only by term expansion, never by the parser.
    Compound(Vec<PatternElement>),
}

impl Expression {
    pub fn new(kind: ExprKind, range: TokenRange) -> Self {
        Self { kind, range }
    }

    /// A synthetic string literal, for programmatically built contexts.
    pub fn string(value: impl Into<String>) -> Self {
        Self::new(ExprKind::StringLiteral(value.into()), TokenRange::SYNTHETIC)
    }

    /// A synthetic integer literal.
    pub fn integer(value: i64) -> Self {
        Self::new(ExprKind::IntLiteral(value), TokenRange::SYNTHETIC)
    }

    /// A synthetic float literal.
    pub fn float(value: f64) -> Self {
        Self::new(ExprKind::FloatLiteral(value), TokenRange::SYNTHETIC)
    }

    /// A synthetic compound of pattern elements.
    pub fn compound(elements: Vec<PatternElement>) -> Self {
        Self::new(ExprKind::Compound(elements), TokenRange::SYNTHETIC)
    }

    /// The default variant of a select expression, if this is one.
    pub fn default_variant(&self) -> Option<&Variant> {
        match &self.kind {
            ExprKind::Select { variants, .. } => variants.iter().find(|v| v.default),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_constructors_carry_sentinel_range() {
        assert!(Expression::string("x").range.is_synthetic());
        assert!(Expression::integer(3).range.is_synthetic());
        assert!(Expression::float(0.5).range.is_synthetic());
    }

    #[test]
    fn test_default_variant_lookup() {
        let select = Expression::new(
            ExprKind::Select {
                selector: Box::new(Expression::string("x")),
                variants: vec![
                    Variant {
                        key: Expression::string("a"),
                        elements: vec![],
                        default: false,
                        range: TokenRange::SYNTHETIC,
                    },
                    Variant {
                        key: Expression::string("b"),
                        elements: vec![],
                        default: true,
                        range: TokenRange::SYNTHETIC,
                    },
                ],
            },
            TokenRange::SYNTHETIC,
        );
        let default = select.default_variant().unwrap();
        assert_eq!(default.key, Expression::string("b"));
    }
}
