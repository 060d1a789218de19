//! Message and term entries.

use indexmap::IndexMap;

use crate::ast::pattern::PatternElement;
use crate::span::TokenRange;

/// A named sub-pattern of an entry, addressed as `entry.attrib`.
///
/// The back-pointer to the owning entry is a name only, so the AST stays
/// acyclic.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub entry_name: String,
    pub name: String,
    pub elements: Vec<PatternElement>,
    pub range: TokenRange,
}

/// A public entry, addressable from other messages and from format calls.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub name: String,
    pub elements: Vec<PatternElement>,
    pub attributes: IndexMap<String, Attribute>,
    pub range: TokenRange,
}

/// A private entry, written with a `-` prefix in source. The prefix is not
/// part of the stored name. Terms never reach formatted output except through
/// expansion into a message.
#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub name: String,
    pub elements: Vec<PatternElement>,
    pub attributes: IndexMap<String, Attribute>,
    pub range: TokenRange,
}

/// A top-level named item.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Message(Message),
    Term(Term),
}

impl Entry {
    pub fn name(&self) -> &str {
        match self {
            Entry::Message(m) => &m.name,
            Entry::Term(t) => &t.name,
        }
    }

    pub fn elements(&self) -> &[PatternElement] {
        match self {
            Entry::Message(m) => &m.elements,
            Entry::Term(t) => &t.elements,
        }
    }

    pub fn attributes(&self) -> &IndexMap<String, Attribute> {
        match self {
            Entry::Message(m) => &m.attributes,
            Entry::Term(t) => &t.attributes,
        }
    }

    pub fn range(&self) -> TokenRange {
        match self {
            Entry::Message(m) => m.range,
            Entry::Term(t) => t.range,
        }
    }
}
