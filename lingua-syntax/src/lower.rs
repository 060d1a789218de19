//! Two-pass lowering from raw parsed entries to the final AST.
//!
//! Pass one harvests every term into a lookup table without touching the
//! references between them. Pass two builds the messages; in expand mode it
//! replaces each term reference with a compound expression holding a
//! substituted, recursively expanded copy of the referenced pattern, keeping
//! a stack of the terms and attributes on the current expansion path to
//! detect cycles.

use indexmap::IndexMap;
use tracing::debug;

use crate::ast::{
    Attribute, ElementKind, ExprKind, Expression, Message, PatternElement, ReferenceKind, Term,
};
use crate::error::{Result, SyntaxError};
use crate::parser::{Piece, PieceKind, RawAttribute, RawEntry};
use crate::span::TokenRange;

/// Pass 1: collect all terms into a lookup table, unexpanded.
pub fn collect_terms(entries: &[RawEntry]) -> Result<IndexMap<String, Term>> {
    let mut terms = IndexMap::new();
    for entry in entries.iter().filter(|e| e.is_term) {
        let term = Term {
            name: entry.name.clone(),
            elements: build_elements(&entry.value),
            attributes: build_attributes(&entry.name, &entry.attributes),
            range: entry.range,
        };
        if terms.insert(entry.name.clone(), term).is_some() {
            return Err(SyntaxError::parser(
                format!("duplicate term -{}", entry.name),
                entry.range,
            ));
        }
    }
    Ok(terms)
}

/// Pass 2: build the messages, inlining term references when `expand_terms`
/// is set.
pub fn build_messages(
    entries: &[RawEntry],
    terms: &IndexMap<String, Term>,
    expand_terms: bool,
) -> Result<IndexMap<String, Message>> {
    let no_args = IndexMap::new();
    let mut messages = IndexMap::new();
    for entry in entries.iter().filter(|e| !e.is_term) {
        let mut message = Message {
            name: entry.name.clone(),
            elements: build_elements(&entry.value),
            attributes: build_attributes(&entry.name, &entry.attributes),
            range: entry.range,
        };
        if expand_terms {
            let mut visited = Vec::new();
            message.elements = expand_elements(&message.elements, &no_args, terms, &mut visited)?;
            for attribute in message.attributes.values_mut() {
                let mut visited = Vec::new();
                attribute.elements =
                    expand_elements(&attribute.elements, &no_args, terms, &mut visited)?;
            }
        }
        if messages.insert(entry.name.clone(), message).is_some() {
            return Err(SyntaxError::parser(
                format!("duplicate message {}", entry.name),
                entry.range,
            ));
        }
    }
    debug!(messages = messages.len(), terms = terms.len(), expand_terms, "lowered entries");
    Ok(messages)
}

fn build_attributes(entry_name: &str, raw: &[RawAttribute]) -> IndexMap<String, Attribute> {
    let mut attributes = IndexMap::new();
    for attribute in raw {
        attributes.insert(
            attribute.name.clone(),
            Attribute {
                entry_name: entry_name.to_string(),
                name: attribute.name.clone(),
                elements: build_elements(&attribute.value),
                range: attribute.range,
            },
        );
    }
    attributes
}

/// Accumulates pattern elements, merging text runs and wrapping the first
/// element of every continuation line in a block.
struct ElementSink {
    elements: Vec<PatternElement>,
    pending_block: bool,
    text: String,
    text_range: TokenRange,
}

impl ElementSink {
    fn new() -> Self {
        Self {
            elements: Vec::new(),
            pending_block: false,
            text: String::new(),
            text_range: TokenRange::UNDEFINED,
        }
    }

    fn push(&mut self, element: PatternElement) {
        if self.pending_block {
            let range = element.range;
            self.elements.push(PatternElement::new(ElementKind::Block(Box::new(element)), range));
            self.pending_block = false;
        } else {
            self.elements.push(element);
        }
    }

    fn append_text(&mut self, text: &str, range: TokenRange) {
        self.text.push_str(text);
        self.text_range = self.text_range.merge(range);
    }

    fn flush_text(&mut self) {
        if self.text.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.text);
        let range = std::mem::replace(&mut self.text_range, TokenRange::UNDEFINED);
        self.push(PatternElement::new(ElementKind::Text(text), range));
    }
}

/// Turn raw pieces into pattern elements: leading blanks of every line are
/// trimmed, text runs merge, and each continuation line contributes its
/// newline through a block element.
pub(crate) fn build_elements(pieces: &[Piece]) -> Vec<PatternElement> {
    let mut sink = ElementSink::new();
    let mut at_line_start = true;
    for piece in pieces {
        match &piece.kind {
            PieceKind::Blank(text) => {
                if !at_line_start {
                    sink.append_text(text, piece.range);
                }
            }
            PieceKind::Text(text) => {
                at_line_start = false;
                sink.append_text(text, piece.range);
            }
            PieceKind::Placeable(expression) => {
                at_line_start = false;
                sink.flush_text();
                sink.push(PatternElement::new(
                    ElementKind::Placeable(expression.clone()),
                    piece.range,
                ));
            }
            PieceKind::Newline => {
                if !sink.text.is_empty() {
                    sink.flush_text();
                } else if sink.pending_block {
                    // A blank continuation line still renders its newline.
                    let range = piece.range;
                    sink.push(PatternElement::new(ElementKind::Text(String::new()), range));
                }
                sink.pending_block = true;
                at_line_start = true;
            }
        }
    }
    sink.flush_text();
    sink.elements
}

/// One step on the expansion path. Identity includes the owning term so
/// same-named attributes of different terms stay distinct; rendering shows
/// the step the way it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PathStep {
    Term(String),
    Attribute { term: String, name: String },
}

impl std::fmt::Display for PathStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathStep::Term(name) => write!(f, "-{name}"),
            PathStep::Attribute { name, .. } => write!(f, ".{name}"),
        }
    }
}

fn render_cycle(visited: &[PathStep], repeated: &PathStep) -> String {
    let mut path = String::new();
    for step in visited.iter().chain(std::iter::once(repeated)) {
        if !path.is_empty() {
            path.push_str(" -> ");
        }
        path.push_str(&step.to_string());
    }
    path
}

fn expand_elements(
    elements: &[PatternElement],
    args: &IndexMap<String, Expression>,
    terms: &IndexMap<String, Term>,
    visited: &mut Vec<PathStep>,
) -> Result<Vec<PatternElement>> {
    elements
        .iter()
        .map(|element| expand_element(element, args, terms, visited))
        .collect()
}

fn expand_element(
    element: &PatternElement,
    args: &IndexMap<String, Expression>,
    terms: &IndexMap<String, Term>,
    visited: &mut Vec<PathStep>,
) -> Result<PatternElement> {
    match &element.kind {
        ElementKind::Placeable(expression) => match &expression.kind {
            ExprKind::TermReference { name, attribute, arguments } => {
                let term = terms.get(name).ok_or_else(|| SyntaxError::UnresolvedTerm {
                    name: format!("-{name}"),
                    range: expression.range,
                })?;
                let (step, target) = match attribute {
                    None => (PathStep::Term(name.clone()), &term.elements),
                    Some(attr) => {
                        let attribute =
                            term.attributes.get(attr).ok_or_else(|| SyntaxError::UnresolvedTerm {
                                name: format!("-{name}.{attr}"),
                                range: expression.range,
                            })?;
                        (
                            PathStep::Attribute { term: name.clone(), name: attr.clone() },
                            &attribute.elements,
                        )
                    }
                };
                if visited.contains(&step) {
                    return Err(SyntaxError::Cycle { path: render_cycle(visited, &step) });
                }
                // Argument expressions are substituted in the caller's scope
                // before they travel into the term.
                let call_args: IndexMap<String, Expression> = arguments
                    .iter()
                    .map(|(name, value)| (name.clone(), substitute(value, args)))
                    .collect();
                visited.push(step);
                let expanded = expand_elements(target, &call_args, terms, visited);
                visited.pop();
                Ok(PatternElement::new(
                    ElementKind::Placeable(Expression::new(
                        ExprKind::Compound(expanded?),
                        expression.range,
                    )),
                    element.range,
                ))
            }
            ExprKind::Reference { kind: ReferenceKind::Variable, name, .. } => {
                match args.get(name) {
                    // Bound by the call: substitute the argument expression.
                    Some(bound) => Ok(PatternElement::new(
                        ElementKind::Placeable(bound.clone()),
                        element.range,
                    )),
                    // Unbound: runtime variables still apply.
                    None => Ok(element.clone()),
                }
            }
            _ => Ok(element.clone()),
        },
        ElementKind::Block(inner) => {
            let inner = expand_element(inner, args, terms, visited)?;
            Ok(PatternElement::new(ElementKind::Block(Box::new(inner)), element.range))
        }
        ElementKind::Text(_) => Ok(element.clone()),
    }
}

fn substitute(expression: &Expression, args: &IndexMap<String, Expression>) -> Expression {
    match &expression.kind {
        ExprKind::Reference { kind: ReferenceKind::Variable, name, .. } => {
            args.get(name).cloned().unwrap_or_else(|| expression.clone())
        }
        _ => expression.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn lower(source: &str, expand: bool) -> Result<(IndexMap<String, Term>, IndexMap<String, Message>)> {
        let tokens = Lexer::new(source).tokenize();
        let entries = Parser::new(&tokens).parse()?;
        let terms = collect_terms(&entries)?;
        let messages = build_messages(&entries, &terms, expand)?;
        Ok((terms, messages))
    }

    fn flatten(elements: &[PatternElement]) -> String {
        let mut out = String::new();
        for element in elements {
            match &element.kind {
                ElementKind::Text(text) => out.push_str(text),
                ElementKind::Block(inner) => {
                    out.push('\n');
                    out.push_str(&flatten(std::slice::from_ref(&**inner)));
                }
                ElementKind::Placeable(expression) => match &expression.kind {
                    ExprKind::StringLiteral(s) => out.push_str(s),
                    ExprKind::Compound(inner) => out.push_str(&flatten(inner)),
                    other => panic!("unexpected placeable {other:?}"),
                },
            }
        }
        out
    }

    #[test]
    fn test_terms_are_collected_without_expansion() {
        let (terms, messages) = lower("-t1 = TESTING\n-t2 = {-t1}::\n", true).unwrap();
        assert_eq!(terms.len(), 2);
        assert!(messages.is_empty());
        // Pass 1 leaves the cross-term reference alone.
        assert!(matches!(
            terms["t2"].elements[0].kind,
            ElementKind::Placeable(Expression { kind: ExprKind::TermReference { .. }, .. })
        ));
    }

    #[test]
    fn test_term_inlining_produces_nested_compounds() {
        let (_, messages) =
            lower("-t1 = TESTING\n-t2 = {-t1}::\nm1 = {-t2} Karma Krafts\n", true).unwrap();
        let m1 = &messages["m1"];
        assert_eq!(flatten(&m1.elements), "TESTING:: Karma Krafts");
        assert!(matches!(
            m1.elements[0].kind,
            ElementKind::Placeable(Expression { kind: ExprKind::Compound(_), .. })
        ));
    }

    #[test]
    fn test_parametrized_term_substitutes_arguments() {
        let (_, messages) = lower("-t3 = {$test}\nanimal = {-t3(test: \"fops\")}\n", true).unwrap();
        assert_eq!(flatten(&messages["animal"].elements), "fops");
    }

    #[test]
    fn test_unbound_variable_survives_expansion() {
        let (_, messages) = lower("-t = {$kept}\nm = {-t}\n", true).unwrap();
        match &messages["m"].elements[0].kind {
            ElementKind::Placeable(Expression { kind: ExprKind::Compound(inner), .. }) => {
                assert!(matches!(
                    inner[0].kind,
                    ElementKind::Placeable(Expression {
                        kind: ExprKind::Reference { kind: ReferenceKind::Variable, .. },
                        ..
                    })
                ));
            }
            other => panic!("expected a compound, got {other:?}"),
        }
    }

    #[test]
    fn test_diamond_reference_is_not_a_cycle() {
        let source = "-base = X\n-left = {-base}\n-right = {-base}\nm = {-left}{-right}{-base}\n";
        let (_, messages) = lower(source, true).unwrap();
        assert_eq!(flatten(&messages["m"].elements), "XXX");
    }

    #[test]
    fn test_direct_term_cycle_is_reported() {
        let err = lower("-a = {-b}\n-b = {-a}\nm = {-a}\n", true).unwrap_err();
        match err {
            SyntaxError::Cycle { path } => assert_eq!(path, "-a -> -b -> -a"),
            other => panic!("expected a cycle error, got {other}"),
        }
    }

    #[test]
    fn test_attribute_cycle_is_reported() {
        let source = "-a = x\n    .style = {-a.style}\nm = {-a.style}\n";
        let err = lower(source, true).unwrap_err();
        assert!(matches!(err, SyntaxError::Cycle { ref path } if path == ".style -> .style"));
    }

    #[test]
    fn test_unknown_term_is_reported() {
        let err = lower("m = {-nope}\n", true).unwrap_err();
        assert!(matches!(err, SyntaxError::UnresolvedTerm { ref name, .. } if name == "-nope"));
    }

    #[test]
    fn test_lazy_mode_keeps_term_references() {
        let (_, messages) = lower("-t = X\nm = {-t}\n", false).unwrap();
        assert!(matches!(
            messages["m"].elements[0].kind,
            ElementKind::Placeable(Expression { kind: ExprKind::TermReference { .. }, .. })
        ));
    }

    #[test]
    fn test_continuation_lines_become_blocks() {
        let (_, messages) = lower("m = one\n    two\n    three\n", true).unwrap();
        assert_eq!(flatten(&messages["m"].elements), "one\ntwo\nthree");
        assert_eq!(messages["m"].elements.len(), 3);
        assert!(matches!(messages["m"].elements[1].kind, ElementKind::Block(_)));
    }

    #[test]
    fn test_leading_blanks_are_trimmed_but_inner_kept() {
        let (_, messages) = lower("m = a b  c\n", true).unwrap();
        assert_eq!(flatten(&messages["m"].elements), "a b  c");
    }

    #[test]
    fn test_duplicate_message_is_rejected() {
        assert!(matches!(lower("m = a\nm = b\n", true), Err(SyntaxError::Parser { .. })));
    }

    #[test]
    fn test_message_and_term_may_share_a_name() {
        let (terms, messages) = lower("-same = term\nsame = message\n", true).unwrap();
        assert!(terms.contains_key("same"));
        assert!(messages.contains_key("same"));
    }
}
