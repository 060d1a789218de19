//! Tree-walking formatter over the lowered AST.
//!
//! Evaluation concatenates pattern elements in source order into one output
//! buffer. Message, term and attribute references resolve against the
//! context's file at call time; every named element is pushed on the shared
//! parent stack for the duration of its own evaluation so reference cycles
//! surface as errors instead of unbounded recursion.

use lingua_syntax::{
    Attribute, ElementKind, Entry, ExprKind, Expression, Message, PatternElement, ReferenceKind,
    Variant,
};

use crate::context::{EvaluationContext, Parent};
use crate::error::{EvalError, Result};

/// Format a message under `ctx`.
pub fn format_message(message: &Message, ctx: &EvaluationContext) -> Result<String> {
    let _guard = ctx.enter(Parent::Message(message.name.clone()))?;
    evaluate_elements(&message.elements, ctx)
}

/// Format one attribute of an entry under `ctx`.
pub fn format_attribute(attribute: &Attribute, ctx: &EvaluationContext) -> Result<String> {
    let _guard = ctx.enter(Parent::Attribute {
        entry: attribute.entry_name.clone(),
        name: attribute.name.clone(),
    })?;
    evaluate_elements(&attribute.elements, ctx)
}

/// Format any entry. Terms never reach output directly, only through
/// expansion into a message, so evaluating one here is a programming error.
pub fn format_entry(entry: &Entry, ctx: &EvaluationContext) -> Result<String> {
    match entry {
        Entry::Message(message) => format_message(message, ctx),
        Entry::Term(term) => Err(EvalError::Internal(format!(
            "term -{} cannot be evaluated directly; reference it from a message",
            term.name
        ))),
    }
}

pub(crate) fn evaluate_elements(
    elements: &[PatternElement],
    ctx: &EvaluationContext,
) -> Result<String> {
    let mut out = String::new();
    write_elements(elements, &mut out, ctx)?;
    Ok(out)
}

fn write_elements(
    elements: &[PatternElement],
    out: &mut String,
    ctx: &EvaluationContext,
) -> Result<()> {
    for element in elements {
        write_element(element, out, ctx)?;
    }
    Ok(())
}

fn write_element(element: &PatternElement, out: &mut String, ctx: &EvaluationContext) -> Result<()> {
    match &element.kind {
        ElementKind::Text(text) => {
            out.push_str(text);
            Ok(())
        }
        ElementKind::Block(inner) => {
            out.push('\n');
            write_element(inner, out, ctx)
        }
        ElementKind::Placeable(expression) => write_expression(expression, out, ctx),
    }
}

fn evaluate_expression(expression: &Expression, ctx: &EvaluationContext) -> Result<String> {
    let mut out = String::new();
    write_expression(expression, &mut out, ctx)?;
    Ok(out)
}

fn write_expression(
    expression: &Expression,
    out: &mut String,
    ctx: &EvaluationContext,
) -> Result<()> {
    match &expression.kind {
        ExprKind::StringLiteral(value) => {
            out.push_str(value);
            Ok(())
        }
        ExprKind::IntLiteral(value) => {
            out.push_str(&value.to_string());
            Ok(())
        }
        ExprKind::FloatLiteral(value) => {
            out.push_str(&value.to_string());
            Ok(())
        }
        ExprKind::Reference { kind, name, attribute } => {
            write_reference(*kind, name, attribute.as_deref(), expression, out, ctx)
        }
        ExprKind::TermReference { name, attribute, arguments } => {
            write_term_reference(name, attribute.as_deref(), arguments, expression, out, ctx)
        }
        ExprKind::FunctionReference { name, arguments } => {
            let decl = ctx
                .functions()
                .get(name)
                .cloned()
                .ok_or_else(|| EvalError::UnresolvedFunction {
                    message: format!("unknown function {name}"),
                    range: expression.range,
                })?;
            let bound = ctx.functions().match_arguments(&decl, arguments, expression.range)?;
            match decl.invoke(&bound) {
                Some(result) => write_expression(&result, out, ctx),
                None => {
                    // A registered function that yields nothing is treated
                    // like a missing variable, not an error.
                    out.push_str(&format!("<missing:{name}()>"));
                    Ok(())
                }
            }
        }
        ExprKind::Select { selector, variants } => {
            let selector_value = evaluate_expression(selector, ctx)?;
            let mut chosen: Option<&Variant> = None;
            for variant in variants {
                if evaluate_expression(&variant.key, ctx)? == selector_value {
                    chosen = Some(variant);
                    break;
                }
            }
            let variant = match chosen {
                Some(variant) => variant,
                None => variants.iter().find(|v| v.default).ok_or_else(|| {
                    EvalError::Internal("select expression without a default variant".to_string())
                })?,
            };
            write_elements(&variant.elements, out, ctx)
        }
        ExprKind::Compound(elements) => write_elements(elements, out, ctx),
    }
}

fn write_reference(
    kind: ReferenceKind,
    name: &str,
    attribute: Option<&str>,
    expression: &Expression,
    out: &mut String,
    ctx: &EvaluationContext,
) -> Result<()> {
    match kind {
        ReferenceKind::Variable => match ctx.variable(name) {
            // The variable's value is evaluated in the same context.
            Some(value) => write_expression(value, out, ctx),
            None => {
                out.push_str(&format!("<missing:{name}>"));
                Ok(())
            }
        },
        ReferenceKind::Message => {
            let message =
                ctx.file().message(name).ok_or_else(|| EvalError::UnresolvedReference {
                    name: name.to_string(),
                    range: expression.range,
                })?;
            let _guard = ctx.enter(Parent::Message(name.to_string()))?;
            write_elements(&message.elements, out, ctx)
        }
        ReferenceKind::Attribute => {
            let attr_name = attribute.unwrap_or_default();
            let attribute = ctx
                .file()
                .message(name)
                .and_then(|message| message.attributes.get(attr_name))
                .ok_or_else(|| EvalError::UnresolvedReference {
                    name: format!("{name}.{attr_name}"),
                    range: expression.range,
                })?;
            let _guard = ctx.enter(Parent::Attribute {
                entry: name.to_string(),
                name: attr_name.to_string(),
            })?;
            write_elements(&attribute.elements, out, ctx)
        }
    }
}

/// Lazy term resolution, used when the file was parsed with term expansion
/// disabled. Call arguments overlay the context's variables without touching
/// the outer context.
fn write_term_reference(
    name: &str,
    attribute: Option<&str>,
    arguments: &indexmap::IndexMap<String, Expression>,
    expression: &Expression,
    out: &mut String,
    ctx: &EvaluationContext,
) -> Result<()> {
    let term = ctx.file().term(name).ok_or_else(|| EvalError::UnresolvedReference {
        name: format!("-{name}"),
        range: expression.range,
    })?;
    let overlaid;
    let scope = if arguments.is_empty() {
        ctx
    } else {
        overlaid = ctx.overlay_variables(arguments);
        &overlaid
    };
    match attribute {
        None => {
            let _guard = scope.enter(Parent::Term(name.to_string()))?;
            write_elements(&term.elements, out, scope)
        }
        Some(attr_name) => {
            let attribute = term.attributes.get(attr_name).ok_or_else(|| {
                EvalError::UnresolvedReference {
                    name: format!("-{name}.{attr_name}"),
                    range: expression.range,
                }
            })?;
            let _guard = scope.enter(Parent::Attribute {
                entry: name.to_string(),
                name: attr_name.to_string(),
            })?;
            write_elements(&attribute.elements, out, scope)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EvaluationContext;
    use crate::file::LocalizationFile;

    #[test]
    fn test_unbound_variable_yields_placeholder() {
        let file = LocalizationFile::parse("m = hello {$who}!\n").unwrap();
        let ctx = EvaluationContext::new(&file);
        let out = format_message(file.message("m").unwrap(), &ctx).unwrap();
        assert_eq!(out, "hello <missing:who>!");
    }

    #[test]
    fn test_integer_and_float_rendering() {
        let file = LocalizationFile::parse("m = {42} {3.50}\n").unwrap();
        let ctx = EvaluationContext::new(&file);
        let out = format_message(file.message("m").unwrap(), &ctx).unwrap();
        assert_eq!(out, "42 3.5");
    }

    #[test]
    fn test_message_reference_resolves_at_runtime() {
        let file = LocalizationFile::parse("base = ROOT\nm = [{base}]\n").unwrap();
        let ctx = EvaluationContext::new(&file);
        let out = format_message(file.message("m").unwrap(), &ctx).unwrap();
        assert_eq!(out, "[ROOT]");
    }

    #[test]
    fn test_unknown_message_reference_is_unresolved() {
        let file = LocalizationFile::parse("m = {nope}\n").unwrap();
        let ctx = EvaluationContext::new(&file);
        let err = format_message(file.message("m").unwrap(), &ctx).unwrap_err();
        assert!(matches!(err, EvalError::UnresolvedReference { ref name, .. } if name == "nope"));
    }

    #[test]
    fn test_runtime_message_cycle_is_reported() {
        let file = LocalizationFile::parse("a = {b}\nb = {a}\n").unwrap();
        let ctx = EvaluationContext::new(&file);
        let err = format_message(file.message("a").unwrap(), &ctx).unwrap_err();
        assert!(matches!(err, EvalError::Cycle { ref path } if path == "a -> b -> a"));
    }

    #[test]
    fn test_cycle_check_does_not_leak_across_calls() {
        let file = LocalizationFile::parse("a = X\nm = {a}{a}\n").unwrap();
        let ctx = EvaluationContext::new(&file);
        // Two references to the same message in one pattern are fine.
        let out = format_message(file.message("m").unwrap(), &ctx).unwrap();
        assert_eq!(out, "XX");
    }

    #[test]
    fn test_direct_term_evaluation_is_internal_error() {
        let file = LocalizationFile::parse("-t = secret\nm = x\n").unwrap();
        let ctx = EvaluationContext::new(&file);
        let entry = Entry::Term(file.term("t").unwrap().clone());
        let err = format_entry(&entry, &ctx).unwrap_err();
        assert!(matches!(err, EvalError::Internal(_)));
    }

    #[test]
    fn test_select_matches_in_insertion_order() {
        let source = "m = { $k ->\n    [a] first\n    [a] shadowed\n   *[z] fallback\n}\n";
        let file = LocalizationFile::parse(source).unwrap();
        let mut builder = crate::context::ContextBuilder::new();
        builder.string("k", "a");
        let ctx = builder.build(&file);
        let out = format_message(file.message("m").unwrap(), &ctx).unwrap();
        assert_eq!(out, "first");
    }

    #[test]
    fn test_select_falls_back_to_default() {
        let source = "m = { $k ->\n    [a] first\n   *[z] fallback\n}\n";
        let file = LocalizationFile::parse(source).unwrap();
        let mut builder = crate::context::ContextBuilder::new();
        builder.string("k", "unmatched");
        let ctx = builder.build(&file);
        let out = format_message(file.message("m").unwrap(), &ctx).unwrap();
        assert_eq!(out, "fallback");
    }

    #[test]
    fn test_function_without_body_yields_placeholder() {
        use crate::functions::FunctionRegistry;
        use lingua_syntax::ValueType;

        let file = LocalizationFile::parse("m = {NOOP()}\n").unwrap();
        let registry =
            FunctionRegistry::builder().function("NOOP", ValueType::String, |f| f).build();
        let mut builder = crate::context::ContextBuilder::new();
        builder.functions(&registry);
        let ctx = builder.build(&file);
        let out = format_message(file.message("m").unwrap(), &ctx).unwrap();
        assert_eq!(out, "<missing:NOOP()>");
    }

    #[test]
    fn test_unknown_function_is_an_error() {
        let file = LocalizationFile::parse("m = {NOPE()}\n").unwrap();
        let ctx = EvaluationContext::new(&file);
        let err = format_message(file.message("m").unwrap(), &ctx).unwrap_err();
        assert!(matches!(err, EvalError::UnresolvedFunction { .. }));
    }
}
