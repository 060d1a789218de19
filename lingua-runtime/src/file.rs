//! Parse and format entry points for a single Fluent resource.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, info};

use lingua_syntax::{
    build_messages, collect_terms, Attribute, Lexer, Message, Parser, SourceRange, Term, Token,
    TokenRange,
};

use crate::context::{ContextBuilder, ContextInit, EvaluationContext};
use crate::error::Result;
use crate::eval;

/// A parsed Fluent resource.
///
/// The entry tables and token vector are immutable after construction, so a
/// file is safe to share across threads; each format call carries its own
/// [`EvaluationContext`].
pub struct LocalizationFile {
    messages: IndexMap<String, Message>,
    terms: IndexMap<String, Term>,
    tokens: Vec<Token>,
    global_init: Option<Arc<ContextInit>>,
}

impl LocalizationFile {
    /// Parse with term expansion and no global context.
    pub fn parse(source: &str) -> Result<Self> {
        Self::parse_with(source, None, true)
    }

    /// Parse with an optional global context initializer, captured for the
    /// file's lifetime, and an explicit term expansion choice.
    ///
    /// The global initializer runs before every per-call initializer, so
    /// per-call variables and functions override it on name collisions.
    pub fn parse_with(
        source: &str,
        global_init: Option<Arc<ContextInit>>,
        expand_terms: bool,
    ) -> Result<Self> {
        debug!(bytes = source.len(), expand_terms, "parsing localization resource");
        let tokens = Lexer::new(source).tokenize();
        let entries = Parser::new(&tokens).parse()?;
        let terms = collect_terms(&entries)?;
        let messages = build_messages(&entries, &terms, expand_terms)?;
        info!(messages = messages.len(), terms = terms.len(), "parsed localization file");
        Ok(Self { messages, terms, tokens, global_init })
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.values()
    }

    pub fn terms(&self) -> impl Iterator<Item = &Term> {
        self.terms.values()
    }

    pub fn message(&self, name: &str) -> Option<&Message> {
        self.messages.get(name)
    }

    pub fn term(&self, name: &str) -> Option<&Term> {
        self.terms.get(name)
    }

    pub fn attribute(&self, name: &str, attribute: &str) -> Option<&Attribute> {
        self.messages.get(name).and_then(|message| message.attributes.get(attribute))
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Resolve a node's token range against this file's token vector.
    pub fn source_range(&self, range: TokenRange) -> Option<SourceRange> {
        range.resolve(&self.tokens)
    }

    /// Build the per-call context: the file's captured global initializer
    /// first, then the caller's, then freeze.
    pub fn context(&self, init: impl Fn(&mut ContextBuilder)) -> EvaluationContext<'_> {
        let mut builder = ContextBuilder::new();
        if let Some(global) = &self.global_init {
            global(&mut builder);
        }
        init(&mut builder);
        builder.build(self)
    }

    /// Merge the file's default context under a caller-built context.
    /// Per-call variables and functions win; the parent stack is shared by
    /// reference so nested evaluations keep one cycle scope.
    fn merged<'f>(&'f self, call: &EvaluationContext<'f>) -> EvaluationContext<'f> {
        let mut builder = ContextBuilder::new();
        if let Some(global) = &self.global_init {
            global(&mut builder);
        }
        let base = builder.build_shared(self, call.parents());
        base.overlay_variables(call.variables()).overlay_functions(call.functions())
    }

    /// Format a message, building the context from `init`. `Ok(None)` when
    /// the message does not exist.
    pub fn format_or_none(
        &self,
        name: &str,
        init: impl Fn(&mut ContextBuilder),
    ) -> Result<Option<String>> {
        let message = match self.message(name) {
            Some(message) => message,
            None => return Ok(None),
        };
        let ctx = self.context(init);
        eval::format_message(message, &ctx).map(Some)
    }

    /// Format a message under a caller-built context, merged over the file's
    /// default context. `Ok(None)` when the message does not exist.
    pub fn format_or_none_with(
        &self,
        name: &str,
        ctx: &EvaluationContext<'_>,
    ) -> Result<Option<String>> {
        let message = match self.message(name) {
            Some(message) => message,
            None => return Ok(None),
        };
        let merged = self.merged(ctx);
        eval::format_message(message, &merged).map(Some)
    }

    /// Format one attribute of a message. `Ok(None)` when the message or the
    /// attribute does not exist.
    pub fn format_attr_or_none(
        &self,
        name: &str,
        attribute: &str,
        init: impl Fn(&mut ContextBuilder),
    ) -> Result<Option<String>> {
        let attribute = match self.attribute(name, attribute) {
            Some(attribute) => attribute,
            None => return Ok(None),
        };
        let ctx = self.context(init);
        eval::format_attribute(attribute, &ctx).map(Some)
    }

    /// Format one attribute of a message under a caller-built context.
    pub fn format_attr_or_none_with(
        &self,
        name: &str,
        attribute: &str,
        ctx: &EvaluationContext<'_>,
    ) -> Result<Option<String>> {
        let attribute = match self.attribute(name, attribute) {
            Some(attribute) => attribute,
            None => return Ok(None),
        };
        let merged = self.merged(ctx);
        eval::format_attribute(attribute, &merged).map(Some)
    }

    /// Non-nullable wrapper: a missing message formats as `<name>`.
    pub fn format(&self, name: &str, init: impl Fn(&mut ContextBuilder)) -> Result<String> {
        Ok(self.format_or_none(name, init)?.unwrap_or_else(|| format!("<{name}>")))
    }

    /// Non-nullable wrapper over a caller-built context.
    pub fn format_with(&self, name: &str, ctx: &EvaluationContext<'_>) -> Result<String> {
        Ok(self.format_or_none_with(name, ctx)?.unwrap_or_else(|| format!("<{name}>")))
    }

    /// Non-nullable wrapper: a missing attribute formats as `<name.attr>`.
    pub fn format_attr(
        &self,
        name: &str,
        attribute: &str,
        init: impl Fn(&mut ContextBuilder),
    ) -> Result<String> {
        Ok(self
            .format_attr_or_none(name, attribute, init)?
            .unwrap_or_else(|| format!("<{name}.{attribute}>")))
    }

    /// Non-nullable wrapper over a caller-built context.
    pub fn format_attr_with(
        &self,
        name: &str,
        attribute: &str,
        ctx: &EvaluationContext<'_>,
    ) -> Result<String> {
        Ok(self
            .format_attr_or_none_with(name, attribute, ctx)?
            .unwrap_or_else(|| format!("<{name}.{attribute}>")))
    }
}

impl std::fmt::Debug for LocalizationFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalizationFile")
            .field("messages", &self.messages.keys().collect::<Vec<_>>())
            .field("terms", &self.terms.keys().collect::<Vec<_>>())
            .field("tokens", &self.tokens.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_message_is_none_or_placeholder() {
        let file = LocalizationFile::parse("present = here\n").unwrap();
        assert_eq!(file.format_or_none("absent", |_| {}).unwrap(), None);
        assert_eq!(file.format("absent", |_| {}).unwrap(), "<absent>");
        assert_eq!(file.format_attr("absent", "title", |_| {}).unwrap(), "<absent.title>");
    }

    #[test]
    fn test_attribute_formatting() {
        let file =
            LocalizationFile::parse("login = Sign in\n    .tooltip = Use your account\n").unwrap();
        assert_eq!(file.format_attr("login", "tooltip", |_| {}).unwrap(), "Use your account");
        assert_eq!(file.format("login", |_| {}).unwrap(), "Sign in");
    }

    #[test]
    fn test_global_context_composes_under_per_call() {
        let init: Arc<ContextInit> = Arc::new(|builder: &mut ContextBuilder| {
            builder.string("brand", "Acme").string("region", "EU");
        });
        let file =
            LocalizationFile::parse_with("m = {$brand} {$region}\n", Some(init), true).unwrap();
        // The global default applies on its own.
        assert_eq!(file.format("m", |_| {}).unwrap(), "Acme EU");
        // The per-call initializer overrides a colliding name only.
        let out = file.format("m", |b| {
            b.string("brand", "Umbrella");
        });
        assert_eq!(out.unwrap(), "Umbrella EU");
    }

    #[test]
    fn test_prebuilt_context_merges_over_defaults() {
        let init: Arc<ContextInit> = Arc::new(|builder: &mut ContextBuilder| {
            builder.string("brand", "Acme");
        });
        let file = LocalizationFile::parse_with("m = {$brand}/{$extra}\n", Some(init), true).unwrap();
        let ctx = file.context(|b| {
            b.string("extra", "42");
        });
        assert_eq!(file.format_with("m", &ctx).unwrap(), "Acme/42");
    }

    #[test]
    fn test_iterators_follow_declaration_order() {
        let file = LocalizationFile::parse("-t2 = b\n-t1 = a\nz = 1\na = 2\n").unwrap();
        let messages: Vec<_> = file.messages().map(|m| m.name.as_str()).collect();
        assert_eq!(messages, vec!["z", "a"]);
        let terms: Vec<_> = file.terms().map(|t| t.name.as_str()).collect();
        assert_eq!(terms, vec!["t2", "t1"]);
    }
}
