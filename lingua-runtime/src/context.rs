//! Per-call evaluation state.
//!
//! A context is an immutable snapshot of the file under evaluation plus the
//! caller's functions and variables. The only mutable part is the parent
//! stack used for cycle detection, which nested and overlaid contexts share
//! by reference so detection stays coherent across the merged scope. A
//! context is confined to the thread that runs the format call.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use lingua_syntax::Expression;

use crate::error::{EvalError, Result};
use crate::file::LocalizationFile;
use crate::functions::{FunctionDecl, FunctionRegistry};

/// Closure shape used for both the file's captured global context and the
/// per-call context. Composition is sequential application: the global
/// initializer runs first, the per-call one second, so per-call settings win.
pub type ContextInit = dyn Fn(&mut ContextBuilder) + Send + Sync;

/// One element on the parent stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parent {
    Message(String),
    Term(String),
    Attribute { entry: String, name: String },
}

impl std::fmt::Display for Parent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Parent::Message(name) | Parent::Term(name) => write!(f, "{name}"),
            Parent::Attribute { entry, name } => write!(f, "{entry}.{name}"),
        }
    }
}

/// Pops the parent stack when the evaluation of a named element finishes,
/// error or not.
#[derive(Debug)]
pub(crate) struct ParentGuard {
    parents: Rc<RefCell<Vec<Parent>>>,
}

impl Drop for ParentGuard {
    fn drop(&mut self) {
        self.parents.borrow_mut().pop();
    }
}

/// Immutable snapshot of file, functions and variables for one format call.
pub struct EvaluationContext<'f> {
    file: &'f LocalizationFile,
    functions: FunctionRegistry,
    variables: IndexMap<String, Expression>,
    parents: Rc<RefCell<Vec<Parent>>>,
}

impl<'f> EvaluationContext<'f> {
    /// An empty context over `file`.
    pub fn new(file: &'f LocalizationFile) -> Self {
        Self {
            file,
            functions: FunctionRegistry::new(),
            variables: IndexMap::new(),
            parents: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub(crate) fn from_parts(
        file: &'f LocalizationFile,
        functions: FunctionRegistry,
        variables: IndexMap<String, Expression>,
        parents: Rc<RefCell<Vec<Parent>>>,
    ) -> Self {
        Self { file, functions, variables, parents }
    }

    pub fn file(&self) -> &'f LocalizationFile {
        self.file
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn variable(&self, name: &str) -> Option<&Expression> {
        self.variables.get(name)
    }

    pub fn variables(&self) -> &IndexMap<String, Expression> {
        &self.variables
    }

    pub(crate) fn parents(&self) -> Rc<RefCell<Vec<Parent>>> {
        Rc::clone(&self.parents)
    }

    /// A new context whose variables are the union with `overlay`, the
    /// overlay winning on name collisions. The parent stack is shared.
    pub fn overlay_variables(&self, overlay: &IndexMap<String, Expression>) -> Self {
        let mut variables = self.variables.clone();
        for (name, value) in overlay {
            variables.insert(name.clone(), value.clone());
        }
        Self {
            file: self.file,
            functions: self.functions.clone(),
            variables,
            parents: Rc::clone(&self.parents),
        }
    }

    /// A new context whose functions are the union with `overlay`, the
    /// overlay winning on name collisions. The parent stack is shared.
    pub fn overlay_functions(&self, overlay: &FunctionRegistry) -> Self {
        let mut functions = self.functions.clone();
        functions.merge(overlay);
        Self {
            file: self.file,
            functions,
            variables: self.variables.clone(),
            parents: Rc::clone(&self.parents),
        }
    }

    /// Push a named element on the parent stack, failing if it is already
    /// there. The returned guard pops it again when dropped.
    pub(crate) fn enter(&self, parent: Parent) -> Result<ParentGuard> {
        {
            let parents = self.parents.borrow();
            if parents.contains(&parent) {
                let mut path: Vec<String> = parents.iter().map(ToString::to_string).collect();
                path.push(parent.to_string());
                return Err(EvalError::Cycle { path: path.join(" -> ") });
            }
        }
        self.parents.borrow_mut().push(parent);
        Ok(ParentGuard { parents: Rc::clone(&self.parents) })
    }
}

impl std::fmt::Debug for EvaluationContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluationContext")
            .field("variables", &self.variables.keys().collect::<Vec<_>>())
            .field("functions", &self.functions)
            .field("parents", &self.parents.borrow())
            .finish()
    }
}

/// Collects variables and functions before a context is frozen.
#[derive(Default)]
pub struct ContextBuilder {
    variables: IndexMap<String, Expression>,
    functions: FunctionRegistry,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a variable to an arbitrary expression.
    pub fn variable(&mut self, name: &str, value: Expression) -> &mut Self {
        self.variables.insert(name.to_string(), value);
        self
    }

    pub fn string(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        self.variable(name, Expression::string(value))
    }

    pub fn integer(&mut self, name: &str, value: i64) -> &mut Self {
        self.variable(name, Expression::integer(value))
    }

    pub fn float(&mut self, name: &str, value: f64) -> &mut Self {
        self.variable(name, Expression::float(value))
    }

    pub fn boolean(&mut self, name: &str, value: bool) -> &mut Self {
        self.variable(name, Expression::string(if value { "true" } else { "false" }))
    }

    /// Merge a whole registry; later registrations win.
    pub fn functions(&mut self, registry: &FunctionRegistry) -> &mut Self {
        self.functions.merge(registry);
        self
    }

    /// Register a single function.
    pub fn function(&mut self, decl: FunctionDecl) -> &mut Self {
        self.functions.register(decl);
        self
    }

    /// Freeze into a context over `file`.
    pub fn build(self, file: &LocalizationFile) -> EvaluationContext<'_> {
        self.build_shared(file, Rc::new(RefCell::new(Vec::new())))
    }

    /// Freeze into a context that shares an existing parent stack, so cycle
    /// detection spans the merged scope.
    pub(crate) fn build_shared(
        self,
        file: &LocalizationFile,
        parents: Rc<RefCell<Vec<Parent>>>,
    ) -> EvaluationContext<'_> {
        EvaluationContext { file, functions: self.functions, variables: self.variables, parents }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::LocalizationFile;

    #[test]
    fn test_overlay_variables_is_non_destructive() {
        let file = LocalizationFile::parse("m = x\n").unwrap();
        let mut builder = ContextBuilder::new();
        builder.string("a", "outer").string("b", "kept");
        let outer = builder.build(&file);

        let mut overlay = IndexMap::new();
        overlay.insert("a".to_string(), Expression::string("inner"));
        let inner = outer.overlay_variables(&overlay);

        assert!(matches!(
            inner.variable("a").map(|e| &e.kind),
            Some(lingua_syntax::ExprKind::StringLiteral(s)) if s == "inner"
        ));
        assert!(inner.variable("b").is_some());
        // The outer context is untouched.
        assert!(matches!(
            outer.variable("a").map(|e| &e.kind),
            Some(lingua_syntax::ExprKind::StringLiteral(s)) if s == "outer"
        ));
    }

    #[test]
    fn test_overlaid_contexts_share_the_parent_stack() {
        let file = LocalizationFile::parse("m = x\n").unwrap();
        let outer = EvaluationContext::new(&file);
        let inner = outer.overlay_variables(&IndexMap::new());

        let _guard = outer.enter(Parent::Message("m".to_string())).unwrap();
        let err = inner.enter(Parent::Message("m".to_string())).unwrap_err();
        assert!(matches!(err, EvalError::Cycle { ref path } if path == "m -> m"));
    }

    #[test]
    fn test_parent_guard_pops_on_drop() {
        let file = LocalizationFile::parse("m = x\n").unwrap();
        let ctx = EvaluationContext::new(&file);
        {
            let _guard = ctx.enter(Parent::Term("t".to_string())).unwrap();
            assert_eq!(ctx.parents.borrow().len(), 1);
        }
        assert_eq!(ctx.parents.borrow().len(), 0);
        // Re-entering after the guard dropped is fine.
        assert!(ctx.enter(Parent::Term("t".to_string())).is_ok());
    }

    #[test]
    fn test_attribute_parents_render_with_their_entry() {
        let parent = Parent::Attribute { entry: "msg".into(), name: "title".into() };
        assert_eq!(parent.to_string(), "msg.title");
    }
}
