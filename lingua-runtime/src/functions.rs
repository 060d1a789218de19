//! Typed function declarations and the registry callers use to expose them.
//!
//! A declared function carries its return type and an ordered parameter
//! list. Call-site arguments are matched against the declaration with a
//! positional cursor: a named argument binds its parameter and moves the
//! cursor one past it, so later positional arguments resume from there.
//! Missing parameters are not an error; the callback sees the bound subset.

use std::sync::Arc;

use indexmap::IndexMap;

use lingua_syntax::{ExprKind, Expression, TokenRange, ValueType};

use crate::error::{EvalError, Result};

/// The bound subset of a call's arguments, by parameter name.
pub type FunctionArgs = IndexMap<String, Expression>;

type Callback = Arc<dyn Fn(&FunctionArgs) -> Option<Expression> + Send + Sync>;

/// A registered function: name, return type, ordered parameters and the
/// callback producing the result expression.
#[derive(Clone)]
pub struct FunctionDecl {
    name: String,
    return_type: ValueType,
    parameters: Vec<(String, ValueType)>,
    callback: Callback,
}

impl FunctionDecl {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn return_type(&self) -> ValueType {
        self.return_type
    }

    pub fn parameters(&self) -> &[(String, ValueType)] {
        &self.parameters
    }

    /// Run the callback. A `None` result makes the evaluator emit the
    /// `<missing:NAME()>` placeholder.
    pub fn invoke(&self, args: &FunctionArgs) -> Option<Expression> {
        (self.callback)(args)
    }
}

impl std::fmt::Debug for FunctionDecl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionDecl")
            .field("name", &self.name)
            .field("return_type", &self.return_type)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

/// Name-keyed set of function declarations.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: IndexMap<String, FunctionDecl>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> FunctionRegistryBuilder {
        FunctionRegistryBuilder { registry: Self::new() }
    }

    pub fn get(&self, name: &str) -> Option<&FunctionDecl> {
        self.functions.get(name)
    }

    pub fn register(&mut self, decl: FunctionDecl) {
        self.functions.insert(decl.name.clone(), decl);
    }

    /// Union with `overlay`, the overlay winning on name collisions.
    pub fn merge(&mut self, overlay: &FunctionRegistry) {
        for (name, decl) in &overlay.functions {
            self.functions.insert(name.clone(), decl.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// The static type of an expression, as used for parameter checks.
    ///
    /// Function references take the declared return type of their target. An
    /// unlowered term reference has no static type.
    pub fn static_type(&self, expression: &Expression) -> Result<ValueType> {
        match &expression.kind {
            ExprKind::StringLiteral(_) => Ok(ValueType::String),
            ExprKind::IntLiteral(_) | ExprKind::FloatLiteral(_) => Ok(ValueType::Number),
            ExprKind::Reference { .. } => Ok(ValueType::String),
            ExprKind::Select { .. } => Ok(ValueType::String),
            ExprKind::Compound(_) => Ok(ValueType::String),
            ExprKind::FunctionReference { name, .. } => self
                .get(name)
                .map(FunctionDecl::return_type)
                .ok_or_else(|| EvalError::UnresolvedFunction {
                    message: format!("unknown function {name}"),
                    range: expression.range,
                }),
            ExprKind::TermReference { name, .. } => Err(EvalError::Internal(format!(
                "term reference -{name} has no static type before lowering"
            ))),
        }
    }

    /// Match call-site arguments against a declaration.
    pub fn match_arguments(
        &self,
        decl: &FunctionDecl,
        call: &[(Option<String>, Expression)],
        call_range: TokenRange,
    ) -> Result<FunctionArgs> {
        let mut cursor = 0usize;
        let mut bound = FunctionArgs::new();
        for (name, expression) in call {
            let index = match name {
                Some(name) => decl
                    .parameters
                    .iter()
                    .position(|(parameter, _)| parameter == name)
                    .ok_or_else(|| EvalError::UnresolvedFunction {
                        message: format!("{} has no parameter named {name}", decl.name),
                        range: call_range,
                    })?,
                None => {
                    if cursor >= decl.parameters.len() {
                        return Err(EvalError::UnresolvedFunction {
                            message: format!(
                                "could not match parameter {cursor} of {}",
                                decl.name
                            ),
                            range: call_range,
                        });
                    }
                    cursor
                }
            };
            let (parameter, expected) = &decl.parameters[index];
            let found = self.static_type(expression)?;
            if found != *expected {
                return Err(EvalError::TypeMismatch {
                    parameter: parameter.clone(),
                    expected: *expected,
                    found,
                    range: expression.range,
                });
            }
            bound.insert(parameter.clone(), expression.clone());
            cursor = index + 1;
        }
        Ok(bound)
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Chained registration of several functions.
pub struct FunctionRegistryBuilder {
    registry: FunctionRegistry,
}

impl FunctionRegistryBuilder {
    /// Declare one function. The closure configures parameters and the body.
    pub fn function(
        mut self,
        name: &str,
        return_type: ValueType,
        configure: impl FnOnce(FunctionBuilder) -> FunctionBuilder,
    ) -> Self {
        let builder = configure(FunctionBuilder {
            name: name.to_string(),
            return_type,
            parameters: Vec::new(),
            callback: None,
        });
        self.registry.register(builder.build());
        self
    }

    pub fn build(self) -> FunctionRegistry {
        self.registry
    }
}

/// Declaration of a single function inside the registry builder.
pub struct FunctionBuilder {
    name: String,
    return_type: ValueType,
    parameters: Vec<(String, ValueType)>,
    callback: Option<Callback>,
}

impl FunctionBuilder {
    /// Append a parameter; declaration order is the positional order.
    pub fn param(mut self, name: &str, value_type: ValueType) -> Self {
        self.parameters.push((name.to_string(), value_type));
        self
    }

    /// Set the callback producing the result expression.
    pub fn body(
        mut self,
        callback: impl Fn(&FunctionArgs) -> Option<Expression> + Send + Sync + 'static,
    ) -> Self {
        self.callback = Some(Arc::new(callback));
        self
    }

    fn build(self) -> FunctionDecl {
        FunctionDecl {
            name: self.name,
            return_type: self.return_type,
            parameters: self.parameters,
            callback: self.callback.unwrap_or_else(|| Arc::new(|_| None)),
        }
    }
}
