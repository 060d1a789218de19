//! Observable input variables.

use std::sync::Arc;

use tokio::sync::watch;

use lingua_syntax::Expression;

/// A named variable whose changes re-trigger every formatted value that
/// subscribed to it. Clones share the same underlying channel, and that
/// shared identity is what the scope's memo table keys on.
#[derive(Clone)]
pub struct ReactiveVariable {
    name: String,
    sender: Arc<watch::Sender<Expression>>,
}

impl ReactiveVariable {
    pub fn new(name: &str, initial: Expression) -> Self {
        let (sender, _) = watch::channel(initial);
        Self { name: name.to_string(), sender: Arc::new(sender) }
    }

    pub fn string(name: &str, value: impl Into<String>) -> Self {
        Self::new(name, Expression::string(value))
    }

    pub fn integer(name: &str, value: i64) -> Self {
        Self::new(name, Expression::integer(value))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replace the value, waking all subscriptions.
    pub fn set(&self, value: Expression) {
        // Send only fails without receivers, which just means nobody is
        // listening yet.
        let _ = self.sender.send(value);
    }

    pub fn set_string(&self, value: impl Into<String>) {
        self.set(Expression::string(value));
    }

    pub fn set_integer(&self, value: i64) {
        self.set(Expression::integer(value));
    }

    /// Current value snapshot.
    pub fn get(&self) -> Expression {
        self.sender.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Expression> {
        self.sender.subscribe()
    }

    /// Stable identity of the underlying channel, shared by clones.
    pub(crate) fn identity(&self) -> usize {
        Arc::as_ptr(&self.sender) as usize
    }
}

impl std::fmt::Debug for ReactiveVariable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactiveVariable").field("name", &self.name).finish_non_exhaustive()
    }
}
