//! Subscription scope: memoized formatted values over watch channels.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use lingua_runtime::{FunctionRegistry, LocalizationFile};
use lingua_syntax::Expression;

use crate::variable::ReactiveVariable;

#[derive(Clone, PartialEq, Eq, Hash)]
struct MemoKey {
    name: String,
    attribute: Option<String>,
    functions: usize,
    variables: Vec<usize>,
}

/// Owns the active localization file and a memo table of live formatted
/// values.
///
/// Subscriptions created through [`LocalizationScope::formatted`] re-emit
/// whenever the file or any of their variables change. The scope must live
/// inside a tokio runtime; each distinct subscription drives one background
/// task.
pub struct LocalizationScope {
    file: watch::Sender<Arc<LocalizationFile>>,
    functions: Arc<FunctionRegistry>,
    memo: DashMap<MemoKey, watch::Receiver<String>>,
}

impl LocalizationScope {
    pub fn new(file: Arc<LocalizationFile>, functions: FunctionRegistry) -> Self {
        let (sender, _) = watch::channel(file);
        Self { file: sender, functions: Arc::new(functions), memo: DashMap::new() }
    }

    /// The current file snapshot.
    pub fn file(&self) -> Arc<LocalizationFile> {
        self.file.borrow().clone()
    }

    /// Swap the active file, typically after a locale change. Every live
    /// subscription recomputes against the new file.
    pub fn set_file(&self, file: Arc<LocalizationFile>) {
        debug!("swapping active localization file");
        let _ = self.file.send(file);
    }

    /// Number of live distinct subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.memo.len()
    }

    /// A formatted value for `name`, re-emitted on every input change.
    /// Identical subscriptions share one computation and its latest value.
    pub fn formatted(
        &self,
        name: &str,
        variables: &[ReactiveVariable],
    ) -> watch::Receiver<String> {
        self.subscription(name, None, variables)
    }

    /// Like [`LocalizationScope::formatted`], for `name.attribute`.
    pub fn formatted_attr(
        &self,
        name: &str,
        attribute: &str,
        variables: &[ReactiveVariable],
    ) -> watch::Receiver<String> {
        self.subscription(name, Some(attribute), variables)
    }

    fn subscription(
        &self,
        name: &str,
        attribute: Option<&str>,
        variables: &[ReactiveVariable],
    ) -> watch::Receiver<String> {
        let key = MemoKey {
            name: name.to_string(),
            attribute: attribute.map(str::to_string),
            functions: Arc::as_ptr(&self.functions) as usize,
            variables: variables.iter().map(ReactiveVariable::identity).collect(),
        };
        self.memo
            .entry(key)
            .or_insert_with(|| self.spawn_subscription(name, attribute, variables))
            .clone()
    }

    fn spawn_subscription(
        &self,
        name: &str,
        attribute: Option<&str>,
        variables: &[ReactiveVariable],
    ) -> watch::Receiver<String> {
        let name = name.to_string();
        let attribute = attribute.map(str::to_string);
        let functions = Arc::clone(&self.functions);
        let file_rx = self.file.subscribe();
        let inputs: Vec<(String, watch::Receiver<Expression>)> = variables
            .iter()
            .map(|variable| (variable.name().to_string(), variable.subscribe()))
            .collect();

        // Forwarder receivers are taken before the initial value is
        // computed, so a change landing in between still produces a tick.
        let file_forward = self.file.subscribe();
        let value_forwards: Vec<_> = inputs.iter().map(|(_, rx)| rx.clone()).collect();

        let initial = compute(&name, attribute.as_deref(), &functions, &file_rx, &inputs);
        let (out_tx, out_rx) = watch::channel(initial);

        // One forwarder per input funnels change ticks into the recompute
        // loop; the loop drains pending ticks so bursts collapse to the
        // latest snapshot.
        let (tick_tx, mut tick_rx) = mpsc::channel::<()>(8);
        spawn_forwarder(file_forward, tick_tx.clone());
        for rx in value_forwards {
            spawn_forwarder(rx, tick_tx.clone());
        }
        drop(tick_tx);

        tokio::spawn(async move {
            while tick_rx.recv().await.is_some() {
                while tick_rx.try_recv().is_ok() {}
                let value = compute(&name, attribute.as_deref(), &functions, &file_rx, &inputs);
                if out_tx.send(value).is_err() {
                    break;
                }
            }
            debug!(name = %name, "formatted subscription closed");
        });

        out_rx
    }
}

fn spawn_forwarder<T: Send + Sync + 'static>(mut rx: watch::Receiver<T>, tick: mpsc::Sender<()>) {
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            if tick.send(()).await.is_err() {
                break;
            }
        }
    });
}

fn compute(
    name: &str,
    attribute: Option<&str>,
    functions: &FunctionRegistry,
    file_rx: &watch::Receiver<Arc<LocalizationFile>>,
    inputs: &[(String, watch::Receiver<Expression>)],
) -> String {
    let file = file_rx.borrow().clone();
    let result = match attribute {
        None => file.format(name, |builder| {
            builder.functions(functions);
            for (var_name, rx) in inputs {
                builder.variable(var_name, rx.borrow().clone());
            }
        }),
        Some(attribute) => file.format_attr(name, attribute, |builder| {
            builder.functions(functions);
            for (var_name, rx) in inputs {
                builder.variable(var_name, rx.borrow().clone());
            }
        }),
    };
    match result {
        Ok(value) => value,
        Err(error) => {
            warn!(name, %error, "formatting failed, emitting placeholder");
            match attribute {
                None => format!("<{name}>"),
                Some(attribute) => format!("<{name}.{attribute}>"),
            }
        }
    }
}

impl std::fmt::Debug for LocalizationScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalizationScope")
            .field("subscriptions", &self.memo.len())
            .finish_non_exhaustive()
    }
}
