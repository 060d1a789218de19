//! Reactive façade over the core formatter.
//!
//! A [`LocalizationScope`] owns the active [`LocalizationFile`] and hands
//! out watch channels of formatted strings. Whenever the file or any input
//! variable changes, every subscription depending on it re-emits the latest
//! formatted value; bursts of changes coalesce to the most recent snapshot.
//! Identical subscriptions share one computation through the scope's memo
//! table, the only locked state in this layer.
//!
//! [`LocalizationFile`]: lingua_runtime::LocalizationFile

pub mod scope;
pub mod variable;

pub use scope::LocalizationScope;
pub use variable::ReactiveVariable;
