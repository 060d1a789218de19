//! Error types for bundle decoding and locale loading.

use thiserror::Error;

/// Result type alias for bundle operations.
pub type Result<T> = std::result::Result<T, BundleError>;

/// Errors raised while decoding a manifest or loading a locale.
#[derive(Debug, Error)]
pub enum BundleError {
    /// The manifest declares a version this library does not speak.
    #[error("unsupported bundle manifest version {found}, expected {expected}")]
    Version { found: u32, expected: u32 },

    /// Neither the requested locale nor the default locale resolve to an
    /// entry.
    #[error("no bundle entry for locale {requested:?} or default {default:?}")]
    UnknownLocale { requested: String, default: String },

    /// The manifest JSON could not be decoded.
    #[error("malformed bundle manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    /// The resource opener failed for a locale's path.
    #[error("failed to read locale resource {path:?}")]
    Resource {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The opened resource failed to parse.
    #[error(transparent)]
    Eval(#[from] lingua_runtime::EvalError),
}
