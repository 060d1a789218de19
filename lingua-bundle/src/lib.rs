//! Locale manifest, resolution and resource loading for Fluent bundles.
//!
//! A [`Bundle`] is decoded from a JSON manifest mapping locale codes to
//! resource paths, optional aliases and default variables. It holds no
//! parsed files: each locale is parsed on demand through a caller-supplied
//! resource opener, with the manifest's default variables injected into the
//! parsed file's global context.

pub mod bundle;
pub mod error;
pub mod manifest;
pub mod opener;

pub use bundle::Bundle;
pub use error::{BundleError, Result};
pub use manifest::{DefaultValue, Manifest, ManifestEntry, MANIFEST_VERSION};
pub use opener::{from_fn, AsyncResourceOpener, DirectoryOpener, FnOpener, ResourceOpener};
