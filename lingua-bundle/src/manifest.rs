//! Serde model of the bundle manifest.
//!
//! Unknown keys are ignored on decode. The version must match
//! [`MANIFEST_VERSION`]; the check lives in [`crate::bundle::Bundle`] so a
//! raw manifest can still be inspected.

use indexmap::{IndexMap, IndexSet};
use serde::Deserialize;

use lingua_syntax::Expression;

/// The only manifest version this library accepts.
pub const MANIFEST_VERSION: u32 = 1;

/// Top-level manifest document.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    pub version: u32,
    pub default_locale: String,
    #[serde(default)]
    pub entries: IndexMap<String, ManifestEntry>,
    /// Bundle-wide default variables, overridden by entry-level ones.
    #[serde(default)]
    pub defaults: IndexMap<String, DefaultValue>,
}

/// One locale's entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestEntry {
    pub display_name: String,
    pub path: String,
    #[serde(default)]
    pub aliases: IndexSet<String>,
    #[serde(default)]
    pub defaults: IndexMap<String, DefaultValue>,
}

/// A default variable value, tagged by type in the JSON.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum DefaultValue {
    String(String),
    Long(i64),
    Double(f64),
    Bool(bool),
}

impl DefaultValue {
    /// The synthetic expression injected into a file's global context.
    pub fn to_expression(&self) -> Expression {
        match self {
            DefaultValue::String(value) => Expression::string(value.clone()),
            DefaultValue::Long(value) => Expression::integer(*value),
            DefaultValue::Double(value) => Expression::float(*value),
            DefaultValue::Bool(value) => {
                Expression::string(if *value { "true" } else { "false" })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_default_values_decode() {
        let json = r#"{
            "s": {"type": "string", "value": "Acme"},
            "l": {"type": "long", "value": 9},
            "d": {"type": "double", "value": 0.5},
            "b": {"type": "bool", "value": true}
        }"#;
        let values: IndexMap<String, DefaultValue> = serde_json::from_str(json).unwrap();
        assert_eq!(values["s"], DefaultValue::String("Acme".into()));
        assert_eq!(values["l"], DefaultValue::Long(9));
        assert_eq!(values["d"], DefaultValue::Double(0.5));
        assert_eq!(values["b"], DefaultValue::Bool(true));
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let json = r#"{
            "version": 1,
            "default_locale": "en-US",
            "entries": {},
            "someday": "maybe"
        }"#;
        let manifest: Manifest = serde_json::from_str(json).unwrap();
        assert_eq!(manifest.version, 1);
        assert!(manifest.entries.is_empty());
    }

    #[test]
    fn test_entries_keep_manifest_order() {
        let json = r#"{
            "version": 1,
            "default_locale": "b",
            "entries": {
                "b": {"display_name": "B", "path": "b.ftl"},
                "a": {"display_name": "A", "path": "a.ftl"}
            }
        }"#;
        let manifest: Manifest = serde_json::from_str(json).unwrap();
        let keys: Vec<_> = manifest.entries.keys().cloned().collect();
        assert_eq!(keys, vec!["b", "a"]);
    }
}
