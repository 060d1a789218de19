//! Locale resolution and on-demand resource loading.

use std::io::Read;
use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};
use unic_langid::LanguageIdentifier;

use lingua_runtime::{ContextBuilder, ContextInit, LocalizationFile};

use crate::error::{BundleError, Result};
use crate::manifest::{Manifest, ManifestEntry, MANIFEST_VERSION};
use crate::opener::{AsyncResourceOpener, ResourceOpener};

/// A decoded manifest mapping locale codes to resources.
///
/// The bundle holds no parsed files and no cache: every [`Bundle::load_locale`]
/// call resolves the entry, opens its path once and parses the stream, so a
/// cancelled or failed load leaves nothing behind.
#[derive(Debug, Clone)]
pub struct Bundle {
    manifest: Manifest,
}

impl Bundle {
    /// Decode a manifest from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_manifest(serde_json::from_str(json)?)
    }

    /// Decode a manifest from a reader.
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        Self::from_manifest(serde_json::from_reader(reader)?)
    }

    /// Wrap an already-decoded manifest, checking its version.
    pub fn from_manifest(manifest: Manifest) -> Result<Self> {
        if manifest.version != MANIFEST_VERSION {
            return Err(BundleError::Version {
                found: manifest.version,
                expected: MANIFEST_VERSION,
            });
        }
        debug!(
            locales = manifest.entries.len(),
            default_locale = %manifest.default_locale,
            "decoded bundle manifest"
        );
        Ok(Self { manifest })
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn default_locale(&self) -> &str {
        &self.manifest.default_locale
    }

    /// Iterate locale codes and entries in manifest order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &ManifestEntry)> {
        self.manifest.entries.iter().map(|(key, entry)| (key.as_str(), entry))
    }

    /// The display name for a locale-picker UI, if the locale resolves.
    pub fn display_name(&self, locale: &str) -> Option<&str> {
        let key = self.find_closest_locale(locale)?;
        self.manifest.entries.get(key).map(|entry| entry.display_name.as_str())
    }

    /// Resolve a requested locale: an exact entry key first, then the
    /// aliases of each entry in manifest order. The requested code is also
    /// tried in normalized form, so `en-us` finds `en-US`.
    pub fn find_closest_locale(&self, requested: &str) -> Option<&str> {
        let mut candidates = vec![requested.to_string()];
        if let Some(normalized) = normalize(requested) {
            if normalized != requested {
                candidates.push(normalized);
            }
        }
        for candidate in &candidates {
            if let Some((key, _)) = self.manifest.entries.get_key_value(candidate.as_str()) {
                return Some(key);
            }
        }
        for candidate in &candidates {
            for (key, entry) in &self.manifest.entries {
                if entry.aliases.contains(candidate.as_str()) {
                    return Some(key);
                }
            }
        }
        None
    }

    /// Resolve the requested locale, falling back to the default locale.
    pub fn closest_entry_or_default(&self, requested: &str) -> Result<(&str, &ManifestEntry)> {
        let key = self.find_closest_locale(requested).or_else(|| {
            warn!(requested, default = %self.manifest.default_locale, "falling back to default locale");
            self.find_closest_locale(&self.manifest.default_locale)
        });
        match key {
            Some(key) => Ok((key, &self.manifest.entries[key])),
            None => Err(BundleError::UnknownLocale {
                requested: requested.to_string(),
                default: self.manifest.default_locale.clone(),
            }),
        }
    }

    /// Resolve `requested`, open its resource once and parse it, injecting
    /// the bundle-level then entry-level default variables into the file's
    /// global context. Entry defaults win on name collisions.
    pub fn load_locale(
        &self,
        requested: &str,
        opener: &dyn ResourceOpener,
    ) -> Result<LocalizationFile> {
        let (key, entry) = self.closest_entry_or_default(requested)?;
        debug!(requested, resolved = key, path = %entry.path, "loading locale resource");
        let mut reader = opener.open(&entry.path).map_err(|source| BundleError::Resource {
            path: entry.path.clone(),
            source,
        })?;
        let mut source = String::new();
        reader.read_to_string(&mut source).map_err(|io| BundleError::Resource {
            path: entry.path.clone(),
            source: io,
        })?;
        let file = LocalizationFile::parse_with(&source, Some(self.defaults_init(entry)), true)
            .map_err(BundleError::from)?;
        info!(locale = key, "loaded locale");
        Ok(file)
    }

    /// Asynchronous variant of [`Bundle::load_locale`]; suspension happens
    /// only at the opener and stream boundary.
    pub async fn load_locale_async(
        &self,
        requested: &str,
        opener: &dyn AsyncResourceOpener,
    ) -> Result<LocalizationFile> {
        let (key, entry) = self.closest_entry_or_default(requested)?;
        debug!(requested, resolved = key, path = %entry.path, "loading locale resource");
        let mut reader =
            opener.open(&entry.path).await.map_err(|source| BundleError::Resource {
                path: entry.path.clone(),
                source,
            })?;
        let mut source = String::new();
        reader.read_to_string(&mut source).await.map_err(|io| BundleError::Resource {
            path: entry.path.clone(),
            source: io,
        })?;
        let file = LocalizationFile::parse_with(&source, Some(self.defaults_init(entry)), true)
            .map_err(BundleError::from)?;
        info!(locale = key, "loaded locale");
        Ok(file)
    }

    fn defaults_init(&self, entry: &ManifestEntry) -> Arc<ContextInit> {
        let mut defaults = self.manifest.defaults.clone();
        for (name, value) in &entry.defaults {
            defaults.insert(name.clone(), value.clone());
        }
        Arc::new(move |builder: &mut ContextBuilder| {
            for (name, value) in &defaults {
                builder.variable(name, value.to_expression());
            }
        })
    }
}

fn normalize(code: &str) -> Option<String> {
    code.parse::<LanguageIdentifier>().ok().map(|id| id.to_string())
}
