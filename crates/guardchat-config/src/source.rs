//! Read-only providers of operator-supplied credential defaults.
//!
//! Resolution order for the stock deployment ([`LayeredSource::deployment`]):
//! 1. Environment variable (`KENTRON_API_KEY`, `OPENAI_API_KEY`, `POLICY_ID`)
//! 2. `[defaults]` section of the config file
//!
//! Empty and whitespace-only values are treated as absent by every source.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::types::{DefaultsSection, FieldName};

/// A read-only provider of default values.
///
/// Sources are shared freely across sessions, so implementations must be
/// `Send + Sync` and must not mutate observable state in [`get`](Self::get).
pub trait ConfigurationSource: Send + Sync {
    /// Look up the default for a field. Returns `None` when absent or empty.
    fn get(&self, field: FieldName) -> Option<String>;

    /// Short name used in diagnostics.
    fn name(&self) -> &str;
}

/// Shared handle to a configuration source.
pub type SharedSource = Arc<dyn ConfigurationSource>;

/// Normalize a raw value: blank strings become `None`.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl<S: ConfigurationSource + ?Sized> ConfigurationSource for Arc<S> {
    fn get(&self, field: FieldName) -> Option<String> {
        (**self).get(field)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Environment
// ─────────────────────────────────────────────────────────────────────────────

type Lookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Reads defaults from environment variables named by [`FieldName::env_var`].
pub struct EnvSource {
    lookup: Lookup,
}

impl EnvSource {
    /// Read from the process environment.
    pub fn new() -> Self {
        Self::with_lookup(|key| std::env::var(key).ok())
    }

    /// Read through a custom lookup function (keyed by env var name).
    pub fn with_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            lookup: Box::new(lookup),
        }
    }
}

impl Default for EnvSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigurationSource for EnvSource {
    fn get(&self, field: FieldName) -> Option<String> {
        non_empty((self.lookup)(field.env_var()))
    }

    fn name(&self) -> &str {
        "environment"
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Static values
// ─────────────────────────────────────────────────────────────────────────────

/// A fixed set of defaults, e.g. the `[defaults]` section of a config file.
#[derive(Clone, Default)]
pub struct StaticSource {
    name: String,
    values: BTreeMap<FieldName, String>,
}

impl StaticSource {
    /// Create an empty source.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: BTreeMap::new(),
        }
    }

    /// Build from the `[defaults]` section of a loaded config.
    pub fn from_defaults(defaults: &DefaultsSection) -> Self {
        let mut source = Self::new("config file");
        for field in FieldName::ALL {
            if let Some(value) = defaults.get(field) {
                source = source.with(field, value);
            }
        }
        source
    }

    /// Set a value (builder style).
    pub fn with(mut self, field: FieldName, value: impl Into<String>) -> Self {
        self.values.insert(field, value.into());
        self
    }
}

impl ConfigurationSource for StaticSource {
    fn get(&self, field: FieldName) -> Option<String> {
        non_empty(self.values.get(&field).cloned())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for StaticSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticSource")
            .field("name", &self.name)
            .field("fields", &self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Layering
// ─────────────────────────────────────────────────────────────────────────────

/// An ordered stack of sources; the first non-empty value wins.
#[derive(Default)]
pub struct LayeredSource {
    layers: Vec<SharedSource>,
}

impl LayeredSource {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// The stock deployment stack: process environment, then file defaults.
    pub fn deployment(file_defaults: Option<&DefaultsSection>) -> Self {
        let mut layered = Self::new().with_layer(EnvSource::new());
        if let Some(defaults) = file_defaults {
            layered = layered.with_layer(StaticSource::from_defaults(defaults));
        }
        layered
    }

    /// Append a lower-precedence layer.
    pub fn with_layer(mut self, source: impl ConfigurationSource + 'static) -> Self {
        self.layers.push(Arc::new(source));
        self
    }

    /// Which layer supplies a field, if any.
    pub fn origin_of(&self, field: FieldName) -> Option<&str> {
        self.layers
            .iter()
            .find(|layer| layer.get(field).is_some())
            .map(|layer| layer.name())
    }
}

impl ConfigurationSource for LayeredSource {
    fn get(&self, field: FieldName) -> Option<String> {
        self.layers.iter().find_map(|layer| layer.get(field))
    }

    fn name(&self) -> &str {
        "layered"
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn env_with(pairs: &'static [(&'static str, &'static str)]) -> EnvSource {
        EnvSource::with_lookup(move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        })
    }

    #[test]
    fn test_env_source_reads_by_env_var_name() {
        let env = env_with(&[("KENTRON_API_KEY", "kt-env"), ("POLICY_ID", "p-env")]);
        assert_eq!(env.get(FieldName::KentronApiKey).as_deref(), Some("kt-env"));
        assert_eq!(env.get(FieldName::PolicyId).as_deref(), Some("p-env"));
        assert_eq!(env.get(FieldName::OpenaiApiKey), None);
    }

    #[test]
    fn test_empty_values_are_absent() {
        let env = env_with(&[("POLICY_ID", "   ")]);
        assert_eq!(env.get(FieldName::PolicyId), None);

        let fixed = StaticSource::new("test").with(FieldName::PolicyId, "");
        assert_eq!(fixed.get(FieldName::PolicyId), None);
    }

    #[test]
    fn test_static_source_from_defaults() {
        let defaults = DefaultsSection {
            kentron_api_key: None,
            openai_api_key: Some("sk-file".to_string()),
            policy_id: Some("p-file".to_string()),
        };
        let source = StaticSource::from_defaults(&defaults);
        assert_eq!(source.get(FieldName::OpenaiApiKey).as_deref(), Some("sk-file"));
        assert_eq!(source.get(FieldName::KentronApiKey), None);
        assert_eq!(source.name(), "config file");
    }

    #[test]
    fn test_layered_first_non_empty_wins() {
        let layered = LayeredSource::new()
            .with_layer(env_with(&[("POLICY_ID", ""), ("OPENAI_API_KEY", "sk-env")]))
            .with_layer(
                StaticSource::new("file")
                    .with(FieldName::PolicyId, "p-file")
                    .with(FieldName::OpenaiApiKey, "sk-file"),
            );

        assert_eq!(layered.get(FieldName::OpenaiApiKey).as_deref(), Some("sk-env"));
        assert_eq!(layered.get(FieldName::PolicyId).as_deref(), Some("p-file"));
        assert_eq!(layered.get(FieldName::KentronApiKey), None);

        assert_eq!(layered.origin_of(FieldName::OpenaiApiKey), Some("environment"));
        assert_eq!(layered.origin_of(FieldName::PolicyId), Some("file"));
        assert_eq!(layered.origin_of(FieldName::KentronApiKey), None);
    }

    #[test]
    fn test_static_debug_hides_values() {
        let source = StaticSource::new("t").with(FieldName::OpenaiApiKey, "sk-secret-value");
        assert!(!format!("{:?}", source).contains("sk-secret-value"));
    }
}
