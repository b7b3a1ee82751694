//! Credential resolution: merges source defaults with user overrides.
//!
//! For each [`FieldName`] the resolver picks, in order:
//! 1. A non-empty user override ([`Provenance::UserOverridden`])
//! 2. A non-empty default from the [`ConfigurationSource`] ([`Provenance::Default`])
//! 3. Nothing ([`Provenance::Unset`])
//!
//! Resolution is a pure function of its inputs and is re-run on every edit.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::secrets;
use crate::source::{ConfigurationSource, non_empty};
use crate::types::FieldName;

// ─────────────────────────────────────────────────────────────────────────────
// Provenance
// ─────────────────────────────────────────────────────────────────────────────

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    /// Supplied by the deployment's configuration source.
    Default,
    /// Typed in by the user for this session.
    UserOverridden,
    /// Neither the source nor the user supplied a value.
    Unset,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Default => write!(f, "default"),
            Provenance::UserOverridden => write!(f, "user-overridden"),
            Provenance::Unset => write!(f, "unset"),
        }
    }
}

/// A single resolved field. The value is present iff provenance is not `Unset`.
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedField {
    value: Option<String>,
    provenance: Provenance,
}

impl ResolvedField {
    fn default_value(value: String) -> Self {
        Self {
            value: Some(value),
            provenance: Provenance::Default,
        }
    }

    fn overridden(value: String) -> Self {
        Self {
            value: Some(value),
            provenance: Provenance::UserOverridden,
        }
    }

    fn unset() -> Self {
        Self {
            value: None,
            provenance: Provenance::Unset,
        }
    }

    /// The resolved value.
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Where the value came from.
    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    /// True if no value was found.
    pub fn is_unset(&self) -> bool {
        self.provenance == Provenance::Unset
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Effective config
// ─────────────────────────────────────────────────────────────────────────────

/// The merged per-session configuration driving guarded completions.
///
/// `Debug` and [`describe`](Self::describe) never print secrets in full.
#[derive(Clone, PartialEq, Eq)]
pub struct EffectiveConfig {
    kentron_api_key: ResolvedField,
    openai_api_key: ResolvedField,
    policy_id: ResolvedField,
}

impl EffectiveConfig {
    /// Access a field by name.
    pub fn field(&self, field: FieldName) -> &ResolvedField {
        match field {
            FieldName::KentronApiKey => &self.kentron_api_key,
            FieldName::OpenaiApiKey => &self.openai_api_key,
            FieldName::PolicyId => &self.policy_id,
        }
    }

    /// The Kentron API key, if resolved.
    pub fn kentron_api_key(&self) -> Option<&str> {
        self.kentron_api_key.value()
    }

    /// The provider (OpenAI) API key, if resolved.
    pub fn openai_api_key(&self) -> Option<&str> {
        self.openai_api_key.value()
    }

    /// The guardrail policy identifier, if resolved.
    pub fn policy_id(&self) -> Option<&str> {
        self.policy_id.value()
    }

    /// True iff no field is `Unset`.
    pub fn is_complete(&self) -> bool {
        FieldName::ALL.iter().all(|f| !self.field(*f).is_unset())
    }

    /// Fields that are still `Unset`, in declaration order.
    pub fn missing_fields(&self) -> Vec<FieldName> {
        FieldName::ALL
            .into_iter()
            .filter(|f| self.field(*f).is_unset())
            .collect()
    }

    /// Display-safe rendering of a field: masked for secrets, previewed otherwise.
    pub fn describe(&self, field: FieldName) -> String {
        match self.field(field).value() {
            None => "(not set)".to_string(),
            Some(v) if field.is_secret() => secrets::mask(v),
            Some(v) => secrets::preview(v),
        }
    }
}

impl fmt::Debug for EffectiveConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("EffectiveConfig");
        for field in FieldName::ALL {
            s.field(
                field.config_key(),
                &format_args!("{} ({})", self.describe(field), self.field(field).provenance()),
            );
        }
        s.finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Overrides
// ─────────────────────────────────────────────────────────────────────────────

/// User-supplied values for some subset of the fields.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CredentialOverrides {
    kentron_api_key: Option<String>,
    openai_api_key: Option<String>,
    policy_id: Option<String>,
}

impl CredentialOverrides {
    /// No overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an override (builder style).
    pub fn with(mut self, field: FieldName, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    /// Set an override. An empty value is stored but ignored by resolution.
    pub fn set(&mut self, field: FieldName, value: impl Into<String>) {
        *self.slot(field) = Some(value.into());
    }

    /// Remove an override, falling back to the default.
    pub fn clear(&mut self, field: FieldName) {
        *self.slot(field) = None;
    }

    /// The override for a field, if set and non-empty.
    pub fn get(&self, field: FieldName) -> Option<&str> {
        let value = match field {
            FieldName::KentronApiKey => &self.kentron_api_key,
            FieldName::OpenaiApiKey => &self.openai_api_key,
            FieldName::PolicyId => &self.policy_id,
        };
        value.as_deref().filter(|v| !v.trim().is_empty())
    }

    fn slot(&mut self, field: FieldName) -> &mut Option<String> {
        match field {
            FieldName::KentronApiKey => &mut self.kentron_api_key,
            FieldName::OpenaiApiKey => &mut self.openai_api_key,
            FieldName::PolicyId => &mut self.policy_id,
        }
    }
}

impl fmt::Debug for CredentialOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let set: Vec<_> = FieldName::ALL
            .into_iter()
            .filter(|field| self.get(*field).is_some())
            .collect();
        f.debug_struct("CredentialOverrides")
            .field("set", &set)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Resolution
// ─────────────────────────────────────────────────────────────────────────────

/// Merge source defaults with user overrides.
pub fn resolve(
    defaults: &dyn ConfigurationSource,
    overrides: &CredentialOverrides,
) -> EffectiveConfig {
    let pick = |field: FieldName| -> ResolvedField {
        if let Some(value) = overrides.get(field) {
            return ResolvedField::overridden(value.to_string());
        }
        match non_empty(defaults.get(field)) {
            Some(value) => ResolvedField::default_value(value),
            None => ResolvedField::unset(),
        }
    };

    EffectiveConfig {
        kentron_api_key: pick(FieldName::KentronApiKey),
        openai_api_key: pick(FieldName::OpenaiApiKey),
        policy_id: pick(FieldName::PolicyId),
    }
}

/// True iff no field of `config` is `Unset`.
pub fn is_complete(config: &EffectiveConfig) -> bool {
    config.is_complete()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
