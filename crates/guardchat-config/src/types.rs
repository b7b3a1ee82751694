//! Configuration types mapping to the TOML schema.
//!
//! Top-level config:
//! ```toml
//! [proxy]       # guardrail proxy endpoint and request settings
//! [defaults]    # operator-supplied credential defaults
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Default guardrail proxy endpoint (OpenAI-compatible).
pub const DEFAULT_PROXY_BASE_URL: &str = "http://demo.kentron.ai/v1";

/// Default completion model requested through the proxy.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default per-request deadline in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default initial backoff for the opt-in retry wrapper.
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;

// ─────────────────────────────────────────────────────────────────────────────
// Credential fields
// ─────────────────────────────────────────────────────────────────────────────

/// One of the three values that govern a guarded completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    /// Kentron API key, sent as `X-API-KEY`.
    KentronApiKey,
    /// Provider key used by the proxy in BYOK mode.
    OpenaiApiKey,
    /// Guardrail policy identifier, sent as `X-Policy-ID`.
    PolicyId,
}

impl FieldName {
    /// All fields in declaration order.
    pub const ALL: [FieldName; 3] = [
        FieldName::KentronApiKey,
        FieldName::OpenaiApiKey,
        FieldName::PolicyId,
    ];

    /// Environment variable / secret-store key for this field.
    pub fn env_var(&self) -> &'static str {
        match self {
            FieldName::KentronApiKey => "KENTRON_API_KEY",
            FieldName::OpenaiApiKey => "OPENAI_API_KEY",
            FieldName::PolicyId => "POLICY_ID",
        }
    }

    /// Key used in the `[defaults]` section of the config file.
    pub fn config_key(&self) -> &'static str {
        match self {
            FieldName::KentronApiKey => "kentron_api_key",
            FieldName::OpenaiApiKey => "openai_api_key",
            FieldName::PolicyId => "policy_id",
        }
    }

    /// Human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            FieldName::KentronApiKey => "Kentron API Key",
            FieldName::OpenaiApiKey => "OpenAI API Key",
            FieldName::PolicyId => "Policy ID",
        }
    }

    /// Whether values of this field must never be shown in full.
    pub fn is_secret(&self) -> bool {
        !matches!(self, FieldName::PolicyId)
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldName::KentronApiKey => "kentron-api-key",
            FieldName::OpenaiApiKey => "openai-api-key",
            FieldName::PolicyId => "policy-id",
        };
        f.write_str(name)
    }
}

impl FromStr for FieldName {
    type Err = ConfigError;

    /// Accepts kebab-case, snake_case, env-var spelling and short aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "kentron_api_key" | "kentron_key" | "kentron" => Ok(FieldName::KentronApiKey),
            "openai_api_key" | "openai_key" | "openai" => Ok(FieldName::OpenaiApiKey),
            "policy_id" | "policy" => Ok(FieldName::PolicyId),
            _ => Err(ConfigError::UnknownField(s.to_string())),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g. a project-local
/// file that only sets a policy) can be loaded and merged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardchatConfig {
    /// Guardrail proxy settings.
    pub proxy: Option<ProxySection>,

    /// Operator-supplied credential defaults.
    pub defaults: Option<DefaultsSection>,
}

impl GuardchatConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string, rejecting unusable proxy settings.
    pub fn from_toml(toml_str: &str) -> crate::Result<Self> {
        let config: Self = toml::from_str(toml_str)?;
        if let Some(ref proxy) = config.proxy {
            proxy.validate()?;
        }
        Ok(config)
    }

    /// Merge another config on top of this one (other takes priority).
    pub fn merge(&mut self, other: GuardchatConfig) {
        if let Some(proxy) = other.proxy {
            match self.proxy {
                Some(ref mut base) => base.merge(proxy),
                None => self.proxy = Some(proxy),
            }
        }
        if let Some(defaults) = other.defaults {
            match self.defaults {
                Some(ref mut base) => base.merge(defaults),
                None => self.defaults = Some(defaults),
            }
        }
    }

    /// Proxy settings with built-in defaults filled in.
    pub fn proxy_settings(&self) -> ProxySettings {
        let section = self.proxy.clone().unwrap_or_default();
        ProxySettings {
            base_url: section
                .base_url
                .unwrap_or_else(|| DEFAULT_PROXY_BASE_URL.to_string()),
            model: section.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout: Duration::from_secs(section.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            retry_max: section.retry_max.unwrap_or(0),
            retry_backoff: Duration::from_millis(
                section.retry_backoff_ms.unwrap_or(DEFAULT_RETRY_BACKOFF_MS),
            ),
            system_prompt: section.system_prompt,
        }
    }
}

/// The `[proxy]` section as written in the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySection {
    /// Base URL of the guardrail proxy (OpenAI-compatible).
    pub base_url: Option<String>,
    /// Model requested from the upstream provider.
    pub model: Option<String>,
    /// Per-request deadline.
    pub timeout_secs: Option<u64>,
    /// Bounded retries for 5xx upstream errors (0 disables).
    pub retry_max: Option<u32>,
    /// Initial backoff between retries.
    pub retry_backoff_ms: Option<u64>,
    /// Optional system prompt prepended to every conversation.
    pub system_prompt: Option<String>,
}

impl ProxySection {
    fn validate(&self) -> crate::Result<()> {
        if self.timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "proxy.timeout_secs".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if let Some(ref url) = self.base_url
            && url.trim().is_empty()
        {
            return Err(ConfigError::InvalidValue {
                field: "proxy.base_url".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    fn merge(&mut self, other: ProxySection) {
        if other.base_url.is_some() {
            self.base_url = other.base_url;
        }
        if other.model.is_some() {
            self.model = other.model;
        }
        if other.timeout_secs.is_some() {
            self.timeout_secs = other.timeout_secs;
        }
        if other.retry_max.is_some() {
            self.retry_max = other.retry_max;
        }
        if other.retry_backoff_ms.is_some() {
            self.retry_backoff_ms = other.retry_backoff_ms;
        }
        if other.system_prompt.is_some() {
            self.system_prompt = other.system_prompt;
        }
    }
}

/// The `[defaults]` section: operator-supplied credential defaults.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsSection {
    pub kentron_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub policy_id: Option<String>,
}

impl DefaultsSection {
    /// Value configured for a field, if any.
    pub fn get(&self, field: FieldName) -> Option<&str> {
        match field {
            FieldName::KentronApiKey => self.kentron_api_key.as_deref(),
            FieldName::OpenaiApiKey => self.openai_api_key.as_deref(),
            FieldName::PolicyId => self.policy_id.as_deref(),
        }
    }

    /// True if the file carries a secret in plaintext.
    pub fn has_plaintext_secret(&self) -> bool {
        FieldName::ALL
            .iter()
            .filter(|f| f.is_secret())
            .any(|f| self.get(*f).is_some_and(|v| !v.trim().is_empty()))
    }

    fn merge(&mut self, other: DefaultsSection) {
        if other.kentron_api_key.is_some() {
            self.kentron_api_key = other.kentron_api_key;
        }
        if other.openai_api_key.is_some() {
            self.openai_api_key = other.openai_api_key;
        }
        if other.policy_id.is_some() {
            self.policy_id = other.policy_id;
        }
    }
}

impl fmt::Debug for DefaultsSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultsSection")
            .field(
                "kentron_api_key",
                &self.kentron_api_key.as_deref().map(crate::secrets::mask),
            )
            .field(
                "openai_api_key",
                &self.openai_api_key.as_deref().map(crate::secrets::mask),
            )
            .field("policy_id", &self.policy_id)
            .finish()
    }
}

/// Fully populated proxy settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxySettings {
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    pub retry_max: u32,
    pub retry_backoff: Duration,
    pub system_prompt: Option<String>,
}

impl Default for ProxySettings {
    fn default() -> Self {
        GuardchatConfig::new().proxy_settings()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_name_parsing() {
        assert_eq!("kentron-api-key".parse::<FieldName>().unwrap(), FieldName::KentronApiKey);
        assert_eq!("OPENAI_API_KEY".parse::<FieldName>().unwrap(), FieldName::OpenaiApiKey);
        assert_eq!("policy".parse::<FieldName>().unwrap(), FieldName::PolicyId);
        assert!(matches!(
            "model".parse::<FieldName>(),
            Err(ConfigError::UnknownField(f)) if f == "model"
        ));
    }

    #[test]
    fn test_field_name_display_roundtrips_through_parse() {
        for field in FieldName::ALL {
            assert_eq!(field.to_string().parse::<FieldName>().unwrap(), field);
        }
    }

    #[test]
    fn test_only_policy_is_not_secret() {
        assert!(FieldName::KentronApiKey.is_secret());
        assert!(FieldName::OpenaiApiKey.is_secret());
        assert!(!FieldName::PolicyId.is_secret());
    }

    #[test]
    fn test_parse_full_config() {
        let config = GuardchatConfig::from_toml(
            r#"
[proxy]
base_url = "https://proxy.example/v1"
model = "gpt-4o"
timeout_secs = 15
retry_max = 2

[defaults]
policy_id = "p1"
"#,
        )
        .unwrap();

        let settings = config.proxy_settings();
        assert_eq!(settings.base_url, "https://proxy.example/v1");
        assert_eq!(settings.model, "gpt-4o");
        assert_eq!(settings.timeout, Duration::from_secs(15));
        assert_eq!(settings.retry_max, 2);
        assert_eq!(
            settings.retry_backoff,
            Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS)
        );

        let defaults = config.defaults.unwrap();
        assert_eq!(defaults.get(FieldName::PolicyId), Some("p1"));
        assert_eq!(defaults.get(FieldName::KentronApiKey), None);
        assert!(!defaults.has_plaintext_secret());
    }

    #[test]
    fn test_empty_config_uses_builtin_proxy_settings() {
        let settings = GuardchatConfig::from_toml("").unwrap().proxy_settings();
        assert_eq!(settings.base_url, DEFAULT_PROXY_BASE_URL);
        assert_eq!(settings.model, DEFAULT_MODEL);
        assert_eq!(settings.retry_max, 0);
        assert!(settings.system_prompt.is_none());
    }

    #[test]
    fn test_unusable_proxy_values_are_rejected() {
        let err = GuardchatConfig::from_toml("[proxy]\ntimeout_secs = 0\n").unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "proxy.timeout_secs")
        );

        let err = GuardchatConfig::from_toml("[proxy]\nbase_url = \"  \"\n").unwrap_err();
        assert!(err.to_string().contains("proxy.base_url"));

        assert!(GuardchatConfig::from_toml("[proxy]\ntimeout_secs = 5\n").is_ok());
    }

    #[test]
    fn test_merge_overrides_field_by_field() {
        let mut base = GuardchatConfig::from_toml(
            r#"
[proxy]
model = "gpt-4o-mini"
timeout_secs = 30

[defaults]
policy_id = "base-policy"
kentron_api_key = "kt-base"
"#,
        )
        .unwrap();
        let layer = GuardchatConfig::from_toml(
            r#"
[proxy]
timeout_secs = 5

[defaults]
policy_id = "project-policy"
"#,
        )
        .unwrap();

        base.merge(layer);

        let settings = base.proxy_settings();
        assert_eq!(settings.model, "gpt-4o-mini");
        assert_eq!(settings.timeout, Duration::from_secs(5));
        let defaults = base.defaults.unwrap();
        assert_eq!(defaults.get(FieldName::PolicyId), Some("project-policy"));
        assert_eq!(defaults.get(FieldName::KentronApiKey), Some("kt-base"));
        assert!(defaults.has_plaintext_secret());
    }

    #[test]
    fn test_defaults_debug_masks_secrets() {
        let defaults = DefaultsSection {
            kentron_api_key: Some("kt-0123456789abcdef".to_string()),
            openai_api_key: None,
            policy_id: Some("p1".to_string()),
        };
        let debug = format!("{:?}", defaults);
        assert!(!debug.contains("0123456789abcdef"));
        assert!(debug.contains("p1"));
    }
}
