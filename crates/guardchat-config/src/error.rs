//! Configuration error types.

/// Result type alias for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur while loading config files or parsing field names.
///
/// Credential resolution itself never fails; an incomplete configuration is
/// a state reported by [`EffectiveConfig::is_complete`](crate::EffectiveConfig::is_complete).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a config file.
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field name typed by the user did not match any credential field.
    #[error("unknown field '{0}' (expected one of: kentron-api-key, openai-api-key, policy-id)")]
    UnknownField(String),

    /// A proxy setting has an unusable value.
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}
