//! Credential and configuration layer for guardchat.
//!
//! Provides:
//! - [`ConfigurationSource`] implementations for operator defaults
//!   (environment, config file, layered stacks)
//! - The credential resolver that merges defaults with per-session user
//!   overrides into an [`EffectiveConfig`] with per-field [`Provenance`]
//! - TOML config file discovery (user config dir + project-local)
//!
//! ```rust,ignore
//! use guardchat_config::{CredentialOverrides, FieldName, LayeredSource, resolve};
//!
//! let source = LayeredSource::deployment(None);
//! let overrides = CredentialOverrides::new().with(FieldName::PolicyId, "p1");
//! let config = resolve(&source, &overrides);
//! if !config.is_complete() {
//!     println!("missing: {:?}", config.missing_fields());
//! }
//! ```

pub mod discovery;
pub mod error;
pub mod resolver;
pub mod secrets;
pub mod source;
pub mod types;

pub use discovery::{
    ConfigFile, LoadedConfig, config_dir, load_config, load_config_file,
    load_config_with_options, user_config_path,
};
pub use error::{ConfigError, Result};
pub use resolver::{
    CredentialOverrides, EffectiveConfig, Provenance, ResolvedField, is_complete, resolve,
};
pub use source::{ConfigurationSource, EnvSource, LayeredSource, SharedSource, StaticSource};
pub use types::*;
