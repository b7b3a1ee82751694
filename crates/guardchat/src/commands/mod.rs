//! CLI command handlers.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use guardchat_config::{FieldName, LayeredSource, LoadedConfig, ProxySettings};
use guardchat_llm::{KentronConfig, KentronProxy, RetryPolicy, RetryingProxy, SharedProxy};
use guardchat_session::ChatSessionManager;

pub mod ask;
pub mod chat;
pub mod config;
pub mod repl;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Config files as discovered at startup (or the last reload).
    pub loaded: LoadedConfig,
    /// Proxy settings after CLI flags are applied.
    pub settings: ProxySettings,
    /// User config directory, if one could be determined.
    pub config_dir: Option<PathBuf>,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// Deployment defaults: environment first, then `[defaults]` from config files.
    pub fn defaults(&self) -> LayeredSource {
        LayeredSource::deployment(self.loaded.config.defaults.as_ref())
    }

    /// The Kentron proxy, wrapped with the configured retry policy.
    pub fn proxy(&self) -> Result<SharedProxy> {
        let kentron = KentronProxy::new(KentronConfig::from_settings(&self.settings))?;
        let policy = RetryPolicy::from_settings(&self.settings);
        Ok(Arc::new(RetryingProxy::new(kentron, policy)))
    }

    /// Re-read config files. Proxy settings are left as they are.
    pub fn reload(&mut self) -> Result<()> {
        self.loaded = guardchat_config::load_config_with_options(None, self.config_dir.as_deref())?;
        Ok(())
    }
}

/// Credential overrides accepted on the command line.
#[derive(Args, Debug, Default, Clone)]
pub struct CredentialArgs {
    /// Kentron API key for this session
    #[arg(long)]
    pub kentron_api_key: Option<String>,

    /// OpenAI API key for this session
    #[arg(long)]
    pub openai_api_key: Option<String>,

    /// Guardrail policy identifier for this session
    #[arg(long)]
    pub policy_id: Option<String>,
}

impl CredentialArgs {
    /// Apply every given flag as a user override.
    pub fn apply(&self, manager: &ChatSessionManager) {
        let flags = [
            (FieldName::KentronApiKey, &self.kentron_api_key),
            (FieldName::OpenaiApiKey, &self.openai_api_key),
            (FieldName::PolicyId, &self.policy_id),
        ];
        for (field, value) in flags {
            if let Some(value) = value {
                manager.set_override(field, value.clone());
            }
        }
    }
}
