//! Guardchat - BYOK chat client behind a content-safety proxy
//!
//! Main entry point for the guardchat CLI.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{ask, chat, config};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Guardchat - chat through a guardrail proxy with your own API keys
#[derive(Parser)]
#[command(name = "guardchat")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory holding config.toml and logs
    #[arg(long, global = true, env = "GUARDCHAT_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    /// Guardrail proxy base URL (default: http://demo.kentron.ai/v1)
    #[arg(long, global = true, env = "GUARDCHAT_BASE_URL")]
    pub base_url: Option<String>,

    /// Model requested through the proxy
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Enter interactive chat mode (default)
    Chat(chat::ChatArgs),

    /// Send a single message and print the reply
    Ask(ask::AskArgs),

    /// Show loaded config files and the resolved credentials
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Console (human-readable) + rotating JSON file
    let filter = if cli.verbose {
        "guardchat=debug,guardchat_config=debug,guardchat_llm=debug,guardchat_session=debug,info"
    } else {
        "guardchat=info,guardchat_config=warn,guardchat_llm=warn,guardchat_session=warn,warn"
    };

    let config_dir = cli.config_dir.clone().or_else(guardchat_config::config_dir);
    let log_dir = config_dir
        .as_ref()
        .map(|d| d.join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "guardchat.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "guardchat=trace,guardchat_config=trace,guardchat_llm=trace,guardchat_session=trace,info",
                )),
        )
        .init();

    let loaded = guardchat_config::load_config_with_options(None, config_dir.as_deref())?;

    let mut settings = loaded.config.proxy_settings();
    if let Some(base_url) = cli.base_url {
        settings.base_url = base_url;
    }
    if let Some(model) = cli.model {
        settings.model = model;
    }
    if let Some(secs) = cli.timeout {
        settings.timeout = Duration::from_secs(secs);
    }

    tracing::debug!(
        base_url = %settings.base_url,
        model = %settings.model,
        files = loaded.loaded_from().len(),
        "Configuration loaded"
    );

    let ctx = commands::Context {
        loaded,
        settings,
        config_dir,
        verbose: cli.verbose,
    };

    match cli.command {
        Some(Commands::Chat(args)) => chat::run(args, &ctx).await,
        Some(Commands::Ask(args)) => ask::run(args, &ctx).await,
        Some(Commands::Config(args)) => config::run(args, &ctx).await,
        None => chat::run(chat::ChatArgs::default(), &ctx).await,
    }
}
