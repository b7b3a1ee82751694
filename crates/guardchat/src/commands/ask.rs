//! Ask command - one-shot message through the guardrail proxy.

use anyhow::Result;
use clap::Args;
use console::Style;
use guardchat_session::{ChatSessionManager, TurnOutcome};

use super::{Context, CredentialArgs};

/// Arguments for the ask command.
#[derive(Args, Debug)]
pub struct AskArgs {
    /// The message to send
    #[arg(required = true)]
    pub message: String,

    #[command(flatten)]
    pub credentials: CredentialArgs,
}

/// Run the ask command. Fails unless the proxy answered.
pub async fn run(args: AskArgs, ctx: &Context) -> Result<()> {
    let manager = ChatSessionManager::start(&ctx.defaults(), ctx.proxy()?);
    args.credentials.apply(&manager);

    if ctx.verbose {
        let dim = Style::new().dim();
        eprintln!(
            "{}",
            dim.apply_to(format!("Sending to: {}", ctx.settings.base_url))
        );
        eprintln!(
            "{}",
            dim.apply_to(format!("Policy: {}", manager.status().policy))
        );
    }

    let response = manager.submit(args.message).await;
    match response.outcome {
        Some(TurnOutcome::Ok) => {
            println!("{}", response.text);
            Ok(())
        }
        _ => Err(anyhow::anyhow!(response.text)),
    }
}
