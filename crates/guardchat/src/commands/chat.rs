//! Chat command - interactive REPL mode.

use anyhow::Result;
use clap::Args;
use guardchat_session::ChatSessionManager;

use super::repl::Repl;
use super::{Context, CredentialArgs};

/// Arguments for the chat command.
#[derive(Args, Debug, Default)]
pub struct ChatArgs {
    #[command(flatten)]
    pub credentials: CredentialArgs,
}

/// Run the chat command (REPL).
pub async fn run(args: ChatArgs, ctx: &Context) -> Result<()> {
    let manager = ChatSessionManager::start(&ctx.defaults(), ctx.proxy()?);
    args.credentials.apply(&manager);

    tracing::debug!(session_id = %manager.session_id(), "Chat session started");

    let mut repl = Repl::new(manager, ctx.clone())?;
    repl.run().await
}
