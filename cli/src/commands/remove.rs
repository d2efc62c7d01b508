//! `cabin remove <name>` — full teardown of an instance and its records.

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::lifecycle;

#[derive(Args)]
pub struct RemoveArgs {
    /// Instance name.
    pub name: String,
}

/// Run `cabin remove <name>`. Asks for confirmation unless running
/// non-interactively.
///
/// # Errors
///
/// Fails when the instance is unknown or teardown cannot complete.
pub async fn run(ctx: &AppContext, args: &RemoveArgs) -> Result<()> {
    let prompt = format!(
        "Remove instance '{}' with its credential, forwards, and hardening state?",
        args.name
    );
    if !ctx.confirm(&prompt, ctx.non_interactive)? {
        ctx.output.info("Cancelled");
        return Ok(());
    }

    lifecycle::remove(&ctx.runtime, &ctx.store, &args.name).await?;
    ctx.output
        .success(&format!("Instance '{}' removed", args.name));
    Ok(())
}
