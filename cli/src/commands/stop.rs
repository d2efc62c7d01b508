//! `cabin stop <name>` — stop a running instance, keeping its state.

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::lifecycle;

#[derive(Args)]
pub struct StopArgs {
    /// Instance name.
    pub name: String,
}

/// Run `cabin stop <name>`.
///
/// # Errors
///
/// Fails when the instance is unknown or the container cannot be stopped.
pub async fn run(ctx: &AppContext, args: &StopArgs) -> Result<()> {
    lifecycle::stop(&ctx.runtime, &ctx.store, &args.name).await?;
    ctx.output
        .success(&format!("Instance '{}' stopped", args.name));
    ctx.output
        .info(&format!("Resume with: cabin start {}", args.name));
    Ok(())
}
