//! `cabin harden` — apply, roll back, or query in-guest hardening.

use anyhow::Result;
use clap::Subcommand;

use crate::app::AppContext;
use crate::application::services::lifecycle::{
    self, disable_hardening, enable_hardening, hardening_status,
};

#[derive(Subcommand)]
pub enum HardenCommand {
    /// Apply the hardening hook and record the marker.
    Enable {
        /// Instance name.
        name: String,
    },

    /// Roll hardening back and clear the marker.
    Disable {
        /// Instance name.
        name: String,
    },

    /// Report the in-guest posture as seen by the hook.
    Status {
        /// Instance name.
        name: String,
    },
}

/// Run a `cabin harden` subcommand.
///
/// # Errors
///
/// Fails when the instance is unknown or the hook reports failure. A failed
/// enable has already been rolled back when the error surfaces.
pub async fn run(ctx: &AppContext, cmd: &HardenCommand) -> Result<()> {
    lifecycle::ensure_runtime(&ctx.runtime).await?;
    match cmd {
        HardenCommand::Enable { name } => {
            enable_hardening(&ctx.runtime, &ctx.store, &ctx.config, name).await?;
            ctx.output
                .success(&format!("Hardening enabled for '{name}'"));
        }
        HardenCommand::Disable { name } => {
            disable_hardening(&ctx.runtime, &ctx.store, &ctx.config, name).await?;
            ctx.output
                .success(&format!("Hardening disabled for '{name}'"));
        }
        HardenCommand::Status { name } => {
            let report = hardening_status(&ctx.runtime, &ctx.store, &ctx.config, name).await?;
            ctx.output.header(&format!("Hardening status for '{name}'"));
            for line in report.lines() {
                ctx.output.kv("status", line);
            }
        }
    }
    Ok(())
}
