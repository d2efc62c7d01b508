//! `cabin forward` — declare, withdraw, and list port forwards.

use anyhow::{Context, Result};
use cabin_common::PortForward;
use clap::Subcommand;

use crate::app::AppContext;
use crate::application::services::forwards;
use crate::application::services::lifecycle::ensure_runtime;

#[derive(Subcommand)]
pub enum ForwardCommand {
    /// Declare a forward and rebuild the proxy.
    Add {
        /// Instance name.
        name: String,
        /// Mapping as `[bind:]hostPort:containerPort`, e.g. `127.0.0.1:8080:80`.
        mapping: String,
    },

    /// Withdraw a forward and rebuild the proxy.
    Remove {
        /// Instance name.
        name: String,
        /// Mapping as `[bind:]hostPort:containerPort`.
        mapping: String,
    },

    /// List declared forwards.
    List {
        /// Instance name.
        name: String,
    },
}

/// Run a `cabin forward` subcommand.
///
/// # Errors
///
/// Fails on malformed mappings, unknown instances, port conflicts, or proxy
/// rebuild failures.
pub async fn run(ctx: &AppContext, cmd: &ForwardCommand) -> Result<()> {
    match cmd {
        ForwardCommand::Add { name, mapping } => {
            let forward = parse_mapping(mapping)?;
            ensure_runtime(&ctx.runtime).await?;
            forwards::add(
                &ctx.runtime,
                &ctx.probe,
                &ctx.store,
                &ctx.config,
                name,
                &forward,
            )
            .await?;
            ctx.output
                .success(&format!("Forward {forward} active for '{name}'"));
        }
        ForwardCommand::Remove { name, mapping } => {
            let forward = parse_mapping(mapping)?;
            ensure_runtime(&ctx.runtime).await?;
            forwards::remove(&ctx.runtime, &ctx.store, &ctx.config, name, &forward).await?;
            ctx.output
                .success(&format!("Forward {forward} removed from '{name}'"));
        }
        ForwardCommand::List { name } => {
            let set = forwards::list(&ctx.store, name)?;
            if set.is_empty() {
                ctx.output.info(&format!("No forwards declared for '{name}'"));
            } else {
                ctx.output.header(&format!("Forwards for '{name}'"));
                for f in &set {
                    ctx.output.kv("forward", &f.to_string());
                }
            }
        }
    }
    Ok(())
}

fn parse_mapping(text: &str) -> Result<PortForward> {
    text.parse()
        .with_context(|| format!("invalid forward mapping '{text}'"))
}
