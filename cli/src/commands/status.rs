//! `cabin status [name]` — records joined with observed runtime state.

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::lifecycle::ensure_runtime;
use crate::application::services::status::{self, InstanceStatus};

#[derive(Args)]
pub struct StatusArgs {
    /// Instance to show; omit for all instances.
    pub name: Option<String>,
}

/// Run `cabin status [name]`.
///
/// # Errors
///
/// Fails when the runtime is unreachable or a record is malformed.
pub async fn run(ctx: &AppContext, args: &StatusArgs) -> Result<()> {
    ensure_runtime(&ctx.runtime).await?;

    let statuses = match &args.name {
        Some(name) => vec![status::instance_status(&ctx.runtime, &ctx.store, name).await?],
        None => status::all_statuses(&ctx.runtime, &ctx.store).await?,
    };

    if statuses.is_empty() {
        ctx.output.info("No instances. Create one with: cabin start <name>");
        return Ok(());
    }

    for status in &statuses {
        print_status(ctx, status);
    }
    Ok(())
}

fn print_status(ctx: &AppContext, status: &InstanceStatus) {
    let out = &ctx.output;
    out.header(&status.record.name);
    out.kv("state   ", if status.running { "running" } else { "stopped" });
    out.kv("template", &status.record.template);
    out.kv("image   ", &status.record.image);
    out.kv("ssh port", &status.record.host_port.to_string());
    if let Some(ip) = &status.ip {
        out.kv("address ", ip);
    }
    out.kv("hardened", if status.hardened { "yes" } else { "no" });
    if status.forwards.is_empty() {
        out.kv("forwards", "none");
    } else {
        for f in &status.forwards {
            out.kv("forward ", &f.to_string());
        }
    }
}
