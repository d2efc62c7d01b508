//! `cabin start <name>` — create a new instance or resume a stopped one.

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::lifecycle::{self, CreateOpts, StartOutcome};
use crate::domain::validate::validate_instance_name;

#[derive(Args)]
pub struct StartArgs {
    /// Instance name.
    pub name: String,

    /// Template to create from (ignored when the instance already exists).
    #[arg(short, long, default_value = "base")]
    pub template: String,

    /// Apply the hardening hook after creation.
    #[arg(long)]
    pub harden: bool,
}

/// Run `cabin start <name>`.
///
/// # Errors
///
/// Propagates lifecycle errors; see `lifecycle::create` and
/// `lifecycle::resume`.
pub async fn run(ctx: &AppContext, args: &StartArgs) -> Result<()> {
    // Names are path segments in the store; check before the first lookup.
    validate_instance_name(&args.name)?;
    let reporter = ctx.reporter();
    let outcome = if ctx.store.load_instance(&args.name)?.is_some() {
        lifecycle::resume(
            &ctx.runtime,
            &ctx.probe,
            &ctx.store,
            &ctx.config,
            &reporter,
            &args.name,
        )
        .await?
    } else {
        lifecycle::create(
            &ctx.runtime,
            &ctx.probe,
            &ctx.store,
            &ctx.config,
            &reporter,
            &CreateOpts {
                name: &args.name,
                template: &args.template,
                harden: args.harden,
            },
        )
        .await?
    };
    print_outcome(ctx, &outcome);
    Ok(())
}

fn print_outcome(ctx: &AppContext, outcome: &StartOutcome) {
    ctx.output
        .success(&format!("Instance '{}' is running", outcome.record.name));
    ctx.output.kv(
        "ssh     ",
        &format!(
            "ssh {}@localhost -p {}",
            ctx.config.ssh_user, outcome.record.host_port
        ),
    );
    ctx.output.kv("password", "shown once, not stored in your shell history:");
    ctx.output.value(&outcome.password);
    if !outcome.ssh_ready {
        ctx.output
            .warn("SSH was not ready when polling stopped; give the instance a moment");
    }
}
