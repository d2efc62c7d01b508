//! `cabin passwd <name>` — rotate the instance login credential.

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::lifecycle::{ensure_runtime, set_credential};
use crate::domain::error::InstanceError;
use crate::domain::validate::validate_instance_name;

#[derive(Args)]
pub struct PasswdArgs {
    /// Instance name.
    pub name: String,
}

/// Run `cabin passwd <name>`.
///
/// # Errors
///
/// Fails when the instance is unknown or the in-guest password change fails.
pub async fn run(ctx: &AppContext, args: &PasswdArgs) -> Result<()> {
    validate_instance_name(&args.name)?;
    ensure_runtime(&ctx.runtime).await?;
    if ctx.store.load_instance(&args.name)?.is_none() {
        return Err(InstanceError::NotFound(args.name.clone()).into());
    }

    let credential = set_credential(&ctx.runtime, &ctx.store, &ctx.config, &args.name).await?;
    ctx.output
        .success(&format!("New credential set for '{}'", args.name));
    ctx.output.value(&credential.password);
    Ok(())
}
