//! `cabin build <template>` — build (or rebuild) a template image.

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::ImageBuilder;
use crate::application::services::lifecycle;
use crate::domain::error::InstanceError;
use crate::output::progress;

#[derive(Args)]
pub struct BuildArgs {
    /// Template to build.
    pub template: String,
}

/// Run `cabin build <template>`.
///
/// Always rebuilds, even when the image already exists; `cabin start` builds
/// lazily, this command is the explicit refresh.
///
/// # Errors
///
/// Fails when the runtime is unreachable, the template has no build context,
/// or the build itself fails.
pub async fn run(ctx: &AppContext, args: &BuildArgs) -> Result<()> {
    lifecycle::ensure_runtime(&ctx.runtime).await?;

    let dockerfile = ctx.config.dockerfile(&args.template);
    if !dockerfile.exists() {
        return Err(InstanceError::TemplateMissing(
            args.template.clone(),
            dockerfile.display().to_string(),
        )
        .into());
    }

    let image = ctx.config.image_for(&args.template);
    let context_dir = ctx.config.template_dir(&args.template).display().to_string();

    let spinner = ctx
        .output
        .show_progress()
        .then(|| progress::spinner(&format!("Building {image}")));

    let out = ctx.runtime.build(&image, &context_dir).await?;
    if !out.status.success() {
        if let Some(pb) = &spinner {
            progress::finish_error(pb, &format!("Build of {image} failed"));
        }
        anyhow::bail!(
            "building image {image}: {}",
            String::from_utf8_lossy(&out.stderr).trim()
        );
    }

    if let Some(pb) = &spinner {
        progress::finish_ok(pb, &format!("Built {image}"));
    } else {
        ctx.output.success(&format!("Built {image}"));
    }
    Ok(())
}
