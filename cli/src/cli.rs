//! CLI argument parsing with clap derive.

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, AppFlags};
use crate::commands;

/// Containerized, SSH-accessible dev instances on a single host
#[derive(Parser)]
#[command(
    name = "cabin",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR", value_parser = clap::builder::FalseyValueParser::new())]
    pub no_color: bool,

    /// Assume yes on confirmations
    #[arg(short, long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Build a template image
    Build(commands::build::BuildArgs),

    /// Create or resume an instance
    Start(commands::start::StartArgs),

    /// Stop an instance, keeping its state
    Stop(commands::stop::StopArgs),

    /// Remove an instance and all its records
    Remove(commands::remove::RemoveArgs),

    /// Show instance status
    Status(commands::status::StatusArgs),

    /// Rotate an instance's login credential
    Passwd(commands::passwd::PasswdArgs),

    /// Manage port forwards
    #[command(subcommand)]
    Forward(commands::forward::ForwardCommand),

    /// Manage in-guest hardening
    #[command(subcommand)]
    Harden(commands::harden::HardenCommand),
}

impl Cli {
    /// Execute the parsed command.
    ///
    /// # Errors
    ///
    /// Propagates command failures to `main` for reporting.
    pub async fn run(self) -> Result<()> {
        let ctx = AppContext::new(&AppFlags {
            no_color: self.no_color,
            quiet: self.quiet,
            yes: self.yes,
        })?;
        match self.command {
            Command::Build(args) => commands::build::run(&ctx, &args).await,
            Command::Start(args) => commands::start::run(&ctx, &args).await,
            Command::Stop(args) => commands::stop::run(&ctx, &args).await,
            Command::Remove(args) => commands::remove::run(&ctx, &args).await,
            Command::Status(args) => commands::status::run(&ctx, &args).await,
            Command::Passwd(args) => commands::passwd::run(&ctx, &args).await,
            Command::Forward(cmd) => commands::forward::run(&ctx, &cmd).await,
            Command::Harden(cmd) => commands::harden::run(&ctx, &cmd).await,
        }
    }
}
