//! Application context — unified state passed to every command handler.
//!
//! Built once in `Cli::run()`; adding a cross-cutting concern means one
//! field change here, no command signature changes.

use anyhow::Result;

use crate::command_runner::TokioCommandRunner;
use crate::infra::config::Config;
use crate::infra::docker::DockerRuntime;
use crate::infra::network::TcpPortProbe;
use crate::infra::store::MetaStore;
use crate::output::OutputContext;
use crate::output::reporter::TerminalReporter;

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Skip interactive prompts (also set by `CI` / `CABIN_YES` env vars).
    pub yes: bool,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output (colors, quiet mode).
    pub output: OutputContext,
    /// Docker adapter over the tokio command runner.
    pub runtime: DockerRuntime<TokioCommandRunner>,
    /// Local TCP probe for allocation and readiness checks.
    pub probe: TcpPortProbe,
    /// Flat-file metadata store under the state directory.
    pub store: MetaStore,
    /// Resolved operator configuration.
    pub config: Config,
    /// When `true`, confirmations resolve to their default without a prompt.
    pub non_interactive: bool,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration cannot be loaded.
    pub fn new(flags: &AppFlags) -> Result<Self> {
        let ci_env = std::env::var("CI").is_ok() || std::env::var("CABIN_YES").is_ok();
        let config = Config::load()?;
        Ok(Self {
            output: OutputContext::new(flags.no_color, flags.quiet),
            runtime: DockerRuntime::default_runner(),
            probe: TcpPortProbe,
            store: MetaStore::new(config.state_dir.clone()),
            config,
            non_interactive: flags.yes || ci_env,
        })
    }

    /// Progress reporter bound to this context's output.
    #[must_use]
    pub fn reporter(&self) -> TerminalReporter<'_> {
        TerminalReporter::new(&self.output)
    }

    /// Ask the operator for confirmation. Non-interactive runs return
    /// `default` without prompting.
    ///
    /// # Errors
    ///
    /// Returns an error when the terminal prompt fails (no TTY).
    pub fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        if self.non_interactive {
            return Ok(default);
        }
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()?;
        Ok(confirmed)
    }
}
