//! Operator configuration — `~/.cabin/config` in strict `key=value` form.
//!
//! A missing file means defaults; a malformed or unknown key is an error.
//! `CABIN_HOME` overrides the root directory (used heavily in tests).

use std::path::PathBuf;

use anyhow::{Context, Result};
use cabin_common::{ResourceLimits, kv};

/// Pinned relay image for forwarding proxies. A floating tag would let the
/// relay behavior drift under the operator silently.
pub const DEFAULT_PROXY_IMAGE: &str = "alpine/socat:1.8.0.3";

/// Resolved operator configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of all cabin state, default `~/.cabin`.
    pub root: PathBuf,
    /// Directory holding per-instance record files.
    pub state_dir: PathBuf,
    /// Directory holding template build contexts and hook scripts.
    pub templates_dir: PathBuf,
    /// Shared network all instances and proxies attach to.
    pub network: String,
    /// First candidate for SSH port allocation.
    pub base_ssh_port: u16,
    /// Number of `base + i*100` candidates to try.
    pub max_port_tries: u16,
    /// Ports the operator has declared off-limits.
    pub reserved_ports: Vec<u16>,
    /// Relay image for forwarding proxies.
    pub proxy_image: String,
    /// Login account inside every instance.
    pub ssh_user: String,
    /// Default resource ceilings for new instances.
    pub limits: ResourceLimits,
    /// SSH readiness poll: attempts and per-attempt sleep.
    pub ready_attempts: u32,
    pub ready_interval_ms: u64,
}

impl Config {
    /// Defaults rooted at `root`, before any config file is applied.
    #[must_use]
    pub fn for_root(root: PathBuf) -> Self {
        Self {
            state_dir: root.join("state"),
            templates_dir: root.join("templates"),
            network: "cabin-net".to_string(),
            base_ssh_port: 42000,
            max_port_tries: 20,
            reserved_ports: Vec::new(),
            proxy_image: DEFAULT_PROXY_IMAGE.to_string(),
            ssh_user: "dev".to_string(),
            limits: ResourceLimits::default(),
            ready_attempts: 30,
            ready_interval_ms: 1000,
            root,
        }
    }

    /// Load configuration from `$CABIN_HOME` or `~/.cabin`.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined or the
    /// config file exists but fails strict parsing.
    pub fn load() -> Result<Self> {
        let root = match std::env::var_os("CABIN_HOME") {
            Some(dir) => PathBuf::from(dir),
            None => dirs::home_dir()
                .context("cannot determine home directory")?
                .join(".cabin"),
        };
        let mut cfg = Self::for_root(root);
        let file = cfg.root.join("config");
        if file.exists() {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("reading config {}", file.display()))?;
            cfg.apply(&text)
                .with_context(|| format!("parsing config {}", file.display()))?;
        }
        Ok(cfg)
    }

    /// Apply `key=value` overrides from a config file body.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed lines, unknown keys, or bad values.
    pub fn apply(&mut self, text: &str) -> Result<()> {
        for (key, value) in kv::parse(text)? {
            match key.as_str() {
                "state_dir" => self.state_dir = PathBuf::from(&value),
                "templates_dir" => self.templates_dir = PathBuf::from(&value),
                "network" => self.network = value,
                "base_ssh_port" => {
                    self.base_ssh_port = value
                        .parse()
                        .with_context(|| format!("invalid base_ssh_port '{value}'"))?;
                }
                "max_port_tries" => {
                    self.max_port_tries = value
                        .parse()
                        .with_context(|| format!("invalid max_port_tries '{value}'"))?;
                }
                "reserved_ports" => {
                    self.reserved_ports = value
                        .split(',')
                        .filter(|s| !s.trim().is_empty())
                        .map(|s| {
                            s.trim()
                                .parse()
                                .with_context(|| format!("invalid reserved port '{s}'"))
                        })
                        .collect::<Result<_>>()?;
                }
                "proxy_image" => self.proxy_image = value,
                "ssh_user" => self.ssh_user = value,
                "memory" => self.limits.memory = value,
                "cpu_shares" => {
                    self.limits.cpu_shares = value
                        .parse()
                        .with_context(|| format!("invalid cpu_shares '{value}'"))?;
                }
                "pids_limit" => {
                    self.limits.pids_limit = value
                        .parse()
                        .with_context(|| format!("invalid pids_limit '{value}'"))?;
                }
                "ready_attempts" => {
                    self.ready_attempts = value
                        .parse()
                        .with_context(|| format!("invalid ready_attempts '{value}'"))?;
                }
                "ready_interval_ms" => {
                    self.ready_interval_ms = value
                        .parse()
                        .with_context(|| format!("invalid ready_interval_ms '{value}'"))?;
                }
                other => anyhow::bail!("unknown config key '{other}'"),
            }
        }
        Ok(())
    }

    /// Template build context directory.
    #[must_use]
    pub fn template_dir(&self, template: &str) -> PathBuf {
        self.templates_dir.join(template)
    }

    /// Image reference an instance of `template` resolves to.
    #[must_use]
    pub fn image_for(&self, template: &str) -> String {
        format!("cabin/{template}:latest")
    }

    /// Hardening hook script of a template.
    #[must_use]
    pub fn harden_script(&self, template: &str) -> PathBuf {
        self.template_dir(template).join("harden.sh")
    }

    /// First-boot hook script of a template.
    #[must_use]
    pub fn firstboot_script(&self, template: &str) -> PathBuf {
        self.template_dir(template).join("firstboot.sh")
    }

    /// The Dockerfile a template builds from.
    #[must_use]
    pub fn dockerfile(&self, template: &str) -> PathBuf {
        self.template_dir(template).join("Dockerfile")
    }
}

/// Test-friendly constructor: defaults under `root` with a fast readiness
/// poll so no test waits on wall-clock sleeps.
#[cfg(test)]
#[must_use]
pub fn test_config(root: &std::path::Path) -> Config {
    let mut cfg = Config::for_root(root.to_path_buf());
    cfg.ready_attempts = 1;
    cfg.ready_interval_ms = 0;
    cfg
}
