//! Infrastructure implementation of the container-runtime port traits.
//!
//! `DockerRuntime<R>` routes every docker CLI call through a
//! [`CommandRunner`], so tests can inject a runner that returns canned
//! outputs without spawning processes.

use std::process::Output;

use anyhow::{Context, Result};

use crate::application::ports::{
    GuestExecutor, ImageBuilder, InstanceLifecycle, NetworkManager, ProxyRuntime, ProxySpec,
    RunSpec, RuntimeInspector,
};
use crate::command_runner::{
    BUILD_TIMEOUT, CommandRunner, DEFAULT_CMD_TIMEOUT, DEFAULT_EXEC_TIMEOUT, TokioCommandRunner,
};

/// Label carrying the owning instance name on proxy containers.
pub const PROXY_OWNER_LABEL: &str = "cabin.proxy.owner";

/// Label marking managed instance containers.
pub const INSTANCE_LABEL: &str = "cabin.instance";

/// Adapter that shells out to the `docker` binary.
pub struct DockerRuntime<R: CommandRunner> {
    cmd_runner: R,
    exec_runner: R,
}

impl<R: CommandRunner> DockerRuntime<R> {
    /// Create a runtime with explicit runner instances.
    pub fn new(cmd_runner: R, exec_runner: R) -> Self {
        Self {
            cmd_runner,
            exec_runner,
        }
    }
}

impl DockerRuntime<TokioCommandRunner> {
    /// Convenience constructor for production use.
    #[must_use]
    pub fn default_runner() -> Self {
        Self {
            cmd_runner: TokioCommandRunner::new(DEFAULT_CMD_TIMEOUT),
            exec_runner: TokioCommandRunner::new(DEFAULT_EXEC_TIMEOUT),
        }
    }
}

impl<R: CommandRunner> InstanceLifecycle for DockerRuntime<R> {
    async fn run(&self, spec: &RunSpec<'_>) -> Result<Output> {
        let ssh_publish = format!("{}:22", spec.ssh_port);
        let cpu_shares = spec.limits.cpu_shares.to_string();
        let pids_limit = spec.limits.pids_limit.to_string();
        let label = format!("{INSTANCE_LABEL}={}", spec.hostname);
        let args = [
            "run",
            "--detach",
            "--name",
            spec.container,
            "--hostname",
            spec.hostname,
            "--label",
            &label,
            "--network",
            spec.network,
            "--restart",
            "unless-stopped",
            "--memory",
            &spec.limits.memory,
            "--cpu-shares",
            &cpu_shares,
            "--pids-limit",
            &pids_limit,
            "--publish",
            &ssh_publish,
            spec.image,
        ];
        self.cmd_runner
            .run("docker", &args)
            .await
            .context("docker run")
    }

    async fn start(&self, container: &str) -> Result<Output> {
        self.cmd_runner
            .run("docker", &["start", container])
            .await
            .context("docker start")
    }

    async fn stop(&self, container: &str) -> Result<Output> {
        self.cmd_runner
            .run("docker", &["stop", container])
            .await
            .context("docker stop")
    }

    async fn remove(&self, container: &str) -> Result<Output> {
        self.cmd_runner
            .run("docker", &["rm", "--force", container])
            .await
            .context("docker rm")
    }
}

impl<R: CommandRunner> RuntimeInspector for DockerRuntime<R> {
    async fn ping(&self) -> Result<Output> {
        self.cmd_runner
            .run("docker", &["info", "--format", "{{.ServerVersion}}"])
            .await
            .context("docker info")
    }

    async fn inspect(&self, container: &str) -> Result<Output> {
        self.cmd_runner
            .run("docker", &["inspect", container])
            .await
            .context("docker inspect")
    }

    async fn published_ports(&self) -> Result<Output> {
        self.cmd_runner
            .run("docker", &["ps", "--all", "--format", "{{.Ports}}"])
            .await
            .context("docker ps")
    }
}

impl<R: CommandRunner> ImageBuilder for DockerRuntime<R> {
    async fn image_inspect(&self, image: &str) -> Result<Output> {
        self.cmd_runner
            .run("docker", &["image", "inspect", image, "--format", "{{.Id}}"])
            .await
            .context("docker image inspect")
    }

    async fn build(&self, image: &str, context_dir: &str) -> Result<Output> {
        self.cmd_runner
            .run_with_timeout(
                "docker",
                &["build", "--tag", image, context_dir],
                BUILD_TIMEOUT,
            )
            .await
            .context("docker build")
    }
}

impl<R: CommandRunner> GuestExecutor for DockerRuntime<R> {
    async fn exec(&self, container: &str, args: &[&str]) -> Result<Output> {
        let mut full = vec!["exec", "--user", "root", container];
        full.extend_from_slice(args);
        self.exec_runner
            .run("docker", &full)
            .await
            .context("docker exec")
    }

    async fn exec_with_stdin(
        &self,
        container: &str,
        args: &[&str],
        input: &[u8],
    ) -> Result<Output> {
        let mut full = vec!["exec", "--interactive", "--user", "root", container];
        full.extend_from_slice(args);
        self.exec_runner
            .run_with_stdin("docker", &full, input)
            .await
            .context("docker exec (stdin)")
    }

    async fn copy_in(&self, container: &str, local: &str, remote: &str) -> Result<Output> {
        let dest = format!("{container}:{remote}");
        self.cmd_runner
            .run("docker", &["cp", local, &dest])
            .await
            .context("docker cp")
    }
}

impl<R: CommandRunner> NetworkManager for DockerRuntime<R> {
    async fn network_inspect(&self, network: &str) -> Result<Output> {
        self.cmd_runner
            .run(
                "docker",
                &["network", "inspect", network, "--format", "{{.Id}}"],
            )
            .await
            .context("docker network inspect")
    }

    async fn network_create(&self, network: &str) -> Result<Output> {
        self.cmd_runner
            .run("docker", &["network", "create", network])
            .await
            .context("docker network create")
    }
}

impl<R: CommandRunner> ProxyRuntime for DockerRuntime<R> {
    async fn remove_proxy(&self, container: &str) -> Result<Output> {
        self.cmd_runner
            .run("docker", &["rm", "--force", container])
            .await
            .context("docker rm (proxy)")
    }

    async fn run_proxy(&self, spec: &ProxySpec<'_>) -> Result<Output> {
        let label = format!("{PROXY_OWNER_LABEL}={}", spec.instance);
        let mut args: Vec<&str> = vec![
            "run",
            "--detach",
            "--name",
            spec.container,
            "--label",
            &label,
            "--network",
            spec.network,
            "--restart",
            "unless-stopped",
        ];
        for publish in spec.publishes {
            args.push("--publish");
            args.push(publish);
        }
        args.extend_from_slice(&["--entrypoint", "/bin/sh", spec.image, "-c", spec.script]);
        self.cmd_runner
            .run("docker", &args)
            .await
            .context("docker run (proxy)")
    }
}
