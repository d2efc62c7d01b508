//! Port trait definitions for the Application layer.
//!
//! Ports are the contracts infrastructure must fulfill. This file imports
//! only from `crate::domain` and `cabin-common` — never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::net::IpAddr;
use std::process::Output;

use anyhow::Result;
use cabin_common::ResourceLimits;

// ── Value types ───────────────────────────────────────────────────────────────

/// Parameters for launching a new instance container.
/// Struct-based to avoid breaking test doubles on future additions.
pub struct RunSpec<'a> {
    /// Managed container name, e.g. `cabin-demo`.
    pub container: &'a str,
    /// Hostname inside the instance (the bare instance name).
    pub hostname: &'a str,
    /// Resolved image reference.
    pub image: &'a str,
    /// Host port published onto the guest SSH port (22).
    pub ssh_port: u16,
    /// Resource ceilings applied at creation.
    pub limits: &'a ResourceLimits,
    /// Shared network all instances attach to.
    pub network: &'a str,
}

/// Parameters for launching a forwarding proxy container.
pub struct ProxySpec<'a> {
    /// Owning instance name (applied as a label for operator inspection).
    pub instance: &'a str,
    /// Deterministic proxy container name, e.g. `cabin-proxy-demo`.
    pub container: &'a str,
    /// Pinned relay image.
    pub image: &'a str,
    /// Shared network carrying traffic to the instance.
    pub network: &'a str,
    /// Host publications, one `bind:hostPort:hostPort` per declared forward.
    pub publishes: &'a [String],
    /// Generated relay script executed as the container entrypoint.
    pub script: &'a str,
}

// ── Container runtime ports ───────────────────────────────────────────────────

/// Instance container lifecycle: run, start, stop, remove.
#[allow(async_fn_in_trait)]
pub trait InstanceLifecycle {
    /// Create and start a new instance container from `spec`.
    async fn run(&self, spec: &RunSpec<'_>) -> Result<Output>;
    /// Start a stopped instance container.
    async fn start(&self, container: &str) -> Result<Output>;
    /// Stop a running instance container.
    async fn stop(&self, container: &str) -> Result<Output>;
    /// Force-remove a container, running or not.
    async fn remove(&self, container: &str) -> Result<Output>;
}

/// Runtime state inspection.
#[allow(async_fn_in_trait)]
pub trait RuntimeInspector {
    /// Cheap reachability probe of the container runtime daemon.
    async fn ping(&self) -> Result<Output>;
    /// Full JSON inspect of one container.
    async fn inspect(&self, container: &str) -> Result<Output>;
    /// Published-port column for all containers on the host.
    async fn published_ports(&self) -> Result<Output>;
}

/// Image presence and building.
#[allow(async_fn_in_trait)]
pub trait ImageBuilder {
    /// Inspect an image reference; non-success means the image is absent.
    async fn image_inspect(&self, image: &str) -> Result<Output>;
    /// Build `image` from the template build context at `context_dir`.
    async fn build(&self, image: &str, context_dir: &str) -> Result<Output>;
}

/// Command execution and file placement inside a running instance.
#[allow(async_fn_in_trait)]
pub trait GuestExecutor {
    /// Execute a command as the administrative account and capture output.
    async fn exec(&self, container: &str, args: &[&str]) -> Result<Output>;
    /// Execute a command with stdin piped from `input`.
    async fn exec_with_stdin(&self, container: &str, args: &[&str], input: &[u8])
    -> Result<Output>;
    /// Copy a host file into the container filesystem.
    async fn copy_in(&self, container: &str, local: &str, remote: &str) -> Result<Output>;
}

/// Shared-network management.
#[allow(async_fn_in_trait)]
pub trait NetworkManager {
    /// Inspect a network; non-success means it does not exist.
    async fn network_inspect(&self, network: &str) -> Result<Output>;
    /// Create a network.
    async fn network_create(&self, network: &str) -> Result<Output>;
}

/// Forwarding-proxy container management.
#[allow(async_fn_in_trait)]
pub trait ProxyRuntime {
    /// Force-remove a proxy container. Missing container is not an error at
    /// this level; callers treat removal as unconditional teardown.
    async fn remove_proxy(&self, container: &str) -> Result<Output>;
    /// Run one proxy container serving every listener in `spec`.
    async fn run_proxy(&self, spec: &ProxySpec<'_>) -> Result<Output>;
}

/// Composite trait — any type implementing all six sub-traits is a full
/// `ContainerRuntime`.
pub trait ContainerRuntime:
    InstanceLifecycle + RuntimeInspector + ImageBuilder + GuestExecutor + NetworkManager + ProxyRuntime
{
}

impl<T> ContainerRuntime for T where
    T: InstanceLifecycle
        + RuntimeInspector
        + ImageBuilder
        + GuestExecutor
        + NetworkManager
        + ProxyRuntime
{
}

// ── Network probe port ────────────────────────────────────────────────────────

/// Abstracts local TCP probing so allocation and readiness checks can be
/// tested without opening sockets.
#[allow(async_fn_in_trait)]
pub trait PortProbe {
    /// `true` when something accepts a TCP connection on `bind:port`.
    async fn is_listening(&self, bind: IpAddr, port: u16) -> bool;
}

// ── Progress reporting port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the presentation layer. Sync trait — no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}
