//! In-memory doubles for the port traits. Compiled only for tests.

use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::process::Output;
use std::sync::Mutex;

use anyhow::Result;

use crate::application::ports::{
    GuestExecutor, ImageBuilder, InstanceLifecycle, NetworkManager, PortProbe, ProgressReporter,
    ProxyRuntime, ProxySpec, RunSpec, RuntimeInspector,
};
use crate::application::services::hooks::HOOK_GUEST_PATH;

/// Build a finished-process `Output` with the given exit code.
#[must_use]
pub fn output(code: i32, stdout: &str, stderr: &str) -> Output {
    #[cfg(unix)]
    let status = {
        use std::os::unix::process::ExitStatusExt;
        std::process::ExitStatus::from_raw(code << 8)
    };
    #[cfg(not(unix))]
    let status = std::process::ExitStatus::default();
    #[cfg(not(unix))]
    let _ = code;
    Output {
        status,
        stdout: stdout.as_bytes().to_vec(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Recording double for the full container-runtime surface.
///
/// Every call appends a descriptive line to `calls`. Operations named in the
/// failure set report exit code 1; canned stdout can be set per operation.
#[derive(Default)]
pub struct StubRuntime {
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashSet<&'static str>>,
    stdout: Mutex<HashMap<&'static str, String>>,
}

impl StubRuntime {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make operation `op` report failure (exit code 1).
    pub fn fail_on(&self, op: &'static str) {
        self.failures
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(op);
    }

    /// Set canned stdout for operation `op`.
    pub fn set_stdout(&self, op: &'static str, text: &str) {
        self.stdout
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(op, text.to_string());
    }

    /// Every call recorded so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// True when some recorded call starts with `prefix`.
    #[must_use]
    pub fn called(&self, prefix: &str) -> bool {
        self.calls().iter().any(|c| c.starts_with(prefix))
    }

    fn respond(&self, op: &'static str, call: String) -> Result<Output> {
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(call);
        let failed = self
            .failures
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .contains(op);
        if failed {
            return Ok(output(1, "", &format!("stub: {op} failed")));
        }
        let stdout = self
            .stdout
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(op)
            .cloned()
            .unwrap_or_default();
        Ok(output(0, &stdout, ""))
    }
}

impl InstanceLifecycle for StubRuntime {
    async fn run(&self, spec: &RunSpec<'_>) -> Result<Output> {
        self.respond(
            "run",
            format!(
                "run {} image={} port={} network={}",
                spec.container, spec.image, spec.ssh_port, spec.network
            ),
        )
    }

    async fn start(&self, container: &str) -> Result<Output> {
        self.respond("start", format!("start {container}"))
    }

    async fn stop(&self, container: &str) -> Result<Output> {
        self.respond("stop", format!("stop {container}"))
    }

    async fn remove(&self, container: &str) -> Result<Output> {
        self.respond("remove", format!("remove {container}"))
    }
}

impl RuntimeInspector for StubRuntime {
    async fn ping(&self) -> Result<Output> {
        self.respond("ping", "ping".to_string())
    }

    async fn inspect(&self, container: &str) -> Result<Output> {
        self.respond("inspect", format!("inspect {container}"))
    }

    async fn published_ports(&self) -> Result<Output> {
        self.respond("published_ports", "published_ports".to_string())
    }
}

impl ImageBuilder for StubRuntime {
    async fn image_inspect(&self, image: &str) -> Result<Output> {
        self.respond("image_inspect", format!("image_inspect {image}"))
    }

    async fn build(&self, image: &str, context_dir: &str) -> Result<Output> {
        self.respond("build", format!("build {image} {context_dir}"))
    }
}

impl GuestExecutor for StubRuntime {
    async fn exec(&self, container: &str, args: &[&str]) -> Result<Output> {
        // Hook-script invocations are addressable separately so tests can
        // fail the hook without failing chmod/rm around it.
        let op = if args.first() == Some(&HOOK_GUEST_PATH) {
            "exec-hook"
        } else {
            "exec"
        };
        self.respond(op, format!("exec {container} {}", args.join(" ")))
    }

    async fn exec_with_stdin(
        &self,
        container: &str,
        args: &[&str],
        _input: &[u8],
    ) -> Result<Output> {
        self.respond(
            "exec_stdin",
            format!("exec_stdin {container} {}", args.join(" ")),
        )
    }

    async fn copy_in(&self, container: &str, local: &str, remote: &str) -> Result<Output> {
        self.respond("copy_in", format!("copy_in {container} {local} {remote}"))
    }
}

impl NetworkManager for StubRuntime {
    async fn network_inspect(&self, network: &str) -> Result<Output> {
        self.respond("network_inspect", format!("network_inspect {network}"))
    }

    async fn network_create(&self, network: &str) -> Result<Output> {
        self.respond("network_create", format!("network_create {network}"))
    }
}

impl ProxyRuntime for StubRuntime {
    async fn remove_proxy(&self, container: &str) -> Result<Output> {
        self.respond("remove_proxy", format!("remove_proxy {container}"))
    }

    async fn run_proxy(&self, spec: &ProxySpec<'_>) -> Result<Output> {
        self.respond(
            "run_proxy",
            format!(
                "run_proxy {} publishes={} script={}",
                spec.container,
                spec.publishes.join(","),
                spec.script.replace('\n', "; ")
            ),
        )
    }
}

/// Probe double backed by a fixed set of "listening" ports.
///
/// `ready_after_allocation` models an instance coming up: a port reads as
/// free the first time it is probed (allocation) and as listening on every
/// later probe (readiness poll).
pub struct StubProbe {
    listening: HashSet<u16>,
    flip: bool,
    seen: Mutex<HashSet<u16>>,
}

impl StubProbe {
    #[must_use]
    pub fn listening(ports: &[u16]) -> Self {
        Self {
            listening: ports.iter().copied().collect(),
            flip: false,
            seen: Mutex::new(HashSet::new()),
        }
    }

    #[must_use]
    pub fn ready_after_allocation() -> Self {
        Self {
            listening: HashSet::new(),
            flip: true,
            seen: Mutex::new(HashSet::new()),
        }
    }
}

impl PortProbe for StubProbe {
    async fn is_listening(&self, _bind: IpAddr, port: u16) -> bool {
        if self.listening.contains(&port) {
            return true;
        }
        if self.flip {
            let mut seen = self
                .seen
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            return !seen.insert(port);
        }
        false
    }
}

/// Reporter double that records emitted messages.
#[derive(Default)]
pub struct StubReporter {
    messages: Mutex<Vec<String>>,
}

impl StubReporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn push(&self, kind: &str, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(format!("{kind}: {message}"));
    }
}

impl ProgressReporter for StubReporter {
    fn step(&self, message: &str) {
        self.push("step", message);
    }

    fn success(&self, message: &str) {
        self.push("success", message);
    }

    fn warn(&self, message: &str) {
        self.push("warn", message);
    }
}
