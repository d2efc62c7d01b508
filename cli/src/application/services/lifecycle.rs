//! Instance lifecycle: create, resume, stop, remove, credential rotation,
//! and hardening toggles.
//!
//! Every mutating operation checks runtime reachability once at the top and
//! fails fast. Validation happens before any mutation. Convergence failures
//! (hook, readiness) leave the instance running.

use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use cabin_common::{Credential, InstanceRecord, SecurityMarker, SecurityState};
use chrono::Utc;

use crate::application::ports::{
    ContainerRuntime, GuestExecutor, ImageBuilder, NetworkManager, PortProbe, ProgressReporter,
    ProxyRuntime, RunSpec, RuntimeInspector,
};
use crate::application::services::{allocator, hooks};
use crate::domain::credentials::{PASSWORD_LEN, generate_password};
use crate::domain::error::InstanceError;
use crate::domain::validate::validate_instance_name;
use crate::domain::{container_name, proxy_container};
use crate::infra::config::Config;
use crate::infra::store::MetaStore;

/// Parameters for creating a new instance.
pub struct CreateOpts<'a> {
    pub name: &'a str,
    pub template: &'a str,
    /// Apply the hardening hook after creation.
    pub harden: bool,
}

/// Result of a create or resume. The password is shown to the operator at
/// this moment only; it is never echoed again.
pub struct StartOutcome {
    pub record: InstanceRecord,
    pub password: String,
    /// False when the SSH readiness poll timed out (soft failure).
    pub ssh_ready: bool,
}

// Debug hides the password, like `Credential`, so a panic or error message
// can never print a live secret.
impl std::fmt::Debug for StartOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StartOutcome")
            .field("record", &self.record)
            .field("ssh_ready", &self.ssh_ready)
            .finish_non_exhaustive()
    }
}

/// Fail fast when the container runtime daemon is unreachable.
///
/// # Errors
///
/// Returns an environment error with the daemon's stderr.
pub async fn ensure_runtime(rt: &impl RuntimeInspector) -> Result<()> {
    let out = rt.ping().await.context("contacting container runtime")?;
    if !out.status.success() {
        anyhow::bail!(
            "container runtime is not reachable: {}. Is the daemon running and do you have permission to use it?",
            super::stderr_of(&out)
        );
    }
    Ok(())
}

/// Create the shared network when it does not exist yet.
async fn ensure_network(rt: &impl NetworkManager, network: &str) -> Result<()> {
    let inspect = rt.network_inspect(network).await?;
    if inspect.status.success() {
        return Ok(());
    }
    let created = rt.network_create(network).await?;
    if !created.status.success() {
        anyhow::bail!(
            "creating network '{network}': {}",
            super::stderr_of(&created)
        );
    }
    Ok(())
}

/// Resolve the template image, building it when absent.
///
/// # Errors
///
/// Returns `InstanceError::TemplateMissing` when the template has no build
/// context, or the build error when the image cannot be produced.
pub async fn ensure_image(
    rt: &impl ImageBuilder,
    cfg: &Config,
    template: &str,
    reporter: &impl ProgressReporter,
) -> Result<String> {
    let dockerfile = cfg.dockerfile(template);
    if !dockerfile.exists() {
        return Err(InstanceError::TemplateMissing(
            template.to_string(),
            dockerfile.display().to_string(),
        )
        .into());
    }
    let image = cfg.image_for(template);
    let inspect = rt.image_inspect(&image).await?;
    if inspect.status.success() {
        return Ok(image);
    }
    reporter.step(&format!("Building image {image}"));
    let context_dir = cfg.template_dir(template).display().to_string();
    let built = rt.build(&image, &context_dir).await?;
    if !built.status.success() {
        anyhow::bail!("building image {image}: {}", super::stderr_of(&built));
    }
    reporter.success(&format!("Built {image}"));
    Ok(image)
}

/// Bounded poll for the in-guest SSH service. A timeout is a soft failure:
/// the instance stays up and the caller warns the operator.
pub async fn wait_for_ssh(probe: &impl PortProbe, port: u16, cfg: &Config) -> bool {
    let localhost = IpAddr::V4(Ipv4Addr::LOCALHOST);
    for _ in 0..cfg.ready_attempts {
        if probe.is_listening(localhost, port).await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(cfg.ready_interval_ms)).await;
    }
    false
}

/// Generate and set a fresh login credential inside the instance, then
/// persist it with restrictive permissions.
///
/// # Errors
///
/// Returns an error when the in-guest password change or the store write
/// fails.
pub async fn set_credential(
    rt: &impl GuestExecutor,
    store: &MetaStore,
    cfg: &Config,
    name: &str,
) -> Result<Credential> {
    let credential = Credential {
        password: generate_password(PASSWORD_LEN),
    };
    let line = format!("{}:{}", cfg.ssh_user, credential.password);
    let out = rt
        .exec_with_stdin(&container_name(name), &["chpasswd"], line.as_bytes())
        .await?;
    if !out.status.success() {
        anyhow::bail!(
            "setting login credential for '{name}': {}",
            super::stderr_of(&out)
        );
    }
    store.save_credential(name, &credential)?;
    Ok(credential)
}

/// absent → running. Builds the image if needed, allocates a host port,
/// launches the container, waits for SSH, sets a credential, persists the
/// record, runs the first-boot hook, and optionally applies hardening.
///
/// # Errors
///
/// Validation and environment errors abort before any container exists. A
/// hardening failure rolls hardening back but leaves the created instance
/// running, with its record persisted.
pub async fn create(
    rt: &impl ContainerRuntime,
    probe: &impl PortProbe,
    store: &MetaStore,
    cfg: &Config,
    reporter: &impl ProgressReporter,
    opts: &CreateOpts<'_>,
) -> Result<StartOutcome> {
    validate_instance_name(opts.name)?;
    ensure_runtime(rt).await?;
    if store.load_instance(opts.name)?.is_some() {
        return Err(InstanceError::AlreadyExists(opts.name.to_string()).into());
    }

    let image = ensure_image(rt, cfg, opts.template, reporter).await?;

    let published = allocator::published_ports(rt).await?;
    let host_port = allocator::pick(
        probe,
        &published,
        &cfg.reserved_ports,
        cfg.base_ssh_port,
        cfg.max_port_tries,
    )
    .await?;

    ensure_network(rt, &cfg.network).await?;

    let container = container_name(opts.name);
    reporter.step(&format!("Starting {container} on port {host_port}"));
    let ran = rt
        .run(&RunSpec {
            container: &container,
            hostname: opts.name,
            image: &image,
            ssh_port: host_port,
            limits: &cfg.limits,
            network: &cfg.network,
        })
        .await?;
    if !ran.status.success() {
        anyhow::bail!("launching '{}': {}", opts.name, super::stderr_of(&ran));
    }

    let ssh_ready = wait_for_ssh(probe, host_port, cfg).await;
    if !ssh_ready {
        reporter.warn(&format!(
            "SSH on port {host_port} did not become ready in time; the instance is still running"
        ));
    }

    let credential = set_credential(rt, store, cfg, opts.name).await?;

    let record = InstanceRecord {
        name: opts.name.to_string(),
        template: opts.template.to_string(),
        image,
        host_port,
        limits: cfg.limits.clone(),
        security: SecurityState::Disabled,
        created_at: Utc::now(),
    };
    store.save_instance(&record)?;

    run_firstboot(rt, cfg, &record, reporter).await;

    let record = if opts.harden {
        enable_hardening(rt, store, cfg, opts.name)
            .await
            .with_context(|| {
                format!(
                    "hardening failed and was rolled back; instance '{}' is running unhardened",
                    opts.name
                )
            })?
    } else {
        record
    };

    Ok(StartOutcome {
        record,
        password: credential.password,
        ssh_ready,
    })
}

/// First-boot provisioning, best effort. A missing script means the template
/// has nothing to do at boot; a failing one is reported and the instance
/// stays up.
async fn run_firstboot(
    rt: &impl GuestExecutor,
    cfg: &Config,
    record: &InstanceRecord,
    reporter: &impl ProgressReporter,
) {
    let script = cfg.firstboot_script(&record.template);
    if !script.exists() {
        return;
    }
    if let Err(err) = hooks::run_hook(
        rt,
        &container_name(&record.name),
        &script,
        hooks::HookMode::Run,
    )
    .await
    {
        reporter.warn(&format!("first-boot hook failed: {err:#}"));
    }
}

/// stopped → running. Restarts the container, re-waits for SSH, issues a
/// fresh credential, and re-applies hardening when the marker says it was
/// enabled. Every (re)start issues a fresh credential by design.
///
/// # Errors
///
/// Fails when the instance is unknown or the container cannot be started.
pub async fn resume(
    rt: &impl ContainerRuntime,
    probe: &impl PortProbe,
    store: &MetaStore,
    cfg: &Config,
    reporter: &impl ProgressReporter,
    name: &str,
) -> Result<StartOutcome> {
    validate_instance_name(name)?;
    ensure_runtime(rt).await?;
    let record = store
        .load_instance(name)?
        .ok_or_else(|| InstanceError::NotFound(name.to_string()))?;

    let container = container_name(name);
    let started = rt.start(&container).await?;
    if !started.status.success() {
        anyhow::bail!("starting '{name}': {}", super::stderr_of(&started));
    }

    let ssh_ready = wait_for_ssh(probe, record.host_port, cfg).await;
    if !ssh_ready {
        reporter.warn(&format!(
            "SSH on port {} did not become ready in time; the instance is still running",
            record.host_port
        ));
    }

    let credential = set_credential(rt, store, cfg, name).await?;

    // Re-apply hardening non-destructively when it was enabled before the
    // restart. Failure is reported, not fatal.
    if store.load_marker(name)?.is_some()
        && let Err(err) = hooks::run_hook(
            rt,
            &container,
            &cfg.harden_script(&record.template),
            hooks::HookMode::Resume,
        )
        .await
    {
        reporter.warn(&format!("re-applying hardening failed: {err:#}"));
    }

    Ok(StartOutcome {
        record,
        password: credential.password,
        ssh_ready,
    })
}

/// running → stopped. No metadata changes.
///
/// # Errors
///
/// Fails when the instance is unknown or the container cannot be stopped.
pub async fn stop(
    rt: &(impl crate::application::ports::InstanceLifecycle + RuntimeInspector),
    store: &MetaStore,
    name: &str,
) -> Result<()> {
    validate_instance_name(name)?;
    ensure_runtime(rt).await?;
    if store.load_instance(name)?.is_none() {
        return Err(InstanceError::NotFound(name.to_string()).into());
    }
    let out = rt.stop(&container_name(name)).await?;
    if !out.status.success() {
        anyhow::bail!("stopping '{name}': {}", super::stderr_of(&out));
    }
    Ok(())
}

/// any → absent. Full teardown: container, forwarding proxy, and every
/// durable record. Container and proxy removal are unconditional; a missing
/// container does not block record cleanup.
///
/// # Errors
///
/// Fails when the instance is unknown or record files cannot be deleted.
pub async fn remove(
    rt: &(impl crate::application::ports::InstanceLifecycle + RuntimeInspector + ProxyRuntime),
    store: &MetaStore,
    name: &str,
) -> Result<()> {
    validate_instance_name(name)?;
    ensure_runtime(rt).await?;
    if store.load_instance(name)?.is_none() {
        return Err(InstanceError::NotFound(name.to_string()).into());
    }
    let _ = rt.remove(&container_name(name)).await?;
    let _ = rt.remove_proxy(&proxy_container(name)).await?;
    store.remove_all(name)?;
    Ok(())
}

// ── Hardening ─────────────────────────────────────────────────────────────────

/// Apply the hardening hook and persist the marker only on success. On hook
/// failure the compensating rollback runs `disable` inside the instance,
/// clears the marker, and resets the record, then surfaces the original
/// error. The instance is never deleted here.
///
/// # Errors
///
/// Propagates the hook failure after rollback.
pub async fn enable_hardening(
    rt: &impl GuestExecutor,
    store: &MetaStore,
    cfg: &Config,
    name: &str,
) -> Result<InstanceRecord> {
    validate_instance_name(name)?;
    let record = store
        .load_instance(name)?
        .ok_or_else(|| InstanceError::NotFound(name.to_string()))?;
    let container = container_name(name);
    let script = cfg.harden_script(&record.template);

    if let Err(err) = hooks::run_hook(rt, &container, &script, hooks::HookMode::Enable).await {
        rollback_hardening(rt, store, name, &script).await;
        return Err(err);
    }

    store.save_marker(name, &SecurityMarker { applied_at: Utc::now() })?;
    store.update_instance(name, |r| r.security = SecurityState::Enabled)
}

/// Purge partially-applied hardening artifacts and clear durable state.
/// Best effort; rollback failures must not mask the original hook error.
async fn rollback_hardening(
    rt: &impl GuestExecutor,
    store: &MetaStore,
    name: &str,
    script: &Path,
) {
    let _ = hooks::run_hook(
        rt,
        &container_name(name),
        script,
        hooks::HookMode::Disable,
    )
    .await;
    let _ = store.clear_marker(name);
    let _ = store.update_instance(name, |r| r.security = SecurityState::Disabled);
}

/// Roll hardening back explicitly and clear the marker.
///
/// # Errors
///
/// Fails when the instance is unknown or the hook reports failure.
pub async fn disable_hardening(
    rt: &impl GuestExecutor,
    store: &MetaStore,
    cfg: &Config,
    name: &str,
) -> Result<InstanceRecord> {
    validate_instance_name(name)?;
    let record = store
        .load_instance(name)?
        .ok_or_else(|| InstanceError::NotFound(name.to_string()))?;
    hooks::run_hook(
        rt,
        &container_name(name),
        &cfg.harden_script(&record.template),
        hooks::HookMode::Disable,
    )
    .await?;
    store.clear_marker(name)?;
    store.update_instance(name, |r| r.security = SecurityState::Disabled)
}

/// Ask the hook for the current in-guest posture. Read-only.
///
/// # Errors
///
/// Fails when the instance is unknown or the hook reports failure.
pub async fn hardening_status(
    rt: &impl GuestExecutor,
    store: &MetaStore,
    cfg: &Config,
    name: &str,
) -> Result<String> {
    validate_instance_name(name)?;
    let record = store
        .load_instance(name)?
        .ok_or_else(|| InstanceError::NotFound(name.to_string()))?;
    hooks::run_hook(
        rt,
        &container_name(name),
        &cfg.harden_script(&record.template),
        hooks::HookMode::Status,
    )
    .await
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::application::services::test_support::{StubProbe, StubReporter, StubRuntime};
    use crate::infra::config::test_config;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        cfg: Config,
        store: MetaStore,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().expect("tempdir");
        let cfg = test_config(dir.path());
        let store = MetaStore::new(cfg.state_dir.clone());
        let template = cfg.template_dir("base");
        std::fs::create_dir_all(&template).expect("template dir");
        std::fs::write(template.join("Dockerfile"), "FROM debian:stable\n").expect("dockerfile");
        std::fs::write(template.join("harden.sh"), "#!/bin/sh\nexit 0\n").expect("harden");
        Fixture {
            _dir: dir,
            cfg,
            store,
        }
    }

    fn opts<'a>(name: &'a str, harden: bool) -> CreateOpts<'a> {
        CreateOpts {
            name,
            template: "base",
            harden,
        }
    }

    #[tokio::test]
    async fn start_outcome_debug_never_prints_the_password() {
        let f = fixture();
        let rt = StubRuntime::new();
        let probe = StubProbe::ready_after_allocation();
        let outcome = create(&rt, &probe, &f.store, &f.cfg, &StubReporter::new(), &opts("demo", false))
            .await
            .expect("create");
        let text = format!("{outcome:?}");
        assert!(!text.contains(&outcome.password), "got: {text}");
        assert!(text.contains("ssh_ready"), "got: {text}");
    }

    #[tokio::test]
    async fn create_persists_record_and_credential() {
        let f = fixture();
        let rt = StubRuntime::new();
        let probe = StubProbe::ready_after_allocation();
        let outcome = create(&rt, &probe, &f.store, &f.cfg, &StubReporter::new(), &opts("demo", false))
            .await
            .expect("create");

        assert!(outcome.ssh_ready);
        assert_eq!(outcome.record.host_port, 42000);
        assert_eq!(outcome.password.len(), PASSWORD_LEN);
        assert!(rt.called("run cabin-demo"));
        assert!(rt.called("exec_stdin cabin-demo chpasswd"));
        let stored = f.store.load_instance("demo").expect("load").expect("record");
        assert_eq!(stored.image, "cabin/base:latest");
        let cred = f.store.load_credential("demo").expect("load").expect("credential");
        assert_eq!(cred.password, outcome.password);
    }

    #[tokio::test]
    async fn create_builds_image_when_absent() {
        let f = fixture();
        let rt = StubRuntime::new();
        rt.fail_on("image_inspect");
        let probe = StubProbe::ready_after_allocation();
        create(&rt, &probe, &f.store, &f.cfg, &StubReporter::new(), &opts("demo", false))
            .await
            .expect("create");
        assert!(rt.called("build cabin/base:latest"));
    }

    #[tokio::test]
    async fn failed_build_leaves_no_record_and_no_container() {
        let f = fixture();
        let rt = StubRuntime::new();
        rt.fail_on("image_inspect");
        rt.fail_on("build");
        let probe = StubProbe::listening(&[]);
        let err = create(&rt, &probe, &f.store, &f.cfg, &StubReporter::new(), &opts("demo", false))
            .await
            .expect_err("must fail");
        assert!(err.to_string().contains("building image"), "got: {err}");
        assert!(f.store.load_instance("demo").expect("load").is_none());
        assert!(!rt.called("run "), "no container may be launched");
    }

    #[tokio::test]
    async fn invalid_name_is_rejected_before_any_runtime_call() {
        let f = fixture();
        let rt = StubRuntime::new();
        let probe = StubProbe::listening(&[]);
        let err = create(&rt, &probe, &f.store, &f.cfg, &StubReporter::new(), &opts("-bad", false))
            .await
            .expect_err("must fail");
        assert!(err.to_string().contains("Invalid instance name"), "got: {err}");
        assert!(rt.calls().is_empty());
    }

    #[tokio::test]
    async fn duplicate_name_is_rejected() {
        let f = fixture();
        let rt = StubRuntime::new();
        let probe = StubProbe::ready_after_allocation();
        create(&rt, &probe, &f.store, &f.cfg, &StubReporter::new(), &opts("demo", false))
            .await
            .expect("first create");
        let err = create(&rt, &probe, &f.store, &f.cfg, &StubReporter::new(), &opts("demo", false))
            .await
            .expect_err("must fail");
        assert!(err.to_string().contains("already exists"), "got: {err}");
    }

    #[tokio::test]
    async fn missing_template_is_rejected() {
        let f = fixture();
        let rt = StubRuntime::new();
        let probe = StubProbe::listening(&[]);
        let err = create(
            &rt,
            &probe,
            &f.store,
            &f.cfg,
            &StubReporter::new(),
            &CreateOpts {
                name: "demo",
                template: "ghost",
                harden: false,
            },
        )
        .await
        .expect_err("must fail");
        assert!(err.to_string().contains("Template 'ghost'"), "got: {err}");
    }

    #[tokio::test]
    async fn readiness_timeout_is_soft() {
        let f = fixture();
        let rt = StubRuntime::new();
        let probe = StubProbe::listening(&[]); // SSH never comes up
        let reporter = StubReporter::new();
        let outcome = create(&rt, &probe, &f.store, &f.cfg, &reporter, &opts("demo", false))
            .await
            .expect("create succeeds despite timeout");
        assert!(!outcome.ssh_ready);
        assert!(
            reporter
                .messages()
                .iter()
                .any(|m| m.starts_with("warn") && m.contains("did not become ready"))
        );
        assert!(f.store.load_instance("demo").expect("load").is_some());
    }

    #[tokio::test]
    async fn create_with_harden_persists_marker_and_state() {
        let f = fixture();
        let rt = StubRuntime::new();
        let probe = StubProbe::ready_after_allocation();
        let outcome = create(&rt, &probe, &f.store, &f.cfg, &StubReporter::new(), &opts("demo", true))
            .await
            .expect("create");
        assert_eq!(outcome.record.security, SecurityState::Enabled);
        assert!(f.store.load_marker("demo").expect("load").is_some());
        assert!(rt.called("exec cabin-demo /tmp/.cabin-hook enable"));
    }

    #[tokio::test]
    async fn harden_failure_rolls_back_and_leaves_instance_running() {
        let f = fixture();
        let rt = StubRuntime::new();
        rt.fail_on("exec-hook");
        let probe = StubProbe::ready_after_allocation();
        let err = create(&rt, &probe, &f.store, &f.cfg, &StubReporter::new(), &opts("demo", true))
            .await
            .expect_err("must fail");
        assert!(err.to_string().contains("rolled back"), "got: {err}");
        // Marker absent, record persisted as disabled, container not removed.
        assert!(f.store.load_marker("demo").expect("load").is_none());
        let record = f.store.load_instance("demo").expect("load").expect("record");
        assert_eq!(record.security, SecurityState::Disabled);
        assert!(!rt.called("remove cabin-demo"));
        // Compensating rollback invoked the disable mode in-guest.
        assert!(rt.called("exec cabin-demo /tmp/.cabin-hook disable"));
    }

    #[tokio::test]
    async fn resume_issues_a_fresh_credential() {
        let f = fixture();
        let rt = StubRuntime::new();
        let probe = StubProbe::ready_after_allocation();
        let first = create(&rt, &probe, &f.store, &f.cfg, &StubReporter::new(), &opts("demo", false))
            .await
            .expect("create");
        let resumed = resume(&rt, &probe, &f.store, &f.cfg, &StubReporter::new(), "demo")
            .await
            .expect("resume");
        assert!(rt.called("start cabin-demo"));
        assert_ne!(first.password, resumed.password);
        let cred = f.store.load_credential("demo").expect("load").expect("credential");
        assert_eq!(cred.password, resumed.password);
    }

    #[tokio::test]
    async fn resume_reapplies_hardening_when_marker_present() {
        let f = fixture();
        let rt = StubRuntime::new();
        let probe = StubProbe::ready_after_allocation();
        create(&rt, &probe, &f.store, &f.cfg, &StubReporter::new(), &opts("demo", true))
            .await
            .expect("create");
        resume(&rt, &probe, &f.store, &f.cfg, &StubReporter::new(), "demo")
            .await
            .expect("resume");
        assert!(rt.called("exec cabin-demo /tmp/.cabin-hook resume"));
    }

    #[tokio::test]
    async fn resume_of_unknown_instance_fails() {
        let f = fixture();
        let rt = StubRuntime::new();
        let probe = StubProbe::listening(&[]);
        let err = resume(&rt, &probe, &f.store, &f.cfg, &StubReporter::new(), "ghost")
            .await
            .expect_err("must fail");
        assert!(err.to_string().contains("not found"), "got: {err}");
    }

    #[tokio::test]
    async fn stop_requires_a_record_and_stops_the_container() {
        let f = fixture();
        let rt = StubRuntime::new();
        let probe = StubProbe::ready_after_allocation();
        create(&rt, &probe, &f.store, &f.cfg, &StubReporter::new(), &opts("demo", false))
            .await
            .expect("create");
        stop(&rt, &f.store, "demo").await.expect("stop");
        assert!(rt.called("stop cabin-demo"));
        assert!(stop(&rt, &f.store, "ghost").await.is_err());
    }

    #[tokio::test]
    async fn remove_clears_every_per_instance_record() {
        let f = fixture();
        let rt = StubRuntime::new();
        let probe = StubProbe::ready_after_allocation();
        create(&rt, &probe, &f.store, &f.cfg, &StubReporter::new(), &opts("demo", true))
            .await
            .expect("create");
        let set = cabin_common::forward::parse_set("127.0.0.1:8080:80\n").expect("parse");
        f.store.save_forwards("demo", &set).expect("save forwards");

        remove(&rt, &f.store, "demo").await.expect("remove");

        assert!(rt.called("remove cabin-demo"));
        assert!(rt.called("remove_proxy cabin-proxy-demo"));
        assert!(f.store.load_instance("demo").expect("load").is_none());
        assert!(f.store.load_credential("demo").expect("load").is_none());
        assert!(f.store.load_marker("demo").expect("load").is_none());
        assert!(f.store.load_forwards("demo").expect("load").is_empty());
    }

    #[tokio::test]
    async fn disable_hardening_clears_marker() {
        let f = fixture();
        let rt = StubRuntime::new();
        let probe = StubProbe::ready_after_allocation();
        create(&rt, &probe, &f.store, &f.cfg, &StubReporter::new(), &opts("demo", true))
            .await
            .expect("create");
        let record = disable_hardening(&rt, &f.store, &f.cfg, "demo")
            .await
            .expect("disable");
        assert_eq!(record.security, SecurityState::Disabled);
        assert!(f.store.load_marker("demo").expect("load").is_none());
    }

    #[tokio::test]
    async fn unreachable_runtime_fails_fast() {
        let f = fixture();
        let rt = StubRuntime::new();
        rt.fail_on("ping");
        let probe = StubProbe::listening(&[]);
        let err = create(&rt, &probe, &f.store, &f.cfg, &StubReporter::new(), &opts("demo", false))
            .await
            .expect_err("must fail");
        assert!(err.to_string().contains("not reachable"), "got: {err}");
        assert_eq!(rt.calls(), vec!["ping".to_string()]);
    }
}
