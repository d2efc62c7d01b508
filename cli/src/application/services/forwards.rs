//! Port-forward reconciliation.
//!
//! `sync` is a full rebuild, not an incremental diff: the proxy container is
//! always torn down first, and rebuilt only when the declared set is
//! non-empty. Correctness by brute force — no partial or stale mapping can
//! survive an apply.

use anyhow::Result;
use cabin_common::PortForward;

use crate::application::ports::{PortProbe, ProxyRuntime, ProxySpec};
use crate::domain::error::{ForwardSetError, InstanceError};
use crate::domain::validate::validate_instance_name;
use crate::domain::{container_name, proxy_container};
use crate::infra::config::Config;
use crate::infra::store::MetaStore;

/// Relay script served as the proxy container's entrypoint: one backgrounded
/// listener per declared forward, then wait on all of them.
#[must_use]
pub fn relay_script(upstream: &str, set: &[PortForward]) -> String {
    let mut script = String::new();
    for f in set {
        script.push_str(&format!(
            "socat TCP-LISTEN:{},fork,reuseaddr TCP:{upstream}:{} &\n",
            f.host_port, f.container_port
        ));
    }
    script.push_str("wait\n");
    script
}

/// Host publications for the proxy container, one per declared forward. The
/// in-container listener uses the host port number, so host and container
/// sides of the publication match.
#[must_use]
pub fn publish_args(set: &[PortForward]) -> Vec<String> {
    set.iter()
        .map(|f| format!("{}:{}:{}", f.bind, f.host_port, f.host_port))
        .collect()
}

/// Rebuild the forwarding proxy for `name` from its declared set.
///
/// Idempotent. An empty declared set leaves no proxy at all.
///
/// # Errors
///
/// Fails when the declared set cannot be read or the proxy container cannot
/// be started.
pub async fn sync(
    rt: &impl ProxyRuntime,
    store: &MetaStore,
    cfg: &Config,
    name: &str,
) -> Result<()> {
    let proxy = proxy_container(name);
    // Unconditional teardown; a missing proxy is fine.
    let _ = rt.remove_proxy(&proxy).await?;

    let set = store.load_forwards(name)?;
    if set.is_empty() {
        return Ok(());
    }

    let upstream = container_name(name);
    let script = relay_script(&upstream, &set);
    let publishes = publish_args(&set);
    let out = rt
        .run_proxy(&ProxySpec {
            instance: name,
            container: &proxy,
            image: &cfg.proxy_image,
            network: &cfg.network,
            publishes: &publishes,
            script: &script,
        })
        .await?;
    if !out.status.success() {
        anyhow::bail!(
            "starting forwarding proxy for '{name}': {}",
            super::stderr_of(&out)
        );
    }
    Ok(())
}

/// Declare a new forward and rebuild the proxy. The append is speculative:
/// when the rebuild fails, the entry is rolled back so the declared set
/// never contains a mapping the proxy failed to realize, and the proxy is
/// rebuilt for the entries that were already declared.
///
/// # Errors
///
/// Rejects unknown instances, duplicate declarations, and host ports already
/// in use, all before any mutation. Propagates proxy-rebuild failures after
/// rolling the entry back.
pub async fn add(
    rt: &impl ProxyRuntime,
    probe: &impl PortProbe,
    store: &MetaStore,
    cfg: &Config,
    name: &str,
    forward: &PortForward,
) -> Result<Vec<PortForward>> {
    validate_instance_name(name)?;
    if store.load_instance(name)?.is_none() {
        return Err(InstanceError::NotFound(name.to_string()).into());
    }

    // The host port must be free across every instance: SSH ports and all
    // declared forward entries.
    for record in store.list_instances()? {
        if record.host_port == forward.host_port {
            return Err(ForwardSetError::HostPortInUse(forward.host_port).into());
        }
        for declared in store.load_forwards(&record.name)? {
            if record.name == name {
                if declared.host_port == forward.host_port {
                    return Err(ForwardSetError::AlreadyDeclared(forward.to_string()).into());
                }
            } else if declared.host_port == forward.host_port {
                return Err(ForwardSetError::HostPortInUse(forward.host_port).into());
            }
        }
    }
    if probe.is_listening(forward.bind, forward.host_port).await {
        return Err(ForwardSetError::HostPortInUse(forward.host_port).into());
    }

    let set = store.update_forwards(name, |set| {
        set.push(forward.clone());
        Ok(())
    })?;

    if let Err(err) = sync(rt, store, cfg, name).await {
        // Roll the speculative append back, then rebuild the proxy for the
        // surviving entries — the failed sync already tore the old one down.
        // The rebuild is best effort; the append failure is what surfaces.
        let _ = store.update_forwards(name, |set| {
            set.retain(|f| f != forward);
            Ok(())
        });
        let _ = sync(rt, store, cfg, name).await;
        return Err(err);
    }
    Ok(set)
}

/// Delete a declared forward and rebuild the proxy unconditionally, even
/// when the removal leaves the set empty.
///
/// # Errors
///
/// Fails when the instance is unknown or the mapping was never declared.
pub async fn remove(
    rt: &impl ProxyRuntime,
    store: &MetaStore,
    cfg: &Config,
    name: &str,
    forward: &PortForward,
) -> Result<Vec<PortForward>> {
    validate_instance_name(name)?;
    if store.load_instance(name)?.is_none() {
        return Err(InstanceError::NotFound(name.to_string()).into());
    }
    let set = store.update_forwards(name, |set| {
        let before = set.len();
        set.retain(|f| f != forward);
        if set.len() == before {
            return Err(ForwardSetError::NotDeclared(forward.to_string()).into());
        }
        Ok(())
    })?;
    sync(rt, store, cfg, name).await?;
    Ok(set)
}

/// The declared set for `name`.
///
/// # Errors
///
/// Fails when the instance is unknown or the set file is malformed.
pub fn list(store: &MetaStore, name: &str) -> Result<Vec<PortForward>> {
    validate_instance_name(name)?;
    if store.load_instance(name)?.is_none() {
        return Err(InstanceError::NotFound(name.to_string()).into());
    }
    store.load_forwards(name)
}
