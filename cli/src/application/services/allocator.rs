//! Host-port allocation for new instances.
//!
//! Candidates are `base + i*100`, tried in increasing order. The step of 100
//! keeps the assigned range human-predictable and clear of manually-assigned
//! neighbors. A candidate is taken only when it passes all three checks: no
//! local listener, not in the runtime's published-port list, not reserved by
//! operator policy.

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};

use anyhow::{Context, Result};

use crate::application::ports::{PortProbe, RuntimeInspector};
use crate::domain::error::PortError;

const PORT_STEP: u32 = 100;

/// Pick the first free candidate port, or fail after `max_tries` candidates.
///
/// # Errors
///
/// Returns [`PortError::Exhausted`] when no candidate is free. The caller
/// must not launch a container without a confirmed port.
pub async fn pick(
    probe: &impl PortProbe,
    published: &HashSet<u16>,
    reserved: &[u16],
    base: u16,
    max_tries: u16,
) -> Result<u16, PortError> {
    let localhost = IpAddr::V4(Ipv4Addr::LOCALHOST);
    for i in 0..u32::from(max_tries) {
        let Ok(candidate) = u16::try_from(u32::from(base) + i * PORT_STEP) else {
            break; // candidates past 65535 count as occupied
        };
        if reserved.contains(&candidate) || published.contains(&candidate) {
            continue;
        }
        if probe.is_listening(localhost, candidate).await {
            continue;
        }
        return Ok(candidate);
    }
    Err(PortError::Exhausted {
        base,
        tries: max_tries,
    })
}

/// Ask the runtime for all currently published host ports.
///
/// # Errors
///
/// Returns an error when the runtime cannot be queried.
pub async fn published_ports(rt: &impl RuntimeInspector) -> Result<HashSet<u16>> {
    let out = rt
        .published_ports()
        .await
        .context("listing published ports")?;
    if !out.status.success() {
        anyhow::bail!("listing published ports: {}", super::stderr_of(&out));
    }
    Ok(parse_published_ports(&super::stdout_of(&out)))
}

/// Parse the runtime's published-port column, e.g.
/// `0.0.0.0:42000->22/tcp, :::42000->22/tcp`, into the set of host ports.
/// Unparseable fragments are skipped; this is an observation, not a record.
#[must_use]
pub fn parse_published_ports(text: &str) -> HashSet<u16> {
    let mut ports = HashSet::new();
    for segment in text.split([',', '\n']) {
        let Some((host_side, _)) = segment.split_once("->") else {
            continue;
        };
        if let Some((_, port)) = host_side.trim().rsplit_once(':')
            && let Ok(port) = port.parse::<u16>()
        {
            ports.insert(port);
        }
    }
    ports
}
