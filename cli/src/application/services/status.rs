//! Aggregate instance status: durable records joined with observed runtime
//! state.

use anyhow::Result;
use cabin_common::{InstanceRecord, PortForward};

use crate::application::ports::RuntimeInspector;
use crate::domain::container_name;
use crate::domain::error::InstanceError;
use crate::domain::validate::validate_instance_name;
use crate::infra::store::MetaStore;

/// One instance's records plus what the runtime reports about it.
pub struct InstanceStatus {
    pub record: InstanceRecord,
    pub running: bool,
    /// Instance address on the shared network, when running.
    pub ip: Option<String>,
    pub hardened: bool,
    pub forwards: Vec<PortForward>,
}

/// Observed state of one container, from the runtime's inspect output.
pub struct ObservedState {
    pub running: bool,
    pub ip: Option<String>,
}

/// Parse a runtime inspect document (JSON array with one element) into the
/// observed state. Unexpected shapes read as not running.
#[must_use]
pub fn parse_inspect(json: &str) -> ObservedState {
    let parsed: serde_json::Value = match serde_json::from_str(json) {
        Ok(value) => value,
        Err(_) => {
            return ObservedState {
                running: false,
                ip: None,
            };
        }
    };
    let container = &parsed[0];
    let running = container["State"]["Running"].as_bool().unwrap_or(false);
    let ip = container["NetworkSettings"]["Networks"]
        .as_object()
        .and_then(|networks| networks.values().next())
        .and_then(|net| net["IPAddress"].as_str())
        .filter(|ip| !ip.is_empty())
        .map(ToString::to_string);
    ObservedState { running, ip }
}

/// Status of one named instance.
///
/// # Errors
///
/// Fails when the instance is unknown or its records are malformed. A
/// missing container reads as not running, not as an error.
pub async fn instance_status(
    rt: &impl RuntimeInspector,
    store: &MetaStore,
    name: &str,
) -> Result<InstanceStatus> {
    validate_instance_name(name)?;
    let record = store
        .load_instance(name)?
        .ok_or_else(|| InstanceError::NotFound(name.to_string()))?;
    let hardened = store.load_marker(name)?.is_some();
    let forwards = store.load_forwards(name)?;

    let out = rt.inspect(&container_name(name)).await?;
    let observed = if out.status.success() {
        parse_inspect(&super::stdout_of(&out))
    } else {
        ObservedState {
            running: false,
            ip: None,
        }
    };

    Ok(InstanceStatus {
        record,
        running: observed.running,
        ip: observed.ip,
        hardened,
        forwards,
    })
}

/// Status of every known instance, sorted by name.
///
/// # Errors
///
/// Fails when the store cannot be scanned or a record is malformed.
pub async fn all_statuses(rt: &impl RuntimeInspector, store: &MetaStore) -> Result<Vec<InstanceStatus>> {
    let mut statuses = Vec::new();
    for record in store.list_instances()? {
        statuses.push(instance_status(rt, store, &record.name).await?);
    }
    Ok(statuses)
}
