//! Pure domain logic — no I/O, no async, no imports from `crate::infra`,
//! `crate::commands`, or `crate::application`.

pub mod credentials;
pub mod error;
pub mod validate;

/// Managed container name for an instance.
#[must_use]
pub fn container_name(instance: &str) -> String {
    format!("cabin-{instance}")
}

/// Deterministic name of the forwarding proxy container for an instance.
///
/// The name doubles as the explicit instance → proxy index: discovery never
/// depends on runtime label queries.
#[must_use]
pub fn proxy_container(instance: &str) -> String {
    format!("cabin-proxy-{instance}")
}
