//! Pure name validation — no I/O, no async.

use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;

use crate::domain::error::InstanceError;

/// Instance names are interpolated into file paths and container names, so
/// the rule is checked before any path or runtime call (CWE-22).
pub static INSTANCE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Safety: compile-time constant pattern — cannot fail.
    #[allow(clippy::expect_used)]
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").expect("valid regex")
});

/// Validate an instance name against the persisted-record naming rule.
///
/// # Errors
///
/// Returns `InstanceError::InvalidName` when the name does not match.
pub fn validate_instance_name(name: &str) -> Result<()> {
    if !INSTANCE_NAME_RE.is_match(name) {
        return Err(InstanceError::InvalidName(name.to_string()).into());
    }
    Ok(())
}
