//! Application services — free async functions over the port traits.
//!
//! Services hold no state of their own: every function takes the ports it
//! needs (`&impl Trait`) plus the store and config, so tests drive them with
//! in-memory doubles.

use std::process::Output;

pub mod allocator;
pub mod forwards;
pub mod hooks;
pub mod lifecycle;
pub mod status;

#[cfg(test)]
pub mod test_support;

/// Trimmed stderr of a finished process, for error context.
pub(crate) fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

/// Trimmed stdout of a finished process.
pub(crate) fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}
