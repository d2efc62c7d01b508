//! Typed domain error enums.
//!
//! All error types implement `thiserror::Error` and convert to
//! `anyhow::Error` via the `?` operator. The taxonomy follows the operator
//! experience: environment errors are fatal, validation errors reject before
//! any mutation, convergence errors leave the instance running.

use thiserror::Error;

// ── Instance errors ───────────────────────────────────────────────────────────

/// Errors related to instance identity and lifecycle.
#[derive(Debug, Error)]
pub enum InstanceError {
    #[error("Instance '{0}' not found. Run 'cabin start {0}' to create it.")]
    NotFound(String),

    #[error("Instance '{0}' already exists. Remove it first: cabin remove {0}")]
    AlreadyExists(String),

    #[error(
        "Invalid instance name '{0}': must start with a letter or digit and \
         contain only letters, digits, '_', '.' and '-'"
    )]
    InvalidName(String),

    #[error("Template '{0}' not found: no Dockerfile at {1}")]
    TemplateMissing(String, String),
}

// ── Port allocation errors ────────────────────────────────────────────────────

/// Errors from the host-port allocator.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PortError {
    #[error(
        "No free host port in range: tried {tries} candidates from {base} in steps of 100"
    )]
    Exhausted { base: u16, tries: u16 },
}

// ── Forward-set errors ────────────────────────────────────────────────────────

/// Validation errors for declared port-forward sets.
#[derive(Debug, Error)]
pub enum ForwardSetError {
    #[error("Forward {0} is already declared for this instance")]
    AlreadyDeclared(String),

    #[error("Host port {0} is already in use on this host")]
    HostPortInUse(u16),

    #[error("Forward {0} is not declared for this instance")]
    NotDeclared(String),
}

// ── Hook errors ───────────────────────────────────────────────────────────────

/// Errors from hook execution inside an instance.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("Hook script not found at {0}")]
    ScriptMissing(String),

    #[error("Failed to copy hook into instance: {0}")]
    CopyFailed(String),

    #[error("Hook '{mode}' failed (exit {code}): {stderr}")]
    Failed {
        mode: &'static str,
        code: i32,
        stderr: String,
    },
}
