//! Typed durable records: instance metadata, credential, hardening marker.
//!
//! Each record maps to one flat file managed by the metadata store. Parsing
//! is strict — unknown keys are errors, not noise to skip.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::kv;

/// Errors produced while decoding a typed record from its `key=value` form.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error(transparent)]
    Kv(#[from] kv::KvError),

    #[error("missing field '{0}'")]
    MissingField(&'static str),

    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("invalid value '{value}' for field '{field}'")]
    InvalidValue { field: &'static str, value: String },
}

fn invalid(field: &'static str, value: &str) -> RecordError {
    RecordError::InvalidValue {
        field,
        value: value.to_string(),
    }
}

// ── Security state ────────────────────────────────────────────────────────────

/// Whether the hardening hook has been applied and should be resumed on
/// restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecurityState {
    #[default]
    Disabled,
    Enabled,
}

impl SecurityState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SecurityState::Disabled => "disabled",
            SecurityState::Enabled => "enabled",
        }
    }

    /// # Errors
    ///
    /// Returns an error for anything other than `disabled` / `enabled`.
    pub fn parse(value: &str) -> Result<Self, RecordError> {
        match value {
            "disabled" => Ok(SecurityState::Disabled),
            "enabled" => Ok(SecurityState::Enabled),
            other => Err(invalid("security", other)),
        }
    }
}

// ── Resource limits ───────────────────────────────────────────────────────────

/// Per-instance container resource ceilings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLimits {
    /// Memory limit in Docker syntax, e.g. `2g`.
    pub memory: String,
    /// Relative CPU shares (Docker `--cpu-shares`).
    pub cpu_shares: u32,
    /// Process-count ceiling (Docker `--pids-limit`).
    pub pids_limit: u32,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            memory: "2g".to_string(),
            cpu_shares: 1024,
            pids_limit: 512,
        }
    }
}

// ── Instance record ───────────────────────────────────────────────────────────

/// Durable metadata for one named instance. Exclusively owned by the
/// lifecycle controller; read-only everywhere else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRecord {
    pub name: String,
    /// Environment definition this instance was built from.
    pub template: String,
    /// Resolved container image reference.
    pub image: String,
    /// Host-published SSH port, unique across instances.
    pub host_port: u16,
    pub limits: ResourceLimits,
    pub security: SecurityState,
    pub created_at: DateTime<Utc>,
}

impl InstanceRecord {
    /// Render to the persisted `key=value` form.
    #[must_use]
    pub fn to_kv(&self) -> String {
        let host_port = self.host_port.to_string();
        let cpu_shares = self.limits.cpu_shares.to_string();
        let pids_limit = self.limits.pids_limit.to_string();
        let created_at = self.created_at.to_rfc3339();
        kv::render(&[
            ("name", &self.name),
            ("template", &self.template),
            ("image", &self.image),
            ("host_port", &host_port),
            ("memory", &self.limits.memory),
            ("cpu_shares", &cpu_shares),
            ("pids_limit", &pids_limit),
            ("security", self.security.as_str()),
            ("created_at", &created_at),
        ])
    }

    /// Parse the persisted form back into a typed record.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed lines, unknown keys, missing fields, or
    /// values that fail to parse.
    pub fn parse(text: &str) -> Result<Self, RecordError> {
        let mut name = None;
        let mut template = None;
        let mut image = None;
        let mut host_port = None;
        let mut limits = ResourceLimits::default();
        let mut security = SecurityState::Disabled;
        let mut created_at = None;

        for (key, value) in kv::parse(text)? {
            match key.as_str() {
                "name" => name = Some(value),
                "template" => template = Some(value),
                "image" => image = Some(value),
                "host_port" => {
                    host_port = Some(value.parse().map_err(|_| invalid("host_port", &value))?);
                }
                "memory" => limits.memory = value,
                "cpu_shares" => {
                    limits.cpu_shares = value.parse().map_err(|_| invalid("cpu_shares", &value))?;
                }
                "pids_limit" => {
                    limits.pids_limit = value.parse().map_err(|_| invalid("pids_limit", &value))?;
                }
                "security" => security = SecurityState::parse(&value)?,
                "created_at" => {
                    created_at = Some(
                        DateTime::parse_from_rfc3339(&value)
                            .map_err(|_| invalid("created_at", &value))?
                            .with_timezone(&Utc),
                    );
                }
                _ => return Err(RecordError::UnknownField(key)),
            }
        }

        Ok(Self {
            name: name.ok_or(RecordError::MissingField("name"))?,
            template: template.ok_or(RecordError::MissingField("template"))?,
            image: image.ok_or(RecordError::MissingField("image"))?,
            host_port: host_port.ok_or(RecordError::MissingField("host_port"))?,
            limits,
            security,
            created_at: created_at.ok_or(RecordError::MissingField("created_at"))?,
        })
    }
}

// ── Credential record ─────────────────────────────────────────────────────────

/// Generated login secret for the instance account. Written with mode 0600
/// and never echoed outside the generation moment.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub password: String,
}

// Debug deliberately hides the secret so it cannot leak through error chains.
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential").finish_non_exhaustive()
    }
}

impl Credential {
    #[must_use]
    pub fn to_kv(&self) -> String {
        kv::render(&[("password", &self.password)])
    }

    /// # Errors
    ///
    /// Returns an error if the file does not contain exactly a `password` key.
    pub fn parse(text: &str) -> Result<Self, RecordError> {
        let mut password = None;
        for (key, value) in kv::parse(text)? {
            match key.as_str() {
                "password" => password = Some(value),
                _ => return Err(RecordError::UnknownField(key)),
            }
        }
        Ok(Self {
            password: password.ok_or(RecordError::MissingField("password"))?,
        })
    }
}

// ── Security marker ───────────────────────────────────────────────────────────

/// Durable flag recording the last successful hardening apply. Present only
/// after the hook reported success; removed on rollback or disable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityMarker {
    pub applied_at: DateTime<Utc>,
}

impl SecurityMarker {
    #[must_use]
    pub fn to_kv(&self) -> String {
        let applied_at = self.applied_at.to_rfc3339();
        kv::render(&[("enabled", "true"), ("applied_at", &applied_at)])
    }

    /// # Errors
    ///
    /// Returns an error unless the file records `enabled=true` with a valid
    /// timestamp.
    pub fn parse(text: &str) -> Result<Self, RecordError> {
        let mut enabled = false;
        let mut applied_at = None;
        for (key, value) in kv::parse(text)? {
            match key.as_str() {
                "enabled" => {
                    if value != "true" {
                        return Err(invalid("enabled", &value));
                    }
                    enabled = true;
                }
                "applied_at" => {
                    applied_at = Some(
                        DateTime::parse_from_rfc3339(&value)
                            .map_err(|_| invalid("applied_at", &value))?
                            .with_timezone(&Utc),
                    );
                }
                _ => return Err(RecordError::UnknownField(key)),
            }
        }
        if !enabled {
            return Err(RecordError::MissingField("enabled"));
        }
        Ok(Self {
            applied_at: applied_at.ok_or(RecordError::MissingField("applied_at"))?,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn record() -> InstanceRecord {
        InstanceRecord {
            name: "demo".to_string(),
            template: "base".to_string(),
            image: "cabin/base:latest".to_string(),
            host_port: 40100,
            limits: ResourceLimits::default(),
            security: SecurityState::Enabled,
            created_at: "2026-03-01T10:00:00Z".parse().expect("timestamp"),
        }
    }

    #[test]
    fn instance_record_survives_render_and_parse() {
        let parsed = InstanceRecord::parse(&record().to_kv()).expect("parse");
        assert_eq!(parsed, record());
    }

    #[test]
    fn instance_record_rejects_unknown_field() {
        let mut text = record().to_kv();
        text.push_str("color=mauve\n");
        let err = InstanceRecord::parse(&text).expect_err("must fail");
        assert!(matches!(err, RecordError::UnknownField(k) if k == "color"));
    }

    #[test]
    fn instance_record_rejects_missing_host_port() {
        let text = "name=demo\ntemplate=base\nimage=i\ncreated_at=2026-03-01T10:00:00Z\n";
        let err = InstanceRecord::parse(text).expect_err("must fail");
        assert!(matches!(err, RecordError::MissingField("host_port")));
    }

    #[test]
    fn instance_record_rejects_bad_port_value() {
        let text = record().to_kv().replace("40100", "70000");
        let err = InstanceRecord::parse(&text).expect_err("must fail");
        assert!(matches!(
            err,
            RecordError::InvalidValue {
                field: "host_port",
                ..
            }
        ));
    }

    #[test]
    fn credential_debug_does_not_leak_password() {
        let cred = Credential {
            password: "hunter2".to_string(),
        };
        let rendered = format!("{cred:?}");
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn security_marker_requires_enabled_true() {
        let err =
            SecurityMarker::parse("enabled=false\napplied_at=2026-03-01T10:00:00Z\n")
                .expect_err("must fail");
        assert!(matches!(err, RecordError::InvalidValue { .. }));
    }

    #[test]
    fn security_marker_round_trips() {
        let marker = SecurityMarker {
            applied_at: "2026-03-01T10:00:00Z".parse().expect("timestamp"),
        };
        let parsed = SecurityMarker::parse(&marker.to_kv()).expect("parse");
        assert_eq!(parsed, marker);
    }
}
