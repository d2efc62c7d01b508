//! Port-forward entries and the `bind:hostPort:containerPort` set format.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use thiserror::Error;

/// Errors produced while decoding forward entries or sets.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ForwardError {
    #[error("invalid forward '{0}': expected [bind:]hostPort:containerPort")]
    Malformed(String),

    #[error("invalid bind address '{0}'")]
    BadBind(String),

    #[error("invalid port '{0}': must be 1-65535")]
    BadPort(String),

    #[error("line {line}: duplicate host port {port} in forward set")]
    DuplicateHostPort { line: usize, port: u16 },
}

/// One declared TCP forward: listen on `bind:host_port`, relay to the
/// instance's `container_port`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortForward {
    pub bind: IpAddr,
    pub host_port: u16,
    pub container_port: u16,
}

fn parse_port(text: &str) -> Result<u16, ForwardError> {
    match text.parse::<u16>() {
        Ok(p) if p > 0 => Ok(p),
        _ => Err(ForwardError::BadPort(text.to_string())),
    }
}

impl FromStr for PortForward {
    type Err = ForwardError;

    /// Accepts `bind:hostPort:containerPort`; a two-part `hostPort:containerPort`
    /// defaults the bind address to `127.0.0.1`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let (bind, host, container) = match parts.as_slice() {
            [host, container] => ("127.0.0.1", *host, *container),
            [bind, host, container] => (*bind, *host, *container),
            _ => return Err(ForwardError::Malformed(s.to_string())),
        };
        Ok(Self {
            bind: bind
                .parse()
                .map_err(|_| ForwardError::BadBind(bind.to_string()))?,
            host_port: parse_port(host)?,
            container_port: parse_port(container)?,
        })
    }
}

impl fmt::Display for PortForward {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.bind, self.host_port, self.container_port)
    }
}

/// Parse a declared forward set, one entry per line.
///
/// # Errors
///
/// Returns an error on a malformed entry or a host port declared twice.
pub fn parse_set(text: &str) -> Result<Vec<PortForward>, ForwardError> {
    let mut set: Vec<PortForward> = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let entry: PortForward = trimmed.parse()?;
        if set.iter().any(|e| e.host_port == entry.host_port) {
            return Err(ForwardError::DuplicateHostPort {
                line: idx + 1,
                port: entry.host_port,
            });
        }
        set.push(entry);
    }
    Ok(set)
}

/// Render a forward set in its persisted line format.
#[must_use]
pub fn render_set(set: &[PortForward]) -> String {
    let mut out = String::new();
    for entry in set {
        out.push_str(&entry.to_string());
        out.push('\n');
    }
    out
}
