//! Strict `key=value` line codec shared by every durable record.
//!
//! The on-disk heritage is shell-style config files, so blank lines and
//! `#` comments are tolerated. Anything else without a `=` separator is an
//! error — records must never be silently truncated by a bad line.

use thiserror::Error;

/// Errors produced while decoding a `key=value` record.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KvError {
    #[error("line {line}: missing '=' separator in '{text}'")]
    MissingSeparator { line: usize, text: String },

    #[error("line {line}: empty key")]
    EmptyKey { line: usize },

    #[error("line {line}: duplicate key '{key}'")]
    DuplicateKey { line: usize, key: String },
}

/// Parse `key=value` lines into ordered pairs.
///
/// The first `=` splits key from value, so values may contain `=`.
///
/// # Errors
///
/// Returns an error on a non-comment line without `=`, an empty key, or a
/// key that appears twice.
pub fn parse(text: &str) -> Result<Vec<(String, String)>, KvError> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let Some((key, value)) = trimmed.split_once('=') else {
            return Err(KvError::MissingSeparator {
                line,
                text: trimmed.to_string(),
            });
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(KvError::EmptyKey { line });
        }
        if pairs.iter().any(|(k, _)| k == key) {
            return Err(KvError::DuplicateKey {
                line,
                key: key.to_string(),
            });
        }
        pairs.push((key.to_string(), value.trim().to_string()));
    }
    Ok(pairs)
}

/// Render pairs as `key=value` lines with a trailing newline.
#[must_use]
pub fn render(pairs: &[(&str, &str)]) -> String {
    let mut out = String::new();
    for (key, value) in pairs {
        out.push_str(key);
        out.push('=');
        out.push_str(value);
        out.push('\n');
    }
    out
}
