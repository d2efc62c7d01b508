//! Login credential generation.
//!
//! The primary source is the OS CSPRNG via `getrandom`. If that is
//! unavailable the generator falls back to a SHA-256 chain seeded from the
//! clock, the PID, and a process-local counter — deterministic machinery but
//! still unpredictable input. Every password must pass a character-class
//! diversity check before it is accepted.

use std::sync::atomic::{AtomicU64, Ordering};

use sha2::{Digest, Sha256};

/// Default generated password length.
pub const PASSWORD_LEN: usize = 20;

const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGIT: &[u8] = b"0123456789";
const SYMBOL: &[u8] = b"!@#%^*-_=+";

static FALLBACK_COUNTER: AtomicU64 = AtomicU64::new(0);

fn charset() -> Vec<u8> {
    let mut set = Vec::with_capacity(LOWER.len() + UPPER.len() + DIGIT.len() + SYMBOL.len());
    set.extend_from_slice(LOWER);
    set.extend_from_slice(UPPER);
    set.extend_from_slice(DIGIT);
    set.extend_from_slice(SYMBOL);
    set
}

/// A password is acceptable only with all four character classes present.
#[must_use]
pub fn has_class_diversity(password: &str) -> bool {
    let lower = password.bytes().any(|b| LOWER.contains(&b));
    let upper = password.bytes().any(|b| UPPER.contains(&b));
    let digit = password.bytes().any(|b| DIGIT.contains(&b));
    let symbol = password.bytes().any(|b| SYMBOL.contains(&b));
    lower && upper && digit && symbol
}

/// Generate a fresh login password of `len` characters.
///
/// Retries until the diversity check passes; falls back to the deterministic
/// generator when the OS entropy source is unavailable.
#[must_use]
pub fn generate_password(len: usize) -> String {
    let set = charset();
    // Rejection bound keeps byte→charset mapping unbiased.
    let bound = u8::try_from(256 % set.len()).map_or(0, |r| r.wrapping_neg());

    for _ in 0..64 {
        let mut raw = vec![0u8; len * 2];
        if getrandom::getrandom(&mut raw).is_err() {
            return fallback_password(len, &set);
        }
        let candidate: String = raw
            .iter()
            .filter(|&&b| bound == 0 || b < bound)
            .take(len)
            .map(|&b| char::from(set[usize::from(b) % set.len()]))
            .collect();
        if candidate.len() == len && has_class_diversity(&candidate) {
            return candidate;
        }
    }
    fallback_password(len, &set)
}

/// SHA-256 chain over clock, PID, and counter. Used only when `getrandom`
/// fails; never returns a password without class diversity.
fn fallback_password(len: usize, set: &[u8]) -> String {
    loop {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |d| d.as_nanos());
        let counter = FALLBACK_COUNTER.fetch_add(1, Ordering::Relaxed);

        let mut material = Vec::new();
        let mut hasher = Sha256::new();
        hasher.update(nanos.to_le_bytes());
        hasher.update(std::process::id().to_le_bytes());
        hasher.update(counter.to_le_bytes());
        let mut block = hasher.finalize();
        material.extend_from_slice(&block);
        while material.len() < len {
            let mut hasher = Sha256::new();
            hasher.update(block);
            block = hasher.finalize();
            material.extend_from_slice(&block);
        }

        let candidate: String = material
            .iter()
            .take(len)
            .map(|&b| char::from(set[usize::from(b) % set.len()]))
            .collect();
        if has_class_diversity(&candidate) {
            return candidate;
        }
    }
}
