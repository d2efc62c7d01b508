//! Flat-file metadata store — one small record file per instance and per
//! concern, all keyed by instance name.
//!
//! Writes are atomic: the new content is serialized fully into a temp file
//! in the same directory, then renamed over the target. Loading a missing
//! file returns the empty value, never an error. Read-modify-write sequences
//! go through a per-name in-process mutex so two call sites in one process
//! cannot interleave a load-merge-save.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use cabin_common::{Credential, InstanceRecord, PortForward, SecurityMarker, forward};

use crate::domain::error::InstanceError;

const INSTANCE_EXT: &str = "instance";
const SECRET_EXT: &str = "secret";
const MARKER_EXT: &str = "hardened";
const FORWARDS_EXT: &str = "forwards";

/// Metadata store rooted at one state directory.
pub struct MetaStore {
    dir: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl MetaStore {
    /// Create a store over `dir`. The directory is created lazily on first
    /// write.
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// State directory this store persists into.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, name: &str, ext: &str) -> PathBuf {
        self.dir.join(format!("{name}.{ext}"))
    }

    fn name_lock(&self, name: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        locks.entry(name.to_string()).or_default().clone()
    }

    fn read_optional(&self, path: &Path) -> Result<Option<String>> {
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Ok(Some(text))
    }

    /// Serialize-then-rename; a crash mid-write never leaves a torn record.
    fn write_atomic(&self, path: &Path, content: &str, mode: Option<u32>) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating state dir {}", self.dir.display()))?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)
            .with_context(|| format!("creating temp file in {}", self.dir.display()))?;
        tmp.write_all(content.as_bytes())
            .with_context(|| format!("writing temp file for {}", path.display()))?;
        #[cfg(unix)]
        if let Some(mode) = mode {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(tmp.path(), std::fs::Permissions::from_mode(mode))
                .with_context(|| format!("setting permissions on {}", path.display()))?;
        }
        #[cfg(not(unix))]
        let _ = mode;
        tmp.persist(path)
            .with_context(|| format!("replacing {}", path.display()))?;
        Ok(())
    }

    fn delete(&self, path: &Path) -> Result<()> {
        if path.exists() {
            std::fs::remove_file(path).with_context(|| format!("removing {}", path.display()))?;
        }
        Ok(())
    }

    // ── Instance records ──────────────────────────────────────────────────────

    /// Load the instance record, `None` when the instance is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_instance(&self, name: &str) -> Result<Option<InstanceRecord>> {
        let path = self.path(name, INSTANCE_EXT);
        match self.read_optional(&path)? {
            Some(text) => Ok(Some(
                InstanceRecord::parse(&text)
                    .with_context(|| format!("parsing {}", path.display()))?,
            )),
            None => Ok(None),
        }
    }

    /// Persist an instance record atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the state directory or file cannot be written.
    pub fn save_instance(&self, record: &InstanceRecord) -> Result<()> {
        self.write_atomic(&self.path(&record.name, INSTANCE_EXT), &record.to_kv(), None)
    }

    /// Guarded load-merge-save of one instance record.
    ///
    /// # Errors
    ///
    /// Returns `InstanceError::NotFound` when no record exists, or an I/O
    /// error from load/save.
    pub fn update_instance(
        &self,
        name: &str,
        mutate: impl FnOnce(&mut InstanceRecord),
    ) -> Result<InstanceRecord> {
        let lock = self.name_lock(name);
        let _guard = lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut record = self
            .load_instance(name)?
            .ok_or_else(|| InstanceError::NotFound(name.to_string()))?;
        mutate(&mut record);
        self.save_instance(&record)?;
        Ok(record)
    }

    /// All known instance records, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be scanned or a record fails
    /// to parse.
    pub fn list_instances(&self) -> Result<Vec<InstanceRecord>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut records = Vec::new();
        for entry in std::fs::read_dir(&self.dir)
            .with_context(|| format!("scanning {}", self.dir.display()))?
        {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(INSTANCE_EXT)
                && let Some(text) = self.read_optional(&path)?
            {
                records.push(
                    InstanceRecord::parse(&text)
                        .with_context(|| format!("parsing {}", path.display()))?,
                );
            }
        }
        records.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(records)
    }

    // ── Credential records ────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_credential(&self, name: &str) -> Result<Option<Credential>> {
        let path = self.path(name, SECRET_EXT);
        match self.read_optional(&path)? {
            Some(text) => Ok(Some(
                Credential::parse(&text).with_context(|| format!("parsing {}", path.display()))?,
            )),
            None => Ok(None),
        }
    }

    /// Persist the credential with mode 0600 — it must never be readable by
    /// other accounts.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_credential(&self, name: &str, credential: &Credential) -> Result<()> {
        self.write_atomic(&self.path(name, SECRET_EXT), &credential.to_kv(), Some(0o600))
    }

    // ── Security markers ──────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_marker(&self, name: &str) -> Result<Option<SecurityMarker>> {
        let path = self.path(name, MARKER_EXT);
        match self.read_optional(&path)? {
            Some(text) => Ok(Some(
                SecurityMarker::parse(&text)
                    .with_context(|| format!("parsing {}", path.display()))?,
            )),
            None => Ok(None),
        }
    }

    /// Persist the marker. Written only after the hardening hook reported
    /// success.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_marker(&self, name: &str, marker: &SecurityMarker) -> Result<()> {
        self.write_atomic(&self.path(name, MARKER_EXT), &marker.to_kv(), None)
    }

    /// Remove the marker; missing marker is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn clear_marker(&self, name: &str) -> Result<()> {
        self.delete(&self.path(name, MARKER_EXT))
    }

    // ── Port-forward sets ─────────────────────────────────────────────────────

    /// Declared forward set; empty when none was ever declared.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_forwards(&self, name: &str) -> Result<Vec<PortForward>> {
        let path = self.path(name, FORWARDS_EXT);
        match self.read_optional(&path)? {
            Some(text) => {
                forward::parse_set(&text).with_context(|| format!("parsing {}", path.display()))
            }
            None => Ok(Vec::new()),
        }
    }

    /// Persist the whole declared set atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_forwards(&self, name: &str, set: &[PortForward]) -> Result<()> {
        self.write_atomic(&self.path(name, FORWARDS_EXT), &forward::render_set(set), None)
    }

    /// Guarded read-modify-write of the declared set. The mutation runs with
    /// the per-name lock held and must not perform I/O of its own.
    ///
    /// # Errors
    ///
    /// Propagates load/save errors and any error from `mutate`.
    pub fn update_forwards(
        &self,
        name: &str,
        mutate: impl FnOnce(&mut Vec<PortForward>) -> Result<()>,
    ) -> Result<Vec<PortForward>> {
        let lock = self.name_lock(name);
        let _guard = lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut set = self.load_forwards(name)?;
        mutate(&mut set)?;
        self.save_forwards(name, &set)?;
        Ok(set)
    }

    // ── Teardown ──────────────────────────────────────────────────────────────

    /// Delete every per-instance record. Used by instance removal; leaves no
    /// orphaned files behind.
    ///
    /// # Errors
    ///
    /// Returns an error if any existing file cannot be removed.
    pub fn remove_all(&self, name: &str) -> Result<()> {
        for ext in [INSTANCE_EXT, SECRET_EXT, MARKER_EXT, FORWARDS_EXT] {
            self.delete(&self.path(name, ext))?;
        }
        Ok(())
    }
}
