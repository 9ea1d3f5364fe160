//! Core TargetStore implementation

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use eyre::{Context, Result, eyre};
use fs2::FileExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::record::{StatusRecord, TargetResource, TargetSnapshot, TargetStatus};
use crate::{STATUS_FILE, STATUS_LOCK_FILE, TARGETS_FILE};

/// Status map keyed by resource id
pub type StatusMap = BTreeMap<String, StatusRecord>;

/// Durable target list plus last-known status per target
///
/// Every public operation catches its own I/O and parse failures: writers
/// log and return `Err`, readers log and return an empty value.
#[derive(Debug, Clone)]
pub struct TargetStore {
    base_path: PathBuf,
}

impl TargetStore {
    /// Open or create a store at the given directory
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).context("Failed to create store directory")?;
        debug!(?base_path, "Opened target store");
        Ok(Self { base_path })
    }

    /// Directory backing this store
    pub fn path(&self) -> &Path {
        &self.base_path
    }

    fn targets_path(&self) -> PathBuf {
        self.base_path.join(TARGETS_FILE)
    }

    fn status_path(&self) -> PathBuf {
        self.base_path.join(STATUS_FILE)
    }

    fn lock_path(&self) -> PathBuf {
        self.base_path.join(STATUS_LOCK_FILE)
    }

    /// Replace the target snapshot with the given list
    pub fn save_targets(&self, targets: &[TargetResource]) -> Result<()> {
        debug!(count = targets.len(), "TargetStore::save_targets: called");
        let snapshot = TargetSnapshot::new(targets.to_vec());
        write_json_atomic(&self.targets_path(), &snapshot)
            .inspect(|_| debug!(count = targets.len(), path = %self.targets_path().display(), "Saved targets"))
            .inspect_err(|e| warn!(error = %e, "Failed to save targets"))
    }

    /// Load the saved snapshot, if any
    pub fn load_snapshot(&self) -> Option<TargetSnapshot> {
        debug!("TargetStore::load_snapshot: called");
        match read_json::<TargetSnapshot>(&self.targets_path()) {
            Ok(Some(snapshot)) => Some(snapshot),
            Ok(None) => {
                warn!(path = %self.targets_path().display(), "Target file does not exist");
                None
            }
            Err(e) => {
                warn!(error = %e, "Failed to load targets");
                None
            }
        }
    }

    /// Load the saved targets; empty when missing or unreadable
    pub fn load_targets(&self) -> Vec<TargetResource> {
        let targets = self.load_snapshot().map(|s| s.courses).unwrap_or_default();
        debug!(count = targets.len(), "Loaded targets");
        targets
    }

    /// Save an empty target list
    pub fn clear_targets(&self) -> Result<()> {
        debug!("TargetStore::clear_targets: called");
        self.save_targets(&[])
    }

    /// Upsert the status of one target
    ///
    /// Reads the whole map, replaces one entry and writes the map back while
    /// holding an exclusive lock, so concurrent writers never lose updates.
    pub fn update_status(&self, resource_id: &str, status: TargetStatus, message: &str) -> Result<()> {
        debug!(%resource_id, %status, "TargetStore::update_status: called");
        self.try_update_status(resource_id, status, message)
            .inspect(|_| debug!(%resource_id, %status, "Updated status"))
            .inspect_err(|e| warn!(%resource_id, error = %e, "Failed to update status"))
    }

    fn try_update_status(&self, resource_id: &str, status: TargetStatus, message: &str) -> Result<()> {
        let lock = self.lock_status(true)?;
        let mut statuses = read_json::<StatusMap>(&self.status_path())?.unwrap_or_default();
        statuses.insert(resource_id.to_string(), StatusRecord::now(status, message));
        write_json_atomic(&self.status_path(), &statuses)?;
        drop(lock);
        Ok(())
    }

    /// All known statuses; empty when missing or unreadable
    pub fn get_statuses(&self) -> StatusMap {
        debug!("TargetStore::get_statuses: called");
        let result = self
            .lock_status(false)
            .and_then(|_lock| read_json::<StatusMap>(&self.status_path()));
        match result {
            Ok(statuses) => statuses.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "Failed to read statuses");
                StatusMap::new()
            }
        }
    }

    /// Status of a single target
    pub fn get_status(&self, resource_id: &str) -> Option<StatusRecord> {
        self.get_statuses().remove(resource_id)
    }

    /// Delete the status map entirely
    pub fn clear_statuses(&self) -> Result<()> {
        debug!("TargetStore::clear_statuses: called");
        let result = self.lock_status(true).and_then(|_lock| {
            match fs::remove_file(self.status_path()) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e).context(format!("Failed to remove {}", self.status_path().display())),
            }
        });
        match result {
            Ok(()) => {
                info!("Cleared all statuses");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Failed to clear statuses");
                Err(e)
            }
        }
    }

    fn lock_status(&self, exclusive: bool) -> Result<File> {
        let lock_path = self.lock_path();
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .context(format!("Failed to open lock {}", lock_path.display()))?;
        let locked = if exclusive {
            FileExt::lock_exclusive(&lock_file)
        } else {
            FileExt::lock_shared(&lock_file)
        };
        locked.context(format!("Failed to lock {}", lock_path.display()))?;
        Ok(lock_file)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).context(format!("Failed to read {}", path.display())),
    };
    let value = serde_json::from_slice(&bytes).context(format!("Failed to parse {}", path.display()))?;
    Ok(Some(value))
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| eyre!("Path has no parent: {}", path.display()))?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .context(format!("Failed to create temp file in {}", parent.display()))?;
    serde_json::to_writer_pretty(tmp.as_file_mut(), value).context(format!("Failed to serialize {}", path.display()))?;
    tmp.as_file_mut().flush()?;
    tmp.as_file_mut().sync_all()?;
    tmp.persist(path)
        .map_err(|e| eyre!("Failed to persist {}: {}", path.display(), e.error))?;
    Ok(())
}
