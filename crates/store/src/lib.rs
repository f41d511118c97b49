//! Snapshot persistence for coordinator state.
//!
//! A snapshot is a single JSON document holding every resource, the latest
//! lock record per resource, and each resource's usage history. Writes go to
//! a sibling `.tmp` file that is then renamed over the target, so a crash
//! mid-write leaves the previous snapshot intact.

use std::path::{Path, PathBuf};

use chrono::Utc;
use holdfast_core::registry::SlotSnapshot;
use holdfast_core::resource::Resource;
use holdfast_core::types::Timestamp;
use serde::{Deserialize, Serialize};

/// Current on-disk format version.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Snapshot I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Snapshot encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported snapshot version {found} (expected {expected})")]
    Version { found: u32, expected: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub taken_at: Timestamp,
    pub resources: Vec<Resource>,
    pub slots: Vec<SlotSnapshot>,
}

impl Snapshot {
    pub fn new(resources: Vec<Resource>, slots: Vec<SlotSnapshot>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            taken_at: Utc::now(),
            resources,
            slots,
        }
    }
}

/// Reads and writes snapshots at a fixed path.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Atomically replace the snapshot on disk.
    pub async fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(snapshot)?;
        let tmp = self.tmp_path();

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|source| StoreError::Io {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|source| StoreError::Io {
                path: self.path.clone(),
                source,
            })?;

        tracing::debug!(
            path = %self.path.display(),
            resources = snapshot.resources.len(),
            slots = snapshot.slots.len(),
            bytes = bytes.len(),
            "Snapshot written",
        );
        Ok(())
    }

    /// Load the snapshot, or `None` if no file exists yet.
    pub async fn load(&self) -> Result<Option<Snapshot>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "No snapshot found, starting empty");
                return Ok(None);
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(StoreError::Version {
                found: snapshot.version,
                expected: SNAPSHOT_VERSION,
            });
        }

        tracing::info!(
            path = %self.path.display(),
            resources = snapshot.resources.len(),
            slots = snapshot.slots.len(),
            taken_at = %snapshot.taken_at,
            "Snapshot loaded",
        );
        Ok(Some(snapshot))
    }
}
