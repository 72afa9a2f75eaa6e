//! Snapshot persistence for the entity store

use crate::core::{DbError, Result};
use crate::storage::memory::InMemoryStorage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

const SNAPSHOT_VERSION: u32 = 1;

// ============================================================================
// Database Snapshot
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSnapshot {
    pub version: u32,
    pub storage: InMemoryStorage,
    pub metadata: SnapshotMetadata,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub created_at: DateTime<Utc>,
    pub row_count: usize,
}

impl DatabaseSnapshot {
    pub fn new(storage: InMemoryStorage) -> Self {
        let row_count = storage.total_rows();
        Self {
            version: SNAPSHOT_VERSION,
            storage,
            metadata: SnapshotMetadata {
                created_at: Utc::now(),
                row_count,
            },
        }
    }
}

// ============================================================================
// Snapshot Manager
// ============================================================================

/// Writes the whole store to one MessagePack file. Writes go to a temporary
/// file in the same directory which is then renamed over the target, so a
/// crash never leaves a torn snapshot behind.
#[derive(Debug, Clone)]
pub struct SnapshotManager {
    snapshot_path: PathBuf,
}

impl SnapshotManager {
    pub fn new<P: AsRef<Path>>(snapshot_path: P) -> Self {
        Self {
            snapshot_path: snapshot_path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.snapshot_path
    }

    pub fn save(&self, storage: &InMemoryStorage) -> Result<()> {
        let dir = match self.snapshot_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)
            .map_err(|e| DbError::IoError(format!("Failed to create snapshot directory: {}", e)))?;

        let snapshot = DatabaseSnapshot::new(storage.clone());
        let serialized = rmp_serde::to_vec_named(&snapshot)
            .map_err(|e| DbError::Serialization(format!("Failed to serialize snapshot: {}", e)))?;

        let temp_file = NamedTempFile::new_in(&dir)
            .map_err(|e| DbError::IoError(format!("Failed to create temp file: {}", e)))?;
        let mut writer = BufWriter::new(temp_file);
        writer
            .write_all(&serialized)
            .map_err(|e| DbError::IoError(format!("Failed to write snapshot: {}", e)))?;
        let temp_file = writer
            .into_inner()
            .map_err(|e| DbError::IoError(format!("Failed to flush snapshot: {}", e)))?;
        temp_file
            .as_file()
            .sync_all()
            .map_err(|e| DbError::IoError(format!("Failed to sync snapshot: {}", e)))?;
        temp_file
            .persist(&self.snapshot_path)
            .map_err(|e| DbError::IoError(format!("Failed to replace snapshot: {}", e)))?;

        debug!(
            path = %self.snapshot_path.display(),
            rows = snapshot.metadata.row_count,
            bytes = serialized.len(),
            "snapshot written"
        );
        Ok(())
    }

    /// Loads the snapshot, or `None` when no snapshot file exists yet.
    pub fn load(&self) -> Result<Option<InMemoryStorage>> {
        if !self.snapshot_path.exists() {
            return Ok(None);
        }
        let file = fs::File::open(&self.snapshot_path)
            .map_err(|e| DbError::IoError(format!("Failed to open snapshot: {}", e)))?;
        let snapshot: DatabaseSnapshot = rmp_serde::from_read(BufReader::new(file))
            .map_err(|e| DbError::Serialization(format!("Failed to deserialize snapshot: {}", e)))?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(DbError::Serialization(format!(
                "Unsupported snapshot version {} (expected {})",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }

        info!(
            path = %self.snapshot_path.display(),
            rows = snapshot.metadata.row_count,
            created_at = %snapshot.metadata.created_at,
            "snapshot loaded"
        );
        Ok(Some(snapshot.storage))
    }
}
