//! Snapshot Persistence
//!
//! Saves every partition to a JSON file and restores it on the next start.
//! Writes go to a temporary sibling first and are renamed into place.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cache::{Partition, PartitionStore, ResponseSnapshot};
use crate::error::{AgentError, Result};

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
    partitions: Vec<StoredPartition>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredPartition {
    name: String,
    /// Oldest write first
    entries: Vec<StoredEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    key: String,
    response: ResponseSnapshot,
}

/// Writes all partitions to `path`. Returns the number of entries written.
pub async fn save(store: &PartitionStore, path: &Path) -> Result<usize> {
    let mut partitions = Vec::new();
    let mut total = 0;

    for handle in store.handles().await {
        let entries: Vec<StoredEntry> = handle
            .entries()
            .await
            .into_iter()
            .map(|(key, response)| StoredEntry { key, response })
            .collect();
        total += entries.len();
        partitions.push(StoredPartition {
            name: handle.name().to_string(),
            entries,
        });
    }

    let serialized = serde_json::to_vec(&SnapshotFile { partitions })
        .map_err(|e| AgentError::Persistence(format!("failed to serialize snapshot: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AgentError::Persistence(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }
    }

    let temp_path = path.with_extension(format!("json.{}.tmp", std::process::id()));
    tokio::fs::write(&temp_path, &serialized)
        .await
        .map_err(|e| AgentError::Persistence(format!("failed to write {}: {}", temp_path.display(), e)))?;
    tokio::fs::rename(&temp_path, path)
        .await
        .map_err(|e| AgentError::Persistence(format!("failed to replace {}: {}", path.display(), e)))?;

    info!(path = %path.display(), entries = total, "cache snapshot saved");
    Ok(total)
}

/// Restores partitions from `path`. A missing file restores nothing.
pub async fn load(store: &PartitionStore, path: &Path) -> Result<usize> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no cache snapshot to restore");
            return Ok(0);
        }
        Err(e) => {
            return Err(AgentError::Persistence(format!(
                "failed to read {}: {}",
                path.display(),
                e
            )))
        }
    };

    let file: SnapshotFile = serde_json::from_slice(&bytes)
        .map_err(|e| AgentError::Persistence(format!("failed to parse {}: {}", path.display(), e)))?;

    let mut total = 0;
    for stored in file.partitions {
        total += stored.entries.len();
        let partition = Partition::from_entries(
            stored.name,
            stored.entries.into_iter().map(|e| (e.key, e.response)),
        );
        store.restore(partition).await;
    }

    info!(path = %path.display(), entries = total, "cache snapshot restored");
    Ok(total)
}
