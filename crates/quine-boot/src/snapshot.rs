//! Snapshot and restore functionality.

use quine_core::{Corpus, Error, HistoryEntry, Result, SnapshotConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, warn};

/// Durable session state. The candidate kernel and its pending genome are
/// deliberately absent: a restored session boots the stable kernel and
/// re-derives everything else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub version: u32,
    pub timestamp: i64,
    pub stable_glob: String,
    pub generation: u64,
    pub retry_count: u32,
    pub attempt: u64,
    pub corpus: Corpus,
    pub history: Vec<HistoryEntry>,
}

pub struct SnapshotManager {
    config: SnapshotConfig,
    snapshot_dir: PathBuf,
}

impl SnapshotManager {
    pub fn new(config: SnapshotConfig) -> Self {
        let snapshot_dir = PathBuf::from(&config.snapshot_dir);
        Self {
            config,
            snapshot_dir,
        }
    }

    pub fn config(&self) -> &SnapshotConfig {
        &self.config
    }

    /// Write a snapshot, then prune old ones down to the configured count.
    pub async fn save(&self, snapshot: &SessionSnapshot) -> Result<PathBuf> {
        fs::create_dir_all(&self.snapshot_dir)
            .await
            .map_err(|e| Error::Io(e))?;

        let bytes = bincode::serialize(snapshot)
            .map_err(|e| Error::Serialization(format!("Failed to serialize snapshot: {}", e)))?;

        let path = self
            .snapshot_dir
            .join(format!("snapshot_{}.bin", snapshot.timestamp));
        fs::write(&path, &bytes).await.map_err(|e| Error::Io(e))?;

        info!("Snapshot written to {:?}", path);

        self.cleanup_old().await?;
        Ok(path)
    }

    /// Restore from the newest snapshot file on disk.
    pub async fn restore_latest(&self) -> Result<SessionSnapshot> {
        if !self.snapshot_dir.exists() {
            warn!("No snapshot directory found");
            return Err(Error::NotFound("No snapshots found".to_string()));
        }

        let mut snapshots = self.scan_snapshots().await?;
        snapshots.sort_by(|a, b| b.1.cmp(&a.1));

        let (path, _) = snapshots
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound("No snapshot files found".to_string()))?;

        let bytes = fs::read(&path).await.map_err(|e| Error::Io(e))?;
        let snapshot: SessionSnapshot = bincode::deserialize(&bytes)
            .map_err(|e| Error::Serialization(format!("Failed to deserialize snapshot: {}", e)))?;

        info!(
            "Restored snapshot from {:?} (generation {})",
            path, snapshot.generation
        );
        Ok(snapshot)
    }

    /// Remove old snapshots, keeping only the most recent N.
    pub async fn cleanup_old(&self) -> Result<()> {
        if !self.snapshot_dir.exists() {
            return Ok(());
        }

        let mut snapshots = self.scan_snapshots().await?;
        if snapshots.len() <= self.config.keep_count {
            return Ok(());
        }

        // Sort by timestamp descending
        snapshots.sort_by(|a, b| b.1.cmp(&a.1));

        for (path, _) in snapshots.iter().skip(self.config.keep_count) {
            if let Err(e) = fs::remove_file(path).await {
                warn!("Failed to remove old snapshot {:?}: {}", path, e);
            } else {
                info!("Removed old snapshot: {:?}", path);
            }
        }

        Ok(())
    }

    /// Collect every `snapshot_<timestamp>.bin` in the snapshot directory.
    async fn scan_snapshots(&self) -> Result<Vec<(PathBuf, i64)>> {
        let mut entries = fs::read_dir(&self.snapshot_dir)
            .await
            .map_err(|e| Error::Io(e))?;

        let mut snapshots: Vec<(PathBuf, i64)> = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(|e| Error::Io(e))? {
            let path = entry.path();
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if let Some(timestamp_str) = name
                    .strip_prefix("snapshot_")
                    .and_then(|s| s.strip_suffix(".bin"))
                {
                    if let Ok(timestamp) = timestamp_str.parse::<i64>() {
                        snapshots.push((path, timestamp));
                    }
                }
            }
        }

        Ok(snapshots)
    }
}
