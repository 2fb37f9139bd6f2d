//! Directory-of-JSON-files checkpoint store.

use super::{Checkpoint, CheckpointEntry, CheckpointStore, DEFAULT_RETENTION_SECONDS};
use crate::errors::PipelineError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// On-disk record: the checkpoint plus its composite key, so `list` can
/// recover keys without parsing file names.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRecord {
    owner_id: String,
    item_id: String,
    checkpoint: Checkpoint,
}

fn sanitize_component(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

/// A durable checkpoint store writing one JSON file per (owner, item) pair.
#[derive(Debug)]
pub struct FileCheckpointStore {
    dir: PathBuf,
    retention_seconds: f64,
}

impl FileCheckpointStore {
    /// Creates a store rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            retention_seconds: DEFAULT_RETENTION_SECONDS,
        })
    }

    /// Sets the retention window.
    #[must_use]
    pub fn with_retention_seconds(mut self, retention_seconds: f64) -> Self {
        self.retention_seconds = retention_seconds;
        self
    }

    fn path_for(&self, owner_id: &str, item_id: &str) -> PathBuf {
        self.dir.join(format!(
            "{}__{}.json",
            sanitize_component(owner_id),
            sanitize_component(item_id)
        ))
    }

    async fn read_record(path: &Path) -> Result<Option<StoredRecord>, PipelineError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn save(
        &self,
        owner_id: &str,
        item_id: &str,
        checkpoint: Checkpoint,
    ) -> Result<(), PipelineError> {
        let record = StoredRecord {
            owner_id: owner_id.to_string(),
            item_id: item_id.to_string(),
            checkpoint,
        };
        let bytes = serde_json::to_vec_pretty(&record)?;
        tokio::fs::write(self.path_for(owner_id, item_id), bytes).await?;
        Ok(())
    }

    async fn load(
        &self,
        owner_id: &str,
        item_id: &str,
    ) -> Result<Option<Checkpoint>, PipelineError> {
        let path = self.path_for(owner_id, item_id);
        let Some(record) = Self::read_record(&path).await? else {
            return Ok(None);
        };

        if record.checkpoint.is_expired(self.retention_seconds) {
            tokio::fs::remove_file(&path).await.ok();
            return Ok(None);
        }
        Ok(Some(record.checkpoint))
    }

    async fn clear(&self, owner_id: &str, item_id: &str) -> Result<(), PipelineError> {
        match tokio::fs::remove_file(self.path_for(owner_id, item_id)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn list(&self) -> Result<Vec<CheckpointEntry>, PipelineError> {
        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.dir).await?;

        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(record) = Self::read_record(&path).await? {
                entries.push(CheckpointEntry {
                    owner_id: record.owner_id,
                    item_id: record.item_id,
                    checkpoint: record.checkpoint,
                });
            }
        }
        Ok(entries)
    }

    async fn clear_expired(&self, max_age_seconds: f64) -> Result<usize, PipelineError> {
        let mut removed = 0;
        for entry in self.list().await? {
            if entry.checkpoint.is_expired(max_age_seconds) {
                self.clear(&entry.owner_id, &entry.item_id).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}
