//! Resume-state persistence, keyed by (owner id, item id).
//!
//! A checkpoint records which stages completed, per-stage result metadata,
//! and a snapshot of the run context. It is overwritten after every
//! sequential stage and after every group, and deleted only on full
//! pipeline success. Stale checkpoints past the retention window are
//! treated as absent.

mod file;

pub use file::FileCheckpointStore;

use crate::errors::PipelineError;
use crate::stages::StageResult;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Default retention window: 72 hours.
pub const DEFAULT_RETENTION_SECONDS: f64 = 72.0 * 3600.0;

fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Persisted resume state for one (owner, item) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Ids of stages that completed (or were legitimately skipped).
    pub completed_stages: Vec<String>,
    /// Per-stage result metadata, for diagnostics.
    #[serde(default)]
    pub stage_data: HashMap<String, StageResult>,
    /// Serialized run context at last save.
    pub context: serde_json::Value,
    /// Unix timestamp of the last save.
    pub updated_at: f64,
}

impl Checkpoint {
    /// Creates a checkpoint stamped with the current time.
    #[must_use]
    pub fn new(
        completed_stages: Vec<String>,
        stage_data: HashMap<String, StageResult>,
        context: serde_json::Value,
    ) -> Self {
        Self {
            completed_stages,
            stage_data,
            context,
            updated_at: unix_now(),
        }
    }

    /// Age of the checkpoint in seconds.
    #[must_use]
    pub fn age_seconds(&self) -> f64 {
        (unix_now() - self.updated_at).max(0.0)
    }

    /// Returns true if the checkpoint is older than the retention window.
    #[must_use]
    pub fn is_expired(&self, retention_seconds: f64) -> bool {
        self.age_seconds() >= retention_seconds
    }
}

/// A listed checkpoint together with its composite key.
#[derive(Debug, Clone)]
pub struct CheckpointEntry {
    /// The owning campaign id.
    pub owner_id: String,
    /// The source item id.
    pub item_id: String,
    /// The checkpoint itself.
    pub checkpoint: Checkpoint,
}

/// Durable key-value persistence for checkpoints.
///
/// One (owner, item) pair must never have two concurrent runs saving
/// simultaneously; ensuring single ownership per item is the caller's
/// responsibility, not the store's.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Overwrites the checkpoint for (owner, item).
    async fn save(
        &self,
        owner_id: &str,
        item_id: &str,
        checkpoint: Checkpoint,
    ) -> Result<(), PipelineError>;

    /// Loads the most recent checkpoint, or `None` if absent or expired.
    async fn load(&self, owner_id: &str, item_id: &str)
        -> Result<Option<Checkpoint>, PipelineError>;

    /// Removes the checkpoint. Called exactly once, on full success.
    async fn clear(&self, owner_id: &str, item_id: &str) -> Result<(), PipelineError>;

    /// Lists every stored checkpoint, including expired ones.
    async fn list(&self) -> Result<Vec<CheckpointEntry>, PipelineError>;

    /// Removes checkpoints older than `max_age_seconds`; returns the
    /// number removed.
    async fn clear_expired(&self, max_age_seconds: f64) -> Result<usize, PipelineError>;
}

/// In-memory checkpoint store, for tests and single-process embedding.
#[derive(Debug)]
pub struct InMemoryCheckpointStore {
    entries: Mutex<HashMap<(String, String), Checkpoint>>,
    retention_seconds: f64,
}

impl Default for InMemoryCheckpointStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCheckpointStore {
    /// Creates a store with the default retention window.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            retention_seconds: DEFAULT_RETENTION_SECONDS,
        }
    }

    /// Sets the retention window.
    #[must_use]
    pub fn with_retention_seconds(mut self, retention_seconds: f64) -> Self {
        self.retention_seconds = retention_seconds;
        self
    }

    /// Returns the number of stored checkpoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if the store holds no checkpoints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn save(
        &self,
        owner_id: &str,
        item_id: &str,
        checkpoint: Checkpoint,
    ) -> Result<(), PipelineError> {
        self.entries
            .lock()
            .insert((owner_id.to_string(), item_id.to_string()), checkpoint);
        Ok(())
    }

    async fn load(
        &self,
        owner_id: &str,
        item_id: &str,
    ) -> Result<Option<Checkpoint>, PipelineError> {
        let key = (owner_id.to_string(), item_id.to_string());
        let mut entries = self.entries.lock();

        if let Some(checkpoint) = entries.get(&key) {
            if checkpoint.is_expired(self.retention_seconds) {
                entries.remove(&key);
                return Ok(None);
            }
            return Ok(Some(checkpoint.clone()));
        }
        Ok(None)
    }

    async fn clear(&self, owner_id: &str, item_id: &str) -> Result<(), PipelineError> {
        self.entries
            .lock()
            .remove(&(owner_id.to_string(), item_id.to_string()));
        Ok(())
    }

    async fn list(&self) -> Result<Vec<CheckpointEntry>, PipelineError> {
        Ok(self
            .entries
            .lock()
            .iter()
            .map(|((owner_id, item_id), checkpoint)| CheckpointEntry {
                owner_id: owner_id.clone(),
                item_id: item_id.clone(),
                checkpoint: checkpoint.clone(),
            })
            .collect())
    }

    async fn clear_expired(&self, max_age_seconds: f64) -> Result<usize, PipelineError> {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, checkpoint| !checkpoint.is_expired(max_age_seconds));
        Ok(before - entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkpoint(stages: &[&str]) -> Checkpoint {
        Checkpoint::new(
            stages.iter().map(ToString::to_string).collect(),
            HashMap::new(),
            serde_json::json!({}),
        )
    }

    #[tokio::test]
    async fn test_save_load_clear() {
        let store = InMemoryCheckpointStore::new();

        assert!(store.load("c1", "i1").await.unwrap().is_none());

        store.save("c1", "i1", checkpoint(&["a", "b"])).await.unwrap();
        let loaded = store.load("c1", "i1").await.unwrap().unwrap();
        assert_eq!(loaded.completed_stages, vec!["a", "b"]);

        store.clear("c1", "i1").await.unwrap();
        assert!(store.load("c1", "i1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let store = InMemoryCheckpointStore::new();
        store.save("c1", "i1", checkpoint(&["a"])).await.unwrap();
        store.save("c1", "i1", checkpoint(&["a", "b"])).await.unwrap();

        let loaded = store.load("c1", "i1").await.unwrap().unwrap();
        assert_eq!(loaded.completed_stages.len(), 2);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_keys_are_isolated() {
        let store = InMemoryCheckpointStore::new();
        store.save("c1", "i1", checkpoint(&["a"])).await.unwrap();
        store.save("c1", "i2", checkpoint(&["b"])).await.unwrap();

        let loaded = store.load("c1", "i2").await.unwrap().unwrap();
        assert_eq!(loaded.completed_stages, vec!["b"]);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_expired_checkpoint_not_loaded() {
        let store = InMemoryCheckpointStore::new();
        let mut stale = checkpoint(&["a"]);
        stale.updated_at = 0.0;
        store.save("c1", "i1", stale).await.unwrap();

        assert!(store.load("c1", "i1").await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_clear_expired() {
        let store = InMemoryCheckpointStore::new();
        let mut stale = checkpoint(&["a"]);
        stale.updated_at = 0.0;
        store.save("c1", "stale", stale).await.unwrap();
        store.save("c1", "fresh", checkpoint(&["b"])).await.unwrap();

        let removed = store.clear_expired(3600.0).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);
        assert!(store.load("c1", "fresh").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_list() {
        let store = InMemoryCheckpointStore::new();
        store.save("c1", "i1", checkpoint(&["a"])).await.unwrap();
        store.save("c2", "i9", checkpoint(&["b"])).await.unwrap();

        let mut entries = store.list().await.unwrap();
        entries.sort_by(|a, b| a.owner_id.cmp(&b.owner_id));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].owner_id, "c1");
        assert_eq!(entries[1].item_id, "i9");
    }

    #[test]
    fn test_checkpoint_expiry_math() {
        let fresh = checkpoint(&[]);
        assert!(!fresh.is_expired(60.0));

        let mut stale = checkpoint(&[]);
        stale.updated_at -= 120.0;
        assert!(stale.is_expired(60.0));
        assert!(stale.age_seconds() >= 120.0);
    }
}
