//! Engagement State Store
//!
//! In-memory per-entity like state. This is the single source of truth the
//! UI reads from; every mutation goes through [`EngagementStore::update`] or
//! one of the helpers built on it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Like state for one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementRecord {
    pub entity_id: String,
    pub liked: bool,
    pub count: u64,
    pub loading: bool,
    pub error: Option<String>,
}

impl EngagementRecord {
    /// Zero record for an entity nobody has touched yet.
    pub fn empty(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            liked: false,
            count: 0,
            loading: false,
            error: None,
        }
    }

    pub fn new(entity_id: impl Into<String>, liked: bool, count: u64) -> Self {
        Self {
            liked,
            count,
            ..Self::empty(entity_id)
        }
    }

    fn apply(&mut self, patch: RecordPatch) {
        if let Some(liked) = patch.liked {
            self.liked = liked;
        }
        if let Some(count) = patch.count {
            self.count = count;
        }
        if let Some(loading) = patch.loading {
            self.loading = loading;
        }
        if let Some(error) = patch.error {
            self.error = error;
        }
    }
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordPatch {
    pub liked: Option<bool>,
    pub count: Option<u64>,
    pub loading: Option<bool>,
    /// `Some(None)` clears the error.
    pub error: Option<Option<String>>,
}

impl RecordPatch {
    /// Authoritative server state.
    pub fn settled(liked: bool, count: u64) -> Self {
        Self {
            liked: Some(liked),
            count: Some(count),
            loading: Some(false),
            error: Some(None),
        }
    }

    /// Terminal failure; liked/count keep their optimistic values.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            loading: Some(false),
            error: Some(Some(message.into())),
            ..Default::default()
        }
    }

    /// Back in the queue after an explicit retry.
    pub fn retrying() -> Self {
        Self {
            loading: Some(true),
            error: Some(None),
            ..Default::default()
        }
    }

    pub fn clear_error() -> Self {
        Self {
            error: Some(None),
            ..Default::default()
        }
    }
}

/// Per-entity record map.
#[derive(Debug, Default)]
pub struct EngagementStore {
    records: RwLock<HashMap<String, EngagementRecord>>,
}

impl EngagementStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current record, or a zero record if the entity is untracked.
    pub async fn get(&self, entity_id: &str) -> EngagementRecord {
        self.records
            .read()
            .await
            .get(entity_id)
            .cloned()
            .unwrap_or_else(|| EngagementRecord::empty(entity_id))
    }

    pub async fn contains(&self, entity_id: &str) -> bool {
        self.records.read().await.contains_key(entity_id)
    }

    /// Seed a record. Existing records (possibly mid-flight) are left alone.
    ///
    /// Returns `true` if the record was created.
    pub async fn init(&self, entity_id: &str, liked: bool, count: u64) -> bool {
        let mut records = self.records.write().await;
        if records.contains_key(entity_id) {
            return false;
        }
        records.insert(entity_id.to_string(), EngagementRecord::new(entity_id, liked, count));
        true
    }

    /// Merge a patch into the record, creating a zero record first if needed.
    pub async fn update(&self, entity_id: &str, patch: RecordPatch) -> EngagementRecord {
        let mut records = self.records.write().await;
        let record = records
            .entry(entity_id.to_string())
            .or_insert_with(|| EngagementRecord::empty(entity_id));
        record.apply(patch);
        record.clone()
    }

    /// Flip `liked` and move the count by one, saturating at zero.
    pub async fn apply_optimistic(&self, entity_id: &str) -> EngagementRecord {
        let mut records = self.records.write().await;
        let record = records
            .entry(entity_id.to_string())
            .or_insert_with(|| EngagementRecord::empty(entity_id));
        record.liked = !record.liked;
        record.count = if record.liked {
            record.count.saturating_add(1)
        } else {
            record.count.saturating_sub(1)
        };
        record.loading = true;
        record.error = None;
        record.clone()
    }

    /// Records that currently carry an error.
    pub async fn entries_with_errors(&self) -> Vec<EngagementRecord> {
        self.records
            .read()
            .await
            .values()
            .filter(|r| r.error.is_some())
            .cloned()
            .collect()
    }

    pub async fn snapshot(&self) -> Vec<EngagementRecord> {
        let mut records: Vec<_> = self.records.read().await.values().cloned().collect();
        records.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
        records
    }

    pub async fn remove(&self, entity_id: &str) -> Option<EngagementRecord> {
        self.records.write().await.remove(entity_id)
    }

    pub async fn clear(&self) {
        self.records.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_untracked_returns_zero_record() {
        let store = EngagementStore::new();
        let record = store.get("post-1").await;
        assert_eq!(record, EngagementRecord::empty("post-1"));
        assert!(!store.contains("post-1").await);
    }

    #[tokio::test]
    async fn test_init_does_not_clobber() {
        let store = EngagementStore::new();
        assert!(store.init("post-1", false, 10).await);
        store.apply_optimistic("post-1").await;

        // A re-render re-seeding with stale props must not undo the toggle
        assert!(!store.init("post-1", false, 10).await);
        let record = store.get("post-1").await;
        assert!(record.liked);
        assert_eq!(record.count, 11);
        assert!(record.loading);
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let store = EngagementStore::new();
        store.init("post-1", true, 4).await;

        let record = store.update("post-1", RecordPatch::failed("boom")).await;
        assert!(record.liked);
        assert_eq!(record.count, 4);
        assert!(!record.loading);
        assert_eq!(record.error.as_deref(), Some("boom"));
        assert_eq!(store.entries_with_errors().await.len(), 1);

        let record = store.update("post-1", RecordPatch::clear_error()).await;
        assert!(record.error.is_none());
        assert!(store.entries_with_errors().await.is_empty());
    }

    #[tokio::test]
    async fn test_optimistic_count_never_negative() {
        let store = EngagementStore::new();
        // Caller claims liked with a zero count; unliking must saturate
        store.init("post-1", true, 0).await;
        let record = store.apply_optimistic("post-1").await;
        assert!(!record.liked);
        assert_eq!(record.count, 0);

        let record = store.apply_optimistic("post-1").await;
        assert!(record.liked);
        assert_eq!(record.count, 1);
    }

    #[tokio::test]
    async fn test_settled_overrides_optimistic() {
        let store = EngagementStore::new();
        store.init("post-1", false, 10).await;
        store.apply_optimistic("post-1").await;

        let record = store.update("post-1", RecordPatch::settled(true, 14)).await;
        assert_eq!(record, EngagementRecord::new("post-1", true, 14));
    }

    #[tokio::test]
    async fn test_snapshot_and_clear() {
        let store = EngagementStore::new();
        store.init("b", false, 1).await;
        store.init("a", true, 2).await;

        let ids: Vec<_> = store.snapshot().await.into_iter().map(|r| r.entity_id).collect();
        assert_eq!(ids, vec!["a", "b"]);

        assert!(store.remove("a").await.is_some());
        assert_eq!(store.len().await, 1);
        store.clear().await;
        assert_eq!(store.len().await, 0);
    }
}
