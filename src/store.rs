//! Ordered key-value stores keyed by positive integer ids. A stored JSON `null` is a tombstone.

use crate::error::AppError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// Ordered key-value collaborator driven by a [`crate::model::Model`].
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, id: i64) -> Result<Option<Value>, AppError>;

    /// Returns false when the write did not take.
    async fn put(&self, id: i64, value: Value) -> Result<bool, AppError>;

    /// Returns false when nothing was removed.
    async fn remove(&self, id: i64) -> Result<bool, AppError>;

    /// Entries in `[start, end]` (inclusive), ascending. `end = None` scans to the last key.
    async fn range(&self, start: i64, end: Option<i64>) -> Result<Vec<(i64, Value)>, AppError>;

    /// The last `limit` entries, descending.
    async fn range_rev(&self, limit: usize) -> Result<Vec<(i64, Value)>, AppError>;

    /// Drops every entry and writes `entries` in one step. Returns false when
    /// the write did not take, leaving the previous contents in place.
    async fn replace_all(&self, entries: Vec<(i64, Value)>) -> Result<bool, AppError>;
}

fn scan(map: &BTreeMap<i64, Value>, start: i64, end: Option<i64>) -> Vec<(i64, Value)> {
    match end {
        Some(end) if end < start => Vec::new(),
        Some(end) => map.range(start..=end).map(|(k, v)| (*k, v.clone())).collect(),
        None => map.range(start..).map(|(k, v)| (*k, v.clone())).collect(),
    }
}

fn scan_rev(map: &BTreeMap<i64, Value>, limit: usize) -> Vec<(i64, Value)> {
    map.iter().rev().take(limit).map(|(k, v)| (*k, v.clone())).collect()
}

/// In-process store; contents are lost on shutdown.
#[derive(Default)]
pub struct MemoryStore {
    map: RwLock<BTreeMap<i64, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, id: i64) -> Result<Option<Value>, AppError> {
        Ok(self.map.read().await.get(&id).cloned())
    }

    async fn put(&self, id: i64, value: Value) -> Result<bool, AppError> {
        self.map.write().await.insert(id, value);
        Ok(true)
    }

    async fn remove(&self, id: i64) -> Result<bool, AppError> {
        Ok(self.map.write().await.remove(&id).is_some())
    }

    async fn range(&self, start: i64, end: Option<i64>) -> Result<Vec<(i64, Value)>, AppError> {
        Ok(scan(&*self.map.read().await, start, end))
    }

    async fn range_rev(&self, limit: usize) -> Result<Vec<(i64, Value)>, AppError> {
        Ok(scan_rev(&*self.map.read().await, limit))
    }

    async fn replace_all(&self, entries: Vec<(i64, Value)>) -> Result<bool, AppError> {
        *self.map.write().await = entries.into_iter().collect();
        Ok(true)
    }
}

/// Same map as [`MemoryStore`], persisted after every write as a JSON object
/// keyed by string-encoded ids.
pub struct JsonFileStore {
    path: PathBuf,
    map: RwLock<BTreeMap<i64, Value>>,
}

impl JsonFileStore {
    /// Loads `path` if it exists; a missing file is an empty store.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref().to_path_buf();
        let map = match tokio::fs::read(&path).await {
            Ok(bytes) => decode(&bytes).map_err(|e| {
                AppError::Internal(format!("store file {} is unreadable: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(AppError::Internal(format!(
                    "store file {} could not be opened: {}",
                    path.display(),
                    e
                )))
            }
        };
        tracing::debug!(path = %path.display(), entries = map.len(), "opened store");
        Ok(Self {
            path,
            map: RwLock::new(map),
        })
    }

    async fn persist(&self, map: &BTreeMap<i64, Value>) -> bool {
        let encoded: Map<String, Value> = map.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
        let bytes = match serde_json::to_vec(&encoded) {
            Ok(b) => b,
            Err(e) => {
                tracing::error!(path = %self.path.display(), error = %e, "store encode failed");
                return false;
            }
        };
        match tokio::fs::write(&self.path, bytes).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(path = %self.path.display(), error = %e, "store write failed");
                false
            }
        }
    }
}

fn decode(bytes: &[u8]) -> Result<BTreeMap<i64, Value>, String> {
    let raw: Map<String, Value> = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
    raw.into_iter()
        .map(|(k, v)| {
            k.parse::<i64>()
                .map(|id| (id, v))
                .map_err(|_| format!("key '{}' is not an integer id", k))
        })
        .collect()
}

#[async_trait]
impl KvStore for JsonFileStore {
    async fn get(&self, id: i64) -> Result<Option<Value>, AppError> {
        Ok(self.map.read().await.get(&id).cloned())
    }

    async fn put(&self, id: i64, value: Value) -> Result<bool, AppError> {
        let mut map = self.map.write().await;
        let previous = map.insert(id, value);
        if self.persist(&map).await {
            return Ok(true);
        }
        match previous {
            Some(v) => map.insert(id, v),
            None => map.remove(&id),
        };
        Ok(false)
    }

    async fn remove(&self, id: i64) -> Result<bool, AppError> {
        let mut map = self.map.write().await;
        let Some(previous) = map.remove(&id) else {
            return Ok(false);
        };
        if self.persist(&map).await {
            return Ok(true);
        }
        map.insert(id, previous);
        Ok(false)
    }

    async fn range(&self, start: i64, end: Option<i64>) -> Result<Vec<(i64, Value)>, AppError> {
        Ok(scan(&*self.map.read().await, start, end))
    }

    async fn range_rev(&self, limit: usize) -> Result<Vec<(i64, Value)>, AppError> {
        Ok(scan_rev(&*self.map.read().await, limit))
    }

    async fn replace_all(&self, entries: Vec<(i64, Value)>) -> Result<bool, AppError> {
        let mut map = self.map.write().await;
        let previous = std::mem::replace(&mut *map, entries.into_iter().collect());
        if self.persist(&map).await {
            return Ok(true);
        }
        *map = previous;
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn memory_range_is_inclusive_and_ordered() {
        let store = MemoryStore::new();
        for id in [3, 1, 2, 5] {
            store.put(id, json!({ "n": id })).await.unwrap();
        }
        let ids: Vec<i64> = store.range(2, Some(3)).await.unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(ids, vec![2, 3]);
        let ids: Vec<i64> = store.range(2, None).await.unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(ids, vec![2, 3, 5]);
        assert!(store.range(4, Some(2)).await.unwrap().is_empty());
        assert_eq!(store.range_rev(1).await.unwrap(), vec![(5, json!({ "n": 5 }))]);
    }

    #[tokio::test]
    async fn memory_remove_reports_absence() {
        let store = MemoryStore::new();
        store.put(1, Value::Null).await.unwrap();
        assert_eq!(store.get(1).await.unwrap(), Some(Value::Null));
        assert!(store.remove(1).await.unwrap());
        assert!(!store.remove(1).await.unwrap());
    }

    #[tokio::test]
    async fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.json");
        {
            let store = JsonFileStore::open(&path).await.unwrap();
            store.put(1, json!({ "eventID": 1 })).await.unwrap();
            store.put(2, Value::Null).await.unwrap();
            store.put(3, json!({ "eventID": 3 })).await.unwrap();
            store.remove(3).await.unwrap();
        }
        let store = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(store.get(1).await.unwrap(), Some(json!({ "eventID": 1 })));
        assert_eq!(store.get(2).await.unwrap(), Some(Value::Null));
        assert_eq!(store.get(3).await.unwrap(), None);

        assert!(store.replace_all(Vec::new()).await.unwrap());
        let store = JsonFileStore::open(&path).await.unwrap();
        assert!(store.range(1, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn replace_all_swaps_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.json");
        let store = JsonFileStore::open(&path).await.unwrap();
        store.put(9, json!({ "eventID": 9 })).await.unwrap();
        let entries = vec![(1, Value::Null), (2, json!({ "eventID": 2 }))];
        assert!(store.replace_all(entries.clone()).await.unwrap());
        assert_eq!(store.range(1, None).await.unwrap(), entries);

        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(reopened.range(1, None).await.unwrap(), entries);

        let memory = MemoryStore::new();
        memory.put(9, json!({})).await.unwrap();
        assert!(memory.replace_all(entries.clone()).await.unwrap());
        assert_eq!(memory.range(1, None).await.unwrap(), entries);
    }

    #[tokio::test]
    async fn failed_replace_keeps_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.json");
        let store = JsonFileStore::open(&path).await.unwrap();
        store.put(1, json!({ "eventID": 1 })).await.unwrap();
        drop(dir);
        assert!(!store.replace_all(vec![(2, json!({ "eventID": 2 }))]).await.unwrap());
        assert_eq!(store.get(1).await.unwrap(), Some(json!({ "eventID": 1 })));
        assert_eq!(store.get(2).await.unwrap(), None);
    }

    #[tokio::test]
    async fn file_store_rejects_non_integer_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        tokio::fs::write(&path, br#"{"one": {}}"#).await.unwrap();
        assert!(JsonFileStore::open(&path).await.is_err());
    }
}
