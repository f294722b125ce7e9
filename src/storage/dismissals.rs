use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use super::{KeyValueStore, StorageError};

/// Namespaced key holding the JSON array of dismissed campaign ids.
pub const DISMISSED_CAMPAIGNS_KEY: &str = "campaignkit:dismissed_campaigns";

/// Persistent set of campaign ids this device has dismissed.
#[derive(Clone)]
pub struct DismissalStore {
    kv: Arc<dyn KeyValueStore>,
    key: String,
}

impl DismissalStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self::with_key(kv, DISMISSED_CAMPAIGNS_KEY)
    }

    pub fn with_key(kv: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            kv,
            key: key.into(),
        }
    }

    /// Read the persisted set, reporting any failure.
    pub fn try_load(&self) -> Result<HashSet<String>, StorageError> {
        Ok(self.read()?.into_iter().collect())
    }

    /// Read the persisted set. A missing, unreadable or corrupt entry loads
    /// as the empty set.
    pub fn load(&self) -> HashSet<String> {
        match self.try_load() {
            Ok(set) => set,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Failed to load dismissed campaigns");
                HashSet::new()
            }
        }
    }

    /// Add `id` to the persisted set.
    pub fn dismiss(&self, id: &str) -> Result<(), StorageError> {
        // An unreadable entry is overwritten rather than blocking new dismissals.
        let mut ids = self.read().unwrap_or_default();
        if !ids.insert(id.to_string()) {
            return Ok(());
        }
        self.write(&ids)
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.kv.remove(&self.key)
    }

    fn read(&self) -> Result<BTreeSet<String>, StorageError> {
        match self.kv.get(&self.key)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(BTreeSet::new()),
        }
    }

    fn write(&self, ids: &BTreeSet<String>) -> Result<(), StorageError> {
        let raw = serde_json::to_string(ids)?;
        self.kv.set(&self.key, &raw)
    }
}
