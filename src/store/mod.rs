//! File-backed campaign store and its HTTP front end.
//!
//! The whole collection is one JSON array on disk, rewritten on every
//! write. There is no versioning: the last write wins.

mod error;
mod health;
mod server;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use crate::campaign::Campaign;

pub use error::StoreError;
pub use health::HealthStatus;
pub use server::{build_router, StoreServer};

#[derive(Clone)]
pub struct CampaignStore {
    inner: Arc<RwLock<Vec<Campaign>>>,
    path: PathBuf,
}

impl CampaignStore {
    /// Open the store at `path`. A missing file starts an empty collection.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let campaigns = match fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => Vec::new(),
            Ok(content) => {
                serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
                    path: path.clone(),
                    source,
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        tracing::info!(path = %path.display(), count = campaigns.len(), "Campaign store opened");
        Ok(Self {
            inner: Arc::new(RwLock::new(campaigns)),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn list(&self) -> Vec<Campaign> {
        self.inner.read().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn get(&self, id: &str) -> Result<Campaign, StoreError> {
        self.inner
            .read()
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    /// Append a new campaign. Ids must be unique.
    pub fn create(&self, campaign: Campaign) -> Result<Campaign, StoreError> {
        let mut campaigns = self.inner.write();
        if campaigns.iter().any(|c| c.id == campaign.id) {
            return Err(StoreError::DuplicateId { id: campaign.id });
        }
        let mut next = campaigns.clone();
        next.push(campaign.clone());
        self.persist(&next)?;
        *campaigns = next;
        tracing::info!(id = %campaign.id, kind = %campaign.kind(), "Campaign created");
        Ok(campaign)
    }

    /// Shallow-merge `patch` over the stored document.
    ///
    /// Top-level keys in `patch` replace the stored ones (so a `props` patch
    /// replaces the whole props object). The merged document must still be a
    /// valid campaign with the same id.
    pub fn update(&self, id: &str, patch: Value) -> Result<Campaign, StoreError> {
        let Value::Object(patch) = patch else {
            return Err(StoreError::InvalidCampaign(
                "update body must be a JSON object".to_string(),
            ));
        };

        let mut campaigns = self.inner.write();
        let index = campaigns
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| not_found(id))?;

        let mut merged = match serde_json::to_value(&campaigns[index]) {
            Ok(Value::Object(map)) => map,
            Ok(_) => return Err(StoreError::Internal("campaign did not serialize to an object".to_string())),
            Err(e) => return Err(StoreError::Internal(e.to_string())),
        };
        merged.extend(patch);

        let updated: Campaign = serde_json::from_value(Value::Object(merged))
            .map_err(|e| StoreError::InvalidCampaign(e.to_string()))?;
        if updated.id != id {
            return Err(StoreError::InvalidCampaign(
                "campaign id cannot be changed".to_string(),
            ));
        }

        let mut next = campaigns.clone();
        next[index] = updated.clone();
        self.persist(&next)?;
        *campaigns = next;
        tracing::info!(id, "Campaign updated");
        Ok(updated)
    }

    pub fn delete(&self, id: &str) -> Result<Campaign, StoreError> {
        let mut campaigns = self.inner.write();
        let index = campaigns
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| not_found(id))?;
        let mut next = campaigns.clone();
        let removed = next.remove(index);
        self.persist(&next)?;
        *campaigns = next;
        tracing::info!(id, "Campaign deleted");
        Ok(removed)
    }

    /// Replace the data file with `campaigns`: write a sibling temp file,
    /// then rename over the original.
    fn persist(&self, campaigns: &[Campaign]) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }
        let json = serde_json::to_string_pretty(campaigns)
            .map_err(|e| StoreError::Internal(e.to_string()))?;

        let tmp_path = self.path.with_extension("json.tmp");
        let mut tmp = fs::File::create(&tmp_path).map_err(io_err)?;
        tmp.write_all(json.as_bytes()).map_err(io_err)?;
        tmp.sync_all().map_err(io_err)?;
        fs::rename(&tmp_path, &self.path).map_err(io_err)
    }
}

fn not_found(id: &str) -> StoreError {
    StoreError::NotFound { id: id.to_string() }
}
