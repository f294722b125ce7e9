//! Local key-value persistence.
//!
//! The SDK only depends on the [`KeyValueStore`] capability. Which adapter
//! backs it (on-disk document or process memory) is decided when the SDK is
//! composed, see [`open_store`].

mod dismissals;
mod file;
mod memory;

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::config::{StorageBackend, StorageConfig};

pub use dismissals::{DismissalStore, DISMISSED_CAMPAIGNS_KEY};
pub use file::FileKeyValueStore;
pub use memory::MemoryKeyValueStore;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to read storage file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write storage file '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt storage document: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Storage task failed: {0}")]
    Task(String),
}

/// String key-value capability shared by all storage adapters.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Build the adapter selected by configuration.
pub fn open_store(config: &StorageConfig) -> Arc<dyn KeyValueStore> {
    match config.backend {
        StorageBackend::File => Arc::new(FileKeyValueStore::new(config.path.clone())),
        StorageBackend::Memory => Arc::new(MemoryKeyValueStore::new()),
    }
}
