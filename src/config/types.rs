use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// Settings for the polling SDK and the admin client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Campaign list endpoint (e.g., "http://127.0.0.1:3001/campaigns").
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Seconds between polls (default: 5).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
}

/// Where dismissed campaign ids are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// JSON document on disk.
    #[default]
    File,
    /// Process memory only; nothing survives a restart.
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Storage document path, used by the `file` backend.
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

/// Settings for the campaign store service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Bind address for the HTTP server (host:port).
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// JSON file holding the campaign list.
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,
}

fn default_endpoint() -> String {
    "http://127.0.0.1:3001/campaigns".to_string()
}

fn default_poll_interval() -> u64 {
    5
}

fn default_bind_addr() -> String {
    "127.0.0.1:3001".to_string()
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("campaignkit")
}

fn default_storage_path() -> PathBuf {
    data_dir().join("storage.json")
}

fn default_data_file() -> PathBuf {
    data_dir().join("campaigns.json")
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            poll_interval_seconds: default_poll_interval(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_storage_path(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            data_file: default_data_file(),
        }
    }
}
