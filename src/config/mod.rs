mod loader;
mod types;

pub use loader::ConfigError;
pub use types::{ClientConfig, Config, StorageBackend, StorageConfig, StoreConfig};
