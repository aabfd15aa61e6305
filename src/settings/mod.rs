//! Persistent key-value settings.
//!
//! # Data Flow
//! ```text
//! options page save / relay-cli set-destination
//!     → DestinationSetting::write_destination
//!     → SettingsStore::set("url", ..)
//!
//! every relay / options page load
//!     → DestinationSetting::read_destination
//!     → SettingsStore::get("url") or the compiled-in default
//! ```
//!
//! # Design Decisions
//! - The store is a trait object so tests can inject an in-memory double
//! - Values are plain strings; the store knows nothing about URLs

pub mod destination;
pub mod file;

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

pub use destination::{DestinationSetting, SaveNotice, DESTINATION_KEY};
pub use file::FileStore;

/// Error type for settings storage.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("settings I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings file is not a JSON object of strings: {0}")]
    Format(#[from] serde_json::Error),
}

/// Async key-value storage for string settings.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Stored value for `key`, or `default` when unset.
    async fn get_or(&self, key: &str, default: &str) -> Result<String, StoreError> {
        Ok(self.get(key).await?.unwrap_or_else(|| default.to_string()))
    }
}

/// Process-local store, lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.write().insert(key.to_string(), value.to_string());
        Ok(())
    }
}
