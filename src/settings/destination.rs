//! The Destination Setting: where captured headers are relayed.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use super::{SettingsStore, StoreError};

/// Storage key of the destination URL.
pub const DESTINATION_KEY: &str = "url";

/// Canonical compiled-in destination.
pub const DEFAULT_DESTINATION: &str = "http://127.0.0.1:8080";

/// Defaults shipped by older builds. Still honored when stored, but logged.
pub const LEGACY_DEFAULT_DESTINATIONS: &[&str] = &["http://127.0.0.1:8080/"];

/// Confirmation shown after a save.
pub const SAVED_MESSAGE: &str = "Options saved.";

/// How long the confirmation stays visible.
pub const SAVED_MESSAGE_TTL: Duration = Duration::from_millis(750);

/// Transient, user-visible confirmation of a save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveNotice {
    pub message: &'static str,
    pub clear_after_ms: u64,
}

impl Default for SaveNotice {
    fn default() -> Self {
        Self {
            message: SAVED_MESSAGE,
            clear_after_ms: SAVED_MESSAGE_TTL.as_millis() as u64,
        }
    }
}

/// Accessors for the destination URL over a [`SettingsStore`].
#[derive(Clone)]
pub struct DestinationSetting {
    store: Arc<dyn SettingsStore>,
    default: String,
}

impl DestinationSetting {
    pub fn new(store: Arc<dyn SettingsStore>, default: impl Into<String>) -> Self {
        Self {
            store,
            default: default.into(),
        }
    }

    pub fn default_destination(&self) -> &str {
        &self.default
    }

    /// Current destination. Unset or empty values read as the default.
    pub async fn try_read_destination(&self) -> Result<String, StoreError> {
        let value = self.store.get_or(DESTINATION_KEY, &self.default).await?;
        if value.is_empty() {
            return Ok(self.default.clone());
        }
        if LEGACY_DEFAULT_DESTINATIONS.contains(&value.as_str()) {
            tracing::debug!(destination = %value, "Stored destination is a legacy default");
        }
        Ok(value)
    }

    /// Current destination; storage errors are logged and read as the default.
    pub async fn read_destination(&self) -> String {
        match self.try_read_destination().await {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(error = %e, default = %self.default, "Failed to read destination, using default");
                self.default.clone()
            }
        }
    }

    /// Persist a new destination and return the confirmation to show.
    pub async fn write_destination(&self, url: &str) -> Result<SaveNotice, StoreError> {
        self.store.set(DESTINATION_KEY, url).await?;
        tracing::info!(destination = %url, "Destination saved");
        Ok(SaveNotice::default())
    }
}

impl std::fmt::Debug for DestinationSetting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DestinationSetting")
            .field("default", &self.default)
            .finish_non_exhaustive()
    }
}
