//! Header Relay subsystem.
//!
//! # Data Flow
//! ```text
//! observed header sequence
//!     → HeaderMapping (last value wins, original order)
//!     → DestinationSetting::read_destination (default when unset)
//!     → GET <destination> with the mapping as headers, no body
//!     → any response          → StatusSink::report_success
//!     → network-level failure → StatusSink::report_failure
//! ```
//!
//! # Design Decisions
//! - One attempt per observed request: no retry, no timeout beyond the
//!   client's defaults
//! - Response status is ignored; reaching the destination is success
//! - Relays are independent tasks and are never cancelled
//! - The client bypasses system proxies so relays never loop through the tap

pub mod status;

use std::sync::Arc;
use std::time::Instant;

use axum::http::StatusCode;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::headers::{HeaderEntry, HeaderMapping, InvalidHeader};
use crate::observability::metrics;
use crate::settings::DestinationSetting;

pub use status::{RelayStatus, StatusIndicator, StatusSink};

/// Delivery failure: the only way a relay can fail.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error(transparent)]
    InvalidHeader(#[from] InvalidHeader),
    #[error("delivery to {destination} failed: {source}")]
    Delivery {
        destination: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Forwards captured headers to the Destination Setting.
pub struct HeaderRelay {
    client: reqwest::Client,
    destination: DestinationSetting,
    status: Arc<dyn StatusSink>,
}

impl HeaderRelay {
    pub fn new(destination: DestinationSetting, status: Arc<dyn StatusSink>) -> Self {
        let client = reqwest::Client::builder()
            .no_proxy()
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to default relay client");
                reqwest::Client::new()
            });
        Self::with_client(client, destination, status)
    }

    pub fn with_client(
        client: reqwest::Client,
        destination: DestinationSetting,
        status: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            client,
            destination,
            status,
        }
    }

    pub fn destination(&self) -> &DestinationSetting {
        &self.destination
    }

    /// Relay one header sequence and report the outcome to the status sink.
    ///
    /// Returns the destination's response status on success.
    pub async fn relay(&self, headers: &[HeaderEntry]) -> Result<StatusCode, RelayError> {
        self.relay_with_id(Uuid::new_v4(), headers).await
    }

    /// Fire-and-forget form of [`HeaderRelay::relay`]. The handle exists for
    /// callers that want to wait; dropping it does not cancel the relay.
    pub fn spawn(
        self: &Arc<Self>,
        request_id: Uuid,
        headers: Vec<HeaderEntry>,
    ) -> JoinHandle<Result<StatusCode, RelayError>> {
        let relay = Arc::clone(self);
        tokio::spawn(async move { relay.relay_with_id(request_id, &headers).await })
    }

    async fn relay_with_id(
        &self,
        request_id: Uuid,
        headers: &[HeaderEntry],
    ) -> Result<StatusCode, RelayError> {
        let start = Instant::now();
        let mapping = HeaderMapping::from_entries(headers);
        let destination = self.destination.read_destination().await;

        match self.deliver(&mapping, &destination).await {
            Ok(status) => {
                tracing::debug!(
                    request_id = %request_id,
                    destination = %destination,
                    headers = mapping.len(),
                    status = %status,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Headers relayed"
                );
                metrics::record_relay(true, start);
                self.status.report_success();
                Ok(status)
            }
            Err(e) => {
                tracing::warn!(
                    request_id = %request_id,
                    destination = %destination,
                    error = %e,
                    "Header relay failed"
                );
                metrics::record_relay(false, start);
                self.status.report_failure();
                Err(e)
            }
        }
    }

    async fn deliver(
        &self,
        mapping: &HeaderMapping,
        destination: &str,
    ) -> Result<StatusCode, RelayError> {
        let headers = mapping.to_header_map()?;
        let response = self
            .client
            .get(destination)
            .headers(headers)
            .send()
            .await
            .map_err(|source| RelayError::Delivery {
                destination: destination.to_string(),
                source,
            })?;
        Ok(response.status())
    }
}

impl std::fmt::Debug for HeaderRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeaderRelay")
            .field("destination", &self.destination)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{destination::DEFAULT_DESTINATION, MemoryStore};

    fn memory_relay() -> (HeaderRelay, Arc<StatusIndicator>, DestinationSetting) {
        let destination = DestinationSetting::new(Arc::new(MemoryStore::new()), DEFAULT_DESTINATION);
        let indicator = Arc::new(StatusIndicator::default());
        let relay = HeaderRelay::new(destination.clone(), indicator.clone());
        (relay, indicator, destination)
    }

    #[tokio::test]
    async fn test_malformed_destination_reports_failure() {
        let (relay, indicator, destination) = memory_relay();
        destination.write_destination("not a url").await.unwrap();

        let result = relay.relay(&[HeaderEntry::new("accept", "*/*")]).await;
        assert!(matches!(result, Err(RelayError::Delivery { .. })));
        assert_eq!(indicator.status(), RelayStatus::Failure);
    }

    #[tokio::test]
    async fn test_unencodable_header_reports_failure() {
        let (relay, indicator, _) = memory_relay();

        let result = relay.relay(&[HeaderEntry::new("bad name", "x")]).await;
        assert!(matches!(result, Err(RelayError::InvalidHeader(_))));
        assert_eq!(indicator.status(), RelayStatus::Failure);
    }
}
