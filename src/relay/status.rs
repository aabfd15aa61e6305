//! Two-state status indicator.

use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;

use crate::observability::metrics;

/// Receives the outcome of every relay attempt.
pub trait StatusSink: Send + Sync {
    fn report_success(&self);
    fn report_failure(&self);
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayStatus {
    /// No relay has completed yet.
    Unknown = 0,
    Success = 1,
    Failure = 2,
}

impl From<u8> for RelayStatus {
    fn from(val: u8) -> Self {
        match val {
            1 => RelayStatus::Success,
            2 => RelayStatus::Failure,
            _ => RelayStatus::Unknown,
        }
    }
}

/// The indicator shown to the user: current state plus the icon for it.
///
/// Concurrent relays race on it; the last report wins.
#[derive(Debug)]
pub struct StatusIndicator {
    state: AtomicU8,
    success_icon: String,
    failure_icon: String,
}

impl StatusIndicator {
    pub fn new(success_icon: impl Into<String>, failure_icon: impl Into<String>) -> Self {
        Self {
            state: AtomicU8::new(RelayStatus::Unknown as u8),
            success_icon: success_icon.into(),
            failure_icon: failure_icon.into(),
        }
    }

    pub fn status(&self) -> RelayStatus {
        self.state.load(Ordering::Relaxed).into()
    }

    /// Icon for the current state; none until the first report.
    pub fn icon(&self) -> Option<&str> {
        match self.status() {
            RelayStatus::Unknown => None,
            RelayStatus::Success => Some(&self.success_icon),
            RelayStatus::Failure => Some(&self.failure_icon),
        }
    }

    fn set(&self, status: RelayStatus) {
        let previous: RelayStatus = self.state.swap(status as u8, Ordering::Relaxed).into();
        if previous != status {
            tracing::info!(from = ?previous, to = ?status, "Status indicator changed");
        }
        metrics::record_status(status);
    }
}

impl Default for StatusIndicator {
    fn default() -> Self {
        Self::new("images/green.png", "images/red.png")
    }
}

impl StatusSink for StatusIndicator {
    fn report_success(&self) {
        self.set(RelayStatus::Success);
    }

    fn report_failure(&self) {
        self.set(RelayStatus::Failure);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_report_wins() {
        let indicator = StatusIndicator::default();
        assert_eq!(indicator.status(), RelayStatus::Unknown);
        assert_eq!(indicator.icon(), None);

        indicator.report_failure();
        assert_eq!(indicator.status(), RelayStatus::Failure);
        assert_eq!(indicator.icon(), Some("images/red.png"));

        indicator.report_success();
        assert_eq!(indicator.status(), RelayStatus::Success);
        assert_eq!(indicator.icon(), Some("images/green.png"));
    }
}
