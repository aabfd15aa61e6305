//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! tap, observer, relay, options server produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout via tracing-subscriber
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Structured fields, not formatted strings
//! - Observed request IDs flow from the tap into relay log lines
//! - Metric updates are no-ops until an exporter is installed

pub mod logging;
pub mod metrics;
