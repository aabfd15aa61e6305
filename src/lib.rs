//! Header relay: observe requests through a local tap proxy and forward the
//! headers of matching ones to a configurable destination.

pub mod config;
pub mod headers;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod observer;
pub mod options;
pub mod relay;
pub mod settings;
pub mod sink;

pub use config::schema::RelayConfig;
pub use headers::{HeaderEntry, HeaderMapping};
pub use lifecycle::{RelayApp, Shutdown};
pub use observer::{ObservedRequest, RequestObserver, UrlFilter};
pub use relay::{HeaderRelay, RelayError, RelayStatus, StatusIndicator, StatusSink};
pub use settings::{DestinationSetting, SettingsStore};
