//! Request Observer subsystem.
//!
//! # Data Flow
//! ```text
//! Tap receives request (method, url, headers)
//!     → ObservedRequest snapshot (headers in received order)
//!     → RequestObserver::dispatch
//!     → filter.rs / pattern.rs (does the URL match?)
//!     → every matching listener callback, in registration order
//! ```
//!
//! # Design Decisions
//! - Listeners are passive: they get a shared borrow and cannot alter or
//!   block the request
//! - Filters are compiled at startup and immutable afterwards
//! - Callbacks run outside the registry lock
//! - Duplicate registrations are allowed; each one fires

pub mod filter;
pub mod pattern;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::http::Method;
use parking_lot::RwLock;
use url::Url;
use uuid::Uuid;

use crate::headers::HeaderEntry;
use crate::observability::metrics;

pub use filter::UrlFilter;
pub use pattern::{MatchPattern, PatternError};

/// A request as seen by listeners, just before it leaves the tap.
#[derive(Debug, Clone)]
pub struct ObservedRequest {
    /// Correlates observer and relay log lines.
    pub id: Uuid,
    pub method: Method,
    pub url: Url,
    pub headers: Vec<HeaderEntry>,
}

impl ObservedRequest {
    pub fn new(method: Method, url: Url, headers: Vec<HeaderEntry>) -> Self {
        Self {
            id: Uuid::new_v4(),
            method,
            url,
            headers,
        }
    }
}

/// Handle returned by [`RequestObserver::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Callback = Arc<dyn Fn(&ObservedRequest) + Send + Sync>;

struct Registration {
    id: ListenerId,
    filter: UrlFilter,
    callback: Callback,
}

/// Registry of passive request listeners.
#[derive(Default)]
pub struct RequestObserver {
    listeners: RwLock<Vec<Registration>>,
    next_id: AtomicU64,
}

impl RequestObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for requests whose URL passes `filter`.
    pub fn add_listener<F>(&self, filter: UrlFilter, callback: F) -> ListenerId
    where
        F: Fn(&ObservedRequest) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(
            listener = id.0,
            patterns = ?filter.patterns().iter().map(|p| p.as_str()).collect::<Vec<_>>(),
            "Listener registered"
        );
        self.listeners.write().push(Registration {
            id,
            filter,
            callback: Arc::new(callback),
        });
        id
    }

    /// Unregister a listener. Returns false if it was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|r| r.id != id);
        listeners.len() != before
    }

    pub fn has_listeners(&self) -> bool {
        !self.listeners.read().is_empty()
    }

    /// Deliver `request` to every matching listener. Returns how many fired.
    pub fn dispatch(&self, request: &ObservedRequest) -> usize {
        let matched: Vec<Callback> = self
            .listeners
            .read()
            .iter()
            .filter(|r| r.filter.matches(&request.url))
            .map(|r| r.callback.clone())
            .collect();

        if matched.is_empty() {
            tracing::trace!(url = %request.url, "No listener matched");
            return 0;
        }

        tracing::debug!(
            request_id = %request.id,
            method = %request.method,
            url = %request.url,
            headers = request.headers.len(),
            listeners = matched.len(),
            "Request observed"
        );
        metrics::record_observed(matched.len());

        for callback in &matched {
            callback(request);
        }
        matched.len()
    }
}

impl std::fmt::Debug for RequestObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestObserver")
            .field("listeners", &self.listeners.read().len())
            .finish()
    }
}
