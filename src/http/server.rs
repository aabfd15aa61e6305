//! Tap proxy server.
//!
//! # Responsibilities
//! - Build the Axum router for forwarded traffic
//! - Serve each accepted connection with hyper (HTTP/1.1, upgrades on)
//! - Route CONNECT around the router to the tunnel
//! - Stop accepting on shutdown, ask live connections to close, then drain

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{body::Body, http::Method, Router};
use hyper::{body::Incoming, server::conn::http1, Request};
use hyper_util::rt::TokioIo;
use tokio::sync::{broadcast, watch};
use tower::ServiceExt;
use tower_http::trace::TraceLayer;
use url::Url;

use crate::config::RelayConfig;
use crate::http::forward::{tap_handler, TapState};
use crate::http::tunnel::handle_connect;
use crate::net::{ConnectionTracker, Listener};
use crate::observer::RequestObserver;

/// How long shutdown waits for in-flight connections.
const DRAIN_DEADLINE: Duration = Duration::from_secs(5);

const ACCEPT_BACKOFF_BASE: Duration = Duration::from_millis(10);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Pause before retrying after `failures` consecutive accept errors.
pub fn accept_backoff(failures: u32) -> Duration {
    ACCEPT_BACKOFF_BASE
        .saturating_mul(1u32 << failures.saturating_sub(1).min(16))
        .min(ACCEPT_BACKOFF_MAX)
}

/// Error type for tap construction.
#[derive(Debug, thiserror::Error)]
pub enum TapError {
    #[error("invalid upstream URL `{0}`")]
    Upstream(String),
    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),
}

/// The tap: an HTTP proxy feeding the Request Observer.
pub struct TapServer {
    router: Router,
    tracker: ConnectionTracker,
}

impl TapServer {
    pub fn new(config: &RelayConfig, observer: Arc<RequestObserver>) -> Result<Self, TapError> {
        let upstream = config
            .listener
            .upstream
            .as_deref()
            .map(|u| Url::parse(u).map_err(|_| TapError::Upstream(u.to_string())))
            .transpose()?;

        let client = reqwest::Client::builder()
            .no_proxy()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .build()?;

        let state = Arc::new(TapState {
            observer,
            client,
            upstream,
            max_body_size: config.security.max_body_size,
        });

        Ok(Self {
            router: Self::build_router(state),
            tracker: ConnectionTracker::new(),
        })
    }

    fn build_router(state: Arc<TapState>) -> Router {
        Router::new()
            .fallback(tap_handler)
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// Live connection count.
    pub fn active_connections(&self) -> u64 {
        self.tracker.active_count()
    }

    /// Accept connections until `shutdown` fires.
    pub async fn run(self, listener: Listener, mut shutdown: broadcast::Receiver<()>) {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(address = %addr, "Tap proxy starting");
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let mut accept_failures: u32 = 0;

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer, permit) = match accepted {
                        Ok(conn) => {
                            accept_failures = 0;
                            conn
                        }
                        Err(e) => {
                            accept_failures = accept_failures.saturating_add(1);
                            let pause = accept_backoff(accept_failures);
                            tracing::warn!(error = %e, failures = accept_failures, backoff_ms = pause.as_millis() as u64, "Accept failed");
                            tokio::time::sleep(pause).await;
                            continue;
                        }
                    };

                    let guard = self.tracker.track();
                    let router = self.router.clone();
                    let mut stop = stop_rx.clone();
                    tokio::spawn(async move {
                        let _permit = permit;
                        let service = hyper::service::service_fn(move |request: Request<Incoming>| {
                            let router = router.clone();
                            async move {
                                if request.method() == Method::CONNECT {
                                    Ok::<_, Infallible>(handle_connect(request).await)
                                } else {
                                    router.oneshot(request.map(Body::new)).await
                                }
                            }
                        });

                        let conn = http1::Builder::new()
                            .preserve_header_case(true)
                            .title_case_headers(true)
                            .serve_connection(TokioIo::new(stream), service)
                            .with_upgrades();
                        tokio::pin!(conn);

                        let mut stopping = false;
                        let result = loop {
                            tokio::select! {
                                res = conn.as_mut() => break res,
                                _ = stop.changed(), if !stopping => {
                                    stopping = true;
                                    conn.as_mut().graceful_shutdown();
                                }
                            }
                        };

                        if let Err(e) = result {
                            tracing::debug!(connection_id = %guard.id(), peer_addr = %peer, error = %e, "Connection error");
                        }
                        drop(guard);
                    });
                }
                _ = shutdown.recv() => {
                    tracing::info!("Tap proxy received shutdown signal");
                    break;
                }
            }
        }

        let _ = stop_tx.send(true);
        if !self.tracker.drain(DRAIN_DEADLINE).await {
            tracing::warn!(
                active = self.tracker.active_count(),
                "Shutdown deadline passed with connections still open"
            );
        }
        tracing::info!("Tap proxy stopped");
    }
}
