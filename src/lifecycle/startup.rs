//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the settings store, status indicator and relay
//! - Register the relay as the observer's listener for the configured patterns
//! - Bind the sink and options servers, then the tap
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::config::RelayConfig;
use crate::http::{TapError, TapServer};
use crate::lifecycle::Shutdown;
use crate::net::{Listener, ListenerError};
use crate::observability::metrics;
use crate::observer::{PatternError, RequestObserver, UrlFilter};
use crate::options::{setup_options_router, OptionsState};
use crate::relay::{HeaderRelay, StatusIndicator};
use crate::settings::{DestinationSetting, FileStore, SettingsStore};
use crate::sink::{run_sink, CapturedHeaders};

/// Error type for startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("invalid URL pattern: {0}")]
    Pattern(#[from] PatternError),
    #[error(transparent)]
    Tap(#[from] TapError),
    #[error("tap listener: {0}")]
    Listener(#[from] ListenerError),
    #[error("{what}: {source}")]
    Bind {
        what: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Listeners for one run. Servers with no listener are not started.
pub struct Bound {
    pub tap: Listener,
    pub options: Option<TcpListener>,
    pub sink: Option<TcpListener>,
}

/// The wired application.
pub struct RelayApp {
    config: RelayConfig,
    observer: Arc<RequestObserver>,
    relay: Arc<HeaderRelay>,
    indicator: Arc<StatusIndicator>,
    captured: CapturedHeaders,
}

impl RelayApp {
    /// Wire the application with the on-disk settings store.
    pub fn build(config: RelayConfig) -> Result<Self, StartupError> {
        let store = Arc::new(FileStore::new(&config.relay.settings_path));
        Self::with_store(config, store)
    }

    /// Wire the application around an injected settings store.
    pub fn with_store(
        config: RelayConfig,
        store: Arc<dyn SettingsStore>,
    ) -> Result<Self, StartupError> {
        let filter = UrlFilter::compile(&config.observer.patterns)?;

        let indicator = Arc::new(StatusIndicator::new(
            &config.relay.success_icon,
            &config.relay.failure_icon,
        ));
        let destination = DestinationSetting::new(store, &config.relay.default_destination);
        let relay = Arc::new(HeaderRelay::new(destination, indicator.clone()));

        let observer = Arc::new(RequestObserver::new());
        let listener_relay = relay.clone();
        observer.add_listener(filter, move |request| {
            // Detached; the handle is dropped on purpose.
            let _ = listener_relay.spawn(request.id, request.headers.clone());
        });

        tracing::info!(
            patterns = ?config.observer.patterns,
            default_destination = %config.relay.default_destination,
            "Relay wired"
        );

        Ok(Self {
            config,
            observer,
            relay,
            indicator,
            captured: CapturedHeaders::new(),
        })
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn observer(&self) -> &Arc<RequestObserver> {
        &self.observer
    }

    pub fn relay(&self) -> &Arc<HeaderRelay> {
        &self.relay
    }

    pub fn indicator(&self) -> &Arc<StatusIndicator> {
        &self.indicator
    }

    pub fn destination(&self) -> &DestinationSetting {
        self.relay.destination()
    }

    pub fn captured(&self) -> &CapturedHeaders {
        &self.captured
    }

    /// Bind every configured listener. The tap binds last.
    pub async fn bind(&self) -> Result<Bound, StartupError> {
        let sink = if self.config.sink.enabled {
            Some(bind_tcp("sink listener", &self.config.sink.bind_address).await?)
        } else {
            None
        };
        let options = if self.config.options.enabled {
            Some(bind_tcp("options listener", &self.config.options.bind_address).await?)
        } else {
            None
        };
        let tap = Listener::bind(
            &self.config.listener.bind_address,
            self.config.listener.max_connections,
        )
        .await?;

        Ok(Bound { tap, options, sink })
    }

    /// Bind from config and serve until `shutdown` fires.
    pub async fn run(self, shutdown: &Shutdown) -> Result<(), StartupError> {
        if self.config.observability.metrics_enabled {
            match self.config.observability.metrics_address.parse::<SocketAddr>() {
                Ok(addr) => metrics::init_metrics(addr),
                Err(e) => tracing::error!(
                    metrics_address = %self.config.observability.metrics_address,
                    error = %e,
                    "Failed to parse metrics address"
                ),
            }
        }

        let bound = self.bind().await?;
        self.serve(bound, shutdown).await
    }

    /// Serve on pre-bound listeners until `shutdown` fires.
    pub async fn serve(self, bound: Bound, shutdown: &Shutdown) -> Result<(), StartupError> {
        let mut servers: Vec<JoinHandle<()>> = Vec::new();

        if let Some(listener) = bound.sink {
            let captured = self.captured.clone();
            let stop = shutdown.subscribe();
            servers.push(tokio::spawn(async move {
                if let Err(e) = run_sink(listener, captured, stop).await {
                    tracing::error!(error = %e, "Header sink failed");
                }
            }));
        }

        if let Some(listener) = bound.options {
            let state = OptionsState {
                destination: self.relay.destination().clone(),
                indicator: self.indicator.clone(),
                api_key: self.config.options.api_key.clone(),
            };
            let mut stop = shutdown.subscribe();
            servers.push(tokio::spawn(async move {
                if let Ok(addr) = listener.local_addr() {
                    tracing::info!(address = %addr, "Options server starting");
                }
                let result = axum::serve(listener, setup_options_router(state))
                    .with_graceful_shutdown(async move {
                        let _ = stop.recv().await;
                    })
                    .await;
                if let Err(e) = result {
                    tracing::error!(error = %e, "Options server failed");
                }
            }));
        }

        let tap = TapServer::new(&self.config, self.observer.clone())?;
        tap.run(bound.tap, shutdown.subscribe()).await;

        for server in servers {
            let _ = server.await;
        }
        Ok(())
    }
}

async fn bind_tcp(what: &'static str, address: &str) -> Result<TcpListener, StartupError> {
    TcpListener::bind(address)
        .await
        .map_err(|source| StartupError::Bind { what, source })
}
