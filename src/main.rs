//! Header relay
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌───────────────────────────────────────────────┐
//!                        │                 HEADER RELAY                   │
//!   Client (proxy set)   │  ┌──────────┐   ┌───────────┐                  │
//!   ─────────────────────┼─▶│   tap    │──▶│  forward  │──────────────────┼──▶ Origin
//!                        │  │ listener │   └─────┬─────┘                  │
//!                        │  └──────────┘         │ observed request       │
//!                        │                       ▼                        │
//!                        │                ┌────────────┐                  │
//!                        │                │  observer  │ URL patterns     │
//!                        │                └─────┬──────┘                  │
//!                        │                      ▼                         │
//!                        │   settings ──▶ ┌────────────┐   GET + headers  │
//!                        │   (url key)    │   relay    │──────────────────┼──▶ Destination
//!                        │                └─────┬──────┘                  │     (sink)
//!                        │                      ▼                         │
//!   Options page / CLI ──┼──▶ options ◀── status indicator                │
//!                        └───────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use header_relay::config::{load_config, RelayConfig};
use header_relay::lifecycle::signals::wait_for_shutdown_signal;
use header_relay::observability::logging::init_logging;
use header_relay::sink::{run_sink, CapturedHeaders};
use header_relay::{RelayApp, Shutdown};

#[derive(Parser)]
#[command(name = "header-relay")]
#[command(about = "Tap proxy that relays request headers to a local endpoint", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the tap proxy, options server and (if enabled) the header sink
    Run {
        /// TOML config file; defaults apply when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Run only the header sink
    Sink {
        #[arg(short, long, default_value = "127.0.0.1:8080")]
        bind: String,
    },
    /// Validate a config file and exit
    Check {
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn load(path: Option<&PathBuf>) -> Result<RelayConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(load_config(path)?),
        None => Ok(RelayConfig::default()),
    }
}

/// Trigger `shutdown` on the first OS signal.
fn spawn_signal_handler(shutdown: &Shutdown) {
    let shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        shutdown.trigger();
    });
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Run { config } => {
            let config = load(config.as_ref())?;
            init_logging(&config.observability.log_level);

            tracing::info!(
                version = env!("CARGO_PKG_VERSION"),
                tap = %config.listener.bind_address,
                options = %config.options.bind_address,
                "header-relay starting"
            );

            let shutdown = Shutdown::new();
            spawn_signal_handler(&shutdown);
            RelayApp::build(config)?.run(&shutdown).await?;
            tracing::info!("Shutdown complete");
        }
        Commands::Sink { bind } => {
            init_logging("info");
            let shutdown = Shutdown::new();
            spawn_signal_handler(&shutdown);
            let listener = TcpListener::bind(&bind).await?;
            run_sink(listener, CapturedHeaders::new(), shutdown.subscribe()).await?;
        }
        Commands::Check { config } => {
            load_config(&config)?;
            println!("{}: ok", config.display());
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
