//! Tap proxy HTTP layer.
//!
//! # Data Flow
//! ```text
//! TCP connection (net::Listener)
//!     → server.rs (hyper HTTP/1.1 with upgrades)
//!     → CONNECT? → tunnel.rs (opaque, unobserved)
//!     → otherwise → forward.rs (observe, then forward upstream)
//!     → response relayed back to the client
//! ```

pub mod forward;
pub mod server;
pub mod tunnel;

pub use forward::TapState;
pub use server::{TapError, TapServer};
