//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RelayConfig (validated, immutable)
//!     → shared by value with each subsystem at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; URL patterns never change at runtime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    ListenerConfig, ObservabilityConfig, ObserverConfig, OptionsConfig, RelayConfig,
    RelaySettingsConfig, SecurityConfig, SinkConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
