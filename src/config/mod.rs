//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML), or built-in defaults
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → sections handed to the router, policies, store and server
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AuthConfig, BotFilterConfig, CacheConfig, CorsConfig, GatewayConfig, ListenerConfig,
    ObservabilityConfig, RefererConfig, RouterConfig, SecurityConfig, StoreConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
