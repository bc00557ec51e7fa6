//! Page-view gateway library.
//!
//! A small request router with prefix-scoped middleware composition, plus the
//! page-view service built on it.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod pageviews;
pub mod routing;
pub mod security;
pub mod store;

pub use config::schema::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::{Entrypoint, Gateway, RequestContext};
