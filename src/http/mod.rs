//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, tower layers, execution context)
//!     → routing::Entrypoint::fetch
//!         → request.rs (RequestMeta: request ID, powered-by, duration)
//!         → policies + handlers
//!         → response.rs (JSON bodies, error payloads)
//!     → Send to client
//!     → deferred work drained in the background
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestHead, RequestMeta, X_REQUEST_ID};
pub use server::HttpServer;
