//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher, store and policies emit:
//!     → logging.rs (tracing events: plain text or JSON lines on stdout)
//!     → metrics.rs (request outcomes, latency, deferred tasks, store ops)
//!
//! Metrics are exported on a Prometheus scrape listener when
//! `observability.metrics_enabled` is set; otherwise the macros are no-ops.
//! ```
//!
//! # Notes
//! - `RUST_LOG` overrides the configured level
//! - With extended mode on, `x-request-id` ties a response to its log lines

pub mod logging;
pub mod metrics;
