//! Process lifecycle: startup order, signals and graceful shutdown.
//!
//! # Data Flow
//! ```text
//! startup.rs:
//!     GatewayConfig → metrics exporter → MemoryStore + AppEnv → Entrypoint
//!     → HttpServer → bind → serve
//!
//! signals.rs:
//!     SIGINT / SIGTERM → Shutdown::trigger
//!
//! shutdown.rs:
//!     trigger → listener stops accepting → in-flight requests finish
//!     → deferred work drained (bounded by `timeouts.drain_secs`) → exit
//! ```
//!
//! Requests observe the same trigger through their cancellation scope.

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::StartupError;
