//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     Gateway::get/post/... (pattern, handler, route middlewares)
//!     → pattern.rs (normalize, tokenize)
//!     → router.rs (append to RouteTable)
//!     Gateway::use_prefix (prefix, middlewares)
//!     → middleware.rs (append to MiddlewareRegistry)
//!     Gateway::export → Entrypoint (frozen, Arc-shared)
//!
//! Incoming Request:
//!     → dispatch.rs (normalize path, decode query/cookie)
//!     → router.rs (route lookup: matched / method mismatch / no match)
//!     → middleware.rs (prefix chain ++ route chain, compose)
//!     → guarded execution → Response
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (token comparison only)
//! - Deterministic: same input always matches same route
//! - First match wins (registration order)

pub mod context;
pub mod decode;
pub mod dispatch;
pub mod error;
pub mod matcher;
pub mod middleware;
pub mod pattern;
pub mod router;

pub use context::{CancellationScope, DeferredTasks, ExecutionContext, RequestContext};
pub use decode::{CookieMap, DuplicateKeys, QueryMap};
pub use dispatch::{Entrypoint, Outcome};
pub use error::{HandlerError, RouterError};
pub use matcher::Params;
pub use middleware::{
    compose, middleware, BoxHandler, BoxMiddleware, Handler, HandlerResult, Middleware, Next,
    Request, Response,
};
pub use pattern::Token;
pub use router::{ErrorHandler, Gateway};
