//! Handlers, middlewares and their composition.
//!
//! # Data Flow
//! ```text
//! [m0, m1, ..., mk] + handler
//!     → compose()      (Next at position 0)
//!     → m0.call(req, cx, next)
//!         → next.run() → m1.call(...) → ... → handler.call(req, cx)
//!     ← response flows back out through mk, ..., m0
//! ```
//!
//! # Design Decisions
//! - `m0` is the outermost layer: first to see the request, last to see the
//!   response
//! - A middleware short-circuits by returning without calling `next.run`
//! - Plain async closures implement both [`Handler`] and [`Middleware`]
//! - The registry selects bindings by segment-aligned prefix and orders them
//!   by prefix length, shortest (broadest) first

use std::future::Future;
use std::sync::Arc;

use axum::body::Body;
use futures_util::future::BoxFuture;

use crate::routing::context::RequestContext;
use crate::routing::error::{HandlerError, RouterError};
use crate::routing::matcher::path_starts_with;
use crate::routing::pattern::normalize_path;

/// Inbound request type.
pub type Request = axum::http::Request<Body>;

/// Outbound response type.
pub type Response = axum::response::Response;

/// What every handler and middleware resolves to.
pub type HandlerResult = Result<Response, HandlerError>;

/// Terminal request handler.
pub trait Handler<E>: Send + Sync + 'static {
    fn call(&self, req: Request, cx: RequestContext<E>) -> BoxFuture<'static, HandlerResult>;
}

impl<E, F, Fut> Handler<E> for F
where
    F: Fn(Request, RequestContext<E>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, req: Request, cx: RequestContext<E>) -> BoxFuture<'static, HandlerResult> {
        Box::pin(self(req, cx))
    }
}

/// A layer wrapped around the next handler in the chain.
pub trait Middleware<E>: Send + Sync + 'static {
    fn call(
        &self,
        req: Request,
        cx: RequestContext<E>,
        next: Next<E>,
    ) -> BoxFuture<'static, HandlerResult>;
}

impl<E, F, Fut> Middleware<E> for F
where
    F: Fn(Request, RequestContext<E>, Next<E>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(
        &self,
        req: Request,
        cx: RequestContext<E>,
        next: Next<E>,
    ) -> BoxFuture<'static, HandlerResult> {
        Box::pin(self(req, cx, next))
    }
}

impl<E: 'static> Middleware<E> for Arc<dyn Middleware<E>> {
    fn call(
        &self,
        req: Request,
        cx: RequestContext<E>,
        next: Next<E>,
    ) -> BoxFuture<'static, HandlerResult> {
        (**self).call(req, cx, next)
    }
}

/// Shared handle to a handler.
pub type BoxHandler<E> = Arc<dyn Handler<E>>;

/// Shared handle to a middleware.
pub type BoxMiddleware<E> = Arc<dyn Middleware<E>>;

/// Wrap a middleware for registration.
pub fn middleware<E, M: Middleware<E>>(m: M) -> BoxMiddleware<E> {
    Arc::new(m)
}

/// The remainder of a composed chain.
pub struct Next<E> {
    layers: Arc<[BoxMiddleware<E>]>,
    position: usize,
    endpoint: BoxHandler<E>,
}

impl<E> Clone for Next<E> {
    fn clone(&self) -> Self {
        Self {
            layers: self.layers.clone(),
            position: self.position,
            endpoint: self.endpoint.clone(),
        }
    }
}

impl<E: Send + Sync + 'static> Next<E> {
    /// Run the next layer, or the terminal handler once every layer ran.
    pub fn run(mut self, req: Request, cx: RequestContext<E>) -> BoxFuture<'static, HandlerResult> {
        match self.layers.get(self.position).cloned() {
            Some(layer) => {
                self.position += 1;
                layer.call(req, cx, self)
            }
            None => self.endpoint.call(req, cx),
        }
    }
}

/// Compose `[m0, ..., mk]` around `endpoint`, yielding `m0(m1(...mk(endpoint)))`.
pub fn compose<E>(layers: Vec<BoxMiddleware<E>>, endpoint: BoxHandler<E>) -> Next<E> {
    Next {
        layers: layers.into(),
        position: 0,
        endpoint,
    }
}

/// Middlewares scoped to a path prefix.
pub struct MiddlewareBinding<E> {
    pub prefix: String,
    pub middlewares: Vec<BoxMiddleware<E>>,
}

/// Ordered list of prefix bindings, independent of routes.
pub struct MiddlewareRegistry<E> {
    bindings: Vec<MiddlewareBinding<E>>,
}

impl<E> Default for MiddlewareRegistry<E> {
    fn default() -> Self {
        Self { bindings: Vec::new() }
    }
}

impl<E> MiddlewareRegistry<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a binding. The prefix is normalized like a route path.
    pub fn bind(
        &mut self,
        prefix: &str,
        middlewares: Vec<BoxMiddleware<E>>,
    ) -> Result<(), RouterError> {
        let prefix = normalize_path(prefix);
        if middlewares.is_empty() {
            return Err(RouterError::EmptyMiddlewareList { prefix });
        }
        self.bindings.push(MiddlewareBinding { prefix, middlewares });
        Ok(())
    }

    /// Append a single-middleware binding. Infallible: the list is never
    /// empty.
    pub fn bind_one(&mut self, prefix: &str, middleware: BoxMiddleware<E>) {
        self.bindings.push(MiddlewareBinding {
            prefix: normalize_path(prefix),
            middlewares: vec![middleware],
        });
    }

    /// Flattened global chain for a normalized request path.
    pub fn chain_for(&self, pathname: &str) -> Vec<BoxMiddleware<E>> {
        let mut matching: Vec<&MiddlewareBinding<E>> = self
            .bindings
            .iter()
            .filter(|binding| path_starts_with(pathname, &binding.prefix))
            .collect();

        // stable: equal-length prefixes keep registration order
        matching.sort_by_key(|binding| binding.prefix.len());

        matching
            .into_iter()
            .flat_map(|binding| binding.middlewares.iter().cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
