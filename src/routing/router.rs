//! Route table and gateway builder.
//!
//! # Responsibilities
//! - Store compiled routes in registration order
//! - Look up the route matching a request's method and path
//! - Collect allowed methods when only the path matches
//! - Expose the registration surface (`get`, `use_prefix`, `on_error`, ...)
//!
//! # Design Decisions
//! - Built once during setup; `export` freezes it behind an `Arc`
//! - O(n) linear scan in registration order, first full match wins
//! - Explicit `NoMatch` / `MethodMismatch` outcomes rather than silent defaults
//! - No global state: independent gateways can coexist

use std::future::Future;
use std::sync::Arc;

use axum::http::Method;
use futures_util::future::BoxFuture;

use crate::config::RouterConfig;
use crate::http::request::{RequestHead, RequestMeta};
use crate::routing::context::RequestContext;
use crate::routing::decode::DuplicateKeys;
use crate::routing::dispatch::Entrypoint;
use crate::routing::error::{HandlerError, RouterError};
use crate::routing::matcher::{match_tokens, Params};
use crate::routing::middleware::{
    middleware, BoxHandler, BoxMiddleware, Handler, Middleware, MiddlewareRegistry, Response,
};
use crate::routing::pattern::{normalize_path, tokenize, Token};

/// A registered route.
pub struct Route<E> {
    pub method: Method,
    pub pathname: String,
    pub tokens: Vec<Token>,
    pub middlewares: Vec<BoxMiddleware<E>>,
    pub handler: BoxHandler<E>,
}

/// Result of a route table lookup.
pub enum Lookup<'a, E> {
    /// Method and path both matched.
    Matched { route: &'a Route<E>, params: Params },
    /// The path matched at least one route, the method none. Methods are
    /// sorted and de-duplicated.
    MethodMismatch(Vec<Method>),
    /// No route's tokens matched the path.
    NoMatch,
}

/// Ordered list of routes.
pub struct RouteTable<E> {
    routes: Vec<Route<E>>,
}

impl<E> Default for RouteTable<E> {
    fn default() -> Self {
        Self { routes: Vec::new() }
    }
}

impl<E> RouteTable<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile and append a route.
    pub fn insert(
        &mut self,
        method: Method,
        pattern: &str,
        handler: BoxHandler<E>,
        middlewares: Vec<BoxMiddleware<E>>,
    ) -> Result<(), RouterError> {
        let pathname = normalize_path(pattern);
        let tokens = tokenize(&pathname)?;

        tracing::debug!(method = %method, path = %pathname, "Route registered");

        self.routes.push(Route {
            method,
            pathname,
            tokens,
            middlewares,
            handler,
        });
        Ok(())
    }

    /// Find the route for `method` and the request's path segments.
    pub fn lookup(&self, method: &Method, segments: &[&str]) -> Lookup<'_, E> {
        let mut allowed: Vec<Method> = Vec::new();

        for route in &self.routes {
            let Some(params) = match_tokens(&route.tokens, segments) else {
                continue;
            };

            if route.method != *method {
                allowed.push(route.method.clone());
                continue;
            }
            return Lookup::Matched { route, params };
        }

        if allowed.is_empty() {
            Lookup::NoMatch
        } else {
            allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
            allowed.dedup();
            Lookup::MethodMismatch(allowed)
        }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Fallback invoked by the error boundary.
pub trait ErrorHandler<E>: Send + Sync + 'static {
    fn call(
        &self,
        head: RequestHead,
        cx: RequestContext<E>,
        error: HandlerError,
    ) -> BoxFuture<'static, Response>;
}

impl<E, F, Fut> ErrorHandler<E> for F
where
    F: Fn(RequestHead, RequestContext<E>, HandlerError) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn call(
        &self,
        head: RequestHead,
        cx: RequestContext<E>,
        error: HandlerError,
    ) -> BoxFuture<'static, Response> {
        Box::pin(self(head, cx, error))
    }
}

/// Setup-time builder: routes, prefix bindings and the error fallback.
pub struct Gateway<E> {
    pub(crate) routes: RouteTable<E>,
    pub(crate) registry: MiddlewareRegistry<E>,
    pub(crate) on_error: Option<Arc<dyn ErrorHandler<E>>>,
    pub(crate) duplicate_keys: DuplicateKeys,
}

impl<E: Send + Sync + 'static> Default for Gateway<E> {
    fn default() -> Self {
        Self::with_config(&RouterConfig::default())
    }
}

impl<E: Send + Sync + 'static> Gateway<E> {
    /// Gateway with default router settings (extended mode on).
    pub fn new() -> Self {
        Self::default()
    }

    /// Gateway configured from the `[router]` section.
    pub fn with_config(config: &RouterConfig) -> Self {
        let mut registry = MiddlewareRegistry::new();
        if config.extended {
            registry.bind_one("/", middleware(RequestMeta::default()));
        }

        Self {
            routes: RouteTable::new(),
            registry,
            on_error: None,
            duplicate_keys: config.duplicate_keys,
        }
    }

    /// Bind middlewares to `/`.
    pub fn use_global(&mut self, m: impl Middleware<E>) -> &mut Self {
        self.registry.bind_one("/", middleware(m));
        self
    }

    /// Bind middlewares to a path prefix.
    pub fn use_prefix<I>(&mut self, prefix: &str, middlewares: I) -> Result<&mut Self, RouterError>
    where
        I: IntoIterator<Item = BoxMiddleware<E>>,
    {
        self.registry.bind(prefix, middlewares.into_iter().collect())?;
        Ok(self)
    }

    /// Install the error boundary's fallback.
    pub fn on_error(&mut self, handler: impl ErrorHandler<E>) -> &mut Self {
        self.on_error = Some(Arc::new(handler));
        self
    }

    /// Register a route with route-local middlewares (innermost layers).
    pub fn route<I>(
        &mut self,
        method: Method,
        pattern: &str,
        handler: impl Handler<E>,
        middlewares: I,
    ) -> Result<&mut Self, RouterError>
    where
        I: IntoIterator<Item = BoxMiddleware<E>>,
    {
        self.routes.insert(
            method,
            pattern,
            Arc::new(handler),
            middlewares.into_iter().collect(),
        )?;
        Ok(self)
    }

    pub fn head(&mut self, pattern: &str, handler: impl Handler<E>) -> Result<&mut Self, RouterError> {
        self.route(Method::HEAD, pattern, handler, [])
    }

    pub fn get(&mut self, pattern: &str, handler: impl Handler<E>) -> Result<&mut Self, RouterError> {
        self.route(Method::GET, pattern, handler, [])
    }

    pub fn post(&mut self, pattern: &str, handler: impl Handler<E>) -> Result<&mut Self, RouterError> {
        self.route(Method::POST, pattern, handler, [])
    }

    pub fn put(&mut self, pattern: &str, handler: impl Handler<E>) -> Result<&mut Self, RouterError> {
        self.route(Method::PUT, pattern, handler, [])
    }

    pub fn patch(&mut self, pattern: &str, handler: impl Handler<E>) -> Result<&mut Self, RouterError> {
        self.route(Method::PATCH, pattern, handler, [])
    }

    pub fn delete(&mut self, pattern: &str, handler: impl Handler<E>) -> Result<&mut Self, RouterError> {
        self.route(Method::DELETE, pattern, handler, [])
    }

    pub fn options(&mut self, pattern: &str, handler: impl Handler<E>) -> Result<&mut Self, RouterError> {
        self.route(Method::OPTIONS, pattern, handler, [])
    }

    /// Freeze the gateway into the platform-facing entry point.
    pub fn export(self) -> Entrypoint<E> {
        tracing::info!(
            routes = self.routes.len(),
            bindings = self.registry.len(),
            "Gateway exported"
        );
        Entrypoint::new(self)
    }
}
