//! Request dispatch and the error boundary.
//!
//! # Data Flow
//! ```text
//! Request
//!     → normalize + percent-decode path, decode query + cookie
//!     → RouteTable::lookup
//!         Matched        → global chain ++ route chain around route handler
//!         MethodMismatch → global chain around 405 fallback (Allow header)
//!         NoMatch        → global chain around 404 fallback
//!     → guarded execution (errors + panics → on_error or generic 500)
//!     → Response
//! ```
//!
//! # Design Decisions
//! - The guard awaits the composed handler, so failures after a suspension
//!   point still reach the error handler
//! - Panics are caught and treated like returned errors
//! - The boundary covers fallback chains too (their middlewares can fail)
//! - Error details go to the log, never into the response body

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use axum::http::{header, HeaderValue, Method, StatusCode};
use futures_util::FutureExt;

use crate::http::request::RequestHead;
use crate::http::response::error_response;
use crate::observability::metrics;
use crate::routing::context::{ExecutionContext, RequestContext};
use crate::routing::decode::{parse_cookie, parse_query, DuplicateKeys};
use crate::routing::error::HandlerError;
use crate::routing::matcher::{DecodedPath, Params};
use crate::routing::middleware::{compose, BoxHandler, MiddlewareRegistry, Request, Response};
use crate::routing::pattern::normalize_path;
use crate::routing::router::{ErrorHandler, Gateway, Lookup, RouteTable};

/// How a request was resolved against the route table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Matched,
    MethodMismatch,
    NoMatch,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Matched => "matched",
            Outcome::MethodMismatch => "method_not_allowed",
            Outcome::NoMatch => "not_found",
        }
    }
}

struct Dispatcher<E> {
    routes: RouteTable<E>,
    registry: MiddlewareRegistry<E>,
    on_error: Option<Arc<dyn ErrorHandler<E>>>,
    duplicate_keys: DuplicateKeys,
}

/// Frozen, shareable gateway. Cloning is cheap.
pub struct Entrypoint<E> {
    inner: Arc<Dispatcher<E>>,
}

impl<E> Clone for Entrypoint<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E: Send + Sync + 'static> Entrypoint<E> {
    pub(crate) fn new(gateway: Gateway<E>) -> Self {
        Self {
            inner: Arc::new(Dispatcher {
                routes: gateway.routes,
                registry: gateway.registry,
                on_error: gateway.on_error,
                duplicate_keys: gateway.duplicate_keys,
            }),
        }
    }

    /// Serve one request.
    pub async fn fetch(&self, req: Request, env: Arc<E>, execution: ExecutionContext) -> Response {
        let start = Instant::now();
        let dispatcher = &self.inner;

        // one decoded path for both route lookup and prefix filtering
        let path = DecodedPath::new(&normalize_path(req.uri().path()));
        let pathname = path.pathname.as_str();
        let segments = path.segment_refs();
        let query = parse_query(req.uri().query().unwrap_or_default(), dispatcher.duplicate_keys);
        let cookie = req
            .headers()
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect::<Vec<_>>()
            .join("; ");
        let cookie = parse_cookie(&cookie, dispatcher.duplicate_keys);

        let mut chain = dispatcher.registry.chain_for(pathname);

        let (outcome, params, endpoint): (Outcome, Params, BoxHandler<E>) =
            match dispatcher.routes.lookup(req.method(), &segments) {
                Lookup::Matched { route, params } => {
                    chain.extend(route.middlewares.iter().cloned());
                    (Outcome::Matched, params, route.handler.clone())
                }
                Lookup::MethodMismatch(allowed) => {
                    (Outcome::MethodMismatch, Params::new(), method_not_allowed(allowed))
                }
                Lookup::NoMatch => (Outcome::NoMatch, Params::new(), not_found()),
            };

        let cx = RequestContext::new(params, query, cookie, env, execution);
        let head = RequestHead::from_request(&req);
        let composed = compose(chain, endpoint);

        let result = AssertUnwindSafe(composed.run(req, cx.clone()))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(HandlerError::Panicked(panic_message(panic))));

        let response = match result {
            Ok(response) => response,
            Err(error) => self.recover(head.clone(), cx, error).await,
        };

        tracing::debug!(
            method = %head.method,
            path = %pathname,
            outcome = outcome.as_str(),
            status = response.status().as_u16(),
            "Request dispatched"
        );
        metrics::record_request(outcome.as_str(), response.status().as_u16(), start);

        response
    }

    async fn recover(&self, head: RequestHead, cx: RequestContext<E>, error: HandlerError) -> Response {
        tracing::error!(
            method = %head.method,
            path = %head.uri.path(),
            error = %error,
            "Handler failed"
        );

        match &self.inner.on_error {
            Some(handler) => {
                match AssertUnwindSafe(handler.call(head, cx, error)).catch_unwind().await {
                    Ok(response) => response,
                    Err(panic) => {
                        tracing::error!(panic = %panic_message(panic), "Error handler panicked");
                        internal_error()
                    }
                }
            }
            None => internal_error(),
        }
    }
}

fn internal_error() -> Response {
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
}

fn not_found<E: Send + Sync + 'static>() -> BoxHandler<E> {
    Arc::new(|_req: Request, _cx: RequestContext<E>| async {
        Ok::<_, HandlerError>(error_response(StatusCode::NOT_FOUND, "Not Found"))
    })
}

fn method_not_allowed<E: Send + Sync + 'static>(allowed: Vec<Method>) -> BoxHandler<E> {
    let allow = allowed
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    // method names are HTTP tokens, always valid header text
    let allow = HeaderValue::from_str(&allow).unwrap_or_else(|_| HeaderValue::from_static(""));

    Arc::new(move |_req: Request, _cx: RequestContext<E>| {
        let allow = allow.clone();
        async move {
            let mut response = error_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
            response.headers_mut().insert(header::ALLOW, allow);
            Ok::<_, HandlerError>(response)
        }
    })
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
