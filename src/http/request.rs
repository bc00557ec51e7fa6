//! Request handling helpers.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) for every request
//! - Stamp request/response with id, powered-by and duration headers
//! - Snapshot the request head for the error boundary
//! - Extract client information (ip, user agent)
//!
//! # Design Decisions
//! - Request ID added by the outermost layer so every inner layer sees it
//! - Duration measured around the whole inner chain

use std::time::Instant;

use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, Uri};
use futures_util::future::BoxFuture;
use uuid::Uuid;

use crate::routing::context::RequestContext;
use crate::routing::middleware::{HandlerResult, Middleware, Next, Request};

/// Header carrying the request ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Header naming the service.
pub const X_POWERED_BY: HeaderName = HeaderName::from_static("x-powered-by");

/// Header carrying the time spent in the chain, in milliseconds.
pub const X_DURATION_MS: HeaderName = HeaderName::from_static("x-duration-ms");

/// Method, uri and headers of a request, kept for the error handler after the
/// request itself has moved into the chain.
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

impl RequestHead {
    pub fn from_request(req: &Request) -> Self {
        Self {
            method: req.method().clone(),
            uri: req.uri().clone(),
            headers: req.headers().clone(),
        }
    }
}

/// Read a header as trimmed text.
pub fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Client ip from `x-real-ip`, then `cf-connecting-ip`.
pub fn client_ip(headers: &HeaderMap) -> Option<&str> {
    header_str(headers, "x-real-ip").or_else(|| header_str(headers, "cf-connecting-ip"))
}

/// Outermost middleware installed in extended mode.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    powered_by: HeaderValue,
}

impl Default for RequestMeta {
    fn default() -> Self {
        Self {
            powered_by: HeaderValue::from_static(env!("CARGO_PKG_NAME")),
        }
    }
}

impl RequestMeta {
    pub fn new(powered_by: HeaderValue) -> Self {
        Self { powered_by }
    }
}

impl<E: Send + Sync + 'static> Middleware<E> for RequestMeta {
    fn call(
        &self,
        mut req: Request,
        cx: RequestContext<E>,
        next: Next<E>,
    ) -> BoxFuture<'static, HandlerResult> {
        let powered_by = self.powered_by.clone();

        Box::pin(async move {
            let start = Instant::now();
            let request_id = Uuid::new_v4().to_string();
            // a hyphenated uuid is always a valid header value
            let id_value = HeaderValue::from_str(&request_id)
                .unwrap_or_else(|_| HeaderValue::from_static("unknown"));

            req.headers_mut().insert(X_REQUEST_ID, id_value.clone());

            let mut response = next.run(req, cx).await?;

            let headers = response.headers_mut();
            headers.insert(X_REQUEST_ID, id_value);
            headers.insert(X_POWERED_BY, powered_by);
            headers.insert(X_DURATION_MS, HeaderValue::from(start.elapsed().as_millis() as u64));

            tracing::trace!(request_id = %request_id, "Request meta applied");
            Ok(response)
        })
    }
}
