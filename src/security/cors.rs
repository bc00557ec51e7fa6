//! CORS policy for the query API.
//!
//! Preflight requests are answered here and never reach the handler. Other
//! requests run the inner chain, then gain the allow headers when the origin
//! is allowed.

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method, StatusCode};
use futures_util::future::BoxFuture;

use crate::config::CorsConfig;
use crate::http::response::empty_response;
use crate::routing::context::RequestContext;
use crate::routing::middleware::{HandlerResult, Middleware, Next, Request};
use crate::security::origin::{allowed_origin, request_origin};

const DEFAULT_MAX_AGE_SECS: u64 = 300;
const MAX_MAX_AGE_SECS: u64 = 86_400;

/// Header values resolved once from [`CorsConfig`].
#[derive(Debug)]
struct CorsPolicy {
    origins: Vec<String>,
    allow_methods: HeaderValue,
    allow_headers: HeaderValue,
    allow_credentials: HeaderValue,
    max_age: HeaderValue,
    vary: HeaderValue,
}

fn joined_or(values: &[String], default: &'static str) -> HeaderValue {
    if values.is_empty() {
        return HeaderValue::from_static(default);
    }
    HeaderValue::from_str(&values.join(", ")).unwrap_or_else(|_| HeaderValue::from_static(default))
}

/// CORS middleware.
#[derive(Debug, Clone)]
pub struct Cors {
    policy: Arc<CorsPolicy>,
}

impl Cors {
    pub fn new(config: &CorsConfig) -> Self {
        let max_age = match config.max_age_secs {
            0 => DEFAULT_MAX_AGE_SECS,
            secs if secs > MAX_MAX_AGE_SECS => DEFAULT_MAX_AGE_SECS,
            secs => secs,
        };

        Self {
            policy: Arc::new(CorsPolicy {
                origins: config.origins.clone(),
                allow_methods: joined_or(&config.methods, "GET, OPTIONS"),
                allow_headers: joined_or(&config.headers, "content-type, x-api-token"),
                allow_credentials: HeaderValue::from_static(if config.credentials {
                    "true"
                } else {
                    "false"
                }),
                max_age: HeaderValue::from(max_age),
                vary: joined_or(&config.vary, "Origin, Accept-Encoding"),
            }),
        }
    }
}

impl<E: Send + Sync + 'static> Middleware<E> for Cors {
    fn call(
        &self,
        req: Request,
        cx: RequestContext<E>,
        next: Next<E>,
    ) -> BoxFuture<'static, HandlerResult> {
        let policy = self.policy.clone();

        Box::pin(async move {
            let origin = request_origin(req.headers());
            let allowed = allowed_origin(origin.as_deref(), &policy.origins)
                .and_then(|origin| HeaderValue::from_str(origin).ok());

            if req.method() == Method::OPTIONS {
                let Some(allowed) = allowed else {
                    tracing::debug!(origin = ?origin, "CORS preflight rejected");
                    return Ok(empty_response(StatusCode::FORBIDDEN));
                };

                let mut response = empty_response(StatusCode::NO_CONTENT);
                let headers = response.headers_mut();
                headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allowed);
                headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, policy.allow_methods.clone());
                headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, policy.allow_headers.clone());
                headers.insert(
                    header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                    policy.allow_credentials.clone(),
                );
                headers.insert(header::ACCESS_CONTROL_MAX_AGE, policy.max_age.clone());
                headers.insert(header::VARY, policy.vary.clone());
                return Ok(response);
            }

            let mut response = next.run(req, cx).await?;
            if let Some(allowed) = allowed {
                let headers = response.headers_mut();
                headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allowed);
                headers.insert(
                    header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                    policy.allow_credentials.clone(),
                );
                headers.insert(header::VARY, policy.vary.clone());
            }
            Ok(response)
        })
    }
}
