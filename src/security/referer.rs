//! Referer check for the pixel beacon.

use std::sync::Arc;

use axum::http::StatusCode;
use futures_util::future::BoxFuture;

use crate::config::RefererConfig;
use crate::http::response::error_response;
use crate::routing::context::RequestContext;
use crate::routing::middleware::{HandlerResult, Middleware, Next, Request};
use crate::security::origin::{allowed_origin, request_origin};

/// Rejects requests whose origin (or referer origin) is not allow-listed.
#[derive(Debug, Clone)]
pub struct VerifyReferer {
    origins: Arc<[String]>,
}

impl VerifyReferer {
    pub fn new(config: &RefererConfig) -> Self {
        Self {
            origins: config.origins.clone().into(),
        }
    }
}

impl<E: Send + Sync + 'static> Middleware<E> for VerifyReferer {
    fn call(
        &self,
        req: Request,
        cx: RequestContext<E>,
        next: Next<E>,
    ) -> BoxFuture<'static, HandlerResult> {
        let origins = self.origins.clone();

        Box::pin(async move {
            let origin = request_origin(req.headers());
            if allowed_origin(origin.as_deref(), &origins).is_none() {
                tracing::debug!(origin = ?origin, "Referer rejected");
                return Ok(error_response(StatusCode::FORBIDDEN, "Referer Not Allowed"));
            }
            next.run(req, cx).await
        })
    }
}
