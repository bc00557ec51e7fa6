//! User-agent deny-list.

use std::sync::Arc;

use axum::http::{header, StatusCode};
use futures_util::future::BoxFuture;

use crate::config::BotFilterConfig;
use crate::http::response::error_response;
use crate::routing::context::RequestContext;
use crate::routing::middleware::{HandlerResult, Middleware, Next, Request};

/// Stand-in for a missing `User-Agent`; it matches the default list.
const MISSING_AGENT: &str = "bot";

/// Rejects user agents containing any configured marker (case-insensitive).
#[derive(Debug, Clone)]
pub struct VerifyUserAgent {
    markers: Arc<[String]>,
}

impl VerifyUserAgent {
    pub fn new(config: &BotFilterConfig) -> Self {
        let markers: Vec<String> = config
            .blocked_agents
            .iter()
            .map(|marker| marker.trim().to_ascii_lowercase())
            .filter(|marker| !marker.is_empty())
            .collect();

        Self {
            markers: markers.into(),
        }
    }

    /// True when `user_agent` contains a blocked marker.
    pub fn is_blocked(&self, user_agent: &str) -> bool {
        let user_agent = user_agent.to_ascii_lowercase();
        self.markers.iter().any(|marker| user_agent.contains(marker.as_str()))
    }
}

impl<E: Send + Sync + 'static> Middleware<E> for VerifyUserAgent {
    fn call(
        &self,
        req: Request,
        cx: RequestContext<E>,
        next: Next<E>,
    ) -> BoxFuture<'static, HandlerResult> {
        let policy = self.clone();

        Box::pin(async move {
            let user_agent = req
                .headers()
                .get(header::USER_AGENT)
                .and_then(|value| value.to_str().ok())
                .filter(|value| !value.is_empty())
                .unwrap_or(MISSING_AGENT)
                .to_string();

            if policy.is_blocked(&user_agent) {
                tracing::debug!(user_agent = %user_agent, "User agent rejected");
                let message = format!("{user_agent} Not Allowed");
                return Ok(error_response(StatusCode::FORBIDDEN, &message));
            }
            next.run(req, cx).await
        })
    }
}
