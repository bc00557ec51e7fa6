//! API token check.

use std::sync::Arc;

use axum::http::StatusCode;
use futures_util::future::BoxFuture;

use crate::config::AuthConfig;
use crate::http::request::header_str;
use crate::http::response::error_response;
use crate::routing::context::RequestContext;
use crate::routing::middleware::{HandlerResult, Middleware, Next, Request};

/// Header carrying the API token.
pub const X_API_TOKEN: &str = "x-api-token";

/// Requires `x-api-token` to equal the configured token.
#[derive(Debug, Clone)]
pub struct VerifyToken {
    token: Arc<str>,
}

impl VerifyToken {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            token: config.api_token.as_str().into(),
        }
    }
}

impl<E: Send + Sync + 'static> Middleware<E> for VerifyToken {
    fn call(
        &self,
        req: Request,
        cx: RequestContext<E>,
        next: Next<E>,
    ) -> BoxFuture<'static, HandlerResult> {
        let expected = self.token.clone();

        Box::pin(async move {
            match header_str(req.headers(), X_API_TOKEN) {
                None => {
                    return Ok(error_response(
                        StatusCode::UNAUTHORIZED,
                        "Unauthorized, please check headers",
                    ));
                }
                Some(token) if token != &*expected => {
                    tracing::debug!(path = %req.uri().path(), "API token mismatch");
                    return Ok(error_response(
                        StatusCode::FORBIDDEN,
                        "Forbidden, please check x-api-token",
                    ));
                }
                Some(_) => {}
            }
            next.run(req, cx).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::test_support::{body_text, request, run};
    use axum::http::Method;

    fn policy() -> VerifyToken {
        VerifyToken::new(&AuthConfig {
            enabled: true,
            api_token: "secret".into(),
        })
    }

    #[tokio::test]
    async fn test_missing_or_blank_token() {
        for headers in [&[][..], &[("x-api-token", "   ")][..]] {
            let response = run(policy(), request(Method::GET, "/posts/1/views", headers)).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(
                body_text(response).await,
                r#"{"message":"Unauthorized, please check headers"}"#
            );
        }
    }

    #[tokio::test]
    async fn test_wrong_token() {
        let req = request(Method::GET, "/posts/1/views", &[("x-api-token", "nope")]);
        let response = run(policy(), req).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            body_text(response).await,
            r#"{"message":"Forbidden, please check x-api-token"}"#
        );
    }

    #[tokio::test]
    async fn test_token_is_trimmed() {
        let req = request(Method::GET, "/posts/1/views", &[("x-api-token", " secret ")]);
        let response = run(policy(), req).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
