//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (bindings installed by pageviews::register):
//!     /           → user_agent.rs (deny-list, missing UA counts as "bot")
//!     /view.png   → referer.rs (origin allow-list)
//!     /posts      → cors.rs (preflight + allow headers)
//!                 → token.rs (x-api-token)
//!     → route handler
//! ```
//!
//! # Design Decisions
//! - Policies are plain middlewares: they short-circuit with their own
//!   response instead of raising errors
//! - Fail closed: reject on any check failure
//! - Config is resolved once at construction and shared via `Arc`

pub mod cors;
pub mod origin;
pub mod referer;
pub mod token;
pub mod user_agent;

pub use cors::Cors;
pub use referer::VerifyReferer;
pub use token::VerifyToken;
pub use user_agent::VerifyUserAgent;

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Method;

    use crate::routing::context::{ExecutionContext, RequestContext};
    use crate::routing::error::HandlerError;
    use crate::routing::middleware::{compose, middleware, BoxHandler, Middleware, Request, Response};

    /// Run `policy` in front of a handler answering 200 "inner".
    pub async fn run(policy: impl Middleware<()>, req: Request) -> Response {
        let endpoint: BoxHandler<()> = Arc::new(|_req: Request, _cx: RequestContext<()>| async {
            Ok::<_, HandlerError>(Response::new(Body::from("inner")))
        });
        let cx = RequestContext::new(
            HashMap::new(),
            HashMap::new(),
            HashMap::new(),
            Arc::new(()),
            ExecutionContext::default(),
        );
        compose(vec![middleware(policy)], endpoint)
            .run(req, cx)
            .await
            .unwrap()
    }

    pub fn request(method: Method, uri: &str, headers: &[(&'static str, &'static str)]) -> Request {
        let mut builder = axum::http::Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::empty()).unwrap()
    }

    pub async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }
}
