//! Page-view service: routes, policies and the error fallback.
//!
//! # Data Flow
//! ```text
//! GET /view.png?id=<postId>
//!     → user agent → referer → view_pixel
//!     → 1x1 PNG now, PageView stored later (wait_until)
//!
//! GET /posts/:postId/{views,sessions}
//!     → user agent → cors → token → post_views / post_sessions
//!     → cache hit: stored aggregate
//!     → cache miss: list view:<postId>: → aggregate → cache (wait_until)
//!
//! GET /posts/:postId/sessions/:sessionId
//!     → user agent → cors → token → post_session → stored PageView
//! ```

pub mod handlers;
pub mod models;
pub mod session;

use axum::http::StatusCode;

use crate::config::GatewayConfig;
use crate::http::request::RequestHead;
use crate::http::response::error_response;
use crate::routing::context::RequestContext;
use crate::routing::dispatch::Entrypoint;
use crate::routing::error::{HandlerError, RouterError};
use crate::routing::middleware::{middleware, Response};
use crate::routing::router::Gateway;
use crate::security::{Cors, VerifyReferer, VerifyToken, VerifyUserAgent};
use crate::store::StoreError;

pub use handlers::AppEnv;

/// Install the policies, routes and error fallback on `gateway`.
pub fn register(gateway: &mut Gateway<AppEnv>, config: &GatewayConfig) -> Result<(), RouterError> {
    if config.bot_filter.enabled {
        gateway.use_global(VerifyUserAgent::new(&config.bot_filter));
    }
    if config.referer.enabled {
        gateway.use_prefix("/view.png", [middleware(VerifyReferer::new(&config.referer))])?;
    }
    // cors before auth, so preflights never need a token
    if config.cors.enabled {
        gateway.use_prefix("/posts", [middleware(Cors::new(&config.cors))])?;
    }
    if config.auth.enabled {
        gateway.use_prefix("/posts", [middleware(VerifyToken::new(&config.auth))])?;
    }

    gateway
        .get("/view.png", handlers::view_pixel)?
        .get("/posts/:postId/views", handlers::post_views)?
        .get("/posts/:postId/sessions", handlers::post_sessions)?
        .get("/posts/:postId/sessions/:sessionId", handlers::post_session)?
        .on_error(on_error);

    Ok(())
}

/// Gateway with every page-view route, frozen for serving.
pub fn build_gateway(config: &GatewayConfig) -> Result<Entrypoint<AppEnv>, RouterError> {
    let mut gateway = Gateway::with_config(&config.router);
    register(&mut gateway, config)?;
    Ok(gateway.export())
}

async fn on_error(head: RequestHead, _cx: RequestContext<AppEnv>, error: HandlerError) -> Response {
    match error {
        HandlerError::Store(StoreError::InvalidCursor(cursor)) => {
            tracing::warn!(path = %head.uri.path(), cursor = %cursor, "Rejected list cursor");
            error_response(StatusCode::BAD_REQUEST, "Bad Request, please check cursor")
        }
        _ => error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"),
    }
}
