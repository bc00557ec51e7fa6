//! Page-view route handlers.
//!
//! # Responsibilities
//! - Record a visit from the pixel beacon (deferred store write)
//! - Serve view counts and session lists, cached in the store
//! - Serve a single stored session
//!
//! # Design Decisions
//! - The beacon answers before the write lands (`wait_until`)
//! - Aggregates are cached under their own keys with an expiration ttl;
//!   cache refreshes are deferred too
//! - Store failures propagate to the error boundary

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::GatewayConfig;
use crate::http::request::{client_ip, header_str};
use crate::http::response::{error_response, json_response};
use crate::pageviews::models::{PageState, PageView, PageViewInfo, SessionInfo, SessionRef};
use crate::pageviews::session::{is_valid_session_id, now_iso, session_id_today, PIXEL_PNG};
use crate::routing::context::RequestContext;
use crate::routing::error::HandlerError;
use crate::routing::middleware::{HandlerResult, Request, Response};
use crate::security::origin::request_hostname;
use crate::store::{GetOptions, KvStore, ListOptions, ListResult, PutOptions};

/// Header telling whether an aggregate came from the cache.
pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

const UNKNOWN: &str = "unknown";

/// Environment handed to every page-view handler.
pub struct AppEnv {
    pub store: Arc<dyn KvStore>,
    /// Lifetime of cached aggregates.
    pub cache_ttl_secs: u64,
    /// Expiry of recorded views; `None` keeps them.
    pub view_ttl_secs: Option<u64>,
    cache_control: HeaderValue,
}

impl AppEnv {
    pub fn new(store: Arc<dyn KvStore>, config: &GatewayConfig) -> Self {
        let ttl = config.cache.ttl_secs;
        let cache_control =
            HeaderValue::from_str(&format!("public, max-age={ttl}, stale-while-revalidate={ttl}"))
                .unwrap_or_else(|_| HeaderValue::from_static("no-cache"));

        Self {
            store,
            cache_ttl_secs: ttl,
            view_ttl_secs: config.store.view_ttl_secs,
            cache_control,
        }
    }

    fn read_options(&self) -> GetOptions {
        GetOptions {
            cache_ttl_secs: Some(self.cache_ttl_secs),
        }
    }

    fn cached_json<T: Serialize>(&self, body: &T, cache: &'static str) -> Response {
        let mut response = json_response(StatusCode::OK, body);
        let headers = response.headers_mut();
        headers.insert(X_CACHE, HeaderValue::from_static(cache));
        headers.insert(header::CACHE_CONTROL, self.cache_control.clone());
        response
    }
}

fn required_param(cx: &RequestContext<AppEnv>, name: &str) -> Result<String, HandlerError> {
    cx.param(name)
        .map(str::to_string)
        .ok_or_else(|| HandlerError::other(format!("route parameter {name} missing")))
}

/// `GET /view.png?id=<postId>`
pub async fn view_pixel(req: Request, cx: RequestContext<AppEnv>) -> HandlerResult {
    let Some(post_id) = cx.query("id") else {
        return Ok(error_response(StatusCode::BAD_REQUEST, "Bad Request, please check postId"));
    };

    let headers = req.headers();
    let hostname = request_hostname(headers).unwrap_or_else(|| UNKNOWN.to_string());
    let ip = client_ip(headers).unwrap_or(UNKNOWN);
    let user_agent = header_str(headers, header::USER_AGENT.as_str()).unwrap_or(UNKNOWN);

    let sid = session_id_today(post_id, ip, user_agent);
    let key = format!("view:{post_id}:{sid}");
    let view = PageView {
        sid,
        user_agent: user_agent.to_string(),
        date: now_iso(),
        hostname,
    };

    let store = cx.env().store.clone();
    let options = PutOptions {
        expiration_ttl_secs: cx.env().view_ttl_secs,
    };
    cx.wait_until(async move {
        match store.put_json(&key, &view, options).await {
            Ok(()) => tracing::debug!(key = %key, "Page view recorded"),
            Err(e) => tracing::error!(key = %key, error = %e, "Failed to record page view"),
        }
    });

    let response = axum::http::Response::builder()
        .header(header::CONTENT_TYPE, "image/png")
        .header(header::CACHE_CONTROL, "no-store, no-cache, must-revalidate, max-age=0")
        .header(header::PRAGMA, "no-cache")
        .header(header::EXPIRES, "0")
        .body(Body::from(PIXEL_PNG))?;
    Ok(response)
}

/// `GET /posts/:postId/views`
pub async fn post_views(_req: Request, cx: RequestContext<AppEnv>) -> HandlerResult {
    cached_listing(cx, "views", |post_id, _prefix, page| PageViewInfo {
        id: post_id,
        page_count: page.keys.len(),
        page: page_state(&page),
        last_update: now_iso(),
    })
    .await
}

/// `GET /posts/:postId/sessions`
pub async fn post_sessions(_req: Request, cx: RequestContext<AppEnv>) -> HandlerResult {
    cached_listing(cx, "sessions", |post_id, prefix, page| SessionInfo {
        info: PageViewInfo {
            id: post_id,
            page_count: page.keys.len(),
            page: page_state(&page),
            last_update: now_iso(),
        },
        data: page
            .keys
            .iter()
            .map(|key| SessionRef {
                sid: key.name.strip_prefix(prefix).unwrap_or(&key.name).to_string(),
            })
            .collect(),
    })
    .await
}

/// `GET /posts/:postId/sessions/:sessionId`
pub async fn post_session(_req: Request, cx: RequestContext<AppEnv>) -> HandlerResult {
    let post_id = required_param(&cx, "postId")?;
    let session_id = required_param(&cx, "sessionId")?;

    if !is_valid_session_id(&session_id) {
        return Ok(error_response(StatusCode::BAD_REQUEST, "Bad Request, please check sessionId"));
    }

    let env = cx.env();
    let key = format!("view:{post_id}:{session_id}");
    match env.store.get_json::<PageView>(&key, env.read_options()).await? {
        Some(view) => Ok(env.cached_json(&view, "MISS")),
        None => Ok(error_response(StatusCode::NOT_FOUND, "Not Found")),
    }
}

fn page_state(page: &ListResult) -> PageState {
    PageState {
        has_more: !page.list_complete,
        next_cursor: page.cursor.clone(),
    }
}

/// Serve `<namespace>:cache:<postId>[:<cursor>]` from the store, or list
/// `view:<postId>:` and cache the built body.
async fn cached_listing<T, F>(
    cx: RequestContext<AppEnv>,
    namespace: &'static str,
    build: F,
) -> HandlerResult
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
    F: FnOnce(String, &str, ListResult) -> T + Send,
{
    let post_id = required_param(&cx, "postId")?;
    let cursor = cx.query("cursor").map(str::to_string);
    let env = cx.env().clone();

    let cache_key = match &cursor {
        Some(cursor) => format!("{namespace}:cache:{post_id}:{cursor}"),
        None => format!("{namespace}:cache:{post_id}"),
    };

    if let Some(cached) = env.store.get_json::<T>(&cache_key, env.read_options()).await? {
        tracing::trace!(key = %cache_key, "Cache hit");
        return Ok(env.cached_json(&cached, "HIT"));
    }

    let prefix = format!("view:{post_id}:");
    let page = env
        .store
        .list_keys(ListOptions {
            prefix: prefix.clone(),
            cursor,
            limit: None,
        })
        .await?;

    let body = build(post_id, &prefix, page);
    let response = env.cached_json(&body, "MISS");

    let store = env.store.clone();
    let options = PutOptions {
        expiration_ttl_secs: Some(env.cache_ttl_secs),
    };
    cx.wait_until(async move {
        if let Err(e) = store.put_json(&cache_key, &body, options).await {
            tracing::warn!(key = %cache_key, error = %e, "Failed to refresh cache");
        }
    });

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::context::ExecutionContext;
    use crate::store::MemoryStore;
    use std::collections::HashMap;

    fn env() -> Arc<AppEnv> {
        Arc::new(AppEnv::new(Arc::new(MemoryStore::new()), &GatewayConfig::default()))
    }

    fn context(env: &Arc<AppEnv>, params: &[(&str, &str)], query: &[(&str, &str)]) -> RequestContext<AppEnv> {
        let to_map = |pairs: &[(&str, &str)]| -> HashMap<String, String> {
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
        };
        RequestContext::new(
            to_map(params),
            to_map(query),
            HashMap::new(),
            env.clone(),
            ExecutionContext::default(),
        )
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_pixel_requires_id() {
        let env = env();
        let cx = context(&env, &[], &[]);
        let response = view_pixel(Request::new(Body::empty()), cx).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_pixel_records_after_drain() {
        let env = env();
        let cx = context(&env, &[], &[("id", "42")]);
        let execution = cx.execution().clone();

        let response = view_pixel(Request::new(Body::empty()), cx).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");

        execution.drain().await;
        let page = env
            .store
            .list(ListOptions {
                prefix: "view:42:".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.keys.len(), 1);
    }

    #[tokio::test]
    async fn test_views_miss_then_hit() {
        let env = env();
        for sid in ["a", "b"] {
            env.store
                .put(&format!("view:7:{sid}"), "{}".into(), PutOptions::default())
                .await
                .unwrap();
        }

        let cx = context(&env, &[("postId", "7")], &[]);
        let execution = cx.execution().clone();
        let response = post_views(Request::new(Body::empty()), cx).await.unwrap();
        assert_eq!(response.headers()[X_CACHE], "MISS");
        let body = json_body(response).await;
        assert_eq!(body["pageCount"], 2);
        assert_eq!(body["page"]["has_more"], false);
        execution.drain().await;

        let cx = context(&env, &[("postId", "7")], &[]);
        let response = post_sessions(Request::new(Body::empty()), cx).await.unwrap();
        assert_eq!(response.headers()[X_CACHE], "MISS");
        let body = json_body(response).await;
        assert_eq!(body["data"], serde_json::json!([{ "sid": "a" }, { "sid": "b" }]));

        let cx = context(&env, &[("postId", "7")], &[]);
        let response = post_views(Request::new(Body::empty()), cx).await.unwrap();
        assert_eq!(response.headers()[X_CACHE], "HIT");
        assert_eq!(
            response.headers()[header::CACHE_CONTROL],
            "public, max-age=300, stale-while-revalidate=300"
        );
    }

    #[tokio::test]
    async fn test_session_detail() {
        let env = env();
        let sid = "W1aMI4zb8q8bJG5onQaZMQ";
        let view = PageView {
            sid: sid.into(),
            user_agent: "Mozilla/5.0".into(),
            date: "2024-05-01T00:00:00.000Z".into(),
            hostname: "localhost".into(),
        };
        env.store
            .put_json(&format!("view:42:{sid}"), &view, PutOptions::default())
            .await
            .unwrap();

        let cx = context(&env, &[("postId", "42"), ("sessionId", sid)], &[]);
        let response = post_session(Request::new(Body::empty()), cx).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["userAgent"], "Mozilla/5.0");

        let cx = context(&env, &[("postId", "43"), ("sessionId", sid)], &[]);
        let response = post_session(Request::new(Body::empty()), cx).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let cx = context(&env, &[("postId", "42"), ("sessionId", "short")], &[]);
        let response = post_session(Request::new(Body::empty()), cx).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_bad_cursor_is_store_error() {
        let env = env();
        let cx = context(&env, &[("postId", "7")], &[("cursor", "!!")]);
        let err = post_views(Request::new(Body::empty()), cx).await.unwrap_err();
        assert!(matches!(
            err,
            HandlerError::Store(crate::store::StoreError::InvalidCursor(_))
        ));
    }
}
