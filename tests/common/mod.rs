//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use pageview_gateway::config::GatewayConfig;
use pageview_gateway::lifecycle::startup::build_server;
use pageview_gateway::lifecycle::Shutdown;
use pageview_gateway::routing::{Entrypoint, ExecutionContext};

/// A browser user agent that passes the bot filter.
pub const BROWSER_UA: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0 Safari/537.36";

pub const API_TOKEN: &str = "test-token";

pub const ALLOWED_ORIGIN: &str = "https://blog.example";

/// Config for live-server tests: known token and origin, no metrics.
pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.auth.api_token = API_TOKEN.to_string();
    config.cors.origins = vec![ALLOWED_ORIGIN.to_string()];
    config.referer.origins = vec![ALLOWED_ORIGIN.to_string()];
    config.observability.metrics_enabled = false;
    config
}

/// A running gateway on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Arc<Shutdown>,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger shutdown and wait for the server (and its drains) to finish.
    pub async fn stop(self) {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("server did not stop")
            .expect("server task panicked");
    }
}

/// Start the page-view gateway with `config` on 127.0.0.1:0.
pub async fn start_gateway(config: GatewayConfig) -> TestServer {
    let shutdown = Arc::new(Shutdown::new());
    let server = build_server(&config, &shutdown).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        server.run(listener).await.unwrap();
    });

    TestServer {
        addr,
        shutdown,
        handle,
    }
}

/// HTTP client that looks like a browser to the gateway.
pub fn browser_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(BROWSER_UA)
        .build()
        .unwrap()
}

/// Dispatch one request in-process and drain its deferred work.
pub async fn fetch<E: Send + Sync + 'static>(
    entry: &Entrypoint<E>,
    env: Arc<E>,
    request: Request<Body>,
) -> Response {
    let execution = ExecutionContext::default();
    let response = entry.fetch(request, env, execution.clone()).await;
    execution.drain().await;
    response
}

pub fn request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}
