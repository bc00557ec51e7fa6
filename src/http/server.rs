//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with a single fallback into the gateway
//! - Wire up tower layers (tracing, timeout, body limit)
//! - Give every request an execution context (deferred work, cancellation)
//! - Track deferred work server-wide and drain it on shutdown
//!
//! # Design Decisions
//! - Axum does transport only; all routing decisions live in the gateway
//! - Deferred work never delays a response
//! - Shutdown waits for deferred work up to `timeouts.drain_secs`

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::{SecurityConfig, TimeoutConfig};
use crate::lifecycle::shutdown::wait_for_shutdown;
use crate::routing::context::{CancellationScope, DeferredTasks, ExecutionContext};
use crate::routing::dispatch::Entrypoint;
use crate::routing::middleware::{Request, Response};

/// Shared state of the fallback handler.
struct ServeState<E> {
    entry: Entrypoint<E>,
    env: Arc<E>,
    cancel: watch::Receiver<bool>,
    deferred: DeferredTasks,
}

impl<E> Clone for ServeState<E> {
    fn clone(&self) -> Self {
        Self {
            entry: self.entry.clone(),
            env: self.env.clone(),
            cancel: self.cancel.clone(),
            deferred: self.deferred.clone(),
        }
    }
}

/// HTTP server hosting one gateway.
pub struct HttpServer<E> {
    router: Router,
    deferred: DeferredTasks,
    cancel: watch::Receiver<bool>,
    drain_timeout: Duration,
    _env: std::marker::PhantomData<fn() -> E>,
}

impl<E: Send + Sync + 'static> HttpServer<E> {
    /// Create a server. `cancel` flips to `true` when shutdown starts.
    pub fn new(
        entry: Entrypoint<E>,
        env: Arc<E>,
        timeouts: &TimeoutConfig,
        security: &SecurityConfig,
        cancel: watch::Receiver<bool>,
    ) -> Self {
        let deferred = DeferredTasks::new();
        let state = ServeState {
            entry,
            env,
            cancel: cancel.clone(),
            deferred: deferred.clone(),
        };

        Self {
            router: Self::build_router(timeouts, security, state),
            deferred,
            cancel,
            drain_timeout: Duration::from_secs(timeouts.drain_secs),
            _env: std::marker::PhantomData,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(timeouts: &TimeoutConfig, security: &SecurityConfig, state: ServeState<E>) -> Router {
        Router::new()
            .fallback(gateway_handler::<E>)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(RequestBodyLimitLayer::new(security.max_body_size))
                    .layer(TimeoutLayer::new(Duration::from_secs(timeouts.request_secs))),
            )
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until shutdown, then drain deferred work.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(wait_for_shutdown(self.cancel.clone()))
            .await?;

        tracing::info!("HTTP server stopped accepting");
        drain_background(&self.deferred, self.drain_timeout).await;
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Wait for outstanding deferred work, aborting whatever is left at the deadline.
async fn drain_background(deferred: &DeferredTasks, timeout: Duration) {
    let outstanding = deferred.pending();
    if outstanding == 0 {
        return;
    }

    tracing::info!(tasks = outstanding, "Draining deferred work");
    let aborts = deferred.abort_handles();
    if tokio::time::timeout(timeout, deferred.drain()).await.is_err() {
        let remaining = aborts.iter().filter(|handle| !handle.is_finished()).count();
        tracing::warn!(remaining, "Drain deadline reached, aborting deferred work");
        for handle in aborts {
            handle.abort();
        }
    }
}

/// Fallback handler: every request goes through the gateway. Deferred work
/// lands in the server's tracker, so it outlives a timed-out or dropped
/// request.
async fn gateway_handler<E: Send + Sync + 'static>(
    State(state): State<ServeState<E>>,
    request: Request,
) -> Response {
    let execution = ExecutionContext::with_tasks(
        CancellationScope::new(state.cancel.clone()),
        state.deferred.clone(),
    );
    state.entry.fetch(request, state.env.clone(), execution).await
}
