//! Per-request context handed to middlewares and handlers.
//!
//! # Responsibilities
//! - Carry params, query and cookie maps for one request
//! - Expose the platform environment (`Arc<E>`)
//! - Register deferred work that must not delay the response
//! - Expose an advisory cancellation scope

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};

use crate::observability::metrics;
use crate::routing::decode::{CookieMap, QueryMap};
use crate::routing::matcher::Params;

/// Advisory cancellation signal propagated from the platform.
///
/// The router never polls it; collaborators may.
#[derive(Debug, Clone, Default)]
pub struct CancellationScope {
    rx: Option<watch::Receiver<bool>>,
}

impl CancellationScope {
    /// A scope that is never cancelled.
    pub fn never() -> Self {
        Self { rx: None }
    }

    pub fn new(rx: watch::Receiver<bool>) -> Self {
        Self { rx: Some(rx) }
    }

    /// Returns true once cancellation has been signalled.
    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
    }

    /// Resolves when cancellation is signalled. Pends forever for
    /// [`CancellationScope::never`] or when the sender goes away.
    pub async fn cancelled(&self) {
        match self.rx.clone() {
            Some(mut rx) => {
                let closed = rx.wait_for(|cancelled| *cancelled).await.is_err();
                if closed {
                    std::future::pending::<()>().await;
                }
            }
            None => std::future::pending::<()>().await,
        }
    }
}

/// Handles of spawned deferred work.
///
/// Tasks are started with `tokio::spawn`, so dropping a request (timeout,
/// client disconnect) detaches them instead of aborting them. The server
/// shares one tracker across requests and drains it on shutdown.
#[derive(Debug, Clone, Default)]
pub struct DeferredTasks {
    handles: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl DeferredTasks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.handles.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Spawn `future` and keep its handle.
    pub fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(future);
        let mut handles = self.lock();
        handles.retain(|handle| !handle.is_finished());
        handles.push(handle);
    }

    /// Tasks not yet finished.
    pub fn pending(&self) -> usize {
        self.lock().iter().filter(|handle| !handle.is_finished()).count()
    }

    /// Abort handles for every tracked task, for enforcing a deadline.
    pub fn abort_handles(&self) -> Vec<AbortHandle> {
        self.lock().iter().map(JoinHandle::abort_handle).collect()
    }

    /// Wait for every tracked task, including ones spawned while draining.
    pub async fn drain(&self) {
        loop {
            let handles = std::mem::take(&mut *self.lock());
            if handles.is_empty() {
                return;
            }
            for handle in handles {
                if let Err(e) = handle.await {
                    tracing::error!(error = %e, "Deferred task failed");
                }
            }
        }
    }
}

/// Platform execution context for one request: deferred work plus
/// cancellation.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    tasks: DeferredTasks,
    cancellation: CancellationScope,
}

impl ExecutionContext {
    /// Context with its own task tracker.
    pub fn new(cancellation: CancellationScope) -> Self {
        Self::with_tasks(cancellation, DeferredTasks::new())
    }

    /// Context whose deferred work lands in a shared tracker.
    pub fn with_tasks(cancellation: CancellationScope, tasks: DeferredTasks) -> Self {
        Self {
            tasks,
            cancellation,
        }
    }

    /// Schedule background work. It starts immediately, is not awaited by
    /// the dispatcher and keeps running if the request is dropped.
    pub fn wait_until<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        metrics::record_deferred_task();
        self.tasks.spawn(future);
    }

    /// Number of deferred tasks still running.
    pub fn pending(&self) -> usize {
        self.tasks.pending()
    }

    /// Wait for every deferred task registered so far.
    pub async fn drain(&self) {
        self.tasks.drain().await;
    }

    pub fn tasks(&self) -> &DeferredTasks {
        &self.tasks
    }

    pub fn cancellation(&self) -> &CancellationScope {
        &self.cancellation
    }
}

/// Context shared by every layer of a composed handler.
pub struct RequestContext<E> {
    /// Route parameters (empty for fallback handlers).
    pub params: Params,
    /// Decoded query string.
    pub query: QueryMap,
    /// Decoded cookie header.
    pub cookie: CookieMap,
    env: Arc<E>,
    execution: ExecutionContext,
}

impl<E> Clone for RequestContext<E> {
    fn clone(&self) -> Self {
        Self {
            params: self.params.clone(),
            query: self.query.clone(),
            cookie: self.cookie.clone(),
            env: self.env.clone(),
            execution: self.execution.clone(),
        }
    }
}

impl<E> RequestContext<E> {
    pub fn new(
        params: Params,
        query: QueryMap,
        cookie: CookieMap,
        env: Arc<E>,
        execution: ExecutionContext,
    ) -> Self {
        Self {
            params,
            query,
            cookie,
            env,
            execution,
        }
    }

    /// Platform environment.
    pub fn env(&self) -> &Arc<E> {
        &self.env
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookie.get(name).map(String::as_str)
    }

    /// See [`ExecutionContext::wait_until`].
    pub fn wait_until<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.execution.wait_until(future);
    }

    pub fn execution(&self) -> &ExecutionContext {
        &self.execution
    }

    pub fn cancellation(&self) -> &CancellationScope {
        self.execution.cancellation()
    }
}
