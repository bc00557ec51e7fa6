//! Key-value storage for page views and cached aggregates.
//!
//! # Data Flow
//! ```text
//! handlers
//!     → KvStore::get / get_json   (cache lookups, session detail)
//!     → KvStore::list             (views / sessions pages)
//!     → KvStore::put              (deferred via wait_until)
//!     → backend (memory.rs)
//! ```
//!
//! # Design Decisions
//! - Values are opaque strings; JSON helpers live on `dyn KvStore`
//! - Keys are listed in lexical order with opaque cursors
//! - `cache_ttl_secs` on reads is a hint a backend may ignore

pub mod memory;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::observability::metrics;

pub use memory::MemoryStore;

/// Smallest accepted `expiration_ttl_secs`.
pub const MIN_EXPIRATION_TTL_SECS: u64 = 60;

/// Default and maximum page size of [`KvStore::list`].
pub const DEFAULT_LIST_LIMIT: usize = 1000;

/// Errors raised by a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid list cursor \"{0}\"")]
    InvalidCursor(String),

    #[error("expiration ttl {0}s is below the {MIN_EXPIRATION_TTL_SECS}s minimum")]
    InvalidTtl(u64),

    #[error("stored value is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Read options.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetOptions {
    /// How long an edge cache may keep the value.
    pub cache_ttl_secs: Option<u64>,
}

/// Write options.
#[derive(Debug, Clone, Copy, Default)]
pub struct PutOptions {
    /// Seconds until the key expires; `None` keeps it forever.
    pub expiration_ttl_secs: Option<u64>,
}

/// Listing options.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub prefix: String,
    /// Cursor returned by the previous page.
    pub cursor: Option<String>,
    /// Page size; `None` means the backend default.
    pub limit: Option<usize>,
}

/// A listed key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInfo {
    pub name: String,
}

/// One page of a listing.
#[derive(Debug, Clone, Default)]
pub struct ListResult {
    pub keys: Vec<KeyInfo>,
    /// True when no keys remain after this page.
    pub list_complete: bool,
    /// Present only when `list_complete` is false.
    pub cursor: Option<String>,
}

/// Eventually-consistent key-value store.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Get a value; expired keys read as absent.
    async fn get(&self, key: &str, options: GetOptions) -> Result<Option<String>, StoreError>;

    /// Insert or replace a value.
    async fn put(&self, key: &str, value: String, options: PutOptions) -> Result<(), StoreError>;

    /// List keys by prefix in lexical order.
    async fn list(&self, options: ListOptions) -> Result<ListResult, StoreError>;

    /// Backend name for logs.
    fn name(&self) -> &'static str;
}

impl dyn KvStore {
    /// Get and deserialize a JSON value.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        key: &str,
        options: GetOptions,
    ) -> Result<Option<T>, StoreError> {
        metrics::record_store_operation("get");
        match self.get(key, options).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Serialize and store a JSON value.
    pub async fn put_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        options: PutOptions,
    ) -> Result<(), StoreError> {
        metrics::record_store_operation("put");
        let raw = serde_json::to_string(value)?;
        self.put(key, raw, options).await
    }

    /// [`KvStore::list`] with operation metrics.
    pub async fn list_keys(&self, options: ListOptions) -> Result<ListResult, StoreError> {
        metrics::record_store_operation("list");
        self.list(options).await
    }
}
