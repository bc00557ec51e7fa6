//! In-memory store backend.
//!
//! Fast but non-persistent; contents are lost on restart. Expired entries are
//! dropped lazily on read and swept on list.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use dashmap::DashMap;
use tokio::time::Instant;

use crate::store::{
    GetOptions, KeyInfo, KvStore, ListOptions, ListResult, PutOptions, StoreError,
    DEFAULT_LIST_LIMIT, MIN_EXPIRATION_TTL_SECS,
};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// DashMap-backed [`KvStore`].
#[derive(Debug, Clone)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, Entry>>,
    list_limit: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_list_limit(DEFAULT_LIST_LIMIT)
    }

    /// Store whose listings return at most `list_limit` keys per page.
    pub fn with_list_limit(list_limit: usize) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            list_limit: list_limit.max(1),
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| !e.value().is_expired(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn encode_cursor(last_key: &str) -> String {
    URL_SAFE_NO_PAD.encode(last_key.as_bytes())
}

fn decode_cursor(cursor: &str) -> Result<String, StoreError> {
    URL_SAFE_NO_PAD
        .decode(cursor)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or_else(|| StoreError::InvalidCursor(cursor.to_string()))
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str, _options: GetOptions) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        }
        Ok(None)
    }

    async fn put(&self, key: &str, value: String, options: PutOptions) -> Result<(), StoreError> {
        let expires_at = match options.expiration_ttl_secs {
            Some(ttl) if ttl < MIN_EXPIRATION_TTL_SECS => return Err(StoreError::InvalidTtl(ttl)),
            Some(ttl) => Some(Instant::now() + Duration::from_secs(ttl)),
            None => None,
        };

        self.entries.insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn list(&self, options: ListOptions) -> Result<ListResult, StoreError> {
        let after = options.cursor.as_deref().map(decode_cursor).transpose()?;
        let limit = options.limit.unwrap_or(self.list_limit).clamp(1, self.list_limit);

        let now = Instant::now();
        self.entries.retain(|_, entry| !entry.is_expired(now));

        let mut names: Vec<String> = self
            .entries
            .iter()
            .map(|entry| entry.key().clone())
            .filter(|name| name.starts_with(&options.prefix))
            .filter(|name| after.as_ref().map_or(true, |after| name > after))
            .collect();
        names.sort();

        let list_complete = names.len() <= limit;
        names.truncate(limit);

        let cursor = if list_complete {
            None
        } else {
            names.last().map(|last| encode_cursor(last))
        };

        Ok(ListResult {
            keys: names.into_iter().map(|name| KeyInfo { name }).collect(),
            list_complete,
            cursor,
        })
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
