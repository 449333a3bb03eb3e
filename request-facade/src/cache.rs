use crate::envelope::Outcome;
use crate::error::Error;
use crate::request_options::RequestConfig;
use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, Shared};
use futures::{Future, FutureExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[cfg(feature = "graphql")]
use async_graphql::SimpleObject;

/// What every caller sharing a pending request eventually receives.
pub type SettledResult = Result<Outcome<Arc<Value>>, Error>;

/// A request result that can be awaited by any number of callers.
pub type PendingResult = Shared<BoxFuture<'static, SettledResult>>;

/// Configuration for the request cache
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached entries
    pub max_entries: usize,
    /// Whether caching is enabled at all; when off every call dispatches
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            enabled: true,
        }
    }
}

/// Cache key derived from the canonical form of a request
#[derive(Hash, Eq, PartialEq, Clone, Debug)]
pub struct CacheKey(String);

impl CacheKey {
    /// Hash of method, url, params and body. Object keys are sorted first so
    /// `{a, b}` and `{b, a}` map to the same entry.
    pub fn from_request(config: &RequestConfig) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(config.method().to_string().as_bytes());
        hasher.update(b"\n");
        hasher.update(config.url().as_bytes());
        hasher.update(b"\n");
        hasher.update(canonical_json(config.params().as_ref().unwrap_or(&Value::Null)).as_bytes());
        hasher.update(b"\n");
        hasher.update(canonical_json(config.body().as_ref().unwrap_or(&Value::Null)).as_bytes());

        CacheKey(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, value)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(value, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}

/// A pending or settled request kept for its retention window
#[derive(Clone)]
pub struct CachedRequest {
    pub pending: PendingResult,
    pub created_at: DateTime<Utc>,
    pub ttl: Duration,
    /// `None` when the retention reaches past the representable range.
    expires_at: Option<DateTime<Utc>>,
    generation: u64,
}

impl CachedRequest {
    fn new(pending: PendingResult, ttl: Duration, generation: u64) -> Self {
        let created_at = Utc::now();
        Self {
            pending,
            created_at,
            ttl,
            expires_at: created_at.checked_add_signed(ttl),
            generation,
        }
    }

    /// Check if the entry is still inside its retention window
    pub fn is_valid(&self) -> bool {
        self.expires_at
            .map_or(true, |expires_at| Utc::now() < expires_at)
    }
}

/// De-duplicating request cache.
///
/// Identical requests issued while one is in flight (or within its retention
/// window) share a single pending result instead of dispatching again.
pub struct RequestCache {
    records: Arc<DashMap<CacheKey, CachedRequest>>,
    next_generation: AtomicU64,
    pub config: CacheConfig,
}

impl Default for RequestCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl RequestCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            records: Arc::new(DashMap::new()),
            next_generation: AtomicU64::new(0),
            config,
        }
    }

    /// Returns the pending result for `config`, sharing an existing one when
    /// an equivalent request is cached. `dispatch_fn` runs only on a miss or
    /// when caching is disabled for the call.
    pub fn use_cache<F, Fut>(&self, config: &RequestConfig, dispatch_fn: F) -> PendingResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = SettledResult> + Send + 'static,
    {
        self.share_or_dispatch(config, dispatch_fn).0
    }

    /// Like [`use_cache`](Self::use_cache), also reporting whether the
    /// returned result is the one built from `dispatch_fn`. It is not when an
    /// equivalent request was cached first, even if `dispatch_fn` already ran.
    pub fn share_or_dispatch<F, Fut>(
        &self,
        config: &RequestConfig,
        dispatch_fn: F,
    ) -> (PendingResult, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = SettledResult> + Send + 'static,
    {
        let ttl = match config.cache_retention() {
            Some(ttl) if self.config.enabled => ttl,
            _ => return (dispatch_fn().boxed().shared(), true),
        };

        let key = CacheKey::from_request(config);
        if let Some(pending) = self.get(&key) {
            log::debug!("Sharing cached request for {} {}", config.method(), config.url());
            return (pending, false);
        }

        if self.records.len() >= self.config.max_entries {
            self.evict_expired();
            if self.records.len() >= self.config.max_entries {
                self.evict_oldest();
            }
        }

        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let pending = self.track_failure(key.clone(), generation, dispatch_fn());

        // Another caller may have stored the same key since the lookup above;
        // ours has not been polled yet, so dropping it dispatches nothing.
        match self.records.entry(key.clone()) {
            Entry::Occupied(entry) if entry.get().is_valid() => {
                return (entry.get().pending.clone(), false);
            }
            Entry::Occupied(mut entry) => {
                entry.insert(CachedRequest::new(pending.clone(), ttl, generation));
            }
            Entry::Vacant(entry) => {
                entry.insert(CachedRequest::new(pending.clone(), ttl, generation));
            }
        }
        log::debug!(
            "Stored request {} {} in cache for {} ms",
            config.method(),
            config.url(),
            ttl.num_milliseconds()
        );

        self.schedule_expiry(key, generation, ttl);
        (pending, true)
    }

    /// Wraps `fut` so a failure drops the entry as soon as it settles.
    fn track_failure<Fut>(&self, key: CacheKey, generation: u64, fut: Fut) -> PendingResult
    where
        Fut: Future<Output = SettledResult> + Send + 'static,
    {
        let records = Arc::clone(&self.records);
        async move {
            let result = fut.await;
            if let Err(err) = &result {
                if records
                    .remove_if(&key, |_, entry| entry.generation == generation)
                    .is_some()
                {
                    log::debug!("Dropped failed request {} from cache: {}", key.as_str(), err);
                }
            }
            result
        }
        .boxed()
        .shared()
    }

    fn schedule_expiry(&self, key: CacheKey, generation: u64, ttl: Duration) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            // Lookups still treat the entry as expired once the ttl passes
            return;
        };
        let Ok(delay) = ttl.to_std() else {
            return;
        };
        let records = Arc::clone(&self.records);
        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if records
                .remove_if(&key, |_, entry| entry.generation == generation)
                .is_some()
            {
                log::debug!("Cache entry {} expired", key.as_str());
            }
        });
    }

    /// Get the pending result for `key` if it is still valid
    pub fn get(&self, key: &CacheKey) -> Option<PendingResult> {
        if let Some(cached) = self.records.get(key) {
            if cached.is_valid() {
                log::debug!("Cache hit for key: {}", key.as_str());
                return Some(cached.pending.clone());
            }
        }

        // Expired entries are removed without holding the read guard above
        if self
            .records
            .remove_if(key, |_, entry| !entry.is_valid())
            .is_some()
        {
            log::debug!("Cache expired for key: {}", key.as_str());
        }
        log::debug!("Cache miss for key: {}", key.as_str());
        None
    }

    pub fn contains(&self, config: &RequestConfig) -> bool {
        self.get(&CacheKey::from_request(config)).is_some()
    }

    /// Drops the entry for `config` if it still holds `pending`.
    pub fn discard(&self, config: &RequestConfig, pending: &PendingResult) -> bool {
        let key = CacheKey::from_request(config);
        let removed = self
            .records
            .remove_if(&key, |_, entry| entry.pending.ptr_eq(pending))
            .is_some();
        if removed {
            log::debug!("Discarded cache entry {}", key.as_str());
        }
        removed
    }

    pub fn remove(&self, key: &CacheKey) -> bool {
        self.records.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Remove expired entries from cache
    pub fn evict_expired(&self) {
        let before = self.records.len();
        self.records.retain(|_, entry| entry.is_valid());
        log::debug!(
            "Evicted {} expired cache entries",
            before.saturating_sub(self.records.len())
        );
    }

    /// Remove oldest entries when at capacity
    fn evict_oldest(&self) {
        let mut entries: Vec<_> = self
            .records
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().created_at))
            .collect();

        // Sort by creation time (oldest first)
        entries.sort_by_key(|(_, created_at)| *created_at);

        // Remove oldest 25% of entries
        let to_remove = (self.config.max_entries / 4).max(1);
        for (key, _) in entries.into_iter().take(to_remove) {
            self.records.remove(&key);
        }

        log::debug!("Evicted {} oldest cache entries", to_remove);
    }

    /// Clear all cache entries
    pub fn clear(&self) {
        self.records.clear();
        log::info!("Request cache cleared");
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let total_entries = self.records.len();
        let expired_entries = self
            .records
            .iter()
            .filter(|entry| !entry.value().is_valid())
            .count();

        CacheStats {
            total_entries,
            valid_entries: total_entries.saturating_sub(expired_entries),
            expired_entries,
            max_entries: self.config.max_entries,
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "graphql", derive(SimpleObject))]
pub struct CacheStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
    pub max_entries: usize,
}

/// Thread-safe wrapper for the cache
pub type SharedRequestCache = Arc<RequestCache>;
