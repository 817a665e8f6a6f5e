//! Key-value cache for read models and counters.
//!
//! `CacheStore` is the backend contract: raw string values with a per-entry
//! TTL, glob deletion and an atomic windowed counter. JSON helpers and
//! read-through live on `dyn CacheStore` so every backend gets them.
//!
//! Cache failures never fail a request: they are logged and treated as misses.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use glob::{MatchOptions, Pattern};
use moka::Expiry;
use moka::future::Cache;
use redis::{AsyncCommands, Client};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Cache errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Backend unavailable or command failed.
    #[error("Cache backend error: {0}")]
    Backend(String),
    /// Value could not be encoded or decoded.
    #[error("Cache serialization error: {0}")]
    Serialization(String),
}

impl CacheError {
    /// Returns the error code for logs.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Backend(_) => "CACHE_BACKEND_ERROR",
            Self::Serialization(_) => "CACHE_SERIALIZATION_ERROR",
        }
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        Self::Backend(err.to_string())
    }
}

/// State of a windowed counter after an increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counter {
    /// Hits inside the current window, including this one.
    pub count: u64,
    /// Time until the window resets.
    pub resets_in: Duration,
}

/// Cache backend contract.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Reads a raw value.
    async fn get_raw(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Stores a raw value with a TTL.
    async fn set_raw(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Deletes one key.
    async fn del(&self, key: &str) -> Result<(), CacheError>;

    /// Deletes every key matching a glob (`*`, `?`). Returns how many were removed.
    async fn del_pattern(&self, pattern: &str) -> Result<u64, CacheError>;

    /// Atomically increments a counter whose window starts at the first hit.
    async fn incr(&self, key: &str, window: Duration) -> Result<Counter, CacheError>;
}

/// A value returned by `read_through` together with whether it came from cache.
#[derive(Debug, Clone)]
pub struct Cached<T> {
    /// The value.
    pub value: T,
    /// True when served from cache.
    pub hit: bool,
}

impl dyn CacheStore {
    /// Reads and decodes a JSON value. Errors are logged and reported as a miss.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.get_raw(key).await {
            Ok(raw) => raw?,
            Err(err) => {
                tracing::warn!(key, error = %err, "cache read failed");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(key, error = %err, "discarding undecodable cache entry");
                None
            }
        }
    }

    /// Encodes and stores a JSON value. Errors are logged.
    pub async fn set_json<T: Serialize + Sync>(&self, key: &str, value: &T, ttl: Duration) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(key, error = %err, "cache value not serializable");
                return;
            }
        };
        if let Err(err) = self.set_raw(key, raw, ttl).await {
            tracing::warn!(key, error = %err, "cache write failed");
        }
    }

    /// Returns the cached value or computes, stores and returns a fresh one.
    ///
    /// # Errors
    ///
    /// Returns the error of `compute`; cache errors are swallowed.
    pub async fn read_through<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> Result<Cached<T>, E>
    where
        T: Serialize + DeserializeOwned + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
    {
        if let Some(value) = self.get_json::<T>(key).await {
            tracing::debug!(key, "cache hit");
            return Ok(Cached { value, hit: true });
        }
        let value = compute().await?;
        self.set_json(key, &value, ttl).await;
        Ok(Cached { value, hit: false })
    }

    /// Deletes exact keys and glob patterns. Errors are logged.
    pub async fn invalidate(&self, keys: &[String], patterns: &[String]) {
        for key in keys {
            if let Err(err) = self.del(key).await {
                tracing::warn!(key = %key, error = %err, "cache delete failed");
            }
        }
        for pattern in patterns {
            match self.del_pattern(pattern).await {
                Ok(removed) => tracing::debug!(pattern = %pattern, removed, "cache pattern cleared"),
                Err(err) => tracing::warn!(pattern = %pattern, error = %err, "cache pattern delete failed"),
            }
        }
    }
}

/// Matches `text` against a glob with `*` (any run) and `?` (one char).
///
/// Separators are not special, so `*` also spans `/` and `:`. An invalid
/// pattern matches nothing.
#[must_use]
pub fn glob_match(pattern: &str, text: &str) -> bool {
    const OPTIONS: MatchOptions = MatchOptions {
        case_sensitive: true,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };
    match Pattern::new(pattern) {
        Ok(glob) => glob.matches_with(text, OPTIONS),
        Err(err) => {
            tracing::warn!(pattern, error = %err, "invalid cache key pattern");
            false
        }
    }
}

// ============================================================================
// Moka backend
// ============================================================================

#[derive(Debug, Clone)]
enum SlotValue {
    Text(Arc<str>),
    Counter(u64),
}

#[derive(Debug, Clone)]
struct Slot {
    value: SlotValue,
    expires_at: Instant,
}

struct SlotExpiry;

impl Expiry<String, Slot> for SlotExpiry {
    fn expire_after_create(&self, _key: &String, value: &Slot, _created_at: Instant) -> Option<Duration> {
        Some(value.expires_at.saturating_duration_since(Instant::now()))
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Slot,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.expires_at.saturating_duration_since(Instant::now()))
    }
}

/// In-process cache backed by `moka`, with per-entry TTLs.
#[derive(Clone)]
pub struct MokaCacheStore {
    cache: Cache<String, Slot>,
}

impl MokaCacheStore {
    /// Creates a store holding at most `max_capacity` entries.
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(SlotExpiry)
            .build();
        Self { cache }
    }

    /// Runs pending maintenance (expiry, eviction).
    pub async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }

    /// Approximate number of live entries.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for MokaCacheStore {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl CacheStore for MokaCacheStore {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.cache.get(key).await.and_then(|slot| match slot.value {
            SlotValue::Text(text) if slot.expires_at > Instant::now() => Some(text.to_string()),
            _ => None,
        }))
    }

    async fn set_raw(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let slot = Slot {
            value: SlotValue::Text(Arc::from(value)),
            expires_at: Instant::now() + ttl,
        };
        self.cache.insert(key.to_string(), slot).await;
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        self.cache.invalidate(key).await;
        Ok(())
    }

    async fn del_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        let matching: Vec<Arc<String>> = self
            .cache
            .iter()
            .filter(|(key, _)| glob_match(pattern, key))
            .map(|(key, _)| key)
            .collect();
        let mut removed = 0;
        for key in matching {
            if self.cache.remove(key.as_str()).await.is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn incr(&self, key: &str, window: Duration) -> Result<Counter, CacheError> {
        let entry = self
            .cache
            .entry(key.to_string())
            .and_upsert_with(|existing| {
                let now = Instant::now();
                let next = match existing.map(moka::Entry::into_value) {
                    Some(Slot {
                        value: SlotValue::Counter(count),
                        expires_at,
                    }) if expires_at > now => Slot {
                        value: SlotValue::Counter(count + 1),
                        expires_at,
                    },
                    _ => Slot {
                        value: SlotValue::Counter(1),
                        expires_at: now + window,
                    },
                };
                std::future::ready(next)
            })
            .await;
        let slot = entry.into_value();
        let count = match slot.value {
            SlotValue::Counter(count) => count,
            SlotValue::Text(_) => 1,
        };
        Ok(Counter {
            count,
            resets_in: slot.expires_at.saturating_duration_since(Instant::now()),
        })
    }
}

// ============================================================================
// Redis backend
// ============================================================================

/// Shared cache backed by Redis.
#[derive(Clone)]
pub struct RedisCacheStore {
    client: Client,
}

impl RedisCacheStore {
    /// Opens a client for `redis_url`. Connections are made per command.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn connect(redis_url: &str) -> Result<Self, CacheError> {
        let client = Client::open(redis_url)?;
        Ok(Self { client })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, CacheError> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection().await?;
        Ok(conn.get(key).await?)
    }

    async fn set_raw(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let () = conn.set_ex(key, value, ttl.as_secs().max(1)).await?;
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let _: u64 = conn.del(key).await?;
        Ok(())
    }

    async fn del_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        let mut conn = self.connection().await?;
        let mut cursor: u64 = 0;
        let mut removed = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(500)
                .query_async(&mut conn)
                .await?;
            if !keys.is_empty() {
                let deleted: u64 = conn.del(keys).await?;
                removed += deleted;
            }
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(removed)
    }

    async fn incr(&self, key: &str, window: Duration) -> Result<Counter, CacheError> {
        let mut conn = self.connection().await?;
        let count: u64 = conn.incr(key, 1_u64).await?;
        let window_secs = i64::try_from(window.as_secs().max(1)).unwrap_or(i64::MAX);
        if count == 1 {
            let () = conn.expire(key, window_secs).await?;
        }
        let ttl: i64 = conn.ttl(key).await?;
        let remaining = u64::try_from(ttl).unwrap_or_else(|_| window.as_secs());
        Ok(Counter {
            count,
            resets_in: Duration::from_secs(remaining),
        })
    }
}
