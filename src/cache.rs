//! Tag-keyed read cache for rendered page data, plus the revalidation hook
//! that tells an external renderer to drop its copy.

use crate::config::RevalidateConfig;
use crate::constants::DEFAULT_CACHE_CAPACITY;
use crate::error::{CmsError, Result};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

struct CacheEntry {
    value: Value,
    stored_at: Instant,
}

/// Values are stored as JSON so one map can hold every view-model type.
#[derive(Clone)]
pub struct TagCache {
    ttl: Duration,
    capacity: usize,
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl TagCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, DEFAULT_CACHE_CAPACITY)
    }

    /// Expired entries are dropped on every insert; past `capacity` the
    /// oldest entry makes room.
    pub fn with_capacity(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Cached value for `tag`, or the loader's result (which is then cached).
    /// Loader errors are returned and nothing is stored.
    pub fn get_or_load<T, F>(&self, tag: &str, load: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T>,
    {
        self.get_or_load_if(tag, load, |_| true)
    }

    /// Like [`get_or_load`](Self::get_or_load), but a fresh value is only
    /// stored when `keep` accepts it.
    pub fn get_or_load_if<T, F, K>(&self, tag: &str, load: F, keep: K) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T>,
        K: FnOnce(&T) -> bool,
    {
        if let Some(hit) = self.lookup(tag) {
            match serde_json::from_value(hit) {
                Ok(value) => return Ok(value),
                Err(e) => debug!("Cached value for '{}' no longer decodes: {}", tag, e),
            }
        }
        let value = load()?;
        if keep(&value) {
            self.store(tag, serde_json::to_value(&value)?)?;
        }
        Ok(value)
    }

    fn store(&self, tag: &str, value: Value) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| CmsError::Poisoned)?;
        let ttl = self.ttl;
        entries.retain(|_, entry| entry.stored_at.elapsed() <= ttl);
        if entries.len() >= self.capacity && !entries.contains_key(tag) {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.stored_at)
                .map(|(key, _)| key.clone());
            if let Some(key) = oldest {
                entries.remove(&key);
            }
        }
        entries.insert(
            tag.to_string(),
            CacheEntry {
                value,
                stored_at: Instant::now(),
            },
        );
        Ok(())
    }

    fn lookup(&self, tag: &str) -> Option<Value> {
        let entries = self.entries.read().ok()?;
        let entry = entries.get(tag)?;
        if entry.stored_at.elapsed() > self.ttl {
            return None;
        }
        Some(entry.value.clone())
    }

    /// Drops `tag` and its variants (`<tag>|<query>` keys). Returns whether
    /// anything was cached under it.
    pub fn invalidate(&self, tag: &str) -> bool {
        let variant_prefix = format!("{tag}|");
        match self.entries.write() {
            Ok(mut entries) => {
                let before = entries.len();
                entries.retain(|key, _| key != tag && !key.starts_with(&variant_prefix));
                entries.len() != before
            }
            Err(_) => false,
        }
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Notifies whatever renders the public site outside this process.
#[async_trait]
pub trait Revalidator: Send + Sync {
    async fn revalidate(&self, tag: &str) -> Result<()>;
}

/// Used when no webhook is configured.
pub struct NoopRevalidator;

#[async_trait]
impl Revalidator for NoopRevalidator {
    async fn revalidate(&self, _tag: &str) -> Result<()> {
        Ok(())
    }
}

/// POSTs `{ "tag": ... }` to the configured URL with an optional shared secret.
pub struct WebhookRevalidator {
    client: reqwest::Client,
    url: String,
    secret: Option<String>,
}

impl WebhookRevalidator {
    pub fn new(url: String, secret: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client, url, secret }
    }
}

#[async_trait]
impl Revalidator for WebhookRevalidator {
    async fn revalidate(&self, tag: &str) -> Result<()> {
        let mut request = self.client.post(&self.url).json(&serde_json::json!({ "tag": tag }));
        if let Some(secret) = &self.secret {
            request = request.header("x-revalidate-secret", secret);
        }
        let response = request
            .send()
            .await
            .map_err(|e| CmsError::Config(format!("revalidation request failed: {e}")))?;
        if !response.status().is_success() {
            warn!("Revalidation webhook answered {} for tag '{}'", response.status(), tag);
        }
        Ok(())
    }
}

pub fn revalidator_from_config(config: &RevalidateConfig) -> Arc<dyn Revalidator> {
    match config.url.as_deref().filter(|u| !u.trim().is_empty()) {
        Some(url) => Arc::new(WebhookRevalidator::new(url.to_string(), config.secret.clone())),
        None => Arc::new(NoopRevalidator),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn loads_once_until_invalidated() {
        let cache = TagCache::new(Duration::from_secs(60));
        let calls = Cell::new(0);
        let load = || {
            calls.set(calls.get() + 1);
            Ok(vec!["a".to_string()])
        };
        assert_eq!(cache.get_or_load("home", load).unwrap(), vec!["a"]);
        assert_eq!(cache.get_or_load("home", load).unwrap(), vec!["a"]);
        assert_eq!(calls.get(), 1);

        assert!(cache.invalidate("home"));
        cache.get_or_load("home", load).unwrap();
        assert_eq!(calls.get(), 2);
        assert!(!cache.invalidate("missing"));
    }

    #[test]
    fn invalidation_covers_query_variants() {
        let cache = TagCache::new(Duration::from_secs(60));
        cache.get_or_load("blog|page=2", || Ok(2)).unwrap();
        cache.get_or_load("blog-archive", || Ok(3)).unwrap();
        assert!(cache.invalidate("blog"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn expired_entries_reload() {
        let cache = TagCache::new(Duration::ZERO);
        cache.get_or_load("t", || Ok(1)).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get_or_load("t", || Ok(2)).unwrap(), 2);
    }

    #[test]
    fn inserts_drop_expired_entries() {
        let cache = TagCache::new(Duration::from_millis(1));
        cache.get_or_load("a", || Ok(1)).unwrap();
        cache.get_or_load("b", || Ok(2)).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        cache.get_or_load("c", || Ok(3)).unwrap();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn capacity_evicts_oldest() {
        let cache = TagCache::with_capacity(Duration::from_secs(60), 2);
        cache.get_or_load("a", || Ok(1)).unwrap();
        std::thread::sleep(Duration::from_millis(2));
        cache.get_or_load("b", || Ok(2)).unwrap();
        std::thread::sleep(Duration::from_millis(2));
        cache.get_or_load("c", || Ok(3)).unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get_or_load("a", || Ok(10)).unwrap(), 10);
    }

    #[test]
    fn rejected_values_are_not_stored() {
        let cache = TagCache::new(Duration::from_secs(60));
        let value = cache.get_or_load_if("blog|page=9", || Ok(0), |n| *n > 0).unwrap();
        assert_eq!(value, 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn loader_errors_are_not_cached() {
        let cache = TagCache::new(Duration::from_secs(60));
        let failed: Result<i32> = cache.get_or_load("t", || Err(CmsError::validation("boom")));
        assert!(failed.is_err());
        assert!(cache.is_empty());
    }
}
