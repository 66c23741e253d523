use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    endpoint: String,
    query: String,
}

impl CacheKey {
    /// `query` is a BTreeMap so the key does not depend on insertion order
    fn new(endpoint: &str, query: &BTreeMap<String, String>) -> Self {
        let query = query
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        Self {
            endpoint: endpoint.to_string(),
            query,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    stored_at: Instant,
}

/// Short-lived cache of decoded API responses
///
/// Entries older than the TTL are treated as absent. They are evicted when
/// looked up, and every insert prunes whatever else has expired.
#[derive(Clone)]
pub struct ToolCache {
    cache: Arc<RwLock<HashMap<CacheKey, CacheEntry>>>,
    ttl: Duration,
}

impl ToolCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, endpoint: &str, query: &BTreeMap<String, String>) -> Option<Value> {
        let key = CacheKey::new(endpoint, query);
        {
            let cache = self.cache.read().ok()?;
            let entry = cache.get(&key)?;
            if entry.stored_at.elapsed() < self.ttl {
                return Some(entry.value.clone());
            }
        }

        if let Ok(mut cache) = self.cache.write() {
            cache.remove(&key);
        }
        None
    }

    pub fn insert(&self, endpoint: &str, query: &BTreeMap<String, String>, value: Value) {
        if self.ttl.is_zero() {
            return;
        }
        let key = CacheKey::new(endpoint, query);
        if let Ok(mut cache) = self.cache.write() {
            let ttl = self.ttl;
            cache.retain(|_, entry| entry.stored_at.elapsed() < ttl);
            cache.insert(
                key,
                CacheEntry {
                    value,
                    stored_at: Instant::now(),
                },
            );
        }
    }

    pub fn clear(&self) {
        if let Ok(mut cache) = self.cache.write() {
            cache.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ToolCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolCache")
            .field("ttl", &self.ttl)
            .field("entries", &self.len())
            .finish()
    }
}
