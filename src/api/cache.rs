use log::*;
use moka::future::Cache;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Responses of GET requests, keyed by request path
///
/// Entries only leave by expiring or by being invalidated after a mutation.
#[derive(Clone)]
pub struct ResponseCache {
    inner: Cache<String, Value>,
}

impl fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseCache")
            .field("entries", &self.inner.entry_count())
            .finish()
    }
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .time_to_live(ttl)
                .support_invalidation_closures()
                .build(),
        }
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        self.inner.get(key).await
    }

    pub async fn insert(&self, key: String, value: Value) {
        self.inner.insert(key, value).await;
    }

    /// Drop every entry whose key contains `pattern`
    pub fn invalidate_matching(&self, pattern: &str) {
        let pattern = pattern.to_owned();
        debug!("Invalidating cached responses matching {:?}", pattern);
        let res = self
            .inner
            .invalidate_entries_if(move |key, _| key.contains(pattern.as_str()));
        if let Err(err) = res {
            warn!("Pattern invalidation failed ({}), clearing all", err);
            self.inner.invalidate_all();
        }
    }

    pub fn clear(&self) {
        self.inner.invalidate_all();
    }
}
