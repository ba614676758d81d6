use std::time::Duration;

use moka::future::Cache;

/// Thread-safe, TTL-bounded set of fingerprints "recently processed".
/// A false negative (not-seen when it was) costs one redundant fetch;
/// a false positive would silently drop work and is not acceptable —
/// that's why this is a real cache with exact membership, not a bloom
/// filter.
pub struct VisitedCache {
    inner: Cache<String, ()>,
}

impl VisitedCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Cache::builder().time_to_live(ttl).build(),
        }
    }

    pub async fn seen(&self, fingerprint: &str) -> bool {
        self.inner.get(fingerprint).await.is_some()
    }

    pub async fn mark(&self, fingerprint: &str) {
        self.inner.insert(fingerprint.to_string(), ()).await;
    }
}
