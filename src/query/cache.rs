use moka::sync::Cache;
use std::time::Duration;

/// Small cache of serialized stats responses, keyed by period. Ingest
/// invalidates it wholesale after every successful write so new events
/// are visible to the next report.
pub struct StatsCache {
    inner: Cache<String, String>,
}

impl StatsCache {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            inner: Cache::builder()
                .time_to_live(Duration::from_secs(ttl_secs))
                .max_capacity(8)
                .build(),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key)
    }

    pub fn insert(&self, key: String, value: String) {
        self.inner.insert(key, value);
    }

    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }
}
