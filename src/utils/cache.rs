use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct Entry {
    value: serde_json::Value,
    expires_at: Instant,
}

/// Key/value cache with a fixed per-entry TTL. Entries are dropped lazily on
/// lookup; a stale read between writes is acceptable (last write wins).
pub struct Cache {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl Cache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        let mut entries = self.entries.lock().expect("Cache lock poisoned");

        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, key: String, value: serde_json::Value) {
        let mut entries = self.entries.lock().expect("Cache lock poisoned");

        entries.insert(
            key,
            Entry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn returns_stored_value_before_expiry() {
        let cache = Cache::new(Duration::from_secs(60));
        cache.put("a".to_string(), json!([1, 2, 3]));

        assert_eq!(cache.get("a"), Some(json!([1, 2, 3])));
        assert_eq!(cache.get("b"), None);
    }

    #[test]
    fn last_write_wins() {
        let cache = Cache::new(Duration::from_secs(60));
        cache.put("a".to_string(), json!("old"));
        cache.put("a".to_string(), json!("new"));

        assert_eq!(cache.get("a"), Some(json!("new")));
    }

    #[tokio::test]
    async fn drops_entries_after_ttl() {
        let cache = Cache::new(Duration::from_millis(10));
        cache.put("a".to_string(), json!(1));

        tokio::time::sleep(Duration::from_millis(25)).await;

        assert_eq!(cache.get("a"), None);
    }
}
