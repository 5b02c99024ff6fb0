use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Key-value store with per-entry expiry, shared by every request of a client.
pub trait DnsCache: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: String, ttl: Duration);
}

#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryCache {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }
}

impl DnsCache for MemoryCache {
    #[inline]
    fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let fresh = entries
            .get(key)
            .filter(|(_, deadline)| *deadline > Instant::now())
            .map(|(value, _)| value.clone());
        if fresh.is_none() {
            entries.remove(key);
        }
        fresh
    }

    #[inline]
    fn set(&self, key: &str, value: String, ttl: Duration) {
        if value.is_empty() {
            return;
        }
        let Some(deadline) = Instant::now().checked_add(ttl) else {
            return;
        };
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.retain(|_, (_, deadline)| *deadline > Instant::now());
        entries.insert(key.to_owned(), (value, deadline));
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn stores_until_expiry() {
        let cache = MemoryCache::new();
        cache.set("host_example.com", "93.184.216.34".into(), Duration::from_secs(3600));
        assert_eq!(cache.get("host_example.com").as_deref(), Some("93.184.216.34"));
        assert_eq!(cache.get("host_other"), None);
    }

    #[test]
    fn expired_entries_are_misses() {
        let cache = MemoryCache::new();
        cache.set("k", "v".into(), Duration::ZERO);
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn empty_values_are_not_stored() {
        let cache = MemoryCache::new();
        cache.set("k", String::new(), Duration::from_secs(60));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn concurrent_access() {
        let cache = Arc::new(MemoryCache::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for j in 0..100 {
                        let key = format!("host_{}", j % 10);
                        cache.set(&key, format!("10.0.{i}.{j}"), Duration::from_secs(60));
                        assert!(cache.get(&key).is_some_and(|value| value.starts_with("10.0.")));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
