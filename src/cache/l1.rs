//! L1 — process-local TTL map with bounded LRU eviction (spec §4.2).
//!
//! Grounded on the teacher's `dashmap` dependency (declared, unused in the
//! retrieved slice) for the sharded concurrent map, with a
//! `parking_lot::Mutex`-guarded intrusive order list for LRU, the same
//! "fast concurrent map + a small mutex-guarded side structure" shape used
//! in `cooprefr-bettersys/src/route_quality/mitigation.rs` for its
//! per-endpoint state.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub payload: Vec<u8>,
    pub inserted_at: Instant,
    pub ttl: Duration,
    pub source_tag: String,
}

impl CacheEntry {
    pub fn is_expired(&self) -> bool {
        self.inserted_at.elapsed() >= self.ttl
    }

    /// Remaining TTL, zero if already expired.
    pub fn remaining_ttl(&self) -> Duration {
        self.ttl.saturating_sub(self.inserted_at.elapsed())
    }
}

/// Bounded-capacity, TTL-aware in-process cache (spec §4.2 "L1").
///
/// Reads past TTL are treated as `Miss` and lazily removed. Capacity
/// eviction is LRU: the order list tracks most-recently-used at the back.
pub struct LocalCache {
    entries: DashMap<String, CacheEntry>,
    order: Mutex<VecDeque<String>>,
    capacity: usize,
}

impl LocalCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            order: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.get(key)?;
        if entry.is_expired() {
            drop(entry);
            self.entries.remove(key);
            self.forget_order(key);
            return None;
        }
        let value = entry.clone();
        drop(entry);
        self.touch(key);
        Some(value)
    }

    pub fn set(&self, key: &str, payload: Vec<u8>, ttl: Duration, source_tag: impl Into<String>) {
        let entry = CacheEntry {
            payload,
            inserted_at: Instant::now(),
            ttl,
            source_tag: source_tag.into(),
        };
        let is_new = self.entries.insert(key.to_string(), entry).is_none();
        self.touch(key);
        if is_new {
            self.evict_if_needed();
        }
    }

    pub fn delete(&self, key: &str) {
        self.entries.remove(key);
        self.forget_order(key);
    }

    /// Keys whose wire form starts with `prefix`, skipping expired entries.
    pub fn scan(&self, prefix: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.key().starts_with(prefix) && !e.value().is_expired())
            .map(|e| e.key().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn touch(&self, key: &str) {
        let mut order = self.order.lock();
        if let Some(pos) = order.iter().position(|k| k == key) {
            order.remove(pos);
        }
        order.push_back(key.to_string());
    }

    fn forget_order(&self, key: &str) {
        let mut order = self.order.lock();
        if let Some(pos) = order.iter().position(|k| k == key) {
            order.remove(pos);
        }
    }

    fn evict_if_needed(&self) {
        while self.entries.len() > self.capacity {
            let victim = {
                let mut order = self.order.lock();
                order.pop_front()
            };
            match victim {
                Some(key) => {
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_set_round_trip() {
        let cache = LocalCache::new(10);
        cache.set("k", b"v".to_vec(), Duration::from_secs(60), "test");
        let entry = cache.get("k").unwrap();
        assert_eq!(entry.payload, b"v");
        assert_eq!(entry.source_tag, "test");
    }

    #[test]
    fn expired_entries_read_as_miss() {
        let cache = LocalCache::new(10);
        cache.set("k", b"v".to_vec(), Duration::from_millis(1), "test");
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("k").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn lru_eviction_at_capacity() {
        let cache = LocalCache::new(2);
        cache.set("a", b"1".to_vec(), Duration::from_secs(60), "t");
        cache.set("b", b"2".to_vec(), Duration::from_secs(60), "t");
        cache.set("c", b"3".to_vec(), Duration::from_secs(60), "t");
        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn touching_an_entry_protects_it_from_eviction() {
        let cache = LocalCache::new(2);
        cache.set("a", b"1".to_vec(), Duration::from_secs(60), "t");
        cache.set("b", b"2".to_vec(), Duration::from_secs(60), "t");
        // Touch `a`, making `b` the LRU victim.
        assert!(cache.get("a").is_some());
        cache.set("c", b"3".to_vec(), Duration::from_secs(60), "t");
        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
    }

    #[test]
    fn scan_by_prefix() {
        let cache = LocalCache::new(10);
        cache.set("fx:USD:INR:v1", b"1".to_vec(), Duration::from_secs(60), "t");
        cache.set("fx:USD:EUR:v1", b"1".to_vec(), Duration::from_secs(60), "t");
        cache.set("bars:AAPL:v1", b"1".to_vec(), Duration::from_secs(60), "t");
        let mut matches = cache.scan("fx:");
        matches.sort();
        assert_eq!(matches, vec!["fx:USD:EUR:v1", "fx:USD:INR:v1"]);
    }
}
