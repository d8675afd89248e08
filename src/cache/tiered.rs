//! Tiering policy orchestration (spec §4.2): L1 → L1′ read path, write-through
//! writes, degraded mode when L1′ is unreachable.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::l1::LocalCache;
use super::redis::RedisCache;
use crate::keys::CacheKey;

/// Outcome of a tiered read, telling the caller which tier served the hit
/// so it can warm the faster tiers above it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheHitTier {
    L1,
    L1Prime,
}

#[derive(Debug, Clone)]
pub struct CacheHit {
    pub payload: Vec<u8>,
    pub source_tag: String,
    pub tier: CacheHitTier,
}

/// Max MiB payloads allowed in L1 (spec §4.2: "payloads > 1 MiB are
/// allowed only in L1′").
const L1_MAX_PAYLOAD_BYTES: usize = 1024 * 1024;

pub struct TieredCache {
    l1: LocalCache,
    l1_prime: Option<Arc<RedisCache>>,
    l1_prime_healthy: AtomicBool,
    enabled: bool,
}

pub struct CacheHealth {
    pub l1_entries: usize,
    pub l1_prime_configured: bool,
    pub l1_prime_healthy: bool,
}

impl TieredCache {
    pub fn new(l1_capacity: usize, l1_prime: Option<Arc<RedisCache>>, enabled: bool) -> Self {
        Self {
            l1: LocalCache::new(l1_capacity),
            l1_prime,
            l1_prime_healthy: AtomicBool::new(true),
            enabled,
        }
    }

    /// Read path: L1 first; on miss, consult L1′ and warm L1 with a
    /// fraction of L1′'s remaining TTL, never longer than that remaining
    /// TTL (spec §4.2). Always misses when `CACHE_ENABLED=false` (spec §6).
    pub async fn get(&self, key: &CacheKey) -> Option<CacheHit> {
        if !self.enabled {
            return None;
        }
        let wire = key.to_wire();

        if let Some(entry) = self.l1.get(&wire) {
            return Some(CacheHit {
                payload: entry.payload,
                source_tag: entry.source_tag,
                tier: CacheHitTier::L1,
            });
        }

        let Some(l1_prime) = &self.l1_prime else {
            return None;
        };

        match l1_prime.get(&wire).await {
            Ok(Some((payload, remaining))) => {
                self.l1_prime_healthy.store(true, Ordering::Relaxed);
                let warm_ttl = warm_fraction(remaining);
                if payload.len() <= L1_MAX_PAYLOAD_BYTES {
                    self.l1.set(&wire, payload.clone(), warm_ttl, "l1_prime");
                }
                Some(CacheHit {
                    payload,
                    source_tag: "l1_prime".to_string(),
                    tier: CacheHitTier::L1Prime,
                })
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(%key, error = %e, "L1' unreachable on read, degrading to L1-only");
                self.l1_prime_healthy.store(false, Ordering::Relaxed);
                None
            }
        }
    }

    /// Write-through: both tiers are updated. L1′ failures are logged and
    /// swallowed — L1 still serves (spec §4.2 "degraded mode").
    pub async fn set(&self, key: &CacheKey, payload: Vec<u8>, ttl: Duration, source_tag: &str) {
        if !self.enabled {
            return;
        }
        let wire = key.to_wire();

        if payload.len() <= L1_MAX_PAYLOAD_BYTES {
            self.l1.set(&wire, payload.clone(), ttl, source_tag);
        } else {
            tracing::debug!(%key, bytes = payload.len(), "payload exceeds L1 cap, L1' only");
        }

        if let Some(l1_prime) = &self.l1_prime {
            if let Err(e) = l1_prime.set(&wire, &payload, ttl).await {
                tracing::warn!(%key, error = %e, "L1' write failed, write-through degraded");
                self.l1_prime_healthy.store(false, Ordering::Relaxed);
            } else {
                self.l1_prime_healthy.store(true, Ordering::Relaxed);
            }
        }
    }

    pub async fn delete(&self, key: &CacheKey) {
        let wire = key.to_wire();
        self.l1.delete(&wire);
        if let Some(l1_prime) = &self.l1_prime {
            if let Err(e) = l1_prime.delete(&wire).await {
                tracing::warn!(%key, error = %e, "L1' delete failed");
            }
        }
    }

    pub async fn health(&self) -> CacheHealth {
        CacheHealth {
            l1_entries: self.l1.len(),
            l1_prime_configured: self.l1_prime.is_some(),
            l1_prime_healthy: self.l1_prime_healthy.load(Ordering::Relaxed),
        }
    }
}

/// Never longer than `remaining`; half of it, capped at one day, is a
/// reasonable warm window that avoids L1 outliving its source of truth.
fn warm_fraction(remaining: Duration) -> Duration {
    let half = remaining / 2;
    half.min(Duration::from_secs(24 * 3600)).min(remaining)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn l1_only_round_trip_when_no_redis_configured() {
        let cache = TieredCache::new(100, None, true);
        let key = crate::keys::fx_key("USD", "INR", 1);
        cache
            .set(&key, b"82.1".to_vec(), Duration::from_secs(60), "test")
            .await;
        let hit = cache.get(&key).await.unwrap();
        assert_eq!(hit.payload, b"82.1");
        assert_eq!(hit.tier, CacheHitTier::L1);
    }

    #[tokio::test]
    async fn miss_when_empty() {
        let cache = TieredCache::new(100, None, true);
        let key = crate::keys::fx_key("USD", "INR", 1);
        assert!(cache.get(&key).await.is_none());
    }

    #[tokio::test]
    async fn disabled_cache_never_stores_or_serves_anything() {
        let cache = TieredCache::new(100, None, false);
        let key = crate::keys::fx_key("USD", "INR", 1);
        cache
            .set(&key, b"82.1".to_vec(), Duration::from_secs(60), "test")
            .await;
        assert!(cache.get(&key).await.is_none());
        assert_eq!(cache.health().await.l1_entries, 0);
    }

    #[test]
    fn warm_fraction_never_exceeds_remaining() {
        let remaining = Duration::from_secs(10);
        assert!(warm_fraction(remaining) <= remaining);
        let long_remaining = Duration::from_secs(10 * 24 * 3600);
        assert!(warm_fraction(long_remaining) <= long_remaining);
        assert!(warm_fraction(long_remaining) <= Duration::from_secs(24 * 3600));
    }
}
