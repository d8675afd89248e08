//! Negative caching (spec §8 scenario E5: "L1 negative-caching TTL ≤ 60s").
//!
//! When every provider for a capability fails, the resolver remembers the
//! miss for a short window so a burst of identical requests does not
//! retrigger the full provider cascade on each one. The marker carries no
//! payload; a hit just means "don't bother L2/providers again yet" — the
//! caller still returns its own typed error, not a cached one.

use std::time::Duration;

use crate::cache::TieredCache;
use crate::keys::CacheKey;

const NEGATIVE_TTL: Duration = Duration::from_secs(60);
const NEGATIVE_SOURCE_TAG: &str = "negative";

fn negative_key(key: &CacheKey) -> CacheKey {
    CacheKey::new(
        key.namespace(),
        format!("{}:neg", key.kind()),
        key.fields().to_vec(),
        key.version(),
    )
}

pub async fn mark_miss(cache: &TieredCache, key: &CacheKey) {
    cache
        .set(&negative_key(key), Vec::new(), NEGATIVE_TTL, NEGATIVE_SOURCE_TAG)
        .await;
}

pub async fn is_recent_miss(cache: &TieredCache, key: &CacheKey) -> bool {
    cache.get(&negative_key(key)).await.is_some()
}
