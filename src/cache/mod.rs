//! C2 — Cache Tier (spec §4.2). Uniform get/set/delete/scan across the
//! in-process (L1) and shared (L1′) backends, with write-through tiering.

pub mod l1;
pub mod redis;
pub mod tiered;

pub use l1::{CacheEntry, LocalCache};
pub use redis::RedisCache;
pub use tiered::{CacheHealth, CacheHit, CacheHitTier, TieredCache};
