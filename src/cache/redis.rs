//! L1′ — shared KV cache backend (spec §4.2, §6 `REDIS_URL`/`REDIS_HOST`/`REDIS_PORT`).

use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::error::CoreError;

pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    pub async fn connect(url: &str) -> Result<Self, CoreError> {
        let client = redis::Client::open(url)
            .map_err(|e| crate::error::transient("redis", format!("invalid REDIS_URL: {e}")))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| crate::error::transient("redis", e))?;
        Ok(Self { conn })
    }

    pub async fn get(&self, key: &str) -> Result<Option<(Vec<u8>, Duration)>, CoreError> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn
            .get(key)
            .await
            .map_err(|e| crate::error::transient("redis", e))?;
        let Some(value) = value else {
            return Ok(None);
        };
        let ttl_secs: i64 = conn
            .ttl(key)
            .await
            .map_err(|e| crate::error::transient("redis", e))?;
        let ttl = if ttl_secs > 0 {
            Duration::from_secs(ttl_secs as u64)
        } else {
            Duration::from_secs(0)
        };
        Ok(Some((value, ttl)))
    }

    pub async fn set(&self, key: &str, payload: &[u8], ttl: Duration) -> Result<(), CoreError> {
        let mut conn = self.conn.clone();
        let ttl_secs = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, payload, ttl_secs)
            .await
            .map_err(|e| crate::error::transient("redis", e))
    }

    pub async fn delete(&self, key: &str) -> Result<(), CoreError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| crate::error::transient("redis", e))
    }

    pub async fn scan(&self, prefix: &str) -> Result<Vec<String>, CoreError> {
        let mut conn = self.conn.clone();
        let pattern = format!("{prefix}*");
        let keys: Vec<String> = conn
            .keys(pattern)
            .await
            .map_err(|e| crate::error::transient("redis", e))?;
        Ok(keys)
    }

    pub async fn ping(&self) -> bool {
        let mut conn = self.conn.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .is_ok()
    }
}

/// Build a `REDIS_URL` from `REDIS_HOST`/`REDIS_PORT` when `REDIS_URL` is
/// unset, per spec §6.
pub fn url_from_env() -> Option<String> {
    if let Ok(url) = std::env::var("REDIS_URL") {
        return Some(url);
    }
    let host = std::env::var("REDIS_HOST").ok()?;
    let port = std::env::var("REDIS_PORT").unwrap_or_else(|_| "6379".to_string());
    Some(format!("redis://{host}:{port}"))
}
