//! Short-lived JSON response cache in Redis.
//!
//! Used for expensive aggregate reads (admin statistics) that tolerate being
//! a few seconds stale. A cache miss or an unreachable Redis simply falls
//! through to Postgres.

use redis::{AsyncCommands, Client as RedisClient};
use serde::{de::DeserializeOwned, Serialize};

pub const ADMIN_STATS_KEY: &str = "admin:stats";

pub async fn get_json<T: DeserializeOwned>(redis: &RedisClient, key: &str) -> Option<T> {
    let mut conn = redis.get_multiplexed_async_connection().await.ok()?;
    let cached: Option<String> = conn.get(key).await.ok()?;
    cached.and_then(|body| serde_json::from_str(&body).ok())
}

pub async fn put_json<T: Serialize>(redis: &RedisClient, key: &str, value: &T, ttl: u64) {
    let body = match serde_json::to_string(value) {
        Ok(b) => b,
        Err(e) => {
            log::warn!("cache serialisation for {key} failed: {e}");
            return;
        }
    };
    match redis.get_multiplexed_async_connection().await {
        Ok(mut conn) => {
            if let Err(e) = conn.set_ex::<_, _, ()>(key, body, ttl).await {
                log::warn!("cache write for {key} failed: {e}");
            }
        }
        Err(e) => log::warn!("redis unavailable for cache write: {e}"),
    }
}

pub async fn invalidate(redis: &RedisClient, key: &str) {
    if let Ok(mut conn) = redis.get_multiplexed_async_connection().await {
        let _: redis::RedisResult<()> = conn.del(key).await;
    }
}
