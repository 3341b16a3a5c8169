//! Online presence backed by Redis session keys.
//
//  presence:<user_id>  – "1" with TTL = PRESENCE_TTL, refreshed on sign-in,
//                        token refresh and every chat poll

use redis::{AsyncCommands, Client as RedisClient};
use uuid::Uuid;

pub fn key(user_id: Uuid) -> String {
    format!("presence:{user_id}")
}

/// Best effort: presence is cosmetic, so Redis trouble is only logged.
pub async fn touch(redis: &RedisClient, user_id: Uuid, ttl: u64) {
    match redis.get_multiplexed_async_connection().await {
        Ok(mut conn) => {
            if let Err(e) = conn.set_ex::<_, _, ()>(key(user_id), "1", ttl).await {
                log::warn!("presence update for {user_id} failed: {e}");
            }
        }
        Err(e) => log::warn!("redis unavailable for presence: {e}"),
    }
}

pub async fn is_online(redis: &RedisClient, user_id: Uuid) -> redis::RedisResult<bool> {
    let mut conn = redis.get_multiplexed_async_connection().await?;
    conn.exists(key(user_id)).await
}

pub async fn clear(redis: &RedisClient, user_id: Uuid) {
    if let Ok(mut conn) = redis.get_multiplexed_async_connection().await {
        let _: redis::RedisResult<()> = conn.del(key(user_id)).await;
    }
}
