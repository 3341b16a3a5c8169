//! Background housekeeping loop.
//
//  every SWEEP_INTERVAL seconds:
//    team_invitations  – pending rows past expires_at become 'expired'
//    refresh_tokens    – expired rows, and rows revoked over a day ago, are deleted

use std::time::Duration;

use sqlx::PgPool;
use tokio::time::interval;

use crate::db::{recruitment_repo, token_repo};

/// Spawn the infinite sweep loop as a Tokio task.
pub fn start(db: PgPool, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        loop {
            ticker.tick().await;
            if let Err(e) = tick(&db).await {
                log::error!("sweep failed: {e:?}");
            }
        }
    });
}

/// One pass. Returns (invitations expired, tokens purged).
pub async fn tick(db: &PgPool) -> anyhow::Result<(u64, u64)> {
    let expired = recruitment_repo::expire_stale_invitations(db).await?;
    let purged = token_repo::purge_dead(db).await?;
    if expired > 0 || purged > 0 {
        log::info!("sweep: {expired} invitations expired, {purged} refresh tokens purged");
    }
    Ok((expired, purged))
}
