//! Availability calendar and the swipe/match ledger.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    chat_repo,
    models::{PlayerAvailability, User},
};
use crate::domain::canonical_pair;

pub async fn set_available(db: &PgPool, player_id: Uuid, available: bool) -> Result<()> {
    sqlx::query("UPDATE users SET is_available = $2, updated_at = NOW() WHERE id = $1")
        .bind(player_id)
        .bind(available)
        .execute(db)
        .await
        .context("updating availability flag")?;
    Ok(())
}

pub async fn availability_between(
    db: &PgPool,
    player_id: Uuid,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<Vec<PlayerAvailability>> {
    sqlx::query_as::<_, PlayerAvailability>(
        r#"SELECT * FROM player_availability
            WHERE player_id = $1
              AND ($2::date IS NULL OR date >= $2)
              AND ($3::date IS NULL OR date <= $3)
            ORDER BY date"#,
    )
    .bind(player_id)
    .bind(start)
    .bind(end)
    .fetch_all(db)
    .await
    .context("fetching availability calendar")
}

/// One calendar entry per (player, date); a second write for the same day replaces the first.
pub async fn upsert_availability(
    db: &PgPool,
    player_id: Uuid,
    date: NaiveDate,
    available: bool,
    notes: Option<&str>,
) -> Result<PlayerAvailability> {
    sqlx::query_as::<_, PlayerAvailability>(
        r#"INSERT INTO player_availability (player_id, date, is_available, notes)
           VALUES ($1, $2, $3, $4)
           ON CONFLICT (player_id, date)
           DO UPDATE SET is_available = EXCLUDED.is_available,
                         notes        = EXCLUDED.notes,
                         updated_at   = NOW()
           RETURNING *"#,
    )
    .bind(player_id)
    .bind(date)
    .bind(available)
    .bind(notes)
    .fetch_one(db)
    .await
    .context("upserting availability")
}

/// Swipe candidates for `viewer`: visible, active, available players not yet swiped on.
pub async fn discover(db: &PgPool, viewer: &User, limit: i64) -> Result<Vec<User>> {
    sqlx::query_as::<_, User>(
        r#"SELECT u.*
             FROM users u
            WHERE u.id <> $1
              AND u.is_active
              AND u.profile_visible
              AND u.is_available
              AND 'player' = ANY(u.roles)
              AND NOT EXISTS (
                    SELECT 1 FROM swipes s
                     WHERE s.swiper_id = $1 AND s.target_id = u.id)
            ORDER BY (u.city IS NOT NULL AND lower(u.city) = lower($2::text)) DESC,
                     u.updated_at DESC
            LIMIT $3"#,
    )
    .bind(viewer.id)
    .bind(viewer.city.as_deref())
    .bind(limit)
    .fetch_all(db)
    .await
    .context("discovering players")
}

/// Records `swiper`'s decision on `target`. On a mutual like the pair's
/// conversation is opened (or reused) and its id returned.
///
/// Swipes within one pair are serialised on a transaction-scoped advisory
/// lock, so two simultaneous likes cannot both miss each other.
pub async fn record_swipe(
    db: &PgPool,
    swiper: Uuid,
    target: Uuid,
    liked: bool,
) -> Result<Option<Uuid>> {
    let mut tx = db.begin().await?;

    let (lo, hi) = canonical_pair(swiper, target);
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text || ':' || $2::text, 0))")
        .bind(lo)
        .bind(hi)
        .execute(&mut *tx)
        .await
        .context("locking swipe pair")?;

    sqlx::query(
        r#"INSERT INTO swipes (swiper_id, target_id, liked)
           VALUES ($1, $2, $3)
           ON CONFLICT (swiper_id, target_id)
           DO UPDATE SET liked = EXCLUDED.liked, updated_at = NOW()"#,
    )
    .bind(swiper)
    .bind(target)
    .bind(liked)
    .execute(&mut *tx)
    .await
    .context("recording swipe")?;

    if !liked {
        tx.commit().await?;
        return Ok(None);
    }

    let mutual: bool = sqlx::query_scalar(
        "SELECT EXISTS(
             SELECT 1 FROM swipes
              WHERE swiper_id = $1 AND target_id = $2 AND liked)",
    )
    .bind(target)
    .bind(swiper)
    .fetch_one(&mut *tx)
    .await
    .context("checking for a mutual like")?;

    let conversation = if mutual {
        Some(chat_repo::get_or_create(&mut *tx, swiper, target).await?.id)
    } else {
        None
    };
    tx.commit().await?;
    Ok(conversation)
}

/// Users `player_id` has a mutual like with, newest match first.
pub async fn matches(db: &PgPool, player_id: Uuid) -> Result<Vec<User>> {
    sqlx::query_as::<_, User>(
        r#"SELECT u.*
             FROM swipes mine
             JOIN swipes theirs
               ON theirs.swiper_id = mine.target_id
              AND theirs.target_id = mine.swiper_id
              AND theirs.liked
             JOIN users u ON u.id = mine.target_id
            WHERE mine.swiper_id = $1
              AND mine.liked
              AND u.is_active
            ORDER BY GREATEST(mine.updated_at, theirs.updated_at) DESC"#,
    )
    .bind(player_id)
    .fetch_all(db)
    .await
    .context("listing matches")
}
