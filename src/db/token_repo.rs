//! Server-side refresh-token ledger (rotate-on-use, revoke-on-logout).

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::models::RefreshToken;

pub async fn store<'e>(
    db: impl PgExecutor<'e>,
    user_id: Uuid,
    token_hash: &str,
    expires_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO refresh_tokens (user_id, token_hash, expires_at)
         VALUES ($1, $2, $3)",
    )
    .bind(user_id)
    .bind(token_hash)
    .bind(expires_at)
    .execute(db)
    .await
    .context("storing refresh token")?;
    Ok(())
}

/// Locks the live row for `token_hash` until the transaction ends.
pub async fn lock_active(
    tx: &mut Transaction<'_, Postgres>,
    token_hash: &str,
) -> Result<Option<RefreshToken>> {
    sqlx::query_as::<_, RefreshToken>(
        "SELECT id, user_id, token_hash, expires_at, is_revoked, created_at
           FROM refresh_tokens
          WHERE token_hash = $1
            AND NOT is_revoked
          FOR UPDATE",
    )
    .bind(token_hash)
    .fetch_optional(&mut **tx)
    .await
    .context("locking refresh token")
}

pub async fn revoke_id<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<()> {
    sqlx::query("UPDATE refresh_tokens SET is_revoked = TRUE, revoked_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(db)
        .await
        .context("revoking refresh token")?;
    Ok(())
}

/// Revoke one of `user_id`'s tokens. Returns whether anything changed.
pub async fn revoke_owned(db: &PgPool, user_id: Uuid, token_hash: &str) -> Result<bool> {
    let rows = sqlx::query(
        "UPDATE refresh_tokens
            SET is_revoked = TRUE, revoked_at = NOW()
          WHERE token_hash = $1
            AND user_id = $2
            AND NOT is_revoked",
    )
    .bind(token_hash)
    .bind(user_id)
    .execute(db)
    .await
    .context("revoking refresh token")?
    .rows_affected();
    Ok(rows > 0)
}

pub async fn revoke_all_for_user(db: &PgPool, user_id: Uuid) -> Result<u64> {
    Ok(sqlx::query(
        "UPDATE refresh_tokens
            SET is_revoked = TRUE, revoked_at = NOW()
          WHERE user_id = $1
            AND NOT is_revoked",
    )
    .bind(user_id)
    .execute(db)
    .await
    .context("revoking all refresh tokens")?
    .rows_affected())
}

/// Drops tokens nobody can use any more: expired ones, and ones revoked over a day ago.
pub async fn purge_dead(db: &PgPool) -> Result<u64> {
    Ok(sqlx::query(
        "DELETE FROM refresh_tokens
          WHERE expires_at < NOW()
             OR (is_revoked AND revoked_at < NOW() - INTERVAL '1 day')",
    )
    .execute(db)
    .await
    .context("purging refresh tokens")?
    .rows_affected())
}
