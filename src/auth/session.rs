//! Token pairs backed by the refresh-token ledger.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::tokens::{fingerprint, TokenKeys, TokenPair, TokenType};
use crate::{
    db::{token_repo, user_repo},
    error::{ApiError, ApiResult},
};

fn pair(keys: &TokenKeys, access_token: String, refresh_token: String) -> TokenPair {
    TokenPair {
        access_token,
        refresh_token,
        token_type: "bearer",
        expires_in: keys.access_ttl().num_seconds(),
    }
}

/// Fresh access + refresh token for `user_id`, refresh side persisted.
pub async fn issue_pair(db: &PgPool, keys: &TokenKeys, user_id: Uuid) -> ApiResult<TokenPair> {
    let access = keys.issue_access(user_id)?;
    let refresh = keys.issue_refresh(user_id)?;
    token_repo::store(db, user_id, &refresh.token_hash, refresh.expires_at).await?;
    Ok(pair(keys, access, refresh.token))
}

/// Exchange a refresh token for a new pair, revoking the presented one.
///
/// The ledger row is locked for the whole exchange, so a token can be
/// redeemed at most once even under concurrent requests.
pub async fn rotate(db: &PgPool, keys: &TokenKeys, presented: &str) -> ApiResult<(Uuid, TokenPair)> {
    let claims = keys.verify(presented, TokenType::Refresh)?;

    let mut tx = db.begin().await?;
    let stored = token_repo::lock_active(&mut tx, &fingerprint(presented))
        .await?
        .filter(|t| t.user_id == claims.sub)
        .ok_or_else(|| ApiError::unauthorized("Invalid refresh token"))?;

    if stored.expires_at < Utc::now() {
        return Err(ApiError::unauthorized("Refresh token expired"));
    }

    let user = user_repo::find(db, stored.user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User not found"))?;
    if !user.is_active {
        return Err(ApiError::forbidden("User account is inactive"));
    }

    let access = keys.issue_access(user.id)?;
    let refresh = keys.issue_refresh(user.id)?;
    token_repo::revoke_id(&mut *tx, stored.id).await?;
    token_repo::store(&mut *tx, user.id, &refresh.token_hash, refresh.expires_at).await?;
    tx.commit().await?;

    Ok((user.id, pair(keys, access, refresh.token)))
}

/// Logout: the token must belong to the caller. Unknown tokens are ignored.
pub async fn revoke(db: &PgPool, keys: &TokenKeys, user_id: Uuid, presented: &str) -> ApiResult<()> {
    // a garbled token cannot be live, nothing to revoke
    if keys.verify(presented, TokenType::Refresh).is_err() {
        return Ok(());
    }
    if !token_repo::revoke_owned(db, user_id, &fingerprint(presented)).await? {
        log::debug!("logout for {user_id} presented an unknown or revoked token");
    }
    Ok(())
}
