use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::models::User;
use crate::domain::validate::Page;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PlatformStats {
    pub total_users: i64,
    pub active_users: i64,
    pub banned_users: i64,
    pub total_teams: i64,
    pub active_teams: i64,
    pub total_tournaments: i64,
    pub new_users_this_month: i64,
}

/// Team row as listed in the moderation table, joined with its captain.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AdminTeamRow {
    pub id: Uuid,
    pub name: String,
    pub city: Option<String>,
    pub captain_id: Uuid,
    pub captain_name: Option<String>,
    pub captain_email: String,
    pub is_active: bool,
    pub is_squad_full: bool,
    pub current_player_count: i32,
    pub max_players: i32,
    pub created_at: DateTime<Utc>,
}

pub async fn stats(db: &PgPool) -> Result<PlatformStats> {
    sqlx::query_as::<_, PlatformStats>(
        r#"SELECT
              (SELECT COUNT(*) FROM users)                                    AS total_users,
              (SELECT COUNT(*) FROM users WHERE is_active)                    AS active_users,
              (SELECT COUNT(*) FROM users WHERE NOT is_active)                AS banned_users,
              (SELECT COUNT(*) FROM teams)                                    AS total_teams,
              (SELECT COUNT(*) FROM teams WHERE is_active)                    AS active_teams,
              (SELECT COUNT(*) FROM tournaments)                              AS total_tournaments,
              (SELECT COUNT(*) FROM users
                WHERE created_at >= date_trunc('month', NOW()))               AS new_users_this_month"#,
    )
    .fetch_one(db)
    .await
    .context("computing platform stats")
}

pub async fn list_users(db: &PgPool, search: Option<&str>, page: Page) -> Result<Vec<User>> {
    sqlx::query_as::<_, User>(
        r#"SELECT * FROM users
            WHERE $1::text IS NULL
               OR email ILIKE '%' || $1 || '%'
               OR full_name ILIKE '%' || $1 || '%'
            ORDER BY created_at DESC
           OFFSET $2 LIMIT $3"#,
    )
    .bind(search)
    .bind(page.skip)
    .bind(page.limit)
    .fetch_all(db)
    .await
    .context("listing users")
}

pub async fn list_teams(db: &PgPool, search: Option<&str>, page: Page) -> Result<Vec<AdminTeamRow>> {
    sqlx::query_as::<_, AdminTeamRow>(
        r#"SELECT t.id, t.name, t.city, t.captain_id,
                  u.full_name AS captain_name,
                  u.email     AS captain_email,
                  t.is_active, t.is_squad_full, t.current_player_count, t.max_players,
                  t.created_at
             FROM teams t
             JOIN users u ON u.id = t.captain_id
            WHERE $1::text IS NULL
               OR t.name ILIKE '%' || $1 || '%'
               OR t.city ILIKE '%' || $1 || '%'
            ORDER BY t.created_at DESC
           OFFSET $2 LIMIT $3"#,
    )
    .bind(search)
    .bind(page.skip)
    .bind(page.limit)
    .fetch_all(db)
    .await
    .context("listing teams")
}

pub async fn delete_team(db: &PgPool, id: Uuid) -> Result<bool> {
    let rows = sqlx::query("DELETE FROM teams WHERE id = $1")
        .bind(id)
        .execute(db)
        .await
        .context("deleting team")?
        .rows_affected();
    Ok(rows > 0)
}
