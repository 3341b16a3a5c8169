use anyhow::{Context, Result};
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use super::{models::User, update::UpdateSet};
use crate::domain::{
    roles::{AuthProvider, Roles},
    schedule::WeeklySchedule,
};

/// Fields supplied when an account is first created.
pub struct NewUser<'a> {
    pub email: &'a str,
    pub full_name: Option<&'a str>,
    pub hashed_password: Option<&'a str>,
    pub avatar_url: Option<&'a str>,
    pub roles: &'a Roles,
    pub auth_provider: AuthProvider,
    pub provider_id: Option<&'a str>,
    pub is_verified: bool,
}

pub async fn insert(db: &PgPool, new: NewUser<'_>) -> Result<User> {
    sqlx::query_as::<_, User>(
        r#"INSERT INTO users (email, full_name, hashed_password, avatar_url, roles,
                              auth_provider, provider_id, is_verified, last_login)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
           RETURNING *"#,
    )
    .bind(new.email)
    .bind(new.full_name)
    .bind(new.hashed_password)
    .bind(new.avatar_url)
    .bind(new.roles.to_db())
    .bind(new.auth_provider.as_str())
    .bind(new.provider_id)
    .bind(new.is_verified)
    .fetch_one(db)
    .await
    .context("inserting user")
}

pub async fn find(db: &PgPool, id: Uuid) -> Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await
        .context("fetching user by id")
}

pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE lower(email) = lower($1)")
        .bind(email)
        .fetch_optional(db)
        .await
        .context("fetching user by email")
}

pub async fn touch_last_login(db: &PgPool, id: Uuid) -> Result<()> {
    sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
        .bind(id)
        .execute(db)
        .await
        .context("updating last_login")?;
    Ok(())
}

/// Applies a prepared partial update to one user.
pub async fn update(db: &PgPool, id: Uuid, set: UpdateSet<'_>) -> Result<Option<User>> {
    set.apply(id, db).await.context("updating user")
}

pub async fn set_schedule(db: &PgPool, id: Uuid, schedule: &WeeklySchedule) -> Result<User> {
    sqlx::query_as::<_, User>(
        "UPDATE users SET availability_schedule = $2, updated_at = NOW()
          WHERE id = $1
      RETURNING *",
    )
    .bind(id)
    .bind(Json(schedule))
    .fetch_one(db)
    .await
    .context("updating availability schedule")
}

/// Removes the account; owned rows go with it (`ON DELETE CASCADE`).
pub async fn delete(db: &PgPool, id: Uuid) -> Result<bool> {
    let mut tx = db.begin().await?;
    sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("deleting refresh tokens")?;
    let rows = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("deleting user")?
        .rows_affected();
    tx.commit().await?;
    Ok(rows > 0)
}
