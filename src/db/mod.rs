//! Postgres access. One `*_repo` module per aggregate; rows live in `models`.

pub mod admin_repo;
pub mod chat_repo;
pub mod models;
pub mod player_repo;
pub mod recruitment_repo;
pub mod team_repo;
pub mod token_repo;
pub mod tournament_repo;
pub mod update;
pub mod user_repo;

use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use tokio_retry::{
    strategy::{jitter, ExponentialBackoff},
    Retry,
};

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Connect with exponential back-off (Postgres often starts after us in compose setups).
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    let strategy = ExponentialBackoff::from_millis(200)
        .max_delay(Duration::from_secs(5))
        .map(jitter)
        .take(5);

    Retry::spawn(strategy, || async move {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await
            .inspect_err(|e| log::warn!("postgres connect failed, retrying: {e}"))
    })
    .await
}

/// SQLSTATE 23505.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<sqlx::Error>(),
        Some(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23505")
    )
}
