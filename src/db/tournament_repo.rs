use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    models::{PastTournament, PlayerTournament, Tournament},
    update::UpdateSet,
};

pub struct NewTournament<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub format: &'a str,
    pub city: Option<&'a str>,
    pub venue: Option<&'a str>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub registration_deadline: NaiveDate,
    pub max_teams: i32,
    pub entry_fee: i32,
    pub prize_pool: i32,
    pub logo_url: Option<&'a str>,
}

pub async fn insert(db: &PgPool, organizer_id: Uuid, new: NewTournament<'_>) -> Result<Tournament> {
    sqlx::query_as::<_, Tournament>(
        r#"INSERT INTO tournaments (name, description, organizer_id, format, city, venue,
                                    start_date, end_date, registration_deadline,
                                    max_teams, entry_fee, prize_pool, logo_url)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
           RETURNING *"#,
    )
    .bind(new.name)
    .bind(new.description)
    .bind(organizer_id)
    .bind(new.format)
    .bind(new.city)
    .bind(new.venue)
    .bind(new.start_date)
    .bind(new.end_date)
    .bind(new.registration_deadline)
    .bind(new.max_teams)
    .bind(new.entry_fee)
    .bind(new.prize_pool)
    .bind(new.logo_url)
    .fetch_one(db)
    .await
    .context("inserting tournament")
}

pub async fn find(db: &PgPool, id: Uuid) -> Result<Option<Tournament>> {
    sqlx::query_as::<_, Tournament>("SELECT * FROM tournaments WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await
        .context("fetching tournament")
}

pub async fn list_by_organizer(db: &PgPool, organizer_id: Uuid) -> Result<Vec<Tournament>> {
    sqlx::query_as::<_, Tournament>(
        "SELECT * FROM tournaments WHERE organizer_id = $1 ORDER BY start_date DESC",
    )
    .bind(organizer_id)
    .fetch_all(db)
    .await
    .context("listing organizer's tournaments")
}

pub async fn update(db: &PgPool, id: Uuid, set: UpdateSet<'_>) -> Result<Option<Tournament>> {
    set.apply(id, db).await.context("updating tournament")
}

pub async fn set_published(db: &PgPool, id: Uuid, published: bool) -> Result<Tournament> {
    sqlx::query_as::<_, Tournament>(
        "UPDATE tournaments SET is_published = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(published)
    .fetch_one(db)
    .await
    .context("publishing tournament")
}

/// Published tournaments, soonest first. `upcoming_from` drops those that already started.
pub async fn search(
    db: &PgPool,
    city: Option<&str>,
    format: Option<&str>,
    upcoming_from: Option<NaiveDate>,
) -> Result<Vec<Tournament>> {
    sqlx::query_as::<_, Tournament>(
        r#"SELECT * FROM tournaments
            WHERE is_published
              AND ($1::text IS NULL OR city ILIKE '%' || $1 || '%')
              AND ($2::text IS NULL OR format = $2)
              AND ($3::date IS NULL OR start_date >= $3)
            ORDER BY start_date"#,
    )
    .bind(city)
    .bind(format)
    .bind(upcoming_from)
    .fetch_all(db)
    .await
    .context("searching tournaments")
}

pub async fn record_result(
    db: &PgPool,
    tournament_id: Uuid,
    player_id: Uuid,
    team_id: Option<Uuid>,
    placement: Option<i32>,
) -> Result<PlayerTournament> {
    sqlx::query_as::<_, PlayerTournament>(
        "INSERT INTO player_tournaments (player_id, tournament_id, team_id, placement)
         VALUES ($1, $2, $3, $4)
         RETURNING *",
    )
    .bind(player_id)
    .bind(tournament_id)
    .bind(team_id)
    .bind(placement)
    .fetch_one(db)
    .await
    .context("recording tournament result")
}

/// A player's tournament history, most recent first.
pub async fn past_for_player(db: &PgPool, player_id: Uuid) -> Result<Vec<PastTournament>> {
    sqlx::query_as::<_, PastTournament>(
        "SELECT t.id, t.name, t.format, pt.placement, t.start_date AS date
           FROM player_tournaments pt
           JOIN tournaments t ON t.id = pt.tournament_id
          WHERE pt.player_id = $1
          ORDER BY t.start_date DESC",
    )
    .bind(player_id)
    .fetch_all(db)
    .await
    .context("fetching past tournaments")
}
