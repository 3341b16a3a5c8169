use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::{PgExecutor, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{
    models::{PlayerRequirement, Team, TeamTournamentParticipation},
    update::UpdateSet,
};
use crate::domain::{
    roles::{PlayingRole, SkillLevel},
    squad::Squad,
};

pub struct NewTeam<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub city: Option<&'a str>,
    pub home_ground: Option<&'a str>,
    pub established_date: Option<NaiveDate>,
    pub logo_url: Option<&'a str>,
    pub preferred_formats: &'a [String],
    pub max_players: i32,
}

pub async fn insert(db: &PgPool, captain_id: Uuid, new: NewTeam<'_>) -> Result<Team> {
    sqlx::query_as::<_, Team>(
        r#"INSERT INTO teams (name, description, captain_id, city, home_ground,
                              established_date, logo_url, preferred_formats, max_players)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
           RETURNING *"#,
    )
    .bind(new.name)
    .bind(new.description)
    .bind(captain_id)
    .bind(new.city)
    .bind(new.home_ground)
    .bind(new.established_date)
    .bind(new.logo_url)
    .bind(new.preferred_formats)
    .bind(new.max_players)
    .fetch_one(db)
    .await
    .context("inserting team")
}

pub async fn find<'e>(db: impl PgExecutor<'e>, id: Uuid) -> Result<Option<Team>> {
    sqlx::query_as::<_, Team>("SELECT * FROM teams WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await
        .context("fetching team")
}

/// Row-locks the team until `tx` ends; squad counters are only moved under this lock.
pub async fn lock(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> Result<Option<Team>> {
    sqlx::query_as::<_, Team>("SELECT * FROM teams WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .context("locking team")
}

pub async fn list_by_captain(db: &PgPool, captain_id: Uuid) -> Result<Vec<Team>> {
    sqlx::query_as::<_, Team>(
        "SELECT * FROM teams WHERE captain_id = $1 ORDER BY created_at DESC",
    )
    .bind(captain_id)
    .fetch_all(db)
    .await
    .context("listing captain's teams")
}

/// Active teams, optionally narrowed by city substring and a format they play.
pub async fn search(db: &PgPool, city: Option<&str>, format: Option<&str>) -> Result<Vec<Team>> {
    sqlx::query_as::<_, Team>(
        r#"SELECT * FROM teams
            WHERE is_active
              AND ($1::text IS NULL OR city ILIKE '%' || $1 || '%')
              AND ($2::text IS NULL OR $2 = ANY(preferred_formats))
            ORDER BY created_at DESC"#,
    )
    .bind(city)
    .bind(format)
    .fetch_all(db)
    .await
    .context("searching teams")
}

pub async fn update(db: &PgPool, id: Uuid, set: UpdateSet<'_>) -> Result<Option<Team>> {
    set.apply(id, db).await.context("updating team")
}

pub async fn set_squad_full(db: &PgPool, id: Uuid, full: bool) -> Result<Team> {
    sqlx::query_as::<_, Team>(
        "UPDATE teams SET is_squad_full = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(full)
    .fetch_one(db)
    .await
    .context("marking squad full")
}

/// Persists the counters of a squad that just admitted a player.
pub async fn store_squad(tx: &mut Transaction<'_, Postgres>, id: Uuid, squad: Squad) -> Result<()> {
    sqlx::query(
        "UPDATE teams
            SET current_player_count = $2, is_squad_full = $3, updated_at = NOW()
          WHERE id = $1",
    )
    .bind(id)
    .bind(squad.current_player_count)
    .bind(squad.is_squad_full)
    .execute(&mut **tx)
    .await
    .context("updating squad counters")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// requirements
// ---------------------------------------------------------------------------

pub struct NewRequirement<'a> {
    pub required_role: PlayingRole,
    pub skill_level: Option<SkillLevel>,
    pub min_experience_years: Option<i32>,
    pub max_experience_years: Option<i32>,
    pub min_age: Option<i32>,
    pub max_age: Option<i32>,
    pub preferred_formats: &'a [String],
    pub availability_start_date: Option<NaiveDate>,
    pub availability_end_date: Option<NaiveDate>,
    pub positions_available: i32,
    pub description: Option<&'a str>,
}

pub async fn insert_requirement(
    db: &PgPool,
    team_id: Uuid,
    new: NewRequirement<'_>,
) -> Result<PlayerRequirement> {
    sqlx::query_as::<_, PlayerRequirement>(
        r#"INSERT INTO player_requirements
               (team_id, required_role, skill_level, min_experience_years, max_experience_years,
                min_age, max_age, preferred_formats, availability_start_date,
                availability_end_date, positions_available, description)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
           RETURNING *"#,
    )
    .bind(team_id)
    .bind(new.required_role.as_str())
    .bind(new.skill_level.map(|s| s.as_str()))
    .bind(new.min_experience_years)
    .bind(new.max_experience_years)
    .bind(new.min_age)
    .bind(new.max_age)
    .bind(new.preferred_formats)
    .bind(new.availability_start_date)
    .bind(new.availability_end_date)
    .bind(new.positions_available)
    .bind(new.description)
    .fetch_one(db)
    .await
    .context("inserting player requirement")
}

pub async fn find_requirement(db: &PgPool, id: Uuid) -> Result<Option<PlayerRequirement>> {
    sqlx::query_as::<_, PlayerRequirement>("SELECT * FROM player_requirements WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await
        .context("fetching player requirement")
}

pub async fn list_requirements(
    db: &PgPool,
    team_id: Uuid,
    active_only: bool,
) -> Result<Vec<PlayerRequirement>> {
    sqlx::query_as::<_, PlayerRequirement>(
        "SELECT * FROM player_requirements
          WHERE team_id = $1 AND (NOT $2 OR is_active)
          ORDER BY created_at DESC",
    )
    .bind(team_id)
    .bind(active_only)
    .fetch_all(db)
    .await
    .context("listing player requirements")
}

pub async fn update_requirement(
    db: &PgPool,
    id: Uuid,
    set: UpdateSet<'_>,
) -> Result<Option<PlayerRequirement>> {
    set.apply(id, db).await.context("updating player requirement")
}

pub async fn delete_requirement(db: &PgPool, id: Uuid) -> Result<bool> {
    let rows = sqlx::query("DELETE FROM player_requirements WHERE id = $1")
        .bind(id)
        .execute(db)
        .await
        .context("deleting player requirement")?
        .rows_affected();
    Ok(rows > 0)
}

// ---------------------------------------------------------------------------
// tournament participations
// ---------------------------------------------------------------------------

pub async fn insert_participation(
    db: &PgPool,
    team_id: Uuid,
    tournament_id: Uuid,
) -> Result<TeamTournamentParticipation> {
    sqlx::query_as::<_, TeamTournamentParticipation>(
        "INSERT INTO team_tournament_participations (team_id, tournament_id)
         VALUES ($1, $2)
         RETURNING *",
    )
    .bind(team_id)
    .bind(tournament_id)
    .fetch_one(db)
    .await
    .context("registering team for tournament")
}

pub async fn list_participations(
    db: &PgPool,
    team_id: Uuid,
) -> Result<Vec<TeamTournamentParticipation>> {
    sqlx::query_as::<_, TeamTournamentParticipation>(
        "SELECT * FROM team_tournament_participations
          WHERE team_id = $1
          ORDER BY registration_date DESC",
    )
    .bind(team_id)
    .fetch_all(db)
    .await
    .context("listing team participations")
}

pub async fn find_participation(
    db: &PgPool,
    team_id: Uuid,
    id: Uuid,
) -> Result<Option<TeamTournamentParticipation>> {
    sqlx::query_as::<_, TeamTournamentParticipation>(
        "SELECT * FROM team_tournament_participations WHERE id = $1 AND team_id = $2",
    )
    .bind(id)
    .bind(team_id)
    .fetch_optional(db)
    .await
    .context("fetching participation")
}

pub async fn update_participation(
    db: &PgPool,
    id: Uuid,
    set: UpdateSet<'_>,
) -> Result<Option<TeamTournamentParticipation>> {
    set.apply(id, db).await.context("updating participation")
}

/// Teams registered for one tournament, in registration order.
pub async fn teams_in_tournament(db: &PgPool, tournament_id: Uuid) -> Result<Vec<Team>> {
    sqlx::query_as::<_, Team>(
        "SELECT t.*
           FROM teams t
           JOIN team_tournament_participations p ON p.team_id = t.id
          WHERE p.tournament_id = $1
          ORDER BY p.registration_date",
    )
    .bind(tournament_id)
    .fetch_all(db)
    .await
    .context("listing tournament teams")
}
