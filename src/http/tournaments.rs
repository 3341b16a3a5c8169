//! Organizer side: tournament registry and results

use actix_web::{get, post, put, web, HttpResponse};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    db::{
        models::Tournament,
        team_repo,
        tournament_repo::{self, NewTournament},
        update::UpdateSet,
        user_repo,
    },
    domain::{roles::UserRole, validate},
    error::{ApiError, ApiResult},
    http::auth::CurrentUser,
};

//////////////////////////////////////////////////
// DTOs
//////////////////////////////////////////////////

#[derive(Debug, Deserialize)]
pub struct TournamentCreate {
    pub name: String,
    pub description: Option<String>,
    pub format: String,
    pub city: Option<String>,
    pub venue: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub registration_deadline: NaiveDate,
    pub max_teams: i32,
    #[serde(default)]
    pub entry_fee: i32,
    #[serde(default)]
    pub prize_pool: i32,
    pub logo_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TournamentUpdate {
    pub name: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub description: Option<Option<String>>,
    pub format: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub city: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub venue: Option<Option<String>>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub registration_deadline: Option<NaiveDate>,
    pub max_teams: Option<i32>,
    pub entry_fee: Option<i32>,
    pub prize_pool: Option<i32>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub logo_url: Option<Option<String>>,
}

#[derive(Deserialize)]
pub struct PublishRequest {
    pub is_published: bool,
}

#[derive(Deserialize)]
pub struct ResultRequest {
    pub player_id: Uuid,
    pub team_id: Option<Uuid>,
    pub placement: Option<i32>,
}

//////////////////////////////////////////////////
// Validation
//////////////////////////////////////////////////

/// Date ordering and money/size bounds for a tournament in its final shape.
fn check_schedule(start: NaiveDate, end: NaiveDate, deadline: NaiveDate) -> ApiResult<()> {
    validate::ordered("start_date", Some(start), "end_date", Some(end))?;
    validate::ordered("registration_deadline", Some(deadline), "start_date", Some(start))?;
    Ok(())
}

fn check_amounts(max_teams: Option<i32>, entry_fee: Option<i32>, prize_pool: Option<i32>) -> ApiResult<()> {
    validate::at_least("max_teams", max_teams, 1)?;
    validate::non_negative("entry_fee", entry_fee)?;
    validate::non_negative("prize_pool", prize_pool)?;
    Ok(())
}

impl TournamentCreate {
    pub fn validate(&self) -> ApiResult<()> {
        validate::non_empty("name", &self.name)?;
        validate::non_empty("format", &self.format)?;
        check_schedule(self.start_date, self.end_date, self.registration_deadline)?;
        check_amounts(Some(self.max_teams), Some(self.entry_fee), Some(self.prize_pool))
    }
}

impl TournamentUpdate {
    pub fn validate_against(&self, current: &Tournament) -> ApiResult<()> {
        if let Some(name) = &self.name {
            validate::non_empty("name", name)?;
        }
        if let Some(format) = &self.format {
            validate::non_empty("format", format)?;
        }
        check_schedule(
            self.start_date.unwrap_or(current.start_date),
            self.end_date.unwrap_or(current.end_date),
            self.registration_deadline
                .unwrap_or(current.registration_deadline),
        )?;
        check_amounts(self.max_teams, self.entry_fee, self.prize_pool)
    }

    pub fn into_update(self) -> UpdateSet<'static> {
        let mut set = UpdateSet::new("tournaments");
        set.set_some("name", self.name.map(|n| n.trim().to_string()))
            .set_nullable("description", self.description)
            .set_some("format", self.format)
            .set_nullable("city", self.city)
            .set_nullable("venue", self.venue)
            .set_some("start_date", self.start_date)
            .set_some("end_date", self.end_date)
            .set_some("registration_deadline", self.registration_deadline)
            .set_some("max_teams", self.max_teams)
            .set_some("entry_fee", self.entry_fee)
            .set_some("prize_pool", self.prize_pool)
            .set_nullable("logo_url", self.logo_url);
        set
    }
}

//////////////////////////////////////////////////
// Helpers
//////////////////////////////////////////////////

async fn organized(db: &PgPool, tournament_id: Uuid, user_id: Uuid) -> ApiResult<Tournament> {
    let tournament = tournament_repo::find(db, tournament_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Tournament not found"))?;
    if tournament.organizer_id != user_id {
        return Err(ApiError::forbidden(
            "Only the tournament organizer can manage this tournament",
        ));
    }
    Ok(tournament)
}

/// Unpublished tournaments only exist for their organizer.
//////////////////////////////////////////////////
// Handlers
//////////////////////////////////////////////////

#[post("")]
pub async fn create_tournament(
    CurrentUser(user): CurrentUser,
    body: web::Json<TournamentCreate>,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    if !user.roles.contains(UserRole::Organizer) {
        return Err(ApiError::forbidden("Only organizers can create tournaments"));
    }
    let body = body.into_inner();
    body.validate()?;

    let tournament = tournament_repo::insert(
        &db,
        user.id,
        NewTournament {
            name: body.name.trim(),
            description: body.description.as_deref(),
            format: body.format.trim(),
            city: body.city.as_deref(),
            venue: body.venue.as_deref(),
            start_date: body.start_date,
            end_date: body.end_date,
            registration_deadline: body.registration_deadline,
            max_teams: body.max_teams,
            entry_fee: body.entry_fee,
            prize_pool: body.prize_pool,
            logo_url: body.logo_url.as_deref(),
        },
    )
    .await?;
    log::info!("organizer {} created tournament {}", user.id, tournament.id);
    Ok(HttpResponse::Created().json(tournament))
}

#[get("/mine")]
pub async fn my_tournaments(
    CurrentUser(user): CurrentUser,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(tournament_repo::list_by_organizer(&db, user.id).await?))
}

#[get("/{tournament_id}")]
pub async fn get_tournament(
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    let tournament = tournament_repo::find(&db, path.into_inner())
        .await?
        .filter(|t| t.visible_to(user.id))
        .ok_or_else(|| ApiError::not_found("Tournament not found"))?;
    Ok(HttpResponse::Ok().json(tournament))
}

#[put("/{tournament_id}")]
pub async fn update_tournament(
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
    body: web::Json<TournamentUpdate>,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    let current = organized(&db, path.into_inner(), user.id).await?;
    let body = body.into_inner();
    body.validate_against(&current)?;
    let updated = tournament_repo::update(&db, current.id, body.into_update())
        .await?
        .ok_or_else(|| ApiError::not_found("Tournament not found"))?;
    Ok(HttpResponse::Ok().json(updated))
}

#[post("/{tournament_id}/publish")]
pub async fn publish(
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
    body: web::Json<PublishRequest>,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    let tournament = organized(&db, path.into_inner(), user.id).await?;
    let tournament = tournament_repo::set_published(&db, tournament.id, body.is_published).await?;
    Ok(HttpResponse::Ok().json(tournament))
}

#[get("/{tournament_id}/teams")]
pub async fn registered_teams(
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    let tournament = tournament_repo::find(&db, path.into_inner())
        .await?
        .filter(|t| t.visible_to(user.id))
        .ok_or_else(|| ApiError::not_found("Tournament not found"))?;
    Ok(HttpResponse::Ok().json(team_repo::teams_in_tournament(&db, tournament.id).await?))
}

#[post("/{tournament_id}/results")]
pub async fn record_result(
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
    body: web::Json<ResultRequest>,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    let tournament = organized(&db, path.into_inner(), user.id).await?;
    validate::at_least("placement", body.placement, 1)?;
    user_repo::find(&db, body.player_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Player not found"))?;

    let row = tournament_repo::record_result(
        &db,
        tournament.id,
        body.player_id,
        body.team_id,
        body.placement,
    )
    .await?;
    Ok(HttpResponse::Created().json(row))
}

//////////////////////////////////////////////////
// Mount
//////////////////////////////////////////////////
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/tournaments")
            .service(create_tournament)
            .service(my_tournaments)
            .service(get_tournament)
            .service(update_tournament)
            .service(publish)
            .service(registered_teams)
            .service(record_result),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn deadline_must_precede_start() {
        assert!(check_schedule(d("2026-05-01"), d("2026-05-10"), d("2026-04-20")).is_ok());
        assert!(check_schedule(d("2026-05-01"), d("2026-05-01"), d("2026-05-01")).is_ok());
        assert!(check_schedule(d("2026-05-01"), d("2026-05-10"), d("2026-05-02")).is_err());
        assert!(check_schedule(d("2026-05-10"), d("2026-05-01"), d("2026-04-20")).is_err());
    }

    #[test]
    fn drafts_are_visible_to_their_organizer_only() {
        let now = chrono::Utc::now();
        let organizer = Uuid::new_v4();
        let mut t = Tournament {
            id: Uuid::new_v4(),
            name: "Monsoon Cup".into(),
            description: None,
            organizer_id: organizer,
            format: "T20".into(),
            city: Some("Mumbai".into()),
            venue: None,
            start_date: d("2026-07-01"),
            end_date: d("2026-07-10"),
            registration_deadline: d("2026-06-20"),
            max_teams: 8,
            entry_fee: 0,
            prize_pool: 0,
            logo_url: None,
            is_published: false,
            created_at: now,
            updated_at: now,
        };
        assert!(t.visible_to(organizer));
        assert!(!t.visible_to(Uuid::new_v4()));
        t.is_published = true;
        assert!(t.visible_to(Uuid::new_v4()));
    }

    #[test]
    fn amounts_are_bounded() {
        assert!(check_amounts(Some(0), None, None).is_err());
        assert!(check_amounts(Some(8), Some(-1), None).is_err());
        assert!(check_amounts(Some(8), Some(0), Some(0)).is_ok());
    }
}
