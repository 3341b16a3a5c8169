//! Player side: profile, availability, search, applications, invitations, swipes

use actix_web::{delete, get, post, put, web, HttpResponse};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    db::{
        models::PastTournament, player_repo, recruitment_repo, team_repo, tournament_repo,
        update::UpdateSet, user_repo,
    },
    domain::{
        roles::PlayingRole, schedule::WeeklySchedule, status::InvitationStatus, validate,
    },
    error::{ApiError, ApiResult},
    http::{auth::CurrentUser, users::UserResponse},
};

//////////////////////////////////////////////////
// DTOs
//////////////////////////////////////////////////

#[derive(Serialize)]
pub struct PlayerProfile {
    #[serde(flatten)]
    pub user: UserResponse,
    pub past_tournaments: Vec<PastTournament>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub full_name: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub city: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub avatar_url: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub batting_style: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub bowling_style: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub playing_role: Option<Option<PlayingRole>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub experience_years: Option<Option<i32>>,
    pub preferred_formats: Option<Vec<String>>,
}

impl ProfileUpdate {
    fn into_update(self) -> ApiResult<UpdateSet<'static>> {
        validate::non_negative("experience_years", self.experience_years.flatten())?;
        let mut set = UpdateSet::new("users");
        set.set_nullable("full_name", self.full_name)
            .set_nullable("city", self.city)
            .set_nullable("avatar_url", self.avatar_url)
            .set_nullable("batting_style", self.batting_style)
            .set_nullable("bowling_style", self.bowling_style)
            .set_nullable(
                "playing_role",
                self.playing_role
                    .map(|r| r.map(|r| r.as_str().to_string())),
            )
            .set_nullable("experience_years", self.experience_years)
            .set_some("preferred_formats", self.preferred_formats);
        Ok(set)
    }
}

#[derive(Deserialize)]
pub struct AvailabilityToggle {
    pub is_available: bool,
}

#[derive(Deserialize)]
pub struct AvailabilityRange {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Deserialize)]
pub struct CalendarEntry {
    pub date: NaiveDate,
    pub is_available: bool,
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct TournamentSearch {
    pub city: Option<String>,
    pub format: Option<String>,
    #[serde(default = "yes")]
    pub upcoming: bool,
}

fn yes() -> bool {
    true
}

#[derive(Deserialize)]
pub struct TeamSearch {
    pub city: Option<String>,
    pub format: Option<String>,
}

#[derive(Default, Deserialize)]
pub struct ApplyRequest {
    pub message: Option<String>,
}

#[derive(Deserialize)]
pub struct InvitationAnswer {
    pub status: InvitationStatus,
}

#[derive(Deserialize)]
pub struct DiscoverQuery {
    #[serde(default = "default_discover_limit")]
    pub limit: i64,
}

fn default_discover_limit() -> i64 {
    20
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeDirection {
    Like,
    Pass,
}

#[derive(Deserialize)]
pub struct SwipeRequest {
    pub direction: SwipeDirection,
}

#[derive(Debug, Serialize)]
pub struct SwipeResult {
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<Uuid>,
}

/// Blank query values (`?city=`) count as "no filter".
fn filter(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

//////////////////////////////////////////////////
// Profile
//////////////////////////////////////////////////

async fn profile_of(db: &PgPool, user: crate::db::models::User) -> ApiResult<PlayerProfile> {
    let past_tournaments = tournament_repo::past_for_player(db, user.id).await?;
    Ok(PlayerProfile {
        user: user.into(),
        past_tournaments,
    })
}

#[get("/me/profile")]
pub async fn get_profile(
    CurrentUser(user): CurrentUser,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(profile_of(&db, user).await?))
}

#[put("/me/profile")]
pub async fn update_profile(
    CurrentUser(user): CurrentUser,
    body: web::Json<ProfileUpdate>,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    let set = body.into_inner().into_update()?;
    let updated = user_repo::update(&db, user.id, set)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(HttpResponse::Ok().json(profile_of(&db, updated).await?))
}

//////////////////////////////////////////////////
// Availability
//////////////////////////////////////////////////

#[post("/me/availability")]
pub async fn set_availability(
    CurrentUser(user): CurrentUser,
    body: web::Json<AvailabilityToggle>,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    player_repo::set_available(&db, user.id, body.is_available).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Availability updated",
        "is_available": body.is_available,
    })))
}

#[get("/me/availability")]
pub async fn get_availability(
    CurrentUser(user): CurrentUser,
    query: web::Query<AvailabilityRange>,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    let start = filter(&query.start_date)
        .map(|raw| validate::date("start_date", raw))
        .transpose()?;
    let end = filter(&query.end_date)
        .map(|raw| validate::date("end_date", raw))
        .transpose()?;
    validate::ordered("start_date", start, "end_date", end)?;

    let rows = player_repo::availability_between(&db, user.id, start, end).await?;
    Ok(HttpResponse::Ok().json(rows))
}

#[post("/me/availability/calendar")]
pub async fn set_calendar_day(
    CurrentUser(user): CurrentUser,
    body: web::Json<CalendarEntry>,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    let row = player_repo::upsert_availability(
        &db,
        user.id,
        body.date,
        body.is_available,
        body.notes.as_deref(),
    )
    .await?;
    Ok(HttpResponse::Ok().json(row))
}

#[get("/me/schedule")]
pub async fn get_schedule(CurrentUser(user): CurrentUser) -> ApiResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(user.availability_schedule.0))
}

#[put("/me/schedule")]
pub async fn put_schedule(
    CurrentUser(user): CurrentUser,
    body: web::Json<WeeklySchedule>,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    let updated = user_repo::set_schedule(&db, user.id, &body).await?;
    Ok(HttpResponse::Ok().json(updated.availability_schedule.0))
}

//////////////////////////////////////////////////
// Search
//////////////////////////////////////////////////

#[get("/tournaments/search")]
pub async fn search_tournaments(
    _auth: CurrentUser,
    query: web::Query<TournamentSearch>,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    let from = query.upcoming.then(|| Utc::now().date_naive());
    let rows = tournament_repo::search(&db, filter(&query.city), filter(&query.format), from).await?;
    Ok(HttpResponse::Ok().json(rows))
}

#[get("/teams/search")]
pub async fn search_teams(
    _auth: CurrentUser,
    query: web::Query<TeamSearch>,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    let rows = team_repo::search(&db, filter(&query.city), filter(&query.format)).await?;
    Ok(HttpResponse::Ok().json(rows))
}

//////////////////////////////////////////////////
// Applications
//////////////////////////////////////////////////

#[post("/teams/{team_id}/apply")]
pub async fn apply(
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
    body: Option<web::Json<ApplyRequest>>,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    let body = body.map(web::Json::into_inner).unwrap_or_default();
    let app =
        recruitment_repo::apply(&db, path.into_inner(), user.id, body.message.as_deref()).await?;
    log::info!("player {} applied to team {}", user.id, app.team_id);
    Ok(HttpResponse::Created().json(app))
}

#[get("/me/applications")]
pub async fn my_applications(
    CurrentUser(user): CurrentUser,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(recruitment_repo::my_applications(&db, user.id).await?))
}

#[delete("/applications/{application_id}")]
pub async fn withdraw_application(
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    recruitment_repo::withdraw(&db, path.into_inner(), user.id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Application withdrawn" })))
}

//////////////////////////////////////////////////
// Invitations
//////////////////////////////////////////////////

#[get("/me/invitations")]
pub async fn my_invitations(
    CurrentUser(user): CurrentUser,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(recruitment_repo::my_invitations(&db, user.id).await?))
}

#[put("/invitations/{invitation_id}")]
pub async fn respond_invitation(
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
    body: web::Json<InvitationAnswer>,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    let inv = recruitment_repo::respond_invitation(
        &db,
        path.into_inner(),
        user.id,
        body.status,
        Utc::now(),
    )
    .await?;
    log::info!("player {} {} invitation {}", user.id, inv.status, inv.id);
    Ok(HttpResponse::Ok().json(inv))
}

//////////////////////////////////////////////////
// Swipe-to-match
//////////////////////////////////////////////////

#[get("/discover")]
pub async fn discover(
    CurrentUser(user): CurrentUser,
    query: web::Query<DiscoverQuery>,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    if !(1..=100).contains(&query.limit) {
        return Err(ApiError::unprocessable("limit must be between 1 and 100"));
    }
    let rows = player_repo::discover(&db, &user, query.limit).await?;
    Ok(HttpResponse::Ok().json(rows.into_iter().map(UserResponse::from).collect::<Vec<_>>()))
}

#[post("/{user_id}/swipe")]
pub async fn swipe(
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
    body: web::Json<SwipeRequest>,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    let target = path.into_inner();
    if target == user.id {
        return Err(ApiError::bad_request("Cannot swipe on yourself"));
    }
    user_repo::find(&db, target)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| ApiError::not_found("Player not found"))?;

    let liked = body.direction == SwipeDirection::Like;
    let conversation_id = player_repo::record_swipe(&db, user.id, target, liked).await?;
    if let Some(id) = conversation_id {
        log::info!("match between {} and {} (conversation {id})", user.id, target);
    }
    Ok(HttpResponse::Ok().json(SwipeResult {
        matched: conversation_id.is_some(),
        conversation_id,
    }))
}

#[get("/me/matches")]
pub async fn my_matches(
    CurrentUser(user): CurrentUser,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    let rows = player_repo::matches(&db, user.id).await?;
    Ok(HttpResponse::Ok().json(rows.into_iter().map(UserResponse::from).collect::<Vec<_>>()))
}

//////////////////////////////////////////////////
// Mount
//////////////////////////////////////////////////
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/players")
            .service(get_profile)
            .service(update_profile)
            .service(set_availability)
            .service(get_availability)
            .service(set_calendar_day)
            .service(get_schedule)
            .service(put_schedule)
            .service(search_tournaments)
            .service(search_teams)
            .service(apply)
            .service(my_applications)
            .service(withdraw_application)
            .service(my_invitations)
            .service(respond_invitation)
            .service(discover)
            .service(my_matches)
            .service(swipe),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_filters_are_ignored() {
        assert_eq!(filter(&Some("  ".into())), None);
        assert_eq!(filter(&Some(" Pune ".into())), Some("Pune"));
        assert_eq!(filter(&None), None);
    }

    #[test]
    fn swipe_direction_is_lowercase() {
        let req: SwipeRequest = serde_json::from_str(r#"{"direction":"like"}"#).unwrap();
        assert_eq!(req.direction, SwipeDirection::Like);
        assert!(serde_json::from_str::<SwipeRequest>(r#"{"direction":"superlike"}"#).is_err());
    }

    #[test]
    fn unmatched_swipe_omits_conversation() {
        let json = serde_json::to_value(SwipeResult {
            matched: false,
            conversation_id: None,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({ "matched": false }));
    }

    #[test]
    fn profile_update_rejects_negative_experience() {
        let body = ProfileUpdate {
            experience_years: Some(Some(-2)),
            ..Default::default()
        };
        assert!(body.into_update().is_err());
    }
}
