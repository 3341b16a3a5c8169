//! Captain side: teams, requirements, tournament entries, roster decisions

use actix_web::{delete, get, patch, post, put, web, HttpResponse};
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    config::Settings,
    db::{
        is_unique_violation,
        models::{PlayerRequirement, Team, TeamTournamentParticipation},
        recruitment_repo,
        team_repo::{self, NewRequirement, NewTeam},
        tournament_repo,
        update::UpdateSet,
    },
    domain::{
        roles::{PlayingRole, SkillLevel, UserRole},
        validate,
    },
    error::{ApiError, ApiResult},
    http::auth::CurrentUser,
};

pub const MAX_SQUAD: i32 = 50;

//////////////////////////////////////////////////
// DTOs
//////////////////////////////////////////////////

#[derive(Debug, Deserialize)]
pub struct TeamCreate {
    pub name: String,
    pub description: Option<String>,
    pub city: Option<String>,
    pub home_ground: Option<String>,
    pub established_date: Option<NaiveDate>,
    pub logo_url: Option<String>,
    #[serde(default)]
    pub preferred_formats: Vec<String>,
    #[serde(default = "default_max_players")]
    pub max_players: i32,
}

fn default_max_players() -> i32 {
    15
}

#[derive(Debug, Default, Deserialize)]
pub struct TeamUpdate {
    pub name: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub city: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub home_ground: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub established_date: Option<Option<NaiveDate>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub logo_url: Option<Option<String>>,
    pub preferred_formats: Option<Vec<String>>,
    pub max_players: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Serialize)]
pub struct TeamDetail {
    #[serde(flatten)]
    pub team: Team,
    pub player_requirements: Vec<PlayerRequirement>,
    pub tournament_participations: Vec<TeamTournamentParticipation>,
}

#[derive(Debug, Deserialize)]
pub struct RequirementCreate {
    pub required_role: PlayingRole,
    pub skill_level: Option<SkillLevel>,
    pub min_experience_years: Option<i32>,
    pub max_experience_years: Option<i32>,
    pub min_age: Option<i32>,
    pub max_age: Option<i32>,
    #[serde(default)]
    pub preferred_formats: Vec<String>,
    pub availability_start_date: Option<NaiveDate>,
    pub availability_end_date: Option<NaiveDate>,
    #[serde(default = "one")]
    pub positions_available: i32,
    pub description: Option<String>,
}

fn one() -> i32 {
    1
}

#[derive(Debug, Default, Deserialize)]
pub struct RequirementUpdate {
    pub required_role: Option<PlayingRole>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub skill_level: Option<Option<SkillLevel>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub min_experience_years: Option<Option<i32>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub max_experience_years: Option<Option<i32>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub min_age: Option<Option<i32>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub max_age: Option<Option<i32>>,
    pub preferred_formats: Option<Vec<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub availability_start_date: Option<Option<NaiveDate>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub availability_end_date: Option<Option<NaiveDate>>,
    pub positions_available: Option<i32>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub description: Option<Option<String>>,
    pub is_active: Option<bool>,
}

#[derive(Deserialize)]
pub struct RequirementFilter {
    #[serde(default = "yes")]
    pub active_only: bool,
}

fn yes() -> bool {
    true
}

#[derive(Deserialize)]
pub struct RegisterTournament {
    pub tournament_id: Uuid,
}

#[derive(Debug, Default, Deserialize)]
pub struct ParticipationUpdate {
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub placement: Option<Option<i32>>,
    pub is_confirmed: Option<bool>,
}

#[derive(Deserialize)]
pub struct SquadFullRequest {
    pub is_squad_full: bool,
}

#[derive(Deserialize)]
pub struct InviteRequest {
    pub player_id: Uuid,
    pub message: Option<String>,
}

//////////////////////////////////////////////////
// Validation
//////////////////////////////////////////////////

fn check_max_players(max: i32) -> ApiResult<()> {
    if (1..=MAX_SQUAD).contains(&max) {
        Ok(())
    } else {
        Err(ApiError::unprocessable(format!(
            "max_players must be between 1 and {MAX_SQUAD}"
        )))
    }
}

/// Shared shape checks for a requirement, whichever bounds are known.
fn check_requirement(
    min_exp: Option<i32>,
    max_exp: Option<i32>,
    min_age: Option<i32>,
    max_age: Option<i32>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    positions: Option<i32>,
) -> ApiResult<()> {
    validate::non_negative("min_experience_years", min_exp)?;
    validate::non_negative("max_experience_years", max_exp)?;
    validate::non_negative("min_age", min_age)?;
    validate::non_negative("max_age", max_age)?;
    validate::at_least("positions_available", positions, 1)?;
    validate::ordered("min_experience_years", min_exp, "max_experience_years", max_exp)?;
    validate::ordered("min_age", min_age, "max_age", max_age)?;
    validate::ordered("availability_start_date", start, "availability_end_date", end)?;
    Ok(())
}

impl RequirementCreate {
    pub fn validate(&self) -> ApiResult<()> {
        check_requirement(
            self.min_experience_years,
            self.max_experience_years,
            self.min_age,
            self.max_age,
            self.availability_start_date,
            self.availability_end_date,
            Some(self.positions_available),
        )
    }
}

impl RequirementUpdate {
    /// Validates the requirement as it would look after the update.
    pub fn validate_against(&self, current: &PlayerRequirement) -> ApiResult<()> {
        check_requirement(
            self.min_experience_years.unwrap_or(current.min_experience_years),
            self.max_experience_years.unwrap_or(current.max_experience_years),
            self.min_age.unwrap_or(current.min_age),
            self.max_age.unwrap_or(current.max_age),
            self.availability_start_date
                .unwrap_or(current.availability_start_date),
            self.availability_end_date
                .unwrap_or(current.availability_end_date),
            self.positions_available,
        )
    }

    pub fn into_update(self) -> UpdateSet<'static> {
        let mut set = UpdateSet::new("player_requirements");
        set.set_some("required_role", self.required_role.map(|r| r.as_str()))
            .set_nullable("skill_level", self.skill_level.map(|s| s.map(|s| s.as_str())))
            .set_nullable("min_experience_years", self.min_experience_years)
            .set_nullable("max_experience_years", self.max_experience_years)
            .set_nullable("min_age", self.min_age)
            .set_nullable("max_age", self.max_age)
            .set_some("preferred_formats", self.preferred_formats)
            .set_nullable("availability_start_date", self.availability_start_date)
            .set_nullable("availability_end_date", self.availability_end_date)
            .set_some("positions_available", self.positions_available)
            .set_nullable("description", self.description)
            .set_some("is_active", self.is_active);
        set
    }
}

impl TeamUpdate {
    pub fn into_update(self) -> ApiResult<UpdateSet<'static>> {
        if let Some(max) = self.max_players {
            check_max_players(max)?;
        }
        let name = self
            .name
            .as_deref()
            .map(|n| validate::non_empty("name", n).map(str::to_string))
            .transpose()?;

        let mut set = UpdateSet::new("teams");
        set.set_some("name", name)
            .set_nullable("description", self.description)
            .set_nullable("city", self.city)
            .set_nullable("home_ground", self.home_ground)
            .set_nullable("established_date", self.established_date)
            .set_nullable("logo_url", self.logo_url)
            .set_some("preferred_formats", self.preferred_formats)
            .set_some("max_players", self.max_players)
            .set_some("is_active", self.is_active);
        Ok(set)
    }
}

//////////////////////////////////////////////////
// Helpers
//////////////////////////////////////////////////

/// The team, if `user_id` captains it: 404 when unknown, 403 otherwise.
async fn captained(db: &PgPool, team_id: Uuid, user_id: Uuid) -> ApiResult<Team> {
    let team = team_repo::find(db, team_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Team not found"))?;
    if team.captain_id != user_id {
        return Err(ApiError::forbidden("Only the team captain can manage this team"));
    }
    Ok(team)
}

//////////////////////////////////////////////////
// Teams
//////////////////////////////////////////////////

#[post("")]
pub async fn create_team(
    CurrentUser(user): CurrentUser,
    body: web::Json<TeamCreate>,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    if !user.roles.contains(UserRole::Captain) {
        return Err(ApiError::forbidden("Only captains can create teams"));
    }
    let body = body.into_inner();
    let name = validate::non_empty("name", &body.name)?;
    check_max_players(body.max_players)?;

    let team = team_repo::insert(
        &db,
        user.id,
        NewTeam {
            name,
            description: body.description.as_deref(),
            city: body.city.as_deref(),
            home_ground: body.home_ground.as_deref(),
            established_date: body.established_date,
            logo_url: body.logo_url.as_deref(),
            preferred_formats: &body.preferred_formats,
            max_players: body.max_players,
        },
    )
    .await?;
    log::info!("captain {} created team {} ({})", user.id, team.id, team.name);
    Ok(HttpResponse::Created().json(team))
}

#[get("/mine")]
pub async fn my_teams(
    CurrentUser(user): CurrentUser,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(team_repo::list_by_captain(&db, user.id).await?))
}

#[get("/{team_id}")]
pub async fn get_team(
    _auth: CurrentUser,
    path: web::Path<Uuid>,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    let team = team_repo::find(&**db, path.into_inner())
        .await?
        .ok_or_else(|| ApiError::not_found("Team not found"))?;
    let player_requirements = team_repo::list_requirements(&db, team.id, true).await?;
    let tournament_participations = team_repo::list_participations(&db, team.id).await?;
    Ok(HttpResponse::Ok().json(TeamDetail {
        team,
        player_requirements,
        tournament_participations,
    }))
}

#[put("/{team_id}")]
pub async fn update_team(
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
    body: web::Json<TeamUpdate>,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    let team = captained(&db, path.into_inner(), user.id).await?;
    let set = body.into_inner().into_update()?;
    let team = team_repo::update(&db, team.id, set)
        .await?
        .ok_or_else(|| ApiError::not_found("Team not found"))?;
    Ok(HttpResponse::Ok().json(team))
}

#[post("/{team_id}/mark-squad-full")]
pub async fn mark_squad_full(
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
    body: web::Json<SquadFullRequest>,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    let team = captained(&db, path.into_inner(), user.id).await?;
    let team = team_repo::set_squad_full(&db, team.id, body.is_squad_full).await?;
    Ok(HttpResponse::Ok().json(team))
}

//////////////////////////////////////////////////
// Requirements
//////////////////////////////////////////////////

#[post("/{team_id}/requirements")]
pub async fn create_requirement(
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
    body: web::Json<RequirementCreate>,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    let team = captained(&db, path.into_inner(), user.id).await?;
    let body = body.into_inner();
    body.validate()?;
    let req = team_repo::insert_requirement(
        &db,
        team.id,
        NewRequirement {
            required_role: body.required_role,
            skill_level: body.skill_level,
            min_experience_years: body.min_experience_years,
            max_experience_years: body.max_experience_years,
            min_age: body.min_age,
            max_age: body.max_age,
            preferred_formats: &body.preferred_formats,
            availability_start_date: body.availability_start_date,
            availability_end_date: body.availability_end_date,
            positions_available: body.positions_available,
            description: body.description.as_deref(),
        },
    )
    .await?;
    Ok(HttpResponse::Created().json(req))
}

#[get("/{team_id}/requirements")]
pub async fn list_requirements(
    _auth: CurrentUser,
    path: web::Path<Uuid>,
    query: web::Query<RequirementFilter>,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    let team_id = path.into_inner();
    team_repo::find(&**db, team_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Team not found"))?;
    let rows = team_repo::list_requirements(&db, team_id, query.active_only).await?;
    Ok(HttpResponse::Ok().json(rows))
}

/// The requirement and its team, if `user_id` captains that team.
async fn captained_requirement(
    db: &PgPool,
    requirement_id: Uuid,
    user_id: Uuid,
) -> ApiResult<PlayerRequirement> {
    let req = team_repo::find_requirement(db, requirement_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Requirement not found"))?;
    captained(db, req.team_id, user_id).await?;
    Ok(req)
}

#[put("/requirements/{requirement_id}")]
pub async fn update_requirement(
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
    body: web::Json<RequirementUpdate>,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    let current = captained_requirement(&db, path.into_inner(), user.id).await?;
    let body = body.into_inner();
    body.validate_against(&current)?;
    let updated = team_repo::update_requirement(&db, current.id, body.into_update())
        .await?
        .ok_or_else(|| ApiError::not_found("Requirement not found"))?;
    Ok(HttpResponse::Ok().json(updated))
}

#[delete("/requirements/{requirement_id}")]
pub async fn delete_requirement(
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    let req = captained_requirement(&db, path.into_inner(), user.id).await?;
    team_repo::delete_requirement(&db, req.id).await?;
    Ok(HttpResponse::NoContent().finish())
}

//////////////////////////////////////////////////
// Tournament participations
//////////////////////////////////////////////////

#[post("/{team_id}/tournaments")]
pub async fn register_tournament(
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
    body: web::Json<RegisterTournament>,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    let team = captained(&db, path.into_inner(), user.id).await?;
    let tournament = tournament_repo::find(&db, body.tournament_id)
        .await?
        .filter(|t| t.visible_to(user.id))
        .ok_or_else(|| ApiError::not_found("Tournament not found"))?;

    match team_repo::insert_participation(&db, team.id, tournament.id).await {
        Ok(p) => Ok(HttpResponse::Created().json(p)),
        Err(e) if is_unique_violation(&e) => Err(ApiError::conflict(
            "Team already registered for this tournament",
        )),
        Err(e) => Err(e.into()),
    }
}

#[get("/{team_id}/tournaments")]
pub async fn list_tournaments(
    _auth: CurrentUser,
    path: web::Path<Uuid>,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    let rows = team_repo::list_participations(&db, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(rows))
}

#[patch("/{team_id}/tournaments/{participation_id}")]
pub async fn update_participation(
    CurrentUser(user): CurrentUser,
    path: web::Path<(Uuid, Uuid)>,
    body: web::Json<ParticipationUpdate>,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    let (team_id, participation_id) = path.into_inner();
    let participation = team_repo::find_participation(&db, team_id, participation_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Participation not found"))?;
    let tournament = tournament_repo::find(&db, participation.tournament_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Tournament not found"))?;
    if tournament.organizer_id != user.id {
        return Err(ApiError::forbidden(
            "Only the tournament organizer can update participations",
        ));
    }

    let body = body.into_inner();
    validate::at_least("placement", body.placement.flatten(), 1)?;
    let mut set = UpdateSet::new("team_tournament_participations");
    set.set_nullable("placement", body.placement)
        .set_some("is_confirmed", body.is_confirmed);
    let updated = team_repo::update_participation(&db, participation.id, set)
        .await?
        .ok_or_else(|| ApiError::not_found("Participation not found"))?;
    Ok(HttpResponse::Ok().json(updated))
}

//////////////////////////////////////////////////
// Roster: invitations and applications
//////////////////////////////////////////////////

#[post("/{team_id}/invite")]
pub async fn invite_player(
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
    body: web::Json<InviteRequest>,
    db: web::Data<PgPool>,
    settings: web::Data<Settings>,
) -> ApiResult<HttpResponse> {
    let expires_at = Utc::now() + Duration::days(settings.invitation_expire_days);
    let inv = recruitment_repo::invite(
        &db,
        path.into_inner(),
        user.id,
        body.player_id,
        body.message.as_deref(),
        expires_at,
    )
    .await?;
    log::info!("team {} invited player {}", inv.team_id, inv.player_id);
    Ok(HttpResponse::Created().json(inv))
}

#[get("/{team_id}/applications")]
pub async fn team_applications(
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    let team = captained(&db, path.into_inner(), user.id).await?;
    Ok(HttpResponse::Ok().json(recruitment_repo::team_applications(&db, team.id).await?))
}

#[post("/applications/{application_id}/approve")]
pub async fn approve_application(
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    let app = recruitment_repo::decide_application(&db, path.into_inner(), user.id, true).await?;
    Ok(HttpResponse::Ok().json(app))
}

#[post("/applications/{application_id}/reject")]
pub async fn reject_application(
    CurrentUser(user): CurrentUser,
    path: web::Path<Uuid>,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    let app = recruitment_repo::decide_application(&db, path.into_inner(), user.id, false).await?;
    Ok(HttpResponse::Ok().json(app))
}

//////////////////////////////////////////////////
// Mount
//////////////////////////////////////////////////
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    // literal segments (`mine`, `requirements`, `applications`) before `{team_id}`
    cfg.service(
        web::scope("/teams")
            .service(create_team)
            .service(my_teams)
            .service(update_requirement)
            .service(delete_requirement)
            .service(approve_application)
            .service(reject_application)
            .service(get_team)
            .service(update_team)
            .service(mark_squad_full)
            .service(create_requirement)
            .service(list_requirements)
            .service(register_tournament)
            .service(list_tournaments)
            .service(update_participation)
            .service(invite_player)
            .service(team_applications),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn squad_size_bounds() {
        assert!(check_max_players(0).is_err());
        assert!(check_max_players(1).is_ok());
        assert!(check_max_players(MAX_SQUAD).is_ok());
        assert!(check_max_players(MAX_SQUAD + 1).is_err());
    }

    #[test]
    fn requirement_ranges_must_be_ordered() {
        let req: RequirementCreate = serde_json::from_value(serde_json::json!({
            "required_role": "wicket_keeper",
            "min_age": 30,
            "max_age": 18,
        }))
        .unwrap();
        assert!(req.validate().is_err());

        let req: RequirementCreate = serde_json::from_value(serde_json::json!({
            "required_role": "bowler",
            "skill_level": "advanced",
            "positions_available": 0,
        }))
        .unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn requirement_defaults() {
        let req: RequirementCreate =
            serde_json::from_value(serde_json::json!({ "required_role": "batsman" })).unwrap();
        assert_eq!(req.positions_available, 1);
        assert!(req.preferred_formats.is_empty());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn team_detail_nests_requirements_and_participations() {
        let now = chrono::Utc::now();
        let team = Team {
            id: Uuid::new_v4(),
            name: "Deccan XI".into(),
            description: None,
            captain_id: Uuid::new_v4(),
            city: Some("Hyderabad".into()),
            home_ground: None,
            established_date: None,
            logo_url: None,
            preferred_formats: vec!["T20".into()],
            is_active: true,
            max_players: 15,
            current_player_count: 3,
            is_squad_full: false,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(TeamDetail {
            team,
            player_requirements: vec![],
            tournament_participations: vec![],
        })
        .unwrap();
        assert_eq!(json["name"], "Deccan XI");
        assert!(json["player_requirements"].is_array());
        assert!(json["tournament_participations"].is_array());
        assert!(json.get("requirements").is_none());
    }

    #[test]
    fn team_update_rejects_blank_name() {
        let body = TeamUpdate {
            name: Some("  ".into()),
            ..Default::default()
        };
        assert!(body.into_update().is_err());
    }
}
