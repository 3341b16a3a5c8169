//! Account and profile endpoints

use actix_web::{delete, get, patch, post, put, web, HttpResponse};
use chrono::{DateTime, Utc};
use redis::Client as RedisClient;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    db::{models::User, update::UpdateSet, user_repo},
    domain::{
        roles::{AuthProvider, PlayingRole, Roles, UserRole},
        schedule::WeeklySchedule,
        validate,
    },
    error::{ApiError, ApiResult},
    http::auth::CurrentUser,
    presence,
};

//////////////////////////////////////////////////
// DTOs
//////////////////////////////////////////////////

/// Public shape of an account. Password hash and provider id stay server-side.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub discovery_radius: i32,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub roles: Roles,
    pub batting_style: Option<String>,
    pub bowling_style: Option<String>,
    pub playing_role: Option<String>,
    pub experience_years: Option<i32>,
    pub preferred_formats: Vec<String>,
    pub availability_schedule: WeeklySchedule,
    pub auth_provider: AuthProvider,
    pub is_verified: bool,
    pub is_active: bool,
    pub is_superuser: bool,
    pub is_available: bool,
    pub profile_visible: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        UserResponse {
            id: u.id,
            email: u.email,
            full_name: u.full_name,
            avatar_url: u.avatar_url,
            phone: u.phone,
            city: u.city,
            discovery_radius: u.discovery_radius,
            latitude: u.latitude,
            longitude: u.longitude,
            roles: u.roles,
            batting_style: u.batting_style,
            bowling_style: u.bowling_style,
            playing_role: u.playing_role,
            experience_years: u.experience_years,
            preferred_formats: u.preferred_formats,
            availability_schedule: u.availability_schedule.0,
            auth_provider: u.auth_provider,
            is_verified: u.is_verified,
            is_active: u.is_active,
            is_superuser: u.is_superuser,
            is_available: u.is_available,
            profile_visible: u.profile_visible,
            created_at: u.created_at,
            updated_at: u.updated_at,
            last_login: u.last_login,
        }
    }
}

/// `PUT /users/me`. Absent fields are left alone; `null` clears.
#[derive(Debug, Default, Deserialize)]
pub struct UserUpdate {
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub full_name: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub avatar_url: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub phone: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub city: Option<Option<String>>,
    pub discovery_radius: Option<i32>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub latitude: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub longitude: Option<Option<String>>,
    pub roles: Option<Vec<UserRole>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub batting_style: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub bowling_style: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub playing_role: Option<Option<PlayingRole>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub experience_years: Option<Option<i32>>,
    pub preferred_formats: Option<Vec<String>>,
    pub is_available: Option<bool>,
    pub profile_visible: Option<bool>,
}

impl UserUpdate {
    pub fn validate(&self) -> ApiResult<()> {
        if matches!(&self.roles, Some(roles) if roles.is_empty()) {
            return Err(ApiError::unprocessable("at least one role is required"));
        }
        if let Some(radius) = self.discovery_radius {
            validate::discovery_radius(radius)?;
        }
        validate::non_negative("experience_years", self.experience_years.flatten())?;
        Ok(())
    }

    pub fn into_update(self) -> UpdateSet<'static> {
        let mut set = UpdateSet::new("users");
        set.set_nullable("full_name", self.full_name)
            .set_nullable("avatar_url", self.avatar_url)
            .set_nullable("phone", self.phone)
            .set_nullable("city", self.city)
            .set_some("discovery_radius", self.discovery_radius)
            .set_nullable("latitude", self.latitude)
            .set_nullable("longitude", self.longitude)
            .set_some("roles", self.roles.map(|r| Roles::new(r).to_db()))
            .set_nullable("batting_style", self.batting_style)
            .set_nullable("bowling_style", self.bowling_style)
            .set_nullable(
                "playing_role",
                self.playing_role.map(|r| r.map(|r| r.as_str().to_string())),
            )
            .set_nullable("experience_years", self.experience_years)
            .set_some("preferred_formats", self.preferred_formats)
            .set_some("is_available", self.is_available)
            .set_some("profile_visible", self.profile_visible);
        set
    }
}

#[derive(Debug, Deserialize)]
pub struct OnboardingRequest {
    pub roles: Vec<UserRole>,
    pub city: String,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    #[serde(default = "default_radius")]
    pub discovery_radius: i32,
}

fn default_radius() -> i32 {
    25
}

#[derive(Debug, Deserialize)]
pub struct VisibilityQuery {
    pub profile_visible: bool,
}

#[derive(Serialize)]
pub struct OnlineResponse {
    pub user_id: Uuid,
    pub online: bool,
}

//////////////////////////////////////////////////
// Handlers
//////////////////////////////////////////////////

#[get("/me")]
pub async fn get_me(CurrentUser(user): CurrentUser) -> ApiResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

#[put("/me")]
pub async fn update_me(
    CurrentUser(user): CurrentUser,
    body: web::Json<UserUpdate>,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    body.validate()?;
    let updated = user_repo::update(&db, user.id, body.into_update())
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(HttpResponse::Ok().json(UserResponse::from(updated)))
}

#[post("/me/onboarding")]
pub async fn onboarding(
    CurrentUser(user): CurrentUser,
    body: web::Json<OnboardingRequest>,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    if body.roles.is_empty() {
        return Err(ApiError::unprocessable("at least one role is required"));
    }
    let city = validate::non_empty("city", &body.city)?.to_string();
    let radius = validate::discovery_radius(body.discovery_radius)?;

    let mut set = UpdateSet::new("users");
    set.set("roles", Roles::new(body.roles).to_db())
        .set("city", city)
        .set("latitude", body.latitude)
        .set("longitude", body.longitude)
        .set("discovery_radius", radius);

    let updated = user_repo::update(&db, user.id, set)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    log::info!("user {} finished onboarding", updated.id);
    Ok(HttpResponse::Ok().json(UserResponse::from(updated)))
}

#[patch("/me/visibility")]
pub async fn set_visibility(
    CurrentUser(user): CurrentUser,
    query: web::Query<VisibilityQuery>,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    let mut set = UpdateSet::new("users");
    set.set("profile_visible", query.profile_visible);
    let updated = user_repo::update(&db, user.id, set)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(HttpResponse::Ok().json(UserResponse::from(updated)))
}

#[delete("/me")]
pub async fn delete_me(
    CurrentUser(user): CurrentUser,
    db: web::Data<PgPool>,
    redis: web::Data<RedisClient>,
) -> ApiResult<HttpResponse> {
    user_repo::delete(&db, user.id).await?;
    presence::clear(&redis, user.id).await;
    log::info!("user {} deleted their account", user.id);
    Ok(HttpResponse::NoContent().finish())
}

#[get("/{user_id}")]
pub async fn get_user(
    _auth: CurrentUser,
    path: web::Path<Uuid>,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    let user = user_repo::find(&db, path.into_inner())
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

#[get("/{user_id}/online")]
pub async fn online(
    _auth: CurrentUser,
    path: web::Path<Uuid>,
    redis: web::Data<RedisClient>,
) -> ApiResult<HttpResponse> {
    let user_id = path.into_inner();
    let online = presence::is_online(&redis, user_id).await.unwrap_or_else(|e| {
        log::warn!("presence lookup for {user_id} failed: {e}");
        false
    });
    Ok(HttpResponse::Ok().json(OnlineResponse { user_id, online }))
}

//////////////////////////////////////////////////
// Mount
//////////////////////////////////////////////////
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    // `/me…` before `/{user_id}` so "me" is never parsed as an id
    cfg.service(
        web::scope("/users")
            .service(get_me)
            .service(update_me)
            .service(onboarding)
            .service(set_visibility)
            .service(delete_me)
            .service(get_user)
            .service(online),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_and_null_are_distinct() {
        let body: UserUpdate = serde_json::from_str(r#"{"city": null, "phone": "123"}"#).unwrap();
        assert_eq!(body.city, Some(None));
        assert_eq!(body.phone, Some(Some("123".to_string())));
        assert_eq!(body.full_name, None);
    }

    #[test]
    fn update_validation() {
        let body = UserUpdate {
            discovery_radius: Some(3),
            ..Default::default()
        };
        assert!(body.validate().is_err());
        let body = UserUpdate {
            experience_years: Some(Some(-1)),
            ..Default::default()
        };
        assert!(body.validate().is_err());
        let body = UserUpdate {
            experience_years: Some(None),
            ..Default::default()
        };
        assert!(body.validate().is_ok());
    }

    #[test]
    fn empty_role_list_is_rejected() {
        let body: UserUpdate = serde_json::from_str(r#"{"roles": []}"#).unwrap();
        let err = body.validate().unwrap_err();
        assert_eq!(err.to_string(), "at least one role is required");

        let body: UserUpdate = serde_json::from_str(r#"{"roles": ["player"]}"#).unwrap();
        assert!(body.validate().is_ok());
    }

    #[test]
    fn playing_role_must_be_a_known_role() {
        assert!(serde_json::from_str::<UserUpdate>(r#"{"playing_role": "twelfth man"}"#).is_err());

        let body: UserUpdate = serde_json::from_str(r#"{"playing_role": "wicket-keeper"}"#).unwrap();
        assert_eq!(body.playing_role, Some(Some(PlayingRole::WicketKeeper)));
        let body: UserUpdate = serde_json::from_str(r#"{"playing_role": null}"#).unwrap();
        assert_eq!(body.playing_role, Some(None));
    }
}
