//! Superuser moderation: platform stats, user and team management

use actix_web::{delete, get, patch, web, HttpResponse};
use redis::Client as RedisClient;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    cache::{self, ADMIN_STATS_KEY},
    config::Settings,
    db::{
        admin_repo::{self, PlatformStats},
        team_repo, token_repo,
        update::UpdateSet,
        user_repo,
    },
    domain::validate::Page,
    error::{ApiError, ApiResult},
    http::{auth::AdminUser, users::UserResponse},
    presence,
};

//////////////////////////////////////////////////
// DTOs
//////////////////////////////////////////////////

/// `?skip&limit&search`. Fields are spelled out rather than flattened from
/// [`Page`]: flattened numbers do not survive urlencoded parsing.
#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub search: Option<String>,
}

fn default_limit() -> i64 {
    Page::default().limit
}

impl ListQuery {
    fn page(&self) -> ApiResult<Page> {
        Page {
            skip: self.skip,
            limit: self.limit,
        }
        .checked()
    }

    fn search(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UserFlags {
    pub is_active: Option<bool>,
    pub is_verified: Option<bool>,
    pub is_superuser: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TeamFlags {
    pub is_active: Option<bool>,
    pub is_squad_full: Option<bool>,
}

//////////////////////////////////////////////////
// GET /admin/stats
//////////////////////////////////////////////////
#[get("/stats")]
pub async fn stats(
    _admin: AdminUser,
    db: web::Data<PgPool>,
    redis: web::Data<RedisClient>,
    settings: web::Data<Settings>,
) -> ApiResult<HttpResponse> {
    if let Some(cached) = cache::get_json::<PlatformStats>(&redis, ADMIN_STATS_KEY).await {
        return Ok(HttpResponse::Ok().json(cached));
    }
    let fresh = admin_repo::stats(&db).await?;
    cache::put_json(&redis, ADMIN_STATS_KEY, &fresh, settings.stats_cache_ttl).await;
    Ok(HttpResponse::Ok().json(fresh))
}

//////////////////////////////////////////////////
// Users
//////////////////////////////////////////////////
#[get("/users")]
pub async fn list_users(
    _admin: AdminUser,
    query: web::Query<ListQuery>,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    let page = query.page()?;
    let rows = admin_repo::list_users(&db, query.search(), page).await?;
    Ok(HttpResponse::Ok().json(rows.into_iter().map(UserResponse::from).collect::<Vec<_>>()))
}

#[patch("/users/{user_id}")]
pub async fn update_user(
    AdminUser(admin): AdminUser,
    path: web::Path<Uuid>,
    body: web::Json<UserFlags>,
    db: web::Data<PgPool>,
    redis: web::Data<RedisClient>,
) -> ApiResult<HttpResponse> {
    let user_id = path.into_inner();
    if user_id == admin.id && body.is_superuser == Some(false) {
        return Err(ApiError::bad_request("Cannot remove your own superuser status"));
    }

    let mut set = UpdateSet::new("users");
    set.set_some("is_active", body.is_active)
        .set_some("is_verified", body.is_verified)
        .set_some("is_superuser", body.is_superuser);
    let user = user_repo::update(&db, user_id, set)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if body.is_active == Some(false) {
        let revoked = token_repo::revoke_all_for_user(&db, user.id).await?;
        presence::clear(&redis, user.id).await;
        log::info!(
            "admin {} deactivated user {} ({revoked} refresh tokens revoked)",
            admin.id,
            user.id
        );
    }
    cache::invalidate(&redis, ADMIN_STATS_KEY).await;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

#[delete("/users/{user_id}")]
pub async fn delete_user(
    AdminUser(admin): AdminUser,
    path: web::Path<Uuid>,
    db: web::Data<PgPool>,
    redis: web::Data<RedisClient>,
) -> ApiResult<HttpResponse> {
    let user_id = path.into_inner();
    if user_id == admin.id {
        return Err(ApiError::bad_request("Cannot delete your own account"));
    }
    if !user_repo::delete(&db, user_id).await? {
        return Err(ApiError::not_found("User not found"));
    }
    presence::clear(&redis, user_id).await;
    cache::invalidate(&redis, ADMIN_STATS_KEY).await;
    log::info!("admin {} deleted user {user_id}", admin.id);
    Ok(HttpResponse::NoContent().finish())
}

//////////////////////////////////////////////////
// Teams
//////////////////////////////////////////////////
#[get("/teams")]
pub async fn list_teams(
    _admin: AdminUser,
    query: web::Query<ListQuery>,
    db: web::Data<PgPool>,
) -> ApiResult<HttpResponse> {
    let page = query.page()?;
    Ok(HttpResponse::Ok().json(admin_repo::list_teams(&db, query.search(), page).await?))
}

#[patch("/teams/{team_id}")]
pub async fn update_team(
    _admin: AdminUser,
    path: web::Path<Uuid>,
    body: web::Json<TeamFlags>,
    db: web::Data<PgPool>,
    redis: web::Data<RedisClient>,
) -> ApiResult<HttpResponse> {
    let mut set = UpdateSet::new("teams");
    set.set_some("is_active", body.is_active)
        .set_some("is_squad_full", body.is_squad_full);
    let team = team_repo::update(&db, path.into_inner(), set)
        .await?
        .ok_or_else(|| ApiError::not_found("Team not found"))?;
    cache::invalidate(&redis, ADMIN_STATS_KEY).await;
    Ok(HttpResponse::Ok().json(team))
}

#[delete("/teams/{team_id}")]
pub async fn delete_team(
    AdminUser(admin): AdminUser,
    path: web::Path<Uuid>,
    db: web::Data<PgPool>,
    redis: web::Data<RedisClient>,
) -> ApiResult<HttpResponse> {
    let team_id = path.into_inner();
    if !admin_repo::delete_team(&db, team_id).await? {
        return Err(ApiError::not_found("Team not found"));
    }
    cache::invalidate(&redis, ADMIN_STATS_KEY).await;
    log::info!("admin {} deleted team {team_id}", admin.id);
    Ok(HttpResponse::NoContent().finish())
}

//////////////////////////////////////////////////
// Mount
//////////////////////////////////////////////////
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .service(stats)
            .service(list_users)
            .service(update_user)
            .service(delete_user)
            .service(list_teams)
            .service(update_team)
            .service(delete_team),
    );
}
