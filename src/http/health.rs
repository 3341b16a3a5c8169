//! Welcome banner, liveness and readiness probes

use actix_web::{get, web, HttpResponse, Responder};
use redis::{AsyncCommands, Client as RedisClient};
use serde_json::json;
use sqlx::PgPool;

use crate::config::Settings;

#[get("/")]
pub async fn root(settings: web::Data<Settings>) -> impl Responder {
    HttpResponse::Ok().json(json!({
        "message": format!("Welcome to {} API", settings.app_name),
        "version": env!("CARGO_PKG_VERSION"),
        "health": "/health",
    }))
}

/// Liveness: the process is up. Touches nothing external.
#[get("/health")]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "healthy" }))
}

/// Readiness: Postgres and Redis both answer.
#[get("/healthz")]
pub async fn healthz(db: web::Data<PgPool>, redis: web::Data<RedisClient>) -> impl Responder {
    if let Err(e) = sqlx::query("SELECT 1").execute(&**db).await {
        log::warn!("readiness: postgres check failed: {e}");
        return HttpResponse::ServiceUnavailable().json(json!({ "status": "unavailable", "failed": "database" }));
    }

    let mut conn = match redis.get_multiplexed_async_connection().await {
        Ok(c) => c,
        Err(e) => {
            log::warn!("readiness: redis connect failed: {e}");
            return HttpResponse::ServiceUnavailable().json(json!({ "status": "unavailable", "failed": "redis" }));
        }
    };
    // annotate so the reply type can be inferred
    if conn.ping::<String>().await.is_err() {
        return HttpResponse::ServiceUnavailable().json(json!({ "status": "unavailable", "failed": "redis" }));
    }

    HttpResponse::Ok().json(json!({ "status": "ready" }))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(root).service(health).service(healthz);
}
