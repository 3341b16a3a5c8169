// tests/http_tests.rs
//
// Request-level checks that never reach Postgres: the pool is lazy and the
// requests below are all rejected (or answered) before a query is issued.

use actix_web::{http::header, http::StatusCode, test, web, App};
use mycricmate_server::{
    auth::TokenKeys,
    config::Settings,
    error, http, metrics,
};
use redis::Client as RedisClient;
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

macro_rules! app {
    () => {{
        let settings = Settings::for_tests();
        let pool = PgPoolOptions::new()
            .connect_lazy(&settings.database_url)
            .expect("lazy pool");
        let redis = RedisClient::open(settings.redis_url.as_str()).expect("redis url");
        test::init_service(
            App::new()
                .app_data(web::Data::new(pool))
                .app_data(web::Data::new(redis))
                .app_data(web::Data::new(TokenKeys::from_settings(&settings)))
                .app_data(web::Data::new(settings))
                .app_data(web::JsonConfig::default().error_handler(error::json_error))
                .app_data(web::QueryConfig::default().error_handler(error::query_error))
                .app_data(web::PathConfig::default().error_handler(error::path_error))
                .configure(http::routes::init_routes),
        )
        .await
    }};
}

fn bearer(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {token}"))
}

#[actix_rt::test]
async fn welcome_banner_names_the_app() {
    let app = app!();
    let resp: Value = test::call_and_read_body_json(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(resp["message"], "Welcome to MyCricMate API");
    assert_eq!(resp["version"], env!("CARGO_PKG_VERSION"));
    assert!(resp.get("docs").is_none());

    // every path the banner advertises is routable
    let health = resp["health"].as_str().unwrap();
    let status = test::call_service(&app, test::TestRequest::get().uri(health).to_request())
        .await
        .status();
    assert_eq!(status, StatusCode::OK);
}

#[actix_rt::test]
async fn health_is_static() {
    let app = app!();
    let resp: Value =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp, json!({ "status": "healthy" }));
}

#[actix_rt::test]
async fn protected_route_without_bearer_is_401() {
    let app = app!();
    let resp = test::call_service(&app, test::TestRequest::get().uri("/users/me").to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(resp.headers().get(header::WWW_AUTHENTICATE).unwrap(), "Bearer");
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["detail"], "Not authenticated");
}

#[actix_rt::test]
async fn refresh_token_is_not_a_bearer_credential() {
    let app = app!();
    let keys = TokenKeys::from_settings(&Settings::for_tests());
    let refresh = keys.issue_refresh(Uuid::new_v4()).unwrap();

    let req = test::TestRequest::get()
        .uri("/chat/unread-count")
        .insert_header(bearer(&refresh.token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn token_signed_with_another_secret_is_rejected() {
    let app = app!();
    let foreign = TokenKeys::new(
        "some-other-secret",
        chrono::Duration::minutes(5),
        chrono::Duration::days(1),
    );
    let token = foreign.issue_access(Uuid::new_v4()).unwrap();

    let req = test::TestRequest::get()
        .uri("/auth/me")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["detail"], "Could not validate credentials");
}

#[actix_rt::test]
async fn malformed_json_is_422() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/auth/login")
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .set_payload("{\"email\": ")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["detail"].is_string());
}

#[actix_rt::test]
async fn register_validates_before_touching_the_database() {
    let app = app!();

    let req = test::TestRequest::post()
        .uri("/auth/register")
        .set_json(json!({ "email": "not-an-email", "password": "longenough" }))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNPROCESSABLE_ENTITY
    );

    let req = test::TestRequest::post()
        .uri("/auth/register")
        .set_json(json!({ "email": "short@example.com", "password": "abc" }))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNPROCESSABLE_ENTITY
    );
}

#[actix_rt::test]
async fn garbage_refresh_token_is_401() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/auth/refresh")
        .set_json(json!({ "refresh_token": "definitely.not.ajwt" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn google_url_without_client_is_503() {
    let app = app!();
    let req = test::TestRequest::get()
        .uri("/auth/google/url?redirect_uri=http://localhost:8080/callback")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[actix_rt::test]
async fn metrics_endpoint_is_served() {
    let app = test::init_service(
        App::new()
            .wrap(metrics::middleware().unwrap())
            .configure(http::health::init_routes),
    )
    .await;
    test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;

    let resp = test::call_service(&app, test::TestRequest::get().uri(metrics::ENDPOINT).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    assert!(std::str::from_utf8(&body).unwrap().contains("mycricmate_http_requests_total"));
}
