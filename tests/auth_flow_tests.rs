// tests/auth_flow_tests.rs
//
// End-to-end through the HTTP layer against a real Postgres
// (DATABASE_URL in .env). Redis is optional: presence writes are best effort.
//   cargo test --test auth_flow_tests -- --ignored

use actix_web::{http::header, http::StatusCode, test, web, App};
use dotenvy::dotenv;
use mycricmate_server::{auth::TokenKeys, config::Settings, db, error, http};
use redis::Client as RedisClient;
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

macro_rules! app {
    () => {{
        dotenv().ok();
        let mut settings = Settings::for_tests();
        settings.database_url =
            std::env::var("DATABASE_URL").expect("DATABASE_URL must be set in .env for tests");
        let pool = PgPool::connect(&settings.database_url).await.expect("DB connection failed");
        db::MIGRATOR.run(&pool).await.expect("migrations");
        let redis = RedisClient::open(settings.redis_url.as_str()).expect("redis url");
        test::init_service(
            App::new()
                .app_data(web::Data::new(pool))
                .app_data(web::Data::new(redis))
                .app_data(web::Data::new(TokenKeys::from_settings(&settings)))
                .app_data(web::Data::new(settings))
                .app_data(web::JsonConfig::default().error_handler(error::json_error))
                .app_data(web::QueryConfig::default().error_handler(error::query_error))
                .configure(http::routes::init_routes),
        )
        .await
    }};
}

fn fresh_email() -> String {
    format!("{}@test.mycricmate.local", Uuid::new_v4())
}

fn bearer(token: &Value) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {}", token.as_str().unwrap()))
}

#[actix_rt::test]
#[ignore]
async fn duplicate_registration_is_409() {
    let app = app!();
    let email = fresh_email();
    let body = json!({ "email": email, "password": "wicketkeeper", "full_name": "Dup" });

    let first = test::call_service(
        &app,
        test::TestRequest::post().uri("/auth/register").set_json(&body).to_request(),
    )
    .await;
    assert_eq!(first.status(), StatusCode::CREATED);

    // emails compare case-insensitively
    let shouted = json!({ "email": email.to_uppercase(), "password": "wicketkeeper" });
    let second = test::call_service(
        &app,
        test::TestRequest::post().uri("/auth/register").set_json(&shouted).to_request(),
    )
    .await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let detail: Value = test::read_body_json(second).await;
    assert_eq!(detail["detail"], "Email already registered");
}

#[actix_rt::test]
#[ignore]
async fn refresh_rotates_and_revoked_tokens_stay_dead() {
    let app = app!();
    let email = fresh_email();
    let tokens: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::post()
            .uri("/auth/register")
            .set_json(json!({ "email": email, "password": "silly-point" }))
            .to_request(),
    )
    .await;
    assert_eq!(tokens["token_type"], "bearer");

    let rotated = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/refresh")
            .set_json(json!({ "refresh_token": tokens["refresh_token"] }))
            .to_request(),
    )
    .await;
    assert_eq!(rotated.status(), StatusCode::OK);
    let rotated: Value = test::read_body_json(rotated).await;
    assert_ne!(rotated["refresh_token"], tokens["refresh_token"]);

    // the original was consumed by the rotation
    let replay = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/refresh")
            .set_json(json!({ "refresh_token": tokens["refresh_token"] }))
            .to_request(),
    )
    .await;
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);

    let logout = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/logout")
            .insert_header(bearer(&rotated["access_token"]))
            .set_json(json!({ "refresh_token": rotated["refresh_token"] }))
            .to_request(),
    )
    .await;
    assert_eq!(logout.status(), StatusCode::OK);

    let after_logout = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/refresh")
            .set_json(json!({ "refresh_token": rotated["refresh_token"] }))
            .to_request(),
    )
    .await;
    assert_eq!(after_logout.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
#[ignore]
async fn login_rejects_wrong_password_and_accepts_right_one() {
    let app = app!();
    let email = fresh_email();
    test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/register")
            .set_json(json!({ "email": email, "password": "cover-drive" }))
            .to_request(),
    )
    .await;

    let wrong = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/login")
            .set_json(json!({ "email": email, "password": "pull-shot!" }))
            .to_request(),
    )
    .await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let right = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/login")
            .set_json(json!({ "email": email, "password": "cover-drive" }))
            .to_request(),
    )
    .await;
    assert_eq!(right.status(), StatusCode::OK);
    let tokens: Value = test::read_body_json(right).await;

    let me: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri("/auth/me")
            .insert_header(bearer(&tokens["access_token"]))
            .to_request(),
    )
    .await;
    assert_eq!(me["email"], email);
    assert!(me.get("hashed_password").is_none());
}

#[actix_rt::test]
#[ignore]
async fn visibility_toggle_persists() {
    let app = app!();
    let tokens: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::post()
            .uri("/auth/register")
            .set_json(json!({ "email": fresh_email(), "password": "deep-fine-leg" }))
            .to_request(),
    )
    .await;

    let hidden = test::call_service(
        &app,
        test::TestRequest::patch()
            .uri("/users/me/visibility?profile_visible=false")
            .insert_header(bearer(&tokens["access_token"]))
            .to_request(),
    )
    .await;
    assert_eq!(hidden.status(), StatusCode::OK);

    let me: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri("/users/me")
            .insert_header(bearer(&tokens["access_token"]))
            .to_request(),
    )
    .await;
    assert_eq!(me["profile_visible"], false);
}

macro_rules! register {
    ($app:expr) => {{
        let tokens: Value = test::call_and_read_body_json(
            &$app,
            test::TestRequest::post()
                .uri("/auth/register")
                .set_json(json!({ "email": fresh_email(), "password": "third-slip" }))
                .to_request(),
        )
        .await;
        let me: Value = test::call_and_read_body_json(
            &$app,
            test::TestRequest::get()
                .uri("/auth/me")
                .insert_header(bearer(&tokens["access_token"]))
                .to_request(),
        )
        .await;
        let id = Uuid::parse_str(me["id"].as_str().unwrap()).unwrap();
        (tokens, id)
    }};
}

async fn side_pool() -> PgPool {
    dotenv().ok();
    PgPool::connect(&std::env::var("DATABASE_URL").unwrap()).await.unwrap()
}

#[actix_rt::test]
#[ignore]
async fn outsiders_cannot_read_a_conversation() {
    let app = app!();
    let (alice, _) = register!(app);
    let (_, bob_id) = register!(app);
    let (carol, _) = register!(app);

    let conv: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::post()
            .uri(&format!("/chat/conversations?other_user_id={bob_id}"))
            .insert_header(bearer(&alice["access_token"]))
            .to_request(),
    )
    .await;
    assert_eq!(conv["other_user"]["id"], bob_id.to_string());
    let uri = format!("/chat/conversations/{}/messages", conv["id"].as_str().unwrap());

    let read = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&uri)
            .insert_header(bearer(&carol["access_token"]))
            .to_request(),
    )
    .await;
    assert_eq!(read.status(), StatusCode::FORBIDDEN);

    let write = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&uri)
            .insert_header(bearer(&carol["access_token"]))
            .set_json(json!({ "content": "can I join?" }))
            .to_request(),
    )
    .await;
    assert_eq!(write.status(), StatusCode::FORBIDDEN);
}

#[actix_rt::test]
#[ignore]
async fn opening_history_marks_it_read() {
    let app = app!();
    let (alice, _) = register!(app);
    let (bob, bob_id) = register!(app);

    let conv: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::post()
            .uri(&format!("/chat/conversations?other_user_id={bob_id}"))
            .insert_header(bearer(&alice["access_token"]))
            .to_request(),
    )
    .await;
    let uri = format!("/chat/conversations/{}/messages", conv["id"].as_str().unwrap());

    let sent = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&uri)
            .insert_header(bearer(&alice["access_token"]))
            .set_json(json!({ "content": "padded up?" }))
            .to_request(),
    )
    .await;
    assert_eq!(sent.status(), StatusCode::CREATED);

    let unread = |token: &Value| {
        test::TestRequest::get()
            .uri("/chat/unread-count")
            .insert_header(bearer(token))
            .to_request()
    };
    let before: Value = test::call_and_read_body_json(&app, unread(&bob["access_token"])).await;
    assert_eq!(before["unread_count"], 1);

    let history: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get()
            .uri(&uri)
            .insert_header(bearer(&bob["access_token"]))
            .to_request(),
    )
    .await;
    assert_eq!(history[0]["content"], "padded up?");
    assert_eq!(history[0]["is_read"], true);

    let after: Value = test::call_and_read_body_json(&app, unread(&bob["access_token"])).await;
    assert_eq!(after["unread_count"], 0);
}

#[actix_rt::test]
#[ignore]
async fn deactivated_user_cannot_refresh() {
    let app = app!();
    let pool = side_pool().await;
    let (admin, admin_id) = register!(app);
    let (victim, victim_id) = register!(app);
    sqlx::query("UPDATE users SET is_superuser = TRUE WHERE id = $1")
        .bind(admin_id)
        .execute(&pool)
        .await
        .unwrap();

    let resp = test::call_service(
        &app,
        test::TestRequest::patch()
            .uri(&format!("/admin/users/{victim_id}"))
            .insert_header(bearer(&admin["access_token"]))
            .set_json(json!({ "is_active": false }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["is_active"], false);

    let live: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM refresh_tokens WHERE user_id = $1 AND NOT is_revoked",
    )
    .bind(victim_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(live, 0);

    let refresh = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/refresh")
            .set_json(json!({ "refresh_token": victim["refresh_token"] }))
            .to_request(),
    )
    .await;
    assert_eq!(refresh.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
#[ignore]
async fn deleting_my_account_removes_rows_and_sessions() {
    let app = app!();
    let pool = side_pool().await;
    let (tokens, id) = register!(app);

    let resp = test::call_service(
        &app,
        test::TestRequest::delete()
            .uri("/users/me")
            .insert_header(bearer(&tokens["access_token"]))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = $1")
        .bind(id)
        .fetch_one(&pool)
        .await
        .unwrap();
    let sessions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM refresh_tokens WHERE user_id = $1")
        .bind(id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!((users, sessions), (0, 0));

    let refresh = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/refresh")
            .set_json(json!({ "refresh_token": tokens["refresh_token"] }))
            .to_request(),
    )
    .await;
    assert_eq!(refresh.status(), StatusCode::UNAUTHORIZED);
}
