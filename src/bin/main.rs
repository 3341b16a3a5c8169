use std::{io, time::Duration};

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use mycricmate_server::{
    auth::{google::GoogleOAuth, TokenKeys},
    config::Settings,
    db, error, http, metrics, sweeper,
};
use redis::Client as RedisClient;

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    // Configuration
    let settings = Settings::from_env().map_err(io::Error::other)?;

    // Postgres pool + schema
    let db_pool = db::connect(&settings.database_url, settings.db_max_connections)
        .await
        .map_err(io::Error::other)?;
    db::MIGRATOR.run(&db_pool).await.map_err(io::Error::other)?;

    // Redis client (connections are opened lazily per request)
    let redis_client = RedisClient::open(settings.redis_url.as_str()).map_err(io::Error::other)?;

    let token_keys = TokenKeys::from_settings(&settings);
    let google = GoogleOAuth::from_settings(&settings);
    if google.is_none() {
        log::warn!("GOOGLE_CLIENT_ID/SECRET not set; Google sign-in disabled");
    }

    // Background housekeeping
    sweeper::start(db_pool.clone(), Duration::from_secs(settings.sweep_interval));

    let prometheus = metrics::middleware()?;
    let server_addr = settings.server_addr.clone();
    log::info!("{} listening on {server_addr}", settings.app_name);

    HttpServer::new(move || {
        let cors = settings
            .allowed_origins()
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .supports_credentials()
            .allow_any_method()
            .allow_any_header();

        let mut app = App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(prometheus.clone())
            .app_data(web::Data::new(db_pool.clone()))
            .app_data(web::Data::new(redis_client.clone()))
            .app_data(web::Data::new(settings.clone()))
            .app_data(web::Data::new(token_keys.clone()))
            .app_data(web::JsonConfig::default().error_handler(error::json_error))
            .app_data(web::QueryConfig::default().error_handler(error::query_error))
            .app_data(web::PathConfig::default().error_handler(error::path_error));
        if let Some(google) = &google {
            app = app.app_data(web::Data::new(google.clone()));
        }
        app.configure(http::routes::init_routes)
    })
    .bind(&server_addr)?
    .run()
    .await
}
