use crate::http;
use actix_web::web;

/// Mount every HTTP sub-module at the root, each under its own scope.
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.configure(http::health::init_routes)
        .configure(http::auth::init_routes)
        .configure(http::users::init_routes)
        .configure(http::players::init_routes)
        .configure(http::teams::init_routes)
        .configure(http::tournaments::init_routes)
        .configure(http::chat::init_routes)
        .configure(http::admin::init_routes);
}
