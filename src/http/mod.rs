//! REST surface. One module per resource, each exposing `init_routes`.

pub mod admin;
pub mod auth;
pub mod chat;
pub mod health;
pub mod players;
pub mod routes;
pub mod teams;
pub mod tournaments;
pub mod users;
