// HTTP server setup (Axum + JSON API)
pub mod app;
pub mod routes;

pub use app::*;
