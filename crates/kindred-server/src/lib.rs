//! Kindred Server - HTTP surface for profile seeding and recommendations
//!
//! # Routes
//!
//! | Method | Path                                | Handler                         |
//! |--------|-------------------------------------|---------------------------------|
//! | GET    | `/healthcheck`                      | [`routes::health::healthcheck`] |
//! | POST   | `/users/create/fake-users`          | [`routes::users::create_fake_users`] |
//! | GET    | `/users/recommendations/:user_id`   | [`routes::users::recommendations`] |
//!
//! The router is built from an [`AppState`] so tests can drive it with an
//! in-memory store and `tower::ServiceExt::oneshot`.

pub mod app;
pub mod error;
pub mod routes;
pub mod telemetry;

pub use app::{build_router, AppState};
pub use error::ApiError;
