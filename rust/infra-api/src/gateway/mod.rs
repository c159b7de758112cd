//! HTTP gateway: tenant resolution, schedule routes and health.

pub mod auth;
pub mod health;
pub mod schedules;

use axum::Router;

use crate::AppState;

/// Create the gateway router with all routes.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(schedules::router())
}
