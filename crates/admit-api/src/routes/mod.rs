//! Route definitions
//!
//! Admission routes are mounted under /api/v1; health checks sit at the root.

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{health, registrations, tickets};
use crate::state::AppState;

/// Create the main API router (health is exported separately for its own middleware)
pub fn create_router() -> Router<AppState> {
    Router::new().nest("/api/v1", api_v1_routes())
}

/// Health check routes, exempt from rate limiting
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
}

fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .merge(registration_routes())
        .merge(ticket_routes())
}

fn registration_routes() -> Router<AppState> {
    Router::new()
        .route("/events/:event_id/registrations", post(registrations::register))
        .route("/registrations/:registration_id", get(registrations::get_registration))
        .route("/registrations/:registration_id/referral", get(registrations::get_referral))
        .route(
            "/registrations/:registration_id/referral-usage",
            post(registrations::redeem_referral),
        )
        // Staff only
        .route("/registrations/:registration_id/cancel", post(registrations::cancel_registration))
        .route("/registrations/:registration_id/check-in", post(registrations::check_in))
}

fn ticket_routes() -> Router<AppState> {
    Router::new().route("/tickets/:ticket_id/availability", get(tickets::get_availability))
}
