//! REST API

pub mod handlers;
pub mod response;

use crate::app_state::AppState;
use crate::error::MonsrvError;
use axum::{
    routing::{get, post},
    Router,
};
use handlers::{alarms, health, tags};
use tower_http::trace::TraceLayer;

/// Build the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health::health))
        .route("/api/status", get(health::status))
        // Alarms
        .route("/api/alarms", get(alarms::list_alarms))
        .route("/api/alarms/active", get(alarms::active_alarms))
        .route("/api/alarms/statistics", get(alarms::statistics))
        .route("/api/alarms/stats/summary", get(alarms::summary))
        .route("/api/alarms/by-tag/{tag_id}", get(alarms::alarms_by_tag))
        .route("/api/alarms/{alarm_id}", get(alarms::get_alarm))
        .route(
            "/api/alarms/{alarm_id}/acknowledge",
            post(alarms::acknowledge_alarm),
        )
        .route("/api/alarms/{alarm_id}/resolve", post(alarms::resolve_alarm))
        // Tags and readings per kind
        .route("/api/{kind}/tags", get(tags::list_tags))
        .route("/api/{kind}/readings", get(tags::list_readings))
        .route("/api/{kind}/{tag_id}", get(tags::get_tag))
        .fallback(endpoint_not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn endpoint_not_found() -> MonsrvError {
    MonsrvError::not_found("Endpoint")
}
