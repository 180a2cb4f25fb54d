//! Health and status endpoints

use crate::api::response::{ok, ApiResponse};
use crate::app_state::AppState;
use crate::publisher::PublisherStatsSnapshot;
use alarm_core::AlarmStatistics;
use axum::{extract::State, Json};
use chrono::Utc;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: &'static str,
    pub service: String,
    pub database: bool,
    pub uptime_seconds: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    pub service: String,
    pub tags: usize,
    pub publisher: PublisherStatsSnapshot,
    pub alarms: AlarmStatistics,
}

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthStatus>> {
    let database = sqlx::query("SELECT 1").execute(&state.pool).await.is_ok();
    let status = HealthStatus {
        status: if database { "healthy" } else { "degraded" },
        service: state.service_name.clone(),
        database,
        uptime_seconds: (Utc::now() - state.started_at).num_seconds(),
    };
    ok("Service is running", status)
}

/// GET /api/status
pub async fn status(State(state): State<AppState>) -> Json<ApiResponse<ServiceStatus>> {
    let alarms = state.tracker.lock().await.statistics();
    ok(
        "Service status",
        ServiceStatus {
            service: state.service_name.clone(),
            tags: state.catalog.len(),
            publisher: state.publisher_stats.snapshot(),
            alarms,
        },
    )
}
