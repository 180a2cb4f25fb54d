//! Shared test fixtures: in-memory SQLite, seeded catalog, router

#![allow(dead_code)]
#![allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable

use alarm_core::{Alarm, AlarmPriority, AlarmStatus, AlarmStore, AlarmTracker, TagKind, ThresholdCatalog};
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{DateTime, Utc};
use monsrv::{create_router, store, AppState, PublisherStats, SharedTracker};
use serde_json::{json, Value};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::util::ServiceExt;

/// Single-connection pool so every query sees the same in-memory database
pub async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    store::init_schema(&pool).await.unwrap();
    pool
}

pub struct TestApp {
    pub router: Router,
    pub pool: SqlitePool,
    pub store: Arc<dyn AlarmStore>,
    pub tracker: SharedTracker,
    pub catalog: Arc<ThresholdCatalog>,
}

pub async fn create_test_app() -> TestApp {
    let pool = setup_test_db().await;
    let catalog = Arc::new(ThresholdCatalog::builtin());
    store::seed_tags(&pool, &catalog).await.unwrap();

    let alarm_store: Arc<dyn AlarmStore> = Arc::new(store::SqliteAlarmStore::new(pool.clone()));
    let tracker = Arc::new(Mutex::new(AlarmTracker::new(Arc::clone(&catalog))));

    let state = AppState::new(
        "monsrv-test",
        pool.clone(),
        Arc::clone(&alarm_store),
        Arc::clone(&tracker),
        Arc::clone(&catalog),
        Arc::new(PublisherStats::default()),
    );

    TestApp {
        router: create_router(state),
        pool,
        store: alarm_store,
        tracker,
        catalog,
    }
}

pub fn sample_alarm(id: &str, tag_id: &str, priority: AlarmPriority, at: DateTime<Utc>) -> Alarm {
    Alarm {
        id: id.to_string(),
        tag_id: tag_id.to_string(),
        tag_type: TagKind::AnalogInput,
        priority,
        description: format!("{} alarm", tag_id),
        triggered_value: "80 °C".to_string(),
        triggered_at: at,
        acknowledged_at: None,
        resolved_at: None,
        status: AlarmStatus::Active,
        superseded_by: None,
    }
}

/// Send a request and decode the JSON body
pub async fn json_request(app: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::empty())
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let body: Value = if body_bytes.is_empty() {
        json!({})
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or_else(|_| json!({}))
    };

    (status, body)
}
