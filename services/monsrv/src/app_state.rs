//! Shared application state for API handlers

use crate::publisher::{PublisherStats, SharedTracker};
use alarm_core::{AlarmStore, ThresholdCatalog};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub service_name: String,
    pub pool: SqlitePool,
    pub store: Arc<dyn AlarmStore>,
    pub tracker: SharedTracker,
    pub catalog: Arc<ThresholdCatalog>,
    pub publisher_stats: Arc<PublisherStats>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        service_name: impl Into<String>,
        pool: SqlitePool,
        store: Arc<dyn AlarmStore>,
        tracker: SharedTracker,
        catalog: Arc<ThresholdCatalog>,
        publisher_stats: Arc<PublisherStats>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            pool,
            store,
            tracker,
            catalog,
            publisher_stats,
            started_at: Utc::now(),
        }
    }
}
