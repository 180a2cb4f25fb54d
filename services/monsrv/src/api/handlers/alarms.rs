//! Alarm endpoints

use crate::api::response::{ok, ApiResponse};
use crate::app_state::AppState;
use crate::error::{MonsrvError, Result};
use alarm_core::{
    Alarm, AlarmFilter, AlarmPriority, AlarmStatistics, AlarmStatus, StoreError, SummaryFilter,
};
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const DEFAULT_LIST_LIMIT: u32 = 10;
const DEFAULT_TAG_LIMIT: u32 = 50;
const DEFAULT_WINDOW_DAYS: u32 = 30;
const MAX_LIMIT: u32 = 1000;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmQuery {
    /// ACTIVE, RESOLVED or ALL
    pub status: Option<String>,
    pub priority: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub days: Option<u32>,
    pub tag_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SeverityCounts {
    pub critical: u64,
    pub moderate: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub total: u64,
    pub active: u64,
    pub resolved: u64,
    pub by_severity: SeverityCounts,
}

/// None means no status filter
fn parse_status(raw: Option<&str>, default: Option<AlarmStatus>) -> Result<Option<AlarmStatus>> {
    match raw.map(str::to_uppercase).as_deref() {
        None | Some("") => Ok(default),
        Some("ALL") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(MonsrvError::invalid_input),
    }
}

fn parse_priority(raw: Option<&str>) -> Result<Option<AlarmPriority>> {
    match raw.map(str::to_uppercase).as_deref() {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(MonsrvError::invalid_input),
    }
}

fn parse_limit(raw: Option<u32>, default: u32) -> Result<u32> {
    match raw {
        Some(0) => Err(MonsrvError::invalid_input("limit must be positive")),
        Some(n) => Ok(n.min(MAX_LIMIT)),
        None => Ok(default),
    }
}

fn window_start(days: Option<u32>) -> Option<chrono::DateTime<Utc>> {
    let days = days.unwrap_or(DEFAULT_WINDOW_DAYS);
    (days > 0).then(|| Utc::now() - Duration::days(i64::from(days)))
}

/// GET /api/alarms
pub async fn list_alarms(
    State(state): State<AppState>,
    query: std::result::Result<Query<AlarmQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<Alarm>>>> {
    let Query(query) = query?;
    let filter = AlarmFilter {
        status: parse_status(query.status.as_deref(), Some(AlarmStatus::Active))?,
        priority: parse_priority(query.priority.as_deref())?,
        since: None,
        limit: Some(parse_limit(query.limit, DEFAULT_LIST_LIMIT)?),
        offset: query.offset.unwrap_or(0),
    };

    let alarms = state.store.list_alarms(&filter).await?;
    Ok(ok(format!("Retrieved {} alarms", alarms.len()), alarms))
}

/// GET /api/alarms/by-tag/{tag_id}
pub async fn alarms_by_tag(
    State(state): State<AppState>,
    Path(tag_id): Path<String>,
    query: std::result::Result<Query<AlarmQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<Alarm>>>> {
    let Query(query) = query?;
    let filter = AlarmFilter {
        status: parse_status(query.status.as_deref(), None)?,
        priority: parse_priority(query.priority.as_deref())?,
        since: window_start(query.days),
        limit: Some(parse_limit(query.limit, DEFAULT_TAG_LIMIT)?),
        offset: query.offset.unwrap_or(0),
    };

    let alarms = state.store.list_alarms_by_tag(&tag_id, &filter).await?;
    Ok(ok(
        format!("Retrieved {} alarms for {}", alarms.len(), tag_id),
        alarms,
    ))
}

/// GET /api/alarms/{alarm_id}
pub async fn get_alarm(
    State(state): State<AppState>,
    Path(alarm_id): Path<String>,
) -> Result<Json<ApiResponse<Alarm>>> {
    let alarm = state
        .store
        .get_alarm(&alarm_id)
        .await?
        .ok_or_else(|| alarm_not_found(&alarm_id))?;
    Ok(ok("Alarm retrieved", alarm))
}

/// POST /api/alarms/{alarm_id}/acknowledge
///
/// An alarm whose insert failed lives only in the tracker; acknowledging it
/// writes the tracker record to the store.
pub async fn acknowledge_alarm(
    State(state): State<AppState>,
    Path(alarm_id): Path<String>,
) -> Result<Json<ApiResponse<Alarm>>> {
    let now = Utc::now();
    let alarm = match state.store.acknowledge_alarm(&alarm_id, now).await {
        Ok(alarm) => {
            if state.tracker.lock().await.acknowledge(&alarm_id, now) {
                debug!("Tracker alarm {} acknowledged", alarm_id);
            }
            alarm
        },
        Err(StoreError::NotFound(_)) => {
            let mut tracker = state.tracker.lock().await;
            tracker.acknowledge(&alarm_id, now);
            let tracked = tracker.find_active(&alarm_id).cloned();
            drop(tracker);
            let alarm = tracked.ok_or_else(|| alarm_not_found(&alarm_id))?;
            state.store.close_alarm(&alarm).await?;
            warn!("Alarm {} was missing from the store, persisted from tracker", alarm_id);
            alarm
        },
        Err(e) => return Err(e.into()),
    };

    info!("Alarm {} acknowledged", alarm_id);
    Ok(ok("Alarm acknowledged", alarm))
}

/// POST /api/alarms/{alarm_id}/resolve
///
/// Also clears the tag in the tracker so the next abnormal reading raises
/// a fresh alarm.
pub async fn resolve_alarm(
    State(state): State<AppState>,
    Path(alarm_id): Path<String>,
) -> Result<Json<ApiResponse<Alarm>>> {
    let now = Utc::now();
    let alarm = match state.store.resolve_alarm(&alarm_id, now).await {
        Ok(alarm) => {
            if let Some(cleared) = state.tracker.lock().await.resolve_alarm(&alarm_id, now) {
                debug!("Tracker cleared {} for alarm {}", cleared.tag_id, alarm_id);
            }
            alarm
        },
        Err(StoreError::NotFound(_)) => {
            let cleared = state
                .tracker
                .lock()
                .await
                .resolve_alarm(&alarm_id, now)
                .ok_or_else(|| alarm_not_found(&alarm_id))?;
            state.store.close_alarm(&cleared).await?;
            warn!("Alarm {} was missing from the store, persisted from tracker", alarm_id);
            cleared
        },
        Err(e) => return Err(e.into()),
    };

    info!("Alarm {} resolved", alarm_id);
    Ok(ok("Alarm resolved", alarm))
}

fn alarm_not_found(alarm_id: &str) -> MonsrvError {
    MonsrvError::not_found(format!("Alarm {}", alarm_id))
}

/// GET /api/alarms/active - live tracker snapshot
pub async fn active_alarms(State(state): State<AppState>) -> Json<ApiResponse<Vec<Alarm>>> {
    let mut alarms = state.tracker.lock().await.active_alarms();
    alarms.sort_by(|a, b| a.tag_id.cmp(&b.tag_id));
    ok(format!("{} active alarms", alarms.len()), alarms)
}

/// GET /api/alarms/statistics - live tracker counters
pub async fn statistics(State(state): State<AppState>) -> Json<ApiResponse<AlarmStatistics>> {
    let stats = state.tracker.lock().await.statistics();
    ok("Alarm statistics", stats)
}

/// GET /api/alarms/stats/summary - persisted counts
pub async fn summary(
    State(state): State<AppState>,
    query: std::result::Result<Query<AlarmQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<SummaryResponse>>> {
    let Query(query) = query?;
    let filter = SummaryFilter {
        since: window_start(query.days),
        tag_id: query.tag_id.filter(|t| !t.is_empty()),
        priority: parse_priority(query.priority.as_deref())?,
        status: parse_status(query.status.as_deref(), None)?,
    };

    let summary = state.store.summary(&filter).await?;
    Ok(ok(
        "Alarm summary",
        SummaryResponse {
            total: summary.total,
            active: summary.active,
            resolved: summary.resolved,
            by_severity: SeverityCounts {
                critical: summary.critical,
                moderate: summary.moderate,
            },
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parsing() {
        assert_eq!(
            parse_status(None, Some(AlarmStatus::Active)).unwrap(),
            Some(AlarmStatus::Active)
        );
        assert_eq!(
            parse_status(Some("resolved"), None).unwrap(),
            Some(AlarmStatus::Resolved)
        );
        assert_eq!(parse_status(Some("all"), Some(AlarmStatus::Active)).unwrap(), None);
        assert!(parse_status(Some("OPEN"), None).is_err());
    }

    #[test]
    fn limit_parsing() {
        assert_eq!(parse_limit(None, 10).unwrap(), 10);
        assert_eq!(parse_limit(Some(5000), 10).unwrap(), MAX_LIMIT);
        assert!(parse_limit(Some(0), 10).is_err());
    }

    #[test]
    fn zero_days_means_no_window() {
        assert!(window_start(Some(0)).is_none());
        assert!(window_start(None).is_some());
    }
}
