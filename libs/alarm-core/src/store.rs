//! Alarm Store - durable alarm persistence seam
//!
//! The tracker never touches storage; the publisher writes triggered and
//! closed alarms through this trait and the API reads from it.

use crate::error::{StoreError, StoreResult};
use crate::types::{Alarm, AlarmPriority, AlarmStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Query filter for alarm listings. Results are ordered by `triggered_at`
/// descending.
#[derive(Debug, Clone, Default)]
pub struct AlarmFilter {
    pub status: Option<AlarmStatus>,
    pub priority: Option<AlarmPriority>,
    /// Only alarms triggered at or after this time
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub offset: u32,
}

impl AlarmFilter {
    pub fn matches(&self, alarm: &Alarm) -> bool {
        self.status.map_or(true, |s| alarm.status == s)
            && self.priority.map_or(true, |p| alarm.priority == p)
            && self.since.map_or(true, |t| alarm.triggered_at >= t)
    }
}

/// Filter for summary counts
#[derive(Debug, Clone, Default)]
pub struct SummaryFilter {
    pub since: Option<DateTime<Utc>>,
    pub tag_id: Option<String>,
    pub priority: Option<AlarmPriority>,
    pub status: Option<AlarmStatus>,
}

impl SummaryFilter {
    pub fn matches(&self, alarm: &Alarm) -> bool {
        self.since.map_or(true, |t| alarm.triggered_at >= t)
            && self.tag_id.as_deref().map_or(true, |id| alarm.tag_id == id)
            && self.priority.map_or(true, |p| alarm.priority == p)
            && self.status.map_or(true, |s| alarm.status == s)
    }
}

/// Persisted alarm counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmSummary {
    pub total: u64,
    pub active: u64,
    pub resolved: u64,
    pub critical: u64,
    pub moderate: u64,
}

impl AlarmSummary {
    fn add(&mut self, alarm: &Alarm) {
        self.total += 1;
        match alarm.status {
            AlarmStatus::Active => self.active += 1,
            AlarmStatus::Resolved => self.resolved += 1,
        }
        match alarm.priority {
            AlarmPriority::Critical => self.critical += 1,
            AlarmPriority::Moderate => self.moderate += 1,
        }
    }
}

#[async_trait]
pub trait AlarmStore: Send + Sync {
    async fn insert_alarm(&self, alarm: &Alarm) -> StoreResult<()>;

    async fn get_alarm(&self, alarm_id: &str) -> StoreResult<Option<Alarm>>;

    async fn list_alarms(&self, filter: &AlarmFilter) -> StoreResult<Vec<Alarm>>;

    async fn list_alarms_by_tag(
        &self,
        tag_id: &str,
        filter: &AlarmFilter,
    ) -> StoreResult<Vec<Alarm>>;

    /// Set `acknowledged_at` (first acknowledgement wins). `NotFound` for
    /// unknown ids.
    async fn acknowledge_alarm(&self, alarm_id: &str, at: DateTime<Utc>) -> StoreResult<Alarm>;

    /// Mark RESOLVED and set `resolved_at` if unset. `NotFound` for unknown ids.
    async fn resolve_alarm(&self, alarm_id: &str, at: DateTime<Utc>) -> StoreResult<Alarm>;

    /// Persist a closure produced by the tracker. Inserts the record if its
    /// first write never landed.
    async fn close_alarm(&self, alarm: &Alarm) -> StoreResult<()>;

    async fn summary(&self, filter: &SummaryFilter) -> StoreResult<AlarmSummary>;
}

/// In-process store for tests and embedded use
#[derive(Debug, Default)]
pub struct MemoryAlarmStore {
    alarms: RwLock<Vec<Alarm>>,
}

impl MemoryAlarmStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.alarms.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.alarms.read().await.is_empty()
    }

    fn page(mut alarms: Vec<Alarm>, filter: &AlarmFilter) -> Vec<Alarm> {
        alarms.sort_by(|a, b| b.triggered_at.cmp(&a.triggered_at));
        let limit = filter.limit.map_or(usize::MAX, |l| l as usize);
        alarms
            .into_iter()
            .skip(filter.offset as usize)
            .take(limit)
            .collect()
    }

    async fn update<F>(&self, alarm_id: &str, apply: F) -> StoreResult<Alarm>
    where
        F: FnOnce(&mut Alarm) + Send,
    {
        let mut alarms = self.alarms.write().await;
        let alarm = alarms
            .iter_mut()
            .find(|a| a.id == alarm_id)
            .ok_or_else(|| StoreError::NotFound(alarm_id.to_string()))?;
        apply(alarm);
        Ok(alarm.clone())
    }
}

#[async_trait]
impl AlarmStore for MemoryAlarmStore {
    async fn insert_alarm(&self, alarm: &Alarm) -> StoreResult<()> {
        let mut alarms = self.alarms.write().await;
        if alarms.iter().any(|a| a.id == alarm.id) {
            return Err(StoreError::Database(format!(
                "duplicate alarm id: {}",
                alarm.id
            )));
        }
        alarms.push(alarm.clone());
        Ok(())
    }

    async fn get_alarm(&self, alarm_id: &str) -> StoreResult<Option<Alarm>> {
        let alarms = self.alarms.read().await;
        Ok(alarms.iter().find(|a| a.id == alarm_id).cloned())
    }

    async fn list_alarms(&self, filter: &AlarmFilter) -> StoreResult<Vec<Alarm>> {
        let alarms = self.alarms.read().await;
        let matched = alarms.iter().filter(|a| filter.matches(a)).cloned().collect();
        Ok(Self::page(matched, filter))
    }

    async fn list_alarms_by_tag(
        &self,
        tag_id: &str,
        filter: &AlarmFilter,
    ) -> StoreResult<Vec<Alarm>> {
        let alarms = self.alarms.read().await;
        let matched = alarms
            .iter()
            .filter(|a| a.tag_id == tag_id && filter.matches(a))
            .cloned()
            .collect();
        Ok(Self::page(matched, filter))
    }

    async fn acknowledge_alarm(&self, alarm_id: &str, at: DateTime<Utc>) -> StoreResult<Alarm> {
        self.update(alarm_id, |alarm| {
            alarm.acknowledged_at.get_or_insert(at);
        })
        .await
    }

    async fn resolve_alarm(&self, alarm_id: &str, at: DateTime<Utc>) -> StoreResult<Alarm> {
        self.update(alarm_id, |alarm| {
            alarm.status = AlarmStatus::Resolved;
            alarm.resolved_at.get_or_insert(at);
        })
        .await
    }

    async fn close_alarm(&self, alarm: &Alarm) -> StoreResult<()> {
        let mut alarms = self.alarms.write().await;
        match alarms.iter_mut().find(|a| a.id == alarm.id) {
            Some(stored) => {
                stored.status = alarm.status;
                stored.resolved_at = stored.resolved_at.or(alarm.resolved_at);
                stored.superseded_by.clone_from(&alarm.superseded_by);
            },
            None => alarms.push(alarm.clone()),
        }
        Ok(())
    }

    async fn summary(&self, filter: &SummaryFilter) -> StoreResult<AlarmSummary> {
        let alarms = self.alarms.read().await;
        let mut summary = AlarmSummary::default();
        for alarm in alarms.iter().filter(|a| filter.matches(a)) {
            summary.add(alarm);
        }
        Ok(summary)
    }
}
