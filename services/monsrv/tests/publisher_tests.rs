//! Publisher cycle tests with scripted readings

#![allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable

use alarm_core::{
    Alarm, AlarmFilter, AlarmStatus, AlarmStore, AlarmSummary, AlarmTracker, MemoryAlarmStore,
    Reading, StoreError, StoreResult, SummaryFilter, TagKind, ThresholdCatalog,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use monsrv::store::{list_readings, ReadingFilter};
use monsrv::{Publisher, ReadingSource, Simulator};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

mod common;
use common::setup_test_db;

/// Replays fixed (tag, kind, value) batches
struct Script {
    batches: VecDeque<Vec<(&'static str, TagKind, f64)>>,
}

impl Script {
    fn new(batches: Vec<Vec<(&'static str, TagKind, f64)>>) -> Self {
        Self {
            batches: batches.into(),
        }
    }
}

impl ReadingSource for Script {
    fn next_batch(&mut self, at: DateTime<Utc>) -> Vec<Reading> {
        self.batches
            .pop_front()
            .unwrap_or_default()
            .into_iter()
            .map(|(tag, kind, value)| Reading::new(tag, kind, value, at))
            .collect()
    }
}

/// Rejects inserts for one tag, delegates everything else
struct FlakyStore {
    inner: MemoryAlarmStore,
    broken_tag: &'static str,
}

#[async_trait]
impl AlarmStore for FlakyStore {
    async fn insert_alarm(&self, alarm: &Alarm) -> StoreResult<()> {
        if alarm.tag_id == self.broken_tag {
            return Err(StoreError::Database("disk I/O error".to_string()));
        }
        self.inner.insert_alarm(alarm).await
    }

    async fn get_alarm(&self, alarm_id: &str) -> StoreResult<Option<Alarm>> {
        self.inner.get_alarm(alarm_id).await
    }

    async fn list_alarms(&self, filter: &AlarmFilter) -> StoreResult<Vec<Alarm>> {
        self.inner.list_alarms(filter).await
    }

    async fn list_alarms_by_tag(
        &self,
        tag_id: &str,
        filter: &AlarmFilter,
    ) -> StoreResult<Vec<Alarm>> {
        self.inner.list_alarms_by_tag(tag_id, filter).await
    }

    async fn acknowledge_alarm(&self, alarm_id: &str, at: DateTime<Utc>) -> StoreResult<Alarm> {
        self.inner.acknowledge_alarm(alarm_id, at).await
    }

    async fn resolve_alarm(&self, alarm_id: &str, at: DateTime<Utc>) -> StoreResult<Alarm> {
        self.inner.resolve_alarm(alarm_id, at).await
    }

    async fn close_alarm(&self, alarm: &Alarm) -> StoreResult<()> {
        self.inner.close_alarm(alarm).await
    }

    async fn summary(&self, filter: &SummaryFilter) -> StoreResult<AlarmSummary> {
        self.inner.summary(filter).await
    }
}

fn new_tracker() -> Arc<Mutex<AlarmTracker>> {
    Arc::new(Mutex::new(AlarmTracker::new(Arc::new(
        ThresholdCatalog::builtin(),
    ))))
}

#[tokio::test]
async fn cycles_persist_alarms_and_closures() {
    let pool = setup_test_db().await;
    let store = Arc::new(MemoryAlarmStore::new());
    let tracker = new_tracker();
    let script = Script::new(vec![
        vec![("AI-002", TagKind::AnalogInput, 60.0)],
        vec![("AI-002", TagKind::AnalogInput, 80.0)],
        vec![("AI-002", TagKind::AnalogInput, 82.0)],
        vec![("AI-002", TagKind::AnalogInput, 20.0)],
    ]);
    let publisher = Publisher::new(
        pool.clone(),
        store.clone(),
        tracker.clone(),
        Box::new(script),
        std::time::Duration::from_secs(30),
    );

    let t0 = Utc::now();
    let reports: Vec<_> = {
        let mut out = Vec::new();
        for i in 0..4 {
            out.push(publisher.run_cycle(t0 + Duration::seconds(30 * i)).await);
        }
        out
    };

    let triggered: Vec<usize> = reports.iter().map(|r| r.triggered).collect();
    let closed: Vec<usize> = reports.iter().map(|r| r.closed).collect();
    assert_eq!(triggered, vec![1, 1, 0, 0]);
    assert_eq!(closed, vec![0, 1, 0, 1]);
    assert!(reports.iter().all(|r| r.failures == 0));

    // Both alarms persisted and both closed
    let all = store
        .list_alarms(&AlarmFilter::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
    assert!(all.iter().all(|a| a.status == AlarmStatus::Resolved));
    let moderate = all.iter().find(|a| a.superseded_by.is_some()).unwrap();
    let critical = all.iter().find(|a| a.superseded_by.is_none()).unwrap();
    assert_eq!(moderate.superseded_by.as_deref(), Some(critical.id.as_str()));
    assert_eq!(critical.resolved_at, Some(t0 + Duration::seconds(90)));

    let readings = list_readings(&pool, TagKind::AnalogInput, &ReadingFilter::default())
        .await
        .unwrap();
    assert_eq!(readings.len(), 4);

    let stats = publisher.stats().snapshot();
    assert_eq!(stats.cycles, 4);
    assert_eq!(stats.alarms_persisted, 2);
    assert_eq!(stats.readings, 4);
    assert_eq!(
        stats.last_cycle_at.map(|t| t.timestamp_millis()),
        Some((t0 + Duration::seconds(90)).timestamp_millis())
    );
}

#[tokio::test]
async fn failed_insert_does_not_block_others_or_retrigger() {
    let pool = setup_test_db().await;
    let store = Arc::new(FlakyStore {
        inner: MemoryAlarmStore::new(),
        broken_tag: "AI-001",
    });
    let tracker = new_tracker();
    let batch = vec![
        ("DI-002", TagKind::DigitalInput, 1.0),
        ("AI-001", TagKind::AnalogInput, 9.0),
        ("AI-002", TagKind::AnalogInput, 80.0),
    ];
    let publisher = Publisher::new(
        pool,
        store.clone(),
        tracker.clone(),
        Box::new(Script::new(vec![batch.clone(), batch])),
        std::time::Duration::from_secs(30),
    );

    let now = Utc::now();
    let first = publisher.run_cycle(now).await;
    assert_eq!(first.triggered, 3);
    assert_eq!(first.failures, 1);
    assert_eq!(store.inner.len().await, 2);

    // Alarm stays active in memory despite the failed write
    assert!(tracker.lock().await.active_alarm("AI-001").is_some());

    let second = publisher.run_cycle(now + Duration::seconds(30)).await;
    assert_eq!(second.triggered, 0);
    assert_eq!(second.failures, 0);
    assert_eq!(tracker.lock().await.statistics().total_alarms, 3);
}

#[tokio::test]
async fn simulated_cycles_respect_single_active_alarm() {
    let pool = setup_test_db().await;
    let catalog = Arc::new(ThresholdCatalog::builtin());
    let tracker = Arc::new(Mutex::new(AlarmTracker::new(Arc::clone(&catalog))));
    let store = Arc::new(MemoryAlarmStore::new());
    let publisher = Publisher::new(
        pool,
        store.clone(),
        tracker.clone(),
        Box::new(Simulator::with_seed(Arc::clone(&catalog), 2024)),
        std::time::Duration::from_secs(30),
    );

    let start = Utc::now();
    for i in 0..20 {
        publisher.run_cycle(start + Duration::seconds(30 * i)).await;
    }

    let tracker = tracker.lock().await;
    let active = tracker.active_alarms();
    let mut tags: Vec<&str> = active.iter().map(|a| a.tag_id.as_str()).collect();
    tags.sort_unstable();
    let before = tags.len();
    tags.dedup();
    assert_eq!(before, tags.len());

    // Every active tracker alarm is ACTIVE in the store
    let persisted_active = store
        .list_alarms(&AlarmFilter {
            status: Some(AlarmStatus::Active),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(persisted_active.len(), active.len());
    assert_eq!(
        store.len().await as u64,
        tracker.statistics().total_alarms
    );
}

#[tokio::test]
async fn start_and_stop() {
    let pool = setup_test_db().await;
    let publisher = Arc::new(Publisher::new(
        pool,
        Arc::new(MemoryAlarmStore::new()),
        new_tracker(),
        Box::new(Script::new(Vec::new())),
        std::time::Duration::from_millis(10),
    ));

    let runner = Arc::clone(&publisher);
    let handle = tokio::spawn(async move { runner.start().await });

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(publisher.is_running());
    publisher.stop();
    tokio::time::timeout(std::time::Duration::from_secs(2), handle)
        .await
        .unwrap()
        .unwrap();
    assert!(!publisher.is_running());
    assert!(publisher.stats().snapshot().cycles >= 1);
}
