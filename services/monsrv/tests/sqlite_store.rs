//! SQLite alarm store and registry tests against an in-memory database

#![allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable

use alarm_core::{
    AlarmFilter, AlarmPriority, AlarmStatus, AlarmStore, Reading, Severity, StoreError,
    SummaryFilter, TagKind, ThresholdCatalog,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use monsrv::store::{
    get_tag, insert_readings, list_readings, list_tags, seed_tags, ReadingFilter, SqliteAlarmStore,
};

mod common;
use common::{sample_alarm, setup_test_db};

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(1_760_000_000_000 + secs * 1000)
        .single()
        .unwrap()
}

#[tokio::test]
async fn insert_and_get_round_trip() {
    let store = SqliteAlarmStore::new(setup_test_db().await);
    let alarm = sample_alarm("ALM-1", "AI-002", AlarmPriority::Critical, at(0));
    store.insert_alarm(&alarm).await.unwrap();

    let loaded = store.get_alarm("ALM-1").await.unwrap().unwrap();
    assert_eq!(loaded, alarm);
    assert!(store.get_alarm("ALM-2").await.unwrap().is_none());

    // Duplicate ids are rejected by the primary key
    assert!(matches!(
        store.insert_alarm(&alarm).await,
        Err(StoreError::Database(_))
    ));
}

#[tokio::test]
async fn acknowledge_keeps_first_timestamp() {
    let store = SqliteAlarmStore::new(setup_test_db().await);
    store
        .insert_alarm(&sample_alarm("ALM-1", "AI-002", AlarmPriority::Moderate, at(0)))
        .await
        .unwrap();

    let first = store.acknowledge_alarm("ALM-1", at(10)).await.unwrap();
    let second = store.acknowledge_alarm("ALM-1", at(20)).await.unwrap();
    assert_eq!(first.acknowledged_at, Some(at(10)));
    assert_eq!(second.acknowledged_at, Some(at(10)));
    assert_eq!(second.status, AlarmStatus::Active);

    assert!(matches!(
        store.acknowledge_alarm("ALM-9", at(30)).await,
        Err(StoreError::NotFound(id)) if id == "ALM-9"
    ));
}

#[tokio::test]
async fn resolve_and_close() {
    let store = SqliteAlarmStore::new(setup_test_db().await);
    store
        .insert_alarm(&sample_alarm("ALM-1", "AI-002", AlarmPriority::Moderate, at(0)))
        .await
        .unwrap();

    let resolved = store.resolve_alarm("ALM-1", at(5)).await.unwrap();
    assert_eq!(resolved.status, AlarmStatus::Resolved);
    assert_eq!(resolved.resolved_at, Some(at(5)));

    // A later tracker closure keeps the earlier resolution time
    let mut closure = resolved.clone();
    closure.resolved_at = Some(at(50));
    store.close_alarm(&closure).await.unwrap();
    let stored = store.get_alarm("ALM-1").await.unwrap().unwrap();
    assert_eq!(stored.resolved_at, Some(at(5)));

    // Closure of a never-inserted alarm inserts it
    let mut orphan = sample_alarm("ALM-2", "AI-003", AlarmPriority::Critical, at(1));
    orphan.status = AlarmStatus::Resolved;
    orphan.resolved_at = Some(at(2));
    orphan.superseded_by = Some("ALM-3".to_string());
    store.close_alarm(&orphan).await.unwrap();
    assert_eq!(store.get_alarm("ALM-2").await.unwrap(), Some(orphan));
}

#[tokio::test]
async fn close_carries_latest_trigger() {
    let store = SqliteAlarmStore::new(setup_test_db().await);
    let alarm = sample_alarm("ALM-1", "AI-002", AlarmPriority::Critical, at(0));
    store.insert_alarm(&alarm).await.unwrap();

    // Same-priority refreshes only touched the in-memory record
    let mut closure = alarm.clone();
    closure.triggered_value = "95 °C".to_string();
    closure.triggered_at = at(60);
    closure.acknowledged_at = Some(at(30));
    closure.status = AlarmStatus::Resolved;
    closure.resolved_at = Some(at(90));
    store.close_alarm(&closure).await.unwrap();

    let stored = store.get_alarm("ALM-1").await.unwrap().unwrap();
    assert_eq!(stored, closure);
}

#[tokio::test]
async fn non_finite_reading_keeps_rest_of_batch() {
    let pool = setup_test_db().await;
    let batch = vec![
        (
            Reading::new("AI-001", TagKind::AnalogInput, 3.0, at(0)),
            Severity::Healthy,
        ),
        (
            Reading::new("AI-002", TagKind::AnalogInput, f64::NAN, at(0)),
            Severity::Healthy,
        ),
        (
            Reading::new("AI-003", TagKind::AnalogInput, f64::INFINITY, at(0)),
            Severity::Critical,
        ),
    ];
    assert_eq!(insert_readings(&pool, &batch).await.unwrap(), 3);

    let stored = list_readings(&pool, TagKind::AnalogInput, &ReadingFilter::default())
        .await
        .unwrap();
    let values: Vec<Option<f64>> = stored.iter().map(|r| r.value).collect();
    assert_eq!(values, vec![Some(3.0), None, None]);
    assert_eq!(stored[2].status, Severity::Critical);
}

#[tokio::test]
async fn filters_and_paging() {
    let store = SqliteAlarmStore::new(setup_test_db().await);
    for i in 0..6 {
        let priority = if i % 2 == 0 {
            AlarmPriority::Critical
        } else {
            AlarmPriority::Moderate
        };
        let tag = if i < 3 { "AI-001" } else { "AI-002" };
        store
            .insert_alarm(&sample_alarm(&format!("ALM-{}", i), tag, priority, at(i)))
            .await
            .unwrap();
    }

    let critical = store
        .list_alarms(&AlarmFilter {
            priority: Some(AlarmPriority::Critical),
            ..Default::default()
        })
        .await
        .unwrap();
    let ids: Vec<&str> = critical.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["ALM-4", "ALM-2", "ALM-0"]);

    let page = store
        .list_alarms(&AlarmFilter {
            limit: Some(2),
            offset: 2,
            ..Default::default()
        })
        .await
        .unwrap();
    let ids: Vec<&str> = page.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["ALM-3", "ALM-2"]);

    let recent_ai001 = store
        .list_alarms_by_tag(
            "AI-001",
            &AlarmFilter {
                since: Some(at(1)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let ids: Vec<&str> = recent_ai001.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["ALM-2", "ALM-1"]);

    let summary = store
        .summary(&SummaryFilter {
            tag_id: Some("AI-002".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(summary.total, 3);
    assert_eq!(summary.critical, 1);
    assert_eq!(summary.moderate, 2);
    assert_eq!(summary.active, 3);

    let empty = store
        .summary(&SummaryFilter {
            since: Some(at(0) + Duration::days(1)),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(empty.total, 0);
    assert_eq!(empty.active, 0);
}

#[tokio::test]
async fn tag_registry_seeding_is_idempotent() {
    let pool = setup_test_db().await;
    let catalog = ThresholdCatalog::builtin();
    seed_tags(&pool, &catalog).await.unwrap();
    seed_tags(&pool, &catalog).await.unwrap();

    let outputs = list_tags(&pool, TagKind::DigitalOutput).await.unwrap();
    let ids: Vec<&str> = outputs.iter().map(|t| t.tag_id.as_str()).collect();
    assert_eq!(ids, vec!["DO-001", "DO-002", "DO-003", "DO-004"]);
    assert_eq!(outputs[0].moderate, Some(1.0));
    assert!(outputs[0].category.is_none());
    assert!(outputs[0].base_value.is_none());

    let mixer = get_tag(&pool, TagKind::AnalogInput, "AI-007")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(mixer.unit, "RPM");
    assert_eq!(mixer.critical, Some(1200.0));
    assert_eq!(mixer.base_value, Some(1100.0));
    assert_eq!(mixer.category.as_deref(), Some("DEFAULT"));

    assert!(get_tag(&pool, TagKind::DigitalInput, "AI-007")
        .await
        .unwrap()
        .is_none());
}
