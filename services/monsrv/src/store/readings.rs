//! Reading persistence

use crate::error::{MonsrvError, Result};
use alarm_core::{Reading, Severity, TagKind};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::warn;

/// Persisted reading with its classified status
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingRecord {
    pub id: i64,
    pub tag_id: String,
    pub kind: TagKind,
    /// None when the source reported a non-finite value
    pub value: Option<f64>,
    pub status: Severity,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct ReadingFilter {
    pub tag_id: Option<String>,
    pub status: Option<Severity>,
    pub limit: Option<u32>,
}

/// Insert one cycle of readings in a single transaction.
/// Non-finite values are stored as NULL.
pub async fn insert_readings(pool: &SqlitePool, readings: &[(Reading, Severity)]) -> Result<u64> {
    let mut tx = pool.begin().await?;
    for (reading, status) in readings {
        let value = reading.value.is_finite().then_some(reading.value);
        if value.is_none() {
            warn!("Non-finite value {} from {} stored as NULL", reading.value, reading.tag_id);
        }
        sqlx::query(
            r#"
            INSERT INTO readings (tag_id, kind, value, status, timestamp)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&reading.tag_id)
        .bind(reading.kind.as_str())
        .bind(value)
        .bind(status.as_str())
        .bind(reading.timestamp.timestamp_millis())
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(readings.len() as u64)
}

/// Latest readings of a kind, returned oldest first
pub async fn list_readings(
    pool: &SqlitePool,
    kind: TagKind,
    filter: &ReadingFilter,
) -> Result<Vec<ReadingRecord>> {
    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT id, tag_id, kind, value, status, timestamp FROM readings WHERE kind = ",
    );
    query.push_bind(kind.as_str());

    if let Some(tag_id) = &filter.tag_id {
        query.push(" AND tag_id = ").push_bind(tag_id.clone());
    }
    if let Some(status) = filter.status {
        query.push(" AND status = ").push_bind(status.as_str());
    }
    query
        .push(" ORDER BY id DESC LIMIT ")
        .push_bind(filter.limit.map_or(-1, i64::from));

    let rows = query.build().fetch_all(pool).await?;
    let mut records = rows
        .iter()
        .map(hydrate_reading)
        .collect::<Result<Vec<_>>>()?;
    records.reverse();
    Ok(records)
}

fn hydrate_reading(row: &SqliteRow) -> Result<ReadingRecord> {
    let kind: String = row.try_get("kind")?;
    let status: String = row.try_get("status")?;
    let millis: i64 = row.try_get("timestamp")?;

    Ok(ReadingRecord {
        id: row.try_get("id")?,
        tag_id: row.try_get("tag_id")?,
        kind: kind.parse().map_err(MonsrvError::Internal)?,
        value: row.try_get("value")?,
        status: status.parse().map_err(MonsrvError::Internal)?,
        timestamp: DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| MonsrvError::Internal(format!("timestamp out of range: {}", millis)))?,
    })
}
