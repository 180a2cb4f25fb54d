//! SQLite-backed alarm store

use alarm_core::{
    Alarm, AlarmFilter, AlarmPriority, AlarmStatus, AlarmStore, AlarmSummary, StoreError,
    StoreResult, SummaryFilter, TagKind,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite, SqlitePool};

const ALARM_COLUMNS: &str = "id, tag_id, tag_type, priority, description, triggered_value, \
     triggered_at, acknowledged_at, resolved_at, status, superseded_by";

#[derive(Debug, Clone)]
pub struct SqliteAlarmStore {
    pool: SqlitePool,
}

impl SqliteAlarmStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn list(&self, tag_id: Option<&str>, filter: &AlarmFilter) -> StoreResult<Vec<Alarm>> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM alarms WHERE 1 = 1", ALARM_COLUMNS));

        if let Some(tag_id) = tag_id {
            query.push(" AND tag_id = ").push_bind(tag_id.to_string());
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(priority) = filter.priority {
            query.push(" AND priority = ").push_bind(priority.as_str());
        }
        if let Some(since) = filter.since {
            query
                .push(" AND triggered_at >= ")
                .push_bind(since.timestamp_millis());
        }

        // SQLite needs a LIMIT before OFFSET; -1 means unbounded
        let limit = filter.limit.map_or(-1, i64::from);
        query
            .push(" ORDER BY triggered_at DESC, created_at DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(i64::from(filter.offset));

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.iter().map(hydrate_alarm).collect()
    }

    async fn fetch_required(&self, alarm_id: &str) -> StoreResult<Alarm> {
        self.get_alarm(alarm_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(alarm_id.to_string()))
    }
}

#[async_trait]
impl AlarmStore for SqliteAlarmStore {
    async fn insert_alarm(&self, alarm: &Alarm) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO alarms (id, tag_id, tag_type, priority, description, triggered_value,
                                triggered_at, acknowledged_at, resolved_at, status,
                                superseded_by, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&alarm.id)
        .bind(&alarm.tag_id)
        .bind(alarm.tag_type.as_str())
        .bind(alarm.priority.as_str())
        .bind(&alarm.description)
        .bind(&alarm.triggered_value)
        .bind(alarm.triggered_at.timestamp_millis())
        .bind(alarm.acknowledged_at.map(|t| t.timestamp_millis()))
        .bind(alarm.resolved_at.map(|t| t.timestamp_millis()))
        .bind(alarm.status.as_str())
        .bind(&alarm.superseded_by)
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn get_alarm(&self, alarm_id: &str) -> StoreResult<Option<Alarm>> {
        let row = sqlx::query(&format!("SELECT {} FROM alarms WHERE id = ?", ALARM_COLUMNS))
            .bind(alarm_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(hydrate_alarm).transpose()
    }

    async fn list_alarms(&self, filter: &AlarmFilter) -> StoreResult<Vec<Alarm>> {
        self.list(None, filter).await
    }

    async fn list_alarms_by_tag(
        &self,
        tag_id: &str,
        filter: &AlarmFilter,
    ) -> StoreResult<Vec<Alarm>> {
        self.list(Some(tag_id), filter).await
    }

    async fn acknowledge_alarm(&self, alarm_id: &str, at: DateTime<Utc>) -> StoreResult<Alarm> {
        let result = sqlx::query(
            "UPDATE alarms SET acknowledged_at = COALESCE(acknowledged_at, ?) WHERE id = ?",
        )
        .bind(at.timestamp_millis())
        .bind(alarm_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(alarm_id.to_string()));
        }
        self.fetch_required(alarm_id).await
    }

    async fn resolve_alarm(&self, alarm_id: &str, at: DateTime<Utc>) -> StoreResult<Alarm> {
        let result = sqlx::query(
            r#"
            UPDATE alarms
            SET status = 'RESOLVED', resolved_at = COALESCE(resolved_at, ?)
            WHERE id = ?
            "#,
        )
        .bind(at.timestamp_millis())
        .bind(alarm_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(alarm_id.to_string()));
        }
        self.fetch_required(alarm_id).await
    }

    async fn close_alarm(&self, alarm: &Alarm) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO alarms (id, tag_id, tag_type, priority, description, triggered_value,
                                triggered_at, acknowledged_at, resolved_at, status,
                                superseded_by, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                triggered_value = excluded.triggered_value,
                triggered_at = excluded.triggered_at,
                acknowledged_at = COALESCE(alarms.acknowledged_at, excluded.acknowledged_at),
                status = excluded.status,
                resolved_at = COALESCE(alarms.resolved_at, excluded.resolved_at),
                superseded_by = excluded.superseded_by
            "#,
        )
        .bind(&alarm.id)
        .bind(&alarm.tag_id)
        .bind(alarm.tag_type.as_str())
        .bind(alarm.priority.as_str())
        .bind(&alarm.description)
        .bind(&alarm.triggered_value)
        .bind(alarm.triggered_at.timestamp_millis())
        .bind(alarm.acknowledged_at.map(|t| t.timestamp_millis()))
        .bind(alarm.resolved_at.map(|t| t.timestamp_millis()))
        .bind(alarm.status.as_str())
        .bind(&alarm.superseded_by)
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn summary(&self, filter: &SummaryFilter) -> StoreResult<AlarmSummary> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
            r#"
            SELECT
                COUNT(*) AS total,
                COALESCE(SUM(CASE WHEN status = 'ACTIVE' THEN 1 ELSE 0 END), 0) AS active,
                COALESCE(SUM(CASE WHEN status = 'RESOLVED' THEN 1 ELSE 0 END), 0) AS resolved,
                COALESCE(SUM(CASE WHEN priority = 'CRITICAL' THEN 1 ELSE 0 END), 0) AS critical,
                COALESCE(SUM(CASE WHEN priority = 'MODERATE' THEN 1 ELSE 0 END), 0) AS moderate
            FROM alarms
            WHERE 1 = 1
            "#,
        );

        if let Some(since) = filter.since {
            query
                .push(" AND triggered_at >= ")
                .push_bind(since.timestamp_millis());
        }
        if let Some(tag_id) = &filter.tag_id {
            query.push(" AND tag_id = ").push_bind(tag_id.clone());
        }
        if let Some(priority) = filter.priority {
            query.push(" AND priority = ").push_bind(priority.as_str());
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }

        let row = query
            .build()
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        let count = |column: &str| -> StoreResult<u64> {
            row.try_get::<i64, _>(column)
                .map(|v| v.max(0) as u64)
                .map_err(db_err)
        };

        Ok(AlarmSummary {
            total: count("total")?,
            active: count("active")?,
            resolved: count("resolved")?,
            critical: count("critical")?,
            moderate: count("moderate")?,
        })
    }
}

fn db_err(err: sqlx::Error) -> StoreError {
    StoreError::Database(err.to_string())
}

pub(crate) fn millis_to_datetime(ms: i64) -> StoreResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| StoreError::Serialization(format!("timestamp out of range: {}", ms)))
}

fn parse_column<T>(row: &SqliteRow, column: &str) -> StoreResult<T>
where
    T: std::str::FromStr<Err = String>,
{
    let raw: String = row.try_get(column).map_err(db_err)?;
    raw.parse().map_err(StoreError::Serialization)
}

fn hydrate_alarm(row: &SqliteRow) -> StoreResult<Alarm> {
    let optional_time = |column: &str| -> StoreResult<Option<DateTime<Utc>>> {
        row.try_get::<Option<i64>, _>(column)
            .map_err(db_err)?
            .map(millis_to_datetime)
            .transpose()
    };

    Ok(Alarm {
        id: row.try_get("id").map_err(db_err)?,
        tag_id: row.try_get("tag_id").map_err(db_err)?,
        tag_type: parse_column::<TagKind>(row, "tag_type")?,
        priority: parse_column::<AlarmPriority>(row, "priority")?,
        description: row.try_get("description").map_err(db_err)?,
        triggered_value: row.try_get("triggered_value").map_err(db_err)?,
        triggered_at: millis_to_datetime(row.try_get("triggered_at").map_err(db_err)?)?,
        acknowledged_at: optional_time("acknowledged_at")?,
        resolved_at: optional_time("resolved_at")?,
        status: parse_column::<AlarmStatus>(row, "status")?,
        superseded_by: row.try_get("superseded_by").map_err(db_err)?,
    })
}
