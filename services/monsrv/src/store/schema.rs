//! SQLite schema bootstrap

use crate::error::Result;
use sqlx::SqlitePool;
use tracing::debug;

/// Timestamps are unix milliseconds (INTEGER)
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS tags (
        tag_id TEXT PRIMARY KEY,
        kind TEXT NOT NULL,
        description TEXT NOT NULL,
        unit TEXT NOT NULL DEFAULT '',
        category TEXT,
        moderate REAL,
        critical REAL,
        min_value REAL,
        max_value REAL,
        base_value REAL,
        volatility REAL,
        updated_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS readings (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        tag_id TEXT NOT NULL,
        kind TEXT NOT NULL,
        value REAL,
        status TEXT NOT NULL,
        timestamp INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_readings_kind_tag ON readings (kind, tag_id, id)",
    r#"
    CREATE TABLE IF NOT EXISTS alarms (
        id TEXT PRIMARY KEY,
        tag_id TEXT NOT NULL,
        tag_type TEXT NOT NULL,
        priority TEXT NOT NULL,
        description TEXT NOT NULL,
        triggered_value TEXT NOT NULL,
        triggered_at INTEGER NOT NULL,
        acknowledged_at INTEGER,
        resolved_at INTEGER,
        status TEXT NOT NULL DEFAULT 'ACTIVE',
        superseded_by TEXT,
        created_at INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_alarms_tag ON alarms (tag_id)",
    "CREATE INDEX IF NOT EXISTS idx_alarms_triggered ON alarms (triggered_at)",
    "CREATE INDEX IF NOT EXISTS idx_alarms_status ON alarms (status, priority)",
];

/// Create tables and indexes if missing
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    debug!("Database schema ready ({} statements)", SCHEMA.len());
    Ok(())
}
