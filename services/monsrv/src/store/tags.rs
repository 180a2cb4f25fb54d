//! Tag registry - catalog mirrored into the `tags` table for the API

use crate::error::{MonsrvError, Result};
use alarm_core::{DescriptionCategory, TagKind, ThresholdCatalog};
use chrono::Utc;
use serde::Serialize;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagRecord {
    pub tag_id: String,
    pub kind: TagKind,
    pub description: String,
    pub unit: String,
    pub category: Option<String>,
    pub moderate: Option<f64>,
    pub critical: Option<f64>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub base_value: Option<f64>,
    pub volatility: Option<f64>,
}

/// Upsert every catalog tag
pub async fn seed_tags(pool: &SqlitePool, catalog: &ThresholdCatalog) -> Result<usize> {
    let now = Utc::now().timestamp_millis();
    let mut tx = pool.begin().await?;

    for tag in catalog.iter() {
        let category = (!tag.kind.is_digital()).then(|| category_name(tag.category()));
        let threshold = tag.threshold.as_ref();
        let simulation = tag.simulation.as_ref();

        sqlx::query(
            r#"
            INSERT INTO tags (tag_id, kind, description, unit, category, moderate, critical,
                              min_value, max_value, base_value, volatility, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(tag_id) DO UPDATE SET
                kind = excluded.kind,
                description = excluded.description,
                unit = excluded.unit,
                category = excluded.category,
                moderate = excluded.moderate,
                critical = excluded.critical,
                min_value = excluded.min_value,
                max_value = excluded.max_value,
                base_value = excluded.base_value,
                volatility = excluded.volatility,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&tag.tag_id)
        .bind(tag.kind.as_str())
        .bind(&tag.description)
        .bind(&tag.unit)
        .bind(category)
        .bind(threshold.map(|t| t.moderate))
        .bind(threshold.map(|t| t.critical))
        .bind(simulation.map(|s| s.min_value))
        .bind(simulation.map(|s| s.max_value))
        .bind(simulation.map(|s| s.base_value))
        .bind(simulation.map(|s| s.volatility))
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    info!("Seeded {} tags", catalog.len());
    Ok(catalog.len())
}

pub async fn list_tags(pool: &SqlitePool, kind: TagKind) -> Result<Vec<TagRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT tag_id, kind, description, unit, category, moderate, critical,
               min_value, max_value, base_value, volatility
        FROM tags
        WHERE kind = ?
        ORDER BY tag_id ASC
        "#,
    )
    .bind(kind.as_str())
    .fetch_all(pool)
    .await?;

    rows.iter().map(hydrate_tag).collect()
}

pub async fn get_tag(pool: &SqlitePool, kind: TagKind, tag_id: &str) -> Result<Option<TagRecord>> {
    let row = sqlx::query(
        r#"
        SELECT tag_id, kind, description, unit, category, moderate, critical,
               min_value, max_value, base_value, volatility
        FROM tags
        WHERE kind = ? AND tag_id = ?
        "#,
    )
    .bind(kind.as_str())
    .bind(tag_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(hydrate_tag).transpose()
}

fn category_name(category: DescriptionCategory) -> &'static str {
    match category {
        DescriptionCategory::Temperature => "TEMPERATURE",
        DescriptionCategory::Pressure => "PRESSURE",
        DescriptionCategory::Default => "DEFAULT",
    }
}

fn hydrate_tag(row: &SqliteRow) -> Result<TagRecord> {
    let kind: String = row.try_get("kind")?;
    Ok(TagRecord {
        tag_id: row.try_get("tag_id")?,
        kind: kind.parse().map_err(MonsrvError::Internal)?,
        description: row.try_get("description")?,
        unit: row.try_get("unit")?,
        category: row.try_get("category")?,
        moderate: row.try_get("moderate")?,
        critical: row.try_get("critical")?,
        min_value: row.try_get("min_value")?,
        max_value: row.try_get("max_value")?,
        base_value: row.try_get("base_value")?,
        volatility: row.try_get("volatility")?,
    })
}
