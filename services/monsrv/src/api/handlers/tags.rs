//! Tag and reading endpoints, one set per tag kind:
//! `digital-inputs`, `digital-outputs`, `analog-inputs`, `analog-outputs`.

use crate::api::response::{ok, ApiResponse};
use crate::app_state::AppState;
use crate::error::{MonsrvError, Result};
use crate::store::{self, ReadingFilter, ReadingRecord, TagRecord};
use alarm_core::{Severity, TagKind};
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

const DEFAULT_READINGS_LIMIT: u32 = 100;
const DEFAULT_TAG_READINGS_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 1000;

/// Map a URL segment to a tag kind
pub fn parse_kind(segment: &str) -> Result<TagKind> {
    match segment {
        "digital-inputs" => Ok(TagKind::DigitalInput),
        "digital-outputs" => Ok(TagKind::DigitalOutput),
        "analog-inputs" => Ok(TagKind::AnalogInput),
        "analog-outputs" => Ok(TagKind::AnalogOutput),
        _ => Err(MonsrvError::not_found("Endpoint")),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingQuery {
    pub tag_id: Option<String>,
    /// HEALTHY, MODERATE or CRITICAL
    pub status: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct TagWithReadings {
    pub tag: TagRecord,
    pub readings: Vec<ReadingRecord>,
}

fn reading_filter(query: ReadingQuery, default_limit: u32) -> Result<ReadingFilter> {
    let status = match query.status.as_deref().map(str::to_uppercase).as_deref() {
        None | Some("") => None,
        Some(s) => Some(s.parse::<Severity>().map_err(MonsrvError::invalid_input)?),
    };
    let limit = match query.limit {
        Some(0) => return Err(MonsrvError::invalid_input("limit must be positive")),
        Some(n) => n.min(MAX_LIMIT),
        None => default_limit,
    };

    Ok(ReadingFilter {
        tag_id: query.tag_id.filter(|t| !t.is_empty()),
        status,
        limit: Some(limit),
    })
}

/// GET /api/{kind}/tags
pub async fn list_tags(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> Result<Json<ApiResponse<Vec<TagRecord>>>> {
    let kind = parse_kind(&kind)?;
    let tags = store::list_tags(&state.pool, kind).await?;
    Ok(ok(format!("Retrieved {} {} tags", tags.len(), kind.label()), tags))
}

/// GET /api/{kind}/readings
pub async fn list_readings(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    query: std::result::Result<Query<ReadingQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<ReadingRecord>>>> {
    let Query(query) = query?;
    let kind = parse_kind(&kind)?;
    let filter = reading_filter(query, DEFAULT_READINGS_LIMIT)?;
    let readings = store::list_readings(&state.pool, kind, &filter).await?;
    Ok(ok(format!("Retrieved {} readings", readings.len()), readings))
}

/// GET /api/{kind}/{tag_id}
pub async fn get_tag(
    State(state): State<AppState>,
    Path((kind, tag_id)): Path<(String, String)>,
    query: std::result::Result<Query<ReadingQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<TagWithReadings>>> {
    let Query(query) = query?;
    let kind = parse_kind(&kind)?;
    let tag = store::get_tag(&state.pool, kind, &tag_id)
        .await?
        .ok_or_else(|| MonsrvError::not_found(format!("Tag {}", tag_id)))?;

    let mut filter = reading_filter(query, DEFAULT_TAG_READINGS_LIMIT)?;
    filter.tag_id = Some(tag_id);
    let readings = store::list_readings(&state.pool, kind, &filter).await?;

    Ok(ok("Tag retrieved", TagWithReadings { tag, readings }))
}
