//! SQLite persistence: schema, tag registry, readings and alarms

pub mod alarms;
pub mod readings;
pub mod schema;
pub mod tags;

pub use alarms::SqliteAlarmStore;
pub use readings::{insert_readings, list_readings, ReadingFilter, ReadingRecord};
pub use schema::init_schema;
pub use tags::{get_tag, list_tags, seed_tags, TagRecord};

use crate::config::DatabaseConfig;
use crate::error::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tracing::info;

/// Open the pool and bootstrap the schema
pub async fn connect(config: &DatabaseConfig) -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await?;
    init_schema(&pool).await?;
    info!("Connected to database {}", config.url);
    Ok(pool)
}
