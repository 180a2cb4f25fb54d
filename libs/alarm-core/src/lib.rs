//! Alarm Core - threshold-based alarm detection and lifecycle tracking
//!
//! Converts raw tag readings into alarm state transitions:
//! - `catalog`: per-tag thresholds and metadata
//! - `classifier`: reading -> severity level
//! - `description`: human-readable alarm messages
//! - `tracker`: active-alarm map, per-cycle evaluation, counters
//! - `store`: durable alarm persistence seam

pub mod catalog;
pub mod classifier;
pub mod description;
pub mod error;
pub mod store;
pub mod tracker;
pub mod types;

pub use catalog::{DescriptionCategory, SimulationProfile, TagInfo, Threshold, ThresholdCatalog};
pub use classifier::classify;
pub use description::describe;
pub use error::{CatalogError, Result, StoreError, StoreResult};
pub use store::{AlarmFilter, AlarmStore, AlarmSummary, MemoryAlarmStore, SummaryFilter};
pub use tracker::{AlarmTracker, DEFAULT_HISTORY_CAPACITY};
pub use types::{
    generate_alarm_id, Alarm, AlarmPriority, AlarmStatistics, AlarmStatus, Reading, Severity,
    TagKind,
};
