//! Monsrv - plant monitoring service
//!
//! Simulates plant readings, runs them through the alarm tracker on a fixed
//! interval, persists readings and alarms to SQLite and serves them over
//! REST.

pub mod api;
pub mod app_state;
pub mod config;
pub mod error;
pub mod logging;
pub mod publisher;
pub mod shutdown;
pub mod simulator;
pub mod store;

pub use api::create_router;
pub use app_state::AppState;
pub use config::MonsrvConfig;
pub use error::{MonsrvError, Result};
pub use publisher::{CycleReport, Publisher, PublisherStats, SharedTracker};
pub use simulator::{ReadingSource, Simulator};

use alarm_core::ThresholdCatalog;
use tracing::info;

/// Catalog from `catalog.path`, or the built-in plant
pub fn load_catalog(config: &MonsrvConfig) -> Result<ThresholdCatalog> {
    match &config.catalog.path {
        Some(path) => {
            let catalog = ThresholdCatalog::from_yaml_file(path)?;
            info!("Loaded {} tags from {}", catalog.len(), path.display());
            Ok(catalog)
        },
        None => Ok(ThresholdCatalog::builtin()),
    }
}
