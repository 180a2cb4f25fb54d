//! Monsrv configuration
//!
//! Layering: built-in defaults -> optional config file (yaml/toml/json) ->
//! `MONSRV_*` environment variables (`__` separates nested keys, e.g.
//! `MONSRV_API__PORT=8080`).

use crate::error::{MonsrvError, Result};
use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config file probed when none is given
pub const DEFAULT_CONFIG_PATH: &str = "config/monsrv.yaml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonsrvConfig {
    pub service: ServiceConfig,
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub publisher: PublisherConfig,
    pub tracker: TrackerConfig,
    pub catalog: CatalogConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "monsrv".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite connection url
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://monsrv.db?mode=rwc".to_string(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    pub enabled: bool,
    pub interval_secs: u64,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 30,
        }
    }
}

impl PublisherConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub history_capacity: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            history_capacity: alarm_core::DEFAULT_HISTORY_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// YAML catalog replacing the built-in plant
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl MonsrvConfig {
    /// Load configuration. An explicit path must exist; otherwise
    /// `MONSRV_CONFIG` and then [`DEFAULT_CONFIG_PATH`] are tried.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(MonsrvConfig::default()));
        if let Some(file) = Self::source_path(path) {
            if !file.exists() {
                return Err(MonsrvError::Config(format!(
                    "Config file not found: {}",
                    file.display()
                )));
            }
            figment = merge_file(figment, &file)?;
        }
        figment = figment.merge(Env::prefixed("MONSRV_").split("__").ignore(&["config"]));

        Self::from_figment(figment)
    }

    /// Config file [`Self::load`] reads for `path`, if any
    pub fn source_path(path: Option<&Path>) -> Option<PathBuf> {
        match path {
            Some(p) => Some(p.to_path_buf()),
            None => std::env::var("MONSRV_CONFIG")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    let default = PathBuf::from(DEFAULT_CONFIG_PATH);
                    default.exists().then_some(default)
                }),
        }
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: MonsrvConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.api.port == 0 {
            return Err(MonsrvError::Config("api.port must be non-zero".into()));
        }
        if self.publisher.interval_secs == 0 {
            return Err(MonsrvError::Config(
                "publisher.interval_secs must be non-zero".into(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(MonsrvError::Config(
                "database.max_connections must be non-zero".into(),
            ));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("yaml");
    match extension {
        "json" => Ok(figment.merge(Json::file(path))),
        "toml" => Ok(figment.merge(Toml::file(path))),
        "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
        other => Err(MonsrvError::Config(format!(
            "Unsupported config format: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = MonsrvConfig::default();
        assert_eq!(config.api.port, 3000);
        assert_eq!(config.publisher.interval(), Duration::from_secs(30));
        assert_eq!(config.tracker.history_capacity, 1000);
        assert!(config.catalog.path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn yaml_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "api:\n  port: 8088\npublisher:\n  interval_secs: 5\nlogging:\n  json: true"
        )
        .unwrap();

        let figment = Figment::from(Serialized::defaults(MonsrvConfig::default()));
        let figment = merge_file(figment, file.path()).unwrap();
        let config = MonsrvConfig::from_figment(figment).unwrap();
        assert_eq!(config.api.port, 8088);
        assert_eq!(config.api.host, "0.0.0.0");
        assert_eq!(config.publisher.interval_secs, 5);
        assert!(config.logging.json);
    }

    #[test]
    fn zero_interval_rejected() {
        let figment = Figment::from(Serialized::defaults(MonsrvConfig::default()))
            .merge(Serialized::default("publisher.interval_secs", 0));
        assert!(matches!(
            MonsrvConfig::from_figment(figment),
            Err(MonsrvError::Config(_))
        ));
    }

    #[test]
    fn shipped_config_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_CONFIG_PATH);
        let figment = Figment::from(Serialized::defaults(MonsrvConfig::default()));
        let config = MonsrvConfig::from_figment(merge_file(figment, &path).unwrap()).unwrap();
        assert_eq!(config.service.name, "monsrv");
        assert_eq!(config.publisher.interval_secs, 30);
    }

    #[test]
    fn explicit_path_is_the_source() {
        let path = Path::new("/etc/monsrv/monsrv.toml");
        assert_eq!(MonsrvConfig::source_path(Some(path)), Some(path.to_path_buf()));
    }

    #[test]
    fn missing_explicit_file_is_error() {
        let result = MonsrvConfig::load(Some(Path::new("/nonexistent/monsrv.yaml")));
        assert!(matches!(result, Err(MonsrvError::Config(_))));
    }

    #[test]
    fn unsupported_extension_is_error() {
        let figment = Figment::new();
        assert!(merge_file(figment, Path::new("monsrv.ini")).is_err());
    }
}
