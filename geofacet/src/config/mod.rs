//! Configuration management for geofacet
//!
//! Default config location: ./geofacet.toml

use crate::error::{Error, Result};
use crate::geo::{DistanceUnit, GeoDistance};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "geofacet.toml";

/// Main configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub facet: FacetConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Defaults for request fields left unset.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FacetConfig {
    #[serde(default)]
    pub default_unit: DistanceUnit,
    #[serde(default)]
    pub default_distance_type: GeoDistance,
    #[serde(default = "default_script_lang")]
    pub default_script_lang: String,
}

fn default_script_lang() -> String {
    crate::script::DEFAULT_LANG.to_string()
}

impl Default for FacetConfig {
    fn default() -> Self {
        Self {
            default_unit: DistanceUnit::default(),
            default_distance_type: GeoDistance::default(),
            default_script_lang: default_script_lang(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log output format: "pretty" or "json"
    /// Override with LOG_FORMAT env var
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter string
    /// Override with RUST_LOG env var
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_log_level() -> String {
    "info,geofacet=debug".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        match self.observability.log_format.as_str() {
            "pretty" | "json" => Ok(()),
            other => Err(Error::Config(format!(
                "unknown log_format '{}', expected \"pretty\" or \"json\"",
                other
            ))),
        }
    }

    /// Replace the configured log format, e.g. from `LOG_FORMAT`.
    pub fn override_log_format(&mut self, format: &str) -> Result<()> {
        self.observability.log_format = format.to_string();
        self.validate()
    }

    /// Load config from file path, or fall back to defaults when it is missing
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Ok(Config::default())
        }
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.facet.default_unit, DistanceUnit::Kilometers);
        assert_eq!(config.facet.default_distance_type, GeoDistance::Arc);
        assert_eq!(config.facet.default_script_lang, "expression");
        assert_eq!(config.observability.log_format, "pretty");
    }

    #[test]
    fn test_partial_file() {
        let config: Config = toml::from_str(
            r#"
            [facet]
            default_unit = "mi"
            "#,
        )
        .unwrap();
        assert_eq!(config.facet.default_unit, DistanceUnit::Miles);
        assert_eq!(config.facet.default_distance_type, GeoDistance::Arc);
        assert_eq!(config.observability, ObservabilityConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(DEFAULT_CONFIG_FILE);

        let mut config = Config::default();
        config.facet.default_distance_type = GeoDistance::SloppyArc;
        config.observability.log_format = "json".to_string();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_rejects_bad_unit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&path, "[facet]\ndefault_unit = \"parsecs\"\n").unwrap();
        assert!(matches!(Config::load(&path), Err(Error::TomlDe(_))));
    }

    #[test]
    fn test_load_rejects_bad_log_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&path, "[observability]\nlog_format = \"xml\"\n").unwrap();
        assert!(matches!(Config::load(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_log_format_override() {
        let mut config = Config::default();
        config.override_log_format("json").unwrap();
        assert_eq!(config.observability.log_format, "json");
        assert!(matches!(
            config.override_log_format("jsn"),
            Err(Error::Config(_))
        ));
    }
}
