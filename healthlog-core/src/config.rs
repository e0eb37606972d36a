//! Configuration management
//!
//! Settings live in `settings.json` in the data directory:
//! ```json
//! {
//!   "defaultImageUrl": "/static/images/default-pic.png",
//!   "units": "imperial",
//!   "postRetention": "orphan",
//!   "passwordHashing": { "memoryCost": 19456, "timeCost": 2, "parallelism": 1 }
//! }
//! ```
//! Keys this crate does not manage are kept as-is when saving.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::{Argon2Params, PostRetention, UnitSystem, DEFAULT_IMAGE_URL};

const SETTINGS_FILE: &str = "settings.json";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    units: Option<UnitSystem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    post_retention: Option<PostRetention>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    password_hashing: Option<Argon2Params>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Healthlog configuration (resolved view of settings)
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub default_image_url: String,
    pub units: UnitSystem,
    pub post_retention: PostRetention,
    pub password_hashing: Argon2Params,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_image_url: DEFAULT_IMAGE_URL.to_string(),
            units: UnitSystem::default(),
            post_retention: PostRetention::default(),
            password_hashing: Argon2Params::default(),
        }
    }
}

impl Config {
    /// Load config from the data directory
    ///
    /// A missing or unparsable file yields defaults. Units and post
    /// retention can be overridden with `HEALTHLOG_UNITS` and
    /// `HEALTHLOG_POST_RETENTION`.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let raw = read_settings(&data_dir.join(SETTINGS_FILE))?;

        let mut config = Self::from_settings(&raw);
        config.apply_overrides(
            std::env::var("HEALTHLOG_UNITS").ok().as_deref(),
            std::env::var("HEALTHLOG_POST_RETENTION").ok().as_deref(),
        );
        Ok(config)
    }

    fn from_settings(raw: &SettingsFile) -> Self {
        let defaults = Self::default();
        Self {
            default_image_url: raw
                .default_image_url
                .clone()
                .filter(|url| !url.trim().is_empty())
                .unwrap_or(defaults.default_image_url),
            units: raw.units.unwrap_or(defaults.units),
            post_retention: raw.post_retention.unwrap_or(defaults.post_retention),
            password_hashing: raw.password_hashing.unwrap_or(defaults.password_hashing),
        }
    }

    /// Apply environment-style overrides; unrecognized values are ignored
    fn apply_overrides(&mut self, units: Option<&str>, retention: Option<&str>) {
        if let Some(units) = units.and_then(|u| u.parse().ok()) {
            self.units = units;
        }
        if let Some(retention) = retention.and_then(|r| r.parse().ok()) {
            self.post_retention = retention;
        }
    }

    /// Save config to the data directory
    /// Preserves other settings that this crate doesn't manage
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let settings_path = data_dir.join(SETTINGS_FILE);

        let mut settings = read_settings(&settings_path)?;

        settings.default_image_url = Some(self.default_image_url.clone());
        settings.units = Some(self.units);
        settings.post_retention = Some(self.post_retention);
        settings.password_hashing = Some(self.password_hashing);

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }
}

fn read_settings(path: &Path) -> Result<SettingsFile> {
    if !path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let raw = read_settings(&dir.path().join(SETTINGS_FILE)).unwrap();
        let config = Config::from_settings(&raw);
        assert_eq!(config, Config::default());
        assert_eq!(config.default_image_url, DEFAULT_IMAGE_URL);
    }

    #[test]
    fn test_partial_settings() {
        let raw: SettingsFile = serde_json::from_str(
            r#"{"units": "metric", "passwordHashing": {"timeCost": 3}}"#,
        )
        .unwrap();
        let config = Config::from_settings(&raw);

        assert_eq!(config.units, UnitSystem::Metric);
        assert_eq!(config.post_retention, PostRetention::Orphan);
        assert_eq!(config.password_hashing.time_cost, 3);
        assert_eq!(config.password_hashing.memory_cost, Argon2Params::default().memory_cost);
    }

    #[test]
    fn test_invalid_file_falls_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, "{ not json").unwrap();

        let raw = read_settings(&path).unwrap();
        assert_eq!(Config::from_settings(&raw), Config::default());
    }

    #[test]
    fn test_overrides() {
        let mut config = Config::default();
        config.apply_overrides(Some("METRIC"), Some("delete"));
        assert_eq!(config.units, UnitSystem::Metric);
        assert_eq!(config.post_retention, PostRetention::Delete);

        config.apply_overrides(Some("furlongs"), None);
        assert_eq!(config.units, UnitSystem::Metric);
    }

    #[test]
    fn test_save_preserves_unknown_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, r#"{"theme": "dark", "units": "metric"}"#).unwrap();

        let mut config = Config::from_settings(&read_settings(&path).unwrap());
        config.post_retention = PostRetention::Delete;
        config.save(dir.path()).unwrap();

        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved["theme"], "dark");
        assert_eq!(saved["units"], "metric");
        assert_eq!(saved["postRetention"], "delete");
        assert_eq!(saved["passwordHashing"]["timeCost"], 2);
    }
}
