//! Settings management

use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use swarm_core::spawn::{SpawnConfig, DEFAULT_CHUNK_SIZE};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid settings: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Runtime settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub spawn: SpawnSettings,
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub log_filter: String,
}

/// Which bulk instantiation path to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpawnMode {
    /// Prototype clone through command buffers on the worker pool.
    #[default]
    Job,
    /// Archetype batch allocation plus a per-entity init loop.
    Batch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnSettings {
    pub chunk_size: usize,
    pub worker_pool_size: usize,
    pub entity_count: usize,
    pub mode: SpawnMode,
}

impl SpawnSettings {
    pub fn to_config(&self) -> SpawnConfig {
        SpawnConfig::default()
            .with_chunk_size(self.chunk_size)
            .with_worker_pool_size(self.worker_pool_size)
    }
}

impl Default for SpawnSettings {
    fn default() -> Self {
        let config = SpawnConfig::default();
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            worker_pool_size: config.worker_pool_size,
            entity_count: 10_000,
            mode: SpawnMode::Job,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            spawn: SpawnSettings::default(),
            log_filter: "info".to_owned(),
        }
    }
}

impl Settings {
    pub fn from_json_str(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_json_str(&text)?;
        debug!(path = %path.display(), "settings loaded");
        Ok(settings)
    }

    /// Like [`Settings::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        match Self::load(path.as_ref()) {
            Err(SettingsError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.as_ref().display(), "no settings file, using defaults");
                Ok(Self::default())
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let settings = Settings::from_json_str("{}").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.log_filter, "info");
        assert_eq!(settings.spawn.chunk_size, 128);
        assert_eq!(settings.spawn.mode, SpawnMode::Job);
    }

    #[test]
    fn partial_spawn_section_keeps_other_defaults() {
        let settings =
            Settings::from_json_str(r#"{ "spawn": { "entity_count": 5, "mode": "batch" } }"#)
                .unwrap();
        assert_eq!(settings.spawn.entity_count, 5);
        assert_eq!(settings.spawn.mode, SpawnMode::Batch);
        assert_eq!(settings.spawn.chunk_size, 128);
    }

    #[test]
    fn unknown_mode_is_a_parse_error() {
        let err = Settings::from_json_str(r#"{ "spawn": { "mode": "threads" } }"#).unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }

    #[test]
    fn to_config_carries_tuning() {
        let spawn = SpawnSettings {
            chunk_size: 64,
            worker_pool_size: 3,
            ..SpawnSettings::default()
        };
        let config = spawn.to_config();
        assert_eq!(config.chunk_size, 64);
        assert_eq!(config.worker_pool_size, 3);
    }

    #[test]
    fn load_reads_a_file() {
        let path = std::env::temp_dir().join(format!("swarm-settings-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "log_filter": "debug", "spawn": { "chunk_size": 16 } }"#).unwrap();
        let settings = Settings::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(settings.log_filter, "debug");
        assert_eq!(settings.spawn.chunk_size, 16);
    }

    #[test]
    fn missing_file() {
        let path = std::env::temp_dir().join("swarm-settings-does-not-exist.json");
        assert!(matches!(Settings::load(&path), Err(SettingsError::Io { .. })));
        assert_eq!(Settings::load_or_default(&path).unwrap(), Settings::default());
    }
}
