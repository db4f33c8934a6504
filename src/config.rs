//! TOML-based monitor configuration.
//!
//! Stored at `<config dir>/config.toml` (for example
//! `~/.config/zensta/config.toml` on Linux). Every field is optional; a
//! missing file means defaults.

use crate::constants::{FOREGROUND_POLL_MS, NOTICE_DISMISS_MS};
use crate::error::AppError;
use crate::tracker::TrackerConfig;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE: &str = "config.toml";
const DATABASE_FILE: &str = "zensta.db";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// How long a notice stays up before dismissing itself.
    #[serde(default = "default_notice_duration_ms")]
    pub notice_duration_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Lock database location; defaults to the data directory.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

fn default_notice_duration_ms() -> u64 {
    NOTICE_DISMISS_MS
}
fn default_poll_interval_ms() -> u64 {
    FOREGROUND_POLL_MS
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            notice_duration_ms: default_notice_duration_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            database_path: None,
        }
    }
}

pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "zensta", "Zensta")
}

impl MonitorConfig {
    /// Load from the standard location, falling back to defaults when the
    /// file does not exist.
    pub fn load() -> Result<Self, AppError> {
        match project_dirs() {
            Some(dirs) => Self::load_from(&dirs.config_dir().join(CONFIG_FILE)),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, AppError> {
        let config: Self = toml::from_str(contents)?;
        if config.poll_interval_ms == 0 {
            return Err(AppError::Config("poll_interval_ms must be positive".into()));
        }
        Ok(config)
    }

    pub fn notice_duration(&self) -> Duration {
        Duration::from_millis(self.notice_duration_ms)
    }

    pub fn tracker(&self) -> TrackerConfig {
        TrackerConfig {
            poll_interval_ms: self.poll_interval_ms,
        }
    }

    /// Configured database path, or `zensta.db` in the data directory
    /// (created if missing). `None` if no data directory can be determined.
    pub fn resolve_database_path(&self) -> Result<Option<PathBuf>, AppError> {
        if let Some(path) = &self.database_path {
            return Ok(Some(path.clone()));
        }
        let Some(dirs) = project_dirs() else {
            return Ok(None);
        };
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;
        Ok(Some(data_dir.join(DATABASE_FILE)))
    }
}
