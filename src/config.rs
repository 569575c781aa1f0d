//! Persisted user settings (lives in the OS config directory).

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::PersistError;
use crate::model::time::default_base;
use crate::model::{ColumnMap, TimeCodec, TimeUnit};

/// Environment variable that overrides [`Settings::server_url`].
pub const SERVER_ENV: &str = "FLEET_TIMELINE_SERVER";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the solver server.
    pub server_url: String,
    /// Data files offered by the file picker.
    pub data_files: Vec<String>,
    pub active_file: String,
    pub time_unit: TimeUnit,
    /// Instant that offset 0 refers to.
    pub base_date: NaiveDateTime,
    /// Visible span of the timeline after the base date.
    pub horizon_minutes: i64,
    /// Drag positions snap to multiples of this.
    pub snap_minutes: i64,
    pub columns: ColumnMap,
    pub connect_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:5000".into(),
            data_files: ["cost_93.csv", "cost_573.csv", "cost_911.csv", "cost_1079.csv", "cost_1359.csv"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            active_file: "cost_93.csv".into(),
            time_unit: TimeUnit::Minutes,
            base_date: default_base(),
            horizon_minutes: 5000,
            snap_minutes: 5,
            columns: ColumnMap::default(),
            connect_timeout_secs: 10,
        }
    }
}

/// Where settings and the snapshot cache live.
#[derive(Debug, Clone, PartialEq)]
pub struct AppPaths {
    pub settings: PathBuf,
    pub snapshot: PathBuf,
}

impl AppPaths {
    pub fn discover() -> Self {
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "FleetTimeline") {
            Self {
                settings: proj_dirs.config_dir().join("settings.json"),
                snapshot: proj_dirs.data_dir().join("snapshot.json"),
            }
        } else {
            // Fallback
            let dir = PathBuf::from(".");
            Self {
                settings: dir.join("settings.json"),
                snapshot: dir.join("snapshot.json"),
            }
        }
    }
}

impl Settings {
    pub fn load_from(path: &Path) -> Result<Self, PersistError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), PersistError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Read the settings file, writing the defaults on first run. An
    /// unreadable file falls back to the defaults and is left alone.
    pub fn load_or_init(path: &Path) -> Self {
        if !path.exists() {
            let settings = Self::default();
            if let Err(e) = settings.save(path) {
                tracing::warn!(path = %path.display(), "could not write default settings: {}", e);
            }
            return settings;
        }
        Self::load_from(path).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), "using default settings: {}", e);
            Self::default()
        })
    }

    /// Apply overrides taken from the environment.
    pub fn with_server_override(mut self, server: Option<String>) -> Self {
        if let Some(url) = server.filter(|u| !u.trim().is_empty()) {
            tracing::info!(url = %url, "server URL overridden from {}", SERVER_ENV);
            self.server_url = url.trim().to_string();
        }
        self
    }

    pub fn codec(&self) -> TimeCodec {
        TimeCodec::new(self.base_date, self.time_unit)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.max(1))
    }
}
