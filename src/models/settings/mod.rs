// Settings module
// TOML-backed application settings and per-schedule configuration

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::mode::{default_modes, ModeId, ModeInfo, ModeTable};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("You need to define an id")]
    MissingId,
    #[error("You need to define a title")]
    MissingTitle,
    #[error("invalid mode table: {0}")]
    InvalidModeTable(String),
}

/// One editable schedule: the record id in the remote store and the title
/// shown above the grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub id: String,
    pub title: String,
}

impl ScheduleConfig {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id.trim().is_empty() {
            return Err(ConfigError::MissingId);
        }
        if self.title.trim().is_empty() {
            return Err(ConfigError::MissingTitle);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSettings {
    /// HTTP endpoint accepting `schedule_list/*` commands. When unset the
    /// local SQLite store is the authority.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    #[serde(default = "default_initial_mode")]
    pub initial_mode: String,
    #[serde(default = "default_modes")]
    pub modes: Vec<ModeInfo>,
    #[serde(default)]
    pub schedules: Vec<ScheduleConfig>,
    #[serde(default)]
    pub remote: RemoteSettings,
}

fn default_initial_mode() -> String {
    "comfort".to_string()
}

fn default_timeout_secs() -> u64 {
    20
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: None,
            initial_mode: default_initial_mode(),
            modes: default_modes(),
            schedules: Vec::new(),
            remote: RemoteSettings::default(),
        }
    }
}

impl Settings {
    /// Load from the platform config directory, falling back to defaults
    /// when no file exists yet.
    pub fn load() -> Result<Self> {
        match Self::project_dirs() {
            Some(dirs) => Self::load_from(&dirs.config_dir().join("settings.toml")),
            None => {
                log::warn!("Could not determine config directory, using default settings");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("No settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        let settings: Settings = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse settings file {}", path.display()))?;
        settings.validate().context("Invalid settings")?;
        Ok(settings)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create settings directory")?;
        }
        let contents = toml::to_string_pretty(self).context("Failed to serialize settings")?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write settings file {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let table = self.mode_table()?;
        if !table.contains(&ModeId::new(self.initial_mode.as_str())) {
            return Err(ConfigError::InvalidModeTable(format!(
                "initial mode '{}' is not in the mode table",
                self.initial_mode
            )));
        }
        for schedule in &self.schedules {
            schedule.validate()?;
        }
        Ok(())
    }

    pub fn mode_table(&self) -> Result<ModeTable, ConfigError> {
        ModeTable::new(self.modes.clone())
    }

    /// Database file for the local schedule store.
    pub fn resolve_database_path(&self) -> PathBuf {
        if let Some(path) = &self.database_path {
            return path.clone();
        }
        match Self::project_dirs() {
            Some(dirs) => dirs.data_dir().join("schedules.db"),
            None => PathBuf::from("schedules.db"),
        }
    }

    /// Schedule to open: the one named `id`, else the first configured one.
    pub fn schedule(&self, id: Option<&str>) -> Option<ScheduleConfig> {
        match id {
            Some(id) => self
                .schedules
                .iter()
                .find(|schedule| schedule.id == id)
                .cloned()
                .or_else(|| Some(ScheduleConfig::new(id, id))),
            None => self.schedules.first().cloned(),
        }
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("com", "Ken24T", "ScheduleGrid")
    }
}
