//! Operating modes that can be painted onto schedule slots.
//!
//! The set of modes is an immutable table handed to the editor at
//! construction. Nothing mutates it at runtime, so tests can swap in their
//! own table.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::schedule::ScheduleError;
use crate::models::settings::ConfigError;

/// Identifier of a mode, e.g. `eco`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModeId(String);

impl ModeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeInfo {
    pub id: ModeId,
    pub label: String,
    pub color: String,
}

impl ModeInfo {
    pub fn new(id: &str, label: &str, color: &str) -> Self {
        Self {
            id: ModeId::new(id),
            label: label.to_string(),
            color: color.to_string(),
        }
    }
}

/// Ordered lookup table of the modes a schedule may contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeTable {
    entries: Vec<ModeInfo>,
}

impl ModeTable {
    /// Build a table, rejecting empty tables and duplicate ids.
    pub fn new(entries: Vec<ModeInfo>) -> Result<Self, ConfigError> {
        Self::validate_entries(&entries)?;
        Ok(Self { entries })
    }

    pub fn validate_entries(entries: &[ModeInfo]) -> Result<(), ConfigError> {
        if entries.is_empty() {
            return Err(ConfigError::InvalidModeTable(
                "at least one mode is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for entry in entries {
            if entry.id.as_str().trim().is_empty() {
                return Err(ConfigError::InvalidModeTable(
                    "mode ids cannot be empty".to_string(),
                ));
            }
            if !seen.insert(entry.id.as_str()) {
                return Err(ConfigError::InvalidModeTable(format!(
                    "duplicate mode id '{}'",
                    entry.id
                )));
            }
        }

        Ok(())
    }

    /// Mode every slot of a first-run schedule starts in (the first entry).
    pub fn fill_mode(&self) -> &ModeId {
        &self.entries[0].id
    }

    pub fn get(&self, id: &ModeId) -> Option<&ModeInfo> {
        self.entries.iter().find(|entry| &entry.id == id)
    }

    pub fn contains(&self, id: &ModeId) -> bool {
        self.get(id).is_some()
    }

    /// Look up a mode by its textual id.
    pub fn resolve(&self, id: &str) -> Result<ModeId, ScheduleError> {
        self.entries
            .iter()
            .find(|entry| entry.id.as_str() == id)
            .map(|entry| entry.id.clone())
            .ok_or_else(|| ScheduleError::UnknownMode(id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModeInfo> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ModeTable {
    fn default() -> Self {
        Self {
            entries: default_modes(),
        }
    }
}

pub fn default_modes() -> Vec<ModeInfo> {
    vec![
        ModeInfo::new("eco", "Eco", "lightblue"),
        ModeInfo::new("comfort", "Comfort", "red"),
        ModeInfo::new("away", "Away", "green"),
    ]
}
