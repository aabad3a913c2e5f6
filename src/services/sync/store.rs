// Local schedule store
// SQLite-backed authority answering the same commands as the remote server

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use super::wire::{ModeEntry, ScheduleRecord};
use super::{RemoteHandle, SyncError};
use crate::services::database::Database;

pub struct SqliteScheduleStore {
    db: Database,
}

impl SqliteScheduleStore {
    pub fn new(db: Database) -> Result<Self> {
        db.initialize_schema()?;
        Ok(Self { db })
    }

    pub fn open(path: &Path) -> Result<Self> {
        log::info!("Opening schedule store at {}", path.display());
        Self::new(Database::open(path)?)
    }

    pub fn in_memory() -> Result<Self> {
        Self::new(Database::new(":memory:")?)
    }

    pub fn load(&self, schedule_id: &str) -> Result<Option<ScheduleRecord>> {
        let row: Option<(String, String)> = self
            .db
            .connection()
            .query_row(
                "SELECT schedule, entities FROM schedules WHERE id = ?1",
                [schedule_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .context("Failed to query schedule")?;

        let Some((schedule, entities)) = row else {
            return Ok(None);
        };

        let schedule: Vec<Vec<ModeEntry>> = serde_json::from_str(&schedule)
            .with_context(|| format!("Stored grid for '{}' is not valid JSON", schedule_id))?;
        let entities: Vec<String> = serde_json::from_str(&entities)
            .with_context(|| format!("Stored entities for '{}' are not valid JSON", schedule_id))?;

        Ok(Some(ScheduleRecord { schedule, entities }))
    }

    /// Insert or overwrite the record stored under `schedule_id`.
    pub fn save(&self, schedule_id: &str, record: &ScheduleRecord) -> Result<()> {
        if !record.has_grid_shape() {
            bail!("Schedule '{}' is not a 7x48 grid", schedule_id);
        }

        let schedule = serde_json::to_string(&record.schedule).context("Failed to encode grid")?;
        let entities =
            serde_json::to_string(&record.entities).context("Failed to encode entities")?;
        let now = Utc::now().to_rfc3339();

        self.db
            .connection()
            .execute(
                "INSERT INTO schedules (id, schedule, entities, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                    schedule = excluded.schedule,
                    entities = excluded.entities,
                    updated_at = excluded.updated_at",
                params![schedule_id, schedule, entities, now],
            )
            .context("Failed to save schedule")?;

        Ok(())
    }

    pub fn list_ids(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .db
            .connection()
            .prepare("SELECT id FROM schedules ORDER BY id")?;

        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()
            .context("Failed to list schedules")?;

        Ok(ids)
    }

    /// First schedule (by id) whose entity binding contains `entity_id`.
    pub fn find_by_entity(&self, entity_id: &str) -> Result<Option<String>> {
        let mut stmt = self
            .db
            .connection()
            .prepare("SELECT id, entities FROM schedules ORDER BY id")?;

        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to scan schedules")?;

        for (id, entities) in rows {
            match serde_json::from_str::<Vec<String>>(&entities) {
                Ok(entities) if entities.iter().any(|e| e == entity_id) => return Ok(Some(id)),
                Ok(_) => {}
                Err(err) => log::warn!("Skipping schedule '{}' with bad entities: {}", id, err),
            }
        }

        Ok(None)
    }

    pub fn delete(&self, schedule_id: &str) -> Result<bool> {
        let deleted = self
            .db
            .connection()
            .execute("DELETE FROM schedules WHERE id = ?1", [schedule_id])
            .context("Failed to delete schedule")?;
        Ok(deleted > 0)
    }
}

impl RemoteHandle for SqliteScheduleStore {
    async fn schedule_fetch(&self, schedule_id: &str) -> Result<ScheduleRecord, SyncError> {
        match self.load(schedule_id) {
            Ok(Some(record)) => Ok(record),
            Ok(None) => Err(SyncError::NotFound {
                schedule_id: schedule_id.to_string(),
            }),
            Err(err) if err.downcast_ref::<serde_json::Error>().is_some() => {
                Err(SyncError::Malformed(format!("{:#}", err)))
            }
            Err(err) => Err(SyncError::Transport(format!("{:#}", err))),
        }
    }

    async fn schedule_update(
        &self,
        schedule_id: &str,
        record: &ScheduleRecord,
    ) -> Result<(), SyncError> {
        if !record.has_grid_shape() {
            return Err(SyncError::Rejected(format!(
                "schedule '{}' must be 7x48",
                schedule_id
            )));
        }
        self.save(schedule_id, record)
            .map_err(|err| SyncError::Transport(format!("{:#}", err)))
    }
}
