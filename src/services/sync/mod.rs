//! Fetch and push of whole schedules against a remote authority.
//!
//! The gateway translates between the wire record and the in-memory
//! [`ScheduleMatrix`]. It never retries: a failed push is answered by the
//! editor with a reconciling fetch.

mod error;
mod http;
mod store;
pub mod wire;

use std::rc::Rc;

pub use error::SyncError;
pub use http::HttpScheduleRemote;
pub use store::SqliteScheduleStore;

use crate::models::entity_binding::EntityBinding;
use crate::models::mode::{ModeId, ModeTable};
use crate::models::schedule::ScheduleMatrix;
use wire::{ModeEntry, ScheduleRecord};

/// The two calls a remote schedule store must answer.
///
/// Futures are awaited on a single-threaded local executor, so
/// implementations need not be `Send`.
#[allow(async_fn_in_trait)]
pub trait RemoteHandle {
    async fn schedule_fetch(&self, schedule_id: &str) -> Result<ScheduleRecord, SyncError>;

    async fn schedule_update(
        &self,
        schedule_id: &str,
        record: &ScheduleRecord,
    ) -> Result<(), SyncError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOrigin {
    Remote,
    /// First-run schedule materialized locally; nothing stored remotely yet.
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedSchedule {
    pub matrix: ScheduleMatrix,
    pub entities: EntityBinding,
    pub origin: ScheduleOrigin,
}

pub struct SyncGateway<R> {
    remote: Rc<R>,
    modes: Rc<ModeTable>,
}

impl<R> Clone for SyncGateway<R> {
    fn clone(&self) -> Self {
        Self {
            remote: Rc::clone(&self.remote),
            modes: Rc::clone(&self.modes),
        }
    }
}

impl<R: RemoteHandle> SyncGateway<R> {
    pub fn new(remote: Rc<R>, modes: Rc<ModeTable>) -> Self {
        Self { remote, modes }
    }

    pub fn modes(&self) -> &ModeTable {
        &self.modes
    }

    pub async fn fetch(&self, schedule_id: &str) -> Result<LoadedSchedule, SyncError> {
        let record = self.remote.schedule_fetch(schedule_id).await?;
        let (matrix, entities) = self.decode(record)?;
        Ok(LoadedSchedule {
            matrix,
            entities,
            origin: ScheduleOrigin::Remote,
        })
    }

    /// Fetch, replacing a missing or corrupt record with the default
    /// schedule. Transport and rejection errors are still returned.
    pub async fn fetch_or_default(&self, schedule_id: &str) -> Result<LoadedSchedule, SyncError> {
        match self.fetch(schedule_id).await {
            Ok(loaded) => {
                log::info!("Loaded schedule '{}' from remote", schedule_id);
                Ok(loaded)
            }
            Err(err) if err.falls_back_to_default() => {
                log::warn!("Using default schedule for '{}': {}", schedule_id, err);
                Ok(self.default_schedule())
            }
            Err(err) => Err(err),
        }
    }

    /// Send the full committed snapshot. Pending proposals are not sent.
    pub async fn push(
        &self,
        schedule_id: &str,
        matrix: &ScheduleMatrix,
        entities: &EntityBinding,
    ) -> Result<(), SyncError> {
        let record = Self::encode(matrix, entities);
        self.remote.schedule_update(schedule_id, &record).await?;
        log::info!("Pushed schedule '{}'", schedule_id);
        Ok(())
    }

    pub fn decode(
        &self,
        record: ScheduleRecord,
    ) -> Result<(ScheduleMatrix, EntityBinding), SyncError> {
        if !record.has_grid_shape() {
            return Err(SyncError::Malformed(format!(
                "expected 7x48 grid, got {} rows",
                record.schedule.len()
            )));
        }

        let mut rows = Vec::with_capacity(record.schedule.len());
        for row in record.schedule {
            let mut modes = Vec::with_capacity(row.len());
            for entry in row {
                if !self.modes.contains(&entry.committed) {
                    return Err(SyncError::Malformed(format!(
                        "unknown mode '{}'",
                        entry.committed
                    )));
                }
                modes.push(entry.committed);
            }
            rows.push(modes);
        }

        let matrix =
            ScheduleMatrix::from_rows(rows).map_err(|err| SyncError::Malformed(err.to_string()))?;
        Ok((matrix, EntityBinding::from(record.entities)))
    }

    pub fn encode(matrix: &ScheduleMatrix, entities: &EntityBinding) -> ScheduleRecord {
        ScheduleRecord {
            schedule: matrix
                .committed_rows()
                .into_iter()
                .map(|row| row.into_iter().map(ModeEntry::new).collect())
                .collect(),
            entities: entities.to_vec(),
        }
    }

    pub fn default_schedule(&self) -> LoadedSchedule {
        LoadedSchedule {
            matrix: ScheduleMatrix::filled(self.fill_mode()),
            entities: EntityBinding::new(),
            origin: ScheduleOrigin::Default,
        }
    }

    fn fill_mode(&self) -> &ModeId {
        self.modes.fill_mode()
    }
}
