// Test fixtures - reusable test data
// Provides schedules, sinks and remotes shared across integration tests

#![allow(dead_code)]

use std::cell::{Cell, RefCell};

use schedule_grid::models::mode::ModeId;
use schedule_grid::models::schedule::{DAYS_PER_WEEK, HALF_HOURS_PER_DAY};
use schedule_grid::services::editor::{RenderFrame, RenderSink};
use schedule_grid::services::notice::{Notice, NoticeLevel};
use schedule_grid::services::sync::wire::{ModeEntry, ScheduleRecord};
use schedule_grid::services::sync::{RemoteHandle, SqliteScheduleStore, SyncError};

/// Sample stored schedules
pub mod records {
    use super::*;

    /// Every slot in one mode
    pub fn uniform(mode: &str, entities: &[&str]) -> ScheduleRecord {
        ScheduleRecord {
            schedule: vec![
                vec![ModeEntry::new(ModeId::from(mode)); HALF_HOURS_PER_DAY];
                DAYS_PER_WEEK
            ],
            entities: entities.iter().map(|e| e.to_string()).collect(),
        }
    }

    /// Eco, with comfort evenings (18:00-21:59) every day
    pub fn comfort_evenings() -> ScheduleRecord {
        let mut record = uniform("eco", &["climate.salon"]);
        for row in &mut record.schedule {
            for entry in &mut row[36..44] {
                entry.committed = ModeId::from("comfort");
            }
        }
        record
    }
}

/// Sink that keeps every frame and notice it receives.
#[derive(Default)]
pub struct RecordingSink {
    pub frames: RefCell<Vec<RenderFrame>>,
    pub notices: RefCell<Vec<Notice>>,
}

impl RecordingSink {
    pub fn last_frame(&self) -> Option<RenderFrame> {
        self.frames.borrow().last().cloned()
    }

    pub fn notice_levels(&self) -> Vec<NoticeLevel> {
        self.notices.borrow().iter().map(|n| n.level).collect()
    }
}

impl RenderSink for RecordingSink {
    fn render(&self, frame: &RenderFrame) {
        self.frames.borrow_mut().push(frame.clone());
    }

    fn notify(&self, notice: &Notice) {
        self.notices.borrow_mut().push(notice.clone());
    }
}

/// Local store that can be told to refuse updates or drop off the network.
pub struct FlakyRemote {
    pub store: SqliteScheduleStore,
    pub reject_updates: Cell<bool>,
    pub offline: Cell<bool>,
}

impl FlakyRemote {
    pub fn new(store: SqliteScheduleStore) -> Self {
        Self {
            store,
            reject_updates: Cell::new(false),
            offline: Cell::new(false),
        }
    }
}

impl RemoteHandle for FlakyRemote {
    async fn schedule_fetch(&self, schedule_id: &str) -> Result<ScheduleRecord, SyncError> {
        if self.offline.get() {
            return Err(SyncError::Transport("connection refused".to_string()));
        }
        self.store.schedule_fetch(schedule_id).await
    }

    async fn schedule_update(
        &self,
        schedule_id: &str,
        record: &ScheduleRecord,
    ) -> Result<(), SyncError> {
        if self.offline.get() {
            return Err(SyncError::Transport("connection refused".to_string()));
        }
        if self.reject_updates.get() {
            return Err(SyncError::Rejected("schedule is read-only".to_string()));
        }
        self.store.schedule_update(schedule_id, record).await
    }
}
