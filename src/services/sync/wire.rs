//! JSON payloads exchanged with the `schedule_list` remote.
//!
//! A stored schedule is seven rows of 48 entries, each `{"cval": mode}`.
//! Older clients also wrote the in-progress preview as `nval`; it is
//! ignored on read and never written.

use serde::{Deserialize, Serialize};

use crate::models::mode::ModeId;
use crate::models::schedule::{DAYS_PER_WEEK, HALF_HOURS_PER_DAY};

pub const FETCH_COMMAND: &str = "schedule_list/fetch";
pub const UPDATE_COMMAND: &str = "schedule_list/update";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeEntry {
    #[serde(rename = "cval")]
    pub committed: ModeId,
}

impl ModeEntry {
    pub fn new(committed: ModeId) -> Self {
        Self { committed }
    }
}

/// The stored record: committed grid plus the devices bound to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRecord {
    pub schedule: Vec<Vec<ModeEntry>>,
    #[serde(default)]
    pub entities: Vec<String>,
}

impl ScheduleRecord {
    pub fn has_grid_shape(&self) -> bool {
        self.schedule.len() == DAYS_PER_WEEK
            && self
                .schedule
                .iter()
                .all(|row| row.len() == HALF_HOURS_PER_DAY)
    }
}

/// Reply to a fetch. The remote answers `{}` or `{"schedule": null}` for
/// unknown ids.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FetchReply {
    #[serde(default)]
    pub schedule: Option<Vec<Vec<ModeEntry>>>,
    #[serde(default)]
    pub entities: Vec<String>,
}

impl FetchReply {
    pub fn into_record(self) -> Option<ScheduleRecord> {
        let schedule = self.schedule?;
        Some(ScheduleRecord {
            schedule,
            entities: self.entities,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct FetchCommand<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub schedule_id: &'a str,
}

impl<'a> FetchCommand<'a> {
    pub fn new(schedule_id: &'a str) -> Self {
        Self {
            kind: FETCH_COMMAND,
            schedule_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UpdateCommand<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub schedule_id: &'a str,
    pub data: &'a ScheduleRecord,
}

impl<'a> UpdateCommand<'a> {
    pub fn new(schedule_id: &'a str, data: &'a ScheduleRecord) -> Self {
        Self {
            kind: UPDATE_COMMAND,
            schedule_id,
            data,
        }
    }
}
