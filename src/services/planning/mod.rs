// Planning service
// Reads a committed schedule as a list of mode changes over the week

use chrono::{Duration, NaiveDateTime};

use crate::models::mode::ModeId;
use crate::models::schedule::{ScheduleMatrix, DAYS_PER_WEEK};
use crate::utils::date::{slot_for_time, slot_start, weekday_index};

/// A slot where the committed mode differs from the slot before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeTransition {
    pub day: usize,
    pub half_hour: usize,
    pub mode: ModeId,
}

/// A transition placed on the calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledChange {
    pub at: NaiveDateTime,
    pub mode: ModeId,
}

/// Compress the week into its mode changes, in slot order. The week wraps:
/// the slot before Monday 00:00 is Sunday 23:30.
pub fn transitions(matrix: &ScheduleMatrix) -> Vec<ModeTransition> {
    let rows = matrix.committed_rows();
    let Some(mut last) = rows.last().and_then(|row| row.last()).cloned() else {
        return Vec::new();
    };

    let mut changes = Vec::new();
    for (day, row) in rows.into_iter().enumerate() {
        for (half_hour, mode) in row.into_iter().enumerate() {
            if mode != last {
                last = mode.clone();
                changes.push(ModeTransition {
                    day,
                    half_hour,
                    mode,
                });
            }
        }
    }
    changes
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulePlan {
    transitions: Vec<ModeTransition>,
    /// Mode of a schedule with no transitions at all.
    steady: ModeId,
}

impl SchedulePlan {
    pub fn from_matrix(matrix: &ScheduleMatrix) -> Self {
        let rows = matrix.committed_rows();
        let steady = rows[0][0].clone();
        Self {
            transitions: transitions(matrix),
            steady,
        }
    }

    pub fn transitions(&self) -> &[ModeTransition] {
        &self.transitions
    }

    pub fn active_mode_at(&self, at: NaiveDateTime) -> &ModeId {
        let day = weekday_index(at.date());
        let half_hour = slot_for_time(at.time());

        // Latest transition at or before this slot, else the last one of
        // the week wrapping around.
        self.transitions
            .iter()
            .rev()
            .find(|t| (t.day, t.half_hour) <= (day, half_hour))
            .or_else(|| self.transitions.last())
            .map(|t| &t.mode)
            .unwrap_or(&self.steady)
    }

    /// Most recent change at or before `now`.
    pub fn last_change(&self, now: NaiveDateTime) -> Option<ScheduledChange> {
        let today = weekday_index(now.date());
        for offset in 0..=DAYS_PER_WEEK {
            let day = (today + DAYS_PER_WEEK - offset % DAYS_PER_WEEK) % DAYS_PER_WEEK;
            let date = now.date() - Duration::days(offset as i64);
            for t in self.transitions.iter().rev().filter(|t| t.day == day) {
                let Some(start) = slot_start(t.half_hour) else {
                    continue;
                };
                let at = date.and_time(start);
                if at <= now {
                    return Some(ScheduledChange {
                        at,
                        mode: t.mode.clone(),
                    });
                }
            }
        }
        None
    }

    /// Earliest change at or after `now`.
    pub fn next_change(&self, now: NaiveDateTime) -> Option<ScheduledChange> {
        let today = weekday_index(now.date());
        for offset in 0..=DAYS_PER_WEEK {
            let day = (today + offset) % DAYS_PER_WEEK;
            let date = now.date() + Duration::days(offset as i64);
            for t in self.transitions.iter().filter(|t| t.day == day) {
                let Some(start) = slot_start(t.half_hour) else {
                    continue;
                };
                let at = date.and_time(start);
                if at >= now {
                    return Some(ScheduledChange {
                        at,
                        mode: t.mode.clone(),
                    });
                }
            }
        }
        None
    }
}
