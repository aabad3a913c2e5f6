//! The weekly 7×48 grid of slot states.
//!
//! Each slot carries the committed mode and, while a range selection is
//! being previewed, an optional pending mode. The matrix only knows how to
//! read and write cells; the selection workflow lives in
//! `services::selection`.

use std::ops::RangeInclusive;

use thiserror::Error;

use crate::models::mode::ModeId;

pub const DAYS_PER_WEEK: usize = 7;
pub const HALF_HOURS_PER_DAY: usize = 48;
pub const SLOTS_PER_WEEK: usize = DAYS_PER_WEEK * HALF_HOURS_PER_DAY;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("slot ({day}, {half_hour}) is outside the 7x48 schedule grid")]
    OutOfRange { day: usize, half_hour: usize },
    #[error("unknown mode '{0}'")]
    UnknownMode(String),
    #[error("schedule grid must be 7x48, got {0}")]
    Dimensions(String),
}

/// A validated `(day, half_hour)` position in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotCoord {
    day: usize,
    half_hour: usize,
}

impl SlotCoord {
    pub fn new(day: usize, half_hour: usize) -> Result<Self, ScheduleError> {
        if day >= DAYS_PER_WEEK || half_hour >= HALF_HOURS_PER_DAY {
            return Err(ScheduleError::OutOfRange { day, half_hour });
        }
        Ok(Self { day, half_hour })
    }

    pub fn day(&self) -> usize {
        self.day
    }

    pub fn half_hour(&self) -> usize {
        self.half_hour
    }

    fn index(&self) -> usize {
        self.day * HALF_HOURS_PER_DAY + self.half_hour
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub committed: ModeId,
    pub pending: Option<ModeId>,
}

impl Slot {
    fn new(mode: ModeId) -> Self {
        Self {
            committed: mode,
            pending: None,
        }
    }

    /// Mode to display: the pending proposal if any, else the committed mode.
    pub fn effective(&self) -> &ModeId {
        self.pending.as_ref().unwrap_or(&self.committed)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// Inclusive rectangle spanned by two corners, normalized per axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionRect {
    pub days: RangeInclusive<usize>,
    pub half_hours: RangeInclusive<usize>,
}

impl SelectionRect {
    pub fn spanning(a: SlotCoord, b: SlotCoord) -> Self {
        Self {
            days: a.day.min(b.day)..=a.day.max(b.day),
            half_hours: a.half_hour.min(b.half_hour)..=a.half_hour.max(b.half_hour),
        }
    }

    pub fn contains(&self, coord: SlotCoord) -> bool {
        self.days.contains(&coord.day) && self.half_hours.contains(&coord.half_hour)
    }

    pub fn cell_count(&self) -> usize {
        (self.days.end() - self.days.start() + 1)
            * (self.half_hours.end() - self.half_hours.start() + 1)
    }

    pub fn coords(&self) -> impl Iterator<Item = SlotCoord> + '_ {
        self.days.clone().flat_map(move |day| {
            self.half_hours
                .clone()
                .map(move |half_hour| SlotCoord { day, half_hour })
        })
    }
}

/// Owned 7×48 grid. Every slot always has a committed mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleMatrix {
    slots: Vec<Slot>,
}

impl ScheduleMatrix {
    /// A matrix with every slot committed to `mode` and nothing pending.
    pub fn filled(mode: &ModeId) -> Self {
        Self {
            slots: vec![Slot::new(mode.clone()); SLOTS_PER_WEEK],
        }
    }

    /// Build a matrix from committed modes, one row of 48 per day.
    pub fn from_rows(rows: Vec<Vec<ModeId>>) -> Result<Self, ScheduleError> {
        if rows.len() != DAYS_PER_WEEK {
            return Err(ScheduleError::Dimensions(format!("{} days", rows.len())));
        }

        let mut slots = Vec::with_capacity(SLOTS_PER_WEEK);
        for (day, row) in rows.into_iter().enumerate() {
            if row.len() != HALF_HOURS_PER_DAY {
                return Err(ScheduleError::Dimensions(format!(
                    "{} slots on day {}",
                    row.len(),
                    day
                )));
            }
            slots.extend(row.into_iter().map(Slot::new));
        }

        Ok(Self { slots })
    }

    pub fn get(&self, day: usize, half_hour: usize) -> Result<&Slot, ScheduleError> {
        let coord = SlotCoord::new(day, half_hour)?;
        Ok(self.slot(coord))
    }

    pub fn slot(&self, coord: SlotCoord) -> &Slot {
        &self.slots[coord.index()]
    }

    /// Commit `mode` on a single cell and drop any pending proposal there.
    pub fn set_committed(&mut self, coord: SlotCoord, mode: &ModeId) {
        let slot = &mut self.slots[coord.index()];
        slot.committed = mode.clone();
        slot.pending = None;
    }

    /// Mark every cell of the rectangle spanned by `a` and `b` as pending
    /// `mode`. Returns the rectangle that was written.
    pub fn set_range_pending(
        &mut self,
        a: SlotCoord,
        b: SlotCoord,
        mode: &ModeId,
    ) -> SelectionRect {
        let rect = SelectionRect::spanning(a, b);
        for coord in rect.coords() {
            self.slots[coord.index()].pending = Some(mode.clone());
        }
        rect
    }

    pub fn clear_all_pending(&mut self) {
        for slot in &mut self.slots {
            slot.pending = None;
        }
    }

    /// Fold every pending proposal into the committed mode. Returns how many
    /// cells were committed; a second call with nothing pending returns 0.
    pub fn commit_pending(&mut self) -> usize {
        let mut committed = 0;
        for slot in &mut self.slots {
            if let Some(mode) = slot.pending.take() {
                slot.committed = mode;
                committed += 1;
            }
        }
        committed
    }

    pub fn pending_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_pending()).count()
    }

    /// Owned copy for render and sync consumers.
    pub fn snapshot(&self) -> ScheduleMatrix {
        self.clone()
    }

    pub fn replace(&mut self, snapshot: ScheduleMatrix) {
        *self = snapshot;
    }

    /// Rows of slots, one per day.
    pub fn rows(&self) -> impl Iterator<Item = &[Slot]> {
        self.slots.chunks(HALF_HOURS_PER_DAY)
    }

    /// Committed modes, one row of 48 per day.
    pub fn committed_rows(&self) -> Vec<Vec<ModeId>> {
        self.rows()
            .map(|row| row.iter().map(|slot| slot.committed.clone()).collect())
            .collect()
    }
}
