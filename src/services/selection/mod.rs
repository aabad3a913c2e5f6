//! Two-click rectangular range selection over a [`ScheduleMatrix`].
//!
//! The first click paints the clicked cell and anchors the gesture. Hovering
//! while anchored previews the rectangle between the anchor and the hovered
//! cell as pending slots. The second click folds the preview into the
//! committed modes and reports a commit, which is the only outcome the
//! caller should persist. Cancel discards the preview and puts the anchor
//! cell back to the mode it had before the first click, so an aborted
//! gesture leaves no committed trace.
//!
//! The selector holds nothing but the anchor (and the anchor cell's prior
//! mode); the mode being painted is passed in by the caller on every event.

use crate::models::mode::ModeId;
use crate::models::schedule::{ScheduleMatrix, SelectionRect, SlotCoord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionState {
    #[default]
    Idle,
    Anchored(SlotCoord),
}

/// Result of a click, telling the caller whether to persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// First click: the cell was painted and the gesture anchored on it.
    Anchored(SlotCoord),
    /// Second click: the preview was committed. `cells` counts the slots
    /// folded from pending into committed.
    Committed { anchor: SlotCoord, cells: usize },
}

#[derive(Debug, Default)]
pub struct RangeSelector {
    state: SelectionState,
    anchor_prior: Option<ModeId>,
}

impl RangeSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    pub fn anchor(&self) -> Option<SlotCoord> {
        match self.state {
            SelectionState::Idle => None,
            SelectionState::Anchored(anchor) => Some(anchor),
        }
    }

    pub fn is_active(&self) -> bool {
        self.anchor().is_some()
    }

    /// Copy of `matrix` as it stood before the gesture in progress: no
    /// pending cells and the anchor cell back on its prior mode. This is
    /// what may be persisted while a gesture is still open.
    pub fn settled_view(&self, matrix: &ScheduleMatrix) -> ScheduleMatrix {
        let mut view = matrix.snapshot();
        view.clear_all_pending();
        if let (Some(anchor), Some(prior)) = (self.anchor(), self.anchor_prior.as_ref()) {
            view.set_committed(anchor, prior);
        }
        view
    }

    pub fn click(
        &mut self,
        matrix: &mut ScheduleMatrix,
        cell: SlotCoord,
        mode: &ModeId,
    ) -> ClickOutcome {
        match self.state {
            SelectionState::Idle => {
                self.anchor_prior = Some(matrix.slot(cell).committed.clone());
                matrix.set_committed(cell, mode);
                self.state = SelectionState::Anchored(cell);
                log::debug!(
                    "selection anchored at ({}, {}) with mode {}",
                    cell.day(),
                    cell.half_hour(),
                    mode
                );
                ClickOutcome::Anchored(cell)
            }
            SelectionState::Anchored(anchor) => {
                let cells = matrix.commit_pending();
                self.state = SelectionState::Idle;
                self.anchor_prior = None;
                log::debug!("selection committed {} cells", cells);
                ClickOutcome::Committed { anchor, cells }
            }
        }
    }

    /// Preview the rectangle from the anchor to `cell`. Returns `None` and
    /// leaves the matrix untouched when no gesture is active.
    pub fn hover(
        &mut self,
        matrix: &mut ScheduleMatrix,
        cell: SlotCoord,
        mode: &ModeId,
    ) -> Option<SelectionRect> {
        let anchor = self.anchor()?;
        matrix.clear_all_pending();
        Some(matrix.set_range_pending(anchor, cell, mode))
    }

    /// Abort the gesture and drop its preview. Returns `false` if nothing
    /// was in progress.
    pub fn cancel(&mut self, matrix: &mut ScheduleMatrix) -> bool {
        let Some(anchor) = self.anchor() else {
            return false;
        };
        matrix.clear_all_pending();
        if let Some(prior) = self.anchor_prior.take() {
            matrix.set_committed(anchor, &prior);
        }
        self.state = SelectionState::Idle;
        log::debug!("selection cancelled");
        true
    }

    /// Forget the anchor without touching any matrix, for when the matrix
    /// the gesture was drawn on has been replaced wholesale.
    pub fn reset(&mut self) {
        self.state = SelectionState::Idle;
        self.anchor_prior = None;
    }
}
