// Property-based tests for the schedule grid and range selection
// Checks matrix and selector invariants over random cells and gestures

use proptest::prelude::*;

use schedule_grid::models::mode::ModeId;
use schedule_grid::models::schedule::{
    ScheduleMatrix, SlotCoord, DAYS_PER_WEEK, HALF_HOURS_PER_DAY,
};
use schedule_grid::services::selection::RangeSelector;

fn cell() -> impl Strategy<Value = SlotCoord> {
    (0..DAYS_PER_WEEK, 0..HALF_HOURS_PER_DAY)
        .prop_map(|(day, half_hour)| SlotCoord::new(day, half_hour).unwrap())
}

fn mode() -> impl Strategy<Value = ModeId> {
    prop_oneof![Just("eco"), Just("comfort"), Just("away")].prop_map(ModeId::from)
}

fn pending_cells(matrix: &ScheduleMatrix) -> Vec<(usize, usize)> {
    let mut cells = Vec::new();
    for day in 0..DAYS_PER_WEEK {
        for half_hour in 0..HALF_HOURS_PER_DAY {
            if matrix.get(day, half_hour).unwrap().is_pending() {
                cells.push((day, half_hour));
            }
        }
    }
    cells
}

proptest! {
    /// Property: after set_committed, get returns that mode and nothing pending
    #[test]
    fn prop_set_committed_then_get(at in cell(), preview in mode(), painted in mode()) {
        let mut matrix = ScheduleMatrix::filled(&ModeId::from("eco"));
        matrix.set_range_pending(at, at, &preview);

        matrix.set_committed(at, &painted);

        let slot = matrix.get(at.day(), at.half_hour()).unwrap();
        prop_assert_eq!(&slot.committed, &painted);
        prop_assert_eq!(&slot.pending, &None);
    }

    /// Property: the pending rectangle does not depend on drag direction
    #[test]
    fn prop_range_is_direction_independent(a in cell(), b in cell(), painted in mode()) {
        let mut forward = ScheduleMatrix::filled(&ModeId::from("eco"));
        let mut backward = forward.clone();

        let forward_rect = forward.set_range_pending(a, b, &painted);
        let backward_rect = backward.set_range_pending(b, a, &painted);

        prop_assert_eq!(forward_rect, backward_rect);
        prop_assert_eq!(pending_cells(&forward), pending_cells(&backward));
    }

    /// Property: clear_all_pending leaves no pending slot anywhere
    #[test]
    fn prop_clear_all_pending(corners in prop::collection::vec((cell(), cell()), 1..5)) {
        let mut matrix = ScheduleMatrix::filled(&ModeId::from("eco"));
        for (a, b) in corners {
            matrix.set_range_pending(a, b, &ModeId::from("away"));
        }

        matrix.clear_all_pending();

        prop_assert!(pending_cells(&matrix).is_empty());
    }

    /// Property: a preview never leaks cells from the one before it
    #[test]
    fn prop_hover_shows_only_latest_rectangle(
        anchor in cell(),
        hovers in prop::collection::vec(cell(), 1..6)
    ) {
        let mut matrix = ScheduleMatrix::filled(&ModeId::from("eco"));
        let mut selector = RangeSelector::new();
        let painted = ModeId::from("comfort");
        selector.click(&mut matrix, anchor, &painted);

        let mut last = None;
        for target in hovers {
            last = selector.hover(&mut matrix, target, &painted);
        }

        let rect = last.unwrap();
        prop_assert_eq!(matrix.pending_count(), rect.cell_count());
        for (day, half_hour) in pending_cells(&matrix) {
            prop_assert!(rect.contains(SlotCoord::new(day, half_hour).unwrap()));
        }
    }

    /// Property: cancelling any gesture restores the committed grid
    #[test]
    fn prop_cancel_restores_committed(
        anchor in cell(),
        target in cell(),
        painted in mode(),
        seeded in cell()
    ) {
        let mut matrix = ScheduleMatrix::filled(&ModeId::from("eco"));
        matrix.set_committed(seeded, &ModeId::from("away"));
        let before = matrix.snapshot();
        let mut selector = RangeSelector::new();

        selector.click(&mut matrix, anchor, &painted);
        selector.hover(&mut matrix, target, &painted);
        prop_assert!(selector.cancel(&mut matrix));

        prop_assert_eq!(matrix, before);
    }
}
