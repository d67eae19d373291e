// libs/appointment-cell/src/services/slot_grid.rs
use crate::models::{ClockTime, ScheduleRow};

pub const SLOT_MINUTES: u16 = 30;

const MORNING_FIRST: ClockTime = ClockTime::hm(9, 0);
const MORNING_LAST: ClockTime = ClockTime::hm(12, 30);
const BREAK_START: ClockTime = ClockTime::hm(13, 0);
const BREAK_END: ClockTime = ClockTime::hm(14, 0);
const AFTERNOON_FIRST: ClockTime = ClockTime::hm(14, 0);
const AFTERNOON_LAST: ClockTime = ClockTime::hm(16, 30);

fn push_slots(rows: &mut Vec<ScheduleRow>, first: ClockTime, last: ClockTime) {
    let mut start = first;
    while start <= last {
        let Some(end) = start.plus_minutes(SLOT_MINUTES) else {
            break;
        };
        rows.push(ScheduleRow::Slot { start, end });
        start = end;
    }
}

/// The working day, identical for every date: morning slots, the midday break
/// and afternoon slots, in display order.
pub fn build_schedule_rows() -> Vec<ScheduleRow> {
    let mut rows = Vec::with_capacity(15);

    push_slots(&mut rows, MORNING_FIRST, MORNING_LAST);

    rows.push(ScheduleRow::Break {
        start: BREAK_START,
        end: BREAK_END,
        label: format!("Break ({}-{})", BREAK_START, BREAK_END),
    });

    push_slots(&mut rows, AFTERNOON_FIRST, AFTERNOON_LAST);

    rows
}

/// Start times that can hold an appointment or a block.
pub fn bookable_times() -> impl Iterator<Item = ClockTime> {
    build_schedule_rows()
        .into_iter()
        .filter(ScheduleRow::is_bookable)
        .map(|row| row.start())
}

pub fn is_bookable(time: ClockTime) -> bool {
    bookable_times().any(|t| t == time)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(hhmm: &str) -> ClockTime {
        hhmm.parse().unwrap()
    }

    #[test]
    fn grid_has_fourteen_slots_and_one_break() {
        let rows = build_schedule_rows();
        assert_eq!(rows.len(), 15);
        assert_eq!(rows.iter().filter(|r| r.is_bookable()).count(), 14);
        assert_eq!(rows.iter().filter(|r| !r.is_bookable()).count(), 1);
    }

    #[test]
    fn grid_order_and_bounds() {
        let rows = build_schedule_rows();
        assert_eq!(rows[0], ScheduleRow::Slot { start: t("09:00"), end: t("09:30") });
        assert_eq!(rows[7], ScheduleRow::Slot { start: t("12:30"), end: t("13:00") });
        assert!(matches!(rows[8], ScheduleRow::Break { start, end, .. } if start == t("13:00") && end == t("14:00")));
        assert_eq!(rows[9], ScheduleRow::Slot { start: t("14:00"), end: t("14:30") });
        assert_eq!(rows[14], ScheduleRow::Slot { start: t("16:30"), end: t("17:00") });
    }

    #[test]
    fn break_and_off_grid_times_are_not_bookable() {
        assert!(is_bookable(t("09:00")));
        assert!(is_bookable(t("16:30")));
        assert!(!is_bookable(t("13:00")));
        assert!(!is_bookable(t("13:30")));
        assert!(!is_bookable(t("08:30")));
        assert!(!is_bookable(t("17:00")));
        assert!(!is_bookable(t("10:15")));
    }
}
