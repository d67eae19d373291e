// libs/appointment-cell/src/services/proximity.rs
use chrono::NaiveDateTime;

use crate::models::Appointment;
use crate::services::temporal::minutes_until;

/// How long before the scheduled time a chat may be opened.
pub const OPENS_MINUTES_BEFORE: i64 = 120;
/// How long after the scheduled time a chat may still be opened.
pub const CLOSES_MINUTES_AFTER: i64 = 15;

/// Minutes from the instant `now` until the appointment starts, rounded to the
/// nearest minute.
pub fn minutes_to_appointment(appointment: &Appointment, now: NaiveDateTime) -> i64 {
    minutes_until(appointment.date, appointment.time, now)
}

/// True when the appointment is on `now`'s date and starts within the next two
/// hours or started at most fifteen minutes ago. Both bounds are inclusive.
pub fn can_open_channel(appointment: &Appointment, now: NaiveDateTime) -> bool {
    if appointment.date != now.date() {
        return false;
    }

    let minutes = minutes_to_appointment(appointment, now);
    (-CLOSES_MINUTES_AFTER..=OPENS_MINUTES_BEFORE).contains(&minutes)
}
