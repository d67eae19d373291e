// libs/appointment-cell/src/services/consistency.rs
//
// Slot invariants for one schedule: one occupant per (date, doctor, time), never
// booked and blocked at once, and every occupant on the bookable grid.
//
use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::NaiveDate;
use tracing::error;
use uuid::Uuid;

use crate::models::{Appointment, BlockedSlot, ClockTime};
use crate::services::schedule::ScheduleState;
use crate::services::slot_grid::is_bookable;

type SlotKey = (NaiveDate, Uuid, ClockTime);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    DoubleBooked { key: SlotKey, appointment_ids: (Uuid, Uuid) },
    DoubleBlocked { key: SlotKey },
    BookedAndBlocked { key: SlotKey, appointment_id: Uuid, blocked_slot_id: Uuid },
    OffGrid { key: SlotKey, id: Uuid },
    DuplicateId(Uuid),
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::DoubleBooked { key: (date, doctor, time), appointment_ids: (a, b) } => {
                write!(f, "appointments {} and {} share {} {} for doctor {}", a, b, date, time, doctor)
            }
            Violation::DoubleBlocked { key: (date, doctor, time) } => {
                write!(f, "slot {} {} for doctor {} is blocked twice", date, time, doctor)
            }
            Violation::BookedAndBlocked { key: (date, doctor, time), appointment_id, blocked_slot_id } => write!(
                f,
                "appointment {} and block {} both occupy {} {} for doctor {}",
                appointment_id, blocked_slot_id, date, time, doctor
            ),
            Violation::OffGrid { key: (date, _, time), id } => {
                write!(f, "{} sits at {} {}, which is not a bookable slot", id, date, time)
            }
            Violation::DuplicateId(id) => write!(f, "identifier {} is used more than once", id),
        }
    }
}

pub fn find_violations(appointments: &[Appointment], blocked_slots: &[BlockedSlot]) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut seen_ids = HashSet::new();
    let mut booked: HashMap<SlotKey, Uuid> = HashMap::new();

    for appointment in appointments {
        let key = (appointment.date, appointment.doctor_id, appointment.time);

        if !seen_ids.insert(appointment.id) {
            violations.push(Violation::DuplicateId(appointment.id));
        }
        if !is_bookable(appointment.time) {
            violations.push(Violation::OffGrid { key, id: appointment.id });
        }
        if let Some(existing) = booked.insert(key, appointment.id) {
            violations.push(Violation::DoubleBooked {
                key,
                appointment_ids: (existing, appointment.id),
            });
        }
    }

    let mut blocked: HashSet<SlotKey> = HashSet::new();
    for slot in blocked_slots {
        let key = (slot.date, slot.doctor_id, slot.time);

        if !seen_ids.insert(slot.id) {
            violations.push(Violation::DuplicateId(slot.id));
        }
        if !is_bookable(slot.time) {
            violations.push(Violation::OffGrid { key, id: slot.id });
        }
        if !blocked.insert(key) {
            violations.push(Violation::DoubleBlocked { key });
        }
        if let Some(appointment_id) = booked.get(&key) {
            violations.push(Violation::BookedAndBlocked {
                key,
                appointment_id: *appointment_id,
                blocked_slot_id: slot.id,
            });
        }
    }

    violations
}

/// Aborts when the schedule breaks an invariant. Commands validate before they
/// mutate, so reaching the panic means a mutation bypassed those checks.
pub fn assert_consistent(state: &ScheduleState) {
    let violations = find_violations(state.appointments(), state.blocked_slots());
    if violations.is_empty() {
        return;
    }

    for violation in &violations {
        error!("Schedule invariant violated: {}", violation);
    }
    panic!(
        "schedule invariants violated: {}",
        violations
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    );
}
