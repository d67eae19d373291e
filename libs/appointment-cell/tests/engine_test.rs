use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::NaiveDate;
use uuid::Uuid;

use appointment_cell::models::*;
use appointment_cell::services::booking::SchedulingEngine;
use appointment_cell::services::consistency::find_violations;
use appointment_cell::services::schedule::ScheduleState;
use appointment_cell::services::slot_grid::bookable_times;
use appointment_cell::services::temporal::{parse_iso_date, FixedClock};

// Monday; the Saturday before is 2026-10-17.
const TODAY: &str = "2026-10-19";

fn date(iso: &str) -> NaiveDate {
    parse_iso_date(iso).unwrap()
}

fn time(hhmm: &str) -> ClockTime {
    hhmm.parse().unwrap()
}

fn engine_with(state: ScheduleState) -> SchedulingEngine {
    let clock = Arc::new(FixedClock::at(date(TODAY), time("09:00")));
    SchedulingEngine::new(state, clock)
}

fn empty_engine() -> SchedulingEngine {
    engine_with(ScheduleState::default())
}

fn appointment(on: &str, at: &str, doctor_id: Uuid) -> Appointment {
    Appointment {
        id: Uuid::new_v4(),
        date: date(on),
        time: time(at),
        doctor_id,
        patient_id: Uuid::new_v4(),
        reason: None,
    }
}

fn view(doctor_id: Uuid) -> ActiveView {
    ActiveView {
        date: date(TODAY),
        doctor_id,
    }
}

fn snapshot_of(engine: &SchedulingEngine) -> (Vec<Appointment>, Vec<BlockedSlot>) {
    (
        engine.state().appointments().to_vec(),
        engine.state().blocked_slots().to_vec(),
    )
}

// ==============================================================================
// MOVE / SWAP
// ==============================================================================

#[test]
fn move_onto_open_slot_relocates() {
    let doctor = Uuid::new_v4();
    let a1 = appointment(TODAY, "10:00", doctor);
    let mut engine = engine_with(ScheduleState::new(vec![a1.clone()], vec![]).unwrap());

    let outcome = engine.move_or_swap(a1.id, time("11:00"), view(doctor)).unwrap();

    assert_eq!(
        outcome,
        MoveOutcome::Moved {
            from: time("10:00"),
            to: time("11:00")
        }
    );
    assert_eq!(engine.state().appointment(a1.id).unwrap().time, time("11:00"));
}

#[test]
fn move_onto_occupied_slot_swaps_and_round_trips() {
    let doctor = Uuid::new_v4();
    let a1 = appointment(TODAY, "10:00", doctor);
    let a2 = appointment(TODAY, "10:30", doctor);
    let mut engine = engine_with(ScheduleState::new(vec![a1.clone(), a2.clone()], vec![]).unwrap());

    let outcome = engine.move_or_swap(a1.id, time("10:30"), view(doctor)).unwrap();
    assert_matches!(outcome, MoveOutcome::Swapped { with_appointment_id, .. } if with_appointment_id == a2.id);
    assert_eq!(engine.state().appointment(a1.id).unwrap().time, time("10:30"));
    assert_eq!(engine.state().appointment(a2.id).unwrap().time, time("10:00"));

    engine.move_or_swap(a1.id, time("10:00"), view(doctor)).unwrap();
    assert_eq!(engine.state().appointment(a1.id).unwrap().time, time("10:00"));
    assert_eq!(engine.state().appointment(a2.id).unwrap().time, time("10:30"));
}

#[test]
fn move_onto_own_slot_is_a_no_op() {
    let doctor = Uuid::new_v4();
    let a1 = appointment(TODAY, "10:00", doctor);
    let mut engine = engine_with(ScheduleState::new(vec![a1.clone()], vec![]).unwrap());
    let before = snapshot_of(&engine);

    let outcome = engine.move_or_swap(a1.id, time("10:00"), view(doctor)).unwrap();

    assert_eq!(outcome, MoveOutcome::Unchanged);
    assert_eq!(snapshot_of(&engine), before);
}

#[test]
fn move_onto_blocked_or_break_slot_is_an_invalid_target() {
    let doctor = Uuid::new_v4();
    let a1 = appointment(TODAY, "10:00", doctor);
    let mut engine = engine_with(ScheduleState::new(vec![a1.clone()], vec![]).unwrap());
    engine.block(date(TODAY), doctor, time("11:00"), None).unwrap();
    let before = snapshot_of(&engine);

    assert_eq!(
        engine.move_or_swap(a1.id, time("11:00"), view(doctor)),
        Err(AppointmentError::InvalidTarget(time("11:00")))
    );
    assert_eq!(
        engine.move_or_swap(a1.id, time("13:00"), view(doctor)),
        Err(AppointmentError::InvalidTarget(time("13:00")))
    );
    assert_eq!(snapshot_of(&engine), before);
}

#[test]
fn move_outside_the_active_view_is_refused() {
    let doctor = Uuid::new_v4();
    let a1 = appointment(TODAY, "10:00", doctor);
    let tuesday = appointment("2026-10-20", "10:00", doctor);
    let mut engine = engine_with(ScheduleState::new(vec![a1.clone(), tuesday.clone()], vec![]).unwrap());

    assert_eq!(
        engine.move_or_swap(tuesday.id, time("11:00"), view(doctor)),
        Err(AppointmentError::CrossContextMove)
    );
    assert_eq!(
        engine.move_or_swap(a1.id, time("11:00"), view(Uuid::new_v4())),
        Err(AppointmentError::CrossContextMove)
    );
}

#[test]
fn move_of_unknown_appointment_is_not_found() {
    let mut engine = empty_engine();
    assert_matches!(
        engine.move_or_swap(Uuid::new_v4(), time("10:00"), view(Uuid::new_v4())),
        Err(AppointmentError::NotFound(_))
    );
}

// ==============================================================================
// BOOK / BLOCK
// ==============================================================================

#[test]
fn booking_a_blocked_slot_is_rejected() {
    let doctor = Uuid::new_v4();
    let mut engine = empty_engine();

    let toggle = engine.block(date(TODAY), doctor, time("11:00"), None).unwrap();
    assert_matches!(toggle, BlockToggle::Blocked(ref slot) if slot.reason.as_deref() == Some("Busy"));

    assert_eq!(
        engine.book(date(TODAY), doctor, time("11:00"), Uuid::new_v4(), None),
        Err(AppointmentError::SlotBlocked {
            date: date(TODAY),
            time: time("11:00")
        })
    );
}

#[test]
fn booking_rejects_occupied_slots_and_second_same_day_visit() {
    let doctor = Uuid::new_v4();
    let patient = Uuid::new_v4();
    let mut engine = empty_engine();

    let booked = engine
        .book(date(TODAY), doctor, time("10:00"), patient, Some("Check-up"))
        .unwrap();
    assert_eq!(booked.reason.as_deref(), Some("Check-up"));

    assert_matches!(
        engine.book(date(TODAY), doctor, time("10:00"), Uuid::new_v4(), None),
        Err(AppointmentError::SlotOccupied { .. })
    );
    assert_eq!(
        engine.book(date(TODAY), doctor, time("14:00"), patient, None),
        Err(AppointmentError::DuplicateBookingSameDay {
            patient_id: patient,
            date: date(TODAY)
        })
    );

    // Another doctor, or another day, is fine.
    assert!(engine.book(date(TODAY), Uuid::new_v4(), time("14:00"), patient, None).is_ok());
    assert!(engine.book(date("2026-10-20"), doctor, time("14:00"), patient, None).is_ok());
}

#[test]
fn booking_off_the_grid_is_rejected() {
    let mut engine = empty_engine();
    for off_grid in ["08:30", "13:00", "13:30", "17:00", "10:15"] {
        assert_eq!(
            engine.book(date(TODAY), Uuid::new_v4(), time(off_grid), Uuid::new_v4(), None),
            Err(AppointmentError::OutsideWorkingHours(time(off_grid)))
        );
    }
    assert!(engine.state().appointments().is_empty());
}

#[test]
fn blocking_toggles_and_refuses_occupied_slots() {
    let doctor = Uuid::new_v4();
    let mut engine = empty_engine();
    engine.book(date(TODAY), doctor, time("10:00"), Uuid::new_v4(), None).unwrap();

    assert_matches!(
        engine.block(date(TODAY), doctor, time("10:00"), None),
        Err(AppointmentError::SlotOccupied { .. })
    );

    let blocked = engine.block(date(TODAY), doctor, time("11:00"), Some("Meeting")).unwrap();
    assert_matches!(blocked, BlockToggle::Blocked(_));
    assert_eq!(engine.state().blocked_count(date(TODAY), doctor), 1);

    let unblocked = engine.block(date(TODAY), doctor, time("11:00"), None).unwrap();
    assert_matches!(unblocked, BlockToggle::Unblocked(ref slot) if slot.reason.as_deref() == Some("Meeting"));
    assert_eq!(engine.state().blocked_count(date(TODAY), doctor), 0);
}

#[test]
fn unblock_by_id_and_unknown_ids() {
    let doctor = Uuid::new_v4();
    let mut engine = empty_engine();

    let BlockToggle::Blocked(slot) = engine.block(date(TODAY), doctor, time("15:30"), None).unwrap() else {
        panic!("expected a new block");
    };

    assert_eq!(engine.unblock(slot.id).unwrap().id, slot.id);
    assert_matches!(engine.unblock(slot.id), Err(AppointmentError::NotFound(_)));
    assert!(engine.book(date(TODAY), doctor, time("15:30"), Uuid::new_v4(), None).is_ok());
}

#[test]
fn cancel_removes_once() {
    let doctor = Uuid::new_v4();
    let mut engine = empty_engine();
    let booked = engine.book(date(TODAY), doctor, time("09:30"), Uuid::new_v4(), None).unwrap();

    assert_eq!(engine.cancel(booked.id).unwrap(), booked);
    assert_matches!(engine.cancel(booked.id), Err(AppointmentError::NotFound(_)));
    assert!(engine.state().appointment_at(date(TODAY), doctor, time("09:30")).is_none());
}

// ==============================================================================
// CLOSED DAYS
// ==============================================================================

#[test]
fn closed_days_reject_every_mutation_without_touching_state() {
    let doctor = Uuid::new_v4();
    let past = appointment("2026-10-16", "10:00", doctor);
    let past_block = BlockedSlot {
        id: Uuid::new_v4(),
        date: date("2026-10-16"),
        doctor_id: doctor,
        time: time("11:00"),
        reason: None,
    };
    let mut engine = engine_with(ScheduleState::new(vec![past.clone()], vec![past_block.clone()]).unwrap());
    let before = snapshot_of(&engine);

    for closed in ["2026-10-17", "2026-10-18", "2026-10-16", "2025-01-06"] {
        let closed = date(closed);
        assert_eq!(
            engine.book(closed, doctor, time("10:30"), Uuid::new_v4(), None),
            Err(AppointmentError::DayClosed(closed))
        );
        assert_eq!(
            engine.block(closed, doctor, time("10:30"), None),
            Err(AppointmentError::DayClosed(closed))
        );
    }

    let past_view = ActiveView {
        date: past.date,
        doctor_id: doctor,
    };
    assert_eq!(
        engine.move_or_swap(past.id, time("10:30"), past_view),
        Err(AppointmentError::DayClosed(past.date))
    );
    assert_eq!(
        engine.unblock(past_block.id),
        Err(AppointmentError::DayClosed(past_block.date))
    );

    assert_eq!(snapshot_of(&engine), before);
}

#[test]
fn cancel_is_allowed_on_past_days() {
    let past = appointment("2026-10-16", "10:00", Uuid::new_v4());
    let mut engine = engine_with(ScheduleState::new(vec![past.clone()], vec![]).unwrap());

    assert!(engine.cancel(past.id).is_ok());
}

// ==============================================================================
// INVARIANTS UNDER OPERATION SEQUENCES
// ==============================================================================

#[test]
fn no_sequence_of_commands_breaks_slot_invariants() {
    let doctors = [Uuid::new_v4(), Uuid::new_v4()];
    let patients: Vec<Uuid> = (0..6).map(|_| Uuid::new_v4()).collect();
    let days = [date(TODAY), date("2026-10-20")];
    let times: Vec<ClockTime> = bookable_times().collect();
    let mut engine = empty_engine();

    // Linear congruential sequence keeps the run deterministic.
    let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
    let mut next = |bound: usize| {
        seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
        ((seed >> 33) as usize) % bound
    };

    for _ in 0..500 {
        let doctor = doctors[next(doctors.len())];
        let day = days[next(days.len())];
        let at = times[next(times.len())];

        match next(4) {
            0 => {
                let _ = engine.book(day, doctor, at, patients[next(patients.len())], None);
            }
            1 => {
                let _ = engine.block(day, doctor, at, None);
            }
            2 => {
                let ids: Vec<Uuid> = engine.state().appointments().iter().map(|a| a.id).collect();
                if !ids.is_empty() {
                    let _ = engine.cancel(ids[next(ids.len())]);
                }
            }
            _ => {
                let candidates: Vec<Appointment> = engine.state().appointments().to_vec();
                if !candidates.is_empty() {
                    let source = &candidates[next(candidates.len())];
                    let view = ActiveView {
                        date: source.date,
                        doctor_id: source.doctor_id,
                    };
                    let _ = engine.move_or_swap(source.id, at, view);
                }
            }
        }

        assert!(find_violations(engine.state().appointments(), engine.state().blocked_slots()).is_empty());
    }
}

#[test]
fn inconsistent_snapshots_are_refused() {
    let doctor = Uuid::new_v4();
    let first = appointment(TODAY, "10:00", doctor);
    let clash = appointment(TODAY, "10:00", doctor);

    assert_matches!(
        ScheduleState::new(vec![first.clone(), clash], vec![]),
        Err(AppointmentError::InconsistentSnapshot(_))
    );

    let overlap = BlockedSlot {
        id: Uuid::new_v4(),
        date: first.date,
        doctor_id: doctor,
        time: first.time,
        reason: None,
    };
    assert_matches!(
        ScheduleState::new(vec![first], vec![overlap]),
        Err(AppointmentError::InconsistentSnapshot(_))
    );
}

// ==============================================================================
// DERIVED VIEWS
// ==============================================================================

#[test]
fn day_view_labels_rows_and_counts() {
    let doctor = Uuid::new_v4();
    let patient = Uuid::new_v4();
    let mut a1 = appointment(TODAY, "10:00", doctor);
    a1.patient_id = patient;
    let mut a2 = appointment("2026-10-20", "10:30", doctor);
    a2.patient_id = patient;
    let a3 = appointment(TODAY, "15:00", doctor);
    let mut engine = engine_with(ScheduleState::new(vec![a1.clone(), a2, a3.clone()], vec![]).unwrap());
    engine.block(date(TODAY), doctor, time("11:00"), Some("Meeting")).unwrap();

    let day = engine.state().day_view(date(TODAY), doctor, date(TODAY), time("12:00"));

    assert!(!day.closed);
    assert_eq!(day.rows.len(), 15);
    assert_eq!(day.appointments.len(), 2);
    assert_eq!(day.blocked_count, 1);
    assert_eq!(day.unique_patient_count, 2);
    assert_eq!(day.next_appointment.as_ref().map(|a| a.id), Some(a3.id));

    let status_at = |hhmm: &str| {
        day.rows
            .iter()
            .find(|r| r.row.start() == time(hhmm))
            .map(|r| r.status)
    };
    assert_eq!(status_at("10:00"), Some(SlotStatus::Booked));
    assert_eq!(status_at("11:00"), Some(SlotStatus::Blocked));
    assert_eq!(status_at("11:30"), Some(SlotStatus::Empty));
    assert_eq!(status_at("13:00"), Some(SlotStatus::Break));

    let agenda = engine.state().patient_agenda(patient);
    assert_eq!(agenda.len(), 2);
    assert_eq!(agenda[0].id, a1.id);
}

#[test]
fn weekend_day_view_is_closed_and_week_summary_spans_seven_days() {
    let doctor = Uuid::new_v4();
    let engine = engine_with(
        ScheduleState::new(
            vec![appointment(TODAY, "10:00", doctor), appointment("2026-10-21", "10:00", doctor)],
            vec![],
        )
        .unwrap(),
    );

    let saturday = engine.state().day_view(date("2026-10-24"), doctor, date(TODAY), time("09:00"));
    assert!(saturday.closed);
    assert!(saturday
        .rows
        .iter()
        .filter(|r| r.row.is_bookable())
        .all(|r| r.status == SlotStatus::Closed));

    let week = engine.state().week_summary(date(TODAY), doctor);
    assert_eq!(week.len(), 7);
    assert_eq!(week[0].appointment_count, 1);
    assert_eq!(week[1].appointment_count, 0);
    assert_eq!(week[2].appointment_count, 1);
    assert_eq!(week[6].date, date("2026-10-25"));
}

#[test]
fn next_appointment_falls_back_to_first_of_day() {
    let doctor = Uuid::new_v4();
    let first = appointment(TODAY, "09:00", doctor);
    let engine = engine_with(
        ScheduleState::new(vec![first.clone(), appointment(TODAY, "10:00", doctor)], vec![]).unwrap(),
    );

    let late = engine.state().next_appointment(date(TODAY), doctor, date(TODAY), time("16:45"));
    assert_eq!(late.map(|a| a.id), Some(first.id));
}
