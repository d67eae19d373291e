use chrono::NaiveDate;
use uuid::Uuid;

use appointment_cell::models::{Appointment, BlockedSlot, ClinicSnapshot, ClockTime, Patient};

/// Demo data for one doctor: three patients booked on `today` and one blocked slot.
pub fn demo_snapshot(doctor_id: Uuid, today: NaiveDate) -> ClinicSnapshot {
    let patients = vec![
        patient("Merve K.", "+90 532 000 11 22", Some(1991), Some("Penicillin allergy")),
        patient("Ahmet T.", "+90 533 000 33 44", Some(1984), None),
        patient("Selin Y.", "+90 534 000 55 66", None, Some("Prefers afternoon slots")),
    ];

    let bookings = [
        ((10, 0), "Follow-up"),
        ((10, 30), "Consultation"),
        ((15, 0), "Test results"),
    ];

    let appointments = patients
        .iter()
        .zip(bookings)
        .filter_map(|(patient, ((hour, minute), reason))| {
            Some(Appointment {
                id: Uuid::new_v4(),
                date: today,
                time: ClockTime::new(hour, minute)?,
                doctor_id,
                patient_id: patient.id,
                reason: Some(reason.to_string()),
            })
        })
        .collect();

    let blocked_slots = ClockTime::new(11, 0)
        .map(|time| BlockedSlot {
            id: Uuid::new_v4(),
            date: today,
            doctor_id,
            time,
            reason: Some("Meeting".to_string()),
        })
        .into_iter()
        .collect();

    ClinicSnapshot {
        patients,
        appointments,
        blocked_slots,
    }
}

fn patient(full_name: &str, phone: &str, birth_year: Option<i32>, notes: Option<&str>) -> Patient {
    Patient {
        id: Uuid::new_v4(),
        full_name: full_name.to_string(),
        phone: Some(phone.to_string()),
        birth_year,
        notes: notes.map(str::to_string),
    }
}
