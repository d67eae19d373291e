// libs/appointment-cell/src/services/schedule.rs
use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::debug;
use uuid::Uuid;

use crate::models::{
    Appointment, AppointmentError, BlockedSlot, ClockTime, DayRowView, DaySummary, DayView,
    ScheduleRow, SlotStatus,
};
use crate::services::consistency;
use crate::services::slot_grid::build_schedule_rows;
use crate::services::temporal::{add_days, is_closed};

/// Authoritative appointment and block collections. Every view is recomputed
/// from these two vectors on demand.
#[derive(Debug, Clone, Default)]
pub struct ScheduleState {
    appointments: Vec<Appointment>,
    blocked_slots: Vec<BlockedSlot>,
}

impl ScheduleState {
    /// Builds state from an injected snapshot, refusing one that already breaks
    /// slot uniqueness or booked/blocked exclusion.
    pub fn new(
        appointments: Vec<Appointment>,
        blocked_slots: Vec<BlockedSlot>,
    ) -> Result<Self, AppointmentError> {
        let violations = consistency::find_violations(&appointments, &blocked_slots);
        if let Some(first) = violations.first() {
            return Err(AppointmentError::InconsistentSnapshot(format!(
                "{} ({} violation(s) total)",
                first,
                violations.len()
            )));
        }

        Ok(Self {
            appointments,
            blocked_slots,
        })
    }

    pub fn appointments(&self) -> &[Appointment] {
        &self.appointments
    }

    pub fn blocked_slots(&self) -> &[BlockedSlot] {
        &self.blocked_slots
    }

    pub fn appointment(&self, appointment_id: Uuid) -> Option<&Appointment> {
        self.appointments.iter().find(|a| a.id == appointment_id)
    }

    pub fn blocked_slot(&self, blocked_slot_id: Uuid) -> Option<&BlockedSlot> {
        self.blocked_slots.iter().find(|b| b.id == blocked_slot_id)
    }

    /// Appointments for `(date, doctor_id)` in time order.
    pub fn appointments_on(&self, date: NaiveDate, doctor_id: Uuid) -> Vec<&Appointment> {
        let mut day: Vec<&Appointment> = self
            .appointments
            .iter()
            .filter(|a| a.date == date && a.doctor_id == doctor_id)
            .collect();
        day.sort_by_key(|a| a.time);
        day
    }

    pub fn blocked_on(&self, date: NaiveDate, doctor_id: Uuid) -> Vec<&BlockedSlot> {
        let mut day: Vec<&BlockedSlot> = self
            .blocked_slots
            .iter()
            .filter(|b| b.date == date && b.doctor_id == doctor_id)
            .collect();
        day.sort_by_key(|b| b.time);
        day
    }

    pub fn blocked_count(&self, date: NaiveDate, doctor_id: Uuid) -> usize {
        self.blocked_slots
            .iter()
            .filter(|b| b.date == date && b.doctor_id == doctor_id)
            .count()
    }

    pub fn blocked_at(&self, date: NaiveDate, doctor_id: Uuid, time: ClockTime) -> Option<&BlockedSlot> {
        self.blocked_slots
            .iter()
            .find(|b| b.date == date && b.doctor_id == doctor_id && b.time == time)
    }

    pub fn is_blocked(&self, date: NaiveDate, doctor_id: Uuid, time: ClockTime) -> bool {
        self.blocked_at(date, doctor_id, time).is_some()
    }

    pub fn appointment_at(&self, date: NaiveDate, doctor_id: Uuid, time: ClockTime) -> Option<&Appointment> {
        self.appointments
            .iter()
            .find(|a| a.date == date && a.doctor_id == doctor_id && a.time == time)
    }

    pub fn patient_appointment_on(
        &self,
        date: NaiveDate,
        doctor_id: Uuid,
        patient_id: Uuid,
    ) -> Option<&Appointment> {
        self.appointments
            .iter()
            .find(|a| a.date == date && a.doctor_id == doctor_id && a.patient_id == patient_id)
    }

    pub fn unique_patient_count(&self, date: NaiveDate, doctor_id: Uuid) -> usize {
        self.appointments
            .iter()
            .filter(|a| a.date == date && a.doctor_id == doctor_id)
            .map(|a| a.patient_id)
            .collect::<HashSet<_>>()
            .len()
    }

    /// For any day but today the first appointment of the day; for today the
    /// first one not yet started, falling back to the first of the day.
    pub fn next_appointment(
        &self,
        date: NaiveDate,
        doctor_id: Uuid,
        today: NaiveDate,
        now: ClockTime,
    ) -> Option<&Appointment> {
        let day = self.appointments_on(date, doctor_id);
        let first = day.first().copied();

        if date != today {
            return first;
        }

        day.iter().find(|a| a.time >= now).copied().or(first)
    }

    pub fn week_summary(&self, start: NaiveDate, doctor_id: Uuid) -> Vec<DaySummary> {
        (0..7)
            .map(|offset| {
                let date = add_days(start, offset);
                DaySummary {
                    date,
                    appointment_count: self
                        .appointments
                        .iter()
                        .filter(|a| a.date == date && a.doctor_id == doctor_id)
                        .count(),
                    unique_patient_count: self.unique_patient_count(date, doctor_id),
                }
            })
            .collect()
    }

    /// All of a patient's appointments across days and doctors, ordered by date then time.
    pub fn patient_agenda(&self, patient_id: Uuid) -> Vec<&Appointment> {
        let mut agenda: Vec<&Appointment> = self
            .appointments
            .iter()
            .filter(|a| a.patient_id == patient_id)
            .collect();
        agenda.sort_by_key(|a| (a.date, a.time));
        agenda
    }

    pub fn slot_status(&self, date: NaiveDate, doctor_id: Uuid, time: ClockTime, today: NaiveDate) -> SlotStatus {
        if is_closed(date, today) {
            SlotStatus::Closed
        } else if self.is_blocked(date, doctor_id, time) {
            SlotStatus::Blocked
        } else if self.appointment_at(date, doctor_id, time).is_some() {
            SlotStatus::Booked
        } else {
            SlotStatus::Empty
        }
    }

    pub fn day_view(&self, date: NaiveDate, doctor_id: Uuid, today: NaiveDate, now: ClockTime) -> DayView {
        debug!("Building day view for doctor {} on {}", doctor_id, date);

        let rows = build_schedule_rows()
            .into_iter()
            .map(|row| match row {
                ScheduleRow::Break { .. } => DayRowView {
                    row,
                    status: SlotStatus::Break,
                    appointment_id: None,
                    blocked_slot_id: None,
                },
                ScheduleRow::Slot { start, .. } => DayRowView {
                    status: self.slot_status(date, doctor_id, start, today),
                    appointment_id: self.appointment_at(date, doctor_id, start).map(|a| a.id),
                    blocked_slot_id: self.blocked_at(date, doctor_id, start).map(|b| b.id),
                    row,
                },
            })
            .collect();

        DayView {
            date,
            doctor_id,
            closed: is_closed(date, today),
            rows,
            appointments: self.appointments_on(date, doctor_id).into_iter().cloned().collect(),
            blocked_slots: self.blocked_on(date, doctor_id).into_iter().cloned().collect(),
            blocked_count: self.blocked_count(date, doctor_id),
            unique_patient_count: self.unique_patient_count(date, doctor_id),
            next_appointment: self.next_appointment(date, doctor_id, today, now).cloned(),
        }
    }

    // ==============================================================================
    // MUTATION PRIMITIVES (engine only)
    // ==============================================================================

    pub(crate) fn insert_appointment(&mut self, appointment: Appointment) {
        self.appointments.push(appointment);
    }

    pub(crate) fn remove_appointment(&mut self, appointment_id: Uuid) -> Option<Appointment> {
        let index = self.appointments.iter().position(|a| a.id == appointment_id)?;
        Some(self.appointments.remove(index))
    }

    pub(crate) fn set_time(&mut self, appointment_id: Uuid, time: ClockTime) {
        if let Some(appointment) = self.appointments.iter_mut().find(|a| a.id == appointment_id) {
            appointment.time = time;
        }
    }

    pub(crate) fn insert_block(&mut self, blocked_slot: BlockedSlot) {
        self.blocked_slots.push(blocked_slot);
    }

    pub(crate) fn remove_block(&mut self, blocked_slot_id: Uuid) -> Option<BlockedSlot> {
        let index = self.blocked_slots.iter().position(|b| b.id == blocked_slot_id)?;
        Some(self.blocked_slots.remove(index))
    }
}
