// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{
    ActiveView, Appointment, AppointmentError, BlockToggle, BlockedSlot, ClockTime, MoveOutcome,
};
use crate::services::consistency::assert_consistent;
use crate::services::schedule::ScheduleState;
use crate::services::slot_grid::is_bookable;
use crate::services::temporal::{is_closed, Clock};

pub const DEFAULT_BOOKING_REASON: &str = "Appointment";
pub const DEFAULT_BLOCK_REASON: &str = "Busy";

/// Applies booking, cancellation, blocking and move/swap commands to a
/// schedule. Each command validates against the current state and then either
/// commits in full or returns a rejection with the state untouched.
///
/// The engine is single-writer: hosts must serialize `&mut self` calls.
pub struct SchedulingEngine {
    state: ScheduleState,
    clock: Arc<dyn Clock>,
}

impl SchedulingEngine {
    pub fn new(state: ScheduleState, clock: Arc<dyn Clock>) -> Self {
        Self { state, clock }
    }

    pub fn state(&self) -> &ScheduleState {
        &self.state
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    fn ensure_open(&self, date: NaiveDate) -> Result<(), AppointmentError> {
        if is_closed(date, self.today()) {
            warn!("Rejected mutation on closed day {}", date);
            return Err(AppointmentError::DayClosed(date));
        }
        Ok(())
    }

    fn ensure_on_grid(time: ClockTime) -> Result<(), AppointmentError> {
        if !is_bookable(time) {
            warn!("Rejected off-grid slot {}", time);
            return Err(AppointmentError::OutsideWorkingHours(time));
        }
        Ok(())
    }

    /// Creates an appointment in an open, unblocked, unoccupied slot. A patient
    /// holds at most one appointment per doctor per day.
    pub fn book(
        &mut self,
        date: NaiveDate,
        doctor_id: Uuid,
        time: ClockTime,
        patient_id: Uuid,
        reason: Option<&str>,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Booking {} {} for patient {} with doctor {}", date, time, patient_id, doctor_id);

        self.ensure_open(date)?;
        Self::ensure_on_grid(time)?;

        if self.state.is_blocked(date, doctor_id, time) {
            warn!("Booking rejected: {} {} is blocked", date, time);
            return Err(AppointmentError::SlotBlocked { date, time });
        }

        if self.state.appointment_at(date, doctor_id, time).is_some() {
            warn!("Booking rejected: {} {} is occupied", date, time);
            return Err(AppointmentError::SlotOccupied { date, time });
        }

        if let Some(existing) = self.state.patient_appointment_on(date, doctor_id, patient_id) {
            warn!(
                "Booking rejected: patient {} already holds {} at {}",
                patient_id, existing.id, existing.time
            );
            return Err(AppointmentError::DuplicateBookingSameDay { patient_id, date });
        }

        let appointment = Appointment {
            id: Uuid::new_v4(),
            date,
            time,
            doctor_id,
            patient_id,
            reason: Some(reason_or_default(reason, DEFAULT_BOOKING_REASON)),
        };

        self.state.insert_appointment(appointment.clone());
        assert_consistent(&self.state);

        info!("Appointment {} booked at {} {}", appointment.id, date, time);
        Ok(appointment)
    }

    pub fn cancel(&mut self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let removed = self
            .state
            .remove_appointment(appointment_id)
            .ok_or_else(|| AppointmentError::NotFound(format!("appointment {}", appointment_id)))?;

        info!("Appointment {} cancelled ({} {})", removed.id, removed.date, removed.time);
        Ok(removed)
    }

    /// Blocks an open slot, or unblocks it when it is already blocked. An
    /// occupied slot must be vacated first.
    pub fn block(
        &mut self,
        date: NaiveDate,
        doctor_id: Uuid,
        time: ClockTime,
        reason: Option<&str>,
    ) -> Result<BlockToggle, AppointmentError> {
        self.ensure_open(date)?;
        Self::ensure_on_grid(time)?;

        if let Some(existing_id) = self.state.blocked_at(date, doctor_id, time).map(|b| b.id) {
            let removed = self.remove_block(existing_id)?;
            return Ok(BlockToggle::Unblocked(removed));
        }

        if self.state.appointment_at(date, doctor_id, time).is_some() {
            warn!("Block rejected: {} {} is occupied", date, time);
            return Err(AppointmentError::SlotOccupied { date, time });
        }

        let blocked_slot = BlockedSlot {
            id: Uuid::new_v4(),
            date,
            doctor_id,
            time,
            reason: Some(reason_or_default(reason, DEFAULT_BLOCK_REASON)),
        };

        self.state.insert_block(blocked_slot.clone());
        assert_consistent(&self.state);

        info!("Slot {} {} blocked for doctor {}", date, time, doctor_id);
        Ok(BlockToggle::Blocked(blocked_slot))
    }

    pub fn unblock(&mut self, blocked_slot_id: Uuid) -> Result<BlockedSlot, AppointmentError> {
        let date = self
            .state
            .blocked_slot(blocked_slot_id)
            .map(|b| b.date)
            .ok_or_else(|| AppointmentError::NotFound(format!("blocked slot {}", blocked_slot_id)))?;

        self.ensure_open(date)?;
        self.remove_block(blocked_slot_id)
    }

    fn remove_block(&mut self, blocked_slot_id: Uuid) -> Result<BlockedSlot, AppointmentError> {
        let removed = self
            .state
            .remove_block(blocked_slot_id)
            .ok_or_else(|| AppointmentError::NotFound(format!("blocked slot {}", blocked_slot_id)))?;

        info!("Slot {} {} unblocked", removed.date, removed.time);
        Ok(removed)
    }

    /// Drops an appointment onto `target` within the caller's active view:
    /// onto an empty slot it relocates, onto an occupied slot the two
    /// appointments exchange times.
    pub fn move_or_swap(
        &mut self,
        appointment_id: Uuid,
        target: ClockTime,
        view: ActiveView,
    ) -> Result<MoveOutcome, AppointmentError> {
        let source = self
            .state
            .appointment(appointment_id)
            .cloned()
            .ok_or_else(|| AppointmentError::NotFound(format!("appointment {}", appointment_id)))?;

        self.ensure_open(view.date)?;

        if source.date != view.date || source.doctor_id != view.doctor_id {
            warn!("Move rejected: appointment {} is outside the active view", source.id);
            return Err(AppointmentError::CrossContextMove);
        }

        // Blocks can change between render and drop, so this is evaluated at call time.
        if is_closed(source.date, self.today())
            || !is_bookable(target)
            || self.state.is_blocked(source.date, source.doctor_id, target)
        {
            warn!("Move rejected: {} is not a valid drop target", target);
            return Err(AppointmentError::InvalidTarget(target));
        }

        if target == source.time {
            debug!("Appointment {} dropped onto its own slot", source.id);
            return Ok(MoveOutcome::Unchanged);
        }

        let occupant = self
            .state
            .appointment_at(source.date, source.doctor_id, target)
            .map(|a| a.id);

        let outcome = match occupant {
            None => {
                self.state.set_time(source.id, target);
                info!("Appointment {} moved {} -> {}", source.id, source.time, target);
                MoveOutcome::Moved {
                    from: source.time,
                    to: target,
                }
            }
            Some(occupant_id) => {
                if self.state.is_blocked(source.date, source.doctor_id, source.time) {
                    warn!("Swap rejected: source slot {} is blocked", source.time);
                    return Err(AppointmentError::SourceBlocked(source.time));
                }

                self.state.set_time(source.id, target);
                self.state.set_time(occupant_id, source.time);
                info!(
                    "Appointments {} and {} swapped {} <-> {}",
                    source.id, occupant_id, source.time, target
                );
                MoveOutcome::Swapped {
                    with_appointment_id: occupant_id,
                    from: source.time,
                    to: target,
                }
            }
        };

        assert_consistent(&self.state);
        Ok(outcome)
    }
}

fn reason_or_default(reason: Option<&str>, default: &str) -> String {
    reason
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or(default)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::temporal::{parse_iso_date, FixedClock};

    fn monday() -> NaiveDate {
        parse_iso_date("2026-10-19").unwrap()
    }

    fn time(hhmm: &str) -> ClockTime {
        hhmm.parse().unwrap()
    }

    fn engine() -> SchedulingEngine {
        let clock = Arc::new(FixedClock::at(monday(), time("08:30")));
        SchedulingEngine::new(ScheduleState::default(), clock)
    }

    #[test]
    fn blank_reasons_fall_back_to_defaults() {
        assert_eq!(reason_or_default(Some("  "), DEFAULT_BLOCK_REASON), "Busy");
        assert_eq!(reason_or_default(None, DEFAULT_BOOKING_REASON), "Appointment");
        assert_eq!(reason_or_default(Some(" Lunch "), DEFAULT_BLOCK_REASON), "Lunch");
    }

    #[test]
    fn swap_out_of_a_blocked_origin_is_refused() {
        let mut engine = engine();
        let doctor = Uuid::new_v4();
        let a1 = engine.book(monday(), doctor, time("10:00"), Uuid::new_v4(), None).unwrap();
        let a2 = engine.book(monday(), doctor, time("10:30"), Uuid::new_v4(), None).unwrap();

        // Commands never leave a booked slot blocked; force one to reach the guard.
        engine.state.insert_block(BlockedSlot {
            id: Uuid::new_v4(),
            date: monday(),
            doctor_id: doctor,
            time: a1.time,
            reason: None,
        });

        let view = ActiveView {
            date: monday(),
            doctor_id: doctor,
        };
        let result = engine.move_or_swap(a1.id, a2.time, view);

        assert_eq!(result, Err(AppointmentError::SourceBlocked(time("10:00"))));
        assert_eq!(engine.state().appointment(a1.id).unwrap().time, time("10:00"));
        assert_eq!(engine.state().appointment(a2.id).unwrap().time, time("10:30"));
    }

    #[test]
    fn plain_move_ignores_origin_block_check() {
        let mut engine = engine();
        let doctor = Uuid::new_v4();
        let a1 = engine.book(monday(), doctor, time("10:00"), Uuid::new_v4(), None).unwrap();

        let view = ActiveView {
            date: monday(),
            doctor_id: doctor,
        };
        let outcome = engine.move_or_swap(a1.id, time("14:00"), view).unwrap();

        assert_eq!(
            outcome,
            MoveOutcome::Moved {
                from: time("10:00"),
                to: time("14:00")
            }
        );
    }
}
