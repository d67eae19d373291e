// libs/appointment-cell/src/services/clinic.rs
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{
    ActiveView, Appointment, AppointmentError, BlockToggle, BlockedSlot, BookAppointmentRequest,
    BookingReceipt, ChatCandidate, ChatMessage, ChatThread, ClinicSnapshot, ClockTime, DaySummary,
    DayView, Doctor, MediaItem, MediaUpload, MoveOutcome, Notice, NoticeLevel, Patient,
    PatientReport, ScheduleRow, Sender,
};
use crate::services::booking::SchedulingEngine;
use crate::services::chat::ChatRegistry;
use crate::services::directory::{
    InMemoryPatientDirectory, NotificationSink, PatientDirectory, TracingNotifier,
};
use crate::services::idempotency::{issue_key, BookingIntent, BookingLedger, IdempotencyKey};
use crate::services::proximity::{can_open_channel, minutes_to_appointment};
use crate::services::records::{InMemoryMediaStore, MediaStore, ReportBook};
use crate::services::schedule::ScheduleState;
use crate::services::slot_grid::build_schedule_rows;
use crate::services::temporal::Clock;

/// One doctor's clinic: the scheduling engine plus chat threads, patient
/// records and the collaborators the commands report to.
pub struct ClinicService {
    doctor: Doctor,
    engine: SchedulingEngine,
    chats: ChatRegistry,
    patients: Box<dyn PatientDirectory>,
    media: Box<dyn MediaStore>,
    reports: ReportBook,
    ledger: BookingLedger,
    notifier: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
}

impl ClinicService {
    pub fn new(doctor: Doctor, snapshot: ClinicSnapshot, clock: Arc<dyn Clock>) -> Result<Self, AppointmentError> {
        let state = ScheduleState::new(snapshot.appointments, snapshot.blocked_slots)?;

        info!(
            "Clinic for {} loaded with {} appointments and {} blocked slots",
            doctor.name,
            state.appointments().len(),
            state.blocked_slots().len()
        );

        Ok(Self {
            doctor,
            engine: SchedulingEngine::new(state, clock.clone()),
            chats: ChatRegistry::new(),
            patients: Box::new(InMemoryPatientDirectory::new(snapshot.patients)),
            media: Box::new(InMemoryMediaStore::new()),
            reports: ReportBook::new(),
            ledger: BookingLedger::new(),
            notifier: Arc::new(TracingNotifier),
            clock,
        })
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_patient_directory(mut self, patients: Box<dyn PatientDirectory>) -> Self {
        self.patients = patients;
        self
    }

    pub fn with_media_store(mut self, media: Box<dyn MediaStore>) -> Self {
        self.media = media;
        self
    }

    // ==============================================================================
    // QUERIES
    // ==============================================================================

    pub fn doctor(&self) -> &Doctor {
        &self.doctor
    }

    pub fn state(&self) -> &ScheduleState {
        self.engine.state()
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn grid(&self) -> Vec<ScheduleRow> {
        build_schedule_rows()
    }

    pub fn day_view(&self, date: NaiveDate) -> DayView {
        self.state()
            .day_view(date, self.doctor.id, self.clock.today(), self.clock.time_of_day())
    }

    pub fn week_summary(&self, start: NaiveDate) -> Vec<DaySummary> {
        self.state().week_summary(start, self.doctor.id)
    }

    pub fn next_appointment(&self, date: NaiveDate) -> Option<Appointment> {
        self.state()
            .next_appointment(date, self.doctor.id, self.clock.today(), self.clock.time_of_day())
            .cloned()
    }

    pub fn appointment(&self, appointment_id: Uuid) -> Result<&Appointment, AppointmentError> {
        self.state()
            .appointment(appointment_id)
            .ok_or_else(|| AppointmentError::NotFound(format!("appointment {}", appointment_id)))
    }

    pub fn patient(&self, patient_id: Uuid) -> Result<Patient, AppointmentError> {
        self.patients
            .get_patient(patient_id)
            .ok_or(AppointmentError::PatientNotFound(patient_id))
    }

    pub fn patient_agenda(&self, patient_id: Uuid) -> Vec<Appointment> {
        self.state().patient_agenda(patient_id).into_iter().cloned().collect()
    }

    pub fn can_open_channel(&self, appointment_id: Uuid) -> Result<bool, AppointmentError> {
        let appointment = self.appointment(appointment_id)?;
        Ok(can_open_channel(appointment, self.clock.now()))
    }

    /// Chat candidates for `date`: its appointments in time order, only when
    /// `date` is today.
    pub fn chat_candidates(&self, date: NaiveDate) -> Vec<ChatCandidate> {
        let now = self.clock.now();
        if date != now.date() {
            return Vec::new();
        }

        self.state()
            .appointments_on(date, self.doctor.id)
            .into_iter()
            .map(|appointment| ChatCandidate {
                minutes_until: minutes_to_appointment(appointment, now),
                can_open: can_open_channel(appointment, now),
                appointment: appointment.clone(),
            })
            .collect()
    }

    pub fn chat_thread(&self, appointment_id: Uuid) -> Result<ChatThread, AppointmentError> {
        self.appointment(appointment_id)?;
        Ok(self.chats.snapshot(appointment_id))
    }

    pub fn media(&self, patient_id: Uuid) -> Result<Vec<MediaItem>, AppointmentError> {
        self.patient(patient_id)?;
        Ok(self.media.list(patient_id))
    }

    pub fn reports(&self, patient_id: Uuid) -> Result<Vec<PatientReport>, AppointmentError> {
        self.patient(patient_id)?;
        Ok(self.reports.list(patient_id))
    }

    // ==============================================================================
    // COMMANDS
    // ==============================================================================

    fn report<T>(
        &self,
        result: Result<T, AppointmentError>,
        success_title: &str,
        describe: impl FnOnce(&T) -> String,
        failure_title: &str,
    ) -> Result<T, AppointmentError> {
        let notice = match &result {
            Ok(value) => Notice {
                level: NoticeLevel::Success,
                title: success_title.to_string(),
                description: describe(value),
            },
            Err(e) => Notice {
                level: NoticeLevel::Failure,
                title: failure_title.to_string(),
                description: e.to_string(),
            },
        };
        self.notifier.notify(notice);
        result
    }

    /// Books under `key`, issuing one when absent. A key that already produced
    /// a live appointment returns that appointment instead of booking again;
    /// reusing it for a different request is refused. Bookings always go to
    /// this clinic's doctor.
    pub fn book(
        &mut self,
        request: BookAppointmentRequest,
        key: Option<IdempotencyKey>,
    ) -> Result<BookingReceipt, AppointmentError> {
        let key = key.unwrap_or_else(issue_key);
        let intent = BookingIntent::from(&request);

        let replay = match self.ledger.lookup(&key, &intent) {
            Ok(Some(appointment_id)) => {
                debug!("Replaying booking for idempotency key {}", key);
                Some(self.appointment(appointment_id).cloned())
            }
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        };
        if let Some(replay) = replay {
            let receipt = replay.map(|appointment| BookingReceipt {
                appointment,
                idempotency_key: key,
                replayed: true,
            });
            return self.report(
                receipt,
                "Appointment already booked",
                |r| format!("{} {}", r.appointment.date, r.appointment.time),
                "Booking failed",
            );
        }

        let result = self
            .check_doctor(request.doctor_id)
            .and_then(|()| self.patient(request.patient_id))
            .and_then(|patient| {
                self.engine.book(
                    request.date,
                    self.doctor.id,
                    request.time,
                    patient.id,
                    request.reason.as_deref(),
                )
            });

        if let Ok(appointment) = &result {
            self.ledger.record(key, intent, appointment.id);
        }

        let receipt = result.map(|appointment| BookingReceipt {
            appointment,
            idempotency_key: key,
            replayed: false,
        });

        self.report(
            receipt,
            "Appointment booked",
            |r| format!("{} {}", r.appointment.date, r.appointment.time),
            "Booking failed",
        )
    }

    fn check_doctor(&self, doctor_id: Option<Uuid>) -> Result<(), AppointmentError> {
        match doctor_id {
            Some(id) if id != self.doctor.id => Err(AppointmentError::InvalidInput(format!(
                "doctor {} does not belong to this clinic",
                id
            ))),
            _ => Ok(()),
        }
    }

    pub fn cancel(&mut self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let result = self.engine.cancel(appointment_id);
        if result.is_ok() {
            self.chats.remove(appointment_id);
            self.ledger.forget_appointment(appointment_id);
        }

        self.report(
            result,
            "Appointment cancelled",
            |a| format!("{} {}", a.date, a.time),
            "Cancellation failed",
        )
    }

    pub fn toggle_block(
        &mut self,
        date: NaiveDate,
        time: ClockTime,
        reason: Option<&str>,
    ) -> Result<BlockToggle, AppointmentError> {
        let result = self.engine.block(date, self.doctor.id, time, reason);

        let title = match &result {
            Ok(BlockToggle::Unblocked(_)) => "Slot opened",
            _ => "Slot blocked",
        };
        self.report(
            result,
            title,
            |toggle| match toggle {
                BlockToggle::Blocked(slot) => format!(
                    "{} {} - {}",
                    slot.date,
                    slot.time,
                    slot.reason.as_deref().unwrap_or_default()
                ),
                BlockToggle::Unblocked(slot) => format!("{} {}", slot.date, slot.time),
            },
            "Slot unchanged",
        )
    }

    pub fn unblock(&mut self, blocked_slot_id: Uuid) -> Result<BlockedSlot, AppointmentError> {
        let result = self.engine.unblock(blocked_slot_id);
        self.report(
            result,
            "Slot opened",
            |slot| format!("{} {}", slot.date, slot.time),
            "Slot unchanged",
        )
    }

    /// Move or swap within the day the caller is viewing for this clinic's doctor.
    pub fn move_or_swap(
        &mut self,
        appointment_id: Uuid,
        target: ClockTime,
        view_date: NaiveDate,
    ) -> Result<MoveOutcome, AppointmentError> {
        let view = ActiveView {
            date: view_date,
            doctor_id: self.doctor.id,
        };
        let result = self.engine.move_or_swap(appointment_id, target, view);

        let title = match &result {
            Ok(MoveOutcome::Swapped { .. }) => "Appointments swapped",
            Ok(MoveOutcome::Unchanged) => "Appointment unchanged",
            _ => "Appointment moved",
        };
        self.report(
            result,
            title,
            |outcome| match outcome {
                MoveOutcome::Unchanged => format!("already at {}", target),
                MoveOutcome::Moved { from, to } => format!("{} -> {}", from, to),
                MoveOutcome::Swapped { from, to, .. } => format!("{} <-> {}", from, to),
            },
            "Cannot drop here",
        )
    }

    pub fn start_chat(&mut self, appointment_id: Uuid) -> Result<ChatThread, AppointmentError> {
        let now = self.clock.now();
        let result = match self.state().appointment(appointment_id).cloned() {
            Some(appointment) => self.chats.start(&appointment, now).cloned(),
            None => Err(AppointmentError::NotFound(format!("appointment {}", appointment_id))),
        };

        self.report(
            result,
            "Chat started",
            |thread| format!("{} message(s)", thread.messages.len()),
            "Chat could not be started",
        )
    }

    pub fn send_message(
        &mut self,
        appointment_id: Uuid,
        from: Sender,
        text: &str,
    ) -> Result<ChatMessage, AppointmentError> {
        let at = self.clock.time_of_day();
        let result = match self.appointment(appointment_id).map(|a| a.id) {
            Ok(id) => self.chats.append(id, from, text, at),
            Err(e) => Err(e),
        };

        self.report(
            result,
            "Message sent",
            |m| format!("{} at {}", m.text, m.at),
            "Start the chat first",
        )
    }

    pub fn attach_media(&mut self, patient_id: Uuid, upload: MediaUpload) -> Result<MediaItem, AppointmentError> {
        let now = self.clock.now();
        let result = self
            .patient(patient_id)
            .map(|patient| self.media.attach(patient.id, upload, now));

        self.report(
            result,
            "Media uploaded",
            |m| format!("{} ({})", m.file_name, m.size_label),
            "Upload failed",
        )
    }

    pub fn remove_media(&mut self, patient_id: Uuid, media_id: Uuid) -> Result<MediaItem, AppointmentError> {
        let result = self
            .media
            .remove(patient_id, media_id)
            .ok_or_else(|| AppointmentError::NotFound(format!("media {}", media_id)));

        self.report(result, "Media removed", |m| m.file_name.clone(), "Removal failed")
    }

    pub fn add_report(&mut self, patient_id: Uuid, title: &str, body: &str) -> Result<PatientReport, AppointmentError> {
        let now = self.clock.now();
        let result = self
            .patient(patient_id)
            .and_then(|patient| self.reports.add(patient.id, title, body, now));

        self.report(result, "Report added", |r| r.title.clone(), "Report not saved")
    }

    pub fn delete_report(&mut self, patient_id: Uuid, report_id: Uuid) -> Result<PatientReport, AppointmentError> {
        let result = self
            .reports
            .delete(patient_id, report_id)
            .ok_or_else(|| AppointmentError::NotFound(format!("report {}", report_id)));

        self.report(result, "Report deleted", |r| r.title.clone(), "Report not deleted")
    }
}
