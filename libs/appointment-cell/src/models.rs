// libs/appointment-cell/src/models.rs
use std::fmt;
use std::str::FromStr;

use axum::http::StatusCode;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use uuid::Uuid;

use shared_models::error::AppError;

// ==============================================================================
// WALL-CLOCK TIME
// ==============================================================================

/// A wall-clock time of day with minute precision, written as `HH:MM`.
///
/// Ordering matches the lexicographic ordering of the zero-padded text form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime(u16);

impl ClockTime {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self((hour * 60 + minute) as u16))
        } else {
            None
        }
    }

    /// Compile-time constructor for known-good grid constants.
    pub(crate) const fn hm(hour: u16, minute: u16) -> Self {
        Self(hour * 60 + minute)
    }

    pub fn hour(&self) -> u32 {
        u32::from(self.0 / 60)
    }

    pub fn minute(&self) -> u32 {
        u32::from(self.0 % 60)
    }

    pub fn minutes_since_midnight(&self) -> u16 {
        self.0
    }

    /// Adds minutes, returning `None` past midnight.
    pub fn plus_minutes(&self, minutes: u16) -> Option<Self> {
        let total = self.0.checked_add(minutes)?;
        (total < 24 * 60).then_some(Self(total))
    }

    pub fn to_naive_time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour(), self.minute(), 0).unwrap_or(NaiveTime::MIN)
    }
}

impl From<NaiveTime> for ClockTime {
    fn from(time: NaiveTime) -> Self {
        Self((time.hour() * 60 + time.minute()) as u16)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for ClockTime {
    type Err = AppointmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AppointmentError::InvalidInput(format!("'{}' is not a HH:MM time", s));

        let (hh, mm) = s.trim().split_once(':').ok_or_else(invalid)?;
        let two_digits = |part: &str| part.len() == 2 && part.bytes().all(|b| b.is_ascii_digit());
        if !two_digits(hh) || !two_digits(mm) {
            return Err(invalid());
        }
        let hour: u32 = hh.parse().map_err(|_| invalid())?;
        let minute: u32 = mm.parse().map_err(|_| invalid())?;

        ClockTime::new(hour, minute).ok_or_else(invalid)
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ==============================================================================
// CORE ENTITIES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub full_name: String,
    pub phone: Option<String>,
    pub birth_year: Option<i32>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub date: NaiveDate,
    pub time: ClockTime,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedSlot {
    pub id: Uuid,
    pub date: NaiveDate,
    pub doctor_id: Uuid,
    pub time: ClockTime,
    pub reason: Option<String>,
}

/// The day and doctor a caller currently has on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveView {
    pub date: NaiveDate,
    pub doctor_id: Uuid,
}

/// Initial state injected into a clinic at construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClinicSnapshot {
    pub patients: Vec<Patient>,
    pub appointments: Vec<Appointment>,
    pub blocked_slots: Vec<BlockedSlot>,
}

// ==============================================================================
// GRID AND DERIVED VIEWS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScheduleRow {
    Slot { start: ClockTime, end: ClockTime },
    Break { start: ClockTime, end: ClockTime, label: String },
}

impl ScheduleRow {
    pub fn start(&self) -> ClockTime {
        match self {
            ScheduleRow::Slot { start, .. } | ScheduleRow::Break { start, .. } => *start,
        }
    }

    pub fn is_bookable(&self) -> bool {
        matches!(self, ScheduleRow::Slot { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Closed,
    Blocked,
    Booked,
    Empty,
    Break,
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotStatus::Closed => write!(f, "Closed day"),
            SlotStatus::Blocked => write!(f, "Doctor unavailable"),
            SlotStatus::Booked => write!(f, "Booked"),
            SlotStatus::Empty => write!(f, "Empty"),
            SlotStatus::Break => write!(f, "Break"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayRowView {
    pub row: ScheduleRow,
    pub status: SlotStatus,
    pub appointment_id: Option<Uuid>,
    pub blocked_slot_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayView {
    pub date: NaiveDate,
    pub doctor_id: Uuid,
    pub closed: bool,
    pub rows: Vec<DayRowView>,
    pub appointments: Vec<Appointment>,
    pub blocked_slots: Vec<BlockedSlot>,
    pub blocked_count: usize,
    pub unique_patient_count: usize,
    pub next_appointment: Option<Appointment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub appointment_count: usize,
    pub unique_patient_count: usize,
}

// ==============================================================================
// COMMAND OUTCOMES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum MoveOutcome {
    /// Target equals the current time; nothing changed.
    Unchanged,
    Moved {
        from: ClockTime,
        to: ClockTime,
    },
    Swapped {
        with_appointment_id: Uuid,
        from: ClockTime,
        to: ClockTime,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", content = "slot", rename_all = "snake_case")]
pub enum BlockToggle {
    Blocked(BlockedSlot),
    Unblocked(BlockedSlot),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingReceipt {
    pub appointment: Appointment,
    pub idempotency_key: crate::services::idempotency::IdempotencyKey,
    /// True when the key had already been used and the original booking was returned.
    pub replayed: bool,
}

// ==============================================================================
// CHAT
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    Doctor,
    Patient,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub at: ClockTime,
    pub from: Sender,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatThread {
    pub appointment_id: Uuid,
    pub started: bool,
    pub messages: Vec<ChatMessage>,
}

impl ChatThread {
    pub fn new(appointment_id: Uuid) -> Self {
        Self {
            appointment_id,
            started: false,
            messages: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCandidate {
    pub appointment: Appointment,
    pub minutes_until: i64,
    pub can_open: bool,
}

// ==============================================================================
// PATIENT RECORDS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Xray,
    Mr,
    Prescription,
    Report,
    Other,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Xray => write!(f, "X-ray"),
            MediaKind::Mr => write!(f, "MR"),
            MediaKind::Prescription => write!(f, "Prescription"),
            MediaKind::Report => write!(f, "Report (file)"),
            MediaKind::Other => write!(f, "Other"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaUpload {
    pub kind: MediaKind,
    pub file_name: String,
    pub file_size: u64,
    pub mime_type: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub kind: MediaKind,
    pub file_name: String,
    pub file_size: u64,
    pub size_label: String,
    pub mime_type: String,
    pub note: Option<String>,
    pub uploaded_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientReport {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub title: String,
    pub body: String,
    pub created_at: NaiveDateTime,
}

// ==============================================================================
// NOTIFICATIONS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub description: String,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub date: NaiveDate,
    pub time: ClockTime,
    pub patient_id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveAppointmentRequest {
    pub target_time: ClockTime,
    pub view_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleBlockRequest {
    pub date: NaiveDate,
    pub time: ClockTime,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub from: Sender,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddReportRequest {
    pub title: String,
    pub body: String,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppointmentError {
    #[error("{0} is closed (weekend or past date)")]
    DayClosed(NaiveDate),

    #[error("Slot {date} {time} is blocked by the doctor")]
    SlotBlocked { date: NaiveDate, time: ClockTime },

    #[error("Slot {date} {time} already holds an appointment")]
    SlotOccupied { date: NaiveDate, time: ClockTime },

    #[error("Patient {patient_id} already has an appointment with this doctor on {date}")]
    DuplicateBookingSameDay { patient_id: Uuid, date: NaiveDate },

    #[error("Cannot drop onto {0}: slot is blocked or the day is closed")]
    InvalidTarget(ClockTime),

    #[error("Appointment is outside the displayed day or doctor")]
    CrossContextMove,

    #[error("Swap refused: source slot {0} is blocked")]
    SourceBlocked(ClockTime),

    #[error("{}", channel_window_message(.minutes_until))]
    ChannelNotYetOpen { minutes_until: i64 },

    #[error("Chat has not been started for this appointment")]
    ThreadNotStarted,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0} is not a bookable slot")]
    OutsideWorkingHours(ClockTime),

    #[error("Patient not found: {0}")]
    PatientNotFound(Uuid),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Initial snapshot is inconsistent: {0}")]
    InconsistentSnapshot(String),
}

fn channel_window_message(minutes_until: &i64) -> String {
    if *minutes_until < 0 {
        format!(
            "Chat is closed: the appointment started {} minutes ago (window closes 15 minutes after)",
            -minutes_until
        )
    } else {
        format!(
            "Chat opens 2 hours before the appointment (currently {} minutes away)",
            minutes_until
        )
    }
}

impl AppointmentError {
    pub fn code(&self) -> &'static str {
        match self {
            AppointmentError::DayClosed(_) => "DAY_CLOSED",
            AppointmentError::SlotBlocked { .. } => "SLOT_BLOCKED",
            AppointmentError::SlotOccupied { .. } => "SLOT_OCCUPIED",
            AppointmentError::DuplicateBookingSameDay { .. } => "DUPLICATE_BOOKING_SAME_DAY",
            AppointmentError::InvalidTarget(_) => "INVALID_TARGET",
            AppointmentError::CrossContextMove => "CROSS_CONTEXT_MOVE",
            AppointmentError::SourceBlocked(_) => "SOURCE_BLOCKED",
            AppointmentError::ChannelNotYetOpen { .. } => "CHANNEL_NOT_YET_OPEN",
            AppointmentError::ThreadNotStarted => "THREAD_NOT_STARTED",
            AppointmentError::NotFound(_) => "NOT_FOUND",
            AppointmentError::OutsideWorkingHours(_) => "OUTSIDE_WORKING_HOURS",
            AppointmentError::PatientNotFound(_) => "PATIENT_NOT_FOUND",
            AppointmentError::InvalidInput(_) => "INVALID_INPUT",
            AppointmentError::InconsistentSnapshot(_) => "INCONSISTENT_SNAPSHOT",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppointmentError::NotFound(_) | AppointmentError::PatientNotFound(_) => StatusCode::NOT_FOUND,
            AppointmentError::InvalidInput(_) | AppointmentError::OutsideWorkingHours(_) => StatusCode::BAD_REQUEST,
            AppointmentError::InconsistentSnapshot(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::CONFLICT,
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        AppError::Rejected {
            status: err.status(),
            code: err.code(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_time_parses_and_formats_zero_padded() {
        let time: ClockTime = "09:30".parse().unwrap();
        assert_eq!(time.hour(), 9);
        assert_eq!(time.minute(), 30);
        assert_eq!(time.to_string(), "09:30");
    }

    #[test]
    fn clock_time_rejects_malformed_text() {
        assert!("9:30".parse::<ClockTime>().is_err());
        assert!("24:00".parse::<ClockTime>().is_err());
        assert!("10:60".parse::<ClockTime>().is_err());
        assert!("ten".parse::<ClockTime>().is_err());
        assert!("+9:30".parse::<ClockTime>().is_err());
        assert!("09:+3".parse::<ClockTime>().is_err());
        assert!("-1:30".parse::<ClockTime>().is_err());
    }

    #[test]
    fn channel_message_follows_the_side_of_the_window() {
        let early = AppointmentError::ChannelNotYetOpen { minutes_until: 360 }.to_string();
        assert!(early.starts_with("Chat opens 2 hours before"), "{}", early);
        assert!(early.contains("360 minutes away"), "{}", early);

        let late = AppointmentError::ChannelNotYetOpen { minutes_until: -16 }.to_string();
        assert!(late.starts_with("Chat is closed"), "{}", late);
        assert!(late.contains("16 minutes ago"), "{}", late);
    }

    #[test]
    fn clock_time_order_matches_text_order() {
        let early: ClockTime = "09:30".parse().unwrap();
        let late: ClockTime = "14:00".parse().unwrap();
        assert!(early < late);
        assert!(early.to_string() < late.to_string());
    }

    #[test]
    fn clock_time_serializes_as_string() {
        let time = ClockTime::new(16, 30).unwrap();
        assert_eq!(serde_json::to_string(&time).unwrap(), "\"16:30\"");
        let back: ClockTime = serde_json::from_str("\"16:30\"").unwrap();
        assert_eq!(back, time);
    }

    #[test]
    fn rejections_map_to_conflict_with_code() {
        let err: AppError = AppointmentError::CrossContextMove.into();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "CROSS_CONTEXT_MOVE");

        let err: AppError = AppointmentError::NotFound("a1".into()).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
