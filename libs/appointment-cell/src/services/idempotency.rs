// libs/appointment-cell/src/services/idempotency.rs
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{AppointmentError, BookAppointmentRequest, ClockTime};

/// Opaque per-attempt token attached to write requests so a receiver can
/// recognise retried submissions of the same logical action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(Uuid);

impl IdempotencyKey {
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for IdempotencyKey {
    type Err = AppointmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(IdempotencyKey)
            .map_err(|_| AppointmentError::InvalidInput(format!("'{}' is not a valid idempotency key", s)))
    }
}

/// Issues a fresh random (v4) key. Call once per booking attempt, not per success.
pub fn issue_key() -> IdempotencyKey {
    IdempotencyKey(Uuid::new_v4())
}

/// The parts of a booking request a replay must repeat exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingIntent {
    pub date: NaiveDate,
    pub time: ClockTime,
    pub patient_id: Uuid,
    pub reason: Option<String>,
}

impl From<&BookAppointmentRequest> for BookingIntent {
    fn from(request: &BookAppointmentRequest) -> Self {
        Self {
            date: request.date,
            time: request.time,
            patient_id: request.patient_id,
            reason: request.reason.clone(),
        }
    }
}

#[derive(Debug)]
struct LedgerEntry {
    intent: BookingIntent,
    appointment_id: Uuid,
}

/// Remembers which appointment each key produced, for as long as that
/// appointment exists.
#[derive(Debug, Default)]
pub struct BookingLedger {
    entries: HashMap<IdempotencyKey, LedgerEntry>,
}

impl BookingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// The appointment `key` already produced, if any. Reusing a key for a
    /// different booking is refused.
    pub fn lookup(&self, key: &IdempotencyKey, intent: &BookingIntent) -> Result<Option<Uuid>, AppointmentError> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(entry) if entry.intent == *intent => Ok(Some(entry.appointment_id)),
            Some(entry) => Err(AppointmentError::InvalidInput(format!(
                "idempotency key {} was already used for a booking on {} at {}",
                key, entry.intent.date, entry.intent.time
            ))),
        }
    }

    pub fn record(&mut self, key: IdempotencyKey, intent: BookingIntent, appointment_id: Uuid) {
        self.entries.insert(key, LedgerEntry { intent, appointment_id });
    }

    /// Drops every key that produced `appointment_id`.
    pub fn forget_appointment(&mut self, appointment_id: Uuid) {
        self.entries.retain(|_, entry| entry.appointment_id != appointment_id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
