// libs/appointment-cell/src/services/directory.rs
use std::collections::HashMap;
use std::sync::Mutex;

use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{Notice, NoticeLevel, Patient};

/// Read-only patient lookup owned by an upstream system.
pub trait PatientDirectory: Send + Sync {
    fn get_patient(&self, patient_id: Uuid) -> Option<Patient>;
}

#[derive(Debug, Default)]
pub struct InMemoryPatientDirectory {
    patients: HashMap<Uuid, Patient>,
}

impl InMemoryPatientDirectory {
    pub fn new(patients: impl IntoIterator<Item = Patient>) -> Self {
        Self {
            patients: patients.into_iter().map(|p| (p.id, p)).collect(),
        }
    }
}

impl PatientDirectory for InMemoryPatientDirectory {
    fn get_patient(&self, patient_id: Uuid) -> Option<Patient> {
        self.patients.get(&patient_id).cloned()
    }
}

/// Receives display-only outcome descriptions. Must never influence control flow.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Emits notices as tracing events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => info!(title = %notice.title, "{}", notice.description),
            NoticeLevel::Failure => warn!(title = %notice.title, "{}", notice.description),
        }
    }
}

/// Keeps every notice in memory, for inspection in tests and demos.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn last(&self) -> Option<Notice> {
        self.notices().pop()
    }
}

impl NotificationSink for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(notice);
    }
}
