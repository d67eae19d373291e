// libs/appointment-cell/src/services/records.rs
use std::collections::HashMap;

use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::models::{AppointmentError, MediaItem, MediaUpload, PatientReport};

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Human-readable byte size: `B` below 1 KiB, one decimal for KB, two for MB.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Opaque per-patient media storage. File contents are never inspected.
pub trait MediaStore: Send + Sync {
    fn attach(&mut self, patient_id: Uuid, upload: MediaUpload, at: NaiveDateTime) -> MediaItem;
    fn list(&self, patient_id: Uuid) -> Vec<MediaItem>;
    fn remove(&mut self, patient_id: Uuid, media_id: Uuid) -> Option<MediaItem>;
}

#[derive(Debug, Default)]
pub struct InMemoryMediaStore {
    items: HashMap<Uuid, Vec<MediaItem>>,
}

impl InMemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MediaStore for InMemoryMediaStore {
    fn attach(&mut self, patient_id: Uuid, upload: MediaUpload, at: NaiveDateTime) -> MediaItem {
        let item = MediaItem {
            id: Uuid::new_v4(),
            patient_id,
            kind: upload.kind,
            size_label: format_bytes(upload.file_size),
            file_name: upload.file_name,
            file_size: upload.file_size,
            mime_type: upload
                .mime_type
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string()),
            note: upload.note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            uploaded_at: at,
        };

        // newest first
        self.items.entry(patient_id).or_default().insert(0, item.clone());
        item
    }

    fn list(&self, patient_id: Uuid) -> Vec<MediaItem> {
        self.items.get(&patient_id).cloned().unwrap_or_default()
    }

    fn remove(&mut self, patient_id: Uuid, media_id: Uuid) -> Option<MediaItem> {
        let items = self.items.get_mut(&patient_id)?;
        let index = items.iter().position(|m| m.id == media_id)?;
        Some(items.remove(index))
    }
}

/// Free-text examination reports per patient.
#[derive(Debug, Default)]
pub struct ReportBook {
    reports: Vec<PatientReport>,
}

impl ReportBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        patient_id: Uuid,
        title: &str,
        body: &str,
        at: NaiveDateTime,
    ) -> Result<PatientReport, AppointmentError> {
        let (title, body) = (title.trim(), body.trim());
        if title.is_empty() || body.is_empty() {
            return Err(AppointmentError::InvalidInput(
                "report title and body are required".to_string(),
            ));
        }

        let report = PatientReport {
            id: Uuid::new_v4(),
            patient_id,
            title: title.to_string(),
            body: body.to_string(),
            created_at: at,
        };
        self.reports.push(report.clone());
        Ok(report)
    }

    /// Newest first.
    pub fn list(&self, patient_id: Uuid) -> Vec<PatientReport> {
        let mut reports: Vec<PatientReport> = self
            .reports
            .iter()
            .filter(|r| r.patient_id == patient_id)
            .cloned()
            .collect();
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        reports
    }

    pub fn delete(&mut self, patient_id: Uuid, report_id: Uuid) -> Option<PatientReport> {
        let index = self
            .reports
            .iter()
            .position(|r| r.id == report_id && r.patient_id == patient_id)?;
        Some(self.reports.remove(index))
    }
}
