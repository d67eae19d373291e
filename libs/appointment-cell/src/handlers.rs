// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use chrono::NaiveDate;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{
    AddReportRequest, BookAppointmentRequest, MediaUpload, MoveAppointmentRequest,
    SendMessageRequest, ToggleBlockRequest,
};
use crate::services::clinic::ClinicService;
use crate::services::idempotency::IdempotencyKey;
use crate::services::retry::RetryPolicy;
use crate::services::temporal::parse_iso_date;

pub const IDEMPOTENCY_HEADER: &str = "x-idempotency-key";

/// Shared handler state. The clinic sits behind a write lock so commands are
/// applied one at a time.
pub struct ClinicState {
    pub config: AppConfig,
    pub retry: RetryPolicy,
    pub clinic: RwLock<ClinicService>,
}

impl ClinicState {
    pub fn new(config: AppConfig, clinic: ClinicService) -> Self {
        Self {
            retry: RetryPolicy::from_config(&config),
            config,
            clinic: RwLock::new(clinic),
        }
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    Ok(parse_iso_date(raw)?)
}

fn idempotency_key(headers: &HeaderMap) -> Result<Option<IdempotencyKey>, AppError> {
    let Some(value) = headers.get(IDEMPOTENCY_HEADER) else {
        return Ok(None);
    };

    let raw = value
        .to_str()
        .map_err(|_| AppError::BadRequest("Idempotency key must be ASCII".to_string()))?;
    let key = raw
        .parse::<IdempotencyKey>()
        .map_err(|_| AppError::BadRequest(format!("'{}' is not a valid idempotency key", raw)))?;
    Ok(Some(key))
}

// ==============================================================================
// SCHEDULE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_schedule_grid(
    State(state): State<Arc<ClinicState>>,
) -> Result<Json<Value>, AppError> {
    let clinic = state.clinic.read().await;

    Ok(Json(json!({
        "success": true,
        "rows": clinic.grid()
    })))
}

#[axum::debug_handler]
pub async fn get_day_view(
    State(state): State<Arc<ClinicState>>,
    Path(date): Path<String>,
) -> Result<Json<Value>, AppError> {
    let date = parse_date(&date)?;
    let clinic = state.clinic.read().await;

    Ok(Json(json!({
        "success": true,
        "day": clinic.day_view(date)
    })))
}

#[axum::debug_handler]
pub async fn get_week_summary(
    State(state): State<Arc<ClinicState>>,
    Path(date): Path<String>,
) -> Result<Json<Value>, AppError> {
    let start = parse_date(&date)?;
    let clinic = state.clinic.read().await;

    Ok(Json(json!({
        "success": true,
        "days": clinic.week_summary(start)
    })))
}

#[axum::debug_handler]
pub async fn get_next_appointment(
    State(state): State<Arc<ClinicState>>,
    Path(date): Path<String>,
) -> Result<Json<Value>, AppError> {
    let date = parse_date(&date)?;
    let clinic = state.clinic.read().await;

    Ok(Json(json!({
        "success": true,
        "next_appointment": clinic.next_appointment(date)
    })))
}

// ==============================================================================
// APPOINTMENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<ClinicState>>,
    headers: HeaderMap,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let key = idempotency_key(&headers)?;
    debug!("Book request for patient {} (key present: {})", request.patient_id, key.is_some());

    let receipt = state.clinic.write().await.book(request, key)?;

    Ok(Json(json!({
        "success": true,
        "appointment": receipt.appointment,
        "idempotency_key": receipt.idempotency_key,
        "replayed": receipt.replayed,
        "retry": {
            "max_attempts": state.retry.max_attempts,
            "base_delay_ms": state.retry.base_delay.as_millis() as u64
        }
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<ClinicState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let cancelled = state.clinic.write().await.cancel(appointment_id)?;

    Ok(Json(json!({
        "success": true,
        "appointment": cancelled,
        "message": "Appointment cancelled"
    })))
}

#[axum::debug_handler]
pub async fn move_appointment(
    State(state): State<Arc<ClinicState>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<MoveAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let outcome = state
        .clinic
        .write()
        .await
        .move_or_swap(appointment_id, request.target_time, request.view_date)?;

    Ok(Json(json!({
        "success": true,
        "outcome": outcome
    })))
}

#[axum::debug_handler]
pub async fn get_patient_appointments(
    State(state): State<Arc<ClinicState>>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let clinic = state.clinic.read().await;
    let patient = clinic.patient(patient_id)?;

    Ok(Json(json!({
        "success": true,
        "patient": patient,
        "appointments": clinic.patient_agenda(patient_id)
    })))
}

// ==============================================================================
// BLOCKED SLOT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn toggle_blocked_slot(
    State(state): State<Arc<ClinicState>>,
    Json(request): Json<ToggleBlockRequest>,
) -> Result<Json<Value>, AppError> {
    let toggle = state
        .clinic
        .write()
        .await
        .toggle_block(request.date, request.time, request.reason.as_deref())?;

    Ok(Json(json!({
        "success": true,
        "toggle": toggle
    })))
}

#[axum::debug_handler]
pub async fn unblock_slot(
    State(state): State<Arc<ClinicState>>,
    Path(blocked_slot_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let removed = state.clinic.write().await.unblock(blocked_slot_id)?;

    Ok(Json(json!({
        "success": true,
        "blocked_slot": removed
    })))
}

// ==============================================================================
// CHAT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_chat_candidates(
    State(state): State<Arc<ClinicState>>,
    Path(date): Path<String>,
) -> Result<Json<Value>, AppError> {
    let date = parse_date(&date)?;
    let clinic = state.clinic.read().await;

    Ok(Json(json!({
        "success": true,
        "candidates": clinic.chat_candidates(date)
    })))
}

#[axum::debug_handler]
pub async fn get_chat_thread(
    State(state): State<Arc<ClinicState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let clinic = state.clinic.read().await;
    let thread = clinic.chat_thread(appointment_id)?;

    Ok(Json(json!({
        "success": true,
        "thread": thread,
        "can_open": clinic.can_open_channel(appointment_id)?
    })))
}

#[axum::debug_handler]
pub async fn start_chat(
    State(state): State<Arc<ClinicState>>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let thread = state.clinic.write().await.start_chat(appointment_id)?;

    Ok(Json(json!({
        "success": true,
        "thread": thread
    })))
}

#[axum::debug_handler]
pub async fn send_chat_message(
    State(state): State<Arc<ClinicState>>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<Value>, AppError> {
    let message = state
        .clinic
        .write()
        .await
        .send_message(appointment_id, request.from, &request.text)?;

    Ok(Json(json!({
        "success": true,
        "message": message
    })))
}

// ==============================================================================
// PATIENT RECORD HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_patient(
    State(state): State<Arc<ClinicState>>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let patient = state.clinic.read().await.patient(patient_id)?;

    Ok(Json(json!({
        "success": true,
        "patient": patient
    })))
}

#[axum::debug_handler]
pub async fn list_reports(
    State(state): State<Arc<ClinicState>>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let reports = state.clinic.read().await.reports(patient_id)?;

    Ok(Json(json!({
        "success": true,
        "reports": reports
    })))
}

#[axum::debug_handler]
pub async fn add_report(
    State(state): State<Arc<ClinicState>>,
    Path(patient_id): Path<Uuid>,
    Json(request): Json<AddReportRequest>,
) -> Result<Json<Value>, AppError> {
    let report = state
        .clinic
        .write()
        .await
        .add_report(patient_id, &request.title, &request.body)?;

    Ok(Json(json!({
        "success": true,
        "report": report
    })))
}

#[axum::debug_handler]
pub async fn delete_report(
    State(state): State<Arc<ClinicState>>,
    Path((patient_id, report_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, AppError> {
    let report = state.clinic.write().await.delete_report(patient_id, report_id)?;

    Ok(Json(json!({
        "success": true,
        "report": report
    })))
}

#[axum::debug_handler]
pub async fn list_media(
    State(state): State<Arc<ClinicState>>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let media = state.clinic.read().await.media(patient_id)?;

    Ok(Json(json!({
        "success": true,
        "media": media
    })))
}

#[axum::debug_handler]
pub async fn attach_media(
    State(state): State<Arc<ClinicState>>,
    Path(patient_id): Path<Uuid>,
    Json(upload): Json<MediaUpload>,
) -> Result<Json<Value>, AppError> {
    let item = state.clinic.write().await.attach_media(patient_id, upload)?;

    Ok(Json(json!({
        "success": true,
        "media": item
    })))
}

#[axum::debug_handler]
pub async fn remove_media(
    State(state): State<Arc<ClinicState>>,
    Path((patient_id, media_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, AppError> {
    let item = state.clinic.write().await.remove_media(patient_id, media_id)?;

    Ok(Json(json!({
        "success": true,
        "media": item
    })))
}
