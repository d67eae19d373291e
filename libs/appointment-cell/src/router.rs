// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::handlers::{self, ClinicState};

pub fn clinic_routes(state: Arc<ClinicState>) -> Router {
    let schedule_routes = Router::new()
        .route("/grid", get(handlers::get_schedule_grid))
        .route("/days/{date}", get(handlers::get_day_view))
        .route("/days/{date}/next", get(handlers::get_next_appointment))
        .route("/weeks/{date}", get(handlers::get_week_summary));

    let appointment_routes = Router::new()
        .route("/", post(handlers::book_appointment))
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .route("/{appointment_id}/move", post(handlers::move_appointment));

    let blocked_slot_routes = Router::new()
        .route("/toggle", post(handlers::toggle_blocked_slot))
        .route("/{blocked_slot_id}", delete(handlers::unblock_slot));

    let chat_routes = Router::new()
        .route("/candidates/{date}", get(handlers::get_chat_candidates))
        .route("/{appointment_id}", get(handlers::get_chat_thread))
        .route("/{appointment_id}/start", post(handlers::start_chat))
        .route("/{appointment_id}/messages", post(handlers::send_chat_message));

    let patient_routes = Router::new()
        .route("/{patient_id}", get(handlers::get_patient))
        .route("/{patient_id}/appointments", get(handlers::get_patient_appointments))
        .route(
            "/{patient_id}/reports",
            get(handlers::list_reports).post(handlers::add_report),
        )
        .route("/{patient_id}/reports/{report_id}", delete(handlers::delete_report))
        .route(
            "/{patient_id}/media",
            get(handlers::list_media).post(handlers::attach_media),
        )
        .route("/{patient_id}/media/{media_id}", delete(handlers::remove_media));

    Router::new()
        .nest("/schedule", schedule_routes)
        .nest("/appointments", appointment_routes)
        .nest("/blocked-slots", blocked_slot_routes)
        .nest("/chat", chat_routes)
        .nest("/patients", patient_routes)
        .with_state(state)
}
