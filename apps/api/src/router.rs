use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::handlers::ClinicState;
use appointment_cell::router::clinic_routes;

pub fn create_router(state: Arc<ClinicState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic Scheduler API is running!" }))
        .merge(clinic_routes(state))
}
