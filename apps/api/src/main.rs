use std::net::SocketAddr;
use std::sync::Arc;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::{self, TraceLayer};
use tracing::{Level, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;
mod seed;

use appointment_cell::handlers::ClinicState;
use appointment_cell::services::retry::retry_with_backoff;
use appointment_cell::models::{ClinicSnapshot, Doctor};
use appointment_cell::{ClinicService, Clock, SystemClock};
use shared_config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Clinic Scheduler API server");

    // Load configuration
    let config = AppConfig::from_env();
    if !config.is_configured() {
        warn!("CLINIC_DOCTOR_ID not set, serving the demo doctor {}", config.doctor_id);
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let snapshot = if config.seed_demo_data {
        seed::demo_snapshot(config.doctor_id, clock.today())
    } else {
        ClinicSnapshot::default()
    };

    let doctor = Doctor {
        id: config.doctor_id,
        name: config.doctor_name.clone(),
    };
    let clinic = ClinicService::new(doctor, snapshot, clock)?;

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Create shared state
    let port = config.server_port;
    let state = Arc::new(ClinicState::new(config, clinic));
    let retry = state.retry;
    info!(
        "Retry policy: {} attempts, {:?} base delay",
        retry.max_attempts, retry.base_delay
    );

    // Build the application router
    let app = router::create_router(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new()
                    .level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new()
                    .level(Level::INFO)),
        )
        .layer(cors);

    // Run the server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on {}", addr);

    // The port may still be held by a previous instance during restarts.
    let listener = retry_with_backoff(retry, |_| TcpListener::bind(addr)).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
