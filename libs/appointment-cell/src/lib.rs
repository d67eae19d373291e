// libs/appointment-cell/src/lib.rs
//! # Appointment Cell
//!
//! Slot-conflict and scheduling engine for a single clinic calendar: a fixed
//! daily grid of 30-minute slots, bookings, doctor-blocked slots, drag-style
//! move/swap, and a time-gated chat channel per appointment.
//!
//! ```text
//! +-----------------------------------------------------+
//! |                 Appointment Cell                    |
//! +-----------------------------------------------------+
//! |  handlers.rs     |  HTTP endpoint handlers          |
//! |  router.rs       |  Route definitions               |
//! |  models.rs       |  Entities, views, errors         |
//! |  services/       |  Business logic layer            |
//! |    slot_grid.rs  |  Working-day grid                |
//! |    schedule.rs   |  State and derived views         |
//! |    booking.rs    |  Book/cancel/block/move engine   |
//! |    consistency.rs|  Slot invariant checker          |
//! |    chat.rs       |  Proximity-gated chat threads    |
//! |    clinic.rs     |  Facade used by the HTTP layer   |
//! +-----------------------------------------------------+
//! ```
//!
//! Every mutation goes through `&mut self`; hosts serialize writers (the HTTP
//! layer keeps the clinic behind a `tokio::sync::RwLock`).
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use appointment_cell::handlers::ClinicState;
//! use appointment_cell::models::{ClinicSnapshot, Doctor};
//! use appointment_cell::{clinic_routes, ClinicService, SystemClock};
//! use shared_config::AppConfig;
//!
//! # fn example() -> Result<(), appointment_cell::AppointmentError> {
//! let config = AppConfig::from_env();
//! let doctor = Doctor { id: config.doctor_id, name: config.doctor_name.clone() };
//! let clinic = ClinicService::new(doctor, ClinicSnapshot::default(), Arc::new(SystemClock))?;
//! let routes = clinic_routes(Arc::new(ClinicState::new(config, clinic)));
//! # Ok(())
//! # }
//! ```

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::*;

pub use services::clinic::ClinicService;
pub use services::temporal::{Clock, FixedClock, SystemClock};

pub use router::clinic_routes;
