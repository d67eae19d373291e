// libs/appointment-cell/src/services/mod.rs
pub mod booking;
pub mod chat;
pub mod clinic;
pub mod consistency;
pub mod directory;
pub mod idempotency;
pub mod proximity;
pub mod records;
pub mod retry;
pub mod schedule;
pub mod slot_grid;
pub mod temporal;
