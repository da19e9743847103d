//! Elidune circulation engine
//!
//! Decides what every circulation action (checkout, checkin, request,
//! cancel, extend, validate, receive) does to an item and its loans, and
//! drives the cascades those decisions trigger. Storage, location lookup,
//! calendars, policy and search indexing are supplied by the embedder
//! through the traits in [`repository`] and [`services::policy`].

pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;
pub mod telemetry;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use services::{CirculationReport, CirculationService, Services};
