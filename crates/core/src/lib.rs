//! Core domain model for the clock panel: device settings, status telemetry,
//! sparse patches and the settings store the sync engine writes into.

pub mod errors;
pub mod settings;
pub mod sync;

pub use errors::{Error, Result};
