//! Settings sync models, cadence and the settings store.

mod panel_sync_model;
mod panel_sync_scheduler;
mod settings_store;

pub use panel_sync_model::*;
pub use panel_sync_scheduler::*;
pub use settings_store::*;
