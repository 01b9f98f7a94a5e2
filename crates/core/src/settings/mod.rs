//! Settings domain models.

mod model;
mod pane;
mod patch;

pub use model::*;
pub use pane::*;
pub use patch::*;
