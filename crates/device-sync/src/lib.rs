//! Client-side settings sync for the clock panel.
//!
//! [`SyncEngine`] keeps a [`SettingsStore`](clockpanel_core::sync::SettingsStore)
//! consistent with one device, polling it on a fixed cadence and serializing
//! user writes against that poll. [`DeviceClient`] talks to real hardware over
//! HTTP; [`PreviewTransport`] simulates a device in memory.

pub mod client;
pub mod engine;
pub mod error;
pub mod preview;
pub mod transport;

pub use client::DeviceClient;
pub use engine::SyncEngine;
pub use error::{Result, SyncError};
pub use preview::PreviewTransport;
pub use transport::Transport;
