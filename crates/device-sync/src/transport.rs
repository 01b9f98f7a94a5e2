//! Transport contract between the sync engine and the device.

use async_trait::async_trait;
use std::sync::Arc;

use clockpanel_core::settings::{SettingsPatch, SettingsSnapshot, StatusSnapshot};

use crate::error::Result;

/// Reads and writes against one device.
///
/// Every call is one request/response round trip. The engine guarantees it
/// never has two calls outstanding on the same transport.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// `GET /setting`
    async fn read_settings(&self) -> Result<SettingsSnapshot>;

    /// `GET /brightness`
    async fn read_status(&self) -> Result<StatusSnapshot>;

    /// `POST /setting`; returns the device's full settings after the change.
    async fn write_settings(&self, patch: &SettingsPatch) -> Result<SettingsSnapshot>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn read_settings(&self) -> Result<SettingsSnapshot> {
        (**self).read_settings().await
    }

    async fn read_status(&self) -> Result<StatusSnapshot> {
        (**self).read_status().await
    }

    async fn write_settings(&self, patch: &SettingsPatch) -> Result<SettingsSnapshot> {
        (**self).write_settings(patch).await
    }
}
