//! Sparse settings patches submitted with `POST /setting`.

use serde::Serialize;
use std::collections::BTreeMap;

use super::model::{
    AmbientDestination, CustomServerDestination, NtpServers, MAX_BRIGHTNESS_LEVEL,
    MAX_NTP_SERVERS,
};
use super::pane::{OverridePane, Pane};
use crate::errors::{Error, Result};

/// One user-initiated change: field name to new value.
///
/// Values are kept as strings because the device parses the POST body as a
/// form. Patches are never merged with each other; each one is submitted as
/// its own round trip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SettingsPatch {
    fields: BTreeMap<String, String>,
}

impl SettingsPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an arbitrary field. Later calls overwrite earlier ones.
    pub fn with(mut self, field: impl Into<String>, value: impl ToString) -> Self {
        self.fields.insert(field.into(), value.to_string());
        self
    }

    pub fn pane(pane: Pane) -> Self {
        Self::new().with("pane", pane)
    }

    pub fn override_pane(pane: OverridePane) -> Self {
        Self::new().with("override_pane", pane)
    }

    pub fn manual_brightness(level: u8) -> Result<Self> {
        if level > MAX_BRIGHTNESS_LEVEL {
            return Err(Error::BrightnessOutOfRange(i32::from(level)));
        }
        Ok(Self::new().with("manual_brightness", level))
    }

    pub fn auto_brightness(enabled: bool) -> Self {
        Self::new().with("auto_brightness", enabled)
    }

    /// Changing the timezone makes the device save and reboot.
    pub fn timezone(area: impl Into<String>, city: impl Into<String>) -> Self {
        Self::new()
            .with("tzarea", area.into())
            .with("tzcity", city.into())
    }

    /// Spread the list over `ntp1..ntp3`; unused slots are sent empty so the
    /// device drops servers that were removed.
    pub fn ntp_servers(servers: &NtpServers) -> Self {
        let mut patch = Self::new();
        for slot in 0..MAX_NTP_SERVERS {
            let value = servers.as_slice().get(slot).cloned().unwrap_or_default();
            patch = patch.with(format!("ntp{}", slot + 1), value);
        }
        patch
    }

    pub fn elevation(meters: u16) -> Self {
        Self::new().with("elev", meters)
    }

    pub fn ambient(destination: &AmbientDestination) -> Self {
        Self::new()
            .with("use_ambient", destination.enabled)
            .with("ambient_channelid", destination.channel_id)
            .with("ambient_writekey", &destination.write_key)
    }

    pub fn custom_server(destination: &CustomServerDestination) -> Self {
        Self::new()
            .with("use_custom_server", destination.enabled)
            .with("custom_server_addr", &destination.address)
            .with("custom_server_writekey", &destination.write_key)
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
