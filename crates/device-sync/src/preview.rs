//! In-memory device used for offline preview and tests.

use async_trait::async_trait;
use log::debug;
use std::sync::Mutex;

use clockpanel_core::settings::{
    AmbientDestination, BrightnessPolicy, BrightnessSetting, CustomServerDestination,
    NtpServers, OverridePane, Pane, SettingsPatch, SettingsSnapshot, StatusSnapshot,
    AUTO_BRIGHTNESS_VALUE, MAX_NTP_SERVERS,
};

use crate::error::{Result, SyncError};
use crate::transport::Transport;

/// Status reported before any patch touches the brightness.
pub const PREVIEW_STATUS: StatusSnapshot = StatusSnapshot {
    brightness: 4,
    adc: 210,
};

/// Settings the preview device boots with.
pub fn preview_settings() -> SettingsSnapshot {
    SettingsSnapshot {
        pane: Pane::DateTime,
        override_pane: OverridePane::Normal,
        brightness: BrightnessSetting {
            manual_value: 3,
            ..BrightnessSetting::default()
        },
        tzarea: "Asia".to_string(),
        tzcity: "Tokyo".to_string(),
        ntp: NtpServers::default(),
        elev: 0,
        ambient: Some(AmbientDestination {
            enabled: false,
            channel_id: 100,
            write_key: "123456789012345678".to_string(),
        }),
        custom_server: Some(CustomServerDestination {
            enabled: false,
            address: "http://example.com/".to_string(),
            write_key: "123456789012345678".to_string(),
        }),
        extra: serde_json::Map::new(),
    }
}

#[derive(Debug)]
struct DeviceState {
    settings: SettingsSnapshot,
    status: StatusSnapshot,
    writes: usize,
}

/// A device that lives in memory and applies patches the way the firmware's
/// POST handler does: one field group per request, first match wins.
#[derive(Debug)]
pub struct PreviewTransport {
    state: Mutex<DeviceState>,
}

impl PreviewTransport {
    pub fn new() -> Self {
        Self::with_state(preview_settings(), PREVIEW_STATUS)
    }

    pub fn with_state(settings: SettingsSnapshot, status: StatusSnapshot) -> Self {
        Self {
            state: Mutex::new(DeviceState {
                settings,
                status,
                writes: 0,
            }),
        }
    }

    /// Number of accepted writes so far.
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    /// Feed a new light-sensor reading.
    pub fn set_status(&self, status: StatusSnapshot) {
        self.lock().status = status;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DeviceState> {
        // A poisoned lock only means a test panicked mid-update; the data is
        // still a whole snapshot.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for PreviewTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn bad_request(message: impl Into<String>) -> SyncError {
    SyncError::api(400, message)
}

fn parse_flag(value: &str) -> bool {
    matches!(value, "true" | "1" | "on")
}

/// Apply one patch to `settings`, mirroring the device's precedence.
fn apply_patch(settings: &mut SettingsSnapshot, patch: &SettingsPatch) -> Result<()> {
    if let Some(value) = patch.get("override_pane") {
        settings.override_pane = value.parse().unwrap_or_default();
        return Ok(());
    }

    if let Some(value) = patch.get("pane") {
        let pane: Pane = value.parse().unwrap_or(Pane::Invalid);
        if !pane.is_selectable() {
            return Err(bad_request("Invalid argument 'pane'"));
        }
        settings.pane = pane;
        return Ok(());
    }

    if patch.contains("tzarea") || patch.contains("tzcity") {
        let area = patch
            .get("tzarea")
            .ok_or_else(|| bad_request("Please provide required argument 'tzarea'"))?;
        let city = patch
            .get("tzcity")
            .ok_or_else(|| bad_request("Please provide required argument 'tzcity'"))?;
        settings.tzarea = area.to_string();
        settings.tzcity = city.to_string();
        return Ok(());
    }

    if patch.contains("ntp1") {
        let mut servers = Vec::new();
        for slot in 1..=MAX_NTP_SERVERS {
            let key = format!("ntp{}", slot);
            let Some(addr) = patch.get(&key) else {
                continue;
            };
            if addr.is_empty() {
                if slot == 1 {
                    return Err(bad_request(format!("Parameter '{}' is invalid", key)));
                }
                continue;
            }
            if !addr.contains('.') {
                return Err(bad_request(format!("Parameter '{}' is invalid", key)));
            }
            servers.push(addr.to_string());
        }
        settings.ntp = NtpServers::new(servers)
            .map_err(|_| bad_request("All 'ntp*' parameter are empty"))?;
        return Ok(());
    }

    if let Some(value) = patch.get("elev") {
        let elev = value
            .parse::<f32>()
            .map_err(|_| bad_request("Invalid argument 'elev'"))?;
        settings.elev = elev.clamp(0.0, f32::from(u16::MAX)) as u16;
        return Ok(());
    }

    if let Some(value) = patch.get("auto_brightness") {
        if parse_flag(value) {
            settings.brightness.manual_value = AUTO_BRIGHTNESS_VALUE;
        } else if settings.brightness.is_automatic() {
            settings.brightness.manual_value = 0;
        }
        return Ok(());
    }

    if let Some(value) = patch.get("manual_brightness") {
        let level = value
            .parse::<i8>()
            .map_err(|_| bad_request("Invalid argument 'manual_brightness'"))?;
        settings.brightness.manual_value = level;
        return Ok(());
    }

    if let Some(value) = patch.get("use_ambient") {
        let ambient = settings.ambient.get_or_insert(AmbientDestination {
            enabled: false,
            channel_id: 0,
            write_key: String::new(),
        });
        ambient.enabled = parse_flag(value);
        if let Some(channel) = patch.get("ambient_channelid") {
            ambient.channel_id = channel
                .parse()
                .map_err(|_| bad_request("Invalid argument 'ambient_channelid'"))?;
        }
        if let Some(key) = patch.get("ambient_writekey") {
            ambient.write_key = key.to_string();
        }
        return Ok(());
    }

    if let Some(value) = patch.get("use_custom_server") {
        let custom = settings
            .custom_server
            .get_or_insert(CustomServerDestination {
                enabled: false,
                address: String::new(),
                write_key: String::new(),
            });
        custom.enabled = parse_flag(value);
        if let Some(addr) = patch.get("custom_server_addr") {
            custom.address = addr.to_string();
        }
        if let Some(key) = patch.get("custom_server_writekey") {
            custom.write_key = key.to_string();
        }
        return Ok(());
    }

    Err(bad_request("Unknown or empty params"))
}

#[async_trait]
impl Transport for PreviewTransport {
    async fn read_settings(&self) -> Result<SettingsSnapshot> {
        Ok(self.lock().settings.clone())
    }

    async fn read_status(&self) -> Result<StatusSnapshot> {
        let state = self.lock();
        let status = match state.settings.brightness.policy() {
            BrightnessPolicy::Manual(_) => StatusSnapshot {
                brightness: i32::from(state.settings.brightness.manual_value),
                adc: state.status.adc,
            },
            BrightnessPolicy::Automatic => state.status,
        };
        Ok(status)
    }

    async fn write_settings(&self, patch: &SettingsPatch) -> Result<SettingsSnapshot> {
        debug!("[PanelSync] Preview device applying {:?}", patch);
        let mut state = self.lock();
        let mut next = state.settings.clone();
        apply_patch(&mut next, patch)?;
        state.settings = next.clone();
        state.writes += 1;
        Ok(next)
    }
}
