//! Settings snapshot as reported by `GET /setting`.

use serde::{Deserialize, Serialize};

use super::pane::{OverridePane, Pane};
use crate::errors::{Error, Result};

/// Highest LED intensity the display driver accepts.
pub const MAX_BRIGHTNESS_LEVEL: u8 = 15;

/// `manual_value` sentinel selecting sensor-driven brightness.
pub const AUTO_BRIGHTNESS_VALUE: i8 = -1;

pub const DEFAULT_BRIGHTNESS_THRESHOLDS: [u16; 6] = [1024, 360, 270, 200, 160, 120];
pub const DEFAULT_BRIGHTNESS_HYSTERESIS: u16 = 10;
pub const DEFAULT_NTP_SERVER: &str = "ntp.nict.jp";
pub const DEFAULT_TZAREA: &str = "Asia";
pub const DEFAULT_TZCITY: &str = "Tokyo";

/// Maximum number of NTP servers the device stores.
pub const MAX_NTP_SERVERS: usize = 3;

/// Brightness level as the display applies it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayLevel {
    Off,
    Level(u8),
}

impl DisplayLevel {
    /// Decode the firmware convention where any negative value means off.
    pub fn from_raw(raw: i32) -> Self {
        if raw < 0 {
            DisplayLevel::Off
        } else {
            DisplayLevel::Level(raw.min(i32::from(u8::MAX)) as u8)
        }
    }
}

/// How the display picks its brightness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrightnessPolicy {
    Automatic,
    Manual(DisplayLevel),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrightnessSetting {
    pub manual_value: i8,
    #[serde(default = "default_thresholds")]
    pub thresholds: [u16; 6],
    #[serde(default = "default_hysteresis")]
    pub hysteresis: u16,
}

fn default_thresholds() -> [u16; 6] {
    DEFAULT_BRIGHTNESS_THRESHOLDS
}

fn default_hysteresis() -> u16 {
    DEFAULT_BRIGHTNESS_HYSTERESIS
}

impl BrightnessSetting {
    pub fn policy(&self) -> BrightnessPolicy {
        if self.manual_value == AUTO_BRIGHTNESS_VALUE {
            BrightnessPolicy::Automatic
        } else {
            BrightnessPolicy::Manual(DisplayLevel::from_raw(i32::from(self.manual_value)))
        }
    }

    pub fn is_automatic(&self) -> bool {
        self.policy() == BrightnessPolicy::Automatic
    }
}

impl Default for BrightnessSetting {
    fn default() -> Self {
        Self {
            manual_value: AUTO_BRIGHTNESS_VALUE,
            thresholds: DEFAULT_BRIGHTNESS_THRESHOLDS,
            hysteresis: DEFAULT_BRIGHTNESS_HYSTERESIS,
        }
    }
}

/// Ordered list of 1 to 3 NTP hostnames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct NtpServers(Vec<String>);

impl NtpServers {
    pub fn new<I, S>(servers: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let servers: Vec<String> = servers.into_iter().map(Into::into).collect();
        Self::try_from(servers)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn primary(&self) -> &str {
        &self.0[0]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl TryFrom<Vec<String>> for NtpServers {
    type Error = Error;

    fn try_from(servers: Vec<String>) -> Result<Self> {
        if servers.is_empty() || servers.len() > MAX_NTP_SERVERS {
            return Err(Error::NtpServerCount {
                actual: servers.len(),
                max: MAX_NTP_SERVERS,
            });
        }
        if let Some(index) = servers.iter().position(|s| s.trim().is_empty()) {
            return Err(Error::EmptyNtpServer { index: index + 1 });
        }
        Ok(Self(servers))
    }
}

impl From<NtpServers> for Vec<String> {
    fn from(servers: NtpServers) -> Self {
        servers.0
    }
}

impl Default for NtpServers {
    fn default() -> Self {
        Self(vec![DEFAULT_NTP_SERVER.to_string()])
    }
}

/// AmbientData channel the device uploads environment readings to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmbientDestination {
    #[serde(rename = "use_ambient")]
    pub enabled: bool,
    #[serde(rename = "ambient_channelid", default)]
    pub channel_id: u32,
    #[serde(rename = "ambient_writekey", default)]
    pub write_key: String,
}

/// Self-hosted collector; only present on firmware that supports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomServerDestination {
    #[serde(rename = "use_custom_server")]
    pub enabled: bool,
    #[serde(rename = "custom_server_addr", default)]
    pub address: String,
    #[serde(rename = "custom_server_writekey", default)]
    pub write_key: String,
}

/// Which optional field groups a snapshot carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsSchema {
    /// No remote logging fields at all.
    Minimal,
    AmbientOnly,
    WithCustomServer,
}

/// Full device configuration at one instant.
///
/// A snapshot is never patched in place. The store swaps whole snapshots,
/// so every field seen together came from the same device response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsSnapshot {
    #[serde(default)]
    pub pane: Pane,
    #[serde(default)]
    pub override_pane: OverridePane,
    #[serde(default)]
    pub brightness: BrightnessSetting,
    #[serde(default = "default_tzarea")]
    pub tzarea: String,
    #[serde(default = "default_tzcity")]
    pub tzcity: String,
    #[serde(default)]
    pub ntp: NtpServers,
    #[serde(default)]
    pub elev: u16,
    #[serde(flatten)]
    pub ambient: Option<AmbientDestination>,
    #[serde(flatten)]
    pub custom_server: Option<CustomServerDestination>,
    /// Fields this client does not model, kept so newer firmware round-trips.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_tzarea() -> String {
    DEFAULT_TZAREA.to_string()
}

fn default_tzcity() -> String {
    DEFAULT_TZCITY.to_string()
}

impl SettingsSnapshot {
    pub fn schema(&self) -> SettingsSchema {
        match (&self.ambient, &self.custom_server) {
            (_, Some(_)) => SettingsSchema::WithCustomServer,
            (Some(_), None) => SettingsSchema::AmbientOnly,
            (None, None) => SettingsSchema::Minimal,
        }
    }

    /// `area/city` as used by the tz database.
    pub fn timezone(&self) -> String {
        format!("{}/{}", self.tzarea, self.tzcity)
    }
}

impl Default for SettingsSnapshot {
    fn default() -> Self {
        Self {
            pane: Pane::default(),
            override_pane: OverridePane::default(),
            brightness: BrightnessSetting::default(),
            tzarea: default_tzarea(),
            tzcity: default_tzcity(),
            ntp: NtpServers::default(),
            elev: 0,
            ambient: None,
            custom_server: None,
            extra: serde_json::Map::new(),
        }
    }
}

/// Live telemetry from `GET /brightness`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub brightness: i32,
    pub adc: u16,
}

impl StatusSnapshot {
    pub fn level(&self) -> DisplayLevel {
        DisplayLevel::from_raw(self.brightness)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEVICE_SETTING_JSON: &str = r#"{
        "pane": "DATE_TIME",
        "override_pane": "NORMAL",
        "brightness": {
            "manual_value": 3,
            "thresholds": [1024, 360, 270, 200, 160, 120],
            "hysteresis": 10
        },
        "tzarea": "Asia",
        "tzcity": "Tokyo",
        "ntp": ["ntp.nict.jp"],
        "elev": 0,
        "use_ambient": false,
        "ambient_channelid": 100,
        "ambient_writekey": "123456789012345678",
        "use_custom_server": false,
        "custom_server_addr": "http://example.com/",
        "custom_server_writekey": "123456789012345678"
    }"#;

    #[test]
    fn decodes_full_device_snapshot() {
        let snapshot: SettingsSnapshot =
            serde_json::from_str(DEVICE_SETTING_JSON).expect("decode settings");

        assert_eq!(snapshot.pane, Pane::DateTime);
        assert_eq!(
            snapshot.brightness.policy(),
            BrightnessPolicy::Manual(DisplayLevel::Level(3))
        );
        assert_eq!(snapshot.ntp.as_slice(), ["ntp.nict.jp".to_string()]);
        assert_eq!(snapshot.timezone(), "Asia/Tokyo");
        assert_eq!(snapshot.schema(), SettingsSchema::WithCustomServer);
        assert_eq!(
            snapshot.ambient.as_ref().map(|a| a.channel_id),
            Some(100)
        );
        assert!(snapshot.extra.is_empty());
    }

    #[test]
    fn firmware_without_custom_server_is_ambient_only() {
        let json = r#"{
            "pane": "TIME",
            "brightness": { "manual_value": -1 },
            "ntp": ["a.example.org", "b.example.org"],
            "use_ambient": true,
            "ambient_channelid": 7,
            "ambient_writekey": "key"
        }"#;
        let snapshot: SettingsSnapshot = serde_json::from_str(json).expect("decode settings");

        assert_eq!(snapshot.schema(), SettingsSchema::AmbientOnly);
        assert!(snapshot.brightness.is_automatic());
        assert_eq!(snapshot.brightness.thresholds, DEFAULT_BRIGHTNESS_THRESHOLDS);
        assert_eq!(snapshot.tzarea, DEFAULT_TZAREA);
    }

    #[test]
    fn unknown_fields_are_preserved() {
        let json = r#"{ "pane": "TIME", "ntp": ["ntp.nict.jp"], "display_flip": true }"#;
        let snapshot: SettingsSnapshot = serde_json::from_str(json).expect("decode settings");

        assert_eq!(snapshot.schema(), SettingsSchema::Minimal);
        assert_eq!(
            snapshot.extra.get("display_flip"),
            Some(&serde_json::Value::Bool(true))
        );
    }

    #[test]
    fn ntp_list_must_hold_one_to_three_entries() {
        assert!(serde_json::from_str::<NtpServers>("[]").is_err());
        assert!(serde_json::from_str::<NtpServers>(r#"["a.b","c.d","e.f","g.h"]"#).is_err());
        assert_eq!(
            NtpServers::new(["", "ntp.nict.jp"]).unwrap_err(),
            Error::EmptyNtpServer { index: 1 }
        );
        let servers = NtpServers::new(["ntp.nict.jp", "pool.ntp.org"]).expect("two servers");
        assert_eq!(servers.primary(), "ntp.nict.jp");
        assert_eq!(servers.len(), 2);
    }

    #[test]
    fn negative_status_brightness_means_off() {
        let status: StatusSnapshot =
            serde_json::from_str(r#"{"brightness": -1, "adc": 12}"#).expect("decode status");
        assert_eq!(status.level(), DisplayLevel::Off);
        assert_eq!(
            StatusSnapshot { brightness: 4, adc: 210 }.level(),
            DisplayLevel::Level(4)
        );
    }
}
