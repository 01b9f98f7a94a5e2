//! Display panes the clock can show.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Primary display pane.
///
/// Unknown wire names decode to [`Pane::Invalid`] so a newer firmware never
/// breaks decoding of the whole settings snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Pane {
    #[default]
    DateTime,
    TempHumiTime,
    PresTime,
    Time,
    IpAddr,
    Welcome,
    RequireSetting,
    SyncingTime,
    ConnectFailed,
    #[serde(other)]
    Invalid,
}

impl Pane {
    /// Panes a user may pick from the panel. The rest are shown by the
    /// firmware itself (boot, provisioning, sync progress).
    pub const SELECTABLE: [Pane; 5] = [
        Pane::DateTime,
        Pane::TempHumiTime,
        Pane::PresTime,
        Pane::Time,
        Pane::IpAddr,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Pane::DateTime => "DATE_TIME",
            Pane::TempHumiTime => "TEMP_HUMI_TIME",
            Pane::PresTime => "PRES_TIME",
            Pane::Time => "TIME",
            Pane::IpAddr => "IP_ADDR",
            Pane::Welcome => "WELCOME",
            Pane::RequireSetting => "REQUIRE_SETTING",
            Pane::SyncingTime => "SYNCING_TIME",
            Pane::ConnectFailed => "CONNECT_FAILED",
            Pane::Invalid => "INVALID",
        }
    }

    pub fn is_selectable(&self) -> bool {
        Self::SELECTABLE.contains(self)
    }
}

impl fmt::Display for Pane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Pane {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let pane = match value {
            "DATE_TIME" => Pane::DateTime,
            "TEMP_HUMI_TIME" => Pane::TempHumiTime,
            "PRES_TIME" => Pane::PresTime,
            "TIME" => Pane::Time,
            "IP_ADDR" => Pane::IpAddr,
            "WELCOME" => Pane::Welcome,
            "REQUIRE_SETTING" => Pane::RequireSetting,
            "SYNCING_TIME" => Pane::SyncingTime,
            "CONNECT_FAILED" => Pane::ConnectFailed,
            _ => Pane::Invalid,
        };
        Ok(pane)
    }
}

/// Pane that temporarily overrides the primary one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverridePane {
    Off,
    Test,
    #[default]
    #[serde(other)]
    Normal,
}

impl OverridePane {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverridePane::Normal => "NORMAL",
            OverridePane::Off => "OFF",
            OverridePane::Test => "TEST",
        }
    }
}

impl fmt::Display for OverridePane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OverridePane {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let pane = match value {
            "OFF" => OverridePane::Off,
            "TEST" => OverridePane::Test,
            _ => OverridePane::Normal,
        };
        Ok(pane)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pane_wire_names_match_firmware() {
        let actual = Pane::SELECTABLE
            .iter()
            .map(|pane| serde_json::to_string(pane).expect("serialize pane"))
            .collect::<Vec<_>>();

        assert_eq!(
            actual,
            vec![
                "\"DATE_TIME\"",
                "\"TEMP_HUMI_TIME\"",
                "\"PRES_TIME\"",
                "\"TIME\"",
                "\"IP_ADDR\"",
            ]
        );
    }

    #[test]
    fn unknown_pane_decodes_as_invalid() {
        let pane: Pane = serde_json::from_str("\"CALENDAR\"").expect("decode pane");
        assert_eq!(pane, Pane::Invalid);
        assert!(!pane.is_selectable());
    }

    #[test]
    fn firmware_only_panes_are_not_selectable() {
        assert!(!Pane::Welcome.is_selectable());
        assert!(!Pane::SyncingTime.is_selectable());
        assert!(Pane::IpAddr.is_selectable());
    }

    #[test]
    fn unknown_override_pane_falls_back_to_normal() {
        let pane: OverridePane = serde_json::from_str("\"BLINK\"").expect("decode override");
        assert_eq!(pane, OverridePane::Normal);
        assert_eq!("TEST".parse::<OverridePane>().unwrap(), OverridePane::Test);
    }

    #[test]
    fn override_pane_serializes_with_wire_names() {
        for pane in [OverridePane::Normal, OverridePane::Off, OverridePane::Test] {
            let json = serde_json::to_string(&pane).expect("serialize override");
            assert_eq!(json, format!("\"{}\"", pane.as_str()));
            let decoded: OverridePane = serde_json::from_str(&json).expect("decode override");
            assert_eq!(decoded, pane);
        }
        assert_eq!(OverridePane::default(), OverridePane::Normal);
    }
}
