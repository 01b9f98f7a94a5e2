//! Environment-driven configuration.

use std::time::Duration;

use clockpanel_core::sync::SyncConfig;
use clockpanel_device_sync::client::DEFAULT_TIMEOUT_SECS;

pub const DEVICE_URL_ENV: &str = "CLOCKPANEL_DEVICE_URL";
pub const PREVIEW_ENV: &str = "CLOCKPANEL_PREVIEW";
pub const POLL_INTERVAL_ENV: &str = "CLOCKPANEL_POLL_INTERVAL_MS";
pub const WRITE_RETRY_ENV: &str = "CLOCKPANEL_WRITE_RETRY_MS";
pub const HTTP_TIMEOUT_ENV: &str = "CLOCKPANEL_HTTP_TIMEOUT_SECS";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{DEVICE_URL_ENV} not configured. Set it to the clock's address or set {PREVIEW_ENV}=1.")]
    MissingDeviceUrl,

    #[error("{name} must be a positive integer, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },
}

/// Which device the panel talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceTarget {
    Http { base_url: String, timeout: Duration },
    Preview,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelConfig {
    pub target: DeviceTarget,
    pub sync: SyncConfig,
}

impl PanelConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let value = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut sync = SyncConfig::default();
        if let Some(ms) = parse_positive(POLL_INTERVAL_ENV, value(POLL_INTERVAL_ENV))? {
            sync = sync.with_poll_interval(Duration::from_millis(ms));
        }
        if let Some(ms) = parse_positive(WRITE_RETRY_ENV, value(WRITE_RETRY_ENV))? {
            sync = sync.with_write_retry_delay(Duration::from_millis(ms));
        }

        let preview = value(PREVIEW_ENV)
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(false);

        let target = if preview {
            DeviceTarget::Preview
        } else {
            let base_url = value(DEVICE_URL_ENV)
                .map(|v| v.trim_end_matches('/').to_string())
                .ok_or(ConfigError::MissingDeviceUrl)?;
            let timeout_secs = parse_positive(HTTP_TIMEOUT_ENV, value(HTTP_TIMEOUT_ENV))?
                .unwrap_or(DEFAULT_TIMEOUT_SECS);
            DeviceTarget::Http {
                base_url,
                timeout: Duration::from_secs(timeout_secs),
            }
        };

        Ok(Self { target, sync })
    }
}

fn parse_positive(name: &'static str, value: Option<String>) -> Result<Option<u64>, ConfigError> {
    let Some(value) = value else {
        return Ok(None);
    };
    match value.parse::<u64>() {
        Ok(parsed) if parsed > 0 => Ok(Some(parsed)),
        _ => Err(ConfigError::InvalidNumber { name, value }),
    }
}
