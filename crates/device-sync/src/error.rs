//! Error types for the panel sync crate.

use thiserror::Error;

/// Result type alias for panel sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors that can occur while talking to the device.
///
/// The engine never treats any of these as fatal: a failed round trip only
/// skips the snapshot replacement for that round.
#[derive(Debug, Error)]
pub enum SyncError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Non-success response from the device
    #[error("Device error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Invalid request (empty patch, bad base URL, etc.)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Device could not be reached at all
    #[error("Device unreachable: {0}")]
    Unreachable(String),
}

impl SyncError {
    /// Create an API error from status and message
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create an invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create an unreachable error
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Unreachable(message.into())
    }

    /// HTTP status if this is an API error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the device rejected the request itself (4xx), as opposed to
    /// a network or device-side failure that a later poll may recover from.
    pub fn is_rejected(&self) -> bool {
        match self {
            Self::Api { status, .. } => (400..500).contains(status),
            Self::InvalidRequest(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_request_is_rejected() {
        let err = SyncError::api(400, "Invalid argument 'pane'");
        assert!(err.is_rejected());
        assert_eq!(err.status_code(), Some(400));
    }

    #[test]
    fn unreachable_device_is_not_rejected() {
        let err = SyncError::unreachable("connection refused");
        assert!(!err.is_rejected());
        assert_eq!(err.status_code(), None);
        assert_eq!(err.to_string(), "Device unreachable: connection refused");
    }

    #[test]
    fn server_failure_is_not_rejected() {
        let err = SyncError::api(500, "An error occured while saving settings");
        assert!(!err.is_rejected());
    }
}
