//! Error types for the core domain model.

use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building or decoding settings values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// NTP server list outside the 1..=3 range the device accepts
    #[error("NTP server list must hold 1 to {max} entries, got {actual}")]
    NtpServerCount { actual: usize, max: usize },

    /// Empty NTP hostname
    #[error("NTP server {index} is empty")]
    EmptyNtpServer { index: usize },

    /// Brightness level outside the range the display supports
    #[error("Brightness level {0} is out of range")]
    BrightnessOutOfRange(i32),
}
