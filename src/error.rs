//! Unified error types for the LeafMon firmware.
//!
//! Only resource faults surface as errors: malformed frames, implausible
//! values and full queues are absorbed where they occur and never reach a
//! caller. All variants are `Copy` so they can cross task boundaries
//! without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The CAN (TWAI) driver failed.
    Driver(DriverError),
    /// Configuration is invalid.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Driver(e) => write!(f, "driver: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// CAN driver errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverError {
    /// Driver installation was rejected (bad pins, timing, out of memory).
    InstallFailed,
    /// Driver installed but could not enter the running state.
    StartFailed,
    /// A frame could not be queued for transmission within the timeout.
    TransmitFailed,
    /// The receive path reported an error other than a timeout.
    ReceiveFailed,
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InstallFailed => write!(f, "CAN driver install failed"),
            Self::StartFailed => write!(f, "CAN driver start failed"),
            Self::TransmitFailed => write!(f, "CAN transmit failed"),
            Self::ReceiveFailed => write!(f, "CAN receive failed"),
        }
    }
}

impl From<DriverError> for Error {
    fn from(e: DriverError) -> Self {
        Self::Driver(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from [`SystemConfig::validate`](crate::config::SystemConfig::validate).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}
