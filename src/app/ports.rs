//! Port traits: the boundary between the telemetry pipeline and hardware.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ decoder / consumers (domain)
//! ```
//!
//! The CAN controller, the clock, the screen, the SD card and the cellular
//! uplink are all reached through these traits.  Domain code takes them as
//! generics, so every task runs on the host against in-memory fakes.

use crate::can::RawFrame;
use crate::error::DriverError;

use super::display::DisplayFrame;

// ───────────────────────────────────────────────────────────────
// CAN port (driven adapter: bus ↔ domain)
// ───────────────────────────────────────────────────────────────

/// Access to the CAN controller.
///
/// Both methods take `&self`: the reception task and the command
/// dispatcher share one controller, so implementations synchronise
/// internally.
pub trait CanPort {
    /// Queue one frame, waiting at most the configured transmit timeout.
    fn transmit(&self, frame: &RawFrame) -> Result<(), DriverError>;

    /// Wait at most the configured receive timeout for a frame.
    /// `Ok(None)` means the timeout expired with nothing received.
    fn receive(&self) -> Result<Option<RawFrame>, DriverError>;
}

impl<T: CanPort + ?Sized> CanPort for &T {
    fn transmit(&self, frame: &RawFrame) -> Result<(), DriverError> {
        (**self).transmit(frame)
    }

    fn receive(&self) -> Result<Option<RawFrame>, DriverError> {
        (**self).receive()
    }
}

impl<T: CanPort + ?Sized> CanPort for std::sync::Arc<T> {
    fn transmit(&self, frame: &RawFrame) -> Result<(), DriverError> {
        (**self).transmit(frame)
    }

    fn receive(&self) -> Result<Option<RawFrame>, DriverError> {
        (**self).receive()
    }
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic milliseconds since boot.
pub trait ClockPort {
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Display port (domain → screen)
// ───────────────────────────────────────────────────────────────

pub trait DisplayPort {
    /// Draw one complete frame.  Called at the display refresh cadence.
    fn render(&mut self, frame: &DisplayFrame);
}

// ───────────────────────────────────────────────────────────────
// Row storage port (domain → SD card)
// ───────────────────────────────────────────────────────────────

/// Append-only CSV storage for the trip log.
pub trait RowStorage {
    /// Make the medium ready for one write (mount, open the file).
    /// A row is only attempted after this succeeds.
    fn begin(&mut self) -> Result<(), StorageError>;

    /// Append `row` to the current log file.  If the file is new, `header`
    /// is written first.
    fn append_row(&mut self, header: &str, row: &str) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Uplink transport port (domain → cellular publish/subscribe)
// ───────────────────────────────────────────────────────────────

pub trait UplinkTransport {
    /// Publish one value.  `topic` already carries the configured prefix.
    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), UplinkError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`RowStorage`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// No card present or the filesystem failed to mount.
    Unavailable,
}

/// Errors from [`UplinkTransport`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UplinkError {
    /// The session rejected or dropped the publish.
    PublishFailed,
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Unavailable => write!(f, "storage unavailable"),
        }
    }
}

impl core::fmt::Display for UplinkError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::PublishFailed => write!(f, "publish failed"),
        }
    }
}
